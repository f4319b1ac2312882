//! Per-tile event layout.
//!
//! Every tile holds at most one event. Events become *active* when a player
//! gets close, which for spawnable events means an actor is created for the
//! tile. The map never creates actors itself: activation, rollback and
//! generator processing return [`EventAction`]s for the level to carry out.
//!
//! Generators are stored out of line; their tile holds `EventType::GENERATOR`
//! with the generator index in the first four parameter bytes.

use glam::{IVec2, Vec2};

use super::event_type::EventType;
use super::params::{params_from_prefix, read_u32, write_u32, SpawnParams, SPAWN_PARAMS_SIZE};
use crate::actors::{ActorHandle, ActorState};
use crate::config::{EventEntry, GameDifficulty};
use crate::resumable::{StreamError, StreamReader, StreamWriter};
use crate::rng::GameRng;
use crate::tiles::{PitType, TILE_SIZE};

const FLAG_GENERATOR: u8 = 0x02;
const FLAG_ILLUMINATED: u8 = 0x04;
const FLAG_MULTIPLAYER_ONLY: u8 = 0x80;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EventTile {
    pub event: EventType,
    pub flags: ActorState,
    pub params: SpawnParams,
    pub is_active: bool,
}

#[derive(Debug, Clone)]
struct GeneratorInfo {
    tile: IVec2,
    event: EventType,
    params: SpawnParams,
    /// Seconds between spawns.
    delay: u8,
    time_left: f32,
    spawned: Option<ActorHandle>,
}

#[derive(Debug, Clone, Copy)]
struct SpawnPoint {
    type_mask: u8,
    pos: Vec2,
}

#[derive(Debug, Clone, Copy)]
struct WarpTarget {
    id: u8,
    pos: Vec2,
}

/// Work requested by the event map.
#[derive(Debug, Clone, PartialEq)]
pub enum EventAction {
    Spawn {
        event: EventType,
        params: SpawnParams,
        flags: ActorState,
        tile: IVec2,
        /// Generator that should track the spawned actor.
        generator: Option<usize>,
    },
    SetWeather {
        weather_type: u8,
        intensity: u8,
    },
}

#[derive(Debug, Clone)]
pub struct EventMap {
    width: i32,
    height: i32,
    pit_type: PitType,
    layout: Vec<EventTile>,
    layout_for_rollback: Vec<EventTile>,
    checkpoint_created: bool,
    generators: Vec<GeneratorInfo>,
    spawn_points: Vec<SpawnPoint>,
    warp_targets: Vec<WarpTarget>,
}

impl EventMap {
    pub fn new(width: i32, height: i32, pit_type: PitType) -> Self {
        let size = (width.max(0) * height.max(0)) as usize;
        Self {
            width,
            height,
            pit_type,
            layout: vec![EventTile::default(); size],
            layout_for_rollback: vec![EventTile::default(); size],
            checkpoint_created: false,
            generators: Vec::new(),
            spawn_points: Vec::new(),
            warp_targets: Vec::new(),
        }
    }

    /// Build the layout from level records, keeping only events present on
    /// `difficulty` in single player.
    pub fn from_events(
        width: i32,
        height: i32,
        pit_type: PitType,
        events: &[EventEntry],
        difficulty: GameDifficulty,
    ) -> Self {
        let mut map = Self::new(width, height, pit_type);
        let difficulty_bit = 1u8 << difficulty.event_bit();

        for entry in events {
            let params = params_from_prefix(&entry.params);
            let actor_flags = if entry.flags & FLAG_ILLUMINATED != 0 {
                ActorState::ILLUMINATED
            } else {
                ActorState::empty()
            };
            let present =
                entry.flags & difficulty_bit != 0 && entry.flags & FLAG_MULTIPLAYER_ONLY == 0;
            if !present {
                continue;
            }

            if entry.flags & FLAG_GENERATOR != 0 {
                if entry.event.is_empty() {
                    continue;
                }
                let index = map.generators.len();
                map.generators.push(GeneratorInfo {
                    tile: IVec2::new(entry.x, entry.y),
                    event: entry.event,
                    params,
                    delay: entry.generator_delay,
                    time_left: if entry.generator_flags & 0x01 != 0 {
                        entry.generator_delay as f32
                    } else {
                        0.0
                    },
                    spawned: None,
                });
                let mut generator_params = [0u8; SPAWN_PARAMS_SIZE];
                write_u32(&mut generator_params, 0, index as u32);
                map.store_tile_event(
                    entry.x,
                    entry.y,
                    EventType::GENERATOR,
                    actor_flags,
                    Some(&generator_params),
                );
                continue;
            }

            match entry.event {
                EventType::EMPTY => {}
                EventType::LEVEL_START => map.add_spawn_position(params[0], entry.x, entry.y),
                EventType::WARP_TARGET => map.add_warp_target(params[0], entry.x, entry.y),
                event => map.store_tile_event(entry.x, entry.y, event, actor_flags, Some(&params)),
            }
        }
        map
    }

    pub fn size(&self) -> IVec2 {
        IVec2::new(self.width, self.height)
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        (x >= 0 && y >= 0 && x < self.width && y < self.height)
            .then(|| (x + y * self.width) as usize)
    }

    pub fn tile(&self, x: i32, y: i32) -> Option<&EventTile> {
        self.index(x, y).map(|i| &self.layout[i])
    }

    fn add_spawn_position(&mut self, type_mask: u8, x: i32, y: i32) {
        if type_mask == 0 {
            return;
        }
        self.spawn_points.push(SpawnPoint {
            type_mask,
            pos: Vec2::new((x * TILE_SIZE) as f32, (y * TILE_SIZE - 8) as f32),
        });
    }

    fn add_warp_target(&mut self, id: u8, x: i32, y: i32) {
        self.warp_targets.push(WarpTarget {
            id,
            pos: Vec2::new(
                (x * TILE_SIZE + TILE_SIZE / 2) as f32,
                (y * TILE_SIZE + 12 + TILE_SIZE / 2) as f32,
            ),
        });
    }

    /// Random spawn point accepting `player_type` (1-based).
    pub fn spawn_position(&self, player_type: u8, rng: &mut GameRng) -> Option<Vec2> {
        if player_type == 0 {
            return None;
        }
        let bit = 1u8 << (player_type - 1);
        let candidates: Vec<Vec2> = self
            .spawn_points
            .iter()
            .filter(|p| p.type_mask & bit != 0)
            .map(|p| p.pos)
            .collect();
        if candidates.is_empty() {
            return None;
        }
        Some(candidates[rng.index(candidates.len())])
    }

    pub fn warp_target(&self, id: u8, rng: &mut GameRng) -> Option<Vec2> {
        let candidates: Vec<Vec2> = self
            .warp_targets
            .iter()
            .filter(|t| t.id == id)
            .map(|t| t.pos)
            .collect();
        if candidates.is_empty() {
            return None;
        }
        Some(candidates[rng.index(candidates.len())])
    }

    /// Activate every inactive event inside the tile rectangle.
    pub fn activate_events(
        &mut self,
        tx1: i32,
        ty1: i32,
        tx2: i32,
        ty2: i32,
        allow_async: bool,
    ) -> Vec<EventAction> {
        let x1 = tx1.max(0);
        let x2 = tx2.min(self.width - 1);
        let y1 = ty1.max(0);
        let y2 = ty2.min(self.height - 1);

        let mut actions = Vec::new();
        for x in x1..=x2 {
            for y in y1..=y2 {
                let index = (x + y * self.width) as usize;
                let tile = &mut self.layout[index];
                if tile.is_active || tile.event.is_empty() {
                    continue;
                }
                tile.is_active = true;

                if tile.event == EventType::AREA_WEATHER {
                    actions.push(EventAction::SetWeather {
                        weather_type: tile.params[0],
                        intensity: tile.params[1],
                    });
                } else if tile.event != EventType::GENERATOR {
                    let mut flags = ActorState::IS_CREATED_FROM_EVENT_MAP | tile.flags;
                    if allow_async {
                        flags |= ActorState::ASYNC;
                    }
                    actions.push(EventAction::Spawn {
                        event: tile.event,
                        params: tile.params,
                        flags,
                        tile: IVec2::new(x, y),
                        generator: None,
                    });
                }
            }
        }

        if !self.checkpoint_created {
            // Spawn-area actors are part of the initial checkpoint.
            self.layout_for_rollback.clone_from(&self.layout);
            self.checkpoint_created = true;
        }
        actions
    }

    pub fn deactivate(&mut self, x: i32, y: i32) {
        if self.has_event_by_position(x, y) {
            if let Some(i) = self.index(x, y) {
                self.layout[i].is_active = false;
            }
        }
    }

    /// Let a generator respawn right away after its actor was deactivated.
    pub fn reset_generator(&mut self, x: i32, y: i32) {
        let Some(i) = self.index(x, y) else {
            return;
        };
        let tile = &self.layout[i];
        if tile.event != EventType::GENERATOR {
            log::warn!("No generator at tile ({x}, {y})");
            return;
        }
        let generator_index = read_u32(&tile.params, 0) as usize;
        match self.generators.get_mut(generator_index) {
            Some(generator) => {
                generator.time_left = 0.0;
                generator.spawned = None;
            }
            None => log::warn!("Generator index {generator_index} out of range"),
        }
    }

    /// Replace the tile's event. It stays active only if the event is unchanged.
    pub fn store_tile_event(
        &mut self,
        x: i32,
        y: i32,
        event: EventType,
        flags: ActorState,
        params: Option<&SpawnParams>,
    ) {
        let Some(i) = self.index(x, y) else {
            return;
        };
        let previous = &self.layout[i];
        let is_active = previous.event == event && previous.is_active;
        self.layout[i] = EventTile {
            event,
            flags,
            params: params.copied().unwrap_or([0; SPAWN_PARAMS_SIZE]),
            is_active,
        };
    }

    pub fn event_by_position(&self, x: f32, y: f32) -> (EventType, Option<&SpawnParams>) {
        self.event_at_tile(
            (x as i32).div_euclid(TILE_SIZE),
            (y as i32).div_euclid(TILE_SIZE),
        )
    }

    pub fn event_at_tile(&self, x: i32, y: i32) -> (EventType, Option<&SpawnParams>) {
        if y > self.height {
            let event = if self.pit_type == PitType::InstantDeathPit {
                EventType::MODIFIER_DEATH
            } else {
                EventType::EMPTY
            };
            return (event, None);
        }
        match self.index(x, y) {
            Some(i) => (self.layout[i].event, Some(&self.layout[i].params)),
            None => (EventType::EMPTY, None),
        }
    }

    pub fn has_event_by_position(&self, x: i32, y: i32) -> bool {
        self.tile(x, y).is_some_and(|t| !t.event.is_empty())
    }

    pub fn warp_by_position(&self, x: f32, y: f32) -> Option<u8> {
        match self.event_by_position(x, y) {
            (EventType::WARP_ORIGIN, Some(params)) => Some(params[0]),
            _ => None,
        }
    }

    /// Every spawnable event in the layout, for preloading.
    pub fn preload_list(&self) -> Vec<(EventType, SpawnParams)> {
        let tiles = self
            .layout
            .iter()
            .filter(|t| {
                !t.event.is_empty()
                    && t.event != EventType::GENERATOR
                    && t.event != EventType::AREA_WEATHER
            })
            .map(|t| (t.event, t.params));
        let generators = self.generators.iter().map(|g| (g.event, g.params));
        tiles.chain(generators).collect()
    }

    /// Count down generators and request spawns for the ones that are ready.
    /// `is_alive` tells whether a previously spawned actor still counts.
    pub fn process_generators(
        &mut self,
        time_mult: f32,
        mut is_alive: impl FnMut(ActorHandle) -> bool,
    ) -> Vec<EventAction> {
        let mut actions = Vec::new();
        for (index, generator) in self.generators.iter_mut().enumerate() {
            let tile_index = (generator.tile.x + generator.tile.y * self.width) as usize;
            if !self.layout[tile_index].is_active {
                generator.time_left -= time_mult;
                continue;
            }
            let spawned_alive = generator.spawned.is_some_and(&mut is_alive);
            if spawned_alive {
                continue;
            }
            if generator.time_left <= 0.0 {
                generator.time_left = generator.delay as f32 * jj_core::time::REFERENCE_FPS;
                actions.push(EventAction::Spawn {
                    event: generator.event,
                    params: generator.params,
                    flags: ActorState::IS_FROM_GENERATOR,
                    tile: generator.tile,
                    generator: Some(index),
                });
            } else {
                generator.time_left -= time_mult;
                generator.spawned = None;
            }
        }
        actions
    }

    pub fn set_generator_actor(&mut self, generator: usize, actor: Option<ActorHandle>) {
        if let Some(g) = self.generators.get_mut(generator) {
            g.spawned = actor;
        }
    }

    pub fn create_checkpoint_for_rollback(&mut self) {
        self.layout_for_rollback.clone_from(&self.layout);
    }

    /// Restore the checkpoint layout and respawn events that were active then
    /// but are not now.
    pub fn rollback_to_checkpoint(&mut self) -> Vec<EventAction> {
        let mut actions = Vec::new();
        for y in 0..self.height {
            for x in 0..self.width {
                let index = (x + y * self.width) as usize;
                let previous = self.layout_for_rollback[index];
                let respawn = previous.is_active && !self.layout[index].is_active;
                self.layout[index] = previous;

                if !respawn || previous.event.is_empty() {
                    continue;
                }
                self.layout[index].is_active = true;
                if previous.event == EventType::AREA_WEATHER {
                    actions.push(EventAction::SetWeather {
                        weather_type: previous.params[0],
                        intensity: previous.params[1],
                    });
                } else if previous.event != EventType::GENERATOR {
                    actions.push(EventAction::Spawn {
                        event: previous.event,
                        params: previous.params,
                        flags: ActorState::IS_CREATED_FROM_EVENT_MAP | previous.flags,
                        tile: IVec2::new(x, y),
                        generator: None,
                    });
                }
            }
        }
        actions
    }

    /// The checkpoint layout plus generator timers. Tiles come back inactive
    /// so they respawn around the player on resume.
    pub fn serialize_resumable(&self, w: &mut StreamWriter) {
        w.write_i32(self.width);
        w.write_i32(self.height);
        for tile in &self.layout_for_rollback {
            w.write_u16(tile.event.0);
            w.write_u8(
                if tile.flags.contains(ActorState::ILLUMINATED) {
                    FLAG_ILLUMINATED
                } else {
                    0
                },
            );
            w.write_bytes(&tile.params);
        }
        w.write_u32(self.generators.len() as u32);
        for generator in &self.generators {
            w.write_f32(generator.time_left);
        }
    }

    pub fn initialize_from_stream(&mut self, r: &mut StreamReader) -> Result<(), StreamError> {
        let width = r.read_i32()?;
        let height = r.read_i32()?;
        if width != self.width || height != self.height {
            return Err(StreamError::Malformed(format!(
                "event map is {width}x{height}, level is {}x{}",
                self.width, self.height
            )));
        }
        let mut layout = Vec::with_capacity(self.layout.len());
        for _ in 0..self.layout.len() {
            let event = EventType(r.read_u16()?);
            let flags = if r.read_u8()? & FLAG_ILLUMINATED != 0 {
                ActorState::ILLUMINATED
            } else {
                ActorState::empty()
            };
            let params = r.read_bytes::<SPAWN_PARAMS_SIZE>()?;
            layout.push(EventTile {
                event,
                flags,
                params,
                is_active: false,
            });
        }
        let generator_count = r.read_u32()? as usize;
        if generator_count != self.generators.len() {
            return Err(StreamError::Malformed(format!(
                "{generator_count} generators in stream, level has {}",
                self.generators.len()
            )));
        }
        for generator in &mut self.generators {
            generator.time_left = r.read_f32()?;
            generator.spawned = None;
        }
        self.layout_for_rollback.clone_from(&layout);
        self.layout = layout;
        self.checkpoint_created = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(x: i32, y: i32, event: EventType, params: &[u8]) -> EventEntry {
        EventEntry {
            x,
            y,
            event,
            flags: 0x70,
            params: params.to_vec(),
            generator_flags: 0,
            generator_delay: 0,
        }
    }

    fn spawned_tiles(actions: &[EventAction]) -> Vec<IVec2> {
        actions
            .iter()
            .filter_map(|a| match a {
                EventAction::Spawn { tile, .. } => Some(*tile),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_activation_is_once_per_tile() {
        let events = [entry(3, 3, EventType::ENEMY_CRAB, &[])];
        let mut map =
            EventMap::from_events(10, 10, PitType::FallForever, &events, GameDifficulty::Normal);

        let first = map.activate_events(0, 0, 9, 9, false);
        assert_eq!(spawned_tiles(&first), vec![IVec2::new(3, 3)]);
        assert!(map.activate_events(0, 0, 9, 9, false).is_empty());

        map.deactivate(3, 3);
        assert_eq!(map.activate_events(0, 0, 9, 9, false).len(), 1);
    }

    #[test]
    fn test_spawned_flags_mark_event_map_origin() {
        let mut events = [entry(1, 1, EventType::GEM, &[2])];
        events[0].flags |= FLAG_ILLUMINATED;
        let mut map =
            EventMap::from_events(4, 4, PitType::FallForever, &events, GameDifficulty::Normal);
        let actions = map.activate_events(0, 0, 3, 3, true);
        let EventAction::Spawn { flags, params, .. } = &actions[0] else {
            panic!("expected spawn");
        };
        assert!(flags.contains(ActorState::IS_CREATED_FROM_EVENT_MAP));
        assert!(flags.contains(ActorState::ILLUMINATED));
        assert!(flags.contains(ActorState::ASYNC));
        assert_eq!(params[0], 2);
    }

    #[test]
    fn test_difficulty_and_multiplayer_filtering() {
        let mut hard_only = entry(1, 1, EventType::ENEMY_CRAB, &[]);
        hard_only.flags = 1 << 6;
        let mut multiplayer = entry(2, 1, EventType::ENEMY_CRAB, &[]);
        multiplayer.flags = 0x70 | FLAG_MULTIPLAYER_ONLY;
        let events = [hard_only, multiplayer];

        let normal =
            EventMap::from_events(4, 4, PitType::FallForever, &events, GameDifficulty::Normal);
        assert!(!normal.has_event_by_position(1, 1));
        assert!(!normal.has_event_by_position(2, 1));

        let hard = EventMap::from_events(4, 4, PitType::FallForever, &events, GameDifficulty::Hard);
        assert!(hard.has_event_by_position(1, 1));
    }

    #[test]
    fn test_spawn_points_by_type_mask() {
        let events = [
            entry(2, 5, EventType::LEVEL_START, &[0b001]),
            entry(7, 5, EventType::LEVEL_START, &[0b010]),
        ];
        let map =
            EventMap::from_events(10, 10, PitType::FallForever, &events, GameDifficulty::Normal);
        let mut rng = GameRng::new(3);
        assert_eq!(map.spawn_position(1, &mut rng), Some(Vec2::new(64.0, 152.0)));
        assert_eq!(map.spawn_position(2, &mut rng), Some(Vec2::new(224.0, 152.0)));
        assert_eq!(map.spawn_position(3, &mut rng), None);
    }

    #[test]
    fn test_warp_targets() {
        let events = [
            entry(1, 1, EventType::WARP_ORIGIN, &[4]),
            entry(5, 2, EventType::WARP_TARGET, &[4]),
        ];
        let map =
            EventMap::from_events(8, 8, PitType::FallForever, &events, GameDifficulty::Normal);
        let mut rng = GameRng::new(0);
        assert_eq!(map.warp_by_position(40.0, 40.0), Some(4));
        assert_eq!(map.warp_target(4, &mut rng), Some(Vec2::new(176.0, 92.0)));
        assert_eq!(map.warp_target(9, &mut rng), None);
    }

    #[test]
    fn test_store_tile_event_keeps_activity_only_for_same_event() {
        let events = [entry(1, 1, EventType::ENEMY_CRAB, &[])];
        let mut map =
            EventMap::from_events(4, 4, PitType::FallForever, &events, GameDifficulty::Normal);
        map.activate_events(0, 0, 3, 3, false);

        map.store_tile_event(1, 1, EventType::ENEMY_CRAB, ActorState::empty(), None);
        assert!(map.tile(1, 1).expect("tile").is_active);
        map.store_tile_event(1, 1, EventType::EMPTY, ActorState::empty(), None);
        assert!(!map.tile(1, 1).expect("tile").is_active);
    }

    #[test]
    fn test_below_level_is_death_only_for_instant_death_pits() {
        let death = EventMap::new(4, 4, PitType::InstantDeathPit);
        assert_eq!(death.event_at_tile(1, 5).0, EventType::MODIFIER_DEATH);
        let forever = EventMap::new(4, 4, PitType::FallForever);
        assert_eq!(forever.event_at_tile(1, 5).0, EventType::EMPTY);
    }

    #[test]
    fn test_generator_respawns_after_delay() {
        let mut generator = entry(2, 2, EventType::GEM, &[]);
        generator.flags |= FLAG_GENERATOR;
        generator.generator_delay = 1;
        let mut map = EventMap::from_events(
            6,
            6,
            PitType::FallForever,
            &[generator],
            GameDifficulty::Normal,
        );
        // The generator tile activates without spawning anything itself.
        assert!(map.activate_events(0, 0, 5, 5, false).is_empty());

        let spawned = map.process_generators(1.0, |_| true);
        assert_eq!(spawned.len(), 1);
        map.set_generator_actor(0, None);

        // 60 frames of recharge, then the next spawn.
        let mut frames = 0;
        loop {
            frames += 1;
            if !map.process_generators(1.0, |_| false).is_empty() {
                break;
            }
            assert!(frames < 100, "generator never respawned");
        }
        assert_eq!(frames, 61);
    }

    #[test]
    fn test_rollback_respawns_what_was_active() {
        let events = [
            entry(1, 1, EventType::ENEMY_CRAB, &[]),
            entry(8, 1, EventType::ENEMY_TURTLE, &[]),
        ];
        let mut map =
            EventMap::from_events(10, 4, PitType::FallForever, &events, GameDifficulty::Normal);
        // First pass only reaches the crab and becomes the checkpoint.
        map.activate_events(0, 0, 4, 3, false);
        map.activate_events(0, 0, 9, 3, false);
        map.deactivate(1, 1);

        let actions = map.rollback_to_checkpoint();
        assert_eq!(spawned_tiles(&actions), vec![IVec2::new(1, 1)]);
        assert!(map.tile(1, 1).expect("tile").is_active);
        assert!(!map.tile(8, 1).expect("tile").is_active);
    }

    #[test]
    fn test_resumable_round_trip() {
        let mut generator = entry(0, 0, EventType::FOOD, &[]);
        generator.flags |= FLAG_GENERATOR;
        generator.generator_delay = 5;
        generator.generator_flags = 1;
        let events = [generator, entry(2, 3, EventType::SPRING, &[1, 2, 0, 0, 9])];
        let mut map =
            EventMap::from_events(4, 4, PitType::FallForever, &events, GameDifficulty::Normal);
        map.activate_events(0, 0, 3, 3, false);
        map.store_tile_event(2, 3, EventType::EMPTY, ActorState::empty(), None);
        map.create_checkpoint_for_rollback();

        let mut w = StreamWriter::new();
        map.serialize_resumable(&mut w);
        let bytes = w.into_bytes();

        let mut restored =
            EventMap::from_events(4, 4, PitType::FallForever, &events, GameDifficulty::Normal);
        restored
            .initialize_from_stream(&mut StreamReader::new(&bytes))
            .expect("restore");
        assert!(!restored.has_event_by_position(2, 3));
        assert_eq!(
            restored.tile(0, 0).expect("tile").event,
            EventType::GENERATOR
        );
        assert!(!restored.tile(0, 0).expect("tile").is_active);

        let err = restored
            .initialize_from_stream(&mut StreamReader::new(&bytes[..bytes.len() - 2]))
            .expect_err("truncated");
        assert!(matches!(err, StreamError::Truncated { .. }));
    }
}
