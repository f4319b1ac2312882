//! The simulation driver for one level.
//!
//! `LevelHandler` owns the actor arena, the collision broadphase, the tile and
//! event maps, the content cache and the level's random stream. One call to
//! [`LevelHandler::update`] is one frame:
//!
//! 1. content loads complete and pending activations commit;
//! 2. a pending level change counts down;
//! 3. events around the players activate, far actors deactivate, generators
//!    tick;
//! 4. the active boss is checked;
//! 5. every actor updates, in spawn order;
//! 6. collisions resolve (reap destroyed actors, sync proxies, dispatch pairs);
//! 7. cameras follow their players.
//!
//! Actors are checked out of the arena while one of their callbacks runs, so
//! the callback can take `&mut LevelHandler` freely. Anything that needs the
//! checked-out actor (score for a player mid-update) is deferred until it is
//! checked back in.

use std::collections::VecDeque;
use std::mem::discriminant;
use std::path::Path;

use glam::{IVec2, Vec2};
use jj_core::input::{PlayerInput, ProcessedInput, MAX_PLAYERS};
use jj_core::Aabb;

use crate::actors::activation::PendingActivation;
use crate::actors::{
    Activation, Actor, ActorActivationDetails, ActorArena, ActorBase, ActorHandle, ActorKind,
    ActorState, MoveType,
};
use crate::actors::player::Player;
use crate::collisions::{BroadPhase, ProxyId, NULL_NODE};
use crate::config::{
    load_level_from_path, ExitType, GameDifficulty, LevelConfig, LevelFile, LevelInitialization,
    PlayerCarryOver, PlayerType,
};
use crate::content::{ContentResolver, MetadataRequest};
use crate::events::params::{read_u16, SpawnParams};
use crate::events::{EventAction, EventMap, EventSpawner, EventType};
use crate::resumable::{StreamError, StreamReader, StreamWriter};
use crate::rng::GameRng;
use crate::tiles::{world_to_tile, GridCell, TileCollisionParams, TileMap, TILE_SIZE};
use crate::viewport::{Viewport, DEFAULT_VIEW_SIZE};

const MAX_SOUND_LOG: usize = 512;
/// Tree queries for solid objects are widened by this much, since proxies
/// are only synced once per frame.
const QUERY_MARGIN: f32 = 32.0;
const PLAYER_SPAWN_SPACING: f32 = 30.0;
const RESUMABLE_FLAG_REFORGED: u8 = 0x01;
const RESUMABLE_FLAG_CHEATS: u8 = 0x02;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelState {
    Loading,
    Active,
    Paused,
    LevelChanging,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SoundEvent {
    pub name: String,
    pub pos: Vec2,
    /// Shared effect set rather than the actor's own sounds.
    pub common: bool,
    pub frame: f32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HudMessage {
    LevelText(String),
    Gems { player: u8, count: i32 },
    Coins { count: i32 },
}

#[derive(Debug, Clone)]
struct PendingLevelChange {
    exit_type: ExitType,
    next_level: Option<String>,
    time_left: f32,
}

pub struct LevelHandler {
    state: LevelState,
    episode_name: String,
    level_name: String,
    default_next_level: Option<String>,
    secret_level: Option<String>,
    difficulty: GameDifficulty,
    is_reforged: bool,
    cheats_used: bool,
    is_multiplayer: bool,
    config: LevelConfig,
    texts: Vec<String>,

    actors: ActorArena,
    broad_phase: BroadPhase<ActorHandle>,
    pending_activations: Vec<PendingActivation>,
    players: Vec<ActorHandle>,
    player_inputs: [PlayerInput; MAX_PLAYERS],
    game_over_players: [bool; MAX_PLAYERS],
    game_over: bool,
    viewports: Vec<Viewport>,

    tile_map: TileMap,
    event_map: EventMap,
    spawner: EventSpawner,
    content: ContentResolver,
    rng: GameRng,

    elapsed_frames: f32,
    checkpoint_frames: f32,
    water_level: f32,
    weather: (u8, u8),
    active_boss: Option<ActorHandle>,
    level_change: Option<PendingLevelChange>,
    next_level: Option<LevelInitialization>,

    deferred_scores: Vec<(ActorHandle, i32)>,
    queued_collisions: Vec<(ActorHandle, ActorHandle)>,
    sounds: VecDeque<SoundEvent>,
    hud_messages: Vec<HudMessage>,
}

impl LevelHandler {
    /// A level over prepared maps. Players from `init` are spawned; the level
    /// stays in `Loading` until [`begin_play`](Self::begin_play).
    pub fn with_maps(
        init: &LevelInitialization,
        tile_map: TileMap,
        event_map: EventMap,
        content: ContentResolver,
    ) -> Self {
        let mut level = Self {
            state: LevelState::Loading,
            episode_name: init.episode_name.clone(),
            level_name: init.level_name.clone(),
            default_next_level: None,
            secret_level: None,
            difficulty: init.difficulty,
            is_reforged: init.is_reforged,
            cheats_used: init.cheats_used,
            is_multiplayer: init.is_multiplayer,
            config: LevelConfig::default(),
            texts: Vec::new(),
            actors: ActorArena::new(),
            broad_phase: BroadPhase::new(),
            pending_activations: Vec::new(),
            players: Vec::new(),
            player_inputs: [PlayerInput::new(); MAX_PLAYERS],
            game_over_players: [false; MAX_PLAYERS],
            game_over: false,
            viewports: Vec::new(),
            water_level: tile_map.level_bounds().b + 1.0,
            tile_map,
            event_map,
            spawner: EventSpawner::with_default_actors(),
            content,
            rng: GameRng::new(init.seed),
            elapsed_frames: 0.0,
            checkpoint_frames: 0.0,
            weather: (0, 0),
            active_boss: None,
            level_change: None,
            next_level: None,
            deferred_scores: Vec::new(),
            queued_collisions: Vec::new(),
            sounds: VecDeque::new(),
            hud_messages: Vec::new(),
        };
        level.spawn_players(init);
        level
    }

    /// Build a level from a parsed level file. Event metadata is preloaded so
    /// the first activation pass commits without waiting.
    pub fn from_file(
        init: &LevelInitialization,
        file: LevelFile,
        mut content: ContentResolver,
    ) -> Result<Self, String> {
        let tile_map = TileMap::from_file(file.tiles);
        let event_map = EventMap::from_events(
            tile_map.width,
            tile_map.height,
            tile_map.pit_type,
            &file.events,
            init.difficulty,
        );

        let spawner = EventSpawner::with_default_actors();
        for (event, params) in event_map.preload_list() {
            for path in spawner.preload_paths(event, &params) {
                content.preload_metadata(&path);
            }
        }
        for player in init.players.iter().flatten() {
            content.preload_metadata(&player_metadata_path(player));
        }
        let loaded = content.process_loads();
        log::debug!("Preloaded {loaded} metadata entries for \"{}\"", file.name);

        let without_players = LevelInitialization {
            players: [None; MAX_PLAYERS],
            ..init.clone()
        };
        let mut level = Self::with_maps(&without_players, tile_map, event_map, content);
        level.spawner = spawner;
        level.config = file.config;
        level.texts = file.texts;
        level.default_next_level = file.next_level;
        level.secret_level = file.secret_level;
        if file.water_level > 0.0 {
            level.water_level = file.water_level;
        }
        level.spawn_players(init);

        if level.players.is_empty() && init.player_count() > 0 {
            return Err(format!(
                "Level \"{}/{}\" has no usable spawn point",
                init.episode_name, init.level_name
            ));
        }
        log::info!(
            "Level \"{}/{}\" ({}) loaded with {} player(s)",
            init.episode_name,
            init.level_name,
            file.display_name,
            level.players.len()
        );
        Ok(level)
    }

    /// Load the level file at `path` and the metadata registry it names.
    pub fn load(init: &LevelInitialization, path: &Path) -> Result<Self, String> {
        let file = load_level_from_path(path)?;
        let content = load_level_content(&file, path)?;
        Self::from_file(init, file, content)
    }

    fn spawn_players(&mut self, init: &LevelInitialization) {
        for (index, carry) in init.players.iter().enumerate() {
            let Some(carry) = carry else {
                continue;
            };
            let spawn = self
                .event_map
                .spawn_position(carry.player_type.to_u8(), &mut self.rng)
                .or_else(|| {
                    self.event_map
                        .spawn_position(PlayerType::Jazz.to_u8(), &mut self.rng)
                });
            let Some(spawn) = spawn else {
                log::warn!("No spawn point for player {index} ({:?}), skipping", carry.player_type);
                continue;
            };
            let pos = spawn + Vec2::new(index as f32 * PLAYER_SPAWN_SPACING, 0.0);
            let player = Player::with_carry_over(carry, index as u8);
            self.spawn_actor(ActorKind::Player(player), ActorActivationDetails::new(pos));
        }
    }

    pub fn begin_play(&mut self) {
        if self.state == LevelState::Loading {
            self.state = LevelState::Active;
            log::info!("Level \"{}/{}\" started", self.episode_name, self.level_name);
        }
    }

    pub fn pause(&mut self) {
        if self.state == LevelState::Active {
            self.state = LevelState::Paused;
        }
    }

    pub fn resume(&mut self) {
        if self.state == LevelState::Paused {
            self.state = LevelState::Active;
        }
    }

    pub fn state(&self) -> LevelState {
        self.state
    }

    // Frame

    /// Advance one frame. Nothing happens while loading or paused.
    pub fn update(&mut self, time_mult: f32) {
        if matches!(self.state, LevelState::Loading | LevelState::Paused) {
            return;
        }
        self.begin_frame(time_mult);
        self.update_actors(time_mult);
        self.end_frame(time_mult);
    }

    fn begin_frame(&mut self, time_mult: f32) {
        self.content.process_loads();
        self.process_pending_activations();
        self.update_level_change(time_mult);
        self.process_events(time_mult);
        self.check_active_boss();
    }

    fn update_actors(&mut self, time_mult: f32) {
        let handles = self.actors.handles().to_vec();
        for handle in handles {
            if let Some(mut actor) = self.actors.check_out(handle) {
                actor.update(self, time_mult);
                self.return_actor(handle, actor);
            }
        }
    }

    fn end_frame(&mut self, time_mult: f32) {
        self.resolve_collisions();
        self.update_viewports(time_mult);
        self.elapsed_frames += time_mult;
    }

    // Actor access

    pub fn actor(&self, handle: ActorHandle) -> Option<&Actor> {
        self.actors.get(handle)
    }

    pub fn actor_mut(&mut self, handle: ActorHandle) -> Option<&mut Actor> {
        self.actors.get_mut(handle)
    }

    pub fn actor_count(&self) -> usize {
        self.actors.len()
    }

    /// Committed actors in spawn order, except ones currently checked out.
    pub fn iter_actors(&self) -> impl Iterator<Item = &Actor> {
        self.actors.iter()
    }

    pub fn pending_activation_count(&self) -> usize {
        self.pending_activations.len()
    }

    /// Check an actor out of the arena; it stays registered but invisible to
    /// lookups until [`return_actor`](Self::return_actor).
    pub fn take_actor(&mut self, handle: ActorHandle) -> Option<Box<Actor>> {
        self.actors.check_out(handle)
    }

    pub fn return_actor(&mut self, handle: ActorHandle, actor: Box<Actor>) {
        self.actors.check_in(handle, actor);
        self.apply_deferred_scores();
    }

    /// Run `f` with the actor checked out. `None` if the actor is missing or
    /// already checked out.
    pub fn with_actor<R>(
        &mut self,
        handle: ActorHandle,
        f: impl FnOnce(&mut Actor, &mut LevelHandler) -> R,
    ) -> Option<R> {
        let mut actor = self.actors.check_out(handle)?;
        let result = f(&mut actor, self);
        self.return_actor(handle, actor);
        Some(result)
    }

    /// Reserve a handle without activating anything behind it.
    pub fn reserve_handle(&mut self) -> ActorHandle {
        self.actors.reserve()
    }

    pub fn decrease_actor_health(
        &mut self,
        handle: ActorHandle,
        amount: i32,
        collider: Option<ActorHandle>,
    ) {
        self.with_actor(handle, |actor, level| {
            actor.decrease_health(level, amount, collider)
        });
    }

    // Spawning

    /// Activate a new actor. Returns its handle once committed or parked
    /// waiting for metadata; `None` if the actor discarded itself.
    pub fn spawn_actor(
        &mut self,
        kind: ActorKind,
        details: ActorActivationDetails,
    ) -> Option<ActorHandle> {
        let handle = self.actors.reserve();
        let mut actor = Box::new(Actor::new(kind, handle));
        let activation = actor.activate(self, &details);
        self.resolve_activation(handle, actor, activation)
    }

    /// Spawn the actor registered for `event`, as the event map or another
    /// actor would.
    pub fn spawn_event(
        &mut self,
        event: EventType,
        params: &SpawnParams,
        flags: ActorState,
        pos: Vec2,
    ) -> Option<ActorHandle> {
        let kind = self.spawner.create(event, params)?;
        let details = ActorActivationDetails::new(pos)
            .with_params(*params)
            .with_state(flags);
        self.spawn_actor(kind, details)
    }

    /// Warm the content cache for `event`.
    pub fn preload_event(&mut self, event: EventType, params: &SpawnParams) {
        for path in self.spawner.preload_paths(event, params) {
            self.content.preload_metadata(&path);
        }
    }

    pub fn spawner_mut(&mut self) -> &mut EventSpawner {
        &mut self.spawner
    }

    fn resolve_activation(
        &mut self,
        handle: ActorHandle,
        mut actor: Box<Actor>,
        activation: Activation,
    ) -> Option<ActorHandle> {
        match activation {
            Activation::Commit => {
                self.commit_actor(handle, actor);
                Some(handle)
            }
            Activation::Discard => {
                log::debug!("{} discarded during activation", actor.kind.name());
                self.actors.release(handle);
                None
            }
            Activation::Await(path) => match self.content.request_metadata(&path) {
                MetadataRequest::Ready(metadata) => {
                    actor.base.metadata = Some(metadata);
                    let next = actor.metadata_loaded(self);
                    self.resolve_activation(handle, actor, next)
                }
                MetadataRequest::Pending(ticket) => {
                    self.pending_activations.push(PendingActivation {
                        handle,
                        actor,
                        ticket,
                    });
                    Some(handle)
                }
                MetadataRequest::Missing => {
                    log::warn!(
                        "Metadata \"{path}\" not found, {} not spawned",
                        actor.kind.name()
                    );
                    self.actors.release(handle);
                    None
                }
            },
        }
    }

    fn process_pending_activations(&mut self) {
        if self.pending_activations.is_empty() {
            return;
        }
        let pending = std::mem::take(&mut self.pending_activations);
        for entry in pending {
            let PendingActivation {
                handle,
                mut actor,
                ticket,
            } = entry;
            match self.content.poll(&ticket) {
                Some(metadata) => {
                    actor.base.metadata = Some(metadata);
                    let next = actor.metadata_loaded(self);
                    self.resolve_activation(handle, actor, next);
                }
                None => self.pending_activations.push(PendingActivation {
                    handle,
                    actor,
                    ticket,
                }),
            }
        }
    }

    fn commit_actor(&mut self, handle: ActorHandle, mut actor: Box<Actor>) {
        actor.update_hitbox();
        actor.base.update_aabb();
        if wants_proxy(&actor.base.state) {
            actor.base.collision_proxy = self.broad_phase.create_proxy(&actor.base.aabb, handle);
        }
        actor.base.set_state(ActorState::INITIALIZED, true);

        let player_index = actor.kind.as_player().map(Player::index);
        let pos = actor.base.pos;
        if !self.actors.commit(handle, actor) {
            return;
        }
        if let Some(index) = player_index {
            self.players.push(handle);
            if !self.is_multiplayer || self.viewports.is_empty() {
                let mut viewport = Viewport::new(handle, index, DEFAULT_VIEW_SIZE);
                viewport.warp_to(pos);
                self.viewports.push(viewport);
            }
            log::info!("Player {index} joined at ({}, {})", pos.x, pos.y);
        }
    }

    // Level settings

    pub fn episode_name(&self) -> &str {
        &self.episode_name
    }

    pub fn level_name(&self) -> &str {
        &self.level_name
    }

    pub fn difficulty(&self) -> GameDifficulty {
        self.difficulty
    }

    pub fn set_difficulty(&mut self, difficulty: GameDifficulty) {
        self.difficulty = difficulty;
    }

    pub fn is_reforged(&self) -> bool {
        self.is_reforged
    }

    pub fn is_multiplayer(&self) -> bool {
        self.is_multiplayer
    }

    pub fn config(&self) -> &LevelConfig {
        &self.config
    }

    pub fn gravity(&self) -> f32 {
        if self.is_reforged {
            self.config.gravity
        } else {
            self.config.gravity * self.config.classic_gravity_scale
        }
    }

    pub fn water_level(&self) -> f32 {
        self.water_level
    }

    pub fn set_water_level(&mut self, water_level: f32) {
        self.water_level = water_level;
    }

    pub fn weather(&self) -> (u8, u8) {
        self.weather
    }

    pub fn elapsed_frames(&self) -> f32 {
        self.elapsed_frames
    }

    pub fn rng(&mut self) -> &mut GameRng {
        &mut self.rng
    }

    pub fn tile_map(&self) -> &TileMap {
        &self.tile_map
    }

    pub fn tile_map_mut(&mut self) -> &mut TileMap {
        &mut self.tile_map
    }

    pub fn event_map(&self) -> &EventMap {
        &self.event_map
    }

    pub fn event_map_mut(&mut self) -> &mut EventMap {
        &mut self.event_map
    }

    pub fn viewports(&self) -> &[Viewport] {
        &self.viewports
    }

    // Collision queries

    /// True if `aabb` is free of tiles and of solid objects for the actor
    /// described by `base`.
    pub fn is_position_empty(
        &mut self,
        base: &ActorBase,
        aabb: &Aabb,
        params: &mut TileCollisionParams,
    ) -> bool {
        if base.has_state(ActorState::COLLIDE_WITH_TILESET) {
            let mut tile_aabb = *aabb;
            if base.has_state(ActorState::COLLIDE_WITH_TILESET_REDUCED)
                && tile_aabb.height() >= 20.0
            {
                tile_aabb.t += 4.0;
                tile_aabb.l += 2.0;
                tile_aabb.r -= 2.0;
            }
            if !self.tile_map.is_tile_empty(&tile_aabb, params) {
                return false;
            }
        }

        if !base.has_state(ActorState::COLLIDE_WITH_SOLID_OBJECTS) {
            return true;
        }

        let mut blocked = false;
        let actors = &self.actors;
        self.broad_phase
            .query(&aabb.expanded(QUERY_MARGIN), |_, other_handle| {
                if other_handle == base.handle {
                    return true;
                }
                let Some(other) = actors.get(other_handle) else {
                    return true;
                };
                let o = &other.base;
                if !o.has_state(ActorState::IS_SOLID_OBJECT)
                    || o.is_destroyed()
                    || !o.aabb_inner.overlaps(aabb)
                {
                    return true;
                }
                // Solid objects that exclude similar ones never block each other.
                if base.has_state(ActorState::EXCLUDE_SIMILAR)
                    && o.has_state(ActorState::EXCLUDE_SIMILAR)
                {
                    return true;
                }
                if base.has_state(ActorState::COLLIDE_WITH_SOLID_OBJECTS_BELOW)
                    && base.aabb_inner.b > o.aabb_inner.t
                {
                    return true;
                }
                blocked = true;
                false
            });
        !blocked
    }

    pub fn players(&self) -> &[ActorHandle] {
        &self.players
    }

    /// Position of every player that is not checked out.
    pub fn player_positions(&self) -> Vec<(ActorHandle, Vec2)> {
        self.players
            .iter()
            .filter_map(|&h| self.actors.get(h).map(|a| (h, a.base.pos)))
            .collect()
    }

    pub fn get_colliding_players(&self, aabb: &Aabb) -> Vec<ActorHandle> {
        self.players
            .iter()
            .copied()
            .filter(|&h| {
                self.actors
                    .get(h)
                    .is_some_and(|a| !a.is_destroyed() && a.base.aabb_inner.overlaps(aabb))
            })
            .collect()
    }

    /// Live collidable actors whose hitbox overlaps `aabb`.
    pub fn find_collision_actors_by_aabb(&self, aabb: &Aabb) -> Vec<ActorHandle> {
        let mut found = Vec::new();
        self.broad_phase.query(&aabb.expanded(QUERY_MARGIN), |_, handle| {
            if let Some(actor) = self.actors.get(handle) {
                if !actor.is_destroyed() && actor.base.aabb_inner.overlaps(aabb) {
                    found.push(handle);
                }
            }
            true
        });
        found
    }

    /// Live collidable actors whose hitbox comes within `radius` of `pos`.
    pub fn find_collision_actors_by_radius(&self, pos: Vec2, radius: f32) -> Vec<ActorHandle> {
        let area = Aabb::from_center(pos, radius, radius);
        let mut found = Vec::new();
        self.broad_phase.query(&area.expanded(QUERY_MARGIN), |_, handle| {
            if let Some(actor) = self.actors.get(handle) {
                let nearest = actor.base.aabb_inner.clamp_point(pos);
                if !actor.is_destroyed() && nearest.distance(pos) <= radius {
                    found.push(handle);
                }
            }
            true
        });
        found
    }

    /// Dispatch a collision between `target` and `source` this frame even if
    /// their hitboxes don't touch.
    pub fn queue_collision(&mut self, target: ActorHandle, source: ActorHandle) {
        if target != source {
            self.queued_collisions.push((target, source));
        }
    }

    // Score, sound and HUD

    /// Scores for a checked-out player are applied when it is checked in.
    pub fn add_score_to_player(&mut self, handle: ActorHandle, amount: i32) {
        let known = self.actors.contains(handle);
        match self.actors.get_mut(handle) {
            Some(actor) => {
                if let Some(player) = actor.kind.as_player_mut() {
                    player.add_score(amount);
                }
            }
            None if known => self.deferred_scores.push((handle, amount)),
            None => {}
        }
    }

    fn apply_deferred_scores(&mut self) {
        if self.deferred_scores.is_empty() {
            return;
        }
        let deferred = std::mem::take(&mut self.deferred_scores);
        for (handle, amount) in deferred {
            if let Some(actor) = self.actors.get_mut(handle) {
                if let Some(player) = actor.kind.as_player_mut() {
                    player.add_score(amount);
                }
            } else if self.actors.contains(handle) {
                self.deferred_scores.push((handle, amount));
            }
        }
    }

    pub fn play_sfx(&mut self, name: &str, pos: Vec2) {
        self.log_sound(name, pos, false);
    }

    pub fn play_common_sfx(&mut self, name: &str, pos: Vec2) {
        self.log_sound(name, pos, true);
    }

    fn log_sound(&mut self, name: &str, pos: Vec2, common: bool) {
        if self.sounds.len() >= MAX_SOUND_LOG {
            self.sounds.pop_front();
        }
        self.sounds.push_back(SoundEvent {
            name: name.to_string(),
            pos,
            common,
            frame: self.elapsed_frames,
        });
    }

    /// Recently played sounds, oldest first.
    pub fn sounds(&self) -> &VecDeque<SoundEvent> {
        &self.sounds
    }

    pub fn take_sounds(&mut self) -> Vec<SoundEvent> {
        self.sounds.drain(..).collect()
    }

    pub fn show_level_text(&mut self, text: &str) {
        self.hud_messages.push(HudMessage::LevelText(text.to_string()));
    }

    pub fn show_gems(&mut self, player_index: u8, count: i32) {
        self.hud_messages.push(HudMessage::Gems {
            player: player_index,
            count,
        });
    }

    pub fn show_coins(&mut self, count: i32) {
        self.hud_messages.push(HudMessage::Coins { count });
    }

    pub fn hud_messages(&self) -> &[HudMessage] {
        &self.hud_messages
    }

    pub fn take_hud_messages(&mut self) -> Vec<HudMessage> {
        std::mem::take(&mut self.hud_messages)
    }

    pub fn shake_camera_view(&mut self, duration: f32) {
        for viewport in &mut self.viewports {
            viewport.shake(duration);
        }
    }

    pub fn level_text(&self, index: u8) -> Option<String> {
        self.texts.get(index as usize).cloned()
    }

    pub fn set_level_texts(&mut self, texts: Vec<String>) {
        self.texts = texts;
    }

    // Triggers

    /// Handle a level-wide trigger, then let every actor react to it.
    pub fn broadcast_triggered_event(&mut self, event: EventType, params: &SpawnParams) {
        match event {
            EventType::AREA_ACTIVATE_BOSS => self.activate_boss(),
            EventType::MODIFIER_SET_WATER => {
                self.water_level = (read_u16(params, 0) as i32 * TILE_SIZE) as f32;
                log::debug!("Water level set to {}", self.water_level);
            }
            _ => {}
        }

        let handles = self.actors.handles().to_vec();
        for handle in handles {
            self.with_actor(handle, |actor, level| {
                actor.on_triggered_event(level, event, params)
            });
        }
    }

    fn activate_boss(&mut self) {
        if self.active_boss.is_some() {
            return;
        }
        let handles = self.actors.handles().to_vec();
        for handle in handles {
            let is_boss = self.actors.get(handle).is_some_and(|a| a.kind.is_boss());
            if !is_boss {
                continue;
            }
            if self.with_actor(handle, |actor, level| actor.on_activated_boss(level)) == Some(true) {
                log::info!("Boss {handle:?} activated");
                self.active_boss = Some(handle);
                return;
            }
        }

        log::warn!("No boss found for the boss area, skipping to the next level");
        self.begin_level_change(ExitType::Boss, None);
    }

    pub fn active_boss(&self) -> Option<ActorHandle> {
        self.active_boss
    }

    fn check_active_boss(&mut self) {
        let Some(boss) = self.active_boss else {
            return;
        };
        let alive = match self.actors.get(boss) {
            Some(actor) => actor.base.health > 0 && !actor.is_destroyed(),
            None => self.actors.contains(boss),
        };
        if !alive {
            log::info!("Boss {boss:?} defeated");
            self.active_boss = None;
            self.begin_level_change(ExitType::Boss, None);
        }
    }

    // Level change

    /// Start the transition out of the level. Ignored if one is already
    /// running.
    pub fn begin_level_change(&mut self, exit_type: ExitType, next_level: Option<String>) -> bool {
        if self.state == LevelState::LevelChanging {
            return false;
        }
        let time_left = if exit_type.is_fast() {
            self.config.fast_level_change_frames
        } else {
            self.config.level_change_frames
        };
        log::info!(
            "Level change ({exit_type:?}) to {} in {time_left} frames",
            next_level.as_deref().unwrap_or("default next level")
        );
        self.state = LevelState::LevelChanging;
        self.level_change = Some(PendingLevelChange {
            exit_type,
            next_level,
            time_left,
        });
        true
    }

    fn update_level_change(&mut self, time_mult: f32) {
        let Some(change) = &mut self.level_change else {
            return;
        };
        change.time_left -= time_mult;
        if change.time_left > 0.0 || !self.players_ready() {
            return;
        }
        if let Some(change) = self.level_change.take() {
            let next = self.prepare_next_level(change.exit_type, change.next_level);
            log::info!(
                "Level \"{}/{}\" finished, next is \"{}/{}\"",
                self.episode_name,
                self.level_name,
                next.episode_name,
                next.level_name
            );
            self.next_level = Some(next);
        }
    }

    fn players_ready(&self) -> bool {
        self.players
            .iter()
            .all(|&h| self.actors.get(h).map_or(true, |a| !a.base.is_perished()))
    }

    /// Descriptor for the level after this one. An empty level name means
    /// the episode is over.
    pub fn prepare_next_level(
        &self,
        exit_type: ExitType,
        next_level: Option<String>,
    ) -> LevelInitialization {
        let name = next_level
            .or_else(|| {
                (exit_type == ExitType::Bonus)
                    .then(|| self.secret_level.clone())
                    .flatten()
            })
            .or_else(|| self.default_next_level.clone())
            .unwrap_or_default();
        let (episode, level) = match name.split_once('/') {
            Some((episode, level)) => (episode.to_string(), level.to_string()),
            None => (self.episode_name.clone(), name),
        };

        let mut init = LevelInitialization::new(&episode, &level, self.difficulty);
        init.is_reforged = self.is_reforged;
        init.cheats_used = self.cheats_used;
        init.is_multiplayer = self.is_multiplayer;
        init.last_exit_type = exit_type;
        init.seed = self.rng.clone().range_i32(0, i32::MAX) as u64;
        for (index, carry) in self.carry_overs().into_iter().flatten() {
            init.players[index] = Some(carry);
        }
        init
    }

    fn carry_overs(&self) -> Vec<Option<(usize, PlayerCarryOver)>> {
        self.players
            .iter()
            .map(|&h| {
                let player = self.actors.get(h)?.kind.as_player()?;
                let index = player.index() as usize;
                (index < MAX_PLAYERS).then(|| (index, player.carry_over()))
            })
            .collect()
    }

    /// The next level, once the level change has finished.
    pub fn take_next_level(&mut self) -> Option<LevelInitialization> {
        self.next_level.take()
    }

    pub fn is_level_change_finished(&self) -> bool {
        self.next_level.is_some()
    }

    // Checkpoints

    /// Record a checkpoint at the current frame. Every player that can be
    /// reached respawns here.
    pub fn set_checkpoint(&mut self, pos: Vec2) {
        self.checkpoint_frames = self.elapsed_frames;
        self.event_map.create_checkpoint_for_rollback();
        let players = self.players.clone();
        for handle in players {
            if let Some(player) = self
                .actors
                .get_mut(handle)
                .and_then(|a| a.kind.as_player_mut())
            {
                player.set_checkpoint(pos);
            }
        }
        log::info!(
            "Checkpoint at ({}, {}) on frame {}",
            pos.x,
            pos.y,
            self.checkpoint_frames
        );
    }

    pub fn checkpoint_frames(&self) -> f32 {
        self.checkpoint_frames
    }

    /// Destroy everything spawned after the checkpoint and re-arm the event
    /// map as it was then.
    pub fn rollback_to_checkpoint(&mut self) {
        let threshold = self.checkpoint_frames;
        let mut destroyed = 0;
        let handles = self.actors.handles().to_vec();
        for handle in handles {
            if self.players.contains(&handle) {
                continue;
            }
            // Only players may be checked out while rolling back.
            let Some(actor) = self.actors.get_mut(handle) else {
                debug_assert!(
                    !self.actors.contains(handle),
                    "actor {handle:?} checked out during rollback"
                );
                continue;
            };
            if actor.base.spawn_frames > threshold
                && !actor.base.has_state(ActorState::PRESERVE_ON_ROLLBACK)
            {
                let origin = actor.base.origin_tile;
                if actor.base.has_state(ActorState::IS_FROM_GENERATOR) {
                    self.event_map.reset_generator(origin.x, origin.y);
                } else if actor.base.has_state(ActorState::IS_CREATED_FROM_EVENT_MAP) {
                    self.event_map.deactivate(origin.x, origin.y);
                }
                actor.base.destroy();
                destroyed += 1;
            }
        }
        if self.active_boss.is_some_and(|boss| {
            self.actors.get(boss).is_some_and(|a| a.is_destroyed())
        }) {
            self.active_boss = None;
        }

        self.elapsed_frames = threshold;
        let actions = self.event_map.rollback_to_checkpoint();
        self.execute_event_actions(actions);
        log::info!("Rolled back to frame {threshold}, {destroyed} actor(s) removed");
    }

    // Players and input

    pub fn warp_target(&mut self, id: u8) -> Option<Vec2> {
        self.event_map.warp_target(id, &mut self.rng)
    }

    pub fn handle_game_over(&mut self, player_index: u8) {
        if let Some(flag) = self.game_over_players.get_mut(player_index as usize) {
            *flag = true;
        }
        log::info!("Player {player_index} is out of lives");
        let remaining = self
            .players
            .iter()
            .filter_map(|&h| self.actors.get(h)?.kind.as_player())
            .filter(|p| !self.game_over_players[p.index() as usize % MAX_PLAYERS])
            .count();
        if remaining == 0 {
            log::info!("Game over in \"{}/{}\"", self.episode_name, self.level_name);
            self.game_over = true;
        }
    }

    pub fn is_game_over(&self) -> bool {
        self.game_over
    }

    pub fn player_input(&self, index: u8) -> PlayerInput {
        self.player_inputs
            .get(index as usize)
            .copied()
            .unwrap_or_else(PlayerInput::new)
    }

    /// Feed this frame's input for a player; the previous frame's becomes
    /// the edge-detection baseline.
    pub fn set_player_input(&mut self, index: u8, input: ProcessedInput) {
        match self.player_inputs.get_mut(index as usize) {
            Some(slot) => slot.advance(input),
            None => log::warn!("Input for player {index} ignored"),
        }
    }

    pub fn player_input_mut(&mut self, index: u8) -> Option<&mut PlayerInput> {
        self.player_inputs.get_mut(index as usize)
    }

    // Events

    fn process_events(&mut self, time_mult: f32) {
        let positions: Vec<IVec2> = self
            .player_positions()
            .into_iter()
            .map(|(_, pos)| IVec2::new(world_to_tile(pos.x), world_to_tile(pos.y)))
            .collect();
        if positions.is_empty() {
            return;
        }

        let range = self.config.activation_range;
        let keep = range + self.config.deactivation_margin;
        self.deactivate_far_actors(&positions, keep);

        for tile in &positions {
            let actions = self.event_map.activate_events(
                tile.x - range,
                tile.y - range,
                tile.x + range,
                tile.y + range,
                true,
            );
            self.execute_event_actions(actions);
        }

        let actors = &self.actors;
        let actions = self
            .event_map
            .process_generators(time_mult, |h| actors.get(h).is_some_and(|a| !a.is_destroyed()));
        self.execute_event_actions(actions);
    }

    fn deactivate_far_actors(&mut self, player_tiles: &[IVec2], keep: i32) {
        let handles = self.actors.handles().to_vec();
        for handle in handles {
            let Some(actor) = self.actors.get(handle) else {
                continue;
            };
            let from_map = actor
                .base
                .state
                .intersects(ActorState::IS_CREATED_FROM_EVENT_MAP | ActorState::IS_FROM_GENERATOR);
            if !from_map || actor.is_destroyed() {
                continue;
            }
            let origin = actor.base.origin_tile;
            let in_range = player_tiles
                .iter()
                .any(|p| (origin.x - p.x).abs() <= keep && (origin.y - p.y).abs() <= keep);
            if in_range {
                continue;
            }

            let accepted = self
                .with_actor(handle, |actor, level| actor.on_tile_deactivated(level))
                .unwrap_or(false);
            if !accepted {
                continue;
            }
            let Some(actor) = self.actors.get_mut(handle) else {
                continue;
            };
            if actor.base.has_state(ActorState::IS_FROM_GENERATOR) {
                self.event_map.reset_generator(origin.x, origin.y);
            } else {
                self.event_map.deactivate(origin.x, origin.y);
            }
            actor.base.destroy();
        }
    }

    fn execute_event_actions(&mut self, actions: Vec<EventAction>) {
        for action in actions {
            match action {
                EventAction::Spawn {
                    event,
                    params,
                    flags,
                    tile,
                    generator,
                } => {
                    let pos = tile_center(tile);
                    let handle = self.spawn_event(event, &params, flags, pos);
                    if let Some(generator) = generator {
                        self.event_map.set_generator_actor(generator, handle);
                    }
                }
                EventAction::SetWeather {
                    weather_type,
                    intensity,
                } => {
                    self.weather = (weather_type, intensity);
                }
            }
        }
    }

    // Collisions

    fn resolve_collisions(&mut self) {
        self.reap_destroyed_actors();
        self.sync_proxies();

        let mut pairs = Vec::new();
        self.broad_phase.update_pairs(|a, b| pairs.push((a, b)));
        for (a, b) in pairs {
            self.dispatch_collision(a, b, true);
        }

        let queued = std::mem::take(&mut self.queued_collisions);
        for (target, source) in queued {
            self.dispatch_collision(target, source, false);
        }
        self.release_destroyed_proxies();
    }

    /// Actors destroyed while pairs were dispatched lose their proxy now; the
    /// actor itself is reaped next frame.
    fn release_destroyed_proxies(&mut self) {
        let handles = self.actors.handles().to_vec();
        for handle in handles {
            let Some(actor) = self.actors.get_mut(handle) else {
                continue;
            };
            if actor.is_destroyed() && actor.base.collision_proxy != NULL_NODE {
                self.broad_phase.destroy_proxy(actor.base.collision_proxy);
                actor.base.collision_proxy = NULL_NODE;
            }
        }
    }

    fn reap_destroyed_actors(&mut self) {
        let destroyed: Vec<ActorHandle> = self
            .actors
            .iter()
            .filter(|a| a.is_destroyed())
            .map(Actor::handle)
            .collect();
        for handle in destroyed {
            let Some(actor) = self.actors.remove(handle) else {
                continue;
            };
            if actor.base.collision_proxy != NULL_NODE {
                self.broad_phase.destroy_proxy(actor.base.collision_proxy);
            }
            if actor.kind.is_player() {
                self.players.retain(|&h| h != handle);
                self.viewports.retain(|v| v.target != handle);
            }
            if self.active_boss == Some(handle) {
                self.active_boss = None;
                self.begin_level_change(ExitType::Boss, None);
            }
        }
    }

    /// Moved actors get their proxy moved; every other live proxy is touched
    /// so stationary overlapping pairs are still reported.
    fn sync_proxies(&mut self) {
        let handles = self.actors.handles().to_vec();
        for handle in handles {
            let Some(actor) = self.actors.get_mut(handle) else {
                continue;
            };
            let base = &mut actor.base;
            let wants = wants_proxy(&base.state);

            if base.collision_proxy == NULL_NODE {
                if wants {
                    base.update_aabb();
                    base.collision_proxy = self.broad_phase.create_proxy(&base.aabb, handle);
                }
                continue;
            }
            if !wants {
                self.broad_phase.destroy_proxy(base.collision_proxy);
                base.collision_proxy = NULL_NODE;
                continue;
            }

            let moved = base.has_state(ActorState::IS_DIRTY) || base.aabb != base.aabb_inner;
            base.set_state(ActorState::IS_DIRTY, false);
            base.update_aabb();
            if moved {
                self.broad_phase
                    .move_proxy(base.collision_proxy, &base.aabb, base.speed);
            } else {
                self.broad_phase.touch_proxy(base.collision_proxy);
            }
        }
    }

    /// The lower collision priority handles the pair first; the other side
    /// only gets a turn if it declines.
    fn dispatch_collision(&mut self, a: ActorHandle, b: ActorHandle, require_overlap: bool) {
        if a == b {
            return;
        }
        let (first, second) = {
            let (Some(x), Some(y)) = (self.actors.get(a), self.actors.get(b)) else {
                return;
            };
            if x.is_destroyed() || y.is_destroyed() {
                return;
            }
            if require_overlap && !x.base.is_colliding_with(&y.base) {
                return;
            }
            if x.base.has_state(ActorState::EXCLUDE_SIMILAR)
                && y.base.has_state(ActorState::EXCLUDE_SIMILAR)
                && discriminant(&x.kind) == discriminant(&y.kind)
            {
                return;
            }
            if x.kind.collision_priority() <= y.kind.collision_priority() {
                (a, b)
            } else {
                (b, a)
            }
        };

        let Some(mut first_actor) = self.actors.check_out(first) else {
            return;
        };
        let Some(mut second_actor) = self.actors.check_out(second) else {
            self.return_actor(first, first_actor);
            return;
        };
        if !first_actor.handle_collision(self, &mut second_actor) {
            second_actor.handle_collision(self, &mut first_actor);
        }
        self.actors.check_in(second, second_actor);
        self.return_actor(first, first_actor);
    }

    pub fn proxy_count(&self) -> usize {
        self.broad_phase.proxy_count()
    }

    pub fn is_valid_proxy(&self, proxy: ProxyId) -> bool {
        proxy != NULL_NODE && self.broad_phase.is_valid_proxy(proxy)
    }

    // Cameras

    fn update_viewports(&mut self, time_mult: f32) {
        let bounds = self.tile_map.level_bounds();
        for viewport in &mut self.viewports {
            if let Some(actor) = self.actors.get(viewport.target) {
                viewport.update(actor.base.pos, actor.base.speed, &bounds, time_mult);
            }
        }
    }

    // Resumable state

    /// Save the state needed to resume this level from its last checkpoint.
    pub fn serialize_resumable(&self) -> Vec<u8> {
        let mut w = StreamWriter::new();
        let mut flags = 0;
        if self.is_reforged {
            flags |= RESUMABLE_FLAG_REFORGED;
        }
        if self.cheats_used {
            flags |= RESUMABLE_FLAG_CHEATS;
        }
        w.write_u8(flags);
        w.write_string(&self.episode_name);
        w.write_string(&self.level_name);
        w.write_u8(self.difficulty.to_u8());
        w.write_f32(self.checkpoint_frames);
        w.write_f32(self.water_level);
        w.write_u8(self.weather.0);
        w.write_u8(self.weather.1);

        let mut destroyed: Vec<GridCell> = self.tile_map.destroyed_tiles().copied().collect();
        destroyed.sort();
        w.write_u32(destroyed.len() as u32);
        for cell in destroyed {
            w.write_i32(cell.x);
            w.write_i32(cell.y);
        }

        self.event_map.serialize_resumable(&mut w);

        let mut players: Vec<(&Player, i32)> = self
            .players
            .iter()
            .filter_map(|&h| {
                let actor = self.actors.get(h)?;
                Some((actor.kind.as_player()?, actor.base.health))
            })
            .collect();
        players.sort_by_key(|(p, _)| p.index());
        w.write_u8(players.len() as u8);
        for (player, health) in players {
            let pos = player.checkpoint_pos();
            w.write_u8(player.player_type().to_u8());
            w.write_f32(pos.x);
            w.write_f32(pos.y);
            w.write_i32(player.lives());
            w.write_i32(player.score());
            w.write_i32(health);
            for gems in player.gems() {
                w.write_i32(gems);
            }
            w.write_i32(player.food_eaten());
        }
        w.into_bytes()
    }

    /// Restore a state written by [`serialize_resumable`](Self::serialize_resumable)
    /// for this same level. Players are matched by index.
    pub fn initialize_from_stream(&mut self, data: &[u8]) -> Result<(), StreamError> {
        let mut r = StreamReader::new(data);
        let header = read_resumable_header(&mut r)?;
        if header.episode_name != self.episode_name || header.level_name != self.level_name {
            return Err(StreamError::Malformed(format!(
                "state is for \"{}/{}\", not \"{}/{}\"",
                header.episode_name, header.level_name, self.episode_name, self.level_name
            )));
        }
        let checkpoint_frames = r.read_f32()?;
        let water_level = r.read_f32()?;
        let weather = (r.read_u8()?, r.read_u8()?);

        let destroyed_count = r.read_u32()? as usize;
        if destroyed_count.saturating_mul(8) > r.remaining() {
            return Err(StreamError::Truncated {
                offset: r.position(),
                needed: destroyed_count * 8 - r.remaining(),
            });
        }
        let mut destroyed = Vec::with_capacity(destroyed_count);
        for _ in 0..destroyed_count {
            destroyed.push(GridCell {
                x: r.read_i32()?,
                y: r.read_i32()?,
            });
        }

        let mut event_map = self.event_map.clone();
        event_map.initialize_from_stream(&mut r)?;

        let player_count = r.read_u8()? as usize;
        let mut records = Vec::with_capacity(player_count);
        for _ in 0..player_count {
            records.push(PlayerRecord::read(&mut r)?);
        }

        self.is_reforged = header.is_reforged;
        self.cheats_used = header.cheats_used;
        self.difficulty = header.difficulty;
        self.checkpoint_frames = checkpoint_frames;
        self.elapsed_frames = checkpoint_frames;
        self.water_level = water_level;
        self.weather = weather;
        self.tile_map.restore_destroyed(destroyed);
        self.event_map = event_map;

        for (index, record) in records.into_iter().enumerate() {
            self.restore_player(index as u8, record);
        }
        log::info!(
            "Resumed \"{}/{}\" at frame {checkpoint_frames}",
            self.episode_name,
            self.level_name
        );
        Ok(())
    }

    fn restore_player(&mut self, index: u8, record: PlayerRecord) {
        let handle = self.players.iter().copied().find(|&h| {
            self.actors
                .get(h)
                .and_then(|a| a.kind.as_player())
                .is_some_and(|p| p.index() == index)
        });
        let Some(handle) = handle else {
            log::warn!("Saved state for player {index} has no player to restore into");
            return;
        };
        self.with_actor(handle, |actor, level| {
            let Some(player) = actor.kind.as_player_mut() else {
                return;
            };
            if player.player_type().to_u8() != record.player_type {
                log::warn!(
                    "Player {index} was type {} when saved, restoring into {:?}",
                    record.player_type,
                    player.player_type()
                );
            }
            player.restore_progress(record.lives, record.score, record.gems, record.food_eaten);
            player.set_checkpoint(record.pos + Vec2::new(0.0, 20.0));
            actor.base.health = record.health;
            let mut params = TileCollisionParams::default();
            actor
                .base
                .move_instantly(level, record.pos, MoveType::FORCE, &mut params);
            actor.update_hitbox();
        });
        if let Some(viewport) = self.viewports.iter_mut().find(|v| v.target == handle) {
            viewport.warp_to(record.pos);
        }
    }
}

/// The metadata registry a level file names, resolved relative to the file.
pub fn load_level_content(file: &LevelFile, level_path: &Path) -> Result<ContentResolver, String> {
    match &file.metadata_registry {
        Some(registry) => {
            let registry_path = level_path.parent().unwrap_or(Path::new(".")).join(registry);
            ContentResolver::load_registry(&registry_path)
        }
        None => {
            log::warn!("Level {} names no metadata registry", level_path.display());
            Ok(ContentResolver::new())
        }
    }
}

/// What the start of a resumable stream says about the level it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct ResumableHeader {
    pub episode_name: String,
    pub level_name: String,
    pub difficulty: GameDifficulty,
    pub is_reforged: bool,
    pub cheats_used: bool,
}

impl ResumableHeader {
    /// Read just the header, to decide which level to load before resuming.
    pub fn parse(data: &[u8]) -> Result<Self, StreamError> {
        read_resumable_header(&mut StreamReader::new(data))
    }

    pub fn to_initialization(&self) -> LevelInitialization {
        let mut init = LevelInitialization::new(&self.episode_name, &self.level_name, self.difficulty);
        init.is_reforged = self.is_reforged;
        init.cheats_used = self.cheats_used;
        init
    }
}

fn read_resumable_header(r: &mut StreamReader) -> Result<ResumableHeader, StreamError> {
    let flags = r.read_u8()?;
    let episode_name = r.read_string()?;
    let level_name = r.read_string()?;
    let difficulty_raw = r.read_u8()?;
    let difficulty = GameDifficulty::from_u8(difficulty_raw)
        .ok_or_else(|| StreamError::Malformed(format!("unknown difficulty {difficulty_raw}")))?;
    Ok(ResumableHeader {
        episode_name,
        level_name,
        difficulty,
        is_reforged: flags & RESUMABLE_FLAG_REFORGED != 0,
        cheats_used: flags & RESUMABLE_FLAG_CHEATS != 0,
    })
}

#[derive(Debug, Clone, Copy)]
struct PlayerRecord {
    player_type: u8,
    pos: Vec2,
    lives: i32,
    score: i32,
    health: i32,
    gems: [i32; 4],
    food_eaten: i32,
}

impl PlayerRecord {
    fn read(r: &mut StreamReader) -> Result<Self, StreamError> {
        let player_type = r.read_u8()?;
        let pos = Vec2::new(r.read_f32()?, r.read_f32()?);
        let lives = r.read_i32()?;
        let score = r.read_i32()?;
        let health = r.read_i32()?;
        let mut gems = [0; 4];
        for slot in &mut gems {
            *slot = r.read_i32()?;
        }
        Ok(Self {
            player_type,
            pos,
            lives,
            score,
            health,
            gems,
            food_eaten: r.read_i32()?,
        })
    }
}

fn wants_proxy(state: &ActorState) -> bool {
    state.contains(ActorState::COLLIDE_WITH_OTHER_ACTORS)
        && !state.contains(ActorState::FORCE_DISABLE_COLLISIONS)
}

pub fn tile_center(tile: IVec2) -> Vec2 {
    Vec2::new(
        (tile.x * TILE_SIZE + TILE_SIZE / 2) as f32,
        (tile.y * TILE_SIZE + TILE_SIZE / 2) as f32,
    )
}

fn player_metadata_path(carry: &PlayerCarryOver) -> String {
    format!("Interactive/Player{:?}", carry.player_type)
}
