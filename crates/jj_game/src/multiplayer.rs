//! Networked play on top of [`LevelHandler`].
//!
//! Transport is someone else's job; this layer only decides whose input
//! drives which player and how player state is packed for the wire. Positions
//! travel as fixed point (`* 512` in an `i32`), speeds as `* 512` in an `i16`.
//! A client that receives a snapshot far enough from its own simulation snaps
//! the player to the authoritative position.

use glam::Vec2;
use jj_core::input::{ProcessedInput, MAX_PLAYERS};

use crate::actors::{ActorHandle, MoveType};
use crate::level_handler::LevelHandler;
use crate::resumable::{StreamError, StreamReader, StreamWriter};
use crate::tiles::TileCollisionParams;

const FIXED_POINT_SCALE: f32 = 512.0;
/// Drift beyond this many pixels is corrected from the snapshot.
pub const CORRECTION_THRESHOLD: f32 = 16.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerRole {
    Server,
    Client,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerSnapshot {
    pub index: u8,
    pub pos_x: i32,
    pub pos_y: i32,
    pub speed_x: i16,
    pub speed_y: i16,
}

impl PlayerSnapshot {
    pub fn new(index: u8, pos: Vec2, speed: Vec2) -> Self {
        Self {
            index,
            pos_x: (pos.x * FIXED_POINT_SCALE) as i32,
            pos_y: (pos.y * FIXED_POINT_SCALE) as i32,
            speed_x: (speed.x * FIXED_POINT_SCALE).clamp(i16::MIN as f32, i16::MAX as f32) as i16,
            speed_y: (speed.y * FIXED_POINT_SCALE).clamp(i16::MIN as f32, i16::MAX as f32) as i16,
        }
    }

    pub fn pos(&self) -> Vec2 {
        Vec2::new(self.pos_x as f32, self.pos_y as f32) / FIXED_POINT_SCALE
    }

    pub fn speed(&self) -> Vec2 {
        Vec2::new(self.speed_x as f32, self.speed_y as f32) / FIXED_POINT_SCALE
    }

    fn write(&self, w: &mut StreamWriter) {
        w.write_u8(self.index);
        w.write_i32(self.pos_x);
        w.write_i32(self.pos_y);
        w.write_i16(self.speed_x);
        w.write_i16(self.speed_y);
    }

    fn read(r: &mut StreamReader) -> Result<Self, StreamError> {
        Ok(Self {
            index: r.read_u8()?,
            pos_x: r.read_i32()?,
            pos_y: r.read_i32()?,
            speed_x: r.read_i16()?,
            speed_y: r.read_i16()?,
        })
    }
}

pub fn encode_snapshots(snapshots: &[PlayerSnapshot]) -> Vec<u8> {
    let mut w = StreamWriter::new();
    w.write_u8(snapshots.len() as u8);
    for snapshot in snapshots {
        snapshot.write(&mut w);
    }
    w.into_bytes()
}

pub fn decode_snapshots(data: &[u8]) -> Result<Vec<PlayerSnapshot>, StreamError> {
    let mut r = StreamReader::new(data);
    let count = r.read_u8()? as usize;
    if count > MAX_PLAYERS {
        return Err(StreamError::Malformed(format!("{count} player snapshots")));
    }
    (0..count).map(|_| PlayerSnapshot::read(&mut r)).collect()
}

pub struct MultiLevelHandler {
    level: LevelHandler,
    role: PeerRole,
    local_players: [bool; MAX_PLAYERS],
    remote_inputs: [Option<ProcessedInput>; MAX_PLAYERS],
    corrections: u32,
}

impl MultiLevelHandler {
    pub fn new(level: LevelHandler, role: PeerRole) -> Self {
        Self {
            level,
            role,
            local_players: [false; MAX_PLAYERS],
            remote_inputs: [None; MAX_PLAYERS],
            corrections: 0,
        }
    }

    pub fn level(&self) -> &LevelHandler {
        &self.level
    }

    pub fn level_mut(&mut self) -> &mut LevelHandler {
        &mut self.level
    }

    pub fn into_level(self) -> LevelHandler {
        self.level
    }

    pub fn role(&self) -> PeerRole {
        self.role
    }

    pub fn set_local_player(&mut self, index: u8, local: bool) {
        if let Some(slot) = self.local_players.get_mut(index as usize) {
            *slot = local;
        }
    }

    pub fn is_local_player(&self, index: u8) -> bool {
        self.local_players.get(index as usize).copied().unwrap_or(false)
    }

    pub fn set_local_input(&mut self, index: u8, input: ProcessedInput) {
        if self.is_local_player(index) {
            self.level.set_player_input(index, input);
        } else {
            log::warn!("Local input for remote player {index} ignored");
        }
    }

    /// Remote input replaces the player's input on the next update; the last
    /// received input repeats until a newer one arrives.
    pub fn set_remote_input(&mut self, index: u8, input: ProcessedInput) {
        if self.is_local_player(index) {
            log::debug!("Remote input for local player {index} ignored");
            return;
        }
        if let Some(slot) = self.remote_inputs.get_mut(index as usize) {
            *slot = Some(input);
        }
    }

    pub fn update(&mut self, time_mult: f32) {
        for (index, input) in self.remote_inputs.iter().enumerate() {
            if let Some(input) = input {
                self.level.set_player_input(index as u8, *input);
            }
        }
        self.level.update(time_mult);
    }

    pub fn snapshot_players(&self) -> Vec<PlayerSnapshot> {
        self.level
            .players()
            .iter()
            .filter_map(|&h| {
                let actor = self.level.actor(h)?;
                let player = actor.kind.as_player()?;
                Some(PlayerSnapshot::new(player.index(), actor.base.pos, actor.base.speed))
            })
            .collect()
    }

    /// Apply an authoritative snapshot. Returns true if the player was moved.
    pub fn apply_snapshot(&mut self, snapshot: &PlayerSnapshot) -> bool {
        if self.role == PeerRole::Server {
            return false;
        }
        let Some(handle) = self.find_player(snapshot.index) else {
            log::debug!("Snapshot for unknown player {}", snapshot.index);
            return false;
        };
        let target = snapshot.pos();
        let corrected = self
            .level
            .with_actor(handle, |actor, level| {
                if actor.base.pos.distance(target) <= CORRECTION_THRESHOLD {
                    return false;
                }
                let mut params = TileCollisionParams::default();
                actor
                    .base
                    .move_instantly(level, target, MoveType::FORCE, &mut params);
                actor.base.speed = snapshot.speed();
                actor.update_hitbox();
                true
            })
            .unwrap_or(false);
        if corrected {
            self.corrections += 1;
            log::debug!(
                "Player {} corrected to ({}, {})",
                snapshot.index,
                target.x,
                target.y
            );
        }
        corrected
    }

    pub fn corrections(&self) -> u32 {
        self.corrections
    }

    fn find_player(&self, index: u8) -> Option<ActorHandle> {
        self.level.players().iter().copied().find(|&h| {
            self.level
                .actor(h)
                .and_then(|a| a.kind.as_player())
                .is_some_and(|p| p.index() == index)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actors::player::Player;
    use crate::actors::test_support::{floor_level, spawn, FLOOR_Y};
    use crate::actors::ActorKind;
    use crate::config::PlayerType;
    use jj_core::input::PlayerAction;

    fn client_with_player() -> (MultiLevelHandler, ActorHandle) {
        let mut level = floor_level();
        let handle = spawn(
            &mut level,
            ActorKind::Player(Player::new(PlayerType::Spaz, 0)),
            Vec2::new(100.0, FLOOR_Y - 20.0),
        );
        (MultiLevelHandler::new(level, PeerRole::Client), handle)
    }

    #[test]
    fn test_snapshot_fixed_point_precision() {
        let snapshot = PlayerSnapshot::new(1, Vec2::new(100.25, -3.5), Vec2::new(2.5, -8.0));
        assert_eq!(snapshot.pos_x, 51_328);
        assert_eq!(snapshot.pos(), Vec2::new(100.25, -3.5));
        assert_eq!(snapshot.speed(), Vec2::new(2.5, -8.0));

        let fast = PlayerSnapshot::new(0, Vec2::ZERO, Vec2::new(1000.0, 0.0));
        assert_eq!(fast.speed_x, i16::MAX);
    }

    #[test]
    fn test_snapshots_decode_what_was_encoded() {
        let snapshots = vec![
            PlayerSnapshot::new(0, Vec2::new(10.0, 20.0), Vec2::ZERO),
            PlayerSnapshot::new(1, Vec2::new(30.0, 40.0), Vec2::new(1.0, 0.0)),
        ];
        let data = encode_snapshots(&snapshots);
        assert_eq!(data.len(), 1 + 2 * 13);
        assert_eq!(decode_snapshots(&data).expect("decodes"), snapshots);
        assert!(matches!(
            decode_snapshots(&data[..5]),
            Err(StreamError::Truncated { .. })
        ));
    }

    #[test]
    fn test_small_drift_is_left_alone() {
        let (mut mp, handle) = client_with_player();
        let pos = mp.level().actor(handle).expect("player").base.pos;
        let snapshot = PlayerSnapshot::new(0, pos + Vec2::new(10.0, 0.0), Vec2::ZERO);
        assert!(!mp.apply_snapshot(&snapshot));
        assert_eq!(mp.corrections(), 0);
    }

    #[test]
    fn test_large_drift_is_corrected() {
        let (mut mp, handle) = client_with_player();
        let snapshot = PlayerSnapshot::new(0, Vec2::new(300.0, FLOOR_Y - 20.0), Vec2::new(1.0, 0.0));
        assert!(mp.apply_snapshot(&snapshot));
        let actor = mp.level().actor(handle).expect("player");
        assert!((actor.base.pos.x - 300.0).abs() < 0.01);
        assert_eq!(mp.corrections(), 1);
    }

    #[test]
    fn test_server_ignores_snapshots() {
        let mut level = floor_level();
        spawn(
            &mut level,
            ActorKind::Player(Player::new(PlayerType::Jazz, 0)),
            Vec2::new(100.0, FLOOR_Y - 20.0),
        );
        let mut mp = MultiLevelHandler::new(level, PeerRole::Server);
        assert!(!mp.apply_snapshot(&PlayerSnapshot::new(0, Vec2::new(500.0, 0.0), Vec2::ZERO)));
    }

    #[test]
    fn test_remote_input_drives_player() {
        let (mut mp, handle) = client_with_player();
        let right = ProcessedInput {
            movement: Vec2::new(1.0, 0.0),
            ..ProcessedInput::default()
        }
        .with(PlayerAction::Right);
        mp.set_remote_input(0, right);
        let start = mp.level().actor(handle).expect("player").base.pos.x;
        for _ in 0..20 {
            mp.update(1.0);
        }
        let end = mp.level().actor(handle).expect("player").base.pos.x;
        assert!(end > start + 10.0, "player should walk right, moved {}", end - start);
    }

    #[test]
    fn test_local_and_remote_inputs_are_separated() {
        let (mut mp, _) = client_with_player();
        mp.set_local_player(0, true);
        mp.set_remote_input(0, ProcessedInput::default().with(PlayerAction::Fire));
        assert!(mp.remote_inputs[0].is_none());
        mp.set_local_input(0, ProcessedInput::default().with(PlayerAction::Fire));
        assert!(mp.level().player_input(0).is_pressed(PlayerAction::Fire));
    }
}
