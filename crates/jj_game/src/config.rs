//! Level description files, level-wide tunables and the descriptors passed
//! between levels.

use crate::events::event_type::EventType;
use crate::tiles::{validate_tile_map_file, TileMapFile};
use jj_core::input::MAX_PLAYERS;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GameDifficulty {
    Easy,
    #[default]
    Normal,
    Hard,
}

impl GameDifficulty {
    /// Bit in the event flags marking an event present on this difficulty.
    pub fn event_bit(self) -> u8 {
        match self {
            Self::Easy => 4,
            Self::Normal => 5,
            Self::Hard => 6,
        }
    }

    pub fn to_u8(self) -> u8 {
        match self {
            Self::Easy => 0,
            Self::Normal => 1,
            Self::Hard => 2,
        }
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Easy),
            1 => Some(Self::Normal),
            2 => Some(Self::Hard),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayerType {
    Jazz,
    Spaz,
    Lori,
}

impl PlayerType {
    /// 1-based, matching the spawn point type masks in level data.
    pub fn to_u8(self) -> u8 {
        match self {
            Self::Jazz => 1,
            Self::Spaz => 2,
            Self::Lori => 3,
        }
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Jazz),
            2 => Some(Self::Spaz),
            3 => Some(Self::Lori),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExitType {
    #[default]
    None,
    Normal,
    Warp,
    Bonus,
    Special,
    Boss,
}

impl ExitType {
    /// Level data stores the exit kind as a byte; unknown values are normal exits.
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::None,
            2 => Self::Warp,
            3 => Self::Bonus,
            4 => Self::Special,
            5 => Self::Boss,
            _ => Self::Normal,
        }
    }

    pub fn to_u8(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Normal => 1,
            Self::Warp => 2,
            Self::Bonus => 3,
            Self::Special => 4,
            Self::Boss => 5,
        }
    }

    /// Warp, bonus and boss exits skip the long fade.
    pub fn is_fast(self) -> bool {
        matches!(self, Self::Warp | Self::Bonus | Self::Boss)
    }
}

/// Tunables shared by every actor in a level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelConfig {
    #[serde(default = "default_gravity")]
    pub gravity: f32,
    /// Gravity is scaled by this outside reforged mode.
    #[serde(default = "default_classic_gravity_scale")]
    pub classic_gravity_scale: f32,
    /// Events within this many tiles of a player are active.
    #[serde(default = "default_activation_range")]
    pub activation_range: i32,
    /// Extra tiles beyond the activation range before actors deactivate.
    #[serde(default = "default_deactivation_margin")]
    pub deactivation_margin: i32,
    #[serde(default = "default_level_change_frames")]
    pub level_change_frames: f32,
    #[serde(default = "default_fast_level_change_frames")]
    pub fast_level_change_frames: f32,
    #[serde(default = "default_lives")]
    pub default_lives: i32,
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            gravity: default_gravity(),
            classic_gravity_scale: default_classic_gravity_scale(),
            activation_range: default_activation_range(),
            deactivation_margin: default_deactivation_margin(),
            level_change_frames: default_level_change_frames(),
            fast_level_change_frames: default_fast_level_change_frames(),
            default_lives: default_lives(),
        }
    }
}

const fn default_gravity() -> f32 {
    0.3
}

const fn default_classic_gravity_scale() -> f32 {
    0.8
}

const fn default_activation_range() -> i32 {
    26
}

const fn default_deactivation_margin() -> i32 {
    4
}

const fn default_level_change_frames() -> f32 {
    360.0
}

const fn default_fast_level_change_frames() -> f32 {
    70.0
}

const fn default_lives() -> i32 {
    3
}

/// One event record in a level file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EventEntry {
    pub x: i32,
    pub y: i32,
    pub event: EventType,
    /// 0x02 generator, 0x04 illuminated, bits 4-6 difficulty, 0x80 multiplayer only.
    #[serde(default = "default_event_flags")]
    pub flags: u8,
    #[serde(default)]
    pub params: Vec<u8>,
    /// 0x01 delays the first spawn.
    #[serde(default)]
    pub generator_flags: u8,
    /// Seconds between generator spawns.
    #[serde(default)]
    pub generator_delay: u8,
}

const fn default_event_flags() -> u8 {
    0x70
}

#[derive(Debug, Clone, Deserialize)]
pub struct LevelFile {
    pub version: String,
    pub name: String,
    #[serde(default)]
    pub episode: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub next_level: Option<String>,
    #[serde(default)]
    pub secret_level: Option<String>,
    /// Relative to the level file.
    #[serde(default)]
    pub metadata_registry: Option<String>,
    pub tiles: TileMapFile,
    #[serde(default)]
    pub events: Vec<EventEntry>,
    /// Strings referenced by index from event parameters.
    #[serde(default)]
    pub texts: Vec<String>,
    #[serde(default = "default_water_level")]
    pub water_level: f32,
    #[serde(default)]
    pub config: LevelConfig,
}

const fn default_water_level() -> f32 {
    f32::MAX
}

pub fn load_level_from_path(path: &Path) -> Result<LevelFile, String> {
    let raw =
        fs::read_to_string(path).map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    let level: LevelFile = serde_json::from_str(&raw)
        .map_err(|e| format!("Failed to parse level JSON {}: {e}", path.display()))?;
    validate_level_file(&level)?;
    Ok(level)
}

pub fn validate_level_file(level: &LevelFile) -> Result<(), String> {
    if level.version != "0.1" {
        return Err(format!(
            "Level validation failed: unsupported version '{}'",
            level.version
        ));
    }
    if level.name.is_empty() {
        return Err("Level validation failed: name is empty".to_string());
    }
    validate_tile_map_file(&level.tiles)?;
    for event in &level.events {
        if event.x < 0 || event.y < 0 || event.x >= level.tiles.width || event.y >= level.tiles.height
        {
            return Err(format!(
                "Level validation failed: event {} out of bounds ({}, {})",
                event.event, event.x, event.y
            ));
        }
        if event.params.len() > crate::events::params::SPAWN_PARAMS_SIZE {
            return Err(format!(
                "Level validation failed: event {} at ({}, {}) has {} parameter bytes",
                event.event,
                event.x,
                event.y,
                event.params.len()
            ));
        }
    }
    if level.config.gravity < 0.0 {
        return Err("Level validation failed: gravity must be >= 0".to_string());
    }
    Ok(())
}

/// Player progress carried into the next level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerCarryOver {
    pub player_type: PlayerType,
    pub lives: i32,
    pub score: i32,
    pub gems: [i32; 4],
    pub food_eaten: i32,
}

/// Everything needed to start a level.
#[derive(Debug, Clone)]
pub struct LevelInitialization {
    pub episode_name: String,
    pub level_name: String,
    pub difficulty: GameDifficulty,
    pub is_reforged: bool,
    pub cheats_used: bool,
    pub is_multiplayer: bool,
    pub last_exit_type: ExitType,
    pub seed: u64,
    pub players: [Option<PlayerCarryOver>; MAX_PLAYERS],
}

impl LevelInitialization {
    pub fn new(episode: &str, level: &str, difficulty: GameDifficulty) -> Self {
        Self {
            episode_name: episode.to_string(),
            level_name: level.to_string(),
            difficulty,
            is_reforged: true,
            cheats_used: false,
            is_multiplayer: false,
            last_exit_type: ExitType::None,
            seed: 0,
            players: [None; MAX_PLAYERS],
        }
    }

    /// Single-player start with the given character.
    pub fn with_player(mut self, player_type: PlayerType, lives: i32) -> Self {
        self.players[0] = Some(PlayerCarryOver {
            player_type,
            lives,
            score: 0,
            gems: [0; 4],
            food_eaten: 0,
        });
        self
    }

    pub fn player_count(&self) -> usize {
        self.players.iter().filter(|p| p.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_file_path(name_hint: &str) -> std::path::PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "jj_level_test_{}_{}_{}.json",
            name_hint,
            std::process::id(),
            nanos
        ))
    }

    #[test]
    fn test_level_file_loads_with_defaults() {
        let path = temp_file_path("defaults");
        fs::write(
            &path,
            r#"{
              "version": "0.1",
              "name": "01_castle1",
              "episode": "prince",
              "tiles": { "width": 16, "height": 8 },
              "events": [
                { "x": 2, "y": 6, "event": 256, "params": [1] },
                { "x": 9, "y": 6, "event": 410 }
              ]
            }"#,
        )
        .expect("write level file");

        let level = load_level_from_path(&path).expect("level should load");
        assert_eq!(level.events.len(), 2);
        assert_eq!(level.events[0].event, EventType::LEVEL_START);
        assert_eq!(level.events[1].event, EventType::ENEMY_CRAB);
        assert_eq!(level.events[1].flags, 0x70);
        assert_eq!(level.water_level, f32::MAX);
        assert_eq!(level.config.activation_range, 26);
        assert!((level.config.gravity - 0.3).abs() < f32::EPSILON);

        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_event_outside_map_is_rejected() {
        let level: LevelFile = serde_json::from_str(
            r#"{ "version": "0.1", "name": "x", "tiles": { "width": 4, "height": 4 },
                 "events": [ { "x": 4, "y": 0, "event": 64 } ] }"#,
        )
        .expect("parse level");
        let err = validate_level_file(&level).expect_err("out of bounds event");
        assert!(err.contains("out of bounds"));
    }

    #[test]
    fn test_difficulty_bits() {
        assert_eq!(GameDifficulty::Easy.event_bit(), 4);
        assert_eq!(GameDifficulty::Normal.event_bit(), 5);
        assert_eq!(GameDifficulty::Hard.event_bit(), 6);
        assert_eq!(GameDifficulty::from_u8(2), Some(GameDifficulty::Hard));
        assert_eq!(GameDifficulty::from_u8(9), None);
    }
}
