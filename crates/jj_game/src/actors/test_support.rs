//! Level fixtures shared by the actor tests.

use glam::Vec2;
use jj_core::animation::parse_metadata_registry;

use super::{ActorActivationDetails, ActorHandle, ActorKind};
use crate::config::{GameDifficulty, LevelInitialization};
use crate::content::ContentResolver;
use crate::events::event_map::EventMap;
use crate::level_handler::LevelHandler;
use crate::tiles::TileMap;

/// Top edge of the floor row in [`floor_level`].
pub const FLOOR_Y: f32 = 320.0;
const FLOOR_ROW: i32 = 10;

const REGISTRY: &str = include_str!("../../../../assets/metadata/registry.json");

/// Every registry entry loaded up front, so spawns commit synchronously.
pub fn test_content() -> ContentResolver {
    let entries = parse_metadata_registry(REGISTRY).expect("test registry parses");
    let paths: Vec<String> = entries.iter().map(|m| m.path.clone()).collect();
    let mut content = ContentResolver::from_registry(entries);
    for path in &paths {
        content.preload_metadata(path);
    }
    content.process_loads();
    content
}

/// An open level without tiles or events.
pub fn test_level(width: i32, height: i32) -> LevelHandler {
    let init = LevelInitialization {
        seed: 7,
        ..LevelInitialization::new("test", "unit", GameDifficulty::Normal)
    };
    let tile_map = TileMap::empty(width, height);
    let event_map = EventMap::new(width, height, tile_map.pit_type);
    let mut level = LevelHandler::with_maps(&init, tile_map, event_map, test_content());
    level.begin_play();
    level
}

/// 40x12 tiles with a solid floor whose top edge is at [`FLOOR_Y`].
pub fn floor_level() -> LevelHandler {
    let mut level = test_level(40, 12);
    for x in 0..40 {
        level.tile_map_mut().set_solid(x, FLOOR_ROW, true);
    }
    level
}

pub fn spawn(level: &mut LevelHandler, kind: ActorKind, pos: Vec2) -> ActorHandle {
    let name = kind.name();
    level
        .spawn_actor(kind, ActorActivationDetails::new(pos))
        .unwrap_or_else(|| panic!("{name} should activate"))
}

pub fn run_frames(level: &mut LevelHandler, frames: usize) {
    for _ in 0..frames {
        level.update(1.0);
    }
}
