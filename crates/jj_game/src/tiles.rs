//! Tile map collision surface.
//!
//! Gameplay solidity lives in a coarse grid of 32x32 tiles, loaded from the
//! level description. Actors never move through the grid directly; they probe
//! candidate hitboxes with [`TileMap::is_tile_empty`] and the movement code
//! decides what to do with the answer.
//!
//! Three kinds of tiles are understood:
//!  - **solid** tiles always block.
//!  - **one-way** tiles only block hitboxes moving downwards, so actors can
//!    jump up through them and land on top.
//!  - **destructible** tiles block until a weapon with enough strength hits
//!    them. Destroyed tiles are part of the resumable state.
//!
//! The left and right level edges behave like walls. Everything above the top
//! edge is empty. Below the bottom edge is empty too, unless the pit type is
//! `StandOnPlatform`; falling out of the level is handled by the event map.

use jj_core::Aabb;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};

pub const TILE_SIZE: i32 = 32;

#[derive(Debug, Deserialize, Clone)]
pub struct TileMapFile {
    pub width: i32,
    pub height: i32,
    #[serde(default)]
    pub solids: Vec<GridCell>,
    #[serde(default)]
    pub one_way: Vec<GridCell>,
    #[serde(default)]
    pub destructible: Vec<DestructibleCell>,
    #[serde(default)]
    pub pit_type: PitType,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridCell {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct DestructibleCell {
    pub x: i32,
    pub y: i32,
    /// Weapon strength required to break the tile.
    #[serde(default = "default_hardness")]
    pub hardness: i32,
}

const fn default_hardness() -> i32 {
    1
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum PitType {
    #[default]
    FallForever,
    InstantDeathPit,
    StandOnPlatform,
}

/// How a tile probe should treat one-way and destructible tiles.
#[derive(Debug, Clone, Copy, Default)]
pub struct TileCollisionParams {
    pub downwards: bool,
    /// Strength of the weapon doing the probe; destructible tiles with a
    /// hardness at or below it are destroyed instead of blocking.
    pub weapon_strength: i32,
    /// Number of tiles destroyed during the probe.
    pub tiles_destroyed: u32,
}

impl TileCollisionParams {
    pub fn downwards(downwards: bool) -> Self {
        Self {
            downwards,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct TileMap {
    pub width: i32,
    pub height: i32,
    pub pit_type: PitType,
    solids: HashSet<GridCell>,
    one_way: HashSet<GridCell>,
    destructible: HashMap<GridCell, i32>,
    destroyed: BTreeSet<GridCell>,
}

impl TileMap {
    pub fn from_file(file: TileMapFile) -> Self {
        Self {
            width: file.width,
            height: file.height,
            pit_type: file.pit_type,
            solids: file.solids.into_iter().collect(),
            one_way: file.one_way.into_iter().collect(),
            destructible: file
                .destructible
                .into_iter()
                .map(|c| (GridCell { x: c.x, y: c.y }, c.hardness))
                .collect(),
            destroyed: BTreeSet::new(),
        }
    }

    /// An open map of the given size, used by headless runs and tests.
    pub fn empty(width: i32, height: i32) -> Self {
        Self::from_file(TileMapFile {
            width,
            height,
            solids: Vec::new(),
            one_way: Vec::new(),
            destructible: Vec::new(),
            pit_type: PitType::default(),
        })
    }

    pub fn set_solid(&mut self, x: i32, y: i32, solid: bool) {
        if solid {
            self.solids.insert(GridCell { x, y });
        } else {
            self.solids.remove(&GridCell { x, y });
        }
    }

    pub fn set_destructible(&mut self, x: i32, y: i32, hardness: i32) {
        let cell = GridCell { x, y };
        self.destroyed.remove(&cell);
        self.destructible.insert(cell, hardness.max(1));
    }

    pub fn level_bounds(&self) -> Aabb {
        Aabb::new(
            0.0,
            0.0,
            (self.width * TILE_SIZE) as f32,
            (self.height * TILE_SIZE) as f32,
        )
    }

    pub fn is_solid(&self, x: i32, y: i32) -> bool {
        if x < 0 || x >= self.width {
            return true;
        }
        if y >= self.height {
            return self.pit_type == PitType::StandOnPlatform;
        }
        if y < 0 {
            return false;
        }
        let cell = GridCell { x, y };
        self.solids.contains(&cell)
            || (self.destructible.contains_key(&cell) && !self.destroyed.contains(&cell))
    }

    /// True if no tile blocks `aabb`. Breakable tiles hit with enough weapon
    /// strength are destroyed and reported through `params.tiles_destroyed`.
    pub fn is_tile_empty(&mut self, aabb: &Aabb, params: &mut TileCollisionParams) -> bool {
        let mut empty = true;
        for (x, y) in covered_tiles(aabb) {
            let cell = GridCell { x, y };
            if params.weapon_strength > 0 {
                if let Some(&hardness) = self.destructible.get(&cell) {
                    if !self.destroyed.contains(&cell) && hardness <= params.weapon_strength {
                        self.destroyed.insert(cell);
                        params.tiles_destroyed += 1;
                        log::debug!("Tile ({x}, {y}) destroyed");
                        continue;
                    }
                }
            }
            if self.blocks(cell, aabb, params.downwards) {
                empty = false;
            }
        }
        empty
    }

    /// Read-only probe that never destroys tiles.
    pub fn is_tile_empty_static(&self, aabb: &Aabb, downwards: bool) -> bool {
        covered_tiles(aabb).all(|(x, y)| !self.blocks(GridCell { x, y }, aabb, downwards))
    }

    fn blocks(&self, cell: GridCell, aabb: &Aabb, downwards: bool) -> bool {
        if self.is_solid(cell.x, cell.y) {
            return true;
        }
        if downwards && self.one_way.contains(&cell) {
            // One-way tiles only catch the bottom edge.
            let tile_top = (cell.y * TILE_SIZE) as f32;
            return aabb.b >= tile_top && aabb.b - tile_top <= 8.0;
        }
        false
    }

    pub fn destroyed_tiles(&self) -> impl Iterator<Item = &GridCell> {
        self.destroyed.iter()
    }

    /// Restore destroyed tiles from a resumable state.
    pub fn restore_destroyed(&mut self, cells: impl IntoIterator<Item = GridCell>) {
        self.destroyed = cells
            .into_iter()
            .filter(|c| self.destructible.contains_key(c))
            .collect();
    }
}

pub fn world_to_tile(world: f32) -> i32 {
    (world / TILE_SIZE as f32).floor() as i32
}

fn covered_tiles(aabb: &Aabb) -> impl Iterator<Item = (i32, i32)> {
    const EPS: f32 = 0.001;
    let x0 = world_to_tile(aabb.l + EPS);
    let x1 = world_to_tile(aabb.r - EPS);
    let y0 = world_to_tile(aabb.t + EPS);
    let y1 = world_to_tile(aabb.b - EPS);
    (y0..=y1).flat_map(move |y| (x0..=x1).map(move |x| (x, y)))
}

pub fn validate_tile_map_file(file: &TileMapFile) -> Result<(), String> {
    if file.width <= 0 || file.height <= 0 {
        return Err("Tile map validation failed: width and height must be > 0".to_string());
    }

    let mut seen = HashSet::new();
    let all = file
        .solids
        .iter()
        .copied()
        .chain(file.one_way.iter().copied())
        .chain(file.destructible.iter().map(|c| GridCell { x: c.x, y: c.y }));
    for cell in all {
        if cell.x < 0 || cell.x >= file.width || cell.y < 0 || cell.y >= file.height {
            return Err(format!(
                "Tile map validation failed: cell out of bounds ({}, {})",
                cell.x, cell.y
            ));
        }
        if !seen.insert(cell) {
            return Err(format!(
                "Tile map validation failed: duplicate cell ({}, {})",
                cell.x, cell.y
            ));
        }
    }
    for cell in &file.destructible {
        if cell.hardness <= 0 {
            return Err(format!(
                "Tile map validation failed: destructible cell ({}, {}) has hardness <= 0",
                cell.x, cell.y
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_map() -> TileMap {
        let file: TileMapFile = serde_json::from_str(
            r#"{
              "width": 8,
              "height": 8,
              "solids": [{"x":0,"y":7},{"x":1,"y":7},{"x":2,"y":7},{"x":3,"y":7}],
              "one_way": [{"x":5,"y":4}],
              "destructible": [{"x":4,"y":7,"hardness":2}]
            }"#,
        )
        .expect("parse tile map");
        validate_tile_map_file(&file).expect("valid tile map");
        TileMap::from_file(file)
    }

    #[test]
    fn solid_tiles_block() {
        let mut map = sample_map();
        let mut params = TileCollisionParams::default();
        // Box overlapping the floor row.
        assert!(!map.is_tile_empty(&Aabb::new(10.0, 220.0, 30.0, 230.0), &mut params));
        // Box resting exactly on top of the floor row.
        assert!(map.is_tile_empty(&Aabb::new(10.0, 200.0, 30.0, 224.0), &mut params));
    }

    #[test]
    fn level_edges_are_walls_and_pits_are_open() {
        let map = sample_map();
        assert!(map.is_solid(-1, 3));
        assert!(map.is_solid(8, 3));
        assert!(!map.is_solid(3, -1));
        assert!(!map.is_solid(3, 8));
    }

    #[test]
    fn one_way_tiles_only_block_downwards() {
        let mut map = sample_map();
        let feet = Aabb::new(165.0, 110.0, 180.0, 130.0);
        assert!(map.is_tile_empty(&feet, &mut TileCollisionParams::downwards(false)));
        assert!(!map.is_tile_empty(&feet, &mut TileCollisionParams::downwards(true)));
    }

    #[test]
    fn weapons_break_soft_enough_tiles() {
        let mut map = sample_map();
        let probe = Aabb::new(130.0, 226.0, 140.0, 236.0);

        let mut weak = TileCollisionParams {
            weapon_strength: 1,
            ..TileCollisionParams::default()
        };
        assert!(!map.is_tile_empty(&probe, &mut weak));
        assert_eq!(weak.tiles_destroyed, 0);

        let mut strong = TileCollisionParams {
            weapon_strength: 2,
            ..TileCollisionParams::default()
        };
        assert!(map.is_tile_empty(&probe, &mut strong));
        assert_eq!(strong.tiles_destroyed, 1);
        assert!(!map.is_solid(4, 7));
        assert_eq!(map.destroyed_tiles().count(), 1);
    }

    #[test]
    fn validation_rejects_duplicate_cells() {
        let file: TileMapFile = serde_json::from_str(
            r#"{ "width": 4, "height": 4,
                 "solids": [{"x":1,"y":1}], "one_way": [{"x":1,"y":1}] }"#,
        )
        .expect("parse tile map");
        let err = validate_tile_map_file(&file).expect_err("duplicate cells should fail");
        assert!(err.contains("duplicate cell"));
    }
}
