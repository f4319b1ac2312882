//! Player projectiles.
//!
//! Shots fly in a straight line, count down a lifetime and die on the first
//! wall they meet. Damage is applied through the enemy's own bookkeeping so
//! score ends up with whoever fired.

pub mod blaster;
pub mod electro;
pub mod freezer;
pub mod tnt;

use glam::Vec2;

use super::explosion::{self, ExplosionType};
use super::{Actor, ActorActivationDetails, ActorBase, ActorHandle, ActorKind, ActorState, MoveType};
use crate::events::params::ShotParams;
use crate::level_handler::LevelHandler;
use crate::tiles::TileCollisionParams;

/// Score per destructible tile broken by a weapon.
pub const TILE_SCORE: i32 = 50;

#[derive(Debug, Clone)]
pub struct ShotBase {
    pub owner: Option<ActorHandle>,
    pub strength: i32,
    pub time_left: f32,
    pub upgraded: bool,
    owner_speed_x: f32,
}

impl ShotBase {
    pub fn new(owner: Option<ActorHandle>, owner_speed_x: f32) -> Self {
        Self {
            owner,
            strength: 1,
            time_left: 0.0,
            upgraded: false,
            owner_speed_x,
        }
    }

    /// Shared activation: straight flight, no gravity, can't be frozen.
    pub fn activate(&mut self, base: &mut ActorBase, details: &ActorActivationDetails) -> ShotParams {
        let params = ShotParams::decode(&details.params);
        self.upgraded = params.upgraded;
        base.set_state(ActorState::SKIP_PER_PIXEL_COLLISIONS, true);
        base.set_state(ActorState::APPLY_GRAVITATION | ActorState::CAN_BE_FROZEN, false);
        base.set_facing_left(params.facing_left);
        params
    }

    /// Launch horizontally, keeping the shooter's momentum when it runs the
    /// same way.
    pub fn fire(&self, base: &mut ActorBase, speed: f32) {
        base.speed.x = if base.is_facing_left() {
            self.owner_speed_x.min(0.0) - speed
        } else {
            self.owner_speed_x.max(0.0) + speed
        };
        base.speed.y = 0.0;
    }

    /// Count the lifetime down. A shot with `time_left` T survives exactly T
    /// frames.
    pub fn tick(&mut self, base: &mut ActorBase, time_mult: f32) -> bool {
        self.time_left -= time_mult;
        if self.time_left <= 0.0 {
            base.decrease_health(i32::MAX, None);
            return false;
        }
        true
    }

    /// Move by the current speed. Returns false if a tile blocked the move.
    /// Tiles the shot broke are credited to the owner.
    pub fn try_movement(
        &self,
        base: &mut ActorBase,
        level: &mut LevelHandler,
        time_mult: f32,
        params: &mut TileCollisionParams,
    ) -> bool {
        let delta = base.speed * time_mult;
        let moved = base.move_instantly(level, delta, MoveType::RELATIVE, params);
        if params.tiles_destroyed > 0 {
            self.credit_tiles(level, params.tiles_destroyed);
            params.tiles_destroyed = 0;
        }
        moved
    }

    pub fn credit_tiles(&self, level: &mut LevelHandler, count: u32) {
        if let Some(owner) = self.owner {
            level.add_score_to_player(owner, count as i32 * TILE_SCORE);
        }
    }

    /// Damage an enemy. Returns true if the shot was spent on it.
    pub fn hit_enemy(&self, base: &mut ActorBase, level: &mut LevelHandler, other: &mut Actor) -> bool {
        if Some(other.handle()) == self.owner || self.strength <= 0 {
            return false;
        }
        let Actor {
            base: other_base,
            kind,
        } = other;
        let Some(enemy) = kind.enemy_mut() else {
            return false;
        };
        if !enemy.hit_by_shot(other_base, self.strength, base.speed, base.handle, self.owner) {
            return false;
        }
        if let ActorKind::TurtleShell(shell) = kind {
            shell.knock_back(other_base, level, base.speed.x);
        }
        base.decrease_health(i32::MAX, Some(other_base.handle));
        true
    }

    pub fn perish(&self, base: &mut ActorBase, level: &mut LevelHandler, explosion_type: ExplosionType) -> bool {
        let pos = base.pos + base.speed;
        explosion::create(level, Vec2::new(pos.x.trunc(), pos.y.trunc()), explosion_type);
        base.perish(level)
    }
}
