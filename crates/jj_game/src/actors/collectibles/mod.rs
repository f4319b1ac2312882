//! Pickups. Placed collectibles float in place until something knocks them
//! loose; dropped ones fall and expire after a while.

pub mod food;
pub mod gem;
pub mod gem_ring;

use glam::Vec2;

use super::explosion::{self, ExplosionType};
use super::{Actor, ActorActivationDetails, ActorBase, ActorKind, ActorState, MoveType};
use crate::level_handler::LevelHandler;
use crate::tiles::{TileCollisionParams, TILE_SIZE};

/// Frames a dropped collectible lingers before it vanishes.
const DROPPED_LIFETIME: f32 = 90.0 * 60.0;

#[derive(Debug, Clone)]
pub struct CollectibleBase {
    /// Still floating where it was placed.
    pub untouched: bool,
    pub score: i32,
    phase: f32,
    time_left: f32,
    starting_y: f32,
}

impl CollectibleBase {
    pub fn new(score: i32) -> Self {
        Self {
            untouched: true,
            score,
            phase: 0.0,
            time_left: 0.0,
            starting_y: 0.0,
        }
    }

    /// Shared activation. Event and generator spawns float, everything else
    /// is a drop that falls and times out.
    pub fn activate(&mut self, base: &mut ActorBase, details: &ActorActivationDetails) {
        base.set_state(ActorState::SKIP_PER_PIXEL_COLLISIONS, true);
        base.elasticity = 0.6;

        let pos = details.pos;
        self.phase = ((pos.x / TILE_SIZE as f32) + (pos.y / TILE_SIZE as f32)) * 2.0;

        if details
            .state
            .intersects(ActorState::IS_CREATED_FROM_EVENT_MAP | ActorState::IS_FROM_GENERATOR)
        {
            self.untouched = true;
            base.set_state(ActorState::APPLY_GRAVITATION, false);
        } else {
            self.untouched = false;
            base.set_state(ActorState::APPLY_GRAVITATION, true);
            self.time_left = DROPPED_LIFETIME;
        }
        self.starting_y = pos.y;
    }

    /// Alternate facing on a checkerboard so rows of pickups don't look cloned.
    pub fn set_facing_direction(&self, base: &mut ActorBase) {
        let cell = ((base.pos.x + base.pos.y) / TILE_SIZE as f32) as i32;
        base.set_facing_left(cell % 2 == 0);
    }

    pub fn update(&mut self, base: &mut ActorBase, level: &mut LevelHandler, time_mult: f32) {
        if self.untouched {
            self.phase += 0.15 * time_mult;
            let wave = (self.phase * 0.25 * std::f32::consts::PI).cos() * 3.2;
            let target = Vec2::new(base.pos.x, self.starting_y + wave + 0.6);
            let mut params = TileCollisionParams::downwards(true);
            base.move_instantly(level, target, MoveType::FORCE, &mut params);
        } else if self.time_left > 0.0 {
            self.time_left -= time_mult;
            if self.time_left <= 0.0 {
                explosion::create(level, base.pos, ExplosionType::Generator);
                base.decrease_health(i32::MAX, None);
            }
        }
    }

    /// Knock a floating collectible loose when a projectile passes through it.
    /// Returns true if `other` was a player, which the caller should collect.
    pub fn touched_by(&mut self, base: &mut ActorBase, level: &mut LevelHandler, other: &Actor) -> bool {
        if other.kind.is_player() {
            return true;
        }
        let knocks = matches!(
            other.kind,
            ActorKind::BlasterShot(_)
                | ActorKind::ElectroShot(_)
                | ActorKind::FreezerShot(_)
                | ActorKind::Tnt(_)
                | ActorKind::TurtleShell(_)
        );
        if self.untouched && knocks {
            let speed = other.base.speed;
            let jitter_x = level.rng().range_f32(0.9, 1.1);
            let jitter_y = level.rng().range_f32(0.9, 1.1);
            base.external_force.x += speed.x / 2.0 * jitter_x;
            base.external_force.y += speed.y / 4.0 * jitter_y;
            self.untouched = false;
            base.set_state(ActorState::APPLY_GRAVITATION, true);
        }
        false
    }

    /// Award the score, leave a sparkle and disappear.
    pub fn collect(&mut self, base: &mut ActorBase, level: &mut LevelHandler, player: &mut Actor) {
        if let Some(p) = player.kind.as_player_mut() {
            p.add_score(self.score);
        }
        explosion::create(level, base.pos, ExplosionType::Generator);
        base.decrease_health(i32::MAX, None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actors::test_support::{run_frames, spawn, test_level};
    use crate::actors::{explosion::Explosion, ActorKind};
    use gem::Gem;

    #[test]
    fn test_placed_collectible_floats_in_place() {
        let mut level = test_level(10, 10);
        let details = ActorActivationDetails::new(Vec2::new(80.0, 80.0))
            .with_state(ActorState::IS_CREATED_FROM_EVENT_MAP);
        let handle = level
            .spawn_actor(ActorKind::Gem(Gem::new(0)), details)
            .expect("gem spawns");

        run_frames(&mut level, 120);
        let actor = level.actor(handle).expect("still there");
        assert!(!actor.base.has_state(ActorState::APPLY_GRAVITATION));
        assert!((actor.base.pos.y - 80.0).abs() <= 4.0);
        assert_eq!(actor.base.pos.x, 80.0);
    }

    #[test]
    fn test_dropped_collectible_falls() {
        let mut level = test_level(10, 10);
        let handle = spawn(&mut level, ActorKind::Gem(Gem::new(0)), Vec2::new(80.0, 80.0));
        run_frames(&mut level, 30);
        let actor = level.actor(handle).expect("still there");
        assert!(actor.base.pos.y > 90.0);
    }

    #[test]
    fn test_projectile_knocks_collectible_loose() {
        let mut level = test_level(10, 10);
        let details = ActorActivationDetails::new(Vec2::new(80.0, 80.0))
            .with_state(ActorState::IS_CREATED_FROM_EVENT_MAP);
        let handle = level
            .spawn_actor(ActorKind::Gem(Gem::new(0)), details)
            .expect("gem spawns");
        let effect = spawn(
            &mut level,
            ActorKind::Explosion(Explosion::new(ExplosionType::Tiny)),
            Vec2::new(80.0, 80.0),
        );

        let mut other = level.take_actor(effect).expect("spawned");
        let mut gem = level.take_actor(handle).expect("spawned");
        let ActorKind::Gem(g) = &mut gem.kind else {
            panic!("not a gem");
        };
        // Effects are not projectiles.
        assert!(!g.collectible.touched_by(&mut gem.base, &mut level, &other));
        assert!(g.collectible.untouched);

        other.kind = ActorKind::Tnt(crate::actors::weapons::tnt::Tnt::new(None));
        other.base.speed = Vec2::new(6.0, 0.0);
        assert!(!g.collectible.touched_by(&mut gem.base, &mut level, &other));
        assert!(!g.collectible.untouched);
        assert!(gem.base.external_force.x > 2.5);
        assert!(gem.base.has_state(ActorState::APPLY_GRAVITATION));

        level.return_actor(handle, gem);
        level.return_actor(effect, other);
    }
}
