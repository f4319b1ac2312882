use super::ShotBase;
use crate::actors::explosion::ExplosionType;
use crate::actors::{Activation, Actor, ActorActivationDetails, ActorBase, ActorBehavior, ActorHandle};
use crate::level_handler::LevelHandler;
use crate::tiles::TileCollisionParams;

const SPEED: f32 = 8.0;
const LIFETIME: f32 = 25.0;

/// The default weapon. Infinite ammo, weak.
#[derive(Debug)]
pub struct BlasterShot {
    pub shot: ShotBase,
}

impl BlasterShot {
    pub fn new(owner: Option<ActorHandle>, owner_speed_x: f32) -> Self {
        Self {
            shot: ShotBase::new(owner, owner_speed_x),
        }
    }
}

impl ActorBehavior for BlasterShot {
    fn on_activated(
        &mut self,
        base: &mut ActorBase,
        _level: &mut LevelHandler,
        details: &ActorActivationDetails,
    ) -> Activation {
        self.shot.activate(base, details);
        if self.shot.upgraded {
            self.shot.strength = 2;
            self.shot.time_left = LIFETIME + 3.0;
        } else {
            self.shot.strength = 1;
            self.shot.time_left = LIFETIME;
        }
        self.shot.fire(base, SPEED);
        Activation::Await("Weapon/Blaster".to_string())
    }

    fn on_metadata_loaded(&mut self, base: &mut ActorBase, _level: &mut LevelHandler) -> Activation {
        base.set_animation(if self.shot.upgraded { "IdleUpgraded" } else { "Idle" });
        Activation::Commit
    }

    fn on_update(&mut self, base: &mut ActorBase, level: &mut LevelHandler, time_mult: f32) {
        let mut params = TileCollisionParams::downwards(base.speed.y >= 0.0);
        params.weapon_strength = self.shot.strength;
        if !self.shot.try_movement(base, level, time_mult, &mut params) {
            self.on_hit_wall(base, level, time_mult);
            return;
        }
        self.shot.tick(base, time_mult);
        self.on_update_hitbox(base);
    }

    fn on_update_hitbox(&mut self, base: &mut ActorBase) {
        base.update_hitbox(8.0, 8.0);
    }

    fn on_hit_wall(&mut self, base: &mut ActorBase, level: &mut LevelHandler, _time_mult: f32) {
        base.decrease_health(i32::MAX, None);
        level.play_sfx("WallPoof", base.pos);
    }

    fn on_handle_collision(
        &mut self,
        base: &mut ActorBase,
        level: &mut LevelHandler,
        other: &mut Actor,
    ) -> bool {
        self.shot.hit_enemy(base, level, other)
    }

    fn on_perish(
        &mut self,
        base: &mut ActorBase,
        level: &mut LevelHandler,
        _collider: Option<ActorHandle>,
    ) -> bool {
        self.shot.perish(base, level, ExplosionType::Small)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actors::test_support::{floor_level, run_frames, test_level, FLOOR_Y};
    use crate::actors::ActorKind;
    use crate::events::params::ShotParams;
    use glam::Vec2;

    fn fire(level: &mut LevelHandler, pos: Vec2, facing_left: bool, owner_speed_x: f32) -> ActorHandle {
        let details = ActorActivationDetails::new(pos).with_params(
            ShotParams {
                upgraded: false,
                facing_left,
            }
            .encode(),
        );
        level
            .spawn_actor(ActorKind::BlasterShot(BlasterShot::new(None, owner_speed_x)), details)
            .expect("shot spawns")
    }

    #[test]
    fn test_shot_keeps_owner_momentum() {
        let mut level = test_level(40, 10);
        let forward = fire(&mut level, Vec2::new(600.0, 100.0), false, 3.0);
        let backward = fire(&mut level, Vec2::new(600.0, 200.0), true, 3.0);
        assert_eq!(level.actor(forward).map(|a| a.base.speed.x), Some(11.0));
        assert_eq!(level.actor(backward).map(|a| a.base.speed.x), Some(-8.0));
    }

    #[test]
    fn test_lifetime_counts_exact_frames() {
        let mut level = test_level(200, 10);
        let handle = fire(&mut level, Vec2::new(100.0, 100.0), false, 0.0);
        run_frames(&mut level, 24);
        assert!(level.actor(handle).is_some());
        run_frames(&mut level, 1);
        assert!(level.actor(handle).is_none());
    }

    #[test]
    fn test_zero_lifetime_dies_on_first_update() {
        let mut level = test_level(40, 10);
        let handle = fire(&mut level, Vec2::new(100.0, 100.0), false, 0.0);
        level.with_actor(handle, |actor, _| {
            if let ActorKind::BlasterShot(s) = &mut actor.kind {
                s.shot.time_left = 0.0;
            }
        });
        run_frames(&mut level, 1);
        assert!(level.actor(handle).is_none());
    }

    #[test]
    fn test_wall_stops_shot() {
        let mut level = floor_level();
        level.tile_map_mut().set_solid(6, 9, true);
        let handle = fire(&mut level, Vec2::new(150.0, FLOOR_Y - 16.0), false, 0.0);
        run_frames(&mut level, 6);
        assert!(level.actor(handle).is_none());
        assert!(level.sounds().iter().any(|s| s.name == "WallPoof"));
    }
}
