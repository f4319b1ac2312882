use super::ShotBase;
use crate::actors::explosion::ExplosionType;
use crate::actors::{
    Activation, Actor, ActorActivationDetails, ActorBase, ActorBehavior, ActorHandle, ActorState,
};
use crate::level_handler::LevelHandler;
use crate::tiles::TileCollisionParams;

/// Deals no damage; freezes whatever it touches.
#[derive(Debug)]
pub struct FreezerShot {
    pub shot: ShotBase,
}

impl FreezerShot {
    pub fn new(owner: Option<ActorHandle>, owner_speed_x: f32) -> Self {
        Self {
            shot: ShotBase::new(owner, owner_speed_x),
        }
    }

    /// Frames a hit actor stays frozen.
    pub fn frozen_duration(&self) -> f32 {
        if self.shot.upgraded {
            280.0
        } else {
            180.0
        }
    }
}

impl ActorBehavior for FreezerShot {
    fn on_activated(
        &mut self,
        base: &mut ActorBase,
        level: &mut LevelHandler,
        details: &ActorActivationDetails,
    ) -> Activation {
        self.shot.activate(base, details);
        self.shot.strength = 0;
        if self.shot.upgraded {
            self.shot.time_left = 38.0;
            self.shot.fire(base, 8.0);
            level.play_sfx("FireUpgraded", base.pos);
        } else {
            self.shot.time_left = 44.0;
            self.shot.fire(base, 6.0);
            level.play_sfx("Fire", base.pos);
        }
        Activation::Await("Weapon/Freezer".to_string())
    }

    fn on_metadata_loaded(&mut self, base: &mut ActorBase, _level: &mut LevelHandler) -> Activation {
        base.set_animation(if self.shot.upgraded { "IdleUpgraded" } else { "Idle" });
        Activation::Commit
    }

    fn on_update(&mut self, base: &mut ActorBase, level: &mut LevelHandler, time_mult: f32) {
        let mut params = TileCollisionParams::downwards(base.speed.y >= 0.0);
        if !self.shot.try_movement(base, level, time_mult, &mut params) {
            self.on_hit_wall(base, level, time_mult);
            return;
        }
        if !self.shot.tick(base, time_mult) {
            level.play_sfx("WallPoof", base.pos);
        }
        self.on_update_hitbox(base);
    }

    fn on_update_hitbox(&mut self, base: &mut ActorBase) {
        let p = base.pos;
        base.aabb_inner = jj_core::Aabb::new(p.x - 4.0, p.y - 2.0, p.x + 4.0, p.y + 6.0);
    }

    fn on_hit_wall(&mut self, base: &mut ActorBase, level: &mut LevelHandler, _time_mult: f32) {
        base.decrease_health(i32::MAX, None);
        level.play_sfx("WallPoof", base.pos);
    }

    fn on_handle_collision(
        &mut self,
        base: &mut ActorBase,
        _level: &mut LevelHandler,
        other: &mut Actor,
    ) -> bool {
        if Some(other.handle()) == self.shot.owner
            || !other.base.has_state(ActorState::CAN_BE_FROZEN)
            || other.kind.is_player()
        {
            return false;
        }
        other.base.frozen_time_left = self.frozen_duration();
        base.decrease_health(i32::MAX, Some(other.handle()));
        true
    }

    fn on_perish(
        &mut self,
        base: &mut ActorBase,
        level: &mut LevelHandler,
        _collider: Option<ActorHandle>,
    ) -> bool {
        self.shot.perish(base, level, ExplosionType::SmokeWhite)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actors::enemies::crab::Crab;
    use crate::actors::test_support::{floor_level, spawn, FLOOR_Y};
    use crate::actors::ActorKind;
    use crate::events::params::ShotParams;
    use glam::Vec2;

    #[test]
    fn test_upgraded_freezes_longer() {
        let mut shot = FreezerShot::new(None, 0.0);
        assert_eq!(shot.frozen_duration(), 180.0);
        shot.shot.upgraded = true;
        assert_eq!(shot.frozen_duration(), 280.0);
    }

    #[test]
    fn test_freezes_enemy_and_is_used_up() {
        let mut level = floor_level();
        let details = ActorActivationDetails::new(Vec2::new(100.0, FLOOR_Y - 16.0)).with_params(
            ShotParams {
                upgraded: true,
                facing_left: false,
            }
            .encode(),
        );
        let shot = level
            .spawn_actor(ActorKind::FreezerShot(FreezerShot::new(None, 0.0)), details)
            .expect("shot spawns");
        let crab = spawn(&mut level, ActorKind::Crab(Crab::new()), Vec2::new(130.0, FLOOR_Y - 12.0));

        let mut shot_actor = level.take_actor(shot).expect("shot");
        let mut crab_actor = level.take_actor(crab).expect("crab");
        assert!(shot_actor.handle_collision(&mut level, &mut crab_actor));
        assert_eq!(crab_actor.base.frozen_time_left, 280.0);
        assert!(shot_actor.is_destroyed());
        level.return_actor(shot, shot_actor);
        level.return_actor(crab, crab_actor);
    }
}
