use glam::Vec2;

use super::EnemyBase;
use crate::actors::{
    Activation, Actor, ActorActivationDetails, ActorBase, ActorBehavior, ActorHandle, ActorState,
    MoveType,
};
use crate::level_handler::LevelHandler;
use crate::tiles::TileCollisionParams;

const DEFAULT_SPEED: f32 = 0.7;

/// Walks back and forth, turning at walls, ledges and stop-enemy areas.
///
/// Parameter byte 0 picks the initial facing: `0` random, `1` left, `2` right.
#[derive(Debug)]
pub struct Crab {
    pub enemy: EnemyBase,
    stuck: bool,
}

impl Default for Crab {
    fn default() -> Self {
        Self::new()
    }
}

impl Crab {
    pub fn new() -> Self {
        Self {
            enemy: EnemyBase::new(100),
            stuck: false,
        }
    }

    fn walk(&mut self, base: &mut ActorBase, level: &mut LevelHandler) {
        if !base.has_state(ActorState::CAN_JUMP) {
            return;
        }
        if EnemyBase::can_move_to_position(base, level, base.speed.x * 4.0, 0.0) {
            self.stuck = false;
            return;
        }
        if self.stuck {
            // Turned last frame and still blocked, try to climb out instead.
            let mut params = TileCollisionParams::downwards(false);
            base.move_instantly(level, Vec2::new(0.0, -4.0), MoveType::RELATIVE, &mut params);
        } else {
            base.set_facing_left(!base.is_facing_left());
            base.speed.x = -base.speed.x;
            self.stuck = true;
        }
    }
}

impl ActorBehavior for Crab {
    fn on_activated(
        &mut self,
        base: &mut ActorBase,
        level: &mut LevelHandler,
        details: &ActorActivationDetails,
    ) -> Activation {
        EnemyBase::set_health_by_difficulty(base, level, 3);
        base.set_state(ActorState::COLLIDE_WITH_TILESET_REDUCED, true);

        let facing_left = match details.params[0] {
            1 => true,
            2 => false,
            _ => level.rng().next_bool(),
        };
        base.set_facing_left(facing_left);
        base.speed.x = if facing_left { -DEFAULT_SPEED } else { DEFAULT_SPEED };
        Activation::Await("Enemy/Crab".to_string())
    }

    fn on_metadata_loaded(&mut self, base: &mut ActorBase, level: &mut LevelHandler) -> Activation {
        base.set_animation("Walk");
        self.on_update_hitbox(base);
        EnemyBase::place_on_ground(base, level);
        Activation::Commit
    }

    fn on_update(&mut self, base: &mut ActorBase, level: &mut LevelHandler, time_mult: f32) {
        self.enemy.update(time_mult);
        let mut params = TileCollisionParams::downwards(base.speed.y >= 0.0);
        self.move_standard(base, level, time_mult, &mut params);
        self.on_update_hitbox(base);
        base.update_frozen_state(level, time_mult);

        if base.frozen_time_left <= 0.0 {
            self.walk(base, level);
        }
    }

    fn on_update_hitbox(&mut self, base: &mut ActorBase) {
        base.update_hitbox(24.0, 20.0);
    }

    fn on_handle_collision(
        &mut self,
        base: &mut ActorBase,
        _level: &mut LevelHandler,
        other: &mut Actor,
    ) -> bool {
        self.enemy.handle_collision(base, other)
    }

    fn on_health_changed(
        &mut self,
        base: &mut ActorBase,
        _level: &mut LevelHandler,
        _collider: Option<ActorHandle>,
    ) {
        self.enemy.start_blinking(base);
    }

    fn on_perish(
        &mut self,
        base: &mut ActorBase,
        level: &mut LevelHandler,
        collider: Option<ActorHandle>,
    ) -> bool {
        EnemyBase::create_death_debris(base, level);
        level.play_common_sfx("Splat", base.pos);
        EnemyBase::try_generate_random_drop(base, level);
        self.enemy.perish(base, level, collider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actors::test_support::{floor_level, run_frames, spawn, FLOOR_Y};
    use crate::actors::ActorKind;
    use crate::config::GameDifficulty;

    fn spawn_crab(level: &mut LevelHandler, x: f32, facing: u8) -> ActorHandle {
        let mut params = [0u8; crate::events::params::SPAWN_PARAMS_SIZE];
        params[0] = facing;
        level
            .spawn_actor(
                ActorKind::Crab(Crab::new()),
                ActorActivationDetails::new(Vec2::new(x, FLOOR_Y - 10.0)).with_params(params),
            )
            .expect("crab spawns")
    }

    #[test]
    fn test_health_follows_difficulty() {
        let mut level = floor_level();
        let crab = spawn_crab(&mut level, 100.0, 2);
        assert_eq!(level.actor(crab).map(|a| a.base.health), Some(3));

        level.set_difficulty(GameDifficulty::Easy);
        let easy = spawn_crab(&mut level, 300.0, 2);
        assert_eq!(level.actor(easy).map(|a| a.base.health), Some(2));

        level.set_difficulty(GameDifficulty::Hard);
        let hard = spawn_crab(&mut level, 500.0, 2);
        assert_eq!(level.actor(hard).map(|a| a.base.max_health), Some(4));
    }

    #[test]
    fn test_turns_at_wall_within_one_frame() {
        let mut level = floor_level();
        level.tile_map_mut().set_solid(6, 9, true);
        let crab = spawn_crab(&mut level, 176.0, 2);
        {
            let actor = level.actor(crab).expect("crab");
            assert!(!actor.base.is_facing_left());
            assert_eq!(actor.base.speed.x, DEFAULT_SPEED);
        }

        run_frames(&mut level, 1);
        let actor = level.actor(crab).expect("crab");
        assert!(actor.base.is_facing_left());
        assert_eq!(actor.base.speed.x, -DEFAULT_SPEED);
    }

    #[test]
    fn test_turns_at_ledge() {
        let mut level = floor_level();
        for x in 6..10 {
            level.tile_map_mut().set_solid(x, 10, false);
        }
        let crab = spawn_crab(&mut level, 176.0, 2);
        run_frames(&mut level, 10);
        let actor = level.actor(crab).expect("crab");
        assert!(actor.base.is_facing_left());
        assert!(actor.base.pos.x < 190.0);
    }

    #[test]
    fn test_keeps_walking_on_open_floor() {
        let mut level = floor_level();
        let crab = spawn(&mut level, ActorKind::Crab(Crab::new()), Vec2::new(400.0, FLOOR_Y - 10.0));
        let start = level.actor(crab).expect("crab").base.pos.x;
        run_frames(&mut level, 10);
        let actor = level.actor(crab).expect("crab");
        assert!((actor.base.pos.x - start).abs() > 5.0);
        assert_eq!(actor.base.speed.x.abs(), DEFAULT_SPEED);
    }
}
