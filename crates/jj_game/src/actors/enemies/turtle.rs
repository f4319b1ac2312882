use glam::Vec2;

use super::turtle_shell::TurtleShell;
use super::EnemyBase;
use crate::actors::explosion::{self, ExplosionType};
use crate::actors::{
    Activation, Actor, ActorActivationDetails, ActorBase, ActorBehavior, ActorHandle, ActorKind,
    ActorState, AfterTransition,
};
use crate::events::params::TurtleShellParams;
use crate::level_handler::LevelHandler;
use crate::tiles::TileCollisionParams;

const DEFAULT_SPEED: f32 = 1.0;

/// Patrols, withdraws into its shell to turn around and snaps at players in
/// front of it. Leaves a kickable shell behind when it dies.
///
/// Parameter byte 0 is the theme: `0` normal, `1` xmas.
#[derive(Debug, Default)]
pub struct Turtle {
    pub enemy: EnemyBase,
    theme: u8,
    turning: bool,
    withdrawn: bool,
    attacking: bool,
}

impl Turtle {
    pub fn new() -> Self {
        Self {
            enemy: EnemyBase::new(100),
            ..Self::default()
        }
    }

    pub fn is_turning(&self) -> bool {
        self.turning
    }

    pub fn is_attacking(&self) -> bool {
        self.attacking
    }

    fn walk_speed(base: &ActorBase) -> f32 {
        if base.is_facing_left() {
            -DEFAULT_SPEED
        } else {
            DEFAULT_SPEED
        }
    }

    fn attack(&mut self, base: &mut ActorBase, level: &mut LevelHandler) {
        base.speed.x = 0.0;
        self.attacking = true;
        level.play_sfx("Attack", base.pos);
        base.set_transition("TransitionAttack", false, AfterTransition::TurtleAttackDone);
    }

    fn player_in_reach(&self, base: &ActorBase, level: &mut LevelHandler) -> bool {
        let reach = Vec2::new(base.speed.x * 32.0, 0.0);
        let aabb = base.aabb_inner.translated(reach);
        if !level.tile_map().is_tile_empty_static(&aabb, false) {
            return false;
        }
        level
            .get_colliding_players(&aabb.translated(reach))
            .into_iter()
            .filter_map(|player| level.actor(player))
            .any(|player| !player.base.is_invulnerable())
    }

    fn spawn_shell(&self, base: &ActorBase, level: &mut LevelHandler) {
        let speed_y = if base.pos.y > level.water_level() {
            -0.65
        } else if level.is_reforged() {
            -1.1
        } else {
            -0.98
        };
        let params = TurtleShellParams {
            speed_x: base.speed.x * 1.1,
            speed_y,
            theme: self.theme,
        };
        let pos = base.pos.trunc();
        let details = ActorActivationDetails::new(pos).with_params(params.encode());
        if level
            .spawn_actor(ActorKind::TurtleShell(TurtleShell::new()), details)
            .is_none()
        {
            log::warn!("Turtle {:?} failed to leave a shell", base.handle);
        }
        explosion::create(level, pos, ExplosionType::SmokeGray);
    }
}

impl ActorBehavior for Turtle {
    fn on_activated(
        &mut self,
        base: &mut ActorBase,
        level: &mut LevelHandler,
        details: &ActorActivationDetails,
    ) -> Activation {
        EnemyBase::set_health_by_difficulty(base, level, 1);
        self.enemy.score = 100;
        base.set_state(ActorState::COLLIDE_WITH_TILESET_REDUCED, true);

        self.theme = details.params[0];
        base.set_facing_left(level.rng().next_bool());
        base.speed.x = Self::walk_speed(base);

        let path = match self.theme {
            1 => "Enemy/TurtleXmas",
            _ => "Enemy/Turtle",
        };
        Activation::Await(path.to_string())
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

        if base.frozen_time_left > 0.0 {
            return;
        }

        if base.has_state(ActorState::CAN_JUMP)
            && base.speed.x.abs() > 0.0
            && !EnemyBase::can_move_to_position(base, level, base.speed.x * 4.0, 0.0)
        {
            base.set_transition("TransitionWithdraw", false, AfterTransition::TurtleWithdrawn);
            self.turning = true;
            self.enemy.can_hurt_player = false;
            base.speed.x = 0.0;
            level.play_sfx("Withdraw", base.pos);
        }

        if self.attacking {
            // The bite only exists in the animation, keep the proxy fresh.
            base.set_state(ActorState::IS_DIRTY, true);
        } else if !self.turning && !self.withdrawn && self.player_in_reach(base, level) {
            self.attack(base, level);
        }
    }

    fn on_update_hitbox(&mut self, base: &mut ActorBase) {
        base.update_hitbox(24.0, 24.0);
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

    fn on_transition_finished(
        &mut self,
        base: &mut ActorBase,
        level: &mut LevelHandler,
        action: AfterTransition,
    ) {
        match action {
            AfterTransition::TurtleWithdrawn if self.turning => {
                base.set_facing_left(!base.is_facing_left());
                base.set_transition("TransitionWithdrawEnd", false, AfterTransition::TurtleTurned);
                level.play_sfx("WithdrawEnd", base.pos);
                self.withdrawn = true;
            }
            AfterTransition::TurtleTurned if self.turning => {
                self.enemy.can_hurt_player = true;
                self.withdrawn = false;
                self.turning = false;
                base.speed.x = Self::walk_speed(base);
            }
            AfterTransition::TurtleAttackDone => {
                base.speed.x = Self::walk_speed(base);
                self.attacking = false;
                level.play_sfx("Attack2", base.pos);
            }
            AfterTransition::Destroy => base.destroy(),
            _ => {}
        }
    }

    fn on_perish(
        &mut self,
        base: &mut ActorBase,
        level: &mut LevelHandler,
        collider: Option<ActorHandle>,
    ) -> bool {
        if EnemyBase::create_death_debris(base, level) {
            // Shattered while frozen, so no shell; it pays for both.
            level.play_common_sfx("Splat", base.pos);
            self.enemy.score += 100;
            EnemyBase::try_generate_random_drop(base, level);
        } else {
            self.spawn_shell(base, level);
        }
        self.enemy.perish(base, level, collider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actors::test_support::{floor_level, run_frames, spawn, FLOOR_Y};

    fn shell_params(level: &LevelHandler) -> Vec<(Vec2, f32)> {
        level
            .iter_actors()
            .filter_map(|a| match &a.kind {
                ActorKind::TurtleShell(_) => Some((a.base.pos, a.base.speed.x)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_perish_leaves_shell_with_turtle_speed() {
        let mut level = floor_level();
        let turtle = spawn(&mut level, ActorKind::Turtle(Turtle::new()), Vec2::new(300.0, FLOOR_Y - 12.0));
        let (pos, speed_x) = {
            let actor = level.actor(turtle).expect("turtle");
            (actor.base.pos, actor.base.speed.x)
        };
        assert_eq!(speed_x.abs(), DEFAULT_SPEED);

        let mut actor = level.take_actor(turtle).expect("turtle");
        actor.decrease_health(&mut level, 1, None);
        assert!(actor.is_destroyed());
        level.return_actor(turtle, actor);

        let shells = shell_params(&level);
        assert_eq!(shells.len(), 1);
        assert_eq!(shells[0].0, pos.trunc());
        assert!((shells[0].1 - speed_x * 1.1).abs() < 1e-4);
    }

    #[test]
    fn test_frozen_turtle_shatters_without_shell() {
        let mut level = floor_level();
        let turtle = spawn(&mut level, ActorKind::Turtle(Turtle::new()), Vec2::new(300.0, FLOOR_Y - 12.0));
        let mut actor = level.take_actor(turtle).expect("turtle");
        actor.base.frozen_time_left = 100.0;
        actor.decrease_health(&mut level, 1, None);
        level.return_actor(turtle, actor);

        assert!(shell_params(&level).is_empty());
        assert!(level.sounds().iter().any(|s| s.name == "IceBreak"));
    }

    #[test]
    fn test_withdraws_to_turn_at_wall() {
        let mut level = floor_level();
        level.tile_map_mut().set_solid(4, 9, true);
        level.tile_map_mut().set_solid(12, 9, true);
        let turtle = spawn(&mut level, ActorKind::Turtle(Turtle::new()), Vec2::new(270.0, FLOOR_Y - 12.0));

        let mut turned = false;
        for _ in 0..200 {
            run_frames(&mut level, 1);
            let actor = level.actor(turtle).expect("turtle");
            if let ActorKind::Turtle(t) = &actor.kind {
                if t.is_turning() {
                    turned = true;
                    assert_eq!(actor.base.speed.x, 0.0);
                    assert!(!t.enemy.can_hurt_player);
                }
            }
        }
        assert!(turned);
        assert!(level.sounds().iter().any(|s| s.name == "Withdraw"));
    }
}
