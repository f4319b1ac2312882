use super::EnemyBase;
use crate::actors::{
    Activation, Actor, ActorActivationDetails, ActorBase, ActorBehavior, ActorHandle, ActorKind,
    ActorState,
};
use crate::events::params::TurtleShellParams;
use crate::level_handler::LevelHandler;
use crate::tiles::TileCollisionParams;

/// An empty shell. Slides when kicked or shot and knocks over enemies it
/// runs into.
#[derive(Debug, Default)]
pub struct TurtleShell {
    pub enemy: EnemyBase,
}

impl TurtleShell {
    pub fn new() -> Self {
        Self {
            enemy: EnemyBase::new(100),
        }
    }

    /// Push the shell away from a projectile.
    pub fn knock_back(&mut self, base: &mut ActorBase, level: &mut LevelHandler, shot_speed_x: f32) {
        let direction = if shot_speed_x < 0.0 { -0.6 } else { 0.6 };
        base.speed.x = shot_speed_x.abs().max(4.0) * direction;
        level.play_sfx("Fly", base.pos);
    }

    fn collide_with_shell(&mut self, base: &mut ActorBase, level: &mut LevelHandler, other: &mut Actor) -> bool {
        let other_speed = other.base.speed;
        if (other_speed.y - base.speed.y).abs() > 1.0 && other_speed.y > 0.0 {
            // Landed on from above.
            base.decrease_health(10, Some(base.handle));
            return false;
        }
        if base.speed.x.abs() <= other_speed.x.abs() {
            return false;
        }
        let total = base.speed.x.abs() + other_speed.x.abs();
        let sign = if base.speed.x < 0.0 { -1.0 } else { 1.0 };
        other.base.speed.x = total / 2.0 * sign;
        base.speed.x = total / 2.0 * -sign;
        other.base.decrease_health(1, Some(base.handle));
        level.play_sfx("ImpactShell", base.pos);
        true
    }
}

impl ActorBehavior for TurtleShell {
    fn on_activated(
        &mut self,
        base: &mut ActorBase,
        level: &mut LevelHandler,
        details: &ActorActivationDetails,
    ) -> Activation {
        EnemyBase::set_health_by_difficulty(base, level, 1);
        self.enemy.score = 100;
        base.set_state(
            ActorState::COLLIDE_WITH_TILESET_REDUCED | ActorState::SKIP_PER_PIXEL_COLLISIONS,
            true,
        );
        if level.is_reforged() {
            base.set_state(
                ActorState::COLLIDE_WITH_SOLID_OBJECTS | ActorState::COLLIDE_WITH_SOLID_OBJECTS_BELOW,
                true,
            );
        }

        let params = TurtleShellParams::decode(&details.params);
        base.speed.x = params.speed_x;
        base.external_force.y = params.speed_y;

        self.enemy.can_hurt_player = false;
        base.friction = level.gravity() * 0.04;
        base.elasticity = 0.5;
        base.health = 8;

        let path = match params.theme {
            1 => "Enemy/TurtleShellXmas",
            2 => "Boss/TurtleBossShell",
            _ => "Enemy/TurtleShell",
        };
        Activation::Await(path.to_string())
    }

    fn on_metadata_loaded(&mut self, base: &mut ActorBase, level: &mut LevelHandler) -> Activation {
        base.set_animation("Idle");
        if base.speed.x.abs() > 0.0 || base.external_force.y.abs() > 0.0 {
            level.play_sfx("Fly", base.pos);
            self.enemy.start_blinking(base);
        }
        Activation::Commit
    }

    fn on_update(&mut self, base: &mut ActorBase, level: &mut LevelHandler, time_mult: f32) {
        base.speed.x = lerp_by_time(base.speed.x, 0.0, base.friction, time_mult);

        let y_before = base.pos.y;
        let mut params = TileCollisionParams::downwards(base.speed.y >= 0.0);
        params.weapon_strength = 1;
        self.move_standard(base, level, time_mult, &mut params);
        self.on_update_hitbox(base);
        base.update_frozen_state(level, time_mult);
        self.enemy.update(time_mult);

        // Climbing a slope eats momentum.
        if y_before - base.pos.y > 0.5 && base.speed.y.abs() < 1.0 {
            let sign = if base.speed.x < 0.0 { -1.0 } else { 1.0 };
            base.speed.x = (base.speed.x.abs() - 10.0 * base.friction).max(0.0) * sign;
        }
    }

    fn on_update_hitbox(&mut self, base: &mut ActorBase) {
        base.update_hitbox(30.0, 16.0);
    }

    fn on_hit_floor(&mut self, base: &mut ActorBase, level: &mut LevelHandler, _time_mult: f32) {
        if base.speed.y.abs() > 1.0 {
            level.play_sfx("ImpactGround", base.pos);
        }
    }

    fn on_handle_collision(
        &mut self,
        base: &mut ActorBase,
        level: &mut LevelHandler,
        other: &mut Actor,
    ) -> bool {
        if other.kind.shot().is_some() {
            // Projectiles claim the pair first and knock the shell themselves.
            return self.enemy.handle_collision(base, other);
        }
        if matches!(other.kind, ActorKind::TurtleShell(_)) {
            return self.collide_with_shell(base, level, other);
        }
        if let Some(enemy) = other.kind.enemy() {
            if !enemy.can_collide_with_ammo || base.speed.x.abs() <= 2.0 {
                return false;
            }
            base.speed.x = base.speed.x.abs().max(2.0) * if base.speed.x < 0.0 { 1.0 } else { -1.0 };
            if !other.base.is_invulnerable() {
                other.base.decrease_health(1, Some(base.handle));
                return true;
            }
            return false;
        }
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

/// Frame-rate independent exponential approach of `from` towards `to`.
fn lerp_by_time(from: f32, to: f32, factor: f32, time_mult: f32) -> f32 {
    let t = 1.0 - (1.0 - factor).clamp(0.0, 1.0).powf(time_mult);
    from + (to - from) * t
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actors::enemies::crab::Crab;
    use crate::actors::test_support::{floor_level, run_frames, spawn, FLOOR_Y};
    use glam::Vec2;

    fn spawn_shell(level: &mut LevelHandler, pos: Vec2, speed_x: f32) -> ActorHandle {
        let params = TurtleShellParams {
            speed_x,
            speed_y: 0.0,
            theme: 0,
        };
        level
            .spawn_actor(
                ActorKind::TurtleShell(TurtleShell::new()),
                ActorActivationDetails::new(pos).with_params(params.encode()),
            )
            .expect("shell spawns")
    }

    #[test]
    fn test_spawn_parameters_are_applied() {
        let mut level = floor_level();
        let params = TurtleShellParams {
            speed_x: -2.5,
            speed_y: -1.1,
            theme: 2,
        };
        let shell = level
            .spawn_actor(
                ActorKind::TurtleShell(TurtleShell::new()),
                ActorActivationDetails::new(Vec2::new(200.0, FLOOR_Y - 40.0)).with_params(params.encode()),
            )
            .expect("shell spawns");

        let actor = level.actor(shell).expect("shell");
        assert_eq!(actor.base.speed.x, -2.5);
        assert_eq!(actor.base.external_force.y, -1.1);
        assert_eq!(actor.base.health, 8);
        assert_eq!(actor.base.elasticity, 0.5);
        assert!(level.sounds().iter().any(|s| s.name == "Fly"));
    }

    #[test]
    fn test_slows_down_on_floor() {
        let mut level = floor_level();
        let shell = spawn_shell(&mut level, Vec2::new(200.0, FLOOR_Y - 8.0), 6.0);
        run_frames(&mut level, 120);
        let speed = level.actor(shell).expect("shell").base.speed.x;
        assert!(speed.abs() < 6.0);
    }

    #[test]
    fn test_fast_shell_knocks_over_enemy() {
        let mut level = floor_level();
        let shell = spawn_shell(&mut level, Vec2::new(200.0, FLOOR_Y - 8.0), 6.0);
        let crab = spawn(&mut level, ActorKind::Crab(Crab::new()), Vec2::new(210.0, FLOOR_Y - 10.0));

        let mut shell_actor = level.take_actor(shell).expect("shell");
        let mut crab_actor = level.take_actor(crab).expect("crab");
        let health = crab_actor.base.health;
        assert!(shell_actor.handle_collision(&mut level, &mut crab_actor));
        assert_eq!(crab_actor.base.health, health - 1);
        assert!(shell_actor.base.speed.x < 0.0);
        level.return_actor(shell, shell_actor);
        level.return_actor(crab, crab_actor);
    }
}
