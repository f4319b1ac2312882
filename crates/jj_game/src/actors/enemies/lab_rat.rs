use glam::Vec2;

use super::EnemyBase;
use crate::actors::{
    Activation, Actor, ActorActivationDetails, ActorBase, ActorBehavior, ActorHandle, ActorState,
    AfterTransition, MoveType,
};
use crate::level_handler::LevelHandler;
use crate::tiles::TileCollisionParams;

const DEFAULT_SPEED: f32 = 1.0;
const ATTACK_REACH: f32 = 128.0;

/// Alternates between walking and idling, and leaps at players ahead of it.
#[derive(Debug, Default)]
pub struct LabRat {
    pub enemy: EnemyBase,
    attacking: bool,
    can_attack: bool,
    idling: bool,
    can_idle: bool,
    state_time: f32,
    attack_time: f32,
    turn_cooldown: f32,
}

impl LabRat {
    pub fn new() -> Self {
        Self {
            enemy: EnemyBase::new(200),
            can_attack: true,
            ..Self::default()
        }
    }

    pub fn is_attacking(&self) -> bool {
        self.attacking
    }

    pub fn is_idling(&self) -> bool {
        self.idling
    }

    fn walk_speed(base: &ActorBase) -> f32 {
        if base.is_facing_left() {
            -DEFAULT_SPEED
        } else {
            DEFAULT_SPEED
        }
    }

    fn start_idling(&mut self, base: &mut ActorBase, state_time: f32) {
        base.speed.x = 0.0;
        self.idling = true;
        self.can_idle = false;
        base.set_animation("Idle");
        self.state_time = state_time;
    }

    fn idle(&mut self, base: &mut ActorBase, level: &mut LevelHandler, time_mult: f32) {
        if self.state_time <= 0.0 {
            self.idling = false;
            base.set_animation("Walk");
            base.speed.x = Self::walk_speed(base);
            base.speed.y = 0.0;
            self.state_time = level.rng().range_f32(420.0, 540.0);
        } else {
            self.state_time -= time_mult;
            if level.rng().next_f32() < 0.008 * time_mult {
                level.play_sfx("Idle", base.pos);
            }
        }
    }

    fn walk(&mut self, base: &mut ActorBase, level: &mut LevelHandler, time_mult: f32) {
        if self.attacking {
            return;
        }

        if base.has_state(ActorState::CAN_JUMP)
            && !EnemyBase::can_move_to_position(base, level, base.speed.x * 4.0, 0.0)
        {
            if self.turn_cooldown <= 0.0 {
                base.set_facing_left(!base.is_facing_left());
                base.speed.x = Self::walk_speed(base);
                self.turn_cooldown = 120.0;
            } else {
                // Boxed in, sit it out.
                let state_time = level.rng().range_f32(260.0, 320.0) - self.turn_cooldown;
                self.start_idling(base, state_time);
                self.turn_cooldown = 0.0;
            }
        }

        if self.can_attack {
            if base.speed.y.abs() < f32::EPSILON {
                let mut reach = base.aabb_inner;
                if base.is_facing_left() {
                    reach.l -= ATTACK_REACH;
                } else {
                    reach.r += ATTACK_REACH;
                }
                if !level.get_colliding_players(&reach).is_empty() {
                    self.attack(base, level);
                }
            }
        } else if self.attack_time <= 0.0 {
            self.can_attack = true;
            self.attack_time = 180.0;
        } else {
            self.attack_time -= time_mult;
        }

        if level.rng().next_f32() < 0.004 * time_mult {
            level.play_sfx("Noise", base.pos);
        }

        if self.can_idle {
            if self.state_time <= 0.0 {
                let state_time = level.rng().range_f32(260.0, 320.0);
                self.start_idling(base, state_time);
            }
        } else if self.state_time <= 0.0 {
            self.can_idle = true;
            self.state_time = level.rng().range_f32(60.0, 120.0);
        }
    }

    fn attack(&mut self, base: &mut ActorBase, level: &mut LevelHandler) {
        base.set_transition("TransitionAttack", false, AfterTransition::LabRatAttackDone);
        base.speed.x = if base.is_facing_left() { -2.0 } else { 2.0 };
        let mut params = TileCollisionParams::downwards(false);
        base.move_instantly(level, Vec2::new(0.0, -1.0), MoveType::RELATIVE, &mut params);
        base.speed.y = if level.is_reforged() { -3.0 } else { -2.0 };
        base.internal_force_y = -0.5;
        self.attacking = true;
        base.set_state(ActorState::CAN_JUMP, false);
        level.play_sfx("Attack", base.pos);
    }
}

impl ActorBehavior for LabRat {
    fn on_activated(
        &mut self,
        base: &mut ActorBase,
        level: &mut LevelHandler,
        _details: &ActorActivationDetails,
    ) -> Activation {
        EnemyBase::set_health_by_difficulty(base, level, 1);
        self.enemy.score = 200;
        base.set_state(ActorState::COLLIDE_WITH_TILESET_REDUCED, true);

        base.set_facing_left(level.rng().next_bool());
        base.speed.x = Self::walk_speed(base);
        self.state_time = level.rng().range_f32(180.0, 300.0);
        self.attack_time = level.rng().range_f32(300.0, 400.0);
        Activation::Await("Enemy/LabRat".to_string())
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

        if self.idling {
            self.idle(base, level, time_mult);
        } else {
            self.walk(base, level, time_mult);
        }
        self.state_time -= time_mult;
        self.turn_cooldown -= time_mult;
    }

    fn on_update_hitbox(&mut self, base: &mut ActorBase) {
        base.update_hitbox(30.0, 30.0);
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
        _level: &mut LevelHandler,
        action: AfterTransition,
    ) {
        match action {
            AfterTransition::LabRatAttackDone => {
                base.speed.x = Self::walk_speed(base);
                self.attacking = false;
                self.can_attack = false;
                self.attack_time = 180.0;
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
        EnemyBase::create_death_debris(base, level);
        level.play_common_sfx("Splat", base.pos);
        EnemyBase::try_generate_random_drop(base, level);
        self.enemy.perish(base, level, collider)
    }
}
