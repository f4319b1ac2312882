use glam::Vec2;

use super::EnemyBase;
use crate::actors::explosion::{self, ExplosionType};
use crate::actors::{
    Activation, Actor, ActorActivationDetails, ActorBase, ActorBehavior, ActorHandle, ActorKind,
    ActorState, AfterTransition,
};
use crate::events::params::SPAWN_PARAMS_SIZE;
use crate::level_handler::LevelHandler;
use crate::tiles::TileCollisionParams;

const SIGHT_RANGE: f32 = 220.0;
const BREATH_FRAMES: f32 = 30.0;
const FIRE_INTERVAL: f32 = 10.0;

/// Stands still and breathes fire at players that come close.
#[derive(Debug, Default)]
pub struct Dragon {
    pub enemy: EnemyBase,
    attacking: bool,
    state_time: f32,
    attack_time: f32,
    turn_to_left: bool,
}

impl Dragon {
    pub fn new() -> Self {
        Self {
            enemy: EnemyBase::new(200),
            ..Self::default()
        }
    }

    pub fn is_attacking(&self) -> bool {
        self.attacking
    }

    fn start_attack(base: &mut ActorBase) {
        base.set_animation("Attack");
        base.set_transition("TransitionAttackStart", false, AfterTransition::DragonAttackStarted);
    }

    fn stop_attack(base: &mut ActorBase) {
        base.set_animation("Idle");
        base.set_transition("TransitionAttackEnd", false, AfterTransition::DragonAttackDone);
    }

    fn breathe(&mut self, base: &ActorBase, level: &mut LevelHandler, time_mult: f32) {
        if self.attack_time > 0.0 {
            self.attack_time -= time_mult;
            return;
        }
        let offset = if base.is_facing_left() { -14.0 } else { 14.0 };
        let pos = Vec2::new(base.pos.x.trunc() + offset, base.pos.y.trunc() - 6.0);
        let mut params = [0u8; SPAWN_PARAMS_SIZE];
        params[0] = base.is_facing_left() as u8;
        level.spawn_actor(
            ActorKind::DragonFire(DragonFire::new()),
            ActorActivationDetails::new(pos).with_params(params),
        );
        self.attack_time = FIRE_INTERVAL;
    }
}

impl ActorBehavior for Dragon {
    fn on_activated(
        &mut self,
        base: &mut ActorBase,
        level: &mut LevelHandler,
        _details: &ActorActivationDetails,
    ) -> Activation {
        EnemyBase::set_health_by_difficulty(base, level, 1);
        self.enemy.score = 200;
        base.set_facing_left(level.rng().next_bool());
        Activation::Await("Enemy/Dragon".to_string())
    }

    fn on_metadata_loaded(&mut self, base: &mut ActorBase, _level: &mut LevelHandler) -> Activation {
        base.set_animation("Idle");
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

        let target = level
            .player_positions()
            .into_iter()
            .map(|(_, pos)| pos)
            .find(|pos| pos.distance(base.pos) <= SIGHT_RANGE);

        match target {
            Some(target) => {
                if !base.has_transition() {
                    if !self.attacking {
                        if self.state_time <= 0.0 {
                            let face_left = base.pos.x > target.x;
                            if base.is_facing_left() != face_left {
                                self.turn_to_left = face_left;
                                base.set_transition("TransitionTurn", false, AfterTransition::DragonTurned);
                            } else {
                                Self::start_attack(base);
                            }
                        }
                    } else if self.state_time <= 0.0 {
                        Self::stop_attack(base);
                    } else {
                        self.breathe(base, level, time_mult);
                    }
                }
                self.state_time -= time_mult;
            }
            None if self.attacking && !base.has_transition() => {
                base.set_animation("Idle");
                base.set_transition("TransitionAttackEnd", false, AfterTransition::DragonAttackDone);
                self.state_time = 80.0;
            }
            None => {}
        }
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
            AfterTransition::DragonTurned => {
                base.set_facing_left(self.turn_to_left);
                Self::start_attack(base);
            }
            AfterTransition::DragonAttackStarted => {
                self.attacking = true;
                self.state_time = BREATH_FRAMES;
            }
            AfterTransition::DragonAttackDone => {
                self.attacking = false;
                // Running out of targets leaves a longer pause.
                self.state_time = self.state_time.max(60.0);
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
        explosion::create(level, base.pos.trunc(), ExplosionType::Tiny);
        EnemyBase::try_generate_random_drop(base, level);
        self.enemy.perish(base, level, collider)
    }
}

/// A short-lived fireball.
///
/// Parameter byte 0 is non-zero when it flies left.
#[derive(Debug, Default)]
pub struct DragonFire {
    pub enemy: EnemyBase,
    time_left: f32,
}

impl DragonFire {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ActorBehavior for DragonFire {
    fn on_activated(
        &mut self,
        base: &mut ActorBase,
        level: &mut LevelHandler,
        details: &ActorActivationDetails,
    ) -> Activation {
        base.set_state(ActorState::IS_INVULNERABLE, true);
        base.set_state(ActorState::CAN_BE_FROZEN | ActorState::APPLY_GRAVITATION, false);
        self.enemy.can_collide_with_ammo = level.is_reforged();
        base.health = i32::MAX;
        base.set_facing_left(details.params[0] != 0);

        const BASE_SPEED: f32 = 1.6;
        let speed = BASE_SPEED + level.rng().range_f32(0.0, 0.2);
        base.speed.x = if base.is_facing_left() { -speed } else { speed };
        base.speed.y += level.rng().range_f32(-0.5, 0.5);
        self.time_left = 60.0;
        Activation::Await("Weapon/Toaster".to_string())
    }

    fn on_metadata_loaded(&mut self, base: &mut ActorBase, _level: &mut LevelHandler) -> Activation {
        base.set_animation("Idle");
        Activation::Commit
    }

    fn on_update(&mut self, base: &mut ActorBase, level: &mut LevelHandler, time_mult: f32) {
        let mut params = TileCollisionParams::downwards(base.speed.y >= 0.0);
        self.move_standard(base, level, time_mult, &mut params);
        self.on_update_hitbox(base);
        self.enemy.update(time_mult);

        if self.time_left <= 0.0 {
            base.decrease_health(i32::MAX, None);
        } else {
            self.time_left -= time_mult;
        }
    }

    fn on_update_hitbox(&mut self, base: &mut ActorBase) {
        base.update_hitbox(10.0, 10.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actors::player::Player;
    use crate::actors::test_support::{floor_level, run_frames, spawn, FLOOR_Y};
    use crate::config::PlayerType;

    fn fire_count(level: &LevelHandler) -> usize {
        level
            .iter_actors()
            .filter(|a| matches!(a.kind, ActorKind::DragonFire(_)))
            .count()
    }

    #[test]
    fn test_ignores_distant_players() {
        let mut level = floor_level();
        spawn(&mut level, ActorKind::Dragon(Dragon::new()), Vec2::new(200.0, FLOOR_Y - 16.0));
        spawn(
            &mut level,
            ActorKind::Player(Player::new(PlayerType::Jazz, 0)),
            Vec2::new(700.0, FLOOR_Y - 20.0),
        );
        run_frames(&mut level, 120);
        assert_eq!(fire_count(&level), 0);
    }

    #[test]
    fn test_breathes_fire_at_nearby_player() {
        let mut level = floor_level();
        let dragon = spawn(&mut level, ActorKind::Dragon(Dragon::new()), Vec2::new(200.0, FLOOR_Y - 16.0));
        spawn(
            &mut level,
            ActorKind::Player(Player::new(PlayerType::Jazz, 0)),
            Vec2::new(340.0, FLOOR_Y - 20.0),
        );

        let mut fired = false;
        for _ in 0..200 {
            run_frames(&mut level, 1);
            if fire_count(&level) > 0 {
                fired = true;
                break;
            }
        }
        assert!(fired);
        let actor = level.actor(dragon).expect("dragon");
        assert!(!actor.base.is_facing_left());
    }

    #[test]
    fn test_fire_burns_out() {
        let mut level = floor_level();
        let fire = spawn(&mut level, ActorKind::DragonFire(DragonFire::new()), Vec2::new(300.0, 100.0));
        run_frames(&mut level, 60);
        assert!(level.actor(fire).is_some());
        run_frames(&mut level, 1);
        assert!(level.actor(fire).is_none());
    }
}
