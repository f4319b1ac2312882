use glam::Vec2;

use super::BossBase;
use crate::actors::enemies::turtle_shell::TurtleShell;
use crate::actors::enemies::EnemyBase;
use crate::actors::explosion::{self, ExplosionType};
use crate::actors::{
    Activation, Actor, ActorActivationDetails, ActorBase, ActorBehavior, ActorHandle, ActorKind,
    ActorState, AfterTransition, MoveType,
};
use crate::events::params::TurtleShellParams;
use crate::level_handler::LevelHandler;
use crate::tiles::TileCollisionParams;

const METADATA: &str = "Boss/TurtleBoss";
const WALK_SPEED: f32 = 1.6;
const MACE_FLIGHT: f32 = 60.0;
const MACE_TIME: f32 = 480.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TurtleBossState {
    #[default]
    Waiting,
    Walking1,
    Walking2,
    Transition,
    Attacking,
    Dying,
}

/// Walks towards the nearest player and throws a mace that flies at them and
/// swings back.
#[derive(Debug, Default)]
pub struct TurtleBoss {
    pub boss: BossBase,
    state: TurtleBossState,
    state_time: f32,
    mace: Option<ActorHandle>,
    mace_time: f32,
}

impl TurtleBoss {
    pub fn new() -> Self {
        Self {
            boss: BossBase::new(5000),
            ..Self::default()
        }
    }

    pub fn state(&self) -> TurtleBossState {
        self.state
    }

    pub fn mace(&self) -> Option<ActorHandle> {
        self.mace
    }

    fn follow_nearest_player(&mut self, base: &mut ActorBase, level: &LevelHandler, state: TurtleBossState, time: f32) {
        let Some(target) = EnemyBase::nearest_player(base, level, f32::MAX) else {
            return;
        };
        self.state = state;
        self.state_time = time;
        base.set_facing_left(target.x < base.pos.x);
        base.speed.x = if base.is_facing_left() { -WALK_SPEED } else { WALK_SPEED };
        base.set_animation("Walk");
    }

    fn drop_mace(&mut self, level: &mut LevelHandler) {
        if let Some(mace) = self.mace.take() {
            level.decrease_actor_health(mace, i32::MAX, None);
        }
    }

    fn throw_mace(&mut self, base: &ActorBase, level: &mut LevelHandler) {
        let mut mace = TurtleBossMace::new();
        mace.target = EnemyBase::nearest_player(base, level, f32::MAX);
        self.mace = level.spawn_actor(
            ActorKind::TurtleBossMace(mace),
            ActorActivationDetails::new(base.pos.trunc()),
        );
    }

    fn die(&mut self, base: &mut ActorBase, level: &mut LevelHandler) {
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
            theme: 2,
        };
        let pos = base.pos.trunc();
        level.spawn_actor(
            ActorKind::TurtleShell(TurtleShell::new()),
            ActorActivationDetails::new(pos).with_params(params.encode()),
        );
        explosion::create(level, pos, ExplosionType::SmokeGray);
        level.play_common_sfx("Splat", base.pos);
        self.boss.show_end_text(level);
        self.boss.enemy.add_score_to_collider(level, None);
        base.perish(level);
    }
}

impl ActorBehavior for TurtleBoss {
    fn on_activated(
        &mut self,
        base: &mut ActorBase,
        _level: &mut LevelHandler,
        details: &ActorActivationDetails,
    ) -> Activation {
        self.boss.activate(base, details);
        self.boss.enemy.score = 5000;
        base.set_facing_left(true);
        Activation::Await(METADATA.to_string())
    }

    fn on_metadata_loaded(&mut self, base: &mut ActorBase, _level: &mut LevelHandler) -> Activation {
        base.set_animation("Idle");
        Activation::Commit
    }

    fn on_activated_boss(&mut self, base: &mut ActorBase, level: &mut LevelHandler) -> bool {
        if !self.boss.mark_activated() {
            return true;
        }
        log::info!("Turtle boss {:?} activated", base.handle);
        EnemyBase::set_health_by_difficulty(base, level, 100);
        let mut params = TileCollisionParams::default();
        base.move_instantly(level, self.boss.origin_pos, MoveType::FORCE, &mut params);
        let time = level.rng().range_f32(120.0, 160.0);
        self.follow_nearest_player(base, level, TurtleBossState::Walking1, time);
        true
    }

    fn on_update(&mut self, base: &mut ActorBase, level: &mut LevelHandler, time_mult: f32) {
        self.boss.enemy.update(time_mult);
        let mut params = TileCollisionParams::downwards(base.speed.y >= 0.0);
        self.move_standard(base, level, time_mult, &mut params);
        self.on_update_hitbox(base);
        base.update_frozen_state(level, time_mult);

        if base.frozen_time_left > 0.0 {
            return;
        }

        match self.state {
            TurtleBossState::Walking1 => {
                if self.state_time <= 0.0 {
                    self.follow_nearest_player(base, level, TurtleBossState::Walking2, 16.0);
                } else if !EnemyBase::can_move_to_position(base, level, base.speed.x, 0.0) {
                    base.set_facing_left(!base.is_facing_left());
                    base.speed.x = -base.speed.x;
                }
            }
            TurtleBossState::Walking2 => {
                if self.state_time <= 0.0 {
                    base.speed.x = 0.0;
                    level.play_sfx("AttackStart", base.pos);
                    self.state = TurtleBossState::Transition;
                    base.set_animation("Idle");
                    base.set_transition("TransitionAttackStart", false, AfterTransition::BossMaceThrown);
                } else if !EnemyBase::can_move_to_position(base, level, base.speed.x, 0.0) {
                    base.speed.x = 0.0;
                    base.set_animation("Idle");
                }
            }
            TurtleBossState::Attacking => {
                self.mace_time -= time_mult;
                if self.mace_time <= 0.0 && self.mace.is_some() {
                    self.drop_mace(level);
                    base.set_transition("TransitionAttackEnd", false, AfterTransition::BossMaceReturned);
                }
            }
            TurtleBossState::Waiting | TurtleBossState::Transition | TurtleBossState::Dying => {}
        }

        self.state_time -= time_mult;
    }

    fn on_update_hitbox(&mut self, base: &mut ActorBase) {
        base.update_hitbox(40.0, 40.0);
    }

    fn on_handle_collision(
        &mut self,
        base: &mut ActorBase,
        level: &mut LevelHandler,
        other: &mut Actor,
    ) -> bool {
        if self.state == TurtleBossState::Attacking
            && self.state_time <= 0.0
            && self.mace == Some(other.handle())
        {
            other.base.decrease_health(i32::MAX, None);
            self.mace = None;
            level.play_sfx("AttackEnd", base.pos);
            base.set_transition("TransitionAttackEnd", false, AfterTransition::BossMaceReturned);
            return true;
        }
        self.boss.enemy.handle_collision(base, other)
    }

    fn on_health_changed(
        &mut self,
        base: &mut ActorBase,
        _level: &mut LevelHandler,
        _collider: Option<ActorHandle>,
    ) {
        self.boss.enemy.start_blinking(base);
    }

    fn on_transition_finished(
        &mut self,
        base: &mut ActorBase,
        level: &mut LevelHandler,
        action: AfterTransition,
    ) {
        if self.state == TurtleBossState::Dying && action != AfterTransition::BossDied {
            return;
        }
        match action {
            AfterTransition::BossMaceThrown => {
                self.throw_mace(base, level);
                base.set_transition("TransitionAttackThrow", false, AfterTransition::BossAttackReady);
            }
            AfterTransition::BossAttackReady => {
                self.state = TurtleBossState::Attacking;
                self.state_time = 10.0;
                self.mace_time = MACE_TIME;
            }
            AfterTransition::BossMaceReturned => {
                let time = level.rng().range_f32(80.0, 160.0);
                self.follow_nearest_player(base, level, TurtleBossState::Walking1, time);
            }
            AfterTransition::BossDied => self.die(base, level),
            AfterTransition::Destroy => base.destroy(),
            _ => {}
        }
    }

    fn on_perish(
        &mut self,
        base: &mut ActorBase,
        level: &mut LevelHandler,
        _collider: Option<ActorHandle>,
    ) -> bool {
        self.drop_mace(level);
        self.state = TurtleBossState::Dying;
        self.boss.enemy.can_hurt_player = false;
        base.speed.x = 0.0;
        base.set_state(ActorState::IS_INVULNERABLE, true);
        base.force_cancel_transition();
        base.set_transition("TransitionDeath", false, AfterTransition::BossDied);
        false
    }

    fn on_tile_deactivated(&mut self, _base: &mut ActorBase, _level: &mut LevelHandler) -> bool {
        false
    }
}

/// The boss's thrown mace. Flies at the nearest player for half its flight,
/// then steers back to where it was thrown from.
#[derive(Debug, Default)]
pub struct TurtleBossMace {
    pub enemy: EnemyBase,
    /// Where it was aimed; set by the thrower.
    pub target: Option<Vec2>,
    origin: Vec2,
    return_time: f32,
    returning: bool,
    target_speed: Vec2,
}

impl TurtleBossMace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_returning(&self) -> bool {
        self.returning
    }
}

impl ActorBehavior for TurtleBossMace {
    fn on_activated(
        &mut self,
        base: &mut ActorBase,
        level: &mut LevelHandler,
        _details: &ActorActivationDetails,
    ) -> Activation {
        base.set_state(ActorState::IS_INVULNERABLE, true);
        base.set_state(
            ActorState::COLLIDE_WITH_TILESET
                | ActorState::COLLIDE_WITH_SOLID_OBJECTS
                | ActorState::CAN_BE_FROZEN
                | ActorState::APPLY_GRAVITATION,
            false,
        );
        self.enemy.can_collide_with_ammo = false;
        base.health = i32::MAX;
        self.origin = base.pos;

        let target = self
            .target
            .or_else(|| EnemyBase::nearest_player(base, level, f32::MAX));
        if let Some(target) = target {
            base.set_facing_left(target.x < self.origin.x);
            self.return_time = MACE_FLIGHT / 2.0;
            base.speed = (target - self.origin) / self.return_time;
        }
        level.play_sfx("Mace", base.pos);
        Activation::Await(METADATA.to_string())
    }

    fn on_metadata_loaded(&mut self, base: &mut ActorBase, _level: &mut LevelHandler) -> Activation {
        base.set_animation("Mace");
        Activation::Commit
    }

    fn on_update(&mut self, base: &mut ActorBase, level: &mut LevelHandler, time_mult: f32) {
        let mut params = TileCollisionParams::default();
        base.move_instantly(
            level,
            base.speed * time_mult,
            MoveType::RELATIVE | MoveType::FORCE,
            &mut params,
        );
        self.on_update_hitbox(base);

        if self.returning {
            let diff = self.target_speed - base.speed;
            if diff.length_squared() > 1.0 {
                base.speed += diff * 0.04;
            }
        } else if self.return_time > 0.0 {
            self.return_time -= time_mult;
        } else {
            self.returning = true;
            self.target_speed = (self.origin - base.pos) / (MACE_FLIGHT / 2.0);
        }
    }

    fn on_update_hitbox(&mut self, base: &mut ActorBase) {
        base.update_hitbox(18.0, 18.0);
    }

    fn on_tile_deactivated(&mut self, _base: &mut ActorBase, _level: &mut LevelHandler) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actors::player::Player;
    use crate::actors::test_support::{floor_level, run_frames, spawn, FLOOR_Y};
    use crate::config::PlayerType;

    fn boss_state(level: &LevelHandler, handle: ActorHandle) -> Option<TurtleBossState> {
        match level.actor(handle).map(|a| &a.kind) {
            Some(ActorKind::TurtleBoss(b)) => Some(b.state()),
            _ => None,
        }
    }

    #[test]
    fn test_waits_until_activated() {
        let mut level = floor_level();
        let boss = spawn(&mut level, ActorKind::TurtleBoss(TurtleBoss::new()), Vec2::new(500.0, FLOOR_Y - 20.0));
        spawn(
            &mut level,
            ActorKind::Player(Player::new(PlayerType::Jazz, 0)),
            Vec2::new(200.0, FLOOR_Y - 20.0),
        );
        run_frames(&mut level, 30);
        assert_eq!(boss_state(&level, boss), Some(TurtleBossState::Waiting));

        let mut actor = level.take_actor(boss).expect("boss");
        assert!(actor.on_activated_boss(&mut level));
        level.return_actor(boss, actor);

        let actor = level.actor(boss).expect("boss");
        assert_eq!(actor.base.health, 100);
        assert!(actor.base.is_facing_left());
        assert_eq!(actor.base.speed.x, -WALK_SPEED);
        assert_eq!(boss_state(&level, boss), Some(TurtleBossState::Walking1));
    }

    #[test]
    fn test_refuses_deactivation() {
        let mut level = floor_level();
        let boss = spawn(&mut level, ActorKind::TurtleBoss(TurtleBoss::new()), Vec2::new(500.0, FLOOR_Y - 20.0));
        let mut actor = level.take_actor(boss).expect("boss");
        assert!(!actor.on_tile_deactivated(&mut level));
        level.return_actor(boss, actor);
    }

    #[test]
    fn test_death_is_deferred_to_animation() {
        let mut level = floor_level();
        let boss = spawn(&mut level, ActorKind::TurtleBoss(TurtleBoss::new()), Vec2::new(500.0, FLOOR_Y - 20.0));
        let player = spawn(
            &mut level,
            ActorKind::Player(Player::new(PlayerType::Jazz, 0)),
            Vec2::new(200.0, FLOOR_Y - 20.0),
        );
        let mut actor = level.take_actor(boss).expect("boss");
        actor.on_activated_boss(&mut level);
        if let ActorKind::TurtleBoss(b) = &mut actor.kind {
            b.boss.enemy.scorer = Some(player);
        }
        actor.decrease_health(&mut level, i32::MAX, None);
        assert!(!actor.is_destroyed());
        level.return_actor(boss, actor);
        assert_eq!(boss_state(&level, boss), Some(TurtleBossState::Dying));

        run_frames(&mut level, 200);
        assert!(level.actor(boss).is_none());
        let score = level.actor(player).and_then(|a| a.kind.as_player()).map(|p| p.score());
        assert_eq!(score, Some(5000));
        assert!(level
            .iter_actors()
            .any(|a| matches!(a.kind, ActorKind::TurtleShell(_))));
    }

    #[test]
    fn test_mace_flies_out_and_back() {
        let mut level = floor_level();
        spawn(
            &mut level,
            ActorKind::Player(Player::new(PlayerType::Jazz, 0)),
            Vec2::new(200.0, FLOOR_Y - 20.0),
        );
        let origin = Vec2::new(500.0, FLOOR_Y - 20.0);
        let mace = spawn(&mut level, ActorKind::TurtleBossMace(TurtleBossMace::new()), origin);

        run_frames(&mut level, 30);
        let far = level.actor(mace).expect("mace").base.pos;
        assert!(far.x < 260.0);

        run_frames(&mut level, 120);
        let back = level.actor(mace).expect("mace").base.pos;
        assert!(back.x > far.x + 100.0);
    }
}
