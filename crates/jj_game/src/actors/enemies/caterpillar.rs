use glam::Vec2;

use super::EnemyBase;
use crate::actors::{
    Activation, Actor, ActorActivationDetails, ActorBase, ActorBehavior, ActorKind, ActorState,
    AfterTransition, MoveType,
};
use crate::level_handler::LevelHandler;
use crate::tiles::TileCollisionParams;

const METADATA: &str = "Enemy/Caterpillar";
/// Clips played in order before the smoke attack starts.
const INHALE_CLIPS: [&str; 3] = ["InhaleStart", "Inhale", "ExhaleStart"];
const SMOKE_LIFETIME: f32 = 500.0;
const DIZZY_FRAMES: f32 = 180.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaterpillarState {
    #[default]
    Idle,
    Attacking,
    Disoriented,
}

/// Sits on its mushroom and blows smoke rings that make players dizzy.
/// Can't be hurt; shooting it only makes it lose track for a while.
#[derive(Debug, Default)]
pub struct Caterpillar {
    pub enemy: EnemyBase,
    state: CaterpillarState,
    smokes_left: i32,
    attack_time: f32,
    disoriented_left: i32,
}

impl Caterpillar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> CaterpillarState {
        self.state
    }

    fn disoriented(&mut self, base: &mut ActorBase, count: i32) {
        self.attack_time = 0.0;
        self.smokes_left = 0;
        self.state = CaterpillarState::Disoriented;
        self.disoriented_left = count;
        base.set_transition("Disoriented", false, AfterTransition::CaterpillarDisoriented);
    }

    fn blow_smoke(&mut self, base: &mut ActorBase, level: &mut LevelHandler) {
        let pos = Vec2::new(base.pos.x.trunc() - 26.0, base.pos.y.trunc() - 18.0);
        level.spawn_actor(
            ActorKind::CaterpillarSmoke(CaterpillarSmoke::new()),
            ActorActivationDetails::new(pos),
        );
        self.smokes_left -= 1;
        if self.smokes_left <= 0 {
            self.state = CaterpillarState::Idle;
            base.set_animation("Idle");
        }
    }
}

impl ActorBehavior for Caterpillar {
    fn on_activated(
        &mut self,
        base: &mut ActorBase,
        _level: &mut LevelHandler,
        _details: &ActorActivationDetails,
    ) -> Activation {
        base.set_state(ActorState::CAN_BE_FROZEN, false);
        base.set_state(ActorState::IS_INVULNERABLE, true);
        base.set_facing_left(true);
        self.enemy.can_hurt_player = false;
        self.enemy.can_collide_with_ammo = false;
        base.health = i32::MAX;
        base.max_health = i32::MAX;
        Activation::Await(METADATA.to_string())
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

        match self.state {
            CaterpillarState::Idle => {
                if !base.has_transition() {
                    base.set_transition(INHALE_CLIPS[0], true, AfterTransition::CaterpillarIdle(1));
                }
            }
            CaterpillarState::Attacking => {
                if self.attack_time <= 0.0 {
                    self.attack_time = 60.0;
                    base.set_animation("Attacking");
                    base.set_transition("Exhale", true, AfterTransition::CaterpillarSmoke);
                } else {
                    self.attack_time -= time_mult;
                }
            }
            CaterpillarState::Disoriented => {}
        }
    }

    fn on_handle_collision(
        &mut self,
        base: &mut ActorBase,
        level: &mut LevelHandler,
        other: &mut Actor,
    ) -> bool {
        if other.kind.shot().is_some() && self.state != CaterpillarState::Disoriented {
            let count = level.rng().range_i32(8, 13);
            self.disoriented(base, count);
        }
        false
    }

    fn on_transition_finished(
        &mut self,
        base: &mut ActorBase,
        level: &mut LevelHandler,
        action: AfterTransition,
    ) {
        match action {
            AfterTransition::CaterpillarIdle(stage) if self.state == CaterpillarState::Idle => {
                match INHALE_CLIPS.get(stage as usize) {
                    Some(clip) => {
                        base.set_transition(clip, true, AfterTransition::CaterpillarIdle(stage + 1));
                    }
                    None => {
                        self.state = CaterpillarState::Attacking;
                        self.smokes_left = level.rng().range_i32(6, 12);
                    }
                }
            }
            AfterTransition::CaterpillarSmoke if self.state == CaterpillarState::Attacking => {
                self.blow_smoke(base, level);
            }
            AfterTransition::CaterpillarDisoriented => {
                if self.disoriented_left > 1 {
                    let count = self.disoriented_left - 1;
                    self.disoriented(base, count);
                } else {
                    self.disoriented_left = 0;
                    self.state = CaterpillarState::Idle;
                    base.set_animation("Idle");
                }
            }
            AfterTransition::Destroy => base.destroy(),
            _ => {}
        }
    }
}

/// A drifting smoke ring. Harmless, but leaves players dizzy.
#[derive(Debug, Default)]
pub struct CaterpillarSmoke {
    pub enemy: EnemyBase,
    base_speed: Vec2,
    time: f32,
}

impl CaterpillarSmoke {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ActorBehavior for CaterpillarSmoke {
    fn on_activated(
        &mut self,
        base: &mut ActorBase,
        level: &mut LevelHandler,
        _details: &ActorActivationDetails,
    ) -> Activation {
        base.set_state(
            ActorState::CAN_BE_FROZEN | ActorState::COLLIDE_WITH_TILESET | ActorState::APPLY_GRAVITATION,
            false,
        );
        base.set_state(
            ActorState::IS_INVULNERABLE | ActorState::SKIP_PER_PIXEL_COLLISIONS,
            true,
        );
        self.enemy.can_collide_with_ammo = false;
        self.enemy.can_hurt_player = false;
        base.health = i32::MAX;

        self.base_speed = Vec2::new(
            level.rng().range_f32(-1.4, -0.8),
            level.rng().range_f32(-1.6, -0.8),
        );
        self.time = SMOKE_LIFETIME;
        Activation::Await(METADATA.to_string())
    }

    fn on_metadata_loaded(&mut self, base: &mut ActorBase, _level: &mut LevelHandler) -> Activation {
        base.set_animation("Smoke");
        Activation::Commit
    }

    fn on_update(&mut self, base: &mut ActorBase, level: &mut LevelHandler, time_mult: f32) {
        let age = SMOKE_LIFETIME - self.time;
        base.speed.x = self.base_speed.x + (age * 0.09).cos() * 0.5;
        base.speed.y = self.base_speed.y + (age * 0.05).sin() * 0.5;

        let mut params = TileCollisionParams::default();
        base.move_instantly(
            level,
            base.speed * time_mult,
            MoveType::RELATIVE | MoveType::FORCE,
            &mut params,
        );
        self.on_update_hitbox(base);

        if self.time <= 0.0 {
            base.decrease_health(i32::MAX, None);
        } else {
            self.time -= time_mult;
        }
    }

    fn on_handle_collision(
        &mut self,
        base: &mut ActorBase,
        level: &mut LevelHandler,
        other: &mut Actor,
    ) -> bool {
        if let Some(player) = other.kind.as_player_mut() {
            if player.set_dizzy_time(DIZZY_FRAMES) {
                level.play_sfx("Dizzy", base.pos);
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actors::test_support::{floor_level, run_frames, spawn, FLOOR_Y};
    use crate::actors::weapons::blaster::BlasterShot;

    fn caterpillar_state(level: &LevelHandler, handle: crate::actors::ActorHandle) -> CaterpillarState {
        match level.actor(handle).map(|a| &a.kind) {
            Some(ActorKind::Caterpillar(c)) => c.state(),
            _ => panic!("caterpillar missing"),
        }
    }

    fn smoke_count(level: &LevelHandler) -> usize {
        level
            .iter_actors()
            .filter(|a| matches!(a.kind, ActorKind::CaterpillarSmoke(_)))
            .count()
    }

    #[test]
    fn test_inhales_then_blows_smoke() {
        let mut level = floor_level();
        let caterpillar = spawn(
            &mut level,
            ActorKind::Caterpillar(Caterpillar::new()),
            Vec2::new(300.0, FLOOR_Y - 20.0),
        );
        assert_eq!(caterpillar_state(&level, caterpillar), CaterpillarState::Idle);

        let mut attacked = false;
        for _ in 0..600 {
            run_frames(&mut level, 1);
            if smoke_count(&level) > 0 {
                attacked = true;
                break;
            }
        }
        assert!(attacked);
    }

    #[test]
    fn test_shot_disorients_without_damage() {
        let mut level = floor_level();
        let caterpillar = spawn(
            &mut level,
            ActorKind::Caterpillar(Caterpillar::new()),
            Vec2::new(300.0, FLOOR_Y - 20.0),
        );
        let shot = spawn(
            &mut level,
            ActorKind::BlasterShot(BlasterShot::new(None, 0.0)),
            Vec2::new(100.0, 100.0),
        );

        let mut caterpillar_actor = level.take_actor(caterpillar).expect("caterpillar");
        let mut shot_actor = level.take_actor(shot).expect("shot");
        assert!(!shot_actor.handle_collision(&mut level, &mut caterpillar_actor));
        assert!(!caterpillar_actor.handle_collision(&mut level, &mut shot_actor));
        assert_eq!(caterpillar_actor.base.health, i32::MAX);
        level.return_actor(caterpillar, caterpillar_actor);
        level.return_actor(shot, shot_actor);

        assert_eq!(caterpillar_state(&level, caterpillar), CaterpillarState::Disoriented);
    }

    #[test]
    fn test_smoke_fades_out() {
        let mut level = floor_level();
        let smoke = spawn(
            &mut level,
            ActorKind::CaterpillarSmoke(CaterpillarSmoke::new()),
            Vec2::new(500.0, 200.0),
        );
        run_frames(&mut level, 400);
        assert!(level.actor(smoke).is_some());
        run_frames(&mut level, 110);
        assert!(level.actor(smoke).is_none());
    }
}
