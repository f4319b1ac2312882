use super::CollectibleBase;
use crate::actors::{Activation, Actor, ActorActivationDetails, ActorBase, ActorBehavior, ActorState};
use crate::events::params::GemRingParams;
use crate::level_handler::LevelHandler;

/// A spinning ring of red gems, collected all at once.
#[derive(Debug)]
pub struct GemRing {
    pub collectible: CollectibleBase,
    length: i32,
    speed: f32,
    phase: f32,
    collected: bool,
    collected_phase: f32,
}

impl GemRing {
    pub fn new(params: GemRingParams) -> Self {
        let length = if params.length > 0 { params.length } else { 8 };
        let speed = if params.speed > 0 { params.speed } else { 8 };
        Self {
            collectible: CollectibleBase::new(0),
            length: i32::from(length),
            speed: f32::from(speed) * 0.00625,
            phase: 0.0,
            collected: false,
            collected_phase: 0.0,
        }
    }

    pub fn length(&self) -> i32 {
        self.length
    }

    pub fn is_collected(&self) -> bool {
        self.collected
    }

    fn on_collect(&mut self, base: &mut ActorBase, level: &mut LevelHandler, player: &mut Actor) {
        if self.collected {
            return;
        }
        self.collected = true;
        base.set_state(ActorState::COLLIDE_WITH_OTHER_ACTORS, false);
        if let Some(p) = player.kind.as_player_mut() {
            p.add_gems(&mut player.base, level, 0, self.length);
            p.add_score(800);
        }
    }
}

impl ActorBehavior for GemRing {
    fn on_activated(
        &mut self,
        base: &mut ActorBase,
        _level: &mut LevelHandler,
        details: &ActorActivationDetails,
    ) -> Activation {
        self.collectible.activate(base, details);
        self.collectible.untouched = false;
        base.set_state(ActorState::APPLY_GRAVITATION, false);
        Activation::Await("Collectible/Gems".to_string())
    }

    fn on_update(&mut self, base: &mut ActorBase, _level: &mut LevelHandler, time_mult: f32) {
        if self.collected {
            if self.collected_phase > 100.0 {
                base.decrease_health(i32::MAX, None);
                return;
            }
            self.phase += time_mult * self.speed * 3.0;
            self.collected_phase += time_mult;
        } else {
            self.phase += time_mult * self.speed;
        }
        self.on_update_hitbox(base);
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
        if other.kind.is_player() {
            self.on_collect(base, level, other);
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actors::player::Player;
    use crate::actors::test_support::{run_frames, spawn, test_level};
    use crate::actors::ActorKind;
    use crate::config::PlayerType;
    use glam::Vec2;

    #[test]
    fn test_defaults_for_zero_params() {
        let ring = GemRing::new(GemRingParams { length: 0, speed: 0 });
        assert_eq!(ring.length(), 8);
        assert!((ring.speed - 0.05).abs() < 1e-6);
    }

    #[test]
    fn test_ring_collected_once_then_fades() {
        let mut level = test_level(12, 8);
        let ring = spawn(
            &mut level,
            ActorKind::GemRing(GemRing::new(GemRingParams { length: 5, speed: 4 })),
            Vec2::new(64.0, 64.0),
        );
        let player = spawn(
            &mut level,
            ActorKind::Player(Player::new(PlayerType::Jazz, 0)),
            Vec2::new(300.0, 64.0),
        );

        let mut ring_actor = level.take_actor(ring).expect("ring");
        let mut player_actor = level.take_actor(player).expect("player");
        assert!(ring_actor.handle_collision(&mut level, &mut player_actor));
        assert!(ring_actor.handle_collision(&mut level, &mut player_actor));
        assert!(!ring_actor.base.has_state(ActorState::COLLIDE_WITH_OTHER_ACTORS));
        let p = player_actor.kind.as_player().expect("player");
        assert_eq!(p.gems()[0], 5);
        assert_eq!(p.score(), 800);
        level.return_actor(ring, ring_actor);
        level.return_actor(player, player_actor);

        run_frames(&mut level, 100);
        assert!(level.actor(ring).is_some());
        run_frames(&mut level, 3);
        assert!(level.actor(ring).is_none());
    }
}
