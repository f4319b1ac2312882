use glam::Vec2;

use super::CollectibleBase;
use crate::actors::{
    Activation, Actor, ActorActivationDetails, ActorBase, ActorBehavior, ActorKind, ActorState,
};
use crate::level_handler::LevelHandler;

const GEM_SCORES: [i32; 4] = [100, 500, 1000, 100];
const GEM_ANIMATIONS: [&str; 4] = ["GemRed", "GemGreen", "GemBlue", "GemPurple"];
/// Red gems a giant gem shatters into.
const GIANT_SHARDS: usize = 10;

#[derive(Debug)]
pub struct Gem {
    pub collectible: CollectibleBase,
    gem_type: u8,
    giant: bool,
    consumed: bool,
}

impl Gem {
    /// `gem_type`: 0 red, 1 green, 2 blue, 3 purple.
    pub fn new(gem_type: u8) -> Self {
        let gem_type = gem_type & 0x03;
        Self {
            collectible: CollectibleBase::new(GEM_SCORES[gem_type as usize]),
            gem_type,
            giant: false,
            consumed: false,
        }
    }

    /// Giant gems burst into a handful of red gems instead of being picked up.
    pub fn giant() -> Self {
        Self {
            collectible: CollectibleBase::new(0),
            gem_type: 0,
            giant: true,
            consumed: false,
        }
    }

    pub fn gem_type(&self) -> u8 {
        self.gem_type
    }

    pub fn is_consumed(&self) -> bool {
        self.consumed
    }

    /// Hand the gem to `player`. Does nothing the second time.
    pub fn on_collect(&mut self, base: &mut ActorBase, level: &mut LevelHandler, player: &mut Actor) {
        if self.consumed {
            return;
        }
        self.consumed = true;
        if let Some(p) = player.kind.as_player_mut() {
            p.add_gems(&mut player.base, level, self.gem_type, 1);
        }
        self.collectible.collect(base, level, player);
    }

    fn shatter(&mut self, base: &mut ActorBase, level: &mut LevelHandler) {
        if self.consumed {
            return;
        }
        self.consumed = true;
        for _ in 0..GIANT_SHARDS {
            let speed_x = level.rng().range_f32(-4.0, 4.0);
            let speed_y = level.rng().range_f32(-6.0, -2.0);
            if let Some(handle) = level.spawn_actor(
                ActorKind::Gem(Gem::new(0)),
                ActorActivationDetails::new(base.pos),
            ) {
                level.with_actor(handle, |shard, _| {
                    shard.base.external_force = Vec2::new(speed_x, speed_y);
                });
            }
        }
        level.play_common_sfx("GemSmash", base.pos);
        base.decrease_health(i32::MAX, None);
    }
}

impl ActorBehavior for Gem {
    fn on_activated(
        &mut self,
        base: &mut ActorBase,
        _level: &mut LevelHandler,
        details: &ActorActivationDetails,
    ) -> Activation {
        self.collectible.activate(base, details);
        if self.giant {
            base.set_state(ActorState::APPLY_GRAVITATION, false);
            self.collectible.untouched = false;
        }
        Activation::Await("Collectible/Gems".to_string())
    }

    fn on_metadata_loaded(&mut self, base: &mut ActorBase, _level: &mut LevelHandler) -> Activation {
        let animation = if self.giant {
            "GemGiant"
        } else {
            GEM_ANIMATIONS[self.gem_type as usize]
        };
        base.set_animation(animation);
        self.collectible.set_facing_direction(base);
        Activation::Commit
    }

    fn on_update(&mut self, base: &mut ActorBase, level: &mut LevelHandler, time_mult: f32) {
        if !self.giant {
            let mut params = crate::tiles::TileCollisionParams::downwards(base.speed.y >= 0.0);
            if !self.collectible.untouched {
                self.move_standard(base, level, time_mult, &mut params);
            }
            self.collectible.update(base, level, time_mult);
        }
        self.on_update_hitbox(base);
    }

    fn on_update_hitbox(&mut self, base: &mut ActorBase) {
        if self.giant {
            base.update_hitbox(32.0, 32.0);
        } else {
            base.update_hitbox(16.0, 16.0);
        }
    }

    fn on_handle_collision(
        &mut self,
        base: &mut ActorBase,
        level: &mut LevelHandler,
        other: &mut Actor,
    ) -> bool {
        if self.giant {
            if other.kind.is_player() || other.kind.shot().is_some() || matches!(other.kind, ActorKind::Tnt(_)) {
                self.shatter(base, level);
                return true;
            }
            return false;
        }
        if self.collectible.touched_by(base, level, other) {
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
    use crate::config::PlayerType;

    #[test]
    fn test_blue_gem_awards_once() {
        let mut level = test_level(10, 10);
        let gem = spawn(&mut level, ActorKind::Gem(Gem::new(2)), Vec2::new(64.0, 64.0));
        let player = spawn(
            &mut level,
            ActorKind::Player(Player::new(PlayerType::Jazz, 0)),
            Vec2::new(200.0, 64.0),
        );

        let mut gem_actor = level.take_actor(gem).expect("gem");
        let mut player_actor = level.take_actor(player).expect("player");
        let ActorKind::Gem(g) = &mut gem_actor.kind else {
            panic!("not a gem");
        };
        g.on_collect(&mut gem_actor.base, &mut level, &mut player_actor);
        g.on_collect(&mut gem_actor.base, &mut level, &mut player_actor);
        assert!(g.is_consumed());

        let p = player_actor.kind.as_player().expect("player");
        assert_eq!(p.gems(), [0, 0, 1, 0]);
        assert_eq!(p.score(), 1000);

        level.return_actor(gem, gem_actor);
        level.return_actor(player, player_actor);
        run_frames(&mut level, 1);
        assert!(level.actor(gem).is_none());
    }

    #[test]
    fn test_gem_type_wraps_to_two_bits() {
        assert_eq!(Gem::new(6).gem_type(), 2);
        assert_eq!(Gem::new(3).collectible.score, 100);
    }

    #[test]
    fn test_giant_gem_shatters_into_red_gems() {
        let mut level = test_level(12, 12);
        let giant = spawn(&mut level, ActorKind::Gem(Gem::giant()), Vec2::new(160.0, 160.0));
        let player = spawn(
            &mut level,
            ActorKind::Player(Player::new(PlayerType::Jazz, 0)),
            Vec2::new(300.0, 100.0),
        );
        let before = level.actor_count();

        let mut giant_actor = level.take_actor(giant).expect("giant");
        let mut player_actor = level.take_actor(player).expect("player");
        assert!(giant_actor.handle_collision(&mut level, &mut player_actor));
        assert!(giant_actor.is_destroyed());
        level.return_actor(giant, giant_actor);
        level.return_actor(player, player_actor);

        let red_gems = level
            .iter_actors()
            .filter(|a| matches!(&a.kind, ActorKind::Gem(g) if !g.giant && g.gem_type() == 0))
            .count();
        assert_eq!(red_gems, GIANT_SHARDS);
        assert!(level.actor_count() >= before + GIANT_SHARDS);
    }
}
