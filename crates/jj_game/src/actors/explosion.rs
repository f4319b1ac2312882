//! Short-lived visual effects. Most kinds play one clip and disappear;
//! ice shrapnel falls and bounces until it fades out.

use glam::Vec2;

use super::{
    ActorActivationDetails, ActorBase, ActorBehavior, ActorHandle, ActorKind, ActorState,
    Activation,
};
use crate::level_handler::LevelHandler;
use crate::tiles::TileCollisionParams;

const ICE_SHRAPNELS: [&str; 4] = ["IceShrapnel1", "IceShrapnel2", "IceShrapnel3", "IceShrapnel4"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExplosionType {
    Tiny,
    TinyBlue,
    TinyDark,
    Small,
    SmallDark,
    Large,
    SmokeBrown,
    SmokeGray,
    SmokeWhite,
    SmokePoof,
    WaterSplash,
    Pepper,
    RF,
    IceShrapnel,
    Generator,
}

impl ExplosionType {
    fn animation(self) -> &'static str {
        match self {
            Self::Tiny => "Tiny",
            Self::TinyBlue => "TinyBlue",
            Self::TinyDark => "TinyDark",
            Self::Small => "Small",
            Self::SmallDark => "SmallDark",
            Self::Large => "Large",
            Self::SmokeBrown => "SmokeBrown",
            Self::SmokeGray => "SmokeGray",
            Self::SmokeWhite => "SmokeWhite",
            Self::SmokePoof => "SmokePoof",
            Self::WaterSplash => "WaterSplash",
            Self::Pepper => "Pepper",
            Self::RF => "RF",
            Self::IceShrapnel => "IceShrapnel1",
            Self::Generator => "Generator",
        }
    }
}

#[derive(Debug)]
pub struct Explosion {
    pub explosion_type: ExplosionType,
    /// Fades ice shrapnel out.
    alpha: f32,
    light_radius: f32,
}

impl Explosion {
    pub fn new(explosion_type: ExplosionType) -> Self {
        Self {
            explosion_type,
            alpha: 1.0,
            light_radius: 0.0,
        }
    }

    pub fn light_radius(&self) -> f32 {
        self.light_radius
    }
}

/// Spawn an effect at `pos`.
pub fn create(level: &mut LevelHandler, pos: Vec2, explosion_type: ExplosionType) -> Option<ActorHandle> {
    level.spawn_actor(
        ActorKind::Explosion(Explosion::new(explosion_type)),
        ActorActivationDetails::new(pos),
    )
}

impl ActorBehavior for Explosion {
    fn on_activated(
        &mut self,
        base: &mut ActorBase,
        _level: &mut LevelHandler,
        _details: &ActorActivationDetails,
    ) -> Activation {
        base.set_state(ActorState::FORCE_DISABLE_COLLISIONS, true);
        base.set_state(
            ActorState::CAN_BE_FROZEN
                | ActorState::COLLIDE_WITH_TILESET
                | ActorState::COLLIDE_WITH_OTHER_ACTORS
                | ActorState::APPLY_GRAVITATION,
            false,
        );
        Activation::Await("Common/Explosions".to_string())
    }

    fn on_metadata_loaded(&mut self, base: &mut ActorBase, level: &mut LevelHandler) -> Activation {
        match self.explosion_type {
            ExplosionType::IceShrapnel => {
                let rng = level.rng();
                let name = ICE_SHRAPNELS[rng.index(ICE_SHRAPNELS.len())];
                let speed_x = rng.range_f32(0.5, 2.0);
                let left = rng.next_bool();
                let speed_y = rng.range_f32(-4.0, -1.0);
                base.set_animation(name);
                base.set_state(
                    ActorState::COLLIDE_WITH_TILESET
                        | ActorState::APPLY_GRAVITATION
                        | ActorState::SKIP_PER_PIXEL_COLLISIONS,
                    true,
                );
                base.set_state(ActorState::FORCE_DISABLE_COLLISIONS, false);
                base.speed = Vec2::new(if left { -speed_x } else { speed_x }, speed_y);
                base.elasticity = 0.2;
                base.set_facing_left(left);
            }
            ExplosionType::Generator => {
                let left = level.rng().next_bool();
                base.set_animation("Generator");
                base.set_facing_left(left);
            }
            other => {
                base.set_animation(other.animation());
                self.light_radius = match other {
                    ExplosionType::Large => 55.0,
                    ExplosionType::RF => 50.0,
                    ExplosionType::Pepper => 14.0,
                    _ => 0.0,
                };
            }
        }
        Activation::Commit
    }

    fn on_update(&mut self, base: &mut ActorBase, level: &mut LevelHandler, time_mult: f32) {
        match self.explosion_type {
            ExplosionType::IceShrapnel => {
                let mut params = TileCollisionParams::downwards(base.speed.y >= 0.0);
                self.move_standard(base, level, time_mult, &mut params);
                self.on_update_hitbox(base);

                self.alpha -= 0.014 * time_mult;
                if self.alpha <= 0.0 {
                    base.decrease_health(i32::MAX, None);
                }
                return;
            }
            ExplosionType::Large => self.light_radius -= time_mult * 5.0,
            ExplosionType::RF => self.light_radius -= time_mult * 0.8,
            _ => {}
        }
        // One-shot clips remove the effect once they played through.
        let finished = base.animation.as_ref().map_or(true, |a| a.finished);
        if finished {
            base.decrease_health(i32::MAX, None);
        }
    }

    fn on_update_hitbox(&mut self, base: &mut ActorBase) {
        base.update_hitbox(2.0, 2.0);
    }
}
