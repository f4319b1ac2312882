use glam::Vec2;

use crate::actors::{
    Activation, Actor, ActorActivationDetails, ActorBase, ActorBehavior, ActorState, MoveType,
};
use crate::events::params::{SpringOrientation, SpringParams};
use crate::level_handler::LevelHandler;
use crate::tiles::{TileCollisionParams, TILE_SIZE};

const COLORS: [&str; 3] = ["Red", "Green", "Blue"];

#[derive(Debug)]
pub struct Spring {
    pub params: SpringParams,
    orientation: SpringOrientation,
    strength: f32,
    cooldown: f32,
    frozen: bool,
}

impl Spring {
    pub fn new(params: SpringParams) -> Self {
        Self {
            params,
            orientation: params.orientation,
            strength: 0.0,
            cooldown: 0.0,
            frozen: params.frozen,
        }
    }

    pub fn orientation(&self) -> SpringOrientation {
        self.orientation
    }

    pub fn strength(&self) -> f32 {
        self.strength
    }

    /// Fire the spring. Returns the force applied to whoever touched it, or
    /// zero while it is cooling down or frozen.
    pub fn activate(&mut self, base: &mut ActorBase, level: &mut LevelHandler) -> Vec2 {
        if self.frozen || self.cooldown > 0.0 || base.frozen_time_left > 0.0 {
            return Vec2::ZERO;
        }
        self.cooldown = if self.params.delay > 0 {
            self.params.delay as f32
        } else {
            6.0
        };

        base.set_transition("Activated", false, crate::actors::AfterTransition::Nothing);
        match self.orientation {
            SpringOrientation::Bottom => {
                level.play_sfx("Spring/Vertical", base.pos);
                Vec2::new(0.0, -self.strength)
            }
            SpringOrientation::Top => {
                level.play_sfx("Spring/VerticalReversed", base.pos);
                Vec2::new(0.0, self.strength)
            }
            SpringOrientation::Right => {
                level.play_sfx("Spring/Horizontal", base.pos);
                Vec2::new(self.strength, 0.0)
            }
            SpringOrientation::Left => {
                level.play_sfx("Spring/Horizontal", base.pos);
                Vec2::new(-self.strength, 0.0)
            }
            SpringOrientation::Auto => Vec2::ZERO,
        }
    }

    /// Old level data doesn't store which way horizontal springs face; probe
    /// the tiles to the right instead.
    fn resolve_orientation(&mut self, base: &ActorBase, level: &LevelHandler) {
        if self.orientation != SpringOrientation::Auto {
            return;
        }
        let probe = jj_core::Aabb::new(base.pos.x + 6.0, base.pos.y - 2.0, base.pos.x + 26.0, base.pos.y);
        // Byte 5 in level data means "faces away from a wall on the right".
        let right_is_empty = level.tile_map().is_tile_empty_static(&probe, true);
        self.orientation = if right_is_empty {
            SpringOrientation::Left
        } else {
            SpringOrientation::Right
        };
    }
}

impl ActorBehavior for Spring {
    fn on_activated(
        &mut self,
        base: &mut ActorBase,
        _level: &mut LevelHandler,
        _details: &ActorActivationDetails,
    ) -> Activation {
        base.set_state(ActorState::SKIP_PER_PIXEL_COLLISIONS, true);
        Activation::Await("Object/Spring".to_string())
    }

    fn on_metadata_loaded(&mut self, base: &mut ActorBase, level: &mut LevelHandler) -> Activation {
        self.resolve_orientation(base, level);

        let corner = Vec2::new(
            ((base.pos.x as i32) / TILE_SIZE * TILE_SIZE) as f32,
            ((base.pos.y as i32) / TILE_SIZE * TILE_SIZE) as f32,
        );
        let mut params = TileCollisionParams::downwards(true);
        let force = MoveType::FORCE;
        let suffix = match self.orientation {
            SpringOrientation::Bottom | SpringOrientation::Auto => {
                base.move_instantly(level, corner + Vec2::new(16.0, 8.0), force, &mut params);
                ""
            }
            SpringOrientation::Right => {
                base.move_instantly(level, corner + Vec2::new(16.0, 16.0), force, &mut params);
                base.set_state(ActorState::APPLY_GRAVITATION, false);
                "Horizontal"
            }
            SpringOrientation::Top => {
                base.move_instantly(level, corner + Vec2::new(16.0, 8.0), force, &mut params);
                base.set_state(ActorState::APPLY_GRAVITATION, false);
                "Reversed"
            }
            SpringOrientation::Left => {
                base.move_instantly(level, corner + Vec2::new(16.0, 16.0), force, &mut params);
                base.set_state(ActorState::APPLY_GRAVITATION, false);
                base.set_facing_left(true);
                "Horizontal"
            }
        };
        let color = COLORS[(self.params.spring_type as usize).min(COLORS.len() - 1)];
        base.set_animation(&format!("{color}{suffix}"));

        self.strength = match self.orientation {
            SpringOrientation::Left | SpringOrientation::Right => 9.5,
            _ => match self.params.spring_type {
                0 => 1.25,
                1 => 1.5,
                _ if level.is_reforged() => 1.68,
                _ => 1.72,
            },
        };

        if base.has_state(ActorState::APPLY_GRAVITATION) {
            self.on_update_hitbox(base);
            // Drop onto the ground right away.
            let mut steps = 10;
            while steps > 0 && base.move_instantly(level, Vec2::new(0.0, 4.0), MoveType::RELATIVE, &mut params) {
                steps -= 1;
            }
            while steps > 0 && base.move_instantly(level, Vec2::new(0.0, 1.0), MoveType::RELATIVE, &mut params) {
                steps -= 1;
            }
        }

        if self.frozen {
            base.set_state(ActorState::CAN_BE_FROZEN, false);
        }
        Activation::Commit
    }

    fn on_update(&mut self, base: &mut ActorBase, level: &mut LevelHandler, time_mult: f32) {
        let mut params = TileCollisionParams::downwards(base.speed.y >= 0.0);
        self.move_standard(base, level, time_mult, &mut params);
        self.on_update_hitbox(base);
        base.update_frozen_state(level, time_mult);

        if self.cooldown > 0.0 {
            self.cooldown -= time_mult;
        }
    }

    fn on_update_hitbox(&mut self, base: &mut ActorBase) {
        let p = base.pos;
        base.aabb_inner = match self.orientation {
            SpringOrientation::Right => jj_core::Aabb::new(p.x - 8.0, p.y - 10.0, p.x, p.y + 10.0),
            SpringOrientation::Left => jj_core::Aabb::new(p.x, p.y - 10.0, p.x + 8.0, p.y + 10.0),
            _ => jj_core::Aabb::new(p.x - 10.0, p.y, p.x + 10.0, p.y + 8.0),
        };
    }

    fn on_handle_collision(
        &mut self,
        base: &mut ActorBase,
        _level: &mut LevelHandler,
        other: &mut Actor,
    ) -> bool {
        if base.has_state(ActorState::CAN_BE_FROZEN) {
            base.handle_frozen_state_change(other);
        }
        false
    }
}
