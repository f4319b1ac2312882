use super::ShotBase;
use crate::actors::explosion::ExplosionType;
use crate::actors::{
    Activation, Actor, ActorActivationDetails, ActorBase, ActorBehavior, ActorHandle, MoveType,
};
use crate::level_handler::LevelHandler;
use crate::tiles::TileCollisionParams;

/// Passes through solid tiles and breaks destructible ones until its
/// strength is used up.
#[derive(Debug)]
pub struct ElectroShot {
    pub shot: ShotBase,
    /// Tile-breaking strength left.
    charge: i32,
}

impl ElectroShot {
    pub fn new(owner: Option<ActorHandle>, owner_speed_x: f32) -> Self {
        Self {
            shot: ShotBase::new(owner, owner_speed_x),
            charge: 0,
        }
    }
}

impl ActorBehavior for ElectroShot {
    fn on_activated(
        &mut self,
        base: &mut ActorBase,
        level: &mut LevelHandler,
        details: &ActorActivationDetails,
    ) -> Activation {
        self.shot.activate(base, details);
        self.shot.strength = 4;
        self.shot.time_left = 55.0;
        self.charge = self.shot.strength;
        self.shot.fire(base, if self.shot.upgraded { 5.0 } else { 4.0 });
        level.play_sfx("Fire", base.pos);
        Activation::Await("Weapon/Electro".to_string())
    }

    fn on_metadata_loaded(&mut self, base: &mut ActorBase, _level: &mut LevelHandler) -> Activation {
        base.set_animation("Idle");
        Activation::Commit
    }

    fn on_update(&mut self, base: &mut ActorBase, level: &mut LevelHandler, time_mult: f32) {
        let steps = if time_mult > 0.9 { 2 } else { 1 };
        let step_mult = time_mult / steps as f32;
        for _ in 0..steps {
            let delta = base.speed * step_mult;
            let mut params = TileCollisionParams::downwards(false);
            base.move_instantly(level, delta, MoveType::RELATIVE | MoveType::FORCE, &mut params);

            params.weapon_strength = self.charge;
            let aabb = base.aabb_inner;
            level.tile_map_mut().is_tile_empty(&aabb, &mut params);
            if params.tiles_destroyed > 0 {
                self.shot.credit_tiles(level, params.tiles_destroyed);
                self.charge -= params.tiles_destroyed as i32;
                if self.charge <= 0 {
                    base.decrease_health(i32::MAX, None);
                    return;
                }
            }
        }
        self.shot.tick(base, time_mult);
        self.on_update_hitbox(base);
    }

    fn on_update_hitbox(&mut self, base: &mut ActorBase) {
        base.update_hitbox(4.0, 4.0);
    }

    fn on_handle_collision(
        &mut self,
        base: &mut ActorBase,
        level: &mut LevelHandler,
        other: &mut Actor,
    ) -> bool {
        if other.base.is_invulnerable() {
            return false;
        }
        self.shot.hit_enemy(base, level, other)
    }

    fn on_perish(
        &mut self,
        base: &mut ActorBase,
        level: &mut LevelHandler,
        _collider: Option<ActorHandle>,
    ) -> bool {
        self.shot.perish(base, level, ExplosionType::TinyBlue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actors::test_support::{floor_level, run_frames, FLOOR_Y};
    use crate::actors::ActorKind;
    use glam::Vec2;

    #[test]
    fn test_passes_through_solid_tiles() {
        let mut level = floor_level();
        level.tile_map_mut().set_solid(6, 9, true);
        let handle = level
            .spawn_actor(
                ActorKind::ElectroShot(ElectroShot::new(None, 0.0)),
                ActorActivationDetails::new(Vec2::new(150.0, FLOOR_Y - 16.0)),
            )
            .expect("shot spawns");
        run_frames(&mut level, 20);
        let x = level.actor(handle).map(|a| a.base.pos.x).expect("still flying");
        assert!(x > 224.0);
    }
}
