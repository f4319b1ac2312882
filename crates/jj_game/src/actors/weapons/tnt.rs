use jj_core::Aabb;

use crate::actors::{
    Activation, Actor, ActorActivationDetails, ActorBase, ActorBehavior, ActorHandle, ActorKind,
    ActorState, AfterTransition,
};
use crate::level_handler::LevelHandler;
use crate::tiles::TileCollisionParams;

use super::TILE_SCORE;

const FUSE: f32 = 200.0;
/// Fuse left once something worth blowing up comes close.
const SHORT_FUSE: f32 = 40.0;
const BLAST_RADIUS: f32 = 50.0;
const TILE_BLAST_STRENGTH: i32 = 8;

/// A dropped charge. Sits still until the fuse runs out or an enemy wanders
/// into range, then hits everything nearby.
#[derive(Debug)]
pub struct Tnt {
    owner: Option<ActorHandle>,
    time_left: f32,
    exploded: bool,
    light_intensity: f32,
}

impl Tnt {
    pub fn new(owner: Option<ActorHandle>) -> Self {
        Self {
            owner,
            time_left: FUSE,
            exploded: false,
            light_intensity: 0.0,
        }
    }

    pub fn owner(&self) -> Option<ActorHandle> {
        self.owner
    }

    pub fn time_left(&self) -> f32 {
        self.time_left
    }

    pub fn is_exploded(&self) -> bool {
        self.exploded
    }

    pub fn light_intensity(&self) -> f32 {
        self.light_intensity
    }

    fn shorten_fuse(&mut self) {
        if self.time_left > SHORT_FUSE {
            self.time_left = SHORT_FUSE;
        }
    }

    fn enemy_in_range(&self, base: &ActorBase, level: &LevelHandler) -> bool {
        level
            .find_collision_actors_by_radius(base.pos, BLAST_RADIUS)
            .into_iter()
            .filter_map(|handle| level.actor(handle))
            .any(|actor| actor.kind.enemy().is_some() && !actor.base.is_invulnerable())
    }

    fn explode(&mut self, base: &mut ActorBase, level: &mut LevelHandler) {
        self.exploded = true;
        self.light_intensity = 0.8;
        base.set_transition("TransitionActivate", false, AfterTransition::TntExploded);
        level.play_sfx("Explosion", base.pos);

        for target in level.find_collision_actors_by_radius(base.pos, BLAST_RADIUS) {
            level.queue_collision(target, base.handle);
        }

        let p = base.pos;
        let blast = Aabb::new(p.x - 34.0, p.y - 34.0, p.x + 34.0, p.y + 34.0);
        let mut params = TileCollisionParams {
            downwards: false,
            weapon_strength: TILE_BLAST_STRENGTH,
            tiles_destroyed: 0,
        };
        level.tile_map_mut().is_tile_empty(&blast, &mut params);
        if params.tiles_destroyed > 0 {
            if let Some(owner) = self.owner {
                level.add_score_to_player(owner, params.tiles_destroyed as i32 * TILE_SCORE);
            }
        }
    }
}

impl ActorBehavior for Tnt {
    fn on_activated(
        &mut self,
        base: &mut ActorBase,
        _level: &mut LevelHandler,
        _details: &ActorActivationDetails,
    ) -> Activation {
        self.time_left = FUSE;
        base.set_state(
            ActorState::COLLIDE_WITH_TILESET
                | ActorState::COLLIDE_WITH_OTHER_ACTORS
                | ActorState::APPLY_GRAVITATION,
            false,
        );
        Activation::Await("Weapon/TNT".to_string())
    }

    fn on_metadata_loaded(&mut self, base: &mut ActorBase, _level: &mut LevelHandler) -> Activation {
        base.set_animation("Idle");
        Activation::Commit
    }

    fn on_update(&mut self, base: &mut ActorBase, level: &mut LevelHandler, time_mult: f32) {
        let mut params = TileCollisionParams::downwards(base.speed.y >= 0.0);
        self.move_standard(base, level, time_mult, &mut params);
        self.on_update_hitbox(base);
        base.update_frozen_state(level, time_mult);

        if self.time_left > 0.0 {
            self.time_left -= time_mult;
            if self.time_left > SHORT_FUSE && self.enemy_in_range(base, level) {
                self.time_left = SHORT_FUSE;
            }
        } else if !self.exploded {
            self.explode(base, level);
        } else {
            self.light_intensity = (self.light_intensity - time_mult * 0.02).max(0.0);
        }
    }

    fn on_update_hitbox(&mut self, base: &mut ActorBase) {
        base.update_hitbox(12.0, 12.0);
    }

    fn on_handle_collision(
        &mut self,
        base: &mut ActorBase,
        _level: &mut LevelHandler,
        other: &mut Actor,
    ) -> bool {
        if matches!(other.kind, ActorKind::Tnt(_)) {
            self.shorten_fuse();
        }
        base.handle_frozen_state_change(other);
        false
    }

    fn on_transition_finished(
        &mut self,
        base: &mut ActorBase,
        _level: &mut LevelHandler,
        action: AfterTransition,
    ) {
        if action == AfterTransition::TntExploded {
            base.decrease_health(i32::MAX, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actors::enemies::crab::Crab;
    use crate::actors::test_support::{floor_level, run_frames, spawn, FLOOR_Y};
    use glam::Vec2;

    fn tnt_state(level: &LevelHandler, handle: ActorHandle) -> Option<(f32, bool)> {
        level.actor(handle).and_then(|a| match &a.kind {
            ActorKind::Tnt(t) => Some((t.time_left(), t.is_exploded())),
            _ => None,
        })
    }

    #[test]
    fn test_fuse_runs_out_without_targets() {
        let mut level = floor_level();
        let tnt = spawn(&mut level, ActorKind::Tnt(Tnt::new(None)), Vec2::new(200.0, FLOOR_Y - 8.0));
        run_frames(&mut level, 100);
        let (time_left, exploded) = tnt_state(&level, tnt).expect("armed");
        assert_eq!(time_left, 100.0);
        assert!(!exploded);

        run_frames(&mut level, 101);
        let exploded = tnt_state(&level, tnt).map_or(true, |(_, exploded)| exploded);
        assert!(exploded);
        assert!(level.sounds().iter().any(|s| s.name == "Explosion"));
    }

    #[test]
    fn test_enemy_in_range_shortens_fuse() {
        let mut level = floor_level();
        let tnt = spawn(&mut level, ActorKind::Tnt(Tnt::new(None)), Vec2::new(200.0, FLOOR_Y - 8.0));
        let crab = spawn(&mut level, ActorKind::Crab(Crab::new()), Vec2::new(230.0, FLOOR_Y - 12.0));

        run_frames(&mut level, 1);
        assert_eq!(tnt_state(&level, tnt).map(|(t, _)| t), Some(SHORT_FUSE));

        run_frames(&mut level, 60);
        assert!(level.actor(crab).is_none());
    }

    #[test]
    fn test_blast_breaks_tiles_for_owner() {
        let mut level = floor_level();
        level.tile_map_mut().set_destructible(6, 8, 1);
        let owner = spawn(
            &mut level,
            ActorKind::Player(crate::actors::player::Player::new(crate::config::PlayerType::Jazz, 0)),
            Vec2::new(600.0, FLOOR_Y - 20.0),
        );
        spawn(&mut level, ActorKind::Tnt(Tnt::new(Some(owner))), Vec2::new(200.0, FLOOR_Y - 48.0));
        run_frames(&mut level, 202);

        assert_eq!(level.tile_map().destroyed_tiles().count(), 1);
        let score = level
            .actor(owner)
            .and_then(|a| a.kind.as_player())
            .map(|p| p.score());
        assert_eq!(score, Some(TILE_SCORE));
    }
}
