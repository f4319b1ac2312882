//! State shared by every actor kind: transform, forces, health, hitboxes,
//! animation and transitions, plus the standard movement resolver.

use std::rc::Rc;

use glam::{IVec2, Vec2};
use jj_core::animation::{AnimationState, Metadata};
use jj_core::Aabb;

use super::explosion::{self, ExplosionType};
use super::{
    ActorActivationDetails, ActorHandle, ActorHook, ActorKind, ActorState, AfterTransition,
    MoveType, SurfaceHits,
};
use crate::collisions::{ProxyId, NULL_NODE};
use crate::events::event_type::EventType;
use crate::level_handler::LevelHandler;
use crate::tiles::{TileCollisionParams, TILE_SIZE};

/// Step used when probing for free space.
pub const COLLISION_CHECK_STEP: f32 = 0.5;
const MAX_SPEED: f32 = 16.0;

#[derive(Debug, Clone)]
struct Transition {
    animation: AnimationState,
    cancellable: bool,
    action: AfterTransition,
}

#[derive(Debug)]
pub struct ActorBase {
    pub handle: ActorHandle,
    pub state: ActorState,

    pub pos: Vec2,
    pub speed: Vec2,
    pub external_force: Vec2,
    pub internal_force_y: f32,
    pub elasticity: f32,
    pub friction: f32,
    pub unstuck_cooldown: f32,
    pub frozen_time_left: f32,

    pub health: i32,
    pub max_health: i32,
    perished: bool,

    /// Broad-phase bounds.
    pub aabb: Aabb,
    /// Tight hitbox.
    pub aabb_inner: Aabb,
    pub collision_proxy: ProxyId,

    pub origin_tile: IVec2,
    pub spawn_frames: f32,

    pub metadata: Option<Rc<Metadata>>,
    pub animation: Option<AnimationState>,
    transition: Option<Transition>,
    hooks: Vec<ActorHook>,
}

impl ActorBase {
    pub fn new(handle: ActorHandle) -> Self {
        Self {
            handle,
            state: ActorState::empty(),
            pos: Vec2::ZERO,
            speed: Vec2::ZERO,
            external_force: Vec2::ZERO,
            internal_force_y: 0.0,
            elasticity: 0.0,
            friction: 1.5,
            unstuck_cooldown: 0.0,
            frozen_time_left: 0.0,
            health: 1,
            max_health: 1,
            perished: false,
            aabb: Aabb::default(),
            aabb_inner: Aabb::default(),
            collision_proxy: NULL_NODE,
            origin_tile: IVec2::ZERO,
            spawn_frames: 0.0,
            metadata: None,
            animation: None,
            transition: None,
            hooks: Vec::new(),
        }
    }

    /// Default flags, position and provenance, applied before the kind's own
    /// activation runs.
    pub(crate) fn apply_activation_details(
        &mut self,
        details: &ActorActivationDetails,
        elapsed_frames: f32,
    ) {
        self.pos = details.pos;
        self.state |= details.state
            | ActorState::CAN_BE_FROZEN
            | ActorState::COLLIDE_WITH_TILESET
            | ActorState::COLLIDE_WITH_OTHER_ACTORS
            | ActorState::APPLY_GRAVITATION;
        self.origin_tile = IVec2::new(
            (details.pos.x as i32).div_euclid(TILE_SIZE),
            (details.pos.y as i32).div_euclid(TILE_SIZE),
        );
        self.spawn_frames = elapsed_frames;
    }

    pub fn set_state(&mut self, flags: ActorState, value: bool) {
        self.state.set(flags, value);
    }

    /// True only if every flag in `flags` is set.
    pub fn has_state(&self, flags: ActorState) -> bool {
        self.state.contains(flags)
    }

    pub fn is_facing_left(&self) -> bool {
        self.state.contains(ActorState::IS_FACING_LEFT)
    }

    pub fn set_facing_left(&mut self, value: bool) {
        self.state.set(ActorState::IS_FACING_LEFT, value);
    }

    pub fn is_invulnerable(&self) -> bool {
        self.state.contains(ActorState::IS_INVULNERABLE)
    }

    pub fn is_destroyed(&self) -> bool {
        self.state.contains(ActorState::IS_DESTROYED)
    }

    /// Mark for removal; the level reaps it at the end of the frame.
    pub fn destroy(&mut self) {
        self.state |= ActorState::IS_DESTROYED;
    }

    pub fn is_perished(&self) -> bool {
        self.perished
    }

    pub(crate) fn push_hook(&mut self, hook: ActorHook) {
        self.hooks.push(hook);
    }

    pub(crate) fn take_hooks(&mut self) -> Vec<ActorHook> {
        std::mem::take(&mut self.hooks)
    }

    /// Subtract health. The perish hook fires once; later damage is ignored
    /// until [`ActorBase::revive`].
    pub fn decrease_health(&mut self, amount: i32, collider: Option<ActorHandle>) {
        if amount == 0 || self.perished {
            return;
        }
        if amount > self.health {
            self.health = 0;
        } else {
            self.health -= amount;
        }
        if self.health <= 0 {
            self.perished = true;
            self.push_hook(ActorHook::Perish(collider));
        } else {
            self.push_hook(ActorHook::HealthChanged(collider));
        }
    }

    /// Restore health after a deferred perish (respawning players).
    pub fn revive(&mut self, health: i32) {
        self.health = health.max(1);
        self.perished = false;
        self.state.remove(ActorState::IS_DESTROYED);
    }

    /// Generic perish: free the origin tile so the event does not respawn,
    /// then mark destroyed.
    pub fn perish(&mut self, level: &mut LevelHandler) -> bool {
        if self.state.contains(ActorState::IS_CREATED_FROM_EVENT_MAP) {
            let tile = self.origin_tile;
            let events = level.event_map_mut();
            events.deactivate(tile.x, tile.y);
            events.store_tile_event(tile.x, tile.y, EventType::EMPTY, ActorState::empty(), None);
        }
        self.state |= ActorState::IS_DESTROYED | ActorState::SKIP_PER_PIXEL_COLLISIONS;
        true
    }

    pub fn add_external_force(&mut self, x: f32, y: f32) {
        self.external_force.x += x;
        self.external_force.y += y;
    }

    // Animations

    pub fn has_animation(&self, name: &str) -> bool {
        self.metadata.as_ref().is_some_and(|m| m.clip(name).is_some())
    }

    /// Switch the base animation. Returns false if the clip does not exist.
    pub fn set_animation(&mut self, name: &str) -> bool {
        if !self.has_animation(name) {
            return false;
        }
        if self.animation.as_ref().is_some_and(|a| a.clip_name == name) {
            return true;
        }
        self.animation = Some(AnimationState::new(name));
        true
    }

    pub fn animation_name(&self) -> Option<&str> {
        self.animation.as_ref().map(|a| a.clip_name.as_str())
    }

    pub fn transition_name(&self) -> Option<&str> {
        self.transition
            .as_ref()
            .map(|t| t.animation.clip_name.as_str())
    }

    pub fn has_transition(&self) -> bool {
        self.transition.is_some()
    }

    /// Play a one-shot clip over the base animation and queue `action` for
    /// when it ends. A missing clip runs `action` right away and returns false.
    pub fn set_transition(&mut self, name: &str, cancellable: bool, action: AfterTransition) -> bool {
        if !self.has_animation(name) {
            self.finish_with(action);
            return false;
        }
        if let Some(previous) = self.transition.take() {
            self.finish_with(previous.action);
        }
        self.transition = Some(Transition {
            animation: AnimationState::new(name),
            cancellable,
            action,
        });
        true
    }

    /// Cancel the running transition if it allows it; its action still runs.
    pub fn cancel_transition(&mut self) {
        if self.transition.as_ref().is_some_and(|t| t.cancellable) {
            if let Some(transition) = self.transition.take() {
                self.finish_with(transition.action);
            }
        }
    }

    /// Drop the running transition without running its action.
    pub fn force_cancel_transition(&mut self) {
        self.transition = None;
    }

    fn finish_with(&mut self, action: AfterTransition) {
        if action != AfterTransition::Nothing {
            self.push_hook(ActorHook::Transition(action));
        }
    }

    /// Advance the animation clocks. Frozen actors don't animate.
    pub fn tick_animation(&mut self, time_mult: f32) {
        if self.frozen_time_left > 0.0 {
            return;
        }
        let Some(metadata) = self.metadata.clone() else {
            return;
        };
        if let Some(transition) = self.transition.as_mut() {
            match metadata.clip(&transition.animation.clip_name) {
                Some(clip) => {
                    transition.animation.tick(time_mult, clip);
                    if transition.animation.finished {
                        if let Some(done) = self.transition.take() {
                            self.finish_with(done.action);
                        }
                    }
                }
                None => {
                    if let Some(done) = self.transition.take() {
                        self.finish_with(done.action);
                    }
                }
            }
            return;
        }
        if let Some(animation) = self.animation.as_mut() {
            if let Some(clip) = metadata.clip(&animation.clip_name) {
                animation.tick(time_mult, clip);
            }
        }
    }

    // Hitboxes

    /// Hitbox of the given size centred on the position.
    pub fn update_hitbox(&mut self, width: f32, height: f32) {
        let (hw, hh) = (width * 0.5, height * 0.5);
        self.aabb_inner = Aabb::new(
            self.pos.x - hw,
            self.pos.y - hh,
            self.pos.x + hw,
            self.pos.y + hh,
        );
    }

    /// Hitbox sized from the metadata bounding box.
    pub fn update_hitbox_from_metadata(&mut self) {
        match self.metadata.as_ref().map(|m| m.bounding_box) {
            Some((w, h)) => self.update_hitbox(w as f32, h as f32),
            None => self.update_hitbox(0.0, 0.0),
        }
    }

    pub fn update_aabb(&mut self) {
        self.aabb = self.aabb_inner;
    }

    pub fn is_colliding_with(&self, other: &ActorBase) -> bool {
        self.aabb_inner.overlaps(&other.aabb_inner)
    }

    // Movement

    /// Move to `target` (or by it, with `RELATIVE`). Without `FORCE` the move
    /// only happens if the destination is free.
    pub fn move_instantly(
        &mut self,
        level: &mut LevelHandler,
        target: Vec2,
        move_type: MoveType,
        params: &mut TileCollisionParams,
    ) -> bool {
        let (new_pos, aabb) = if move_type.contains(MoveType::RELATIVE) {
            if target == Vec2::ZERO {
                return true;
            }
            (self.pos + target, self.aabb_inner.translated(target))
        } else {
            (target, self.aabb_inner.translated(target - self.pos))
        };

        let free = move_type.contains(MoveType::FORCE) || level.is_position_empty(self, &aabb, params);
        if free {
            self.aabb_inner = aabb;
            self.pos = new_pos;
            if !self.state.contains(ActorState::FORCE_DISABLE_COLLISIONS) {
                self.state |= ActorState::IS_DIRTY;
            }
        }
        free
    }

    fn try_move(&mut self, level: &mut LevelHandler, x: f32, y: f32, params: &mut TileCollisionParams) -> bool {
        self.move_instantly(level, Vec2::new(x, y), MoveType::RELATIVE, params)
    }

    /// Apply forces and gravity, then move as far as the level allows.
    /// Returns the surfaces hit; the caller dispatches the callbacks.
    pub fn try_standard_movement(
        &mut self,
        level: &mut LevelHandler,
        time_mult: f32,
        params: &mut TileCollisionParams,
    ) -> SurfaceHits {
        let mut hits = SurfaceHits::empty();

        if self.unstuck_cooldown > 0.0 {
            self.unstuck_cooldown -= time_mult;
        }

        let apply_gravity = self.state.contains(ActorState::APPLY_GRAVITATION);
        let mut gravity = 0.0;
        let mut elasticity = self.elasticity;
        if apply_gravity {
            gravity = level.gravity();
            if self.pos.y >= level.water_level() {
                gravity *= 0.5;
                elasticity *= 0.7;
            }
        }

        let accel_y = (self.internal_force_y + self.external_force.y) * time_mult;
        self.speed.x = self.speed.x.clamp(-MAX_SPEED, MAX_SPEED);
        self.speed.y = (self.speed.y + accel_y).clamp(-MAX_SPEED, MAX_SPEED);

        let (mut eff_x, mut eff_y) = if self.frozen_time_left > 0.0 {
            let x = (self.external_force.x * time_mult).clamp(-MAX_SPEED, MAX_SPEED);
            let y = if apply_gravity {
                self.speed.y + 0.5 * accel_y
            } else {
                ((gravity * 2.0 + self.internal_force_y) * time_mult).clamp(-MAX_SPEED, MAX_SPEED)
            };
            (x, y)
        } else {
            (
                self.speed.x + self.external_force.x * time_mult,
                self.speed.y + 0.5 * accel_y,
            )
        };
        eff_x *= time_mult;
        eff_y *= time_mult;

        if eff_x.abs() > 0.0 || eff_y.abs() > 0.0 {
            if self
                .state
                .contains(ActorState::CAN_JUMP | ActorState::APPLY_GRAVITATION)
            {
                self.move_on_ground(level, eff_x, eff_y, elasticity, params, &mut hits);
            } else {
                self.move_in_air(level, time_mult, eff_x, eff_y, elasticity, params, &mut hits);
            }
        }

        if self.external_force.x > 0.0 {
            self.external_force.x = (self.external_force.x - self.friction * time_mult).max(0.0);
        } else if self.external_force.x < 0.0 {
            self.external_force.x = (self.external_force.x + self.friction * time_mult).min(0.0);
        }

        if gravity > 0.0 {
            let mut below = self.aabb_inner;
            below.b += COLLISION_CHECK_STEP;
            if level.is_position_empty(self, &below, params) {
                self.speed.y += gravity * time_mult;
                self.state.remove(ActorState::CAN_JUMP);
            } else if eff_y.abs() <= f32::EPSILON {
                self.state.insert(ActorState::CAN_JUMP);
            }

            self.external_force.y = (self.external_force.y + gravity * 0.33 * time_mult).min(0.0);
            self.internal_force_y = (self.internal_force_y + gravity * 0.33 * time_mult).min(0.0);
        }

        hits
    }

    /// Ground-bound movement follows slopes up to about 45 degrees and tries
    /// to step out of small overlaps before giving up on a wall.
    fn move_on_ground(
        &mut self,
        level: &mut LevelHandler,
        eff_x: f32,
        eff_y: f32,
        elasticity: f32,
        params: &mut TileCollisionParams,
        hits: &mut SurfaceHits,
    ) {
        let max_y_diff = (eff_x.abs() + 2.5).max(3.0);
        let mut y_diff = max_y_diff + eff_y;
        let mut success = false;
        while y_diff >= -max_y_diff + eff_y {
            if self.try_move(level, eff_x, y_diff, params) {
                success = true;
                break;
            }
            y_diff -= COLLISION_CHECK_STEP;
        }

        if !success {
            let sign = if eff_x > 0.0 { 1.0 } else { -1.0 };
            let mut x_diff = eff_x.abs();
            let min_x_diff = -x_diff;
            while x_diff >= min_x_diff {
                if self.try_move(level, x_diff * sign, 0.0, params) {
                    success = true;
                    break;
                }
                x_diff -= COLLISION_CHECK_STEP;
            }

            let mut moved = false;
            if !success && self.unstuck_cooldown <= 0.0 {
                let mut feet = self.aabb_inner;
                feet.t = feet.t.max(feet.b - 14.0);
                let mut probe = TileCollisionParams::downwards(true);
                if !level.is_position_empty(self, &feet, &mut probe) {
                    moved = self.try_unstuck(level, params);
                }
            }

            if !moved {
                if x_diff > COLLISION_CHECK_STEP || (x_diff > 0.0 && elasticity > 0.0) {
                    self.speed.x = -(elasticity * self.speed.x);
                }
                *hits |= SurfaceHits::WALL;
            }
        }

        *hits |= SurfaceHits::FLOOR;
    }

    fn try_unstuck(&mut self, level: &mut LevelHandler, params: &mut TileCollisionParams) -> bool {
        let steps = (1..=6)
            .map(|i| -2.0 * i as f32)
            .chain((1..=7).map(|i| 2.0 * i as f32));
        for y_diff in steps {
            if self.try_move(level, 0.0, y_diff, params) {
                self.unstuck_cooldown = 60.0;
                return true;
            }
        }
        false
    }

    #[allow(clippy::too_many_arguments)]
    fn move_in_air(
        &mut self,
        level: &mut LevelHandler,
        time_mult: f32,
        eff_x: f32,
        eff_y: f32,
        elasticity: f32,
        params: &mut TileCollisionParams,
        hits: &mut SurfaceHits,
    ) {
        if self.try_move(level, eff_x, eff_y, params) {
            return;
        }

        let sign_x = if eff_x > 0.0 { 1.0 } else { -1.0 };
        let mut x_diff = eff_x.abs();
        while x_diff > f32::EPSILON {
            if self.try_move(level, x_diff * sign_x, 0.0, params) {
                break;
            }
            x_diff -= COLLISION_CHECK_STEP;
        }

        let sign_y = if eff_y > 0.0 { 1.0 } else { -1.0 };
        let mut y_diff = eff_y.abs();
        while y_diff > f32::EPSILON {
            let signed = y_diff * sign_y;
            if self.try_move(level, 0.0, signed, params)
                || self.try_move(level, y_diff * 0.2, signed, params)
                || self.try_move(level, y_diff * -0.2, signed, params)
            {
                break;
            }
            y_diff -= COLLISION_CHECK_STEP;
        }

        // Only snap to a surface if the vertical move was cut short.
        if y_diff < eff_y.abs() {
            if eff_y > 0.0 {
                self.speed.y = -(elasticity * eff_y / time_mult);
                *hits |= SurfaceHits::FLOOR;
                if self.speed.y > -COLLISION_CHECK_STEP {
                    self.speed.y = 0.0;
                    self.state.insert(ActorState::CAN_JUMP);
                }
            } else {
                self.speed.y = 0.0;
                *hits |= SurfaceHits::CEILING;
            }
        }

        if x_diff < eff_x.abs() * 0.3 {
            if x_diff > 0.0 && elasticity > 0.0 {
                self.speed.x = -(elasticity * self.speed.x);
            }
            if y_diff >= eff_y.abs() {
                *hits |= SurfaceHits::WALL;
            }
        }
    }

    // Frozen state

    pub fn update_frozen_state(&mut self, level: &mut LevelHandler, time_mult: f32) {
        if self.frozen_time_left <= 0.0 {
            return;
        }
        self.frozen_time_left -= time_mult;
        if self.frozen_time_left > 0.0 {
            return;
        }
        let pos = self.pos.floor();
        for _ in 0..10 {
            explosion::create(level, pos, ExplosionType::IceShrapnel);
        }
        explosion::create(level, pos, ExplosionType::SmokeWhite);
        level.play_common_sfx("IceBreak", self.pos);
    }

    /// Freezer shots fired by someone else freeze the actor and are used up.
    pub fn handle_frozen_state_change(&mut self, other: &mut super::Actor) {
        if let ActorKind::FreezerShot(shot) = &other.kind {
            if shot.shot.owner != Some(self.handle) {
                self.frozen_time_left = shot.frozen_duration();
                other.base.decrease_health(i32::MAX, Some(self.handle));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actors::test_support::{floor_level, spawn, test_level, FLOOR_Y};
    use crate::actors::explosion::Explosion;

    fn base_at(pos: Vec2) -> ActorBase {
        let mut level = test_level(8, 8);
        let handle = level.reserve_handle();
        let mut base = ActorBase::new(handle);
        base.apply_activation_details(&ActorActivationDetails::new(pos), 0.0);
        base
    }

    #[test]
    fn test_decrease_health_perishes_once() {
        let mut base = base_at(Vec2::new(40.0, 40.0));
        base.health = 2;
        base.decrease_health(1, None);
        assert_eq!(base.take_hooks(), vec![ActorHook::HealthChanged(None)]);

        base.decrease_health(5, None);
        assert_eq!(base.health, 0);
        assert_eq!(base.take_hooks(), vec![ActorHook::Perish(None)]);

        base.decrease_health(5, None);
        base.decrease_health(i32::MAX, None);
        assert!(base.take_hooks().is_empty());
    }

    #[test]
    fn test_zero_damage_is_ignored() {
        let mut base = base_at(Vec2::new(40.0, 40.0));
        base.decrease_health(0, None);
        assert_eq!(base.health, 1);
        assert!(base.take_hooks().is_empty());
    }

    #[test]
    fn test_activation_details_set_origin_tile() {
        let base = base_at(Vec2::new(80.0, 47.0));
        assert_eq!(base.origin_tile, IVec2::new(2, 1));
        assert!(base.has_state(ActorState::COLLIDE_WITH_OTHER_ACTORS | ActorState::APPLY_GRAVITATION));
    }

    #[test]
    fn test_move_instantly_respects_tiles() {
        let mut level = floor_level();
        let handle = level.reserve_handle();
        let mut base = ActorBase::new(handle);
        base.state = ActorState::COLLIDE_WITH_TILESET;
        base.pos = Vec2::new(100.0, FLOOR_Y - 20.0);
        base.update_hitbox(20.0, 20.0);

        let mut params = TileCollisionParams::downwards(true);
        assert!(!base.move_instantly(&mut level, Vec2::new(0.0, 30.0), MoveType::RELATIVE, &mut params));
        assert_eq!(base.pos.y, FLOOR_Y - 20.0);
        assert!(!base.has_state(ActorState::IS_DIRTY));

        assert!(base.move_instantly(&mut level, Vec2::new(0.0, 5.0), MoveType::RELATIVE, &mut params));
        assert_eq!(base.pos.y, FLOOR_Y - 15.0);
        assert!(base.has_state(ActorState::IS_DIRTY));

        assert!(base.move_instantly(
            &mut level,
            Vec2::new(100.0, FLOOR_Y + 40.0),
            MoveType::FORCE,
            &mut params
        ));
        assert_eq!(base.aabb_inner.center(), Vec2::new(100.0, FLOOR_Y + 40.0));
    }

    #[test]
    fn test_falling_actor_lands_on_floor() {
        let mut level = floor_level();
        let handle = level.reserve_handle();
        let mut base = ActorBase::new(handle);
        base.state = ActorState::APPLY_GRAVITATION | ActorState::COLLIDE_WITH_TILESET;
        base.pos = Vec2::new(100.0, FLOOR_Y - 60.0);
        base.update_hitbox(20.0, 20.0);

        let mut landed = false;
        for _ in 0..120 {
            let mut params = TileCollisionParams::downwards(base.speed.y >= 0.0);
            let hits = base.try_standard_movement(&mut level, 1.0, &mut params);
            if hits.contains(SurfaceHits::FLOOR) {
                landed = true;
            }
        }
        assert!(landed);
        assert!(base.has_state(ActorState::CAN_JUMP));
        assert!(base.aabb_inner.b <= FLOOR_Y + 0.01);
        assert!(base.aabb_inner.b > FLOOR_Y - 1.0);
        assert_eq!(base.speed.y, 0.0);
    }

    #[test]
    fn test_ground_movement_hits_wall() {
        let mut level = floor_level();
        level.tile_map_mut().set_solid(5, 9, true);
        let handle = level.reserve_handle();
        let mut base = ActorBase::new(handle);
        base.state = ActorState::APPLY_GRAVITATION
            | ActorState::CAN_JUMP
            | ActorState::COLLIDE_WITH_TILESET;
        base.pos = Vec2::new(150.0, FLOOR_Y - 10.0);
        base.update_hitbox(20.0, 20.0);
        base.speed.x = 4.0;

        let mut params = TileCollisionParams::downwards(true);
        let hits = base.try_standard_movement(&mut level, 1.0, &mut params);
        assert!(hits.contains(SurfaceHits::FLOOR));
        assert!(hits.contains(SurfaceHits::WALL));
        assert!(base.aabb_inner.r <= 160.0);
    }

    #[test]
    fn test_transition_action_queued_on_finish() {
        let mut level = test_level(8, 8);
        let handle = spawn(
            &mut level,
            ActorKind::Explosion(Explosion::new(ExplosionType::Tiny)),
            Vec2::new(40.0, 40.0),
        );
        let mut actor = level.take_actor(handle).expect("spawned");
        let base = &mut actor.base;

        assert!(base.set_transition("TransitionAttack", false, AfterTransition::DragonAttackDone));
        base.cancel_transition();
        assert!(base.has_transition());

        for _ in 0..200 {
            base.tick_animation(1.0);
        }
        assert!(!base.has_transition());
        assert_eq!(
            base.take_hooks(),
            vec![ActorHook::Transition(AfterTransition::DragonAttackDone)]
        );

        assert!(!base.set_transition("NoSuchClip", true, AfterTransition::Destroy));
        assert_eq!(base.take_hooks(), vec![ActorHook::Transition(AfterTransition::Destroy)]);

        base.set_transition("TransitionAttack", true, AfterTransition::Destroy);
        base.force_cancel_transition();
        assert!(base.take_hooks().is_empty());
        level.return_actor(handle, actor);
    }

    #[test]
    fn test_frozen_actor_breaks_free() {
        let mut level = test_level(8, 8);
        let handle = level.reserve_handle();
        let mut base = ActorBase::new(handle);
        base.pos = Vec2::new(64.0, 64.0);
        base.frozen_time_left = 2.0;
        let before = level.actor_count();

        base.update_frozen_state(&mut level, 1.0);
        assert_eq!(level.actor_count(), before);
        base.update_frozen_state(&mut level, 1.0);
        assert_eq!(level.actor_count(), before + 11);
        assert!(level.sounds().iter().any(|s| s.name == "IceBreak"));
    }
}
