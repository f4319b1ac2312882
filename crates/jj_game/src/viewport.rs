//! Per-player cameras.
//!
//! A [`Viewport`] follows one player: the focus point trails the player with
//! responsiveness smoothing, leans ahead in the direction of travel and is
//! clamped so the view never leaves the level. Shake is applied last, on top
//! of the clamped position.

use glam::Vec2;
use jj_core::Aabb;

use crate::actors::ActorHandle;

pub const DEFAULT_VIEW_SIZE: (u32, u32) = (720, 405);

const RESPONSIVENESS: f32 = 0.04;
const LOOK_AHEAD_FACTOR: f32 = 8.0;
const LOOK_AHEAD_SMOOTHING: f32 = 0.02;
const MAX_LOOK_AHEAD: f32 = 60.0;
const SHAKE_AMPLITUDE: f32 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera2D {
    pub position: Vec2,
    pub zoom: f32,
    pub viewport: (u32, u32),
}

impl Camera2D {
    pub fn new(viewport_width: u32, viewport_height: u32) -> Self {
        Self {
            position: Vec2::ZERO,
            zoom: 1.0,
            viewport: (viewport_width, viewport_height),
        }
    }

    pub fn half_extents(&self) -> Vec2 {
        Vec2::new(
            self.viewport.0 as f32 / (2.0 * self.zoom),
            self.viewport.1 as f32 / (2.0 * self.zoom),
        )
    }

    /// World-space rectangle the camera shows.
    pub fn view_bounds(&self) -> Aabb {
        Aabb::from_center(self.position, self.half_extents().x, self.half_extents().y)
    }
}

#[derive(Debug, Clone)]
pub struct Viewport {
    pub player_index: u8,
    pub target: ActorHandle,
    pub camera: Camera2D,
    focus: Vec2,
    look_ahead: Vec2,
    shake_time_left: f32,
    shake_phase: f32,
    initialized: bool,
}

impl Viewport {
    pub fn new(target: ActorHandle, player_index: u8, size: (u32, u32)) -> Self {
        Self {
            player_index,
            target,
            camera: Camera2D::new(size.0, size.1),
            focus: Vec2::ZERO,
            look_ahead: Vec2::ZERO,
            shake_time_left: 0.0,
            shake_phase: 0.0,
            initialized: false,
        }
    }

    pub fn shake(&mut self, duration: f32) {
        self.shake_time_left = self.shake_time_left.max(duration);
    }

    pub fn is_shaking(&self) -> bool {
        self.shake_time_left > 0.0
    }

    /// Snap to `pos` without smoothing, e.g. after a warp.
    pub fn warp_to(&mut self, pos: Vec2) {
        self.focus = pos;
        self.look_ahead = Vec2::ZERO;
        self.camera.position = pos;
        self.initialized = true;
    }

    pub fn update(&mut self, target_pos: Vec2, target_speed: Vec2, level_bounds: &Aabb, time_mult: f32) {
        if !self.initialized {
            self.warp_to(target_pos);
        }

        let smoothing = (RESPONSIVENESS * 4.0 * time_mult).min(1.0);
        self.focus = self.focus.lerp(target_pos, smoothing);

        let desired = (target_speed * LOOK_AHEAD_FACTOR).clamp_length_max(MAX_LOOK_AHEAD);
        self.look_ahead = self
            .look_ahead
            .lerp(desired, (LOOK_AHEAD_SMOOTHING * time_mult).min(1.0));

        let mut position = clamp_to_bounds(
            self.focus + self.look_ahead,
            self.camera.half_extents(),
            level_bounds,
        );

        if self.shake_time_left > 0.0 {
            self.shake_time_left = (self.shake_time_left - time_mult).max(0.0);
            self.shake_phase += time_mult;
            position += Vec2::new(
                (self.shake_phase * 1.7).sin(),
                (self.shake_phase * 2.3).cos(),
            ) * SHAKE_AMPLITUDE;
        }

        self.camera.position = position.round();
    }
}

/// Keep the view inside `bounds`; a level smaller than the view is centred.
fn clamp_to_bounds(pos: Vec2, half: Vec2, bounds: &Aabb) -> Vec2 {
    let clamp_axis = |value: f32, min: f32, max: f32, half: f32| {
        if max - min <= half * 2.0 {
            (min + max) * 0.5
        } else {
            value.clamp(min + half, max - half)
        }
    };
    Vec2::new(
        clamp_axis(pos.x, bounds.l, bounds.r, half.x),
        clamp_axis(pos.y, bounds.t, bounds.b, half.y),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actors::arena::ActorArena;

    fn viewport() -> Viewport {
        let handle = ActorArena::new().reserve();
        Viewport::new(handle, 0, (320, 200))
    }

    #[test]
    fn test_first_update_snaps_to_target() {
        let mut vp = viewport();
        let bounds = Aabb::new(0.0, 0.0, 3200.0, 3200.0);
        vp.update(Vec2::new(1000.0, 1000.0), Vec2::ZERO, &bounds, 1.0);
        assert_eq!(vp.camera.position, Vec2::new(1000.0, 1000.0));
    }

    #[test]
    fn test_camera_trails_and_leans_ahead() {
        let mut vp = viewport();
        let bounds = Aabb::new(0.0, 0.0, 3200.0, 3200.0);
        vp.update(Vec2::new(1000.0, 1000.0), Vec2::ZERO, &bounds, 1.0);
        for _ in 0..30 {
            vp.update(Vec2::new(1100.0, 1000.0), Vec2::new(4.0, 0.0), &bounds, 1.0);
        }
        assert!(vp.camera.position.x > 1000.0);
        assert!(vp.look_ahead.x > 0.0);
    }

    #[test]
    fn test_camera_is_clamped_to_level() {
        let mut vp = viewport();
        let bounds = Aabb::new(0.0, 0.0, 3200.0, 3200.0);
        vp.update(Vec2::new(10.0, 10.0), Vec2::ZERO, &bounds, 1.0);
        assert_eq!(vp.camera.position, Vec2::new(160.0, 100.0));

        let small = Aabb::new(0.0, 0.0, 200.0, 100.0);
        vp.update(Vec2::new(10.0, 10.0), Vec2::ZERO, &small, 1.0);
        assert_eq!(vp.camera.position, Vec2::new(100.0, 50.0));
    }

    #[test]
    fn test_shake_wears_off() {
        let mut vp = viewport();
        let bounds = Aabb::new(0.0, 0.0, 3200.0, 3200.0);
        vp.shake(3.0);
        for _ in 0..3 {
            assert!(vp.is_shaking());
            vp.update(Vec2::new(1000.0, 1000.0), Vec2::ZERO, &bounds, 1.0);
        }
        assert!(!vp.is_shaking());
        vp.update(Vec2::new(1000.0, 1000.0), Vec2::ZERO, &bounds, 1.0);
        assert_eq!(vp.camera.position, Vec2::new(1000.0, 1000.0));
    }
}
