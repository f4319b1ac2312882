//! Axis-aligned bounding boxes in world space.
//!
//! Levels use screen-style coordinates: `x` grows to the right and `y` grows
//! downward, so `t` (top) is always less than or equal to `b` (bottom).

use glam::Vec2;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Aabb {
    pub l: f32,
    pub t: f32,
    pub r: f32,
    pub b: f32,
}

impl Aabb {
    pub const fn new(l: f32, t: f32, r: f32, b: f32) -> Self {
        Self { l, t, r, b }
    }

    /// Box of the given size centered on `center`.
    pub fn from_center(center: Vec2, half_w: f32, half_h: f32) -> Self {
        Self {
            l: center.x - half_w,
            t: center.y - half_h,
            r: center.x + half_w,
            b: center.y + half_h,
        }
    }

    pub fn width(&self) -> f32 {
        self.r - self.l
    }

    pub fn height(&self) -> f32 {
        self.b - self.t
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new((self.l + self.r) * 0.5, (self.t + self.b) * 0.5)
    }

    pub fn perimeter(&self) -> f32 {
        2.0 * (self.width() + self.height())
    }

    pub fn is_valid(&self) -> bool {
        self.r >= self.l && self.b >= self.t && self.l.is_finite() && self.b.is_finite()
    }

    /// Touching edges count as overlap, matching the tree's query semantics.
    pub fn overlaps(&self, other: &Aabb) -> bool {
        !(other.l > self.r || other.r < self.l || other.t > self.b || other.b < self.t)
    }

    pub fn contains(&self, other: &Aabb) -> bool {
        self.l <= other.l && self.t <= other.t && other.r <= self.r && other.b <= self.b
    }

    pub fn contains_point(&self, p: Vec2) -> bool {
        p.x >= self.l && p.x <= self.r && p.y >= self.t && p.y <= self.b
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            l: self.l.min(other.l),
            t: self.t.min(other.t),
            r: self.r.max(other.r),
            b: self.b.max(other.b),
        }
    }

    pub fn translated(&self, offset: Vec2) -> Aabb {
        Aabb {
            l: self.l + offset.x,
            t: self.t + offset.y,
            r: self.r + offset.x,
            b: self.b + offset.y,
        }
    }

    pub fn expanded(&self, margin: f32) -> Aabb {
        Aabb {
            l: self.l - margin,
            t: self.t - margin,
            r: self.r + margin,
            b: self.b + margin,
        }
    }

    /// Closest point inside the box to `p`.
    pub fn clamp_point(&self, p: Vec2) -> Vec2 {
        Vec2::new(p.x.clamp(self.l, self.r), p.y.clamp(self.t, self.b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlap_includes_touching_edges() {
        let a = Aabb::new(0.0, 0.0, 10.0, 10.0);
        let b = Aabb::new(10.0, 0.0, 20.0, 10.0);
        let c = Aabb::new(10.5, 0.0, 20.0, 10.0);
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
    }

    #[test]
    fn union_contains_both_inputs() {
        let a = Aabb::new(0.0, 0.0, 4.0, 4.0);
        let b = Aabb::new(-2.0, 3.0, 1.0, 9.0);
        let u = a.union(&b);
        assert!(u.contains(&a));
        assert!(u.contains(&b));
        assert!((u.perimeter() - 2.0 * (6.0 + 9.0)).abs() < f32::EPSILON);
    }

    #[test]
    fn clamp_point_stays_inside() {
        let a = Aabb::new(0.0, 0.0, 10.0, 10.0);
        assert_eq!(a.clamp_point(Vec2::new(-5.0, 20.0)), Vec2::new(0.0, 10.0));
        assert_eq!(a.clamp_point(Vec2::new(3.0, 4.0)), Vec2::new(3.0, 4.0));
    }
}
