pub mod aabb;
pub mod animation;
pub mod input;
pub mod time;

pub use aabb::Aabb;
