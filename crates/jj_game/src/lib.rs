//! Actor simulation and collision core for a Jazz Jackrabbit 2 style
//! platformer.
//!
//! The crate is headless: [`level_handler::LevelHandler`] runs one level frame
//! by frame, owning the actors, the collision broadphase and the tile and event
//! maps. Rendering and audio consume what it records (camera positions, sound
//! log, HUD messages) without feeding anything back.

pub mod actors;
pub mod collisions;
pub mod config;
pub mod content;
pub mod events;
pub mod level_handler;
pub mod multiplayer;
pub mod replay;
pub mod resumable;
pub mod rng;
pub mod tiles;
pub mod viewport;

pub use level_handler::{LevelHandler, LevelState};
