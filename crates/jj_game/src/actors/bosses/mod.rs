//! Bosses sit idle until an `AreaActivateBoss` trigger wakes them, never
//! deactivate when players wander off and die through a deferred animation
//! chain.

pub mod turtle_boss;

use glam::Vec2;

use super::enemies::EnemyBase;
use super::{ActorActivationDetails, ActorBase};
use crate::level_handler::LevelHandler;

#[derive(Debug, Default)]
pub struct BossBase {
    pub enemy: EnemyBase,
    /// Index into the level texts shown once the boss is defeated.
    pub end_text: u8,
    pub origin_pos: Vec2,
    activated: bool,
}

impl BossBase {
    pub fn new(score: i32) -> Self {
        Self {
            enemy: EnemyBase::new(score),
            ..Self::default()
        }
    }

    /// Parameter byte 1 is the end text index.
    pub fn activate(&mut self, base: &ActorBase, details: &ActorActivationDetails) {
        self.end_text = details.params[1];
        self.origin_pos = base.pos;
    }

    pub fn is_activated(&self) -> bool {
        self.activated
    }

    pub(crate) fn mark_activated(&mut self) -> bool {
        let first = !self.activated;
        self.activated = true;
        first
    }

    pub fn show_end_text(&self, level: &mut LevelHandler) {
        match level.level_text(self.end_text) {
            Some(text) => level.show_level_text(&text),
            None => log::debug!("Boss end text {} is not defined", self.end_text),
        }
    }
}
