//! Per-player input state with both edge-triggered and level-triggered queries.
//!
//! - **Level-triggered (pressed):** `is_pressed(action)` is true every frame the
//!   action is held. Used for continuous actions like running.
//!
//! - **Edge-triggered (hit):** `is_hit(action)` is true only on the frame the
//!   action went from released to pressed. The previous frame's mask is kept in
//!   `pressed_last`, so detection survives frames where nothing else changes.
//!
//! Pressed actions are a bitmask: bit `action` means pressed, bit `32 + action`
//! means the press came from a gamepad.

use glam::Vec2;
use serde::{Deserialize, Serialize};

pub const MAX_PLAYERS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayerAction {
    Left = 0,
    Right = 1,
    Up = 2,
    Down = 3,
    Fire = 4,
    Jump = 5,
    Run = 6,
    ChangeWeapon = 7,
    Menu = 8,
}

impl PlayerAction {
    pub const ALL: [PlayerAction; 9] = [
        PlayerAction::Left,
        PlayerAction::Right,
        PlayerAction::Up,
        PlayerAction::Down,
        PlayerAction::Fire,
        PlayerAction::Jump,
        PlayerAction::Run,
        PlayerAction::ChangeWeapon,
        PlayerAction::Menu,
    ];

    pub const fn bit(self) -> u64 {
        1u64 << (self as u32)
    }

    pub const fn gamepad_bit(self) -> u64 {
        1u64 << (32 + self as u32)
    }
}

/// Input gathered for one frame from keyboard/gamepad mapping.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProcessedInput {
    pub pressed_actions: u64,
    pub movement: Vec2,
}

impl ProcessedInput {
    pub fn with(mut self, action: PlayerAction) -> Self {
        self.pressed_actions |= action.bit();
        self
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PlayerInput {
    pub pressed_actions: u64,
    pub pressed_actions_last: u64,
    pub required_movement: Vec2,
    pub frozen: bool,
    pub frozen_movement: Vec2,
}

impl PlayerInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shift this frame's state into `pressed_actions_last` and apply `next`.
    pub fn advance(&mut self, next: ProcessedInput) {
        self.pressed_actions_last = self.pressed_actions;
        self.pressed_actions = next.pressed_actions;
        self.required_movement = next.movement;
    }

    /// Merge actions that do not come from a mapped device (touch controls).
    pub fn apply_override(&mut self, override_actions: u64) {
        self.pressed_actions |= override_actions;

        if override_actions & PlayerAction::Right.bit() != 0 {
            self.required_movement.x = 1.0;
        } else if override_actions & PlayerAction::Left.bit() != 0 {
            self.required_movement.x = -1.0;
        }
        if override_actions & PlayerAction::Down.bit() != 0 {
            self.required_movement.y = 1.0;
        } else if override_actions & PlayerAction::Up.bit() != 0 {
            self.required_movement.y = -1.0;
        }
    }

    pub fn is_pressed(&self, action: PlayerAction) -> bool {
        self.pressed_actions & action.bit() != 0
    }

    pub fn is_hit(&self, action: PlayerAction) -> bool {
        self.pressed_actions & action.bit() != 0 && self.pressed_actions_last & action.bit() == 0
    }

    pub fn is_gamepad(&self, action: PlayerAction) -> bool {
        self.pressed_actions & action.gamepad_bit() != 0
    }

    pub fn horizontal_movement(&self) -> f32 {
        if self.frozen {
            self.frozen_movement.x
        } else {
            self.required_movement.x
        }
    }

    pub fn vertical_movement(&self) -> f32 {
        if self.frozen {
            self.frozen_movement.y
        } else {
            self.required_movement.y
        }
    }

    /// Lock movement to its current value, e.g. during cutscene-like sequences.
    pub fn freeze(&mut self) {
        self.frozen = true;
        self.frozen_movement = self.required_movement;
    }

    pub fn unfreeze(&mut self) {
        self.frozen = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pressed(actions: &[PlayerAction]) -> ProcessedInput {
        actions
            .iter()
            .fold(ProcessedInput::default(), |input, &a| input.with(a))
    }

    #[test]
    fn test_hit_only_on_first_frame() {
        let mut input = PlayerInput::new();
        input.advance(pressed(&[PlayerAction::Jump]));
        assert!(input.is_pressed(PlayerAction::Jump));
        assert!(input.is_hit(PlayerAction::Jump));

        input.advance(pressed(&[PlayerAction::Jump]));
        assert!(input.is_pressed(PlayerAction::Jump));
        assert!(!input.is_hit(PlayerAction::Jump));
    }

    #[test]
    fn test_release_clears_pressed() {
        let mut input = PlayerInput::new();
        input.advance(pressed(&[PlayerAction::Fire]));
        input.advance(ProcessedInput::default());
        assert!(!input.is_pressed(PlayerAction::Fire));
        assert!(!input.is_hit(PlayerAction::Fire));

        // Pressing again is a new edge.
        input.advance(pressed(&[PlayerAction::Fire]));
        assert!(input.is_hit(PlayerAction::Fire));
    }

    #[test]
    fn test_gamepad_bit_is_separate() {
        let mut input = PlayerInput::new();
        input.advance(ProcessedInput {
            pressed_actions: PlayerAction::Run.bit() | PlayerAction::Run.gamepad_bit(),
            movement: Vec2::ZERO,
        });
        assert!(input.is_pressed(PlayerAction::Run));
        assert!(input.is_gamepad(PlayerAction::Run));
        assert!(!input.is_gamepad(PlayerAction::Jump));
    }

    #[test]
    fn test_override_sets_movement_axes() {
        let mut input = PlayerInput::new();
        input.advance(ProcessedInput::default());
        input.apply_override(PlayerAction::Left.bit() | PlayerAction::Up.bit());
        assert!(input.is_pressed(PlayerAction::Left));
        assert_eq!(input.horizontal_movement(), -1.0);
        assert_eq!(input.vertical_movement(), -1.0);
    }

    #[test]
    fn test_frozen_movement_wins() {
        let mut input = PlayerInput::new();
        input.advance(ProcessedInput {
            pressed_actions: 0,
            movement: Vec2::new(0.5, 0.0),
        });
        input.freeze();
        input.advance(ProcessedInput {
            pressed_actions: 0,
            movement: Vec2::new(-1.0, 1.0),
        });
        assert_eq!(input.horizontal_movement(), 0.5);
        assert_eq!(input.vertical_movement(), 0.0);

        input.unfreeze();
        assert_eq!(input.horizontal_movement(), -1.0);
    }

    #[test]
    fn test_default_state_is_empty() {
        let input = PlayerInput::new();
        for action in PlayerAction::ALL {
            assert!(!input.is_pressed(action));
            assert!(!input.is_hit(action));
        }
        assert_eq!(input.required_movement, Vec2::ZERO);
    }
}
