//! Typed views over the raw spawn parameter blobs stored in level data.
//!
//! Every event tile carries [`SPAWN_PARAMS_SIZE`] bytes whose meaning depends on
//! the event type. Values are little-endian and the offsets below are the ones
//! level files use, so a struct decoded here and encoded again yields the same
//! bytes for every field it knows about.

use serde::{Deserialize, Serialize};

pub const SPAWN_PARAMS_SIZE: usize = 16;

pub type SpawnParams = [u8; SPAWN_PARAMS_SIZE];

pub fn read_u8(params: &SpawnParams, offset: usize) -> u8 {
    params[offset]
}

pub fn read_u16(params: &SpawnParams, offset: usize) -> u16 {
    u16::from_le_bytes([params[offset], params[offset + 1]])
}

pub fn read_u32(params: &SpawnParams, offset: usize) -> u32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&params[offset..offset + 4]);
    u32::from_le_bytes(raw)
}

pub fn read_f32(params: &SpawnParams, offset: usize) -> f32 {
    f32::from_bits(read_u32(params, offset))
}

pub fn write_u16(params: &mut SpawnParams, offset: usize, value: u16) {
    params[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
}

pub fn write_u32(params: &mut SpawnParams, offset: usize, value: u32) {
    params[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

pub fn write_f32(params: &mut SpawnParams, offset: usize, value: f32) {
    write_u32(params, offset, value.to_bits());
}

/// Build a parameter blob from a short byte prefix, zero-filling the rest.
pub fn params_from_prefix(prefix: &[u8]) -> SpawnParams {
    let mut params = [0u8; SPAWN_PARAMS_SIZE];
    let len = prefix.len().min(SPAWN_PARAMS_SIZE);
    params[..len].copy_from_slice(&prefix[..len]);
    params
}

/// Which way a spring pushes. Values above 3 are resolved at activation time
/// by probing the surrounding tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpringOrientation {
    Bottom,
    Right,
    Top,
    Left,
    Auto,
}

impl SpringOrientation {
    fn from_byte(value: u8) -> Self {
        match value {
            0 => Self::Bottom,
            1 => Self::Right,
            2 => Self::Top,
            3 => Self::Left,
            _ => Self::Auto,
        }
    }

    fn to_byte(self) -> u8 {
        match self {
            Self::Bottom => 0,
            Self::Right => 1,
            Self::Top => 2,
            Self::Left => 3,
            Self::Auto => 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpringParams {
    /// 0 red, 1 green, 2 blue.
    pub spring_type: u8,
    pub orientation: SpringOrientation,
    pub keep_speed_x: bool,
    pub keep_speed_y: bool,
    /// Cooldown between activations in frames, 0 means the default.
    pub delay: u8,
    pub frozen: bool,
}

impl SpringParams {
    pub fn decode(params: &SpawnParams) -> Self {
        Self {
            spring_type: params[0],
            orientation: SpringOrientation::from_byte(params[1]),
            keep_speed_x: params[2] != 0,
            keep_speed_y: params[3] != 0,
            delay: params[4],
            frozen: params[5] != 0,
        }
    }

    pub fn encode(&self) -> SpawnParams {
        params_from_prefix(&[
            self.spring_type,
            self.orientation.to_byte(),
            self.keep_speed_x as u8,
            self.keep_speed_y as u8,
            self.delay,
            self.frozen as u8,
        ])
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TurtleShellParams {
    pub speed_x: f32,
    pub speed_y: f32,
    pub theme: u8,
}

impl TurtleShellParams {
    pub fn decode(params: &SpawnParams) -> Self {
        Self {
            speed_x: read_f32(params, 0),
            speed_y: read_f32(params, 4),
            theme: params[8],
        }
    }

    pub fn encode(&self) -> SpawnParams {
        let mut params = [0u8; SPAWN_PARAMS_SIZE];
        write_f32(&mut params, 0, self.speed_x);
        write_f32(&mut params, 4, self.speed_y);
        params[8] = self.theme;
        params
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GemRingParams {
    pub length: u8,
    pub speed: u8,
}

impl GemRingParams {
    pub fn decode(params: &SpawnParams) -> Self {
        Self {
            length: params[0],
            speed: params[1],
        }
    }

    pub fn encode(&self) -> SpawnParams {
        params_from_prefix(&[self.length, self.speed])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerParams {
    pub player_type: u8,
    pub index: u8,
}

impl PlayerParams {
    pub fn decode(params: &SpawnParams) -> Self {
        Self {
            player_type: params[0],
            index: params[1],
        }
    }

    pub fn encode(&self) -> SpawnParams {
        params_from_prefix(&[self.player_type, self.index])
    }
}

/// Shared by projectiles: byte 0 is non-zero for upgraded ammo, byte 1 is the
/// facing direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShotParams {
    pub upgraded: bool,
    pub facing_left: bool,
}

impl ShotParams {
    pub fn decode(params: &SpawnParams) -> Self {
        Self {
            upgraded: params[0] != 0,
            facing_left: params[1] != 0,
        }
    }

    pub fn encode(&self) -> SpawnParams {
        params_from_prefix(&[self.upgraded as u8, self.facing_left as u8])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_little_endian_fields() {
        let mut params = [0u8; SPAWN_PARAMS_SIZE];
        write_u16(&mut params, 2, 0x1234);
        write_u32(&mut params, 4, 0xDEAD_BEEF);
        assert_eq!(&params[2..4], &[0x34, 0x12]);
        assert_eq!(&params[4..8], &[0xEF, 0xBE, 0xAD, 0xDE]);
        assert_eq!(read_u16(&params, 2), 0x1234);
        assert_eq!(read_u32(&params, 4), 0xDEAD_BEEF);
    }

    #[test]
    fn test_turtle_shell_layout() {
        let params = TurtleShellParams {
            speed_x: -1.1,
            speed_y: -0.98,
            theme: 1,
        }
        .encode();
        assert_eq!(&params[0..4], &(-1.1f32).to_le_bytes());
        assert_eq!(&params[4..8], &(-0.98f32).to_le_bytes());
        assert_eq!(params[8], 1);

        let decoded = TurtleShellParams::decode(&params);
        assert_eq!(decoded.speed_x, -1.1);
        assert_eq!(decoded.theme, 1);
    }

    #[test]
    fn test_spring_orientation_above_three_is_auto() {
        let spring = SpringParams::decode(&params_from_prefix(&[2, 7, 1, 0, 30, 0]));
        assert_eq!(spring.spring_type, 2);
        assert_eq!(spring.orientation, SpringOrientation::Auto);
        assert!(spring.keep_speed_x);
        assert!(!spring.keep_speed_y);
        assert_eq!(spring.delay, 30);
        assert!(!spring.frozen);
    }

    #[test]
    fn test_eight_byte_prefix_is_valid() {
        let legacy = [3u8, 1, 0, 0, 0, 1, 0, 0];
        let spring = SpringParams::decode(&params_from_prefix(&legacy));
        assert_eq!(spring.orientation, SpringOrientation::Right);
        assert!(spring.frozen);
    }

    #[test]
    fn test_shot_flags() {
        let shot = ShotParams::decode(&params_from_prefix(&[1, 0]));
        assert!(shot.upgraded);
        assert!(!shot.facing_left);
        assert_eq!(ShotParams::decode(&shot.encode()), shot);
    }
}
