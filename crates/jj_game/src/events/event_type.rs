use serde::{Deserialize, Serialize};
use std::fmt;

/// Event identifier as stored in level data.
///
/// Kept as an open `u16` newtype so unknown values from newer level files
/// round-trip unchanged instead of failing to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventType(pub u16);

impl EventType {
    pub const EMPTY: Self = Self(0x0000);
    pub const GENERATOR: Self = Self(0x1000);

    pub const LEVEL_START: Self = Self(0x0100);
    pub const CHECKPOINT: Self = Self(0x005A);

    pub const MODIFIER_ONE_WAY: Self = Self(0x0111);
    pub const MODIFIER_HURT: Self = Self(0x0115);
    pub const MODIFIER_DEATH: Self = Self(0x0148);
    pub const MODIFIER_SET_WATER: Self = Self(0x0149);

    pub const AREA_STOP_ENEMY: Self = Self(0x0143);
    pub const AREA_TEXT: Self = Self(0x014A);
    pub const AREA_END_OF_LEVEL: Self = Self(0x0108);
    pub const AREA_ACTIVATE_BOSS: Self = Self(0x010A);
    pub const AREA_WEATHER: Self = Self(0x0510);

    pub const WARP_ORIGIN: Self = Self(0x010E);
    pub const WARP_TARGET: Self = Self(0x010F);

    pub const SPRING: Self = Self(0x00C0);

    pub const ENEMY_TURTLE: Self = Self(0x0180);
    pub const TURTLE_SHELL: Self = Self(0x0182);
    pub const ENEMY_LAB_RAT: Self = Self(0x018B);
    pub const ENEMY_DRAGON: Self = Self(0x018F);
    pub const ENEMY_CATERPILLAR: Self = Self(0x0199);
    pub const ENEMY_CRAB: Self = Self(0x019A);

    pub const BOSS_TURTLE_TOUGH: Self = Self(0x0215);

    pub const GEM: Self = Self(0x0040);
    pub const GEM_GIANT: Self = Self(0x0041);
    pub const GEM_RING: Self = Self(0x0042);
    pub const FOOD: Self = Self(0x0004);

    pub fn is_empty(self) -> bool {
        self == Self::EMPTY
    }

    fn name(self) -> Option<&'static str> {
        Some(match self {
            Self::EMPTY => "Empty",
            Self::GENERATOR => "Generator",
            Self::LEVEL_START => "LevelStart",
            Self::CHECKPOINT => "Checkpoint",
            Self::MODIFIER_ONE_WAY => "ModifierOneWay",
            Self::MODIFIER_HURT => "ModifierHurt",
            Self::MODIFIER_DEATH => "ModifierDeath",
            Self::MODIFIER_SET_WATER => "ModifierSetWater",
            Self::AREA_STOP_ENEMY => "AreaStopEnemy",
            Self::AREA_TEXT => "AreaText",
            Self::AREA_END_OF_LEVEL => "AreaEndOfLevel",
            Self::AREA_ACTIVATE_BOSS => "AreaActivateBoss",
            Self::AREA_WEATHER => "AreaWeather",
            Self::WARP_ORIGIN => "WarpOrigin",
            Self::WARP_TARGET => "WarpTarget",
            Self::SPRING => "Spring",
            Self::ENEMY_TURTLE => "EnemyTurtle",
            Self::TURTLE_SHELL => "TurtleShell",
            Self::ENEMY_LAB_RAT => "EnemyLabRat",
            Self::ENEMY_DRAGON => "EnemyDragon",
            Self::ENEMY_CATERPILLAR => "EnemyCaterpillar",
            Self::ENEMY_CRAB => "EnemyCrab",
            Self::BOSS_TURTLE_TOUGH => "BossTurtleTough",
            Self::GEM => "Gem",
            Self::GEM_GIANT => "GemGiant",
            Self::GEM_RING => "GemRing",
            Self::FOOD => "Food",
            _ => return None,
        })
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "Unknown(0x{:04X})", self.0),
        }
    }
}
