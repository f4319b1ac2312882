//! Enemies and the bookkeeping they share: difficulty-scaled health, score
//! credited to whoever landed the killing blow, hit blinking, and the
//! path probes used by walking enemies.

pub mod caterpillar;
pub mod crab;
pub mod dragon;
pub mod lab_rat;
pub mod turtle;
pub mod turtle_shell;

use glam::Vec2;
use jj_core::Aabb;

use super::explosion::{self, ExplosionType};
use super::{Actor, ActorBase, ActorHandle, ActorKind, ActorState, MoveType};
use crate::config::GameDifficulty;
use crate::events::event_type::EventType;
use crate::events::params::SPAWN_PARAMS_SIZE;
use crate::level_handler::LevelHandler;
use crate::tiles::TileCollisionParams;

/// Random drops, as `(event, weight)`.
const DROP_TABLE: [(EventType, i32); 3] = [
    (EventType::EMPTY, 10),
    (EventType::FOOD, 2),
    (EventType::GEM, 6),
];

const BLINK_FRAMES: f32 = 6.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LastHitDirection {
    #[default]
    None,
    Left,
    Right,
    Up,
    Down,
}

#[derive(Debug, Clone)]
pub struct EnemyBase {
    /// Awarded once, to the player credited with the kill.
    pub score: i32,
    pub can_hurt_player: bool,
    pub can_collide_with_ammo: bool,
    /// Player to credit when this enemy dies.
    pub scorer: Option<ActorHandle>,
    pub last_hit_dir: LastHitDirection,
    blinking_timeout: f32,
}

impl Default for EnemyBase {
    fn default() -> Self {
        Self::new(0)
    }
}

impl EnemyBase {
    pub fn new(score: i32) -> Self {
        Self {
            score,
            can_hurt_player: true,
            can_collide_with_ammo: true,
            scorer: None,
            last_hit_dir: LastHitDirection::None,
            blinking_timeout: 0.0,
        }
    }

    /// Easy has 60 % of the health, hard 140 %, never less than one.
    pub fn set_health_by_difficulty(base: &mut ActorBase, level: &LevelHandler, health: i32) {
        let scaled = match level.difficulty() {
            GameDifficulty::Easy => (health as f32 * 0.6).round() as i32,
            GameDifficulty::Hard => (health as f32 * 1.4).round() as i32,
            GameDifficulty::Normal => health,
        };
        base.health = scaled.max(1);
        base.max_health = base.health;
    }

    pub fn is_blinking(&self) -> bool {
        self.blinking_timeout > 0.0
    }

    pub fn start_blinking(&mut self, base: &ActorBase) {
        if base.frozen_time_left > 0.0 {
            return;
        }
        self.blinking_timeout = BLINK_FRAMES;
    }

    pub fn update(&mut self, time_mult: f32) {
        if self.blinking_timeout > 0.0 {
            self.blinking_timeout -= time_mult;
        }
    }

    /// Hand the score to the credited player, or to `collider` if it is one.
    pub fn add_score_to_collider(&mut self, level: &mut LevelHandler, collider: Option<ActorHandle>) {
        if self.score <= 0 {
            return;
        }
        let target = self
            .scorer
            .or_else(|| collider.filter(|&c| level.players().contains(&c)));
        if let Some(player) = target {
            level.add_score_to_player(player, self.score);
        }
        self.score = 0;
    }

    /// Drop onto the ground right after spawning, or climb out of a tile the
    /// spawn point overlaps. Expects an up-to-date hitbox.
    pub fn place_on_ground(base: &mut ActorBase, level: &mut LevelHandler) {
        if !base.has_state(ActorState::COLLIDE_WITH_TILESET | ActorState::APPLY_GRAVITATION) {
            return;
        }
        let mut params = TileCollisionParams::downwards(base.speed.y >= 0.0);
        let aabb = base.aabb_inner;
        if level.is_position_empty(base, &aabb, &mut params) {
            for _ in 0..10 {
                if !base.move_instantly(level, Vec2::new(0.0, 4.0), MoveType::RELATIVE, &mut params) {
                    break;
                }
            }
        } else {
            for i in 2..=7 {
                let up = Vec2::new(0.0, i as f32 * -4.0);
                if base.move_instantly(level, up, MoveType::RELATIVE, &mut params) {
                    break;
                }
            }
        }
    }

    /// True if a walker can step by `(x, y)`: no stop-enemy area there, no
    /// wall in the way and ground below the next step.
    pub fn can_move_to_position(base: &mut ActorBase, level: &mut LevelHandler, x: f32, y: f32) -> bool {
        let (event, _) = level
            .event_map()
            .event_by_position(base.pos.x + x, base.pos.y + y);
        if event == EventType::AREA_STOP_ENEMY {
            return false;
        }

        let prev = base.state;
        base.set_state(ActorState::COLLIDE_WITH_TILESET_REDUCED, false);
        base.set_state(ActorState::SKIP_PER_PIXEL_COLLISIONS, true);

        let inner = base.aabb_inner;
        let mut params = TileCollisionParams::downwards(true);
        let above = if x < 0.0 {
            Aabb::new(inner.l - 8.0 + x, inner.t, inner.l, inner.b - 2.0)
        } else {
            Aabb::new(inner.r, inner.t, inner.r + 8.0 + x, inner.b - 2.0)
        };
        let success = if level.is_position_empty(base, &above, &mut params) {
            let below = if x < 0.0 {
                Aabb::new(inner.l - 8.0 + x, inner.b, inner.l - 2.0, inner.b + 8.0)
            } else {
                Aabb::new(inner.r + 2.0, inner.b, inner.r + 8.0 + x, inner.b + 8.0)
            };
            !level.is_position_empty(base, &below, &mut params)
        } else {
            false
        };

        base.state = prev;
        success
    }

    /// Maybe leave a pickup behind.
    pub fn try_generate_random_drop(base: &ActorBase, level: &mut LevelHandler) {
        let total: i32 = DROP_TABLE.iter().map(|(_, chance)| chance).sum();
        let mut drop = level.rng().range_i32(0, total);
        for (event, chance) in DROP_TABLE {
            if drop < chance {
                if !event.is_empty() {
                    let params = [0u8; SPAWN_PARAMS_SIZE];
                    let pos = Vec2::new(base.pos.x.trunc(), base.pos.y.trunc());
                    level.spawn_event(event, &params, ActorState::empty(), pos);
                }
                return;
            }
            drop -= chance;
        }
    }

    /// Take a hit from a projectile. Returns false if the shot should fly on.
    pub fn hit_by_shot(
        &mut self,
        base: &mut ActorBase,
        strength: i32,
        shot_speed: Vec2,
        shot: ActorHandle,
        owner: Option<ActorHandle>,
    ) -> bool {
        if !self.can_collide_with_ammo {
            return false;
        }
        if base.is_invulnerable() || strength <= 0 {
            return true;
        }
        self.last_hit_dir = if shot_speed.x.abs() > 0.2 {
            if shot_speed.x > 0.0 {
                LastHitDirection::Right
            } else {
                LastHitDirection::Left
            }
        } else if shot_speed.y > 0.0 {
            LastHitDirection::Down
        } else {
            LastHitDirection::Up
        };
        if owner.is_some() {
            self.scorer = owner;
        }
        base.decrease_health(strength, Some(shot));
        true
    }

    /// Generic reaction to other actors: projectiles, TNT and freezing.
    pub fn handle_collision(&mut self, base: &mut ActorBase, other: &mut Actor) -> bool {
        if !base.is_invulnerable() {
            if let Some(shot) = other.kind.shot() {
                let (strength, owner) = (shot.strength, shot.owner);
                if strength > 0 && self.hit_by_shot(base, strength, other.base.speed, other.handle(), owner) {
                    other.base.decrease_health(i32::MAX, Some(base.handle));
                    return true;
                }
            } else if let ActorKind::Tnt(tnt) = &other.kind {
                if tnt.owner().is_some() {
                    self.scorer = tnt.owner();
                }
                base.decrease_health(5, Some(other.handle()));
                return true;
            }
        }
        base.handle_frozen_state_change(other);
        false
    }

    /// Frozen enemies shatter into ice. Returns true if they did.
    pub fn create_death_debris(base: &ActorBase, level: &mut LevelHandler) -> bool {
        if base.frozen_time_left <= 0.0 {
            return false;
        }
        for _ in 0..20 {
            explosion::create(level, base.pos.trunc(), ExplosionType::IceShrapnel);
        }
        level.play_common_sfx("IceBreak", base.pos);
        true
    }

    pub fn perish(&mut self, base: &mut ActorBase, level: &mut LevelHandler, collider: Option<ActorHandle>) -> bool {
        self.add_score_to_collider(level, collider);
        base.perish(level)
    }

    /// Position of the closest player within `max_distance`.
    pub fn nearest_player(base: &ActorBase, level: &LevelHandler, max_distance: f32) -> Option<Vec2> {
        level
            .player_positions()
            .into_iter()
            .map(|(_, pos)| pos)
            .filter(|pos| pos.distance(base.pos) <= max_distance)
            .min_by(|a, b| {
                a.distance_squared(base.pos)
                    .total_cmp(&b.distance_squared(base.pos))
            })
    }
}
