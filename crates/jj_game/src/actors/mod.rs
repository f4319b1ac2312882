//! Actor model.
//!
//! An [`Actor`] is the shared [`ActorBase`] plus an [`ActorKind`], a tagged
//! union over every concrete behaviour. Each kind implements
//! [`ActorBehavior`]; the level dispatches through [`ActorKind::behavior`]
//! instead of walking a class hierarchy.
//!
//! Kind callbacks only ever see their own state, the base, and the level. Work
//! that has to run a *different* callback on the same actor (perishing after
//! damage, post-transition actions) is queued on the base as an [`ActorHook`]
//! and flushed by the `Actor` entry points once the current callback returns.

pub mod activation;
pub mod arena;
pub mod base;
pub mod bosses;
pub mod collectibles;
pub mod enemies;
pub mod environment;
pub mod explosion;
pub mod player;
pub mod weapons;

use crate::events::event_type::EventType;
use crate::events::params::SpawnParams;
use crate::level_handler::LevelHandler;
use crate::tiles::TileCollisionParams;

pub use activation::{Activation, ActorActivationDetails};
pub use arena::{ActorArena, ActorHandle};
pub use base::ActorBase;

use bosses::turtle_boss::{TurtleBoss, TurtleBossMace};
use collectibles::{food::Food, gem::Gem, gem_ring::GemRing};
use enemies::caterpillar::{Caterpillar, CaterpillarSmoke};
use enemies::crab::Crab;
use enemies::dragon::{Dragon, DragonFire};
use enemies::lab_rat::LabRat;
use enemies::turtle::Turtle;
use enemies::turtle_shell::TurtleShell;
use enemies::EnemyBase;
use environment::spring::Spring;
use explosion::Explosion;
use player::Player;
use weapons::{
    blaster::BlasterShot, electro::ElectroShot, freezer::FreezerShot, tnt::Tnt, ShotBase,
};

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ActorState: u32 {
        const IS_CREATED_FROM_EVENT_MAP = 0x01;
        const IS_FROM_GENERATOR = 0x02;
        const ILLUMINATED = 0x04;
        const ASYNC = 0x08;

        const INITIALIZED = 0x100;
        const IS_INVULNERABLE = 0x200;
        const CAN_JUMP = 0x400;
        const CAN_BE_FROZEN = 0x800;
        const IS_FACING_LEFT = 0x1000;

        const COLLIDE_WITH_TILESET = 0x10000;
        const COLLIDE_WITH_OTHER_ACTORS = 0x20000;
        const COLLIDE_WITH_SOLID_OBJECTS = 0x40000;
        const FORCE_DISABLE_COLLISIONS = 0x80000;
        const IS_DIRTY = 0x100000;
        const IS_DESTROYED = 0x200000;
        const APPLY_GRAVITATION = 0x400000;
        const IS_SOLID_OBJECT = 0x800000;
        const SKIP_PER_PIXEL_COLLISIONS = 0x1000000;
        const COLLIDE_WITH_TILESET_REDUCED = 0x2000000;
        const COLLIDE_WITH_SOLID_OBJECTS_BELOW = 0x4000000;
        const PRESERVE_ON_ROLLBACK = 0x8000000;
        const EXCLUDE_SIMILAR = 0x10000000;
    }
}

bitflags::bitflags! {
    /// No flags means an absolute, collision-checked move.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct MoveType: u8 {
        const RELATIVE = 0x01;
        const FORCE = 0x02;
    }
}

bitflags::bitflags! {
    /// Surfaces hit during one movement step.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct SurfaceHits: u8 {
        const FLOOR = 0x01;
        const WALL = 0x02;
        const CEILING = 0x04;
    }
}

/// What happens once a transition animation ends (or is cancelled).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AfterTransition {
    Nothing,
    Destroy,
    TurtleWithdrawn,
    TurtleTurned,
    TurtleAttackDone,
    LabRatAttackDone,
    CaterpillarIdle(u8),
    CaterpillarSmoke,
    CaterpillarDisoriented,
    DragonTurned,
    DragonAttackStarted,
    DragonAttackDone,
    BossMaceThrown,
    BossAttackReady,
    BossMaceReturned,
    BossDied,
    PlayerButtstomp,
    PlayerRespawn,
    TntExploded,
}

/// Deferred callbacks, see the module docs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorHook {
    Transition(AfterTransition),
    HealthChanged(Option<ActorHandle>),
    Perish(Option<ActorHandle>),
}

const MAX_HOOK_ROUNDS: usize = 16;

#[derive(Debug)]
pub struct Actor {
    pub base: ActorBase,
    pub kind: ActorKind,
}

#[derive(Debug)]
pub enum ActorKind {
    Player(Player),
    Crab(Crab),
    Turtle(Turtle),
    TurtleShell(TurtleShell),
    LabRat(LabRat),
    Caterpillar(Caterpillar),
    CaterpillarSmoke(CaterpillarSmoke),
    Dragon(Dragon),
    DragonFire(DragonFire),
    TurtleBoss(TurtleBoss),
    TurtleBossMace(TurtleBossMace),
    Gem(Gem),
    Food(Food),
    GemRing(GemRing),
    BlasterShot(BlasterShot),
    ElectroShot(ElectroShot),
    FreezerShot(FreezerShot),
    Tnt(Tnt),
    Spring(Spring),
    Explosion(Explosion),
}

impl ActorKind {
    pub fn behavior(&mut self) -> &mut dyn ActorBehavior {
        match self {
            Self::Player(s) => s,
            Self::Crab(s) => s,
            Self::Turtle(s) => s,
            Self::TurtleShell(s) => s,
            Self::LabRat(s) => s,
            Self::Caterpillar(s) => s,
            Self::CaterpillarSmoke(s) => s,
            Self::Dragon(s) => s,
            Self::DragonFire(s) => s,
            Self::TurtleBoss(s) => s,
            Self::TurtleBossMace(s) => s,
            Self::Gem(s) => s,
            Self::Food(s) => s,
            Self::GemRing(s) => s,
            Self::BlasterShot(s) => s,
            Self::ElectroShot(s) => s,
            Self::FreezerShot(s) => s,
            Self::Tnt(s) => s,
            Self::Spring(s) => s,
            Self::Explosion(s) => s,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Player(_) => "Player",
            Self::Crab(_) => "Crab",
            Self::Turtle(_) => "Turtle",
            Self::TurtleShell(_) => "TurtleShell",
            Self::LabRat(_) => "LabRat",
            Self::Caterpillar(_) => "Caterpillar",
            Self::CaterpillarSmoke(_) => "CaterpillarSmoke",
            Self::Dragon(_) => "Dragon",
            Self::DragonFire(_) => "DragonFire",
            Self::TurtleBoss(_) => "TurtleBoss",
            Self::TurtleBossMace(_) => "TurtleBossMace",
            Self::Gem(_) => "Gem",
            Self::Food(_) => "Food",
            Self::GemRing(_) => "GemRing",
            Self::BlasterShot(_) => "BlasterShot",
            Self::ElectroShot(_) => "ElectroShot",
            Self::FreezerShot(_) => "FreezerShot",
            Self::Tnt(_) => "Tnt",
            Self::Spring(_) => "Spring",
            Self::Explosion(_) => "Explosion",
        }
    }

    /// Lower values claim a collision pair first.
    pub fn collision_priority(&self) -> u8 {
        match self {
            Self::TurtleBoss(_) => 0,
            Self::Player(_) => 1,
            Self::BlasterShot(_) | Self::ElectroShot(_) | Self::FreezerShot(_) | Self::Tnt(_) => 2,
            Self::TurtleShell(_) => 3,
            Self::Crab(_)
            | Self::Turtle(_)
            | Self::LabRat(_)
            | Self::Caterpillar(_)
            | Self::Dragon(_) => 4,
            Self::Gem(_) | Self::Food(_) | Self::GemRing(_) => 5,
            _ => 6,
        }
    }

    pub fn enemy(&self) -> Option<&EnemyBase> {
        match self {
            Self::Crab(s) => Some(&s.enemy),
            Self::Turtle(s) => Some(&s.enemy),
            Self::TurtleShell(s) => Some(&s.enemy),
            Self::LabRat(s) => Some(&s.enemy),
            Self::Caterpillar(s) => Some(&s.enemy),
            Self::CaterpillarSmoke(s) => Some(&s.enemy),
            Self::Dragon(s) => Some(&s.enemy),
            Self::DragonFire(s) => Some(&s.enemy),
            Self::TurtleBoss(s) => Some(&s.boss.enemy),
            Self::TurtleBossMace(s) => Some(&s.enemy),
            _ => None,
        }
    }

    pub fn enemy_mut(&mut self) -> Option<&mut EnemyBase> {
        match self {
            Self::Crab(s) => Some(&mut s.enemy),
            Self::Turtle(s) => Some(&mut s.enemy),
            Self::TurtleShell(s) => Some(&mut s.enemy),
            Self::LabRat(s) => Some(&mut s.enemy),
            Self::Caterpillar(s) => Some(&mut s.enemy),
            Self::CaterpillarSmoke(s) => Some(&mut s.enemy),
            Self::Dragon(s) => Some(&mut s.enemy),
            Self::DragonFire(s) => Some(&mut s.enemy),
            Self::TurtleBoss(s) => Some(&mut s.boss.enemy),
            Self::TurtleBossMace(s) => Some(&mut s.enemy),
            _ => None,
        }
    }

    pub fn shot(&self) -> Option<&ShotBase> {
        match self {
            Self::BlasterShot(s) => Some(&s.shot),
            Self::ElectroShot(s) => Some(&s.shot),
            Self::FreezerShot(s) => Some(&s.shot),
            _ => None,
        }
    }

    pub fn is_player(&self) -> bool {
        matches!(self, Self::Player(_))
    }

    pub fn as_player(&self) -> Option<&Player> {
        match self {
            Self::Player(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_player_mut(&mut self) -> Option<&mut Player> {
        match self {
            Self::Player(p) => Some(p),
            _ => None,
        }
    }

    pub fn is_boss(&self) -> bool {
        matches!(self, Self::TurtleBoss(_))
    }
}

/// Per-kind behaviour hooks. Every method receives the kind's own state, the
/// shared base and the level; defaults implement the generic actor behaviour.
pub trait ActorBehavior {
    /// Set up state from the activation details and name the metadata to load.
    fn on_activated(
        &mut self,
        base: &mut ActorBase,
        level: &mut LevelHandler,
        details: &ActorActivationDetails,
    ) -> Activation;

    /// Runs once the requested metadata is attached. Returning `Discard`
    /// drops the actor before it joins the level.
    fn on_metadata_loaded(&mut self, _base: &mut ActorBase, _level: &mut LevelHandler) -> Activation {
        Activation::Commit
    }

    fn on_update(&mut self, base: &mut ActorBase, level: &mut LevelHandler, time_mult: f32) {
        let mut params = TileCollisionParams::downwards(base.speed.y >= 0.0);
        self.move_standard(base, level, time_mult, &mut params);
        self.on_update_hitbox(base);
        base.update_frozen_state(level, time_mult);
    }

    fn on_update_hitbox(&mut self, base: &mut ActorBase) {
        base.update_hitbox_from_metadata();
    }

    fn on_hit_floor(&mut self, _base: &mut ActorBase, _level: &mut LevelHandler, _time_mult: f32) {}

    fn on_hit_wall(&mut self, _base: &mut ActorBase, _level: &mut LevelHandler, _time_mult: f32) {}

    fn on_hit_ceiling(&mut self, _base: &mut ActorBase, _level: &mut LevelHandler, _time_mult: f32) {}

    /// Return `true` to claim the interaction so `other` is not asked.
    fn on_handle_collision(
        &mut self,
        base: &mut ActorBase,
        _level: &mut LevelHandler,
        other: &mut Actor,
    ) -> bool {
        base.handle_frozen_state_change(other);
        false
    }

    fn on_health_changed(
        &mut self,
        _base: &mut ActorBase,
        _level: &mut LevelHandler,
        _collider: Option<ActorHandle>,
    ) {
    }

    /// Return `true` to be destroyed now, `false` to destroy later.
    fn on_perish(
        &mut self,
        base: &mut ActorBase,
        level: &mut LevelHandler,
        _collider: Option<ActorHandle>,
    ) -> bool {
        base.perish(level)
    }

    fn on_transition_finished(
        &mut self,
        base: &mut ActorBase,
        _level: &mut LevelHandler,
        action: AfterTransition,
    ) {
        if action == AfterTransition::Destroy {
            base.destroy();
        }
    }

    /// Asked when the actor's origin falls out of every player's range.
    fn on_tile_deactivated(&mut self, _base: &mut ActorBase, _level: &mut LevelHandler) -> bool {
        true
    }

    fn on_triggered_event(
        &mut self,
        _base: &mut ActorBase,
        _level: &mut LevelHandler,
        _event: EventType,
        _params: &SpawnParams,
    ) {
    }

    /// Only bosses accept this.
    fn on_activated_boss(&mut self, _base: &mut ActorBase, _level: &mut LevelHandler) -> bool {
        false
    }

    /// Standard movement followed by the surface callbacks it triggered.
    fn move_standard(
        &mut self,
        base: &mut ActorBase,
        level: &mut LevelHandler,
        time_mult: f32,
        params: &mut TileCollisionParams,
    ) {
        let hits = base.try_standard_movement(level, time_mult, params);
        if hits.contains(SurfaceHits::WALL) {
            self.on_hit_wall(base, level, time_mult);
        }
        if hits.contains(SurfaceHits::FLOOR) {
            self.on_hit_floor(base, level, time_mult);
        }
        if hits.contains(SurfaceHits::CEILING) {
            self.on_hit_ceiling(base, level, time_mult);
        }
    }
}

impl Actor {
    pub fn new(kind: ActorKind, handle: ActorHandle) -> Self {
        Self {
            base: ActorBase::new(handle),
            kind,
        }
    }

    pub fn handle(&self) -> ActorHandle {
        self.base.handle
    }

    pub fn is_destroyed(&self) -> bool {
        self.base.state.contains(ActorState::IS_DESTROYED)
    }

    pub(crate) fn activate(
        &mut self,
        level: &mut LevelHandler,
        details: &ActorActivationDetails,
    ) -> Activation {
        self.base.apply_activation_details(details, level.elapsed_frames());
        let activation = self
            .kind
            .behavior()
            .on_activated(&mut self.base, level, details);
        self.flush(level);
        activation
    }

    pub(crate) fn metadata_loaded(&mut self, level: &mut LevelHandler) -> Activation {
        let activation = self
            .kind
            .behavior()
            .on_metadata_loaded(&mut self.base, level);
        self.flush(level);
        activation
    }

    /// One simulation step: behaviour, then animation and transitions.
    pub fn update(&mut self, level: &mut LevelHandler, time_mult: f32) {
        if self.is_destroyed() {
            return;
        }
        self.kind
            .behavior()
            .on_update(&mut self.base, level, time_mult);
        self.base.tick_animation(time_mult);
        self.flush(level);
    }

    /// Never called with a destroyed actor on either side.
    pub fn handle_collision(&mut self, level: &mut LevelHandler, other: &mut Actor) -> bool {
        if self.is_destroyed() || other.is_destroyed() {
            return false;
        }
        let claimed = self
            .kind
            .behavior()
            .on_handle_collision(&mut self.base, level, other);
        self.flush(level);
        other.flush(level);
        claimed
    }

    pub fn decrease_health(
        &mut self,
        level: &mut LevelHandler,
        amount: i32,
        collider: Option<ActorHandle>,
    ) {
        self.base.decrease_health(amount, collider);
        self.flush(level);
    }

    pub fn on_tile_deactivated(&mut self, level: &mut LevelHandler) -> bool {
        let accepted = self
            .kind
            .behavior()
            .on_tile_deactivated(&mut self.base, level);
        self.flush(level);
        accepted
    }

    pub fn on_triggered_event(
        &mut self,
        level: &mut LevelHandler,
        event: EventType,
        params: &SpawnParams,
    ) {
        self.kind
            .behavior()
            .on_triggered_event(&mut self.base, level, event, params);
        self.flush(level);
    }

    pub fn on_activated_boss(&mut self, level: &mut LevelHandler) -> bool {
        let accepted = self
            .kind
            .behavior()
            .on_activated_boss(&mut self.base, level);
        self.flush(level);
        accepted
    }

    pub fn update_hitbox(&mut self) {
        self.kind.behavior().on_update_hitbox(&mut self.base);
    }

    /// Run queued hooks until none are left.
    pub(crate) fn flush(&mut self, level: &mut LevelHandler) {
        for _ in 0..MAX_HOOK_ROUNDS {
            let hooks = self.base.take_hooks();
            if hooks.is_empty() {
                return;
            }
            let behavior = self.kind.behavior();
            for hook in hooks {
                match hook {
                    ActorHook::Transition(action) => {
                        behavior.on_transition_finished(&mut self.base, level, action)
                    }
                    ActorHook::HealthChanged(collider) => {
                        behavior.on_health_changed(&mut self.base, level, collider)
                    }
                    ActorHook::Perish(collider) => {
                        if behavior.on_perish(&mut self.base, level, collider) {
                            self.base.destroy();
                        }
                    }
                }
            }
        }
        log::warn!(
            "{} {:?} kept queueing hooks, dropping the rest",
            self.kind.name(),
            self.base.handle
        );
        self.base.take_hooks();
    }
}

#[cfg(test)]
pub(crate) mod test_support;
