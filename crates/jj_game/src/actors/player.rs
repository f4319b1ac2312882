//! The playable character.
//!
//! Input comes from the level's per-slot [`PlayerInput`]; everything else
//! (collisions, area events, dying and respawning) goes through the usual
//! actor callbacks. Progress that survives a level change lives here too and
//! is handed to the next level as a [`PlayerCarryOver`].

use glam::{IVec2, Vec2};
use jj_core::input::{PlayerAction, PlayerInput};
use jj_core::Aabb;

use super::explosion::{self, ExplosionType};
use super::weapons::{blaster::BlasterShot, electro::ElectroShot, freezer::FreezerShot, tnt::Tnt};
use super::{
    Activation, Actor, ActorActivationDetails, ActorBase, ActorBehavior, ActorHandle, ActorKind,
    ActorState, AfterTransition, MoveType,
};
use crate::config::{ExitType, PlayerCarryOver, PlayerType};
use crate::events::event_type::EventType;
use crate::events::params::{ShotParams, SPAWN_PARAMS_SIZE};
use crate::level_handler::{LevelHandler, LevelState};
use crate::tiles::{world_to_tile, TileCollisionParams};

const MAX_RUNNING_SPEED: f32 = 4.0;
const MAX_DASHING_SPEED: f32 = 9.0;
const MAX_DIZZY_SPEED: f32 = 2.4;
const ACCELERATION: f32 = 0.2;
const DECELERATION: f32 = 0.22;

pub const MAX_HEALTH: i32 = 5;
pub const MAX_LIVES: i32 = 99;
pub const MAX_SCORE: i32 = 999_999_999;
const MAX_AMMO: i32 = 99;
const DEFAULT_LIVES: i32 = 3;

const HURT_INVULNERABLE_FRAMES: f32 = 180.0;
const HURT_INVULNERABLE_FRAMES_MULTIPLAYER: f32 = 80.0;
const SPRING_COOLDOWN: f32 = 10.0;
const SUGAR_RUSH_FRAMES: f32 = 1300.0;
const FOOD_FOR_SUGAR_RUSH: i32 = 100;
const SPECIAL_MOVE_DAMAGE: i32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeaponType {
    Blaster,
    Freezer,
    Electro,
    Tnt,
}

impl WeaponType {
    pub const ALL: [WeaponType; 4] = [Self::Blaster, Self::Freezer, Self::Electro, Self::Tnt];

    fn index(self) -> usize {
        match self {
            Self::Blaster => 0,
            Self::Freezer => 1,
            Self::Electro => 2,
            Self::Tnt => 3,
        }
    }

    fn cooldown(self) -> f32 {
        match self {
            Self::Tnt => 60.0,
            _ => 30.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpecialMove {
    #[default]
    None,
    Buttstomp,
}

/// What the player gets back after dying.
#[derive(Debug, Clone, Copy)]
struct Checkpoint {
    pos: Vec2,
    gems: [i32; 4],
    food_eaten: i32,
    ammo: [i32; 4],
}

#[derive(Debug)]
pub struct Player {
    player_type: PlayerType,
    index: u8,
    lives: i32,
    score: i32,
    gems: [i32; 4],
    food_eaten: i32,
    sugar_rush_left: f32,

    current_weapon: WeaponType,
    /// Negative means unlimited.
    weapon_ammo: [i32; 4],
    weapon_cooldown: f32,

    invulnerable_time: f32,
    spring_cooldown: f32,
    dizzy_time: f32,
    hit_floor_time: f32,
    special_move: SpecialMove,
    was_jump_pressed: bool,
    was_fire_pressed: bool,
    can_double_jump: bool,

    checkpoint: Checkpoint,
    last_checkpoint_tile: Option<IVec2>,
    game_over: bool,
}

impl Player {
    pub fn new(player_type: PlayerType, index: u8) -> Self {
        Self {
            player_type,
            index,
            lives: DEFAULT_LIVES,
            score: 0,
            gems: [0; 4],
            food_eaten: 0,
            sugar_rush_left: 0.0,
            current_weapon: WeaponType::Blaster,
            weapon_ammo: [-1, 0, 0, 0],
            weapon_cooldown: 0.0,
            invulnerable_time: 0.0,
            spring_cooldown: 0.0,
            dizzy_time: 0.0,
            hit_floor_time: 0.0,
            special_move: SpecialMove::None,
            was_jump_pressed: false,
            was_fire_pressed: false,
            can_double_jump: true,
            checkpoint: Checkpoint {
                pos: Vec2::ZERO,
                gems: [0; 4],
                food_eaten: 0,
                ammo: [-1, 0, 0, 0],
            },
            last_checkpoint_tile: None,
            game_over: false,
        }
    }

    /// Continue with the progress from the previous level.
    pub fn with_carry_over(carry: &PlayerCarryOver, index: u8) -> Self {
        let mut player = Self::new(carry.player_type, index);
        player.restore_progress(carry.lives, carry.score, carry.gems, carry.food_eaten);
        player
    }

    pub fn restore_progress(&mut self, lives: i32, score: i32, gems: [i32; 4], food_eaten: i32) {
        self.lives = lives.clamp(1, MAX_LIVES);
        self.score = score.clamp(0, MAX_SCORE);
        self.gems = gems;
        self.food_eaten = food_eaten.rem_euclid(FOOD_FOR_SUGAR_RUSH);
    }

    pub fn carry_over(&self) -> PlayerCarryOver {
        PlayerCarryOver {
            player_type: self.player_type,
            lives: self.lives,
            score: self.score,
            gems: self.gems,
            food_eaten: self.food_eaten,
        }
    }

    pub fn player_type(&self) -> PlayerType {
        self.player_type
    }

    pub fn index(&self) -> u8 {
        self.index
    }

    pub fn lives(&self) -> i32 {
        self.lives
    }

    pub fn score(&self) -> i32 {
        self.score
    }

    pub fn gems(&self) -> [i32; 4] {
        self.gems
    }

    pub fn food_eaten(&self) -> i32 {
        self.food_eaten
    }

    pub fn special_move(&self) -> SpecialMove {
        self.special_move
    }

    pub fn current_weapon(&self) -> WeaponType {
        self.current_weapon
    }

    pub fn ammo(&self, weapon: WeaponType) -> i32 {
        self.weapon_ammo[weapon.index()]
    }

    pub fn is_dizzy(&self) -> bool {
        self.dizzy_time > 0.0
    }

    pub fn has_sugar_rush(&self) -> bool {
        self.sugar_rush_left > 0.0
    }

    pub fn is_game_over(&self) -> bool {
        self.game_over
    }

    pub fn checkpoint_pos(&self) -> Vec2 {
        self.checkpoint.pos
    }

    pub fn add_score(&mut self, amount: i32) {
        self.score = (self.score as i64 + amount as i64).clamp(0, MAX_SCORE as i64) as i32;
    }

    /// Returns false when already at full health.
    pub fn add_health(&mut self, base: &mut ActorBase, level: &mut LevelHandler, amount: i32) -> bool {
        if base.health >= MAX_HEALTH {
            return false;
        }
        base.health = if amount < 0 {
            MAX_HEALTH
        } else {
            (base.health + amount).min(MAX_HEALTH)
        };
        level.play_sfx("PickupFood", base.pos);
        true
    }

    pub fn add_lives(&mut self, base: &ActorBase, level: &mut LevelHandler, count: i32) -> bool {
        if self.lives >= MAX_LIVES {
            return false;
        }
        self.lives = (self.lives + count).min(MAX_LIVES);
        level.play_sfx("PickupOneUp", base.pos);
        true
    }

    pub fn add_gems(&mut self, base: &ActorBase, level: &mut LevelHandler, gem_type: u8, count: i32) {
        let slot = (gem_type & 0x03) as usize;
        self.gems[slot] += count;
        level.play_sfx("PickupGem", base.pos);
        level.show_gems(self.index, self.gems[slot]);
    }

    pub fn add_ammo(&mut self, weapon: WeaponType, count: i32) {
        let ammo = &mut self.weapon_ammo[weapon.index()];
        if *ammo < 0 {
            return;
        }
        *ammo = (*ammo + count).clamp(0, MAX_AMMO);
    }

    /// Every hundredth item starts a sugar rush.
    pub fn consume_food(&mut self, base: &ActorBase, level: &mut LevelHandler, drinkable: bool) {
        level.play_sfx(if drinkable { "PickupDrink" } else { "PickupFood" }, base.pos);
        self.food_eaten += 1;
        if self.food_eaten >= FOOD_FOR_SUGAR_RUSH {
            self.food_eaten = 0;
            self.sugar_rush_left = SUGAR_RUSH_FRAMES;
            level.play_sfx("SugarRush", base.pos);
        }
    }

    /// Returns true if the player was not dizzy before.
    pub fn set_dizzy_time(&mut self, time: f32) -> bool {
        let was_dizzy = self.dizzy_time > 0.0;
        self.dizzy_time = time;
        !was_dizzy
    }

    pub fn set_invulnerability(&mut self, base: &mut ActorBase, time: f32) {
        self.invulnerable_time = time;
        base.set_state(ActorState::IS_INVULNERABLE, time > 0.0);
    }

    /// Remember where to come back after dying and what to restore.
    pub fn set_checkpoint(&mut self, pos: Vec2) {
        self.checkpoint = Checkpoint {
            pos: Vec2::new(pos.x, pos.y - 20.0),
            gems: self.gems,
            food_eaten: self.food_eaten,
            ammo: self.weapon_ammo,
        };
    }

    /// Hurt the player and knock it back by `push`. Returns false if the hit
    /// was ignored.
    pub fn take_damage(
        &mut self,
        base: &mut ActorBase,
        level: &mut LevelHandler,
        amount: i32,
        push: f32,
    ) -> bool {
        if amount <= 0
            || base.is_invulnerable()
            || base.is_perished()
            || level.state() == LevelState::LevelChanging
        {
            return false;
        }

        base.decrease_health(amount, None);
        base.speed.x = 0.0;
        base.internal_force_y = 0.0;
        base.set_state(ActorState::CAN_JUMP, false);

        if base.health > 0 {
            base.external_force.x = push;
            base.speed.y = -6.5;
            self.end_damaging_move(base);
            base.set_transition("Hurt", false, AfterTransition::Nothing);
            let frames = if level.is_multiplayer() {
                HURT_INVULNERABLE_FRAMES_MULTIPLAYER
            } else {
                HURT_INVULNERABLE_FRAMES
            };
            self.set_invulnerability(base, frames);
            level.play_sfx("Hurt", base.pos);
        }
        true
    }

    fn is_damaging_move(&self) -> bool {
        self.special_move != SpecialMove::None || self.sugar_rush_left > 0.0
    }

    fn end_damaging_move(&mut self, base: &mut ActorBase) {
        if self.special_move == SpecialMove::Buttstomp {
            base.set_state(ActorState::APPLY_GRAVITATION, true);
            if base.transition_name() == Some("TransitionButtstompStart") {
                base.force_cancel_transition();
            }
        }
        self.special_move = SpecialMove::None;
    }

    fn update_timers(&mut self, base: &mut ActorBase, time_mult: f32) {
        if self.invulnerable_time > 0.0 {
            self.invulnerable_time -= time_mult;
            if self.invulnerable_time <= 0.0 && !base.is_perished() {
                base.set_state(ActorState::IS_INVULNERABLE, false);
            }
        }
        for timer in [
            &mut self.spring_cooldown,
            &mut self.weapon_cooldown,
            &mut self.dizzy_time,
            &mut self.hit_floor_time,
            &mut self.sugar_rush_left,
        ] {
            if *timer > 0.0 {
                *timer = (*timer - time_mult).max(0.0);
            }
        }
    }

    fn update_walking(&mut self, base: &mut ActorBase, level: &LevelHandler, input: &PlayerInput, time_mult: f32) {
        let movement = input.horizontal_movement();
        let velocity = movement.abs();
        let running = input.is_pressed(PlayerAction::Run);

        if self.special_move == SpecialMove::Buttstomp {
            base.speed.x = 0.2 * movement * if running { 2.6 } else { 1.0 };
        } else if velocity > 0.5 {
            let dizzy = self.dizzy_time > 0.0;
            base.set_facing_left(if dizzy { movement > 0.0 } else { movement < 0.0 });

            let acceleration = if level.is_reforged() {
                ACCELERATION
            } else {
                ACCELERATION * 2.0
            };
            let max_speed = if dizzy {
                MAX_DIZZY_SPEED
            } else if running {
                MAX_DASHING_SPEED
            } else {
                MAX_RUNNING_SPEED
            } * velocity;
            let direction = if base.is_facing_left() { -1.0 } else { 1.0 };
            base.speed.x = (base.speed.x + acceleration * time_mult * direction).clamp(-max_speed, max_speed);
        } else {
            self.decelerate(base, time_mult);
        }
    }

    fn decelerate(&self, base: &mut ActorBase, time_mult: f32) {
        let abs = (base.speed.x.abs() - DECELERATION * time_mult).max(0.0);
        base.speed.x = if base.speed.x < 0.0 { -abs } else { abs };
    }

    fn update_jumping(&mut self, base: &mut ActorBase, level: &mut LevelHandler, input: &PlayerInput) {
        if input.is_hit(PlayerAction::Jump) {
            self.was_jump_pressed = true;
            if self.special_move != SpecialMove::None {
                return;
            }
            if base.has_state(ActorState::CAN_JUMP) {
                base.set_state(ActorState::CAN_JUMP | ActorState::IS_SOLID_OBJECT, false);
                base.set_state(ActorState::APPLY_GRAVITATION, true);
                let run_bonus = ((base.speed.x.abs() - MAX_RUNNING_SPEED) * 0.3).max(0.0);
                if level.is_reforged() {
                    base.speed.y = -3.55 - run_bonus;
                    base.internal_force_y = -1.02;
                } else {
                    base.speed.y = -8.0 - run_bonus;
                }
                level.play_sfx("Jump", base.pos);
            } else if self.player_type == PlayerType::Spaz && self.can_double_jump {
                self.can_double_jump = false;
                base.speed.y = -4.5;
                base.internal_force_y = if level.is_reforged() { -0.6 } else { 0.0 };
                level.play_sfx("DoubleJump", base.pos);
            }
        } else if self.was_jump_pressed && !input.is_pressed(PlayerAction::Jump) {
            // Releasing early cuts the jump short.
            self.was_jump_pressed = false;
            if level.is_reforged() {
                base.internal_force_y = base.internal_force_y.max(0.0);
            } else if base.speed.y < -4.0 {
                base.speed.y = -4.0;
            }
        }
    }

    fn update_buttstomp(&mut self, base: &mut ActorBase, input: &PlayerInput) {
        if !input.is_hit(PlayerAction::Down)
            || base.has_state(ActorState::CAN_JUMP)
            || self.special_move != SpecialMove::None
        {
            return;
        }
        base.speed = Vec2::ZERO;
        base.internal_force_y = 0.0;
        base.external_force.y = 0.0;
        base.set_state(ActorState::APPLY_GRAVITATION, false);
        self.special_move = SpecialMove::Buttstomp;
        base.set_animation("Buttstomp");
        base.set_transition("TransitionButtstompStart", true, AfterTransition::PlayerButtstomp);
    }

    fn update_firing(&mut self, base: &mut ActorBase, level: &mut LevelHandler, input: &PlayerInput) {
        if input.is_hit(PlayerAction::ChangeWeapon) {
            self.switch_to_next_weapon(base, level);
        }

        if input.is_pressed(PlayerAction::Fire) {
            self.was_fire_pressed = true;
            if self.weapon_cooldown <= 0.0 && self.ammo(self.current_weapon) != 0 {
                self.fire_current_weapon(base, level);
            }
        } else if self.was_fire_pressed {
            self.was_fire_pressed = false;
            self.weapon_cooldown = 0.0;
        }
    }

    fn fire_current_weapon(&mut self, base: &mut ActorBase, level: &mut LevelHandler) -> bool {
        let weapon = self.current_weapon;
        let owner = Some(base.handle);
        let facing_left = base.is_facing_left();
        let params = ShotParams {
            upgraded: false,
            facing_left,
        }
        .encode();
        let gun = Vec2::new(
            base.pos.x.trunc() + if facing_left { -16.0 } else { 16.0 },
            base.pos.y.trunc() + 4.0,
        );

        let (kind, pos) = match weapon {
            WeaponType::Blaster => (ActorKind::BlasterShot(BlasterShot::new(owner, base.speed.x)), gun),
            WeaponType::Freezer => (ActorKind::FreezerShot(FreezerShot::new(owner, base.speed.x)), gun),
            WeaponType::Electro => (ActorKind::ElectroShot(ElectroShot::new(owner, base.speed.x)), gun),
            WeaponType::Tnt => (ActorKind::Tnt(Tnt::new(owner)), base.pos.trunc()),
        };
        if level
            .spawn_actor(kind, ActorActivationDetails::new(pos).with_params(params))
            .is_none()
        {
            return false;
        }
        if weapon == WeaponType::Blaster {
            level.play_sfx("WeaponBlaster", base.pos);
        }
        self.weapon_cooldown = weapon.cooldown();

        let ammo = &mut self.weapon_ammo[weapon.index()];
        if *ammo > 0 {
            *ammo -= 1;
            if *ammo == 0 {
                self.switch_to_next_weapon(base, level);
            }
        }
        true
    }

    fn switch_to_next_weapon(&mut self, base: &ActorBase, level: &mut LevelHandler) {
        let current = self.current_weapon.index();
        let next = (1..WeaponType::ALL.len())
            .map(|offset| WeaponType::ALL[(current + offset) % WeaponType::ALL.len()])
            .find(|w| self.weapon_ammo[w.index()] != 0);
        if let Some(next) = next {
            self.current_weapon = next;
            self.weapon_cooldown = 0.0;
            level.play_sfx("ChangeWeapon", base.pos);
        }
    }

    fn check_end_of_special_moves(&mut self, base: &mut ActorBase) {
        if self.special_move == SpecialMove::Buttstomp
            && base.has_state(ActorState::CAN_JUMP)
            && base.has_state(ActorState::APPLY_GRAVITATION)
        {
            self.end_damaging_move(base);
        }
    }

    fn handle_area_events(&mut self, base: &mut ActorBase, level: &mut LevelHandler) {
        let (event, params) = level.event_map().event_by_position(base.pos.x, base.pos.y);
        let params = params.copied().unwrap_or([0; SPAWN_PARAMS_SIZE]);
        let tile = IVec2::new(world_to_tile(base.pos.x), world_to_tile(base.pos.y));

        match event {
            EventType::MODIFIER_DEATH => base.decrease_health(i32::MAX, None),
            EventType::MODIFIER_HURT => {
                let push = if base.is_facing_left() { 4.0 } else { -4.0 };
                self.take_damage(base, level, 1, push);
            }
            EventType::MODIFIER_SET_WATER | EventType::AREA_ACTIVATE_BOSS => {
                level.broadcast_triggered_event(event, &params);
            }
            EventType::AREA_END_OF_LEVEL => {
                if level.state() == LevelState::Active {
                    let next_level = match params[2] {
                        0 => None,
                        text => level.level_text(text),
                    };
                    level.begin_level_change(ExitType::from_u8(params[0]), next_level);
                }
            }
            EventType::CHECKPOINT => {
                if self.last_checkpoint_tile != Some(tile) {
                    self.last_checkpoint_tile = Some(tile);
                    self.set_checkpoint(base.pos);
                    level.set_checkpoint(base.pos);
                }
            }
            EventType::WARP_ORIGIN => {
                if let Some(target) = level.warp_target(params[0]) {
                    self.warp_to_position(base, level, target);
                }
            }
            _ => {}
        }
    }

    pub fn warp_to_position(&mut self, base: &mut ActorBase, level: &mut LevelHandler, pos: Vec2) {
        self.end_damaging_move(base);
        base.speed = Vec2::ZERO;
        base.external_force = Vec2::ZERO;
        base.internal_force_y = 0.0;
        let mut params = TileCollisionParams::default();
        base.move_instantly(level, pos, MoveType::FORCE, &mut params);
        self.on_update_hitbox(base);
        level.play_sfx("WarpIn", base.pos);
    }

    fn on_hit_spring(
        &mut self,
        base: &mut ActorBase,
        level: &mut LevelHandler,
        spring_pos: Vec2,
        force: Vec2,
        keep_speed_x: bool,
        keep_speed_y: bool,
    ) {
        let sign = if force.x + force.y > f32::EPSILON { 1.0 } else { -1.0 };
        let mut params = TileCollisionParams::downwards(true);

        if force.x.abs() > 0.0 {
            let target = Vec2::new(base.pos.x, (base.pos.y + spring_pos.y) * 0.5);
            base.move_instantly(level, target, MoveType::empty(), &mut params);
            base.speed.x = (1.0 + force.x.abs()) * sign;
            base.external_force.x = force.x * 0.6;
            self.spring_cooldown = SPRING_COOLDOWN;
            base.set_state(ActorState::CAN_JUMP, false);
            if !keep_speed_y {
                base.speed.y = 0.0;
                base.internal_force_y = 0.0;
                base.external_force.y = 0.0;
            }
            base.set_facing_left(sign < 0.0);
            level.play_sfx("Spring", base.pos);
        } else if force.y.abs() > 0.0 {
            let target = Vec2::new(base.pos.x + (spring_pos.x - base.pos.x) * 0.3, base.pos.y);
            base.move_instantly(level, target, MoveType::empty(), &mut params);
            base.speed.y = (4.0 + force.y.abs()) * sign;
            base.internal_force_y = 0.0;
            base.external_force.y = if level.is_reforged() { force.y } else { force.y * 0.8 };
            self.spring_cooldown = SPRING_COOLDOWN;
            base.set_state(ActorState::CAN_JUMP, false);
            base.set_state(ActorState::APPLY_GRAVITATION, true);
            if !keep_speed_x {
                base.speed.x = 0.0;
                base.external_force.x = 0.0;
            }
            if sign > 0.0 {
                // Pushed downwards.
                self.special_move = SpecialMove::Buttstomp;
                base.set_animation("Buttstomp");
            } else {
                self.end_damaging_move(base);
            }
            level.play_sfx("Spring", base.pos);
        }
    }

    fn update_animation(&self, base: &mut ActorBase) {
        let name = if self.special_move == SpecialMove::Buttstomp {
            "Buttstomp"
        } else if !base.has_state(ActorState::CAN_JUMP) {
            if base.speed.y < 0.0 {
                "Jump"
            } else {
                "Fall"
            }
        } else if base.speed.x.abs() > MAX_RUNNING_SPEED {
            "Run"
        } else if base.speed.x.abs() > 0.1 {
            "Walk"
        } else {
            "Idle"
        };
        base.set_animation(name);
    }

    fn respawn(&mut self, base: &mut ActorBase, level: &mut LevelHandler) {
        if self.lives <= 1 {
            self.lives = 0;
            self.game_over = true;
            level.handle_game_over(self.index);
            return;
        }

        self.lives -= 1;
        self.gems = self.checkpoint.gems;
        self.food_eaten = self.checkpoint.food_eaten;
        self.weapon_ammo = self.checkpoint.ammo;
        self.current_weapon = WeaponType::Blaster;
        self.special_move = SpecialMove::None;
        self.sugar_rush_left = 0.0;
        self.dizzy_time = 0.0;

        base.revive(MAX_HEALTH);
        base.set_state(ActorState::IS_INVULNERABLE, false);
        base.set_state(ActorState::APPLY_GRAVITATION, true);
        base.speed = Vec2::ZERO;
        base.external_force = Vec2::ZERO;
        base.internal_force_y = 0.0;
        self.invulnerable_time = 0.0;

        let mut params = TileCollisionParams::default();
        let target = self.checkpoint.pos;
        base.move_instantly(level, target, MoveType::FORCE, &mut params);
        self.on_update_hitbox(base);
        base.set_animation("Idle");

        log::info!(
            "Player {} respawned at checkpoint ({}, {}), {} lives left",
            self.index,
            target.x,
            target.y,
            self.lives
        );
        level.rollback_to_checkpoint();
    }
}

impl ActorBehavior for Player {
    fn on_activated(
        &mut self,
        base: &mut ActorBase,
        _level: &mut LevelHandler,
        _details: &ActorActivationDetails,
    ) -> Activation {
        base.set_state(
            ActorState::COLLIDE_WITH_TILESET_REDUCED
                | ActorState::COLLIDE_WITH_SOLID_OBJECTS
                | ActorState::IS_SOLID_OBJECT
                | ActorState::EXCLUDE_SIMILAR
                | ActorState::PRESERVE_ON_ROLLBACK,
            true,
        );
        base.set_state(ActorState::CAN_BE_FROZEN, false);
        base.health = MAX_HEALTH;
        base.max_health = MAX_HEALTH;
        self.set_checkpoint(Vec2::new(base.pos.x, base.pos.y + 20.0));
        Activation::Await(format!("Interactive/Player{:?}", self.player_type))
    }

    fn on_metadata_loaded(&mut self, base: &mut ActorBase, _level: &mut LevelHandler) -> Activation {
        base.set_animation("Idle");
        Activation::Commit
    }

    fn on_update(&mut self, base: &mut ActorBase, level: &mut LevelHandler, time_mult: f32) {
        self.update_timers(base, time_mult);

        let controllable = !base.is_perished()
            && !self.game_over
            && base.frozen_time_left <= 0.0
            && level.state() == LevelState::Active;
        if controllable {
            let input = level.player_input(self.index);
            self.update_walking(base, level, &input, time_mult);
            self.update_jumping(base, level, &input);
            self.update_buttstomp(base, &input);
            self.update_firing(base, level, &input);
        } else {
            self.decelerate(base, time_mult);
        }

        let mut params = TileCollisionParams::downwards(base.speed.y >= 0.0);
        self.move_standard(base, level, time_mult, &mut params);
        self.on_update_hitbox(base);
        self.check_end_of_special_moves(base);

        if !base.is_perished() {
            self.handle_area_events(base, level);
            self.update_animation(base);
        }
        base.update_frozen_state(level, time_mult);
    }

    fn on_update_hitbox(&mut self, base: &mut ActorBase) {
        let p = base.pos;
        base.aabb_inner = Aabb::new(p.x - 11.0, p.y - 10.0, p.x + 11.0, p.y + 20.0);
    }

    fn on_hit_floor(&mut self, base: &mut ActorBase, level: &mut LevelHandler, _time_mult: f32) {
        if self.hit_floor_time <= 0.0 && !base.has_state(ActorState::CAN_JUMP) {
            self.hit_floor_time = 30.0;
            level.play_sfx("Land", base.pos);
        }
        self.can_double_jump = true;
        base.set_state(ActorState::IS_SOLID_OBJECT, true);
    }

    fn on_hit_wall(&mut self, base: &mut ActorBase, _level: &mut LevelHandler, _time_mult: f32) {
        base.speed.x = 0.0;
    }

    fn on_handle_collision(
        &mut self,
        base: &mut ActorBase,
        level: &mut LevelHandler,
        other: &mut Actor,
    ) -> bool {
        if base.is_perished() {
            return false;
        }
        let Actor {
            base: other_base,
            kind,
        } = other;

        match kind {
            ActorKind::Spring(spring) => {
                if self.spring_cooldown <= 0.0 && base.aabb_inner.overlaps(&other_base.aabb_inner) {
                    let force = spring.activate(other_base, level);
                    let (keep_x, keep_y) = (spring.params.keep_speed_x, spring.params.keep_speed_y);
                    if force != Vec2::ZERO {
                        self.on_hit_spring(base, level, other_base.pos, force, keep_x, keep_y);
                    }
                }
                true
            }
            ActorKind::TurtleShell(_) if self.special_move != SpecialMove::None => {
                other_base.decrease_health(i32::MAX, Some(base.handle));
                if self.special_move == SpecialMove::Buttstomp {
                    base.speed.y *= -0.6;
                    base.set_state(ActorState::CAN_JUMP, true);
                }
                true
            }
            _ => {
                let Some(enemy) = kind.enemy() else {
                    return false;
                };
                if self.is_damaging_move() {
                    if !other_base.is_invulnerable() {
                        other_base.decrease_health(SPECIAL_MOVE_DAMAGE, Some(base.handle));
                        explosion::create(level, base.pos.trunc(), ExplosionType::Small);
                    }
                    if self.special_move == SpecialMove::Buttstomp {
                        base.speed.y *= -0.6;
                        base.set_state(ActorState::CAN_JUMP, true);
                    }
                    true
                } else if enemy.can_hurt_player && other_base.frozen_time_left <= 0.0 {
                    let push = 4.0 * (base.pos.x - other_base.pos.x).signum();
                    self.take_damage(base, level, 1, push);
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Dying plays out as an animation; the respawn happens afterwards.
    fn on_perish(
        &mut self,
        base: &mut ActorBase,
        level: &mut LevelHandler,
        _collider: Option<ActorHandle>,
    ) -> bool {
        if base.transition_name() == Some("TransitionDeath") {
            return false;
        }
        base.set_state(ActorState::IS_INVULNERABLE, true);
        base.force_cancel_transition();
        base.speed = Vec2::ZERO;
        base.external_force = Vec2::ZERO;
        base.internal_force_y = 0.0;
        base.set_state(ActorState::APPLY_GRAVITATION, false);
        self.special_move = SpecialMove::None;

        level.play_sfx("Die", base.pos);
        base.set_transition("TransitionDeath", false, AfterTransition::PlayerRespawn);
        false
    }

    fn on_transition_finished(
        &mut self,
        base: &mut ActorBase,
        level: &mut LevelHandler,
        action: AfterTransition,
    ) {
        match action {
            AfterTransition::PlayerButtstomp if self.special_move == SpecialMove::Buttstomp => {
                base.speed.y = 9.0;
                base.set_state(ActorState::APPLY_GRAVITATION, true);
                base.set_animation("Buttstomp");
                level.play_sfx("Buttstomp", base.pos);
            }
            AfterTransition::PlayerRespawn => self.respawn(base, level),
            _ => {}
        }
    }

    fn on_tile_deactivated(&mut self, _base: &mut ActorBase, _level: &mut LevelHandler) -> bool {
        false
    }
}
