use super::CollectibleBase;
use crate::actors::{Activation, Actor, ActorActivationDetails, ActorBase, ActorBehavior};
use crate::level_handler::LevelHandler;
use crate::tiles::TileCollisionParams;

/// Food kinds in level-data order. Each has its own metadata entry.
pub(crate) const FOOD_NAMES: [&str; 36] = [
    "Apple", "Banana", "Cherry", "Orange", "Pear", "Pretzel", "Strawberry", "Lemon", "Lime",
    "Thing", "WaterMelon", "Peach", "Grapes", "Lettuce", "Eggplant", "Cucumber", "Pepsi", "Coke",
    "Milk", "Pie", "Cake", "Donut", "Cupcake", "Chips", "Candy", "Chocolate", "IceCream", "Burger",
    "Pizza", "Fries", "ChickenLeg", "Sandwich", "Taco", "HotDog", "Ham", "Cheese",
];

const DRINKS: [&str; 3] = ["Pepsi", "Coke", "Milk"];

/// Metadata path for a food type byte, if the byte names a known food.
pub fn food_metadata_path(food_type: u8) -> Option<String> {
    FOOD_NAMES
        .get(food_type as usize)
        .map(|name| format!("Collectible/Food{name}"))
}

#[derive(Debug)]
pub struct Food {
    pub collectible: CollectibleBase,
    food_type: u8,
}

impl Food {
    pub fn new(food_type: u8) -> Self {
        Self {
            collectible: CollectibleBase::new(50),
            food_type,
        }
    }

    pub fn food_type(&self) -> u8 {
        self.food_type
    }

    pub fn is_drinkable(&self) -> bool {
        FOOD_NAMES
            .get(self.food_type as usize)
            .is_some_and(|name| DRINKS.contains(name))
    }

    fn on_collect(&mut self, base: &mut ActorBase, level: &mut LevelHandler, player: &mut Actor) {
        let drinkable = self.is_drinkable();
        if let Some(p) = player.kind.as_player_mut() {
            p.consume_food(&mut player.base, level, drinkable);
        }
        self.collectible.collect(base, level, player);
    }
}

impl ActorBehavior for Food {
    fn on_activated(
        &mut self,
        base: &mut ActorBase,
        _level: &mut LevelHandler,
        details: &ActorActivationDetails,
    ) -> Activation {
        self.collectible.activate(base, details);
        match food_metadata_path(self.food_type) {
            Some(path) => Activation::Await(path),
            None => {
                log::warn!("Unknown food type {}", self.food_type);
                Activation::Discard
            }
        }
    }

    fn on_metadata_loaded(&mut self, base: &mut ActorBase, _level: &mut LevelHandler) -> Activation {
        base.set_animation("Default");
        self.collectible.set_facing_direction(base);
        Activation::Commit
    }

    fn on_update(&mut self, base: &mut ActorBase, level: &mut LevelHandler, time_mult: f32) {
        if !self.collectible.untouched {
            let mut params = TileCollisionParams::downwards(base.speed.y >= 0.0);
            self.move_standard(base, level, time_mult, &mut params);
        }
        self.collectible.update(base, level, time_mult);
        self.on_update_hitbox(base);
    }

    fn on_update_hitbox(&mut self, base: &mut ActorBase) {
        base.update_hitbox(16.0, 16.0);
    }

    fn on_handle_collision(
        &mut self,
        base: &mut ActorBase,
        level: &mut LevelHandler,
        other: &mut Actor,
    ) -> bool {
        if self.collectible.touched_by(base, level, other) {
            self.on_collect(base, level, other);
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actors::player::Player;
    use crate::actors::test_support::{spawn, test_level};
    use crate::actors::ActorKind;
    use crate::config::PlayerType;
    use glam::Vec2;

    #[test]
    fn test_drinks_are_flagged() {
        assert!(Food::new(16).is_drinkable());
        assert!(Food::new(18).is_drinkable());
        assert!(!Food::new(19).is_drinkable());
        assert_eq!(food_metadata_path(10).as_deref(), Some("Collectible/FoodWaterMelon"));
        assert!(food_metadata_path(200).is_none());
    }

    #[test]
    fn test_unknown_food_is_discarded() {
        let mut level = test_level(8, 8);
        let before = level.actor_count();
        let spawned = level.spawn_actor(
            ActorKind::Food(Food::new(99)),
            ActorActivationDetails::new(Vec2::new(40.0, 40.0)),
        );
        assert!(spawned.is_none());
        assert_eq!(level.actor_count(), before);
    }

    #[test]
    fn test_player_eats_food() {
        let mut level = test_level(12, 8);
        let food = spawn(&mut level, ActorKind::Food(Food::new(17)), Vec2::new(64.0, 64.0));
        let player = spawn(
            &mut level,
            ActorKind::Player(Player::new(PlayerType::Spaz, 0)),
            Vec2::new(300.0, 64.0),
        );

        let mut food_actor = level.take_actor(food).expect("food");
        let mut player_actor = level.take_actor(player).expect("player");
        assert!(food_actor.handle_collision(&mut level, &mut player_actor));
        assert!(food_actor.is_destroyed());
        let p = player_actor.kind.as_player().expect("player");
        assert_eq!(p.food_eaten(), 1);
        assert_eq!(p.score(), 50);
        level.return_actor(food, food_actor);
        level.return_actor(player, player_actor);
        assert!(level.sounds().iter().any(|s| s.name == "PickupDrink"));
    }
}
