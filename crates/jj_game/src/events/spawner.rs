//! Maps event types to actor constructors.
//!
//! Each registered event has a `create` function building the actor kind from
//! its parameter blob and a `preload` function naming the metadata the kind
//! will ask for, so a level can warm the content cache before play starts.

use std::collections::HashMap;

use super::event_type::EventType;
use super::params::{GemRingParams, SpawnParams, SpringParams, TurtleShellParams};
use crate::actors::bosses::turtle_boss::TurtleBoss;
use crate::actors::collectibles::food::{food_metadata_path, Food};
use crate::actors::collectibles::gem::Gem;
use crate::actors::collectibles::gem_ring::GemRing;
use crate::actors::enemies::caterpillar::Caterpillar;
use crate::actors::enemies::crab::Crab;
use crate::actors::enemies::dragon::Dragon;
use crate::actors::enemies::lab_rat::LabRat;
use crate::actors::enemies::turtle::Turtle;
use crate::actors::enemies::turtle_shell::TurtleShell;
use crate::actors::environment::spring::Spring;
use crate::actors::ActorKind;

pub type CreateFn = fn(&SpawnParams) -> Option<ActorKind>;
pub type PreloadFn = fn(&SpawnParams) -> Vec<String>;

const COMMON_ENEMY_METADATA: [&str; 3] = ["Common/Explosions", "Collectible/Gems", "Collectible/FoodApple"];

#[derive(Debug, Clone, Copy)]
struct SpawnerEntry {
    create: CreateFn,
    preload: PreloadFn,
}

#[derive(Debug, Clone, Default)]
pub struct EventSpawner {
    entries: HashMap<EventType, SpawnerEntry>,
}

impl EventSpawner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawner with every actor kind that level data can place.
    pub fn with_default_actors() -> Self {
        let mut spawner = Self::new();
        spawner.register(EventType::ENEMY_CRAB, |_| Some(ActorKind::Crab(Crab::new())), |_| {
            enemy_paths("Enemy/Crab")
        });
        spawner.register(
            EventType::ENEMY_TURTLE,
            |_| Some(ActorKind::Turtle(Turtle::new())),
            |p| {
                let mut paths = enemy_paths(if p[0] == 1 { "Enemy/TurtleXmas" } else { "Enemy/Turtle" });
                paths.push(shell_path(p[0]).to_string());
                paths
            },
        );
        spawner.register(
            EventType::TURTLE_SHELL,
            |_| Some(ActorKind::TurtleShell(TurtleShell::new())),
            |p| enemy_paths(shell_path(TurtleShellParams::decode(p).theme)),
        );
        spawner.register(EventType::ENEMY_LAB_RAT, |_| Some(ActorKind::LabRat(LabRat::new())), |_| {
            enemy_paths("Enemy/LabRat")
        });
        spawner.register(EventType::ENEMY_DRAGON, |_| Some(ActorKind::Dragon(Dragon::new())), |_| {
            let mut paths = enemy_paths("Enemy/Dragon");
            paths.push("Weapon/Toaster".to_string());
            paths
        });
        spawner.register(
            EventType::ENEMY_CATERPILLAR,
            |_| Some(ActorKind::Caterpillar(Caterpillar::new())),
            |_| enemy_paths("Enemy/Caterpillar"),
        );
        spawner.register(
            EventType::BOSS_TURTLE_TOUGH,
            |_| Some(ActorKind::TurtleBoss(TurtleBoss::new())),
            |_| {
                let mut paths = enemy_paths("Boss/TurtleBoss");
                paths.push(shell_path(2).to_string());
                paths
            },
        );
        spawner.register(EventType::GEM, |p| Some(ActorKind::Gem(Gem::new(p[0]))), |_| {
            vec!["Collectible/Gems".to_string(), "Common/Explosions".to_string()]
        });
        spawner.register(EventType::GEM_GIANT, |_| Some(ActorKind::Gem(Gem::giant())), |_| {
            vec!["Collectible/Gems".to_string(), "Common/Explosions".to_string()]
        });
        spawner.register(
            EventType::GEM_RING,
            |p| Some(ActorKind::GemRing(GemRing::new(GemRingParams::decode(p)))),
            |_| vec!["Collectible/Gems".to_string()],
        );
        spawner.register(
            EventType::FOOD,
            |p| Some(ActorKind::Food(Food::new(p[0]))),
            |p| food_metadata_path(p[0]).into_iter().collect(),
        );
        spawner.register(
            EventType::SPRING,
            |p| Some(ActorKind::Spring(Spring::new(SpringParams::decode(p)))),
            |_| vec!["Object/Spring".to_string()],
        );
        spawner
    }

    /// Register or replace the constructor for `event`.
    pub fn register(&mut self, event: EventType, create: CreateFn, preload: PreloadFn) {
        if self.entries.insert(event, SpawnerEntry { create, preload }).is_some() {
            log::debug!("Replaced spawner for event {event}");
        }
    }

    pub fn is_registered(&self, event: EventType) -> bool {
        self.entries.contains_key(&event)
    }

    /// Build the actor kind for `event`; `None` if nothing spawns for it.
    pub fn create(&self, event: EventType, params: &SpawnParams) -> Option<ActorKind> {
        let entry = self.entries.get(&event)?;
        (entry.create)(params)
    }

    /// Metadata paths the actor for `event` will request.
    pub fn preload_paths(&self, event: EventType, params: &SpawnParams) -> Vec<String> {
        self.entries
            .get(&event)
            .map(|entry| (entry.preload)(params))
            .unwrap_or_default()
    }
}

fn enemy_paths(own: &str) -> Vec<String> {
    std::iter::once(own)
        .chain(COMMON_ENEMY_METADATA)
        .map(str::to_string)
        .collect()
}

fn shell_path(theme: u8) -> &'static str {
    match theme {
        1 => "Enemy/TurtleShellXmas",
        2 => "Boss/TurtleBossShell",
        _ => "Enemy/TurtleShell",
    }
}
