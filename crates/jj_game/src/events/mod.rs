pub mod event_map;
pub mod event_type;
pub mod params;
pub mod spawner;

pub use event_map::{EventAction, EventMap};
pub use event_type::EventType;
pub use spawner::EventSpawner;
