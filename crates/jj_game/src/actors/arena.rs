//! Generational actor storage.
//!
//! Slots are reused after an actor is removed, so every handle carries the
//! generation it was issued for. A stale handle simply stops resolving.
//!
//! An actor is *checked out* while one of its callbacks runs: the box is moved
//! out of its slot so the callback can hold `&mut Actor` and `&mut LevelHandler`
//! at the same time. Lookups of a checked-out actor return `None`, which is
//! also how queries naturally skip the actor asking.

use super::Actor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActorHandle {
    index: u32,
    generation: u32,
}

impl ActorHandle {
    pub fn index(self) -> u32 {
        self.index
    }
}

#[derive(Debug)]
enum Slot {
    Vacant,
    /// Reserved for an actor still waiting on its metadata.
    Activating,
    Occupied(Box<Actor>),
    CheckedOut,
}

#[derive(Debug)]
struct Entry {
    generation: u32,
    slot: Slot,
}

#[derive(Debug, Default)]
pub struct ActorArena {
    entries: Vec<Entry>,
    free: Vec<u32>,
    /// Committed actors in spawn order.
    order: Vec<ActorHandle>,
}

impl ActorArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a handle for an actor that is about to activate.
    pub fn reserve(&mut self) -> ActorHandle {
        if let Some(index) = self.free.pop() {
            let entry = &mut self.entries[index as usize];
            entry.slot = Slot::Activating;
            return ActorHandle {
                index,
                generation: entry.generation,
            };
        }
        self.entries.push(Entry {
            generation: 0,
            slot: Slot::Activating,
        });
        ActorHandle {
            index: (self.entries.len() - 1) as u32,
            generation: 0,
        }
    }

    /// Drop a reservation whose actor was discarded.
    pub fn release(&mut self, handle: ActorHandle) {
        if let Some(entry) = self.entry_mut(handle) {
            if matches!(entry.slot, Slot::Activating) {
                entry.slot = Slot::Vacant;
                entry.generation = entry.generation.wrapping_add(1);
                self.free.push(handle.index);
            }
        }
    }

    /// Move an activated actor into its reserved slot.
    pub fn commit(&mut self, handle: ActorHandle, actor: Box<Actor>) -> bool {
        let Some(entry) = self.entry_mut(handle) else {
            debug_assert!(false, "commit with stale handle {handle:?}");
            return false;
        };
        if !matches!(entry.slot, Slot::Activating) {
            debug_assert!(false, "commit into a slot that is not reserved");
            return false;
        }
        entry.slot = Slot::Occupied(actor);
        self.order.push(handle);
        true
    }

    pub fn remove(&mut self, handle: ActorHandle) -> Option<Box<Actor>> {
        let entry = self.entry_mut(handle)?;
        if !matches!(entry.slot, Slot::Occupied(_)) {
            return None;
        }
        let Slot::Occupied(actor) = std::mem::replace(&mut entry.slot, Slot::Vacant) else {
            return None;
        };
        entry.generation = entry.generation.wrapping_add(1);
        self.free.push(handle.index);
        self.order.retain(|h| *h != handle);
        Some(actor)
    }

    /// Committed and not removed, including checked-out actors.
    pub fn contains(&self, handle: ActorHandle) -> bool {
        matches!(
            self.entry(handle).map(|e| &e.slot),
            Some(Slot::Occupied(_)) | Some(Slot::CheckedOut)
        )
    }

    pub fn is_activating(&self, handle: ActorHandle) -> bool {
        matches!(self.entry(handle).map(|e| &e.slot), Some(Slot::Activating))
    }

    pub fn get(&self, handle: ActorHandle) -> Option<&Actor> {
        match &self.entry(handle)?.slot {
            Slot::Occupied(actor) => Some(actor),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, handle: ActorHandle) -> Option<&mut Actor> {
        match &mut self.entry_mut(handle)?.slot {
            Slot::Occupied(actor) => Some(actor),
            _ => None,
        }
    }

    pub fn check_out(&mut self, handle: ActorHandle) -> Option<Box<Actor>> {
        let entry = self.entry_mut(handle)?;
        if !matches!(entry.slot, Slot::Occupied(_)) {
            return None;
        }
        match std::mem::replace(&mut entry.slot, Slot::CheckedOut) {
            Slot::Occupied(actor) => Some(actor),
            _ => None,
        }
    }

    pub fn check_in(&mut self, handle: ActorHandle, actor: Box<Actor>) {
        match self.entry_mut(handle) {
            Some(entry) if matches!(entry.slot, Slot::CheckedOut) => {
                entry.slot = Slot::Occupied(actor);
            }
            _ => debug_assert!(false, "check_in without check_out for {handle:?}"),
        }
    }

    /// Committed actors in spawn order.
    pub fn handles(&self) -> &[ActorHandle] {
        &self.order
    }

    pub fn iter(&self) -> impl Iterator<Item = &Actor> {
        self.order.iter().filter_map(|h| self.get(*h))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    fn entry(&self, handle: ActorHandle) -> Option<&Entry> {
        self.entries
            .get(handle.index as usize)
            .filter(|e| e.generation == handle.generation)
    }

    fn entry_mut(&mut self, handle: ActorHandle) -> Option<&mut Entry> {
        self.entries
            .get_mut(handle.index as usize)
            .filter(|e| e.generation == handle.generation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actors::explosion::{Explosion, ExplosionType};
    use crate::actors::ActorKind;

    fn boxed(handle: ActorHandle) -> Box<Actor> {
        Box::new(Actor::new(
            ActorKind::Explosion(Explosion::new(ExplosionType::Tiny)),
            handle,
        ))
    }

    #[test]
    fn test_stale_handle_stops_resolving() {
        let mut arena = ActorArena::new();
        let first = arena.reserve();
        assert!(arena.commit(first, boxed(first)));
        assert!(arena.remove(first).is_some());

        let second = arena.reserve();
        assert_eq!(second.index(), first.index());
        assert!(arena.commit(second, boxed(second)));

        assert!(arena.get(first).is_none());
        assert!(arena.get(second).is_some());
    }

    #[test]
    fn test_checked_out_actor_is_hidden_but_alive() {
        let mut arena = ActorArena::new();
        let h = arena.reserve();
        arena.commit(h, boxed(h));

        let actor = arena.check_out(h).expect("occupied");
        assert!(arena.get(h).is_none());
        assert!(arena.contains(h));
        assert!(arena.check_out(h).is_none());
        arena.check_in(h, actor);
        assert!(arena.get(h).is_some());
    }

    #[test]
    fn test_order_follows_commit_order() {
        let mut arena = ActorArena::new();
        let a = arena.reserve();
        let b = arena.reserve();
        let c = arena.reserve();
        arena.commit(b, boxed(b));
        arena.commit(a, boxed(a));
        arena.release(c);
        assert_eq!(arena.handles(), &[b, a]);
        assert!(!arena.is_activating(c));

        arena.remove(b);
        assert_eq!(arena.handles(), &[a]);
    }
}
