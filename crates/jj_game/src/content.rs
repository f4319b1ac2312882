//! Animation metadata cache with deferred loading.
//!
//! A resolver knows which metadata entries exist (the registry shipped with the
//! level) and which of them are already loaded. Requesting something that is
//! not loaded yet hands out a [`MetadataTicket`]; queued loads complete the next
//! time [`ContentResolver::process_loads`] runs, once per frame. Dropping a
//! ticket before that cancels its load.

use jj_core::animation::{load_metadata_registry, Metadata};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::rc::Rc;

#[derive(Debug, Default)]
struct LoadQueue {
    next_id: u64,
    pending: BTreeMap<u64, String>,
}

impl LoadQueue {
    fn push(&mut self, path: &str) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.pending.insert(id, path.to_string());
        id
    }
}

/// Handle to a queued metadata load.
#[derive(Debug)]
pub struct MetadataTicket {
    id: u64,
    path: String,
    queue: Rc<RefCell<LoadQueue>>,
}

impl MetadataTicket {
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl Drop for MetadataTicket {
    fn drop(&mut self) {
        if self.queue.borrow_mut().pending.remove(&self.id).is_some() {
            log::debug!("Cancelled pending metadata load \"{}\"", self.path);
        }
    }
}

#[derive(Debug)]
pub enum MetadataRequest {
    Ready(Rc<Metadata>),
    Pending(MetadataTicket),
    Missing,
}

#[derive(Debug, Default)]
pub struct ContentResolver {
    available: HashMap<String, Metadata>,
    cache: HashMap<String, Rc<Metadata>>,
    queue: Rc<RefCell<LoadQueue>>,
}

impl ContentResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_registry(entries: Vec<Metadata>) -> Self {
        let mut resolver = Self::new();
        for entry in entries {
            resolver.register(entry);
        }
        resolver
    }

    pub fn load_registry(path: &Path) -> Result<Self, String> {
        Ok(Self::from_registry(load_metadata_registry(path)?))
    }

    /// Make `metadata` loadable. Already cached copies are left untouched.
    pub fn register(&mut self, metadata: Metadata) {
        self.available.insert(metadata.path.clone(), metadata);
    }

    pub fn is_loaded(&self, path: &str) -> bool {
        self.cache.contains_key(path)
    }

    pub fn metadata(&self, path: &str) -> Option<Rc<Metadata>> {
        self.cache.get(path).cloned()
    }

    pub fn pending_count(&self) -> usize {
        self.queue.borrow().pending.len()
    }

    pub fn request_metadata(&mut self, path: &str) -> MetadataRequest {
        if let Some(metadata) = self.cache.get(path) {
            return MetadataRequest::Ready(Rc::clone(metadata));
        }
        if !self.available.contains_key(path) {
            log::warn!("Metadata \"{path}\" not found");
            return MetadataRequest::Missing;
        }
        let id = self.queue.borrow_mut().push(path);
        MetadataRequest::Pending(MetadataTicket {
            id,
            path: path.to_string(),
            queue: Rc::clone(&self.queue),
        })
    }

    /// Queue a load nobody waits for, so later requests hit the cache.
    pub fn preload_metadata(&mut self, path: &str) {
        if self.cache.contains_key(path) {
            return;
        }
        if !self.available.contains_key(path) {
            log::warn!("Cannot preload missing metadata \"{path}\"");
            return;
        }
        let already_queued = self.queue.borrow().pending.values().any(|p| p == path);
        if !already_queued {
            self.queue.borrow_mut().push(path);
        }
    }

    /// Ready once the load completed; a cancelled or unknown load is missing.
    pub fn poll(&self, ticket: &MetadataTicket) -> Option<Rc<Metadata>> {
        if self.queue.borrow().pending.contains_key(&ticket.id) {
            return None;
        }
        self.cache.get(&ticket.path).cloned()
    }

    /// Complete every queued load. Returns how many entries were loaded.
    pub fn process_loads(&mut self) -> usize {
        let pending = std::mem::take(&mut self.queue.borrow_mut().pending);
        let mut loaded = 0;
        for path in pending.into_values() {
            if self.cache.contains_key(&path) {
                continue;
            }
            if let Some(metadata) = self.available.get(&path) {
                self.cache.insert(path.clone(), Rc::new(metadata.clone()));
                log::debug!("Loaded metadata \"{path}\"");
                loaded += 1;
            }
        }
        loaded
    }
}
