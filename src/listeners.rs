//! Accounting for host listener handles.
//!
//! Every mounted component registers the scroll, resize and frame listeners
//! it needs and must release all of them on unmount.  A handle that outlives
//! its section keeps consuming frame budget and writes to detached nodes, so
//! the registry is the single place where leaks become visible.

use crate::event::ListenerKind;
use log::{debug, warn};
use std::collections::BTreeMap;

/// Opaque handle of one registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

#[derive(Debug, Clone)]
struct Entry {
    kind: ListenerKind,
    owner: String,
}

/// All listeners currently registered with the host.
#[derive(Debug, Default)]
pub struct ListenerRegistry {
    next_id: u64,
    active: BTreeMap<ListenerId, Entry>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, kind: ListenerKind, owner: &str) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        debug!("{} listener {:?} registered by {}", kind, id, owner);
        self.active.insert(
            id,
            Entry {
                kind,
                owner: owner.to_string(),
            },
        );
        id
    }

    /// Release one handle.  Returns `false` if it was already released.
    pub fn release(&mut self, id: ListenerId) -> bool {
        match self.active.remove(&id) {
            Some(entry) => {
                debug!("{} listener {:?} released by {}", entry.kind, id, entry.owner);
                true
            }
            None => {
                warn!("listener {:?} released twice", id);
                false
            }
        }
    }

    /// Number of live handles.
    pub fn active(&self) -> usize {
        self.active.len()
    }

    pub fn active_of(&self, kind: ListenerKind) -> usize {
        self.active.values().filter(|e| e.kind == kind).count()
    }

    pub fn owned_by(&self, owner: &str) -> usize {
        self.active.values().filter(|e| e.owner == owner).count()
    }
}

/// The handles one component holds.
#[derive(Debug, Default)]
pub struct Subscriptions {
    ids: Vec<ListenerId>,
}

impl Subscriptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one listener of each kind in `kinds` for `owner`.
    pub fn subscribe(
        registry: &mut ListenerRegistry,
        owner: &str,
        kinds: &[ListenerKind],
    ) -> Self {
        Self {
            ids: kinds.iter().map(|&k| registry.register(k, owner)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Release every handle; calling this twice is a no-op.
    pub fn release_all(&mut self, registry: &mut ListenerRegistry) {
        for id in self.ids.drain(..) {
            registry.release(id);
        }
    }
}
