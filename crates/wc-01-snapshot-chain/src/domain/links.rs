//! Successor lookup table.
//!
//! Layers own their predecessor (`previous` is an `Arc`). The forward
//! direction is kept here instead, as `id → successor id`, plus a table of
//! non-owning handles used to resolve an id back to a live layer. A layer
//! removes itself from both tables when it is dropped, so a forward walk can
//! only ever reach layers somebody still holds.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use super::Snapshot;

/// Identity of a snapshot layer, unique within a chain.
pub type SnapshotId = u64;

#[derive(Default)]
struct LinkState {
    live: HashMap<SnapshotId, Weak<Snapshot>>,
    successor: HashMap<SnapshotId, SnapshotId>,
}

/// Shared by every layer of one snapshot chain.
#[derive(Default)]
pub struct SuccessorTable {
    state: Mutex<LinkState>,
    next_id: AtomicU64,
}

impl SuccessorTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn allocate_id(&self) -> SnapshotId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    pub(crate) fn register(&self, snapshot: &Arc<Snapshot>) {
        self.state
            .lock()
            .live
            .insert(snapshot.id(), Arc::downgrade(snapshot));
    }

    pub(crate) fn link(&self, previous: SnapshotId, next: SnapshotId) {
        self.state.lock().successor.insert(previous, next);
    }

    /// Whether `id` currently has a live successor.
    pub fn has_successor(&self, id: SnapshotId) -> bool {
        self.state.lock().successor.contains_key(&id)
    }

    /// Resolve the successor of `id`, if it is still held by someone.
    pub fn successor(&self, id: SnapshotId) -> Option<Arc<Snapshot>> {
        let state = self.state.lock();
        let next = state.successor.get(&id)?;
        state.live.get(next)?.upgrade()
    }

    /// Number of layers that are still alive.
    pub fn live_count(&self) -> usize {
        self.state.lock().live.len()
    }

    /// Forget a dropped layer: its own entry, its forward link, and the
    /// forward link pointing at it.
    pub(crate) fn prune(&self, id: SnapshotId) {
        let mut state = self.state.lock();
        state.live.remove(&id);
        state.successor.remove(&id);
        state.successor.retain(|_, next| *next != id);
    }
}
