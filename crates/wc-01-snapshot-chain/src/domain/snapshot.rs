use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use super::{SnapshotError, SnapshotId, Store, SuccessorTable, Value};
use crate::ports::{OrderedStore, StorageManager};

/// What a layer reads through to once its own delta misses.
#[derive(Clone)]
pub enum Parent {
    Root(Arc<dyn OrderedStore>),
    Layer(Arc<Snapshot>),
}

type Delta = BTreeMap<(Store, Vec<u8>), Value>;

/// One copy-on-write layer.
///
/// A snapshot owns its delta and holds its predecessor strongly. It accepts
/// writes only while it is the tip of its chain; once `advance` has produced
/// a live successor, writes fail with [`SnapshotError::Frozen`].
pub struct Snapshot {
    id: SnapshotId,
    previous: RwLock<Parent>,
    delta: RwLock<Delta>,
    links: Arc<SuccessorTable>,
}

impl Snapshot {
    pub(crate) fn new(previous: Parent, links: Arc<SuccessorTable>) -> Arc<Self> {
        let snapshot = Arc::new(Self {
            id: links.allocate_id(),
            previous: RwLock::new(previous),
            delta: RwLock::new(BTreeMap::new()),
            links,
        });
        snapshot.links.register(&snapshot);
        snapshot
    }

    pub fn id(&self) -> SnapshotId {
        self.id
    }

    /// Create the next layer on top of this one.
    ///
    /// Only the tip may be advanced; a second successor would fork the chain.
    pub fn advance(self: &Arc<Self>) -> Result<Arc<Snapshot>, SnapshotError> {
        if self.links.has_successor(self.id) {
            return Err(SnapshotError::Frozen { id: self.id });
        }
        let next = Snapshot::new(Parent::Layer(Arc::clone(self)), Arc::clone(&self.links));
        self.links.link(self.id, next.id);
        Ok(next)
    }

    /// Successor of this layer, or `None` once nobody holds it any more.
    pub fn get_next(&self) -> Option<Arc<Snapshot>> {
        self.links.successor(self.id)
    }

    /// Predecessor layer, `None` when this layer sits directly on the root store.
    pub fn get_previous(&self) -> Option<Arc<Snapshot>> {
        match &*self.previous.read() {
            Parent::Layer(layer) => Some(Arc::clone(layer)),
            Parent::Root(_) => None,
        }
    }

    pub fn is_frozen(&self) -> bool {
        self.links.has_successor(self.id)
    }

    /// Entries written in this layer alone, tombstones included.
    pub fn entries(&self) -> Vec<((Store, Vec<u8>), Value)> {
        self.delta
            .read()
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    pub fn delta_len(&self) -> usize {
        self.delta.read().len()
    }

    /// Swap the predecessor and hand the old one back, so the caller decides
    /// where the released layers are dropped.
    pub(crate) fn set_previous(&self, previous: Parent) -> Parent {
        std::mem::replace(&mut *self.previous.write(), previous)
    }

    fn local(&self, store: Store, key: &[u8]) -> Option<Value> {
        self.delta.read().get(&(store, key.to_vec())).cloned()
    }

    fn write(&self, store: Store, key: &[u8], value: Value) -> Result<(), SnapshotError> {
        if self.is_frozen() {
            return Err(SnapshotError::Frozen { id: self.id });
        }
        self.delta.write().insert((store, key.to_vec()), value);
        Ok(())
    }
}

impl StorageManager for Snapshot {
    fn get(&self, store: Store, key: &[u8]) -> Result<Option<Vec<u8>>, SnapshotError> {
        if let Some(value) = self.local(store, key) {
            return Ok(value.into_option());
        }
        let mut parent = self.previous.read().clone();
        loop {
            match parent {
                Parent::Root(root) => return root.get(&store.physical_key(key)),
                Parent::Layer(layer) => {
                    if let Some(value) = layer.local(store, key) {
                        return Ok(value.into_option());
                    }
                    parent = layer.previous.read().clone();
                }
            }
        }
    }

    fn put(&self, store: Store, key: &[u8], value: Vec<u8>) -> Result<(), SnapshotError> {
        self.write(store, key, Value::Put(value))
    }

    fn delete(&self, store: Store, key: &[u8]) -> Result<(), SnapshotError> {
        self.write(store, key, Value::Deleted)
    }
}

impl Drop for Snapshot {
    fn drop(&mut self) {
        self.links.prune(self.id);
    }
}

impl fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Snapshot")
            .field("id", &self.id)
            .field("entries", &self.delta_len())
            .field("frozen", &self.is_frozen())
            .finish()
    }
}
