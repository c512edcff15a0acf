//! # Snapshot Chain Service
//!
//! Owns the chain of layers, the shared successor table, the root store and
//! the checkpoint store used to make flushes crash-safe.
//!
//! ## Flush Protocol
//!
//! 1. Merge every layer older than the newest `keep` into one batch
//!    (oldest first, so newer writes win).
//! 2. Write the batch to the checkpoint store.
//! 3. Apply the batch to the root store.
//! 4. Clear the checkpoint and re-parent the oldest kept layer onto the root.
//!
//! A crash between 2 and 4 leaves a complete checkpoint, which
//! [`SnapshotChain::recover`] replays on the next open.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::adapters::MemoryStore;
use crate::domain::{
    Parent, Snapshot, SnapshotConfig, SnapshotError, Store, SuccessorTable, Value,
};
use crate::ports::{OrderedStore, StorageManager, WriteBatch};

const CHECKPOINT_PUT: u8 = 1;
const CHECKPOINT_DELETE: u8 = 0;

/// Snapshot chain over an ordered root store.
///
/// `current` is swapped under a write lock, so a reader observes either the
/// old or the new tip, never a half-built layer.
pub struct SnapshotChain {
    config: SnapshotConfig,
    root: Arc<dyn OrderedStore>,
    checkpoint: Arc<dyn OrderedStore>,
    links: Arc<SuccessorTable>,
    current: RwLock<Arc<Snapshot>>,
    /// Serializes flush and recovery against each other.
    flush_lock: Mutex<()>,
}

impl SnapshotChain {
    /// Open a chain over existing stores, replaying any interrupted flush.
    pub fn open(
        config: SnapshotConfig,
        root: Arc<dyn OrderedStore>,
        checkpoint: Arc<dyn OrderedStore>,
    ) -> Result<Self, SnapshotError> {
        let links = Arc::new(SuccessorTable::new());
        let base = Snapshot::new(Parent::Root(Arc::clone(&root)), Arc::clone(&links));
        let chain = Self {
            config,
            root,
            checkpoint,
            links,
            current: RwLock::new(base),
            flush_lock: Mutex::new(()),
        };
        let replayed = chain.recover()?;
        if replayed > 0 {
            warn!(entries = replayed, "Replayed interrupted snapshot flush");
        }
        Ok(chain)
    }

    pub fn new_in_memory(config: SnapshotConfig) -> Self {
        let links = Arc::new(SuccessorTable::new());
        let root: Arc<dyn OrderedStore> = Arc::new(MemoryStore::new());
        let base = Snapshot::new(Parent::Root(Arc::clone(&root)), Arc::clone(&links));
        Self {
            config,
            root,
            checkpoint: Arc::new(MemoryStore::new()),
            links,
            current: RwLock::new(base),
            flush_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &SnapshotConfig {
        &self.config
    }

    pub fn root(&self) -> &Arc<dyn OrderedStore> {
        &self.root
    }

    pub fn links(&self) -> &Arc<SuccessorTable> {
        &self.links
    }

    /// Current write target.
    pub fn current(&self) -> Arc<Snapshot> {
        Arc::clone(&self.current.read())
    }

    /// Start a new speculative layer on top of the current one.
    pub fn advance(&self) -> Result<Arc<Snapshot>, SnapshotError> {
        let mut current = self.current.write();
        let next = current.advance()?;
        *current = Arc::clone(&next);
        debug!(snapshot = next.id(), "Advanced snapshot chain");
        Ok(next)
    }

    /// Discard the current layer and make its predecessor current again.
    pub fn retreat(&self) -> Result<(), SnapshotError> {
        let discarded = {
            let mut current = self.current.write();
            let previous = current.get_previous().ok_or(SnapshotError::AtRoot)?;
            std::mem::replace(&mut *current, previous)
        };
        debug!(
            snapshot = discarded.id(),
            entries = discarded.delta_len(),
            "Discarded snapshot layer"
        );
        Ok(())
    }

    /// Number of in-memory layers between the current snapshot and the root.
    pub fn depth(&self) -> usize {
        let mut depth = 1;
        let mut layer = self.current();
        while let Some(previous) = layer.get_previous() {
            depth += 1;
            layer = previous;
        }
        depth
    }

    /// Merge all but the newest `keep` layers into the root store.
    ///
    /// Returns the number of layers merged.
    pub fn flush(&self, keep: usize) -> Result<usize, SnapshotError> {
        let keep = keep.max(1);
        let _flush = self.flush_lock.lock();
        self.replay_checkpoint()?;

        let current = self.current.read();
        let mut layers = vec![Arc::clone(&*current)];
        while let Some(previous) = layers[layers.len() - 1].get_previous() {
            layers.push(previous);
        }
        if layers.len() <= keep {
            return Ok(0);
        }

        let merged_layers = &layers[keep..];
        let mut merged: BTreeMap<Vec<u8>, Value> = BTreeMap::new();
        for layer in merged_layers.iter().rev() {
            for ((store, key), value) in layer.entries() {
                merged.insert(store.physical_key(&key), value);
            }
        }

        let mut checkpoint = WriteBatch::new();
        let mut batch = WriteBatch::new();
        for (key, value) in merged {
            match value {
                Value::Put(bytes) => {
                    let mut encoded = Vec::with_capacity(bytes.len() + 1);
                    encoded.push(CHECKPOINT_PUT);
                    encoded.extend_from_slice(&bytes);
                    checkpoint.put(key.clone(), encoded);
                    batch.put(key, bytes);
                }
                Value::Deleted => {
                    checkpoint.put(key.clone(), vec![CHECKPOINT_DELETE]);
                    batch.delete(key);
                }
            }
        }
        let entries = batch.len();

        self.checkpoint.write_batch(checkpoint)?;
        self.root.write_batch(batch)?;
        self.clear_checkpoint()?;

        let released = layers[keep - 1].set_previous(Parent::Root(Arc::clone(&self.root)));
        let merged_count = merged_layers.len();
        drop(current);
        drop(layers);
        drop(released);

        info!(
            layers = merged_count,
            entries,
            "Flushed snapshot layers to root store"
        );
        Ok(merged_count)
    }

    /// Flush down to `max_depth` layers once the chain grows past it.
    pub fn flush_if_needed(&self) -> Result<usize, SnapshotError> {
        if self.depth() > self.config.max_depth {
            self.flush(self.config.max_depth)
        } else {
            Ok(0)
        }
    }

    /// Replay a checkpoint left by an interrupted flush.
    ///
    /// Returns the number of entries applied to the root store.
    pub fn recover(&self) -> Result<usize, SnapshotError> {
        let _flush = self.flush_lock.lock();
        self.replay_checkpoint()
    }

    fn replay_checkpoint(&self) -> Result<usize, SnapshotError> {
        let pending = self.checkpoint.scan()?;
        if pending.is_empty() {
            return Ok(0);
        }
        let mut batch = WriteBatch::new();
        for (key, encoded) in pending {
            match encoded.split_first() {
                Some((&CHECKPOINT_PUT, value)) => batch.put(key, value.to_vec()),
                Some((&CHECKPOINT_DELETE, [])) => batch.delete(key),
                _ => {
                    return Err(SnapshotError::Corrupt {
                        what: "checkpoint entry",
                        reason: format!("unexpected encoding of length {}", encoded.len()),
                    })
                }
            }
        }
        let entries = batch.len();
        self.root.write_batch(batch)?;
        self.clear_checkpoint()?;
        Ok(entries)
    }

    fn clear_checkpoint(&self) -> Result<(), SnapshotError> {
        let mut clear = WriteBatch::new();
        for (key, _) in self.checkpoint.scan()? {
            clear.delete(key);
        }
        if !clear.is_empty() {
            self.checkpoint.write_batch(clear)?;
        }
        Ok(())
    }
}

impl StorageManager for SnapshotChain {
    fn get(&self, store: Store, key: &[u8]) -> Result<Option<Vec<u8>>, SnapshotError> {
        self.current().get(store, key)
    }

    fn put(&self, store: Store, key: &[u8], value: Vec<u8>) -> Result<(), SnapshotError> {
        self.current().put(store, key, value)
    }

    fn delete(&self, store: Store, key: &[u8]) -> Result<(), SnapshotError> {
        self.current().delete(store, key)
    }
}
