use std::collections::{HashMap, HashSet, VecDeque};
use std::net::SocketAddr;

use shared_types::BlockId;
use wc_04_message_codec::BlockMessage;

/// A block that arrived before its parent.
#[derive(Clone, Debug)]
pub struct Orphan {
    pub block: BlockMessage,
    /// Peer it came from, blamed if it later turns out invalid.
    pub source: Option<SocketAddr>,
}

/// Unlinked blocks keyed by the parent they wait for.
///
/// Bounded; the oldest orphan is dropped first.
pub struct OrphanPool {
    by_parent: HashMap<BlockId, Vec<Orphan>>,
    ids: HashSet<BlockId>,
    order: VecDeque<(BlockId, BlockId)>,
    limit: usize,
}

impl OrphanPool {
    pub fn new(limit: usize) -> Self {
        Self {
            by_parent: HashMap::new(),
            ids: HashSet::new(),
            order: VecDeque::new(),
            limit,
        }
    }

    /// Returns `false` if the block is already held.
    pub fn insert(&mut self, parent: BlockId, orphan: Orphan) -> bool {
        let id = orphan.block.id();
        if self.limit == 0 || !self.ids.insert(id) {
            return false;
        }
        self.by_parent.entry(parent).or_default().push(orphan);
        self.order.push_back((id, parent));
        while self.ids.len() > self.limit && self.evict_oldest() {}
        true
    }

    pub fn contains(&self, id: &BlockId) -> bool {
        self.ids.contains(id)
    }

    /// Remove and return every orphan waiting on `parent`.
    pub fn take_children(&mut self, parent: &BlockId) -> Vec<Orphan> {
        let children = self.by_parent.remove(parent).unwrap_or_default();
        if !children.is_empty() {
            for child in &children {
                self.ids.remove(&child.block.id());
            }
            let ids = &self.ids;
            self.order.retain(|(id, _)| ids.contains(id));
        }
        children
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Returns `false` once nothing is left to evict.
    fn evict_oldest(&mut self) -> bool {
        let Some((id, parent)) = self.order.pop_front() else {
            return false;
        };
        self.ids.remove(&id);
        if let Some(siblings) = self.by_parent.get_mut(&parent) {
            siblings.retain(|orphan| orphan.block.id() != id);
            if siblings.is_empty() {
                self.by_parent.remove(&parent);
            }
        }
        true
    }
}
