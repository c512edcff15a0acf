use std::collections::{HashMap, HashSet, VecDeque};
use std::net::SocketAddr;

use super::Item;

#[derive(Default)]
struct KnownSet {
    items: HashSet<Item>,
    order: VecDeque<Item>,
}

/// Items each connected peer has announced, sent or been told about.
///
/// Nothing is announced to a peer that already knows it. Each set is
/// bounded; forgetting an old item only costs a redundant announcement.
pub struct PeerInventory {
    peers: HashMap<SocketAddr, KnownSet>,
    per_peer_limit: usize,
}

impl PeerInventory {
    pub fn new(per_peer_limit: usize) -> Self {
        Self {
            peers: HashMap::new(),
            per_peer_limit,
        }
    }

    pub fn add_peer(&mut self, peer: SocketAddr) {
        self.peers.entry(peer).or_default();
    }

    pub fn remove_peer(&mut self, peer: &SocketAddr) {
        self.peers.remove(peer);
    }

    pub fn mark(&mut self, peer: SocketAddr, item: Item) {
        if self.per_peer_limit == 0 {
            return;
        }
        let known = self.peers.entry(peer).or_default();
        if !known.items.insert(item) {
            return;
        }
        known.order.push_back(item);
        while known.order.len() > self.per_peer_limit {
            if let Some(oldest) = known.order.pop_front() {
                known.items.remove(&oldest);
            }
        }
    }

    pub fn knows(&self, peer: &SocketAddr, item: &Item) -> bool {
        self.peers
            .get(peer)
            .is_some_and(|known| known.items.contains(item))
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }
}
