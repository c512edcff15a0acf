use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use parking_lot::RwLock;
use wc_04_message_codec::Message;

use super::PeerHandle;
use crate::domain::ConnectionError;

/// Live connections keyed by remote endpoint.
#[derive(Clone, Default)]
pub struct PeerRegistry {
    peers: Arc<RwLock<HashMap<SocketAddr, PeerHandle>>>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&self, peer: PeerHandle, max_peers: usize) -> Result<(), ConnectionError> {
        let mut peers = self.peers.write();
        if peers.contains_key(&peer.addr()) {
            return Err(ConnectionError::DuplicatePeer(peer.addr()));
        }
        if peers.len() >= max_peers {
            return Err(ConnectionError::TooManyPeers(max_peers));
        }
        peers.insert(peer.addr(), peer);
        Ok(())
    }

    pub(crate) fn remove(&self, addr: &SocketAddr) -> Option<PeerHandle> {
        self.peers.write().remove(addr)
    }

    pub fn get(&self, addr: &SocketAddr) -> Option<PeerHandle> {
        self.peers.read().get(addr).cloned()
    }

    pub fn contains(&self, addr: &SocketAddr) -> bool {
        self.peers.read().contains_key(addr)
    }

    pub fn handles(&self) -> Vec<PeerHandle> {
        self.peers.read().values().cloned().collect()
    }

    pub fn addrs(&self) -> Vec<SocketAddr> {
        self.peers.read().keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.peers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.read().is_empty()
    }

    /// Queue `message` to every peer except `except`. Returns how many
    /// peers accepted it.
    pub fn broadcast(&self, message: &Message, except: Option<SocketAddr>) -> usize {
        self.handles()
            .into_iter()
            .filter(|peer| Some(peer.addr()) != except)
            .filter(|peer| peer.send(message.clone()).is_ok())
            .count()
    }
}
