use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::ports::{Penalty, PeerScoring};

/// Score every peer starts with.
pub const INITIAL_SCORE: i32 = 100;

/// In-memory reputation: peers start at [`INITIAL_SCORE`] and are banned
/// once their score reaches zero. Bans last for the life of the process.
#[derive(Default)]
pub struct ScoreBook {
    scores: RwLock<HashMap<SocketAddr, i32>>,
    banned: RwLock<HashSet<SocketAddr>>,
}

impl ScoreBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn score(&self, peer: &SocketAddr) -> i32 {
        self.scores
            .read()
            .get(peer)
            .copied()
            .unwrap_or(INITIAL_SCORE)
    }

    fn weight(penalty: Penalty) -> i32 {
        match penalty {
            Penalty::BadItem => 50,
            Penalty::Flooding => 25,
            Penalty::Timeout => 5,
        }
    }
}

impl PeerScoring for ScoreBook {
    fn penalize(&self, peer: SocketAddr, penalty: Penalty) -> bool {
        let score = {
            let mut scores = self.scores.write();
            let score = scores.entry(peer).or_insert(INITIAL_SCORE);
            *score = score.saturating_sub(Self::weight(penalty)).max(0);
            *score
        };
        debug!(peer = %peer, ?penalty, score, "Peer penalized");
        if score > 0 {
            return false;
        }
        if self.banned.write().insert(peer) {
            warn!(peer = %peer, ?penalty, "Peer banned");
        }
        true
    }

    fn is_banned(&self, peer: &SocketAddr) -> bool {
        self.banned.read().contains(peer)
    }
}
