use std::net::SocketAddr;

use wc_04_message_codec::DisconnectReason;

/// Misbehaviour the sync protocol reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Penalty {
    /// Structurally invalid or unexecutable block or transaction.
    BadItem,
    /// Oversized inventory or fetch.
    Flooding,
    /// A fetch went unanswered.
    Timeout,
}

impl Penalty {
    /// Reason sent to a peer dropped for this penalty.
    pub fn disconnect_reason(self) -> DisconnectReason {
        match self {
            Penalty::BadItem => DisconnectReason::BadBlock,
            Penalty::Flooding => DisconnectReason::BadProtocol,
            Penalty::Timeout => DisconnectReason::Timeout,
        }
    }
}

/// Peer reputation, kept outside the sync protocol.
pub trait PeerScoring: Send + Sync + 'static {
    /// Record a penalty. Returns `true` if the peer should be dropped.
    fn penalize(&self, peer: SocketAddr, penalty: Penalty) -> bool;

    /// Whether `peer` has been dropped before and should stay away.
    fn is_banned(&self, peer: &SocketAddr) -> bool;
}
