//! Protobuf payloads carried after the type tag.
//!
//! Block and transaction payloads reuse the entity messages from
//! `shared-types`; the structures here are protocol-only.

use std::net::{IpAddr, SocketAddr};

use prost::{Enumeration, Message};
use shared_types::{Block, BlockId, EntityError, Hash, Transaction, TransactionId};

// =============================================================================
// INVENTORY
// =============================================================================

/// What the ids of an [`Inventory`] refer to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Enumeration)]
#[repr(i32)]
pub enum InventoryType {
    Trx = 0,
    Block = 1,
}

/// Ordered list of content ids. Never carries payloads.
///
/// Used by inventory announcements, fetch requests and not-found replies.
#[derive(Clone, PartialEq, Message)]
pub struct Inventory {
    #[prost(enumeration = "InventoryType", tag = "1")]
    pub inventory_type: i32,
    #[prost(bytes = "vec", repeated, tag = "2")]
    pub ids: Vec<Vec<u8>>,
}

impl Inventory {
    pub fn blocks<I: IntoIterator<Item = BlockId>>(ids: I) -> Self {
        Self {
            inventory_type: InventoryType::Block as i32,
            ids: ids.into_iter().map(|id| id.hash().to_vec()).collect(),
        }
    }

    pub fn transactions<I: IntoIterator<Item = TransactionId>>(ids: I) -> Self {
        Self {
            inventory_type: InventoryType::Trx as i32,
            ids: ids.into_iter().map(|id| id.to_vec()).collect(),
        }
    }

    /// Declared id type, `None` for values this node does not know.
    pub fn kind(&self) -> Option<InventoryType> {
        InventoryType::try_from(self.inventory_type).ok()
    }

    /// Ids as 32-byte hashes; any other width is a bad item.
    pub fn hashes(&self) -> Result<Vec<Hash>, EntityError> {
        self.ids
            .iter()
            .map(|id| {
                id.as_slice()
                    .try_into()
                    .map_err(|_| EntityError::InvalidLength {
                        field: "inventory id",
                        expected: 32,
                        actual: id.len(),
                    })
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

// =============================================================================
// BATCHED TRANSFER
// =============================================================================

#[derive(Clone, PartialEq, Message)]
pub struct BlocksPayload {
    #[prost(message, repeated, tag = "1")]
    pub blocks: Vec<Block>,
}

#[derive(Clone, PartialEq, Message)]
pub struct TransactionsPayload {
    #[prost(message, repeated, tag = "1")]
    pub transactions: Vec<Transaction>,
}

// =============================================================================
// PEER FAMILY
// =============================================================================

/// Network endpoint of a node.
#[derive(Clone, PartialEq, Eq, Hash, Message)]
pub struct Endpoint {
    #[prost(string, tag = "1")]
    pub address: String,
    #[prost(uint32, tag = "2")]
    pub port: u32,
    #[prost(bytes = "vec", tag = "3")]
    pub node_id: Vec<u8>,
}

impl Endpoint {
    pub fn socket_addr(&self) -> Option<SocketAddr> {
        let ip: IpAddr = self.address.parse().ok()?;
        let port = u16::try_from(self.port).ok()?;
        Some(SocketAddr::new(ip, port))
    }
}

impl From<SocketAddr> for Endpoint {
    fn from(addr: SocketAddr) -> Self {
        Self {
            address: addr.ip().to_string(),
            port: u32::from(addr.port()),
            node_id: Vec::new(),
        }
    }
}

#[derive(Clone, PartialEq, Message)]
pub struct FindNodePayload {
    #[prost(message, optional, tag = "1")]
    pub from: Option<Endpoint>,
    #[prost(bytes = "vec", tag = "2")]
    pub target_id: Vec<u8>,
    #[prost(int64, tag = "3")]
    pub timestamp: i64,
}

#[derive(Clone, PartialEq, Message)]
pub struct NeighboursPayload {
    #[prost(message, optional, tag = "1")]
    pub from: Option<Endpoint>,
    #[prost(message, repeated, tag = "2")]
    pub neighbours: Vec<Endpoint>,
    #[prost(int64, tag = "3")]
    pub timestamp: i64,
}

#[derive(Clone, PartialEq, Message)]
pub struct KeepAlivePayload {
    #[prost(int64, tag = "1")]
    pub timestamp: i64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Enumeration)]
#[repr(i32)]
pub enum DisconnectReason {
    Requested = 0,
    BadProtocol = 1,
    TooManyPeers = 2,
    DuplicatePeer = 3,
    Timeout = 4,
    BadMessage = 5,
    BadBlock = 6,
    Unknown = 255,
}

#[derive(Clone, PartialEq, Message)]
pub struct DisconnectPayload {
    #[prost(enumeration = "DisconnectReason", tag = "1")]
    pub reason: i32,
}

impl DisconnectPayload {
    pub fn new(reason: DisconnectReason) -> Self {
        Self {
            reason: reason as i32,
        }
    }

    pub fn kind(&self) -> DisconnectReason {
        DisconnectReason::try_from(self.reason).unwrap_or(DisconnectReason::Unknown)
    }
}
