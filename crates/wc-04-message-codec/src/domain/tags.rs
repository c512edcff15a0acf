use std::fmt;
use std::ops::RangeInclusive;

/// Tags of the chain-sync family.
pub const CHAIN_SYNC_RANGE: RangeInclusive<u8> = 0x01..=0x1F;

/// Tags of the peer (discovery and keep-alive) family.
pub const PEER_RANGE: RangeInclusive<u8> = 0x20..=0x7F;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Family {
    Peer,
    ChainSync,
}

impl Family {
    /// Family owning `tag`, `None` outside both ranges.
    pub fn of(tag: u8) -> Option<Family> {
        if CHAIN_SYNC_RANGE.contains(&tag) {
            Some(Family::ChainSync)
        } else if PEER_RANGE.contains(&tag) {
            Some(Family::Peer)
        } else {
            None
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Family::Peer => f.write_str("peer"),
            Family::ChainSync => f.write_str("chain-sync"),
        }
    }
}

/// One-byte message type tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageType {
    Transaction = 0x01,
    Block = 0x02,
    Transactions = 0x03,
    Blocks = 0x04,
    FetchInventoryData = 0x07,
    ItemNotFound = 0x10,
    BlockInventory = 0x12,
    TransactionInventory = 0x13,

    Disconnect = 0x21,
    FindNode = 0x32,
    Neighbours = 0x33,
    KeepAlive = 0x40,
}

impl MessageType {
    pub const ALL: [MessageType; 12] = [
        MessageType::Transaction,
        MessageType::Block,
        MessageType::Transactions,
        MessageType::Blocks,
        MessageType::FetchInventoryData,
        MessageType::ItemNotFound,
        MessageType::BlockInventory,
        MessageType::TransactionInventory,
        MessageType::Disconnect,
        MessageType::FindNode,
        MessageType::Neighbours,
        MessageType::KeepAlive,
    ];

    pub fn tag(self) -> u8 {
        self as u8
    }

    pub fn from_tag(tag: u8) -> Option<MessageType> {
        MessageType::ALL.into_iter().find(|kind| kind.tag() == tag)
    }

    pub fn family(self) -> Family {
        if CHAIN_SYNC_RANGE.contains(&self.tag()) {
            Family::ChainSync
        } else {
            Family::Peer
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            MessageType::Transaction => "TRX",
            MessageType::Block => "BLOCK",
            MessageType::Transactions => "TRXS",
            MessageType::Blocks => "BLOCKS",
            MessageType::FetchInventoryData => "FETCH_INV_DATA",
            MessageType::ItemNotFound => "ITEM_NOT_FOUND",
            MessageType::BlockInventory => "BLOCK_INVENTORY",
            MessageType::TransactionInventory => "TRX_INVENTORY",
            MessageType::Disconnect => "DISCONNECT",
            MessageType::FindNode => "FIND_NODE",
            MessageType::Neighbours => "NEIGHBOURS",
            MessageType::KeepAlive => "KEEP_ALIVE",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
