//! Logical stores and the physical key layout of the root store.
//!
//! All logical stores share one ordered root store. A physical key is the
//! store's one-byte prefix followed by the logical key, so every logical
//! store occupies a contiguous key range.

/// Logical store names.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Store {
    /// Block id hash → serialized block
    Block,
    /// Big-endian block number → block id hash
    BlockIndex,
    /// Transaction id → serialized transaction
    Transaction,
    /// Account address → account record (owned by transaction actuators)
    Account,
    /// Witness records and the active witness list
    Witness,
    /// Chain-wide dynamic properties (head number, head hash, ...)
    DynamicProperties,
    /// Big-endian protocol version → fork vote stats
    ForkStats,
}

impl Store {
    pub const ALL: [Store; 7] = [
        Store::Block,
        Store::BlockIndex,
        Store::Transaction,
        Store::Account,
        Store::Witness,
        Store::DynamicProperties,
        Store::ForkStats,
    ];

    pub fn prefix(self) -> u8 {
        match self {
            Store::Block => 0x01,
            Store::BlockIndex => 0x02,
            Store::Transaction => 0x03,
            Store::Account => 0x04,
            Store::Witness => 0x05,
            Store::DynamicProperties => 0x06,
            Store::ForkStats => 0x07,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Store::Block => "block",
            Store::BlockIndex => "block-index",
            Store::Transaction => "transaction",
            Store::Account => "account",
            Store::Witness => "witness",
            Store::DynamicProperties => "properties",
            Store::ForkStats => "fork-stats",
        }
    }

    /// Key in the shared root store.
    pub fn physical_key(self, key: &[u8]) -> Vec<u8> {
        let mut physical = Vec::with_capacity(key.len() + 1);
        physical.push(self.prefix());
        physical.extend_from_slice(key);
        physical
    }
}

/// Entry in a snapshot delta. Deletes are recorded as tombstones so they
/// hide values in older layers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Value {
    Put(Vec<u8>),
    Deleted,
}

impl Value {
    pub fn into_option(self) -> Option<Vec<u8>> {
        match self {
            Value::Put(bytes) => Some(bytes),
            Value::Deleted => None,
        }
    }
}
