use std::fmt;

use shared_types::{BlockId, Hash, TransactionId};
use wc_04_message_codec::{Inventory, InventoryType};

/// One inventory entry: what it is and its content id.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Item {
    kind: InventoryType,
    hash: Hash,
}

impl Item {
    pub fn new(kind: InventoryType, hash: Hash) -> Self {
        Self { kind, hash }
    }

    pub fn block(id: &BlockId) -> Self {
        Self::new(InventoryType::Block, *id.hash())
    }

    pub fn transaction(id: TransactionId) -> Self {
        Self::new(InventoryType::Trx, id)
    }

    pub fn kind(&self) -> InventoryType {
        self.kind
    }

    pub fn hash(&self) -> &Hash {
        &self.hash
    }

    /// Block ids carry their number, so a bare hash is enough.
    pub fn block_id(&self) -> Option<BlockId> {
        (self.kind == InventoryType::Block).then(|| BlockId::from_hash(self.hash))
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.block_id() {
            Some(id) => write!(f, "block {id}"),
            None => write!(f, "tx {}", hex::encode(&self.hash[..8])),
        }
    }
}

impl fmt::Debug for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Item({self})")
    }
}

/// Inventory of one kind from raw hashes.
pub fn inventory_of<I: IntoIterator<Item = Hash>>(kind: InventoryType, hashes: I) -> Inventory {
    Inventory {
        inventory_type: kind as i32,
        ids: hashes.into_iter().map(|hash| hash.to_vec()).collect(),
    }
}
