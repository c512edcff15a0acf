use shared_types::Address;

use crate::domain::{
    decode_u64, decode_witness_list, encode_u64, encode_witness_list, SnapshotError, Store,
    ACTIVE_WITNESSES_KEY, LATEST_BLOCK_NUM_KEY,
};

/// Storage manager: keyed access to the logical stores plus the chain
/// properties the fork controller and the sync layer read.
///
/// Implementors provide `get`/`put`/`delete`; the property accessors are
/// derived from them so every implementation agrees on the encoding.
pub trait StorageManager: Send + Sync {
    fn get(&self, store: Store, key: &[u8]) -> Result<Option<Vec<u8>>, SnapshotError>;

    fn put(&self, store: Store, key: &[u8], value: Vec<u8>) -> Result<(), SnapshotError>;

    fn delete(&self, store: Store, key: &[u8]) -> Result<(), SnapshotError>;

    /// Ordered active witness list; the index of a witness is its slot.
    fn active_witnesses(&self) -> Result<Vec<Address>, SnapshotError> {
        match self.get(Store::Witness, ACTIVE_WITNESSES_KEY)? {
            Some(bytes) => decode_witness_list(&bytes),
            None => Ok(Vec::new()),
        }
    }

    fn set_active_witnesses(&self, witnesses: &[Address]) -> Result<(), SnapshotError> {
        self.put(
            Store::Witness,
            ACTIVE_WITNESSES_KEY,
            encode_witness_list(witnesses),
        )
    }

    /// Head block number, 0 before any block was applied.
    fn latest_block_header_number(&self) -> Result<u64, SnapshotError> {
        match self.get(Store::DynamicProperties, LATEST_BLOCK_NUM_KEY)? {
            Some(bytes) => decode_u64(&bytes),
            None => Ok(0),
        }
    }

    fn set_latest_block_header_number(&self, number: u64) -> Result<(), SnapshotError> {
        self.put(
            Store::DynamicProperties,
            LATEST_BLOCK_NUM_KEY,
            encode_u64(number),
        )
    }
}
