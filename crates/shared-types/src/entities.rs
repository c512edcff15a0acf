//! # Core Domain Entities
//!
//! ## Clusters
//!
//! - **Identity**: `Hash`, `Address`, `BlockId`, `TransactionId`
//! - **Chain**: `Block`, `BlockHeader`, `Transaction`
//!
//! Blocks and transactions are protobuf messages (`prost`). Their canonical
//! bytes are `encode_to_vec()`; identifiers are SHA-256 digests over the
//! unsigned portion of that encoding.

use std::cmp::Ordering;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use prost::Message;
use sha2::{Digest, Sha256};

use crate::errors::EntityError;

// =============================================================================
// IDENTITY
// =============================================================================

/// A 32-byte SHA-256 digest.
pub type Hash = [u8; 32];

/// A 20-byte witness (block producer) address.
pub type Address = [u8; 20];

/// Transaction identifier: SHA-256 of the unsigned transaction encoding.
pub type TransactionId = Hash;

/// The all-zero hash, used as the parent of genesis.
pub const ZERO_HASH: Hash = [0u8; 32];

/// Compute the SHA-256 digest of `data`.
pub fn sha256(data: &[u8]) -> Hash {
    Sha256::digest(data).into()
}

/// Current Unix time in milliseconds, or 0 if the clock is before the epoch.
pub fn current_timestamp_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Block identifier: content hash plus block number.
///
/// The first 8 bytes of `hash` are overwritten with the big-endian block
/// number, so two blocks at different heights can never share an id and a
/// bare 32-byte inventory entry is enough to recover the number.
///
/// Ordering is by number first, which defines chain height.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BlockId {
    hash: Hash,
    num: u64,
}

impl BlockId {
    /// Build an id from a header digest and the block number.
    pub fn new(header_digest: Hash, num: u64) -> Self {
        let mut hash = header_digest;
        hash[..8].copy_from_slice(&num.to_be_bytes());
        Self { hash, num }
    }

    /// Recover an id from its 32-byte hash form.
    pub fn from_hash(hash: Hash) -> Self {
        let mut num_bytes = [0u8; 8];
        num_bytes.copy_from_slice(&hash[..8]);
        Self {
            hash,
            num: u64::from_be_bytes(num_bytes),
        }
    }

    /// Recover an id from a byte slice (e.g. a `parent_hash` field).
    pub fn from_slice(bytes: &[u8]) -> Result<Self, EntityError> {
        let hash: Hash = bytes.try_into().map_err(|_| EntityError::InvalidLength {
            field: "block id",
            expected: 32,
            actual: bytes.len(),
        })?;
        Ok(Self::from_hash(hash))
    }

    pub fn hash(&self) -> &Hash {
        &self.hash
    }

    pub fn num(&self) -> u64 {
        self.num
    }
}

impl Ord for BlockId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.num
            .cmp(&other.num)
            .then_with(|| self.hash.cmp(&other.hash))
    }
}

impl PartialOrd for BlockId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.num, hex::encode(&self.hash[8..16]))
    }
}

impl fmt::Debug for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockId({}, {})", self.num, hex::encode(self.hash))
    }
}

// =============================================================================
// CHAIN
// =============================================================================

/// Block header as carried on the wire.
#[derive(Clone, PartialEq, Message)]
pub struct BlockHeader {
    /// Height in the chain (0 = genesis).
    #[prost(uint64, tag = "1")]
    pub number: u64,
    /// Id hash of the parent block.
    #[prost(bytes = "vec", tag = "2")]
    pub parent_hash: Vec<u8>,
    /// Production time in milliseconds since epoch.
    #[prost(int64, tag = "3")]
    pub timestamp: i64,
    /// Digest over the transaction list.
    #[prost(bytes = "vec", tag = "4")]
    pub tx_trie_root: Vec<u8>,
    /// Producing witness.
    #[prost(bytes = "vec", tag = "5")]
    pub witness_address: Vec<u8>,
    /// Protocol version the producer declares (its fork vote).
    #[prost(uint32, tag = "6")]
    pub version: u32,
    /// Opaque producer signature, excluded from the id digest.
    #[prost(bytes = "vec", tag = "7")]
    pub witness_signature: Vec<u8>,
}

impl BlockHeader {
    /// Digest of the header with the signature stripped.
    pub fn digest(&self) -> Hash {
        let mut unsigned = self.clone();
        unsigned.witness_signature.clear();
        sha256(&unsigned.encode_to_vec())
    }

    pub fn witness(&self) -> Result<Address, EntityError> {
        self.witness_address
            .as_slice()
            .try_into()
            .map_err(|_| EntityError::InvalidLength {
                field: "witness address",
                expected: 20,
                actual: self.witness_address.len(),
            })
    }

    pub fn parent_id(&self) -> Result<BlockId, EntityError> {
        BlockId::from_slice(&self.parent_hash)
    }
}

/// A transaction. The contract payload is opaque to this core; it is handed
/// to the transaction executor untouched.
#[derive(Clone, PartialEq, Message)]
pub struct Transaction {
    #[prost(bytes = "vec", tag = "1")]
    pub ref_block_hash: Vec<u8>,
    #[prost(int64, tag = "2")]
    pub expiration: i64,
    #[prost(bytes = "vec", tag = "3")]
    pub contract: Vec<u8>,
    #[prost(uint64, tag = "4")]
    pub fee_limit: u64,
    #[prost(int64, tag = "5")]
    pub timestamp: i64,
    #[prost(bytes = "vec", repeated, tag = "6")]
    pub signatures: Vec<Vec<u8>>,
}

impl Transaction {
    /// Content id: digest of the transaction without signatures.
    pub fn id(&self) -> TransactionId {
        let mut unsigned = self.clone();
        unsigned.signatures.clear();
        sha256(&unsigned.encode_to_vec())
    }

    /// Structural check applied before a transaction is pooled or relayed.
    pub fn validate(&self) -> Result<(), EntityError> {
        if self.contract.is_empty() {
            return Err(EntityError::EmptyContract);
        }
        Ok(())
    }
}

/// A full block.
#[derive(Clone, PartialEq, Message)]
pub struct Block {
    #[prost(message, optional, tag = "1")]
    pub header: Option<BlockHeader>,
    #[prost(message, repeated, tag = "2")]
    pub transactions: Vec<Transaction>,
}

impl Block {
    pub fn header(&self) -> Result<&BlockHeader, EntityError> {
        self.header.as_ref().ok_or(EntityError::MissingHeader)
    }

    pub fn id(&self) -> Result<BlockId, EntityError> {
        let header = self.header()?;
        Ok(BlockId::new(header.digest(), header.number))
    }

    pub fn number(&self) -> Result<u64, EntityError> {
        Ok(self.header()?.number)
    }

    pub fn parent_id(&self) -> Result<BlockId, EntityError> {
        self.header()?.parent_id()
    }

    pub fn witness(&self) -> Result<Address, EntityError> {
        self.header()?.witness()
    }

    pub fn version(&self) -> Result<u32, EntityError> {
        Ok(self.header()?.version)
    }

    /// Digest over the ordered transaction ids.
    pub fn compute_tx_root(&self) -> Hash {
        let mut hasher = Sha256::new();
        for tx in &self.transactions {
            hasher.update(tx.id());
        }
        hasher.finalize().into()
    }

    /// Full structural validation for a block received from the network.
    pub fn validate(&self) -> Result<(), EntityError> {
        let header = self.header()?;
        if header.number == 0 {
            return Err(EntityError::GenesisRelay);
        }
        header.witness()?;
        header.parent_id()?;
        for tx in &self.transactions {
            tx.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(number: u64) -> BlockHeader {
        BlockHeader {
            number,
            parent_hash: vec![0u8; 32],
            timestamp: 1_700_000_000_000,
            tx_trie_root: vec![],
            witness_address: vec![7u8; 20],
            version: 5,
            witness_signature: vec![1, 2, 3],
        }
    }

    #[test]
    fn test_block_id_embeds_number() {
        let id = BlockId::new([0xAB; 32], 4_727_890);
        assert_eq!(id.num(), 4_727_890);
        assert_eq!(&id.hash()[..8], &4_727_890u64.to_be_bytes());
        assert_eq!(BlockId::from_hash(*id.hash()), id);
    }

    #[test]
    fn test_block_id_orders_by_number() {
        let low = BlockId::new([0xFF; 32], 1);
        let high = BlockId::new([0x00; 32], 2);
        assert!(low < high);
    }

    #[test]
    fn test_block_id_from_short_slice() {
        let err = BlockId::from_slice(&[1, 2, 3]).unwrap_err();
        assert!(matches!(err, EntityError::InvalidLength { actual: 3, .. }));
    }

    #[test]
    fn test_signature_excluded_from_block_id() {
        let mut a = Block {
            header: Some(header(10)),
            transactions: vec![],
        };
        let id_before = a.id().unwrap();
        a.header.as_mut().unwrap().witness_signature = vec![9, 9, 9];
        assert_eq!(a.id().unwrap(), id_before);
    }

    #[test]
    fn test_transaction_id_ignores_signatures() {
        let mut tx = Transaction {
            contract: vec![1],
            ..Default::default()
        };
        let id = tx.id();
        tx.signatures.push(vec![0xEE; 65]);
        assert_eq!(tx.id(), id);
    }

    #[test]
    fn test_block_validation() {
        let missing = Block::default();
        assert_eq!(missing.validate(), Err(EntityError::MissingHeader));

        let mut bad_witness = header(3);
        bad_witness.witness_address = vec![1; 5];
        let block = Block {
            header: Some(bad_witness),
            transactions: vec![],
        };
        assert!(matches!(
            block.validate(),
            Err(EntityError::InvalidLength { field: "witness address", .. })
        ));

        let empty_tx = Block {
            header: Some(header(3)),
            transactions: vec![Transaction::default()],
        };
        assert_eq!(empty_tx.validate(), Err(EntityError::EmptyContract));
    }
}
