use shared_types::{BlockId, EntityError};
use thiserror::Error;
use wc_01_snapshot_chain::SnapshotError;
use wc_02_fork_controller::ForkError;

/// Errors raised while accepting blocks and transactions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    /// Structurally invalid block or transaction.
    #[error("Invalid item: {0}")]
    InvalidBlock(#[from] EntityError),

    /// Block is already part of the chain.
    #[error("Block {0} already applied")]
    Duplicate(BlockId),

    /// Parent does not match the local block at `number - 1`.
    #[error("Block {block} does not link to the local chain (parent {parent})")]
    Unlinked { block: BlockId, parent: BlockId },

    /// Block links to an ancestor of the head, not the head itself.
    #[error("Block {block} does not extend head {head}")]
    NotOnHead { block: BlockId, head: BlockId },

    /// Transaction was already seen.
    #[error("Transaction {0} already known")]
    DuplicateTransaction(String),

    /// Pending transaction pool is full.
    #[error("Pending pool full ({0} transactions)")]
    PoolFull(usize),

    /// The transaction executor refused a transaction.
    #[error("Transaction {tx} failed: {reason}")]
    Execution { tx: String, reason: String },

    /// The head layer has already been merged into the root store.
    #[error("Block {0} is already committed")]
    Irreversible(BlockId),

    #[error("Storage: {0}")]
    Storage(#[from] SnapshotError),

    #[error("Fork controller: {0}")]
    Fork(#[from] ForkError),
}

impl ChainError {
    /// Whether the sender of the item should be penalized.
    pub fn is_bad_item(&self) -> bool {
        matches!(
            self,
            ChainError::InvalidBlock(_) | ChainError::Execution { .. }
        )
    }
}
