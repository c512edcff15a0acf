use shared_types::EntityError;
use thiserror::Error;
use wc_03_chain_manager::ChainError;

use crate::ports::Penalty;

/// Errors raised while handling sync traffic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("Chain: {0}")]
    Chain(#[from] ChainError),

    #[error("Invalid item: {0}")]
    InvalidItem(#[from] EntityError),

    #[error("Inventory lists {len} ids, limit is {max}")]
    InventoryTooLarge { len: usize, max: usize },

    #[error("Unknown inventory type {0}")]
    UnknownInventoryType(i32),
}

impl SyncError {
    /// Penalty owed by the peer that caused this error, if it is the peer's
    /// fault at all.
    pub fn penalty(&self) -> Option<Penalty> {
        match self {
            SyncError::Chain(err) if err.is_bad_item() => Some(Penalty::BadItem),
            SyncError::Chain(_) => None,
            SyncError::InvalidItem(_) | SyncError::UnknownInventoryType(_) => {
                Some(Penalty::BadItem)
            }
            SyncError::InventoryTooLarge { .. } => Some(Penalty::Flooding),
        }
    }
}
