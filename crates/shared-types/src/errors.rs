//! # Error Types
//!
//! Errors raised while interpreting chain entities.

use thiserror::Error;

/// Structural problems found in a block or transaction.
///
/// These are "bad item" errors: the entity decoded as protobuf but its
/// content does not describe a usable block or transaction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntityError {
    /// Block carries no header.
    #[error("Block has no header")]
    MissingHeader,

    /// A fixed-width field has the wrong length.
    #[error("Invalid {field} length: expected {expected}, got {actual}")]
    InvalidLength {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Transaction carries no contract payload.
    #[error("Transaction has no contract")]
    EmptyContract,

    /// Block number 0 is reserved for genesis and is never relayed.
    #[error("Genesis block cannot be relayed")]
    GenesisRelay,
}
