use thiserror::Error;

use super::SnapshotId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    #[error("Snapshot {id} already has a successor; writes go to the current snapshot")]
    Frozen { id: SnapshotId },

    #[error("Cannot retreat past the root store")]
    AtRoot,

    #[error("Store error: {0}")]
    Store(String),

    #[error("Corrupt {what}: {reason}")]
    Corrupt { what: &'static str, reason: String },
}
