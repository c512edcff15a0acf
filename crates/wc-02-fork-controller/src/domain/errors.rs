use shared_types::EntityError;
use thiserror::Error;
use wc_01_snapshot_chain::SnapshotError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ForkError {
    #[error("Fork stats storage failed: {0}")]
    Storage(#[from] SnapshotError),

    #[error("Block cannot vote: {0}")]
    InvalidBlock(#[from] EntityError),
}
