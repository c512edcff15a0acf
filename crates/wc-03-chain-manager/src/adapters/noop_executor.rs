use shared_types::{Block, Transaction};
use wc_01_snapshot_chain::StorageManager;

use crate::domain::ChainError;
use crate::ports::TransactionExecutor;

/// Executor for nodes that only relay and store blocks.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopExecutor;

impl TransactionExecutor for NoopExecutor {
    fn execute(
        &self,
        _tx: &Transaction,
        _block: &Block,
        _state: &dyn StorageManager,
    ) -> Result<(), ChainError> {
        Ok(())
    }
}
