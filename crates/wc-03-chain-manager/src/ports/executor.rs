use shared_types::{Block, Transaction};
use wc_01_snapshot_chain::StorageManager;

use crate::domain::ChainError;

/// Executes a transaction's contract against chain state.
///
/// Contract semantics live outside this core. The executor receives the
/// speculative layer of the block being applied; whatever it writes is
/// discarded together with the block if acceptance fails.
pub trait TransactionExecutor: Send + Sync + 'static {
    fn execute(
        &self,
        tx: &Transaction,
        block: &Block,
        state: &dyn StorageManager,
    ) -> Result<(), ChainError>;
}
