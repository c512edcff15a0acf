use shared_types::{BlockId, Transaction, TransactionId};
use wc_03_chain_manager::ChainError;
use wc_04_message_codec::BlockMessage;

/// The chain as the sync protocol sees it.
pub trait ChainGateway: Send + Sync + 'static {
    fn head(&self) -> Result<BlockId, ChainError>;

    fn has_block(&self, id: &BlockId) -> Result<bool, ChainError>;

    fn has_transaction(&self, id: &TransactionId) -> Result<bool, ChainError>;

    /// A stored block carrying the bytes it was received as.
    fn get_block(&self, id: &BlockId) -> Result<Option<BlockMessage>, ChainError>;

    fn get_transaction(&self, id: &TransactionId) -> Result<Option<Transaction>, ChainError>;

    /// Apply a block on top of the head, keeping its received bytes.
    /// `Unlinked` means an ancestor is missing.
    fn push_block(&self, message: &BlockMessage) -> Result<BlockId, ChainError>;

    fn push_transaction(&self, tx: Transaction) -> Result<TransactionId, ChainError>;
}
