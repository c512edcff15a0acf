//! [`ChainGateway`] over the chain manager.

use bytes::Bytes;
use shared_types::{BlockId, Transaction, TransactionId};
use wc_01_snapshot_chain::SnapshotError;
use wc_03_chain_manager::{ChainError, ChainManager, TransactionExecutor};
use wc_04_message_codec::{BlockMessage, MessageType, Payload};

use crate::ports::ChainGateway;

impl<E: TransactionExecutor> ChainGateway for ChainManager<E> {
    fn head(&self) -> Result<BlockId, ChainError> {
        ChainManager::head(self)
    }

    fn has_block(&self, id: &BlockId) -> Result<bool, ChainError> {
        ChainManager::has_block(self, id)
    }

    fn has_transaction(&self, id: &TransactionId) -> Result<bool, ChainError> {
        ChainManager::has_transaction(self, id)
    }

    fn get_block(&self, id: &BlockId) -> Result<Option<BlockMessage>, ChainError> {
        let Some(raw) = self.get_block_bytes(id)? else {
            return Ok(None);
        };
        let corrupt = |reason: String| {
            ChainError::Storage(SnapshotError::Corrupt {
                what: "block",
                reason,
            })
        };
        let payload = Payload::decode(MessageType::Block, Bytes::from(raw))
            .map_err(|e| corrupt(e.to_string()))?;
        let message = BlockMessage::from_payload(payload).map_err(|e| corrupt(e.to_string()))?;
        Ok(Some(message))
    }

    fn get_transaction(&self, id: &TransactionId) -> Result<Option<Transaction>, ChainError> {
        ChainManager::get_transaction(self, id)
    }

    fn push_block(&self, message: &BlockMessage) -> Result<BlockId, ChainError> {
        self.push_encoded_block(message.block(), message.payload().raw())
    }

    fn push_transaction(&self, tx: Transaction) -> Result<TransactionId, ChainError> {
        ChainManager::push_transaction(self, tx)
    }
}
