//! # Chain Manager Service
//!
//! Owns the snapshot chain and the fork controller, and is the only writer
//! of block state. Every accepted block gets its own snapshot layer.

use std::sync::Arc;

use parking_lot::Mutex;
use prost::Message;
use shared_types::{Address, Block, BlockId, Transaction, TransactionId};
use tracing::{debug, info, warn};
use wc_01_snapshot_chain::{
    encode_u64, SnapshotChain, SnapshotError, StorageManager, Store, LATEST_BLOCK_HASH_KEY,
};
use wc_02_fork_controller::ForkController;

use crate::adapters::NoopExecutor;
use crate::domain::{genesis_block, ChainConfig, ChainError, PendingPool};
use crate::ports::TransactionExecutor;

/// Chain manager.
///
/// ## Thread Safety
///
/// Block application, rollback and witness changes are serialized by one
/// mutex. Lookups go straight to the current snapshot.
pub struct ChainManager<E: TransactionExecutor = NoopExecutor> {
    config: ChainConfig,
    snapshots: Arc<SnapshotChain>,
    fork: Arc<ForkController>,
    executor: Arc<E>,
    apply_lock: Mutex<()>,
    pending: Mutex<PendingPool>,
}

impl ChainManager<NoopExecutor> {
    /// Chain over an in-memory store with a no-op executor.
    pub fn in_memory(config: ChainConfig) -> Result<Self, ChainError> {
        let snapshots = Arc::new(SnapshotChain::new_in_memory(config.snapshot.clone()));
        Self::open(config, snapshots, Arc::new(NoopExecutor))
    }
}

impl<E: TransactionExecutor> ChainManager<E> {
    /// Bind to a snapshot chain, writing genesis if the chain is empty.
    pub fn open(
        config: ChainConfig,
        snapshots: Arc<SnapshotChain>,
        executor: Arc<E>,
    ) -> Result<Self, ChainError> {
        let storage: Arc<dyn StorageManager> = Arc::clone(&snapshots) as Arc<dyn StorageManager>;
        let fork = Arc::new(ForkController::new(config.fork.clone(), storage));
        let manager = Self {
            pending: Mutex::new(PendingPool::new(config.max_pending_transactions)),
            config,
            snapshots,
            fork,
            executor,
            apply_lock: Mutex::new(()),
        };
        if manager.block_id_by_number(0)?.is_none() {
            manager.write_genesis()?;
        }
        info!(head = %manager.head()?, "Chain manager ready");
        Ok(manager)
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    pub fn snapshots(&self) -> &Arc<SnapshotChain> {
        &self.snapshots
    }

    /// Handle to the fork controller this manager owns.
    pub fn fork(&self) -> &Arc<ForkController> {
        &self.fork
    }

    // =========================================================================
    // LOOKUPS
    // =========================================================================

    pub fn head(&self) -> Result<BlockId, ChainError> {
        let hash = self
            .snapshots
            .get(Store::DynamicProperties, LATEST_BLOCK_HASH_KEY)?
            .ok_or(SnapshotError::Corrupt {
                what: "head",
                reason: "no head block recorded".into(),
            })?;
        Ok(BlockId::from_slice(&hash)?)
    }

    pub fn head_number(&self) -> Result<u64, ChainError> {
        Ok(self.snapshots.latest_block_header_number()?)
    }

    pub fn block_id_by_number(&self, number: u64) -> Result<Option<BlockId>, ChainError> {
        match self.snapshots.get(Store::BlockIndex, &encode_u64(number))? {
            Some(hash) => Ok(Some(BlockId::from_slice(&hash)?)),
            None => Ok(None),
        }
    }

    pub fn has_block(&self, id: &BlockId) -> Result<bool, ChainError> {
        Ok(self.block_id_by_number(id.num())?.as_ref() == Some(id))
    }

    pub fn get_block(&self, id: &BlockId) -> Result<Option<Block>, ChainError> {
        match self.get_block_bytes(id)? {
            Some(bytes) => Ok(Some(decode_stored::<Block>("block", &bytes)?)),
            None => Ok(None),
        }
    }

    /// A block exactly as it was received.
    pub fn get_block_bytes(&self, id: &BlockId) -> Result<Option<Vec<u8>>, ChainError> {
        Ok(self.snapshots.get(Store::Block, id.hash())?)
    }

    pub fn get_block_by_number(&self, number: u64) -> Result<Option<Block>, ChainError> {
        match self.block_id_by_number(number)? {
            Some(id) => self.get_block(&id),
            None => Ok(None),
        }
    }

    /// Pending transactions first, then transactions included in blocks.
    pub fn get_transaction(&self, id: &TransactionId) -> Result<Option<Transaction>, ChainError> {
        if let Some(tx) = self.pending.lock().get(id) {
            return Ok(Some(tx.clone()));
        }
        match self.snapshots.get(Store::Transaction, id)? {
            Some(bytes) => Ok(Some(decode_stored::<Transaction>("transaction", &bytes)?)),
            None => Ok(None),
        }
    }

    pub fn has_transaction(&self, id: &TransactionId) -> Result<bool, ChainError> {
        if self.pending.lock().contains(id) {
            return Ok(true);
        }
        Ok(self.snapshots.get(Store::Transaction, id)?.is_some())
    }

    pub fn pending_transactions(&self) -> Vec<Transaction> {
        self.pending.lock().iter().cloned().collect()
    }

    pub fn active_witnesses(&self) -> Result<Vec<Address>, ChainError> {
        Ok(self.snapshots.active_witnesses()?)
    }

    // =========================================================================
    // MUTATIONS
    // =========================================================================

    /// Accept a block that extends the head.
    pub fn push_block(&self, block: &Block) -> Result<BlockId, ChainError> {
        self.push_encoded_block(block, &block.encode_to_vec())
    }

    /// Accept `block`, storing `raw`, the bytes it was decoded from, so
    /// fields this node does not know about are served back unchanged.
    pub fn push_encoded_block(&self, block: &Block, raw: &[u8]) -> Result<BlockId, ChainError> {
        block.validate()?;
        let id = block.id()?;
        let parent = block.parent_id()?;

        let _apply = self.apply_lock.lock();
        if self.has_block(&id)? {
            return Err(ChainError::Duplicate(id));
        }
        // validate() guarantees number >= 1.
        match self.block_id_by_number(id.num() - 1)? {
            Some(local) if local == parent => {}
            _ => return Err(ChainError::Unlinked { block: id, parent }),
        }
        let head = self.head()?;
        if parent != head {
            return Err(ChainError::NotOnHead { block: id, head });
        }

        let layer = self.snapshots.advance()?;
        if let Err(err) = self.apply(block, raw, &id, &*layer) {
            drop(layer);
            warn!(block = %id, error = %err, "Block rejected during apply, rolling back");
            self.snapshots.retreat()?;
            return Err(err);
        }
        drop(layer);

        self.pending.lock().remove_included(&block.transactions);
        // The block is the head from here on; a failed flush leaves its
        // layers in memory and the checkpoint is replayed by the next flush.
        let flushed = match self.snapshots.flush_if_needed() {
            Ok(flushed) => flushed,
            Err(err) => {
                warn!(block = %id, error = %err, "Snapshot flush failed");
                0
            }
        };
        info!(
            block = %id,
            txs = block.transactions.len(),
            flushed,
            "Block applied"
        );
        Ok(id)
    }

    /// Roll back the head block while its layer is still in memory.
    ///
    /// Its transactions return to the pending pool.
    pub fn pop_block(&self) -> Result<BlockId, ChainError> {
        let _apply = self.apply_lock.lock();
        let head = self.head()?;
        if head.num() == 0 || self.snapshots.current().get_previous().is_none() {
            return Err(ChainError::Irreversible(head));
        }
        let block = self.get_block(&head)?;
        self.snapshots.retreat()?;

        if let Some(block) = block {
            let mut pending = self.pending.lock();
            for tx in block.transactions {
                let id = tx.id();
                if let Err(err) = pending.insert(id, tx) {
                    debug!(tx = %hex::encode(&id[..8]), error = %err, "Popped transaction dropped");
                }
            }
        }
        info!(block = %head, new_head = %self.head()?, "Block popped");
        Ok(head)
    }

    /// Queue a transaction received from a peer.
    pub fn push_transaction(&self, tx: Transaction) -> Result<TransactionId, ChainError> {
        tx.validate()?;
        let id = tx.id();
        if self.snapshots.get(Store::Transaction, &id)?.is_some() {
            return Err(ChainError::DuplicateTransaction(hex::encode(id)));
        }
        self.pending.lock().insert(id, tx)?;
        debug!(tx = %hex::encode(&id[..8]), "Transaction pooled");
        Ok(id)
    }

    /// Replace the active witness list.
    ///
    /// Slot indices change meaning with the list, so all votes on versions
    /// that have not passed are reset.
    pub fn set_active_witnesses(&self, witnesses: &[Address]) -> Result<(), ChainError> {
        let _apply = self.apply_lock.lock();
        let previous = self.snapshots.active_witnesses()?;
        if previous == witnesses {
            return Ok(());
        }
        self.snapshots.set_active_witnesses(witnesses)?;
        self.fork.reset()?;
        info!(
            previous = previous.len(),
            current = witnesses.len(),
            "Active witness list changed"
        );
        Ok(())
    }

    fn apply(
        &self,
        block: &Block,
        raw: &[u8],
        id: &BlockId,
        state: &dyn StorageManager,
    ) -> Result<(), ChainError> {
        state.put(Store::Block, id.hash(), raw.to_vec())?;
        state.put(Store::BlockIndex, &encode_u64(id.num()), id.hash().to_vec())?;
        for tx in &block.transactions {
            state.put(Store::Transaction, &tx.id(), tx.encode_to_vec())?;
            self.executor.execute(tx, block, state)?;
        }
        state.set_latest_block_header_number(id.num())?;
        state.put(Store::DynamicProperties, LATEST_BLOCK_HASH_KEY, id.hash().to_vec())?;

        let outcome = self.fork.update(block)?;
        debug!(block = %id, ?outcome, "Fork vote");
        Ok(())
    }

    fn write_genesis(&self) -> Result<(), ChainError> {
        let genesis = genesis_block(self.config.genesis_timestamp);
        let id = genesis.id()?;
        let _apply = self.apply_lock.lock();
        let state = self.snapshots.current();
        state.put(Store::Block, id.hash(), genesis.encode_to_vec())?;
        state.put(Store::BlockIndex, &encode_u64(0), id.hash().to_vec())?;
        state.set_latest_block_header_number(0)?;
        state.put(Store::DynamicProperties, LATEST_BLOCK_HASH_KEY, id.hash().to_vec())?;
        info!(genesis = %id, "Wrote genesis block");
        Ok(())
    }
}

fn decode_stored<M: Message + Default>(what: &'static str, bytes: &[u8]) -> Result<M, ChainError> {
    M::decode(bytes).map_err(|e| {
        ChainError::Storage(SnapshotError::Corrupt {
            what,
            reason: e.to_string(),
        })
    })
}
