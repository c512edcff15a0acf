use std::collections::{HashMap, VecDeque};

use shared_types::{Transaction, TransactionId};

use super::ChainError;

/// Transactions accepted from peers and not yet seen in a block.
///
/// Insertion ordered; full pools refuse new entries instead of evicting.
#[derive(Debug)]
pub struct PendingPool {
    order: VecDeque<TransactionId>,
    transactions: HashMap<TransactionId, Transaction>,
    capacity: usize,
}

impl PendingPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            order: VecDeque::new(),
            transactions: HashMap::new(),
            capacity,
        }
    }

    pub fn insert(&mut self, id: TransactionId, tx: Transaction) -> Result<(), ChainError> {
        if self.transactions.contains_key(&id) {
            return Err(ChainError::DuplicateTransaction(hex::encode(id)));
        }
        if self.transactions.len() >= self.capacity {
            return Err(ChainError::PoolFull(self.capacity));
        }
        self.order.push_back(id);
        self.transactions.insert(id, tx);
        Ok(())
    }

    pub fn get(&self, id: &TransactionId) -> Option<&Transaction> {
        self.transactions.get(id)
    }

    pub fn contains(&self, id: &TransactionId) -> bool {
        self.transactions.contains_key(id)
    }

    /// Drop every pooled transaction that a block has included.
    pub fn remove_included(&mut self, included: &[Transaction]) {
        let mut removed = false;
        for tx in included {
            removed |= self.transactions.remove(&tx.id()).is_some();
        }
        if removed {
            let transactions = &self.transactions;
            self.order.retain(|id| transactions.contains_key(id));
        }
    }

    /// Pooled transactions in arrival order.
    pub fn iter(&self) -> impl Iterator<Item = &Transaction> {
        self.order.iter().filter_map(|id| self.transactions.get(id))
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}
