//! # Consensus Flows
//!
//! Fork votes and snapshot layers as seen by a node that only learns about
//! blocks from the network:
//!
//! - votes carried by synced blocks pass a version on every node
//! - popping a block retracts its vote together with its state
//! - height-activated versions follow the synced height
//! - flushed layers survive a reopen over the same stores

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use shared_types::{Address, BlockId};
    use wc_01_snapshot_chain::{MemoryStore, OrderedStore, SnapshotChain, SnapshotConfig};
    use wc_02_fork_controller::{ForkConfig, LegacyActivation};
    use wc_03_chain_manager::{ChainConfig, ChainError, ChainManager, NoopExecutor};

    use crate::harness::{child_of, eventually, init_logging, tx, witness, TestNode};

    fn voting_config() -> ChainConfig {
        ChainConfig {
            fork: ForkConfig {
                known_versions: vec![5, 6],
                legacy: None,
            },
            ..ChainConfig::default()
        }
    }

    fn witnesses(count: u8) -> Vec<Address> {
        (0..count).map(witness).collect()
    }

    async fn voting_pair() -> (TestNode, TestNode) {
        let a = TestNode::spawn_with(voting_config()).await;
        let b = TestNode::spawn_with(voting_config()).await;
        a.chain.set_active_witnesses(&witnesses(2)).unwrap();
        b.chain.set_active_witnesses(&witnesses(2)).unwrap();
        b.connect(&a).await;
        (a, b)
    }

    // =========================================================================
    // VOTING OVER THE NETWORK
    // =========================================================================

    #[tokio::test]
    async fn test_synced_votes_pass_a_version_everywhere() {
        let (a, b) = voting_pair().await;

        a.produce(witness(0), 6, vec![]);
        eventually("b applied the first vote", || b.head() == a.head()).await;
        assert!(!b.chain.fork().pass(6).unwrap());

        a.produce(witness(1), 6, vec![]);
        eventually("b applied the second vote", || b.head() == a.head()).await;
        assert!(a.chain.fork().pass(6).unwrap());
        assert!(b.chain.fork().pass(6).unwrap());
        assert!(!b.chain.fork().pass(5).unwrap());
    }

    #[tokio::test]
    async fn test_vote_for_older_version_downgrades_newer_one() {
        let (a, b) = voting_pair().await;

        a.produce(witness(0), 6, vec![]);
        a.produce(witness(0), 5, vec![]);
        eventually("b caught up", || b.head() == a.head()).await;

        let newer = b.chain.fork().stats(6).unwrap().unwrap();
        let older = b.chain.fork().stats(5).unwrap().unwrap();
        assert_eq!(newer.upgraded_slots(), 0);
        assert_eq!(older.upgraded_slots(), 1);
        assert!(!b.chain.fork().pass(6).unwrap());
    }

    #[tokio::test]
    async fn test_pop_block_retracts_vote_and_returns_transactions() {
        let (a, b) = voting_pair().await;

        a.produce(witness(0), 6, vec![]);
        a.produce(witness(1), 6, vec![tx(9)]);
        eventually("b caught up", || b.head() == a.head()).await;
        assert!(b.chain.fork().pass(6).unwrap());

        let popped = b.chain.pop_block().unwrap();
        assert_eq!(popped, a.head());
        assert_eq!(b.chain.head_number().unwrap(), 1);
        assert!(!b.chain.fork().pass(6).unwrap());
        assert_eq!(b.chain.pending_transactions(), vec![tx(9)]);

        // Re-applying the same block restores the vote.
        let block = a.chain.get_block(&popped).unwrap().unwrap();
        b.chain.push_block(&block).unwrap();
        assert!(b.chain.fork().pass(6).unwrap());
        assert!(b.chain.pending_transactions().is_empty());
    }

    #[tokio::test]
    async fn test_witness_change_resets_votes_on_one_node_only() {
        let (a, b) = voting_pair().await;

        a.produce(witness(0), 6, vec![]);
        eventually("b caught up", || b.head() == a.head()).await;

        b.chain.set_active_witnesses(&witnesses(3)).unwrap();
        let stats = b.chain.fork().stats(6).unwrap().unwrap();
        assert_eq!(stats.upgraded_slots(), 0);
        assert_eq!(a.chain.fork().stats(6).unwrap().unwrap().upgraded_slots(), 1);
    }

    #[tokio::test]
    async fn test_legacy_version_activates_at_synced_height() {
        let config = ChainConfig {
            fork: ForkConfig {
                known_versions: vec![5, 6],
                legacy: Some(LegacyActivation {
                    version: 5,
                    activation_height: 2,
                }),
            },
            ..ChainConfig::default()
        };
        let a = TestNode::spawn_with(config.clone()).await;
        let b = TestNode::spawn_with(config).await;
        b.connect(&a).await;

        a.produce(witness(0), 5, vec![]);
        eventually("b at height 1", || b.head() == a.head()).await;
        assert!(!b.chain.fork().pass(5).unwrap());

        a.produce(witness(0), 5, vec![]);
        eventually("b at height 2", || b.head() == a.head()).await;
        assert!(b.chain.fork().pass(5).unwrap());
        assert!(!b.chain.fork().pass(6).unwrap());
    }

    // =========================================================================
    // SNAPSHOT PERSISTENCE
    // =========================================================================

    struct Stores {
        root: Arc<MemoryStore>,
        checkpoint: Arc<MemoryStore>,
    }

    impl Stores {
        fn new() -> Self {
            Self {
                root: Arc::new(MemoryStore::new()),
                checkpoint: Arc::new(MemoryStore::new()),
            }
        }

        fn open(&self, config: &ChainConfig) -> Result<ChainManager, ChainError> {
            let root: Arc<dyn OrderedStore> = self.root.clone();
            let checkpoint: Arc<dyn OrderedStore> = self.checkpoint.clone();
            let snapshots = Arc::new(SnapshotChain::open(
                config.snapshot.clone(),
                root,
                checkpoint,
            )?);
            ChainManager::open(config.clone(), snapshots, Arc::new(NoopExecutor))
        }
    }

    fn extend(chain: &ChainManager, count: usize, version: u32) -> Vec<BlockId> {
        (0..count)
            .map(|n| {
                let parent = chain.head().unwrap();
                let block = child_of(&parent, witness((n % 2) as u8), version, vec![]);
                chain.push_block(&block).unwrap()
            })
            .collect()
    }

    #[test]
    fn test_flushed_blocks_and_votes_survive_reopen() {
        init_logging();
        let config = ChainConfig {
            snapshot: SnapshotConfig { max_depth: 3 },
            ..voting_config()
        };
        let stores = Stores::new();

        let ids = {
            let chain = stores.open(&config).unwrap();
            chain.set_active_witnesses(&witnesses(2)).unwrap();
            let ids = extend(&chain, 6, 6);
            assert!(chain.snapshots().depth() <= 4);
            chain.snapshots().flush(1).unwrap();
            ids
        };
        assert!(stores.checkpoint.is_empty());

        // The newest layer was never flushed, so the reopened head is one
        // block behind.
        let reopened = stores.open(&config).unwrap();
        assert_eq!(reopened.head().unwrap(), ids[4]);
        for id in &ids[..5] {
            assert!(reopened.has_block(id).unwrap());
        }
        assert!(!reopened.has_block(&ids[5]).unwrap());
        assert_eq!(reopened.active_witnesses().unwrap(), witnesses(2));
        assert!(reopened.fork().pass(6).unwrap());
    }

    #[test]
    fn test_unflushed_blocks_can_be_rebuilt_after_reopen() {
        init_logging();
        let config = ChainConfig {
            snapshot: SnapshotConfig { max_depth: 2 },
            ..ChainConfig::default()
        };
        let stores = Stores::new();
        {
            let chain = stores.open(&config).unwrap();
            extend(&chain, 4, 0);
        }

        let reopened = stores.open(&config).unwrap();
        let head = reopened.head_number().unwrap();
        assert!(head < 4);
        extend(&reopened, (4 - head) as usize, 0);
        assert_eq!(reopened.head_number().unwrap(), 4);
    }

    #[test]
    fn test_pop_stops_at_the_flushed_boundary() {
        init_logging();
        let config = ChainConfig {
            snapshot: SnapshotConfig { max_depth: 2 },
            ..ChainConfig::default()
        };
        let stores = Stores::new();
        let chain = stores.open(&config).unwrap();
        let ids = extend(&chain, 3, 0);

        // Two layers stay in memory: the head can go, its parent cannot.
        assert_eq!(chain.pop_block().unwrap(), ids[2]);
        assert_eq!(
            chain.pop_block().unwrap_err(),
            ChainError::Irreversible(ids[1])
        );
        assert_eq!(chain.head().unwrap(), ids[1]);
    }
}
