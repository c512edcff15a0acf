//! # Test Harness
//!
//! A [`TestNode`] is a chain manager, a score book, a peer network and the
//! inventory sync service bound to a loopback listener, wired the same way a
//! node binary wires them.

use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use shared_types::{Address, Block, BlockHeader, BlockId, Transaction};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use wc_03_chain_manager::{ChainConfig, ChainManager};
use wc_05_peer_connection::{ConnectionConfig, PeerHandle, PeerNetwork, PeerRegistry};
use wc_06_inventory_sync::{ScoreBook, SyncConfig, SyncService};
use wc_telemetry::{init_telemetry, TelemetryConfig, TelemetryGuard};

pub type NodeSync = SyncService<ChainManager>;

static TELEMETRY: OnceLock<Option<TelemetryGuard>> = OnceLock::new();

/// Install the subscriber once per test binary. Honors `WC_LOG_LEVEL`.
pub fn init_logging() {
    TELEMETRY.get_or_init(|| init_telemetry(TelemetryConfig::for_subsystem("00", "tests")).ok());
}

pub struct TestNode {
    pub chain: Arc<ChainManager>,
    pub scores: Arc<ScoreBook>,
    pub sync: Arc<NodeSync>,
    pub network: PeerNetwork<NodeSync>,
    pub addr: SocketAddr,
    listener: JoinHandle<()>,
    maintenance: JoinHandle<()>,
    shutdown: watch::Sender<bool>,
}

impl TestNode {
    pub async fn spawn() -> Self {
        Self::spawn_with(ChainConfig::default()).await
    }

    pub async fn spawn_with(chain: ChainConfig) -> Self {
        init_logging();
        let chain = Arc::new(ChainManager::in_memory(chain).unwrap());
        let scores = Arc::new(ScoreBook::new());
        let registry = PeerRegistry::new();
        let sync = Arc::new(SyncService::new(
            sync_config(),
            Arc::clone(&chain),
            Arc::clone(&scores),
            registry.clone(),
        ));
        let network =
            PeerNetwork::with_registry(ConnectionConfig::default(), Arc::clone(&sync), registry);
        let (addr, listener) = network
            .listen(SocketAddr::from(([127, 0, 0, 1], 0)))
            .await
            .unwrap();
        let (shutdown, stop) = watch::channel(false);
        let maintenance = sync.spawn_maintenance(stop);
        Self {
            chain,
            scores,
            sync,
            network,
            addr,
            listener,
            maintenance,
            shutdown,
        }
    }

    /// Dial `other` and wait until both sides registered the link.
    pub async fn connect(&self, other: &TestNode) -> PeerHandle {
        let before = other.network.peer_count();
        let peer = self.network.connect(other.addr).await.unwrap();
        eventually("inbound side registered", || {
            other.network.peer_count() > before
        })
        .await;
        peer
    }

    pub fn head(&self) -> BlockId {
        self.chain.head().unwrap()
    }

    /// Build and publish a block on top of the local head.
    pub fn produce(&self, witness: Address, version: u32, transactions: Vec<Transaction>) -> BlockId {
        let block = child_of(&self.head(), witness, version, transactions);
        self.sync.publish_block(block).unwrap()
    }
}

impl Drop for TestNode {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
        self.listener.abort();
        self.maintenance.abort();
        self.network.shutdown();
    }
}

/// Short timeouts so retries happen within a test.
pub fn sync_config() -> SyncConfig {
    SyncConfig {
        request_timeout_ms: 500,
        maintenance_interval_ms: 100,
        ..SyncConfig::default()
    }
}

pub fn witness(slot: u8) -> Address {
    [slot + 1; 20]
}

pub fn child_of(
    parent: &BlockId,
    witness: Address,
    version: u32,
    transactions: Vec<Transaction>,
) -> Block {
    let mut block = Block {
        header: Some(BlockHeader {
            number: parent.num() + 1,
            parent_hash: parent.hash().to_vec(),
            timestamp: 1_700_000_000_000 + parent.num() as i64 * 3_000 + i64::from(witness[0]),
            witness_address: witness.to_vec(),
            version,
            ..Default::default()
        }),
        transactions,
    };
    let root = block.compute_tx_root();
    if let Some(header) = block.header.as_mut() {
        header.tx_trie_root = root.to_vec();
    }
    block
}

pub fn tx(tag: u8) -> Transaction {
    Transaction {
        contract: vec![tag],
        expiration: 60_000,
        ..Default::default()
    }
}

/// Poll `condition` for up to five seconds.
pub async fn eventually(what: &str, condition: impl Fn() -> bool) {
    for _ in 0..500 {
        if condition() {
            return;
        }
        sleep(Duration::from_millis(10)).await;
    }
    panic!("condition never held: {what}");
}
