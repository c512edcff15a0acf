//! # Inventory Sync Service
//!
//! The [`ConnectionDelegate`] behind every peer connection. It runs the
//! announce, request and transfer exchange and feeds accepted items to the
//! chain.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Mutex, RwLock};
use shared_types::{current_timestamp_ms, Block, BlockId, Hash, Transaction, TransactionId};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};
use wc_03_chain_manager::ChainError;
use wc_04_message_codec::{
    BlockMessage, DisconnectReason, Endpoint, FindNodePayload, Inventory, InventoryType, Message,
    Payload,
};
use wc_05_peer_connection::{ConnectionDelegate, DispatchError, PeerHandle, PeerRegistry};

use crate::adapters::ScoreBook;
use crate::domain::{
    inventory_of, Item, MessageCache, Orphan, OrphanPool, PeerInventory, RequestTracker, Retry,
    SyncConfig, SyncError,
};
use crate::ports::{ChainGateway, Penalty, PeerScoring};

/// Sync protocol state shared by all connections.
///
/// ## Locking
///
/// Each table has its own lock and no lock is held across a call into the
/// chain, so block application never waits on sync bookkeeping.
pub struct SyncService<G: ChainGateway, S: PeerScoring = ScoreBook> {
    config: SyncConfig,
    chain: Arc<G>,
    scoring: Arc<S>,
    registry: PeerRegistry,
    cache: MessageCache,
    known: RwLock<PeerInventory>,
    requests: Mutex<RequestTracker>,
    orphans: Mutex<OrphanPool>,
}

impl<G: ChainGateway, S: PeerScoring> SyncService<G, S> {
    pub fn new(config: SyncConfig, chain: Arc<G>, scoring: Arc<S>, registry: PeerRegistry) -> Self {
        Self {
            cache: MessageCache::new(config.cache_size),
            known: RwLock::new(PeerInventory::new(config.known_per_peer)),
            requests: Mutex::new(RequestTracker::new(
                config.request_timeout(),
                config.max_retries,
            )),
            orphans: Mutex::new(OrphanPool::new(config.orphan_limit)),
            config,
            chain,
            scoring,
            registry,
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn chain(&self) -> &Arc<G> {
        &self.chain
    }

    pub fn registry(&self) -> &PeerRegistry {
        &self.registry
    }

    pub fn pending_requests(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn orphan_count(&self) -> usize {
        self.orphans.lock().len()
    }

    pub fn cached_messages(&self) -> usize {
        self.cache.len()
    }

    // =========================================================================
    // LOCAL PUBLICATION
    // =========================================================================

    /// Apply a locally produced block and announce it to every peer.
    pub fn publish_block(&self, block: Block) -> Result<BlockId, SyncError> {
        let message = BlockMessage::new(block)?;
        let id = self.chain.push_block(&message)?;
        self.accepted_block(message, None);
        self.release_orphans(id);
        Ok(id)
    }

    /// Pool a locally submitted transaction and announce it.
    pub fn publish_transaction(&self, tx: Transaction) -> Result<TransactionId, SyncError> {
        let id = self.chain.push_transaction(tx.clone())?;
        self.cache.insert(Message::transaction(tx));
        self.relay(Item::transaction(id), None);
        Ok(id)
    }

    // =========================================================================
    // MAINTENANCE
    // =========================================================================

    /// Retry or abandon fetches past their deadline. Returns how many
    /// expired.
    pub fn run_maintenance(&self) -> usize {
        let retries = self.requests.lock().expire(Instant::now());
        let expired = retries.len();
        for retry in &retries {
            let peer = match retry {
                Retry::Reassigned { from, .. } => *from,
                Retry::Abandoned { peer, .. } => *peer,
            };
            if self.scoring.penalize(peer, Penalty::Timeout) {
                self.drop_peer(peer, Penalty::Timeout);
            }
        }
        self.apply_retries(retries);
        if expired > 0 {
            debug!(
                expired,
                in_flight = self.pending_requests(),
                orphans = self.orphan_count(),
                "Sync maintenance"
            );
        }
        expired
    }

    /// Run [`run_maintenance`](Self::run_maintenance) every
    /// `maintenance_interval_ms` until `shutdown` flips to `true`.
    pub fn spawn_maintenance(self: &Arc<Self>, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(service.config.maintenance_interval());
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        service.run_maintenance();
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            info!("Sync maintenance stopped");
                            break;
                        }
                    }
                }
            }
        })
    }

    // =========================================================================
    // HANDLERS
    // =========================================================================

    fn handle_inventory(&self, peer: &PeerHandle, inventory: &Inventory) -> Result<(), SyncError> {
        let (_, items) = self.items_of(inventory)?;
        {
            let mut known = self.known.write();
            for item in &items {
                known.mark(peer.addr(), *item);
            }
        }
        let mut wanted = Vec::new();
        for item in items {
            if !self.have(&item)? {
                wanted.push(item);
            }
        }
        trace!(peer = %peer, announced = inventory.len(), wanted = wanted.len(), "Inventory");
        self.request(peer, wanted);
        Ok(())
    }

    fn handle_fetch(&self, peer: &PeerHandle, inventory: &Inventory) -> Result<(), SyncError> {
        let (kind, items) = self.items_of(inventory)?;
        let mut missing = Vec::new();
        for item in items {
            match self.lookup(&item)? {
                Some(message) => {
                    if peer.send(message).is_err() {
                        return Ok(());
                    }
                    self.known.write().mark(peer.addr(), item);
                }
                None => missing.push(*item.hash()),
            }
        }
        if !missing.is_empty() {
            debug!(peer = %peer, missing = missing.len(), "Fetched items not found");
            let _ = peer.send(Message::item_not_found(inventory_of(kind, missing)));
        }
        Ok(())
    }

    fn handle_not_found(&self, peer: &PeerHandle, inventory: &Inventory) -> Result<(), SyncError> {
        let (_, items) = self.items_of(inventory)?;
        let now = Instant::now();
        let retries: Vec<Retry> = {
            let mut requests = self.requests.lock();
            items
                .iter()
                .filter_map(|item| requests.fail(item, peer.addr(), now))
                .collect()
        };
        self.apply_retries(retries);
        Ok(())
    }

    /// A batch is applied in ascending block number.
    fn handle_blocks(&self, peer: &PeerHandle, blocks: Vec<Block>) -> Result<(), SyncError> {
        let mut messages = blocks
            .into_iter()
            .map(BlockMessage::new)
            .collect::<Result<Vec<_>, _>>()?;
        messages.sort_by_key(|message| message.id());
        let mut first_error = None;
        for message in messages {
            if let Err(err) = self.handle_block(peer, message) {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn handle_block(&self, peer: &PeerHandle, message: BlockMessage) -> Result<(), SyncError> {
        let id = message.id();
        let item = Item::block(&id);
        self.known.write().mark(peer.addr(), item);
        self.requests.lock().complete(&item);
        if self.cache.contains(id.hash()) {
            return Ok(());
        }

        match self.chain.push_block(&message) {
            Ok(_) => {
                self.accepted_block(message, Some(peer.addr()));
                self.release_orphans(id);
                Ok(())
            }
            Err(ChainError::Unlinked { parent, .. }) => {
                self.park_orphan(peer, message, parent);
                Ok(())
            }
            Err(ChainError::Duplicate(_)) => Ok(()),
            Err(ChainError::NotOnHead { head, .. }) => {
                debug!(peer = %peer, block = %id, head = %head, "Ignoring block off the head");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    fn handle_transaction(
        &self,
        peer: &PeerHandle,
        payload: Payload<Transaction>,
    ) -> Result<(), SyncError> {
        let id = payload.content().id();
        let item = Item::transaction(id);
        self.known.write().mark(peer.addr(), item);
        self.requests.lock().complete(&item);
        if self.cache.contains(&id) {
            return Ok(());
        }

        match self.chain.push_transaction(payload.content().clone()) {
            Ok(_) => {
                self.cache.insert(Message::Transaction(payload));
                self.relay(item, Some(peer.addr()));
                Ok(())
            }
            Err(ChainError::DuplicateTransaction(_)) => Ok(()),
            Err(ChainError::PoolFull(size)) => {
                debug!(peer = %peer, size, "Pending pool full, transaction dropped");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    fn handle_find_node(&self, peer: &PeerHandle, request: &FindNodePayload) {
        let neighbours: Vec<Endpoint> = self
            .registry
            .addrs()
            .into_iter()
            .filter(|addr| *addr != peer.addr())
            .take(self.config.max_neighbours)
            .map(Endpoint::from)
            .collect();
        let from = self
            .config
            .advertise_addr
            .map(Endpoint::from)
            .unwrap_or_default();
        trace!(
            peer = %peer,
            target = %hex::encode(&request.target_id),
            neighbours = neighbours.len(),
            "Answering FindNode"
        );
        let _ = peer.send(Message::neighbours(from, neighbours, current_timestamp_ms()));
    }

    // =========================================================================
    // HELPERS
    // =========================================================================

    fn items_of(&self, inventory: &Inventory) -> Result<(InventoryType, Vec<Item>), SyncError> {
        if inventory.len() > self.config.max_ids_per_inventory {
            return Err(SyncError::InventoryTooLarge {
                len: inventory.len(),
                max: self.config.max_ids_per_inventory,
            });
        }
        let kind = inventory
            .kind()
            .ok_or(SyncError::UnknownInventoryType(inventory.inventory_type))?;
        let items = inventory
            .hashes()?
            .into_iter()
            .map(|hash| Item::new(kind, hash))
            .collect();
        Ok((kind, items))
    }

    /// Whether fetching `item` would be wasted: cached, stored or parked.
    fn have(&self, item: &Item) -> Result<bool, SyncError> {
        if self.cache.contains(item.hash()) {
            return Ok(true);
        }
        match item.block_id() {
            Some(id) => Ok(self.orphans.lock().contains(&id) || self.chain.has_block(&id)?),
            None => Ok(self.chain.has_transaction(item.hash())?),
        }
    }

    /// Cache first, then the chain.
    fn lookup(&self, item: &Item) -> Result<Option<Message>, SyncError> {
        if let Some(message) = self.cache.get(item.hash()) {
            if message_kind(&message) == Some(item.kind()) {
                return Ok(Some(message));
            }
        }
        match item.block_id() {
            Some(id) => Ok(self.chain.get_block(&id)?.map(Message::Block)),
            None => Ok(self
                .chain
                .get_transaction(item.hash())?
                .map(Message::transaction)),
        }
    }

    /// Ask `peer` for every item not already in flight.
    fn request(&self, peer: &PeerHandle, items: Vec<Item>) {
        let now = Instant::now();
        let (mut blocks, mut transactions) = (Vec::new(), Vec::new());
        {
            let mut requests = self.requests.lock();
            for item in items {
                if requests.begin(item, peer.addr(), now) {
                    match item.kind() {
                        InventoryType::Block => blocks.push(*item.hash()),
                        InventoryType::Trx => transactions.push(*item.hash()),
                    }
                }
            }
        }
        for (kind, ids) in [(InventoryType::Block, blocks), (InventoryType::Trx, transactions)] {
            if ids.is_empty() {
                continue;
            }
            trace!(peer = %peer, ?kind, count = ids.len(), "Fetching");
            if let Err(err) = peer.send(Message::fetch(inventory_of(kind, ids))) {
                // The request times out and moves to another advertiser.
                debug!(peer = %peer, error = %err, "Fetch not sent");
            }
        }
    }

    fn apply_retries(&self, retries: Vec<Retry>) {
        for retry in retries {
            match retry {
                Retry::Reassigned { item, from, to } => {
                    debug!(%item, from = %from, to = %to, "Retrying fetch");
                    let fetch = Message::fetch(inventory_of(item.kind(), [*item.hash()]));
                    match self.registry.get(&to) {
                        Some(peer) if peer.send(fetch).is_ok() => {}
                        _ => trace!(%item, peer = %to, "Fallback peer gone, waiting for expiry"),
                    }
                }
                Retry::Abandoned { item, peer } => {
                    debug!(%item, peer = %peer, "Giving up on item");
                }
            }
        }
    }

    fn accepted_block(&self, message: BlockMessage, source: Option<SocketAddr>) {
        let id = message.id();
        self.cache.insert(Message::Block(message));
        let relayed = self.relay(Item::block(&id), source);
        info!(block = %id, relayed, "Block accepted");
    }

    /// Announce `item` to every peer not known to have it.
    fn relay(&self, item: Item, except: Option<SocketAddr>) -> usize {
        let announcement = Message::inventory(inventory_of(item.kind(), [*item.hash()]));
        let mut known = self.known.write();
        let mut relayed = 0;
        for peer in self.registry.handles() {
            let addr = peer.addr();
            if Some(addr) == except || known.knows(&addr, &item) {
                continue;
            }
            if peer.send(announcement.clone()).is_ok() {
                known.mark(addr, item);
                relayed += 1;
            }
        }
        relayed
    }

    /// Hold an unlinked block and fetch its parent, unless that parent is
    /// itself waiting on an ancestor.
    fn park_orphan(&self, peer: &PeerHandle, message: BlockMessage, parent: BlockId) {
        let id = message.id();
        let parent_waiting = {
            let mut orphans = self.orphans.lock();
            let waiting = orphans.contains(&parent);
            orphans.insert(
                parent,
                Orphan {
                    block: message,
                    source: Some(peer.addr()),
                },
            );
            waiting
        };
        debug!(peer = %peer, block = %id, parent = %parent, "Block is unlinked, holding as orphan");
        if !parent_waiting {
            self.request(peer, vec![Item::block(&parent)]);
        }
    }

    /// Apply every orphan that was waiting on `parent`, then their
    /// descendants, lowest number first.
    fn release_orphans(&self, parent: BlockId) {
        let mut ready: VecDeque<Orphan> = self.orphans.lock().take_children(&parent).into();
        while let Some(orphan) = ready.pop_front() {
            let id = orphan.block.id();
            match self.chain.push_block(&orphan.block) {
                Ok(_) => {
                    self.accepted_block(orphan.block, orphan.source);
                    let mut children = self.orphans.lock().take_children(&id);
                    children.sort_by_key(|child| child.block.id());
                    ready.extend(children);
                }
                Err(ChainError::Duplicate(_)) => {}
                Err(ChainError::Unlinked { .. } | ChainError::NotOnHead { .. }) => {
                    debug!(block = %id, "Orphan no longer extends the head, dropped");
                }
                Err(err) => {
                    warn!(block = %id, error = %err, "Orphan rejected");
                    if let (true, Some(source)) = (err.is_bad_item(), orphan.source) {
                        if self.scoring.penalize(source, Penalty::BadItem) {
                            self.drop_peer(source, Penalty::BadItem);
                        }
                    }
                }
            }
        }
    }

    fn drop_peer(&self, addr: SocketAddr, penalty: Penalty) {
        if let Some(peer) = self.registry.get(&addr) {
            warn!(peer = %addr, ?penalty, "Dropping peer");
            peer.disconnect(penalty.disconnect_reason());
        }
    }

    /// Turn a handler error into what the connection should do about it.
    fn dispatch_error(&self, peer: &PeerHandle, err: SyncError) -> DispatchError {
        match err.penalty() {
            Some(penalty) => {
                warn!(peer = %peer, error = %err, ?penalty, "Bad item from peer");
                if self.scoring.penalize(peer.addr(), penalty) {
                    DispatchError::disconnect(err.to_string(), penalty.disconnect_reason())
                } else {
                    DispatchError::new(err.to_string())
                }
            }
            None => {
                error!(peer = %peer, error = %err, "Failed to handle message");
                DispatchError::new(err.to_string())
            }
        }
    }
}

fn message_kind(message: &Message) -> Option<InventoryType> {
    match message {
        Message::Block(_) => Some(InventoryType::Block),
        Message::Transaction(_) => Some(InventoryType::Trx),
        _ => None,
    }
}

impl<G: ChainGateway, S: PeerScoring> ConnectionDelegate for SyncService<G, S> {
    fn on_message(&self, peer: &PeerHandle, message: Message) -> Result<(), DispatchError> {
        let result = match message {
            Message::BlockInventory(payload) | Message::TransactionInventory(payload) => {
                self.handle_inventory(peer, payload.content())
            }
            Message::FetchInventoryData(payload) => self.handle_fetch(peer, payload.content()),
            Message::ItemNotFound(payload) => self.handle_not_found(peer, payload.content()),
            Message::Block(block) => self.handle_block(peer, block),
            Message::Blocks(payload) => self.handle_blocks(peer, payload.into_content().blocks),
            Message::Transaction(payload) => self.handle_transaction(peer, payload),
            Message::Transactions(payload) => payload
                .into_content()
                .transactions
                .into_iter()
                .map(|tx| self.handle_transaction(peer, Payload::new(tx)))
                .fold(Ok(()), |first, next| first.and(next)),
            Message::FindNode(payload) => {
                self.handle_find_node(peer, payload.content());
                Ok(())
            }
            Message::Neighbours(payload) => {
                debug!(peer = %peer, count = payload.content().neighbours.len(), "Neighbours");
                Ok(())
            }
            Message::KeepAlive(_) | Message::Disconnect(_) => Ok(()),
        };
        result.map_err(|err| self.dispatch_error(peer, err))
    }

    fn get_message(&self, id: &Hash) -> Option<Message> {
        if let Some(message) = self.cache.get(id) {
            return Some(message);
        }
        let block = Item::new(InventoryType::Block, *id);
        let tx = Item::new(InventoryType::Trx, *id);
        for item in [block, tx] {
            match self.lookup(&item) {
                Ok(Some(message)) => return Some(message),
                Ok(None) => {}
                Err(err) => {
                    warn!(%item, error = %err, "Lookup failed");
                    return None;
                }
            }
        }
        None
    }

    fn on_connect_peer(&self, peer: &PeerHandle) {
        if self.scoring.is_banned(&peer.addr()) {
            info!(peer = %peer, "Refusing banned peer");
            peer.disconnect(DisconnectReason::BadProtocol);
            return;
        }
        self.known.write().add_peer(peer.addr());
        // Announcing the head lets a lagging peer walk back to a common
        // ancestor through the orphan path.
        match self.chain.head() {
            Ok(head) if head.num() > 0 => {
                let item = Item::block(&head);
                self.known.write().mark(peer.addr(), item);
                let _ = peer.send(Message::inventory(Inventory::blocks([head])));
            }
            Ok(_) => {}
            Err(err) => error!(error = %err, "Cannot read head for new peer"),
        }
    }

    fn on_disconnect_peer(&self, peer: &PeerHandle) {
        self.known.write().remove_peer(&peer.addr());
        let retries = self.requests.lock().forget_peer(peer.addr(), Instant::now());
        self.apply_retries(retries);
    }
}
