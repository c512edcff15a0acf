//! # Peer Network Service
//!
//! Accepts and dials connections, registers them and spawns one
//! connection task per peer.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use wc_04_message_codec::{DisconnectReason, Message, MessageDecoder};

use crate::adapters::connection::{self, ConnectionContext};
use crate::adapters::{Direction, PeerHandle, PeerRegistry};
use crate::domain::{ConnectionConfig, ConnectionError, FaultReport};
use crate::ports::ConnectionDelegate;

const FAULT_CHANNEL_CAPACITY: usize = 256;

/// All connections of one node, sharing one delegate.
pub struct PeerNetwork<D: ConnectionDelegate> {
    ctx: Arc<ConnectionContext<D>>,
}

impl<D: ConnectionDelegate> PeerNetwork<D> {
    pub fn new(config: ConnectionConfig, delegate: Arc<D>) -> Self {
        Self::with_registry(config, delegate, PeerRegistry::new())
    }

    /// Share `registry` with the delegate, which needs it to relay and to
    /// answer peer queries.
    pub fn with_registry(
        config: ConnectionConfig,
        delegate: Arc<D>,
        registry: PeerRegistry,
    ) -> Self {
        let (faults, _) = broadcast::channel(FAULT_CHANNEL_CAPACITY);
        Self {
            ctx: Arc::new(ConnectionContext {
                config,
                delegate,
                decoder: Arc::new(MessageDecoder::standard()),
                registry,
                faults,
            }),
        }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.ctx.config
    }

    pub fn delegate(&self) -> &Arc<D> {
        &self.ctx.delegate
    }

    pub fn registry(&self) -> &PeerRegistry {
        &self.ctx.registry
    }

    /// Every connection fault from now on.
    pub fn subscribe_faults(&self) -> broadcast::Receiver<FaultReport> {
        self.ctx.faults.subscribe()
    }

    /// Take over an established stream. Must be called inside a tokio
    /// runtime.
    pub fn attach<S>(
        &self,
        stream: S,
        remote: SocketAddr,
        direction: Direction,
    ) -> Result<PeerHandle, ConnectionError>
    where
        S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        attach(&self.ctx, stream, remote, direction)
    }

    /// Bind `addr` and accept connections until the returned task is
    /// aborted. Returns the bound address.
    pub async fn listen(
        &self,
        addr: SocketAddr,
    ) -> Result<(SocketAddr, JoinHandle<()>), ConnectionError> {
        let listener = TcpListener::bind(addr).await?;
        let local = listener.local_addr()?;
        info!(addr = %local, "Listening for peers");

        let ctx = Arc::clone(&self.ctx);
        let task = tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, remote)) => {
                        let _ = stream.set_nodelay(true);
                        if let Err(err) = attach(&ctx, stream, remote, Direction::Inbound) {
                            debug!(peer = %remote, error = %err, "Refused inbound connection");
                        }
                    }
                    Err(err) => warn!(error = %err, "Accept failed"),
                }
            }
        });
        Ok((local, task))
    }

    /// Dial `addr` within the configured connect timeout.
    pub async fn connect(&self, addr: SocketAddr) -> Result<PeerHandle, ConnectionError> {
        if self.ctx.registry.contains(&addr) {
            return Err(ConnectionError::DuplicatePeer(addr));
        }
        let stream = timeout(self.ctx.config.connect_timeout(), TcpStream::connect(addr))
            .await
            .map_err(|_| ConnectionError::ConnectTimeout(addr))??;
        let _ = stream.set_nodelay(true);
        attach(&self.ctx, stream, addr, Direction::Outbound)
    }

    pub fn peer(&self, addr: &SocketAddr) -> Option<PeerHandle> {
        self.ctx.registry.get(addr)
    }

    pub fn peers(&self) -> Vec<PeerHandle> {
        self.ctx.registry.handles()
    }

    pub fn peer_count(&self) -> usize {
        self.ctx.registry.len()
    }

    /// Queue `message` to every peer except `except`.
    pub fn broadcast(&self, message: &Message, except: Option<SocketAddr>) -> usize {
        self.ctx.registry.broadcast(message, except)
    }

    /// Say goodbye to every peer and close after their queues drain.
    pub fn shutdown(&self) {
        let peers = self.ctx.registry.handles();
        info!(peers = peers.len(), "Closing all peer connections");
        for peer in peers {
            peer.disconnect(DisconnectReason::Requested);
        }
    }
}

fn attach<S, D>(
    ctx: &Arc<ConnectionContext<D>>,
    stream: S,
    remote: SocketAddr,
    direction: Direction,
) -> Result<PeerHandle, ConnectionError>
where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    D: ConnectionDelegate,
{
    let (peer, outbound, close) = PeerHandle::new(remote, direction, ctx.config.send_queue_warn);
    ctx.registry.insert(peer.clone(), ctx.config.max_peers)?;
    info!(peer = %remote, ?direction, peers = ctx.registry.len(), "Peer connected");
    // Before the task starts, so no message can reach the delegate first.
    ctx.delegate.on_connect_peer(&peer);
    tokio::spawn(connection::run(
        stream,
        peer.clone(),
        outbound,
        close,
        Arc::clone(ctx),
    ));
    Ok(peer)
}
