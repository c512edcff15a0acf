use std::fmt;
use std::hash::{Hash, Hasher};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{mpsc, watch};
use tracing::warn;
use wc_04_message_codec::{DisconnectReason, Message};

use crate::domain::{ConnectionError, TrafficSnapshot, TrafficStats};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    Inbound,
    Outbound,
}

/// Requested end state of a connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum CloseMode {
    Open,
    /// Send everything queued, then close.
    Graceful,
    /// Close now, dropping the queue.
    Abort,
}

struct PeerInner {
    addr: SocketAddr,
    direction: Direction,
    outbound: mpsc::UnboundedSender<Message>,
    queued: AtomicUsize,
    queue_warn: usize,
    close: watch::Sender<CloseMode>,
    closed: AtomicBool,
    traffic: TrafficStats,
    connected_at: Instant,
}

/// Cheap, cloneable handle to one connection.
///
/// Identity is the remote endpoint.
#[derive(Clone)]
pub struct PeerHandle {
    inner: Arc<PeerInner>,
}

impl PeerHandle {
    pub(crate) fn new(
        addr: SocketAddr,
        direction: Direction,
        queue_warn: usize,
    ) -> (
        Self,
        mpsc::UnboundedReceiver<Message>,
        watch::Receiver<CloseMode>,
    ) {
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let (close, close_rx) = watch::channel(CloseMode::Open);
        let handle = Self {
            inner: Arc::new(PeerInner {
                addr,
                direction,
                outbound,
                queued: AtomicUsize::new(0),
                queue_warn,
                close,
                closed: AtomicBool::new(false),
                traffic: TrafficStats::default(),
                connected_at: Instant::now(),
            }),
        };
        (handle, outbound_rx, close_rx)
    }

    pub fn addr(&self) -> SocketAddr {
        self.inner.addr
    }

    pub fn direction(&self) -> Direction {
        self.inner.direction
    }

    pub fn connected_for(&self) -> std::time::Duration {
        self.inner.connected_at.elapsed()
    }

    pub fn stats(&self) -> TrafficSnapshot {
        self.inner.traffic.snapshot()
    }

    pub(crate) fn traffic(&self) -> &TrafficStats {
        &self.inner.traffic
    }

    /// Queue a message. Messages to one peer leave in the order queued.
    pub fn send(&self, message: Message) -> Result<(), ConnectionError> {
        if self.is_closed() {
            return Err(ConnectionError::Closed(self.inner.addr));
        }
        self.inner
            .outbound
            .send(message)
            .map_err(|_| ConnectionError::Closed(self.inner.addr))?;
        let queued = self.inner.queued.fetch_add(1, Ordering::Relaxed) + 1;
        if queued == self.inner.queue_warn {
            warn!(peer = %self.inner.addr, queued, "Send queue is backing up");
        }
        Ok(())
    }

    /// Messages queued but not yet written.
    pub fn queued(&self) -> usize {
        self.inner.queued.load(Ordering::Relaxed)
    }

    pub(crate) fn dequeued(&self, count: usize) {
        self.inner.queued.fetch_sub(count, Ordering::Relaxed);
    }

    /// Close after flushing the queue.
    pub fn close(&self) {
        self.request_close(CloseMode::Graceful);
    }

    /// Close immediately, dropping anything still queued.
    pub fn abort(&self) {
        self.request_close(CloseMode::Abort);
    }

    /// Tell the peer why, then close gracefully.
    pub fn disconnect(&self, reason: DisconnectReason) {
        if self.send(Message::disconnect(reason)).is_ok() {
            self.close();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Returns `true` only for the call that actually closed the handle.
    pub(crate) fn mark_closed(&self) -> bool {
        !self.inner.closed.swap(true, Ordering::AcqRel)
    }

    fn request_close(&self, mode: CloseMode) {
        self.inner.close.send_if_modified(|current| {
            let escalate = match (*current, mode) {
                (CloseMode::Open, _) => true,
                (CloseMode::Graceful, CloseMode::Abort) => true,
                _ => false,
            };
            if escalate {
                *current = mode;
            }
            escalate
        });
    }
}

impl PartialEq for PeerHandle {
    fn eq(&self, other: &Self) -> bool {
        self.inner.addr == other.inner.addr
    }
}

impl Eq for PeerHandle {}

impl Hash for PeerHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.addr.hash(state);
    }
}

impl fmt::Debug for PeerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeerHandle")
            .field("addr", &self.inner.addr)
            .field("direction", &self.inner.direction)
            .field("queued", &self.queued())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl fmt::Display for PeerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner.addr)
    }
}
