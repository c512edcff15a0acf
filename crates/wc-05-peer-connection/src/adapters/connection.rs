//! The per-peer connection task.
//!
//! ```text
//!            ┌──────────── select! ────────────┐
//!  socket ──►│ frames.next()  ──► delegate     │
//!  handle ──►│ outbound.recv() ──► sink        │──► socket
//!            │ keep_alive.tick()               │
//!            │ idle timer                      │
//!            │ close.changed()                 │
//!            └─────────────────────────────────┘
//! ```

use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use shared_types::current_timestamp_ms;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};
use tokio_util::codec::Framed;
use tracing::{debug, info, trace, warn};
use wc_04_message_codec::{DisconnectReason, FrameCodec, Message, MessageDecoder};

use super::handle::CloseMode;
use super::{PeerHandle, PeerRegistry};
use crate::domain::{ConnectionConfig, ConnectionFault, FaultReport};
use crate::ports::ConnectionDelegate;

/// Everything a connection task shares with the network that spawned it.
pub(crate) struct ConnectionContext<D> {
    pub config: ConnectionConfig,
    pub delegate: Arc<D>,
    pub decoder: Arc<MessageDecoder>,
    pub registry: PeerRegistry,
    pub faults: broadcast::Sender<FaultReport>,
}

impl<D> ConnectionContext<D> {
    fn report(&self, peer: &PeerHandle, fault: ConnectionFault, fatal: bool) {
        if fatal {
            warn!(peer = %peer, %fault, "Connection fault, closing");
        } else {
            debug!(peer = %peer, %fault, "Connection fault");
        }
        // No subscribers is fine.
        let _ = self.faults.send(FaultReport {
            peer: peer.addr(),
            fault,
            fatal,
        });
    }
}

/// How the select loop ended.
enum Ending {
    /// Write out what is queued, then close.
    Flush,
    /// Drop the queue; optionally tell the peer why first.
    Abort(Option<DisconnectReason>),
}

pub(crate) async fn run<S, D>(
    stream: S,
    peer: PeerHandle,
    mut outbound: mpsc::UnboundedReceiver<Message>,
    mut close: watch::Receiver<CloseMode>,
    ctx: Arc<ConnectionContext<D>>,
) where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    D: ConnectionDelegate,
{
    let config = &ctx.config;
    let codec = FrameCodec::with_decoder(&config.codec, Arc::clone(&ctx.decoder));
    let (mut sink, mut frames) = Framed::new(stream, codec).split();

    let idle_timeout = config.idle_timeout();
    let idle = sleep(idle_timeout);
    tokio::pin!(idle);

    let keep_alive_every = config.keep_alive_interval();
    let mut keep_alive = interval_at(Instant::now() + keep_alive_every, keep_alive_every);
    keep_alive.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let ending = loop {
        tokio::select! {
            inbound = frames.next() => match inbound {
                Some(Ok(Ok(decoded))) => {
                    idle.as_mut().reset(Instant::now() + idle_timeout);
                    peer.traffic().record_in(decoded.consumed_bytes);
                    match decoded.message {
                        Message::KeepAlive(_) => trace!(peer = %peer, "Keep-alive"),
                        Message::Disconnect(payload) => {
                            let reason = payload.content().kind();
                            ctx.report(&peer, ConnectionFault::RemoteDisconnect(reason), true);
                            break Ending::Abort(None);
                        }
                        message => {
                            if let Err(err) = ctx.delegate.on_message(&peer, message) {
                                let disconnect = err.disconnect;
                                ctx.report(
                                    &peer,
                                    ConnectionFault::Dispatch(err),
                                    disconnect.is_some(),
                                );
                                if let Some(code) = disconnect {
                                    break Ending::Abort(Some(code));
                                }
                            }
                        }
                    }
                }
                Some(Ok(Err(err))) => {
                    idle.as_mut().reset(Instant::now() + idle_timeout);
                    let errors = peer.traffic().record_decode_error();
                    let fatal = errors >= u64::from(config.max_decode_errors);
                    ctx.report(&peer, ConnectionFault::Decode(err), fatal);
                    if fatal {
                        break Ending::Abort(Some(DisconnectReason::BadMessage));
                    }
                }
                Some(Err(err)) => {
                    ctx.report(&peer, ConnectionFault::Transport(err.to_string()), true);
                    break Ending::Abort(None);
                }
                None => {
                    debug!(peer = %peer, "Remote closed the stream");
                    break Ending::Abort(None);
                }
            },
            queued = outbound.recv() => {
                let Some(message) = queued else {
                    break Ending::Abort(None);
                };
                peer.dequeued(1);
                let len = message.encoded_len();
                if let Err(err) = sink.send(message).await {
                    ctx.report(&peer, ConnectionFault::Transport(err.to_string()), true);
                    break Ending::Abort(None);
                }
                peer.traffic().record_out(len);
                keep_alive.reset();
            }
            _ = keep_alive.tick() => {
                let ping = Message::keep_alive(current_timestamp_ms());
                let len = ping.encoded_len();
                if let Err(err) = sink.send(ping).await {
                    ctx.report(&peer, ConnectionFault::Transport(err.to_string()), true);
                    break Ending::Abort(None);
                }
                peer.traffic().record_out(len);
            }
            _ = &mut idle => {
                ctx.report(&peer, ConnectionFault::IdleTimeout(idle_timeout), true);
                break Ending::Abort(Some(DisconnectReason::Timeout));
            }
            changed = close.changed() => {
                let mode = match changed {
                    Ok(()) => *close.borrow_and_update(),
                    Err(_) => CloseMode::Abort,
                };
                match mode {
                    CloseMode::Open => {}
                    CloseMode::Graceful => break Ending::Flush,
                    CloseMode::Abort => break Ending::Abort(None),
                }
            }
        }
    };

    // From here on sends fail with `Closed`.
    let first = peer.mark_closed();
    outbound.close();

    match ending {
        Ending::Flush => {
            let mut flushed = 0usize;
            while let Ok(message) = outbound.try_recv() {
                peer.dequeued(1);
                let len = message.encoded_len();
                if sink.feed(message).await.is_err() {
                    break;
                }
                peer.traffic().record_out(len);
                flushed += 1;
            }
            trace!(peer = %peer, flushed, "Flushed send queue");
        }
        Ending::Abort(goodbye) => {
            let mut dropped = 0usize;
            while outbound.try_recv().is_ok() {
                peer.dequeued(1);
                dropped += 1;
            }
            if dropped > 0 {
                debug!(peer = %peer, dropped, "Dropped queued messages");
            }
            if let Some(reason) = goodbye {
                let _ = sink.feed(Message::disconnect(reason)).await;
            }
        }
    }
    if let Err(err) = sink.close().await {
        trace!(peer = %peer, error = %err, "Error while closing stream");
    }

    ctx.registry.remove(&peer.addr());
    if first {
        let stats = peer.stats();
        info!(
            peer = %peer,
            messages_in = stats.messages_in,
            messages_out = stats.messages_out,
            "Peer disconnected"
        );
        ctx.delegate.on_disconnect_peer(&peer);
    }
}
