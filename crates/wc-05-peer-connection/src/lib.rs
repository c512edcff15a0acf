//! # wc-05-peer-connection
//!
//! One tokio task per peer turns the byte stream into [`Message`]s and back.
//!
//! ## Responsibilities
//!
//! - Framing and family routing (via `wc-04-message-codec`)
//! - FIFO outbound queue per peer
//! - Keep-alive, idle timeout and the decode-error threshold
//! - Forwarding every other message to the [`ConnectionDelegate`]
//!
//! The connection never interprets chain-sync content. Business logic
//! lives in the delegate.
//!
//! ## Faults
//!
//! Decode and dispatch failures are values, not panics. Each one is logged
//! and published as a [`FaultReport`]; only transport failures, timeouts and
//! repeated decode errors close the connection. `on_disconnect_peer` fires
//! exactly once per connection.
//!
//! [`Message`]: wc_04_message_codec::Message

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::{Direction, PeerHandle, PeerRegistry};
pub use domain::*;
pub use ports::ConnectionDelegate;
pub use service::PeerNetwork;
