use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;
use wc_04_message_codec::{CodecError, DisconnectReason};

/// Errors from connection management operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectionError {
    #[error("Connection to {0} is closed")]
    Closed(SocketAddr),

    #[error("Already connected to {0}")]
    DuplicatePeer(SocketAddr),

    #[error("Peer limit of {0} reached")]
    TooManyPeers(usize),

    #[error("Connecting to {0} timed out")]
    ConnectTimeout(SocketAddr),

    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for ConnectionError {
    fn from(err: std::io::Error) -> Self {
        ConnectionError::Io(err.to_string())
    }
}

/// Failure reported by the delegate for one message.
///
/// `disconnect` asks the connection to say goodbye and close.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct DispatchError {
    pub reason: String,
    pub disconnect: Option<DisconnectReason>,
}

impl DispatchError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            disconnect: None,
        }
    }

    pub fn disconnect(reason: impl Into<String>, code: DisconnectReason) -> Self {
        Self {
            reason: reason.into(),
            disconnect: Some(code),
        }
    }
}

/// Something that went wrong on one connection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectionFault {
    #[error("Decode failed: {0}")]
    Decode(CodecError),

    #[error("Dispatch failed: {0}")]
    Dispatch(DispatchError),

    #[error("Transport failed: {0}")]
    Transport(String),

    #[error("No inbound traffic for {0:?}")]
    IdleTimeout(Duration),

    #[error("Peer disconnected: {0:?}")]
    RemoteDisconnect(DisconnectReason),
}

/// Published on the fault channel for every connection fault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaultReport {
    pub peer: SocketAddr,
    pub fault: ConnectionFault,
    /// Whether the connection closed because of this fault.
    pub fatal: bool,
}
