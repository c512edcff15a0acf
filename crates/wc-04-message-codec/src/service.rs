//! # Message Decoder
//!
//! Routes a frame to the factory of its tag family. Decoding is a pure
//! function of the frame: it touches no connection state, and every byte
//! value of the tag maps to a defined outcome.

use bytes::Bytes;
use tracing::trace;

use crate::adapters::{ChainSyncFactory, PeerMessageFactory};
use crate::domain::{CodecError, Family, Message};
use crate::ports::MessageFactory;

/// A decoded message and the number of frame bytes it consumed.
#[derive(Clone, Debug, PartialEq)]
pub struct Decoded {
    pub message: Message,
    pub consumed_bytes: usize,
}

/// Family dispatch over two factories.
pub struct MessageDecoder<P = PeerMessageFactory, C = ChainSyncFactory> {
    peer: P,
    chain: C,
}

impl MessageDecoder {
    pub fn standard() -> Self {
        Self::new(PeerMessageFactory, ChainSyncFactory)
    }
}

impl Default for MessageDecoder {
    fn default() -> Self {
        Self::standard()
    }
}

impl<P: MessageFactory, C: MessageFactory> MessageDecoder<P, C> {
    pub fn new(peer: P, chain: C) -> Self {
        Self { peer, chain }
    }

    /// Decode one frame body (tag plus payload).
    pub fn decode(&self, frame: Bytes) -> Result<Decoded, CodecError> {
        let consumed_bytes = frame.len();
        let Some(&tag) = frame.first() else {
            return Err(CodecError::EmptyFrame);
        };
        let payload = frame.slice(1..);
        let message = match Family::of(tag) {
            Some(Family::Peer) => self.peer.create(tag, payload)?,
            Some(Family::ChainSync) => self.chain.create(tag, payload)?,
            None => return Err(CodecError::UnrecognizedType(tag)),
        };
        trace!(message = %message, bytes = consumed_bytes, "Decoded message");
        Ok(Decoded {
            message,
            consumed_bytes,
        })
    }
}
