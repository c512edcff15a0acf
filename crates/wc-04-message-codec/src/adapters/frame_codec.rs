//! Length-delimited transport framing.

use std::io;
use std::sync::Arc;

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder, LengthDelimitedCodec};

use crate::adapters::{ChainSyncFactory, PeerMessageFactory};
use crate::domain::{CodecConfig, CodecError, Message};
use crate::ports::MessageFactory;
use crate::service::{Decoded, MessageDecoder};

/// tokio codec: 4-byte big-endian length, then tag and payload.
///
/// Each item is itself a `Result`: a frame that arrived intact but does not
/// decode is a per-message error, while an `io::Error` (including an
/// oversized frame) ends the stream.
pub struct FrameCodec<P = PeerMessageFactory, C = ChainSyncFactory> {
    frames: LengthDelimitedCodec,
    decoder: Arc<MessageDecoder<P, C>>,
}

impl FrameCodec {
    pub fn new(config: &CodecConfig) -> Self {
        Self::with_decoder(config, Arc::new(MessageDecoder::standard()))
    }
}

impl<P, C> FrameCodec<P, C> {
    pub fn with_decoder(config: &CodecConfig, decoder: Arc<MessageDecoder<P, C>>) -> Self {
        Self {
            frames: LengthDelimitedCodec::builder()
                .max_frame_length(config.max_frame_length)
                .new_codec(),
            decoder,
        }
    }
}

impl<P: MessageFactory, C: MessageFactory> Decoder for FrameCodec<P, C> {
    type Item = Result<Decoded, CodecError>;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.frames.decode(src)? {
            Some(frame) => Ok(Some(self.decoder.decode(frame.freeze()))),
            None => Ok(None),
        }
    }
}

impl<P, C> Encoder<Message> for FrameCodec<P, C> {
    type Error = io::Error;

    fn encode(&mut self, item: Message, dst: &mut BytesMut) -> Result<(), Self::Error> {
        self.frames.encode(item.encode(), dst)
    }
}
