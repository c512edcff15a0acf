use bytes::Bytes;

use crate::domain::{CodecError, Family, Message, MessageType, Payload};
use crate::ports::MessageFactory;

/// Factory for the peer (discovery and keep-alive) family.
#[derive(Clone, Copy, Debug, Default)]
pub struct PeerMessageFactory;

impl MessageFactory for PeerMessageFactory {
    fn family(&self) -> Family {
        Family::Peer
    }

    fn create(&self, tag: u8, payload: Bytes) -> Result<Message, CodecError> {
        match MessageType::from_tag(tag) {
            Some(kind @ MessageType::Disconnect) => {
                Ok(Message::Disconnect(Payload::decode(kind, payload)?))
            }
            Some(kind @ MessageType::FindNode) => {
                Ok(Message::FindNode(Payload::decode(kind, payload)?))
            }
            Some(kind @ MessageType::Neighbours) => {
                Ok(Message::Neighbours(Payload::decode(kind, payload)?))
            }
            Some(kind @ MessageType::KeepAlive) => {
                Ok(Message::KeepAlive(Payload::decode(kind, payload)?))
            }
            _ => Err(CodecError::UnknownInFamily {
                family: Family::Peer,
                tag,
            }),
        }
    }
}
