use bytes::Bytes;

use crate::domain::{CodecError, Family, Message};

/// Builds typed messages for one tag family.
///
/// The decoder only hands a factory tags from its own family; a factory
/// answers unassigned tags with [`CodecError::UnknownInFamily`].
pub trait MessageFactory: Send + Sync {
    fn family(&self) -> Family;

    fn create(&self, tag: u8, payload: Bytes) -> Result<Message, CodecError>;
}
