use bytes::Bytes;

use crate::domain::{
    BlockMessage, CodecError, Family, Inventory, InventoryType, Message, MessageType, Payload,
};
use crate::ports::MessageFactory;

/// Factory for the chain-sync family.
#[derive(Clone, Copy, Debug, Default)]
pub struct ChainSyncFactory;

impl MessageFactory for ChainSyncFactory {
    fn family(&self) -> Family {
        Family::ChainSync
    }

    fn create(&self, tag: u8, payload: Bytes) -> Result<Message, CodecError> {
        let kind = match MessageType::from_tag(tag) {
            Some(kind) if kind.family() == Family::ChainSync => kind,
            _ => {
                return Err(CodecError::UnknownInFamily {
                    family: Family::ChainSync,
                    tag,
                })
            }
        };
        match kind {
            MessageType::Transaction => Ok(Message::Transaction(Payload::decode(kind, payload)?)),
            MessageType::Block => {
                let payload = Payload::decode(kind, payload)?;
                let message =
                    BlockMessage::from_payload(payload).map_err(|e| CodecError::InvalidContent {
                        kind,
                        reason: e.to_string(),
                    })?;
                Ok(Message::Block(message))
            }
            MessageType::Transactions => Ok(Message::Transactions(Payload::decode(kind, payload)?)),
            MessageType::Blocks => Ok(Message::Blocks(Payload::decode(kind, payload)?)),
            MessageType::FetchInventoryData => Ok(Message::FetchInventoryData(
                inventory(kind, payload, None)?,
            )),
            MessageType::ItemNotFound => Ok(Message::ItemNotFound(inventory(kind, payload, None)?)),
            MessageType::BlockInventory => Ok(Message::BlockInventory(inventory(
                kind,
                payload,
                Some(InventoryType::Block),
            )?)),
            MessageType::TransactionInventory => Ok(Message::TransactionInventory(inventory(
                kind,
                payload,
                Some(InventoryType::Trx),
            )?)),
            _ => Err(CodecError::UnknownInFamily {
                family: Family::ChainSync,
                tag,
            }),
        }
    }
}

/// Decode an inventory and check its declared id type.
fn inventory(
    kind: MessageType,
    payload: Bytes,
    expected: Option<InventoryType>,
) -> Result<Payload<Inventory>, CodecError> {
    let payload: Payload<Inventory> = Payload::decode(kind, payload)?;
    let declared = payload.content().kind();
    match (declared, expected) {
        (None, _) => Err(CodecError::InvalidContent {
            kind,
            reason: format!("unknown inventory type {}", payload.content().inventory_type),
        }),
        (Some(declared), Some(expected)) if declared != expected => {
            Err(CodecError::InvalidContent {
                kind,
                reason: format!("inventory type {declared:?} does not match message"),
            })
        }
        _ => Ok(payload),
    }
}
