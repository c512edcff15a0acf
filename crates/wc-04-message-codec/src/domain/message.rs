//! The closed set of protocol messages.

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};
use shared_types::{sha256, Block, BlockId, EntityError, Hash, Transaction};

use super::{
    BlocksPayload, CodecError, DisconnectPayload, DisconnectReason, Endpoint, FindNodePayload,
    Inventory, InventoryType, KeepAlivePayload, MessageType, NeighboursPayload,
    TransactionsPayload,
};

/// Decoded payload together with the exact bytes it was decoded from.
///
/// Equality compares content only; two payloads that differ in unknown
/// fields or field order are equal.
#[derive(Clone)]
pub struct Payload<T> {
    content: T,
    raw: Bytes,
}

impl<T: prost::Message + Default> Payload<T> {
    /// Encode freshly built content.
    pub fn new(content: T) -> Self {
        let raw = Bytes::from(content.encode_to_vec());
        Self { content, raw }
    }

    /// Decode `raw`, keeping it for relay.
    pub fn decode(kind: MessageType, raw: Bytes) -> Result<Self, CodecError> {
        let content = T::decode(raw.clone()).map_err(|e| CodecError::Malformed {
            kind,
            reason: e.to_string(),
        })?;
        Ok(Self { content, raw })
    }
}

impl<T> Payload<T> {
    pub fn content(&self) -> &T {
        &self.content
    }

    pub fn into_content(self) -> T {
        self.content
    }

    pub fn raw(&self) -> &Bytes {
        &self.raw
    }
}

impl<T: PartialEq> PartialEq for Payload<T> {
    fn eq(&self, other: &Self) -> bool {
        self.content == other.content
    }
}

impl<T: fmt::Debug> fmt::Debug for Payload<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Payload")
            .field("content", &self.content)
            .field("raw_len", &self.raw.len())
            .finish()
    }
}

/// A single block plus its id, computed once at construction.
#[derive(Clone, Debug)]
pub struct BlockMessage {
    payload: Payload<Block>,
    id: BlockId,
}

impl BlockMessage {
    pub fn new(block: Block) -> Result<Self, EntityError> {
        Self::from_payload(Payload::new(block))
    }

    pub fn from_payload(payload: Payload<Block>) -> Result<Self, EntityError> {
        let id = payload.content().id()?;
        Ok(Self { payload, id })
    }

    pub fn id(&self) -> BlockId {
        self.id
    }

    pub fn block(&self) -> &Block {
        self.payload.content()
    }

    pub fn payload(&self) -> &Payload<Block> {
        &self.payload
    }
}

impl PartialEq for BlockMessage {
    fn eq(&self, other: &Self) -> bool {
        self.payload.content() == other.payload.content()
    }
}

/// Protocol message.
///
/// The variant always matches the type tag it was decoded from or will be
/// encoded with.
#[derive(Clone, Debug, PartialEq)]
pub enum Message {
    // chain-sync family
    Transaction(Payload<Transaction>),
    Block(BlockMessage),
    Transactions(Payload<TransactionsPayload>),
    Blocks(Payload<BlocksPayload>),
    FetchInventoryData(Payload<Inventory>),
    ItemNotFound(Payload<Inventory>),
    BlockInventory(Payload<Inventory>),
    TransactionInventory(Payload<Inventory>),
    // peer family
    Disconnect(Payload<DisconnectPayload>),
    FindNode(Payload<FindNodePayload>),
    Neighbours(Payload<NeighboursPayload>),
    KeepAlive(Payload<KeepAlivePayload>),
}

impl Message {
    pub fn block(block: Block) -> Result<Self, EntityError> {
        Ok(Message::Block(BlockMessage::new(block)?))
    }

    pub fn transaction(tx: Transaction) -> Self {
        Message::Transaction(Payload::new(tx))
    }

    pub fn blocks(blocks: Vec<Block>) -> Self {
        Message::Blocks(Payload::new(BlocksPayload { blocks }))
    }

    pub fn transactions(transactions: Vec<Transaction>) -> Self {
        Message::Transactions(Payload::new(TransactionsPayload { transactions }))
    }

    /// Announcement; the variant follows the inventory type.
    pub fn inventory(inventory: Inventory) -> Self {
        match inventory.kind() {
            Some(InventoryType::Block) => Message::BlockInventory(Payload::new(inventory)),
            _ => Message::TransactionInventory(Payload::new(inventory)),
        }
    }

    pub fn fetch(inventory: Inventory) -> Self {
        Message::FetchInventoryData(Payload::new(inventory))
    }

    pub fn item_not_found(inventory: Inventory) -> Self {
        Message::ItemNotFound(Payload::new(inventory))
    }

    pub fn keep_alive(timestamp: i64) -> Self {
        Message::KeepAlive(Payload::new(KeepAlivePayload { timestamp }))
    }

    pub fn disconnect(reason: DisconnectReason) -> Self {
        Message::Disconnect(Payload::new(DisconnectPayload::new(reason)))
    }

    pub fn find_node(from: Endpoint, target_id: Vec<u8>, timestamp: i64) -> Self {
        Message::FindNode(Payload::new(FindNodePayload {
            from: Some(from),
            target_id,
            timestamp,
        }))
    }

    pub fn neighbours(from: Endpoint, neighbours: Vec<Endpoint>, timestamp: i64) -> Self {
        Message::Neighbours(Payload::new(NeighboursPayload {
            from: Some(from),
            neighbours,
            timestamp,
        }))
    }

    pub fn message_type(&self) -> MessageType {
        match self {
            Message::Transaction(_) => MessageType::Transaction,
            Message::Block(_) => MessageType::Block,
            Message::Transactions(_) => MessageType::Transactions,
            Message::Blocks(_) => MessageType::Blocks,
            Message::FetchInventoryData(_) => MessageType::FetchInventoryData,
            Message::ItemNotFound(_) => MessageType::ItemNotFound,
            Message::BlockInventory(_) => MessageType::BlockInventory,
            Message::TransactionInventory(_) => MessageType::TransactionInventory,
            Message::Disconnect(_) => MessageType::Disconnect,
            Message::FindNode(_) => MessageType::FindNode,
            Message::Neighbours(_) => MessageType::Neighbours,
            Message::KeepAlive(_) => MessageType::KeepAlive,
        }
    }

    /// Payload bytes as received, or as first encoded.
    pub fn payload_bytes(&self) -> &Bytes {
        match self {
            Message::Transaction(p) => p.raw(),
            Message::Block(b) => b.payload().raw(),
            Message::Transactions(p) => p.raw(),
            Message::Blocks(p) => p.raw(),
            Message::FetchInventoryData(p)
            | Message::ItemNotFound(p)
            | Message::BlockInventory(p)
            | Message::TransactionInventory(p) => p.raw(),
            Message::Disconnect(p) => p.raw(),
            Message::FindNode(p) => p.raw(),
            Message::Neighbours(p) => p.raw(),
            Message::KeepAlive(p) => p.raw(),
        }
    }

    /// Frame body: type tag followed by the payload bytes.
    pub fn encode(&self) -> Bytes {
        let payload = self.payload_bytes();
        let mut frame = BytesMut::with_capacity(payload.len() + 1);
        frame.put_u8(self.message_type().tag());
        frame.extend_from_slice(payload);
        frame.freeze()
    }

    /// Content identity used for deduplication and `get_message` lookups.
    ///
    /// Blocks and transactions use their chain ids; every other message is
    /// identified by a digest of its frame.
    pub fn content_id(&self) -> Hash {
        match self {
            Message::Block(b) => *b.id().hash(),
            Message::Transaction(p) => p.content().id(),
            _ => sha256(&self.encode()),
        }
    }

    /// Inventory carried by announce, fetch and not-found messages.
    pub fn as_inventory(&self) -> Option<&Inventory> {
        match self {
            Message::FetchInventoryData(p)
            | Message::ItemNotFound(p)
            | Message::BlockInventory(p)
            | Message::TransactionInventory(p) => Some(p.content()),
            _ => None,
        }
    }

    /// Serialized size of the payload, for traffic accounting.
    pub fn encoded_len(&self) -> usize {
        self.payload_bytes().len() + 1
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::Block(b) => write!(f, "{} {}", self.message_type(), b.id()),
            _ => match self.as_inventory() {
                Some(inventory) => write!(f, "{} ({} ids)", self.message_type(), inventory.len()),
                None => write!(f, "{}", self.message_type()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message as _;
    use shared_types::BlockHeader;

    fn block(number: u64) -> Block {
        Block {
            header: Some(BlockHeader {
                number,
                parent_hash: vec![0; 32],
                witness_address: vec![3; 20],
                ..Default::default()
            }),
            transactions: vec![],
        }
    }

    #[test]
    fn test_block_message_equality_is_by_content() {
        let a = BlockMessage::new(block(5)).unwrap();
        // Same block with an unknown trailing field (tag 15, varint 1).
        let mut raw = block(5).encode_to_vec();
        raw.extend_from_slice(&[0x78, 0x01]);
        let b = BlockMessage::from_payload(
            Payload::decode(MessageType::Block, Bytes::from(raw.clone())).unwrap(),
        )
        .unwrap();

        assert_eq!(a, b);
        assert_ne!(a.payload().raw(), b.payload().raw());
        assert_eq!(b.payload().raw().as_ref(), raw.as_slice());
        assert_ne!(a, BlockMessage::new(block(6)).unwrap());
    }

    #[test]
    fn test_encode_prefixes_tag() {
        let message = Message::keep_alive(7);
        let frame = message.encode();
        assert_eq!(frame[0], MessageType::KeepAlive.tag());
        assert_eq!(&frame[1..], message.payload_bytes().as_ref());
        assert_eq!(message.encoded_len(), frame.len());
    }

    #[test]
    fn test_inventory_constructor_picks_variant() {
        let blocks = Message::inventory(Inventory::blocks([BlockId::new([1; 32], 3)]));
        assert_eq!(blocks.message_type(), MessageType::BlockInventory);
        let txs = Message::inventory(Inventory::transactions([[2; 32]]));
        assert_eq!(txs.message_type(), MessageType::TransactionInventory);
    }

    #[test]
    fn test_content_id_uses_chain_ids() {
        let b = block(9);
        let id = b.id().unwrap();
        assert_eq!(Message::block(b).unwrap().content_id(), *id.hash());

        let tx = Transaction {
            contract: vec![1],
            ..Default::default()
        };
        assert_eq!(Message::transaction(tx.clone()).content_id(), tx.id());
    }

    #[test]
    fn test_block_message_requires_header() {
        assert_eq!(
            BlockMessage::new(Block::default()).unwrap_err(),
            EntityError::MissingHeader
        );
    }
}
