//! # Codec Properties
//!
//! Whole-byte-range and randomized checks of the decoder, and every message
//! variant carried over a real TCP connection.

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bytes::Bytes;
    use futures::{SinkExt, StreamExt};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use shared_types::{BlockId, Transaction};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::time::timeout;
    use tokio_util::codec::Framed;
    use wc_04_message_codec::{
        CodecConfig, CodecError, DisconnectReason, Endpoint, Family, FrameCodec, Inventory,
        Message, MessageDecoder, MessageType,
    };

    use crate::harness::{child_of, tx, witness};

    fn every_variant() -> Vec<Message> {
        let genesis = BlockId::new([0; 32], 0);
        let block = child_of(&genesis, witness(0), 6, vec![tx(1), tx(2)]);
        let id = block.id().unwrap();
        let node: Endpoint = "127.0.0.1:18888".parse::<std::net::SocketAddr>().unwrap().into();

        vec![
            Message::transaction(tx(3)),
            Message::block(block.clone()).unwrap(),
            Message::transactions(vec![tx(4), tx(5)]),
            Message::blocks(vec![block]),
            Message::fetch(Inventory::blocks([id])),
            Message::item_not_found(Inventory::transactions([tx(6).id()])),
            Message::inventory(Inventory::blocks([id])),
            Message::inventory(Inventory::transactions([tx(7).id()])),
            Message::disconnect(DisconnectReason::TooManyPeers),
            Message::find_node(node.clone(), vec![0x11; 32], 1_700_000_000_000),
            Message::neighbours(node.clone(), vec![node], 1_700_000_000_000),
            Message::keep_alive(1_700_000_000_000),
        ]
    }

    #[test]
    fn test_every_variant_is_covered() {
        let mut kinds: Vec<MessageType> = every_variant()
            .iter()
            .map(Message::message_type)
            .collect();
        kinds.dedup();
        assert_eq!(kinds, MessageType::ALL.to_vec());
    }

    #[test]
    fn test_every_tag_byte_has_a_defined_outcome() {
        let decoder = MessageDecoder::standard();
        for tag in 0..=u8::MAX {
            let result = decoder.decode(Bytes::from(vec![tag]));
            match (MessageType::from_tag(tag), Family::of(tag)) {
                (Some(kind), _) => {
                    if let Ok(decoded) = &result {
                        assert_eq!(decoded.message.message_type(), kind);
                        assert_eq!(decoded.consumed_bytes, 1);
                    }
                }
                (None, Some(family)) => {
                    assert_eq!(result, Err(CodecError::UnknownInFamily { family, tag }));
                }
                (None, None) => {
                    assert_eq!(result, Err(CodecError::UnrecognizedType(tag)));
                }
            }
        }
    }

    #[test]
    fn test_random_frames_never_panic() {
        let decoder = MessageDecoder::standard();
        let mut rng = StdRng::seed_from_u64(0x5EED);
        for _ in 0..5_000 {
            let len = rng.gen_range(1..96);
            let mut frame = vec![0u8; len];
            rng.fill(&mut frame[..]);
            if let Ok(decoded) = decoder.decode(Bytes::from(frame)) {
                assert_eq!(decoded.consumed_bytes, len);
                assert_eq!(decoded.message.message_type().tag(), decoded.message.encode()[0]);
            }
        }
    }

    #[test]
    fn test_payload_mutations_keep_the_family() {
        let decoder = MessageDecoder::standard();
        let mut rng = StdRng::seed_from_u64(42);
        for message in every_variant() {
            let encoded = message.encode();
            let kind = message.message_type();
            for _ in 0..200 {
                let mut frame = encoded.to_vec();
                if frame.len() > 1 {
                    let at = rng.gen_range(1..frame.len());
                    frame[at] = rng.gen();
                }
                match decoder.decode(Bytes::from(frame)) {
                    Ok(decoded) => assert_eq!(decoded.message.message_type(), kind),
                    Err(CodecError::Malformed { kind: failed, .. })
                    | Err(CodecError::InvalidContent { kind: failed, .. }) => {
                        assert_eq!(failed, kind)
                    }
                    Err(other) => panic!("{kind}: unexpected {other}"),
                }
            }
        }
    }

    #[tokio::test]
    async fn test_every_variant_crosses_a_socket_in_order() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let sent = every_variant();

        let writer = {
            let sent = sent.clone();
            tokio::spawn(async move {
                let stream = TcpStream::connect(addr).await.unwrap();
                let mut framed = Framed::new(stream, FrameCodec::new(&CodecConfig::default()));
                for message in sent {
                    framed.feed(message).await.unwrap();
                }
                framed.flush().await.unwrap();
            })
        };

        let (stream, _) = listener.accept().await.unwrap();
        let mut framed = Framed::new(stream, FrameCodec::new(&CodecConfig::default()));
        let mut received = Vec::new();
        while received.len() < sent.len() {
            let decoded = timeout(Duration::from_secs(2), framed.next())
                .await
                .unwrap()
                .unwrap()
                .unwrap()
                .unwrap();
            assert_eq!(decoded.consumed_bytes, decoded.message.encoded_len());
            received.push(decoded.message);
        }
        writer.await.unwrap();

        assert_eq!(received, sent);
        for (message, original) in received.iter().zip(&sent) {
            assert_eq!(message.content_id(), original.content_id());
        }
    }

    #[tokio::test]
    async fn test_oversized_frame_ends_the_stream() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let small = CodecConfig {
            max_frame_length: 64,
        };

        tokio::spawn(async move {
            let stream = TcpStream::connect(addr).await.unwrap();
            let mut framed = Framed::new(stream, FrameCodec::new(&CodecConfig::default()));
            let big = Transaction {
                contract: vec![7; 256],
                ..Default::default()
            };
            let _ = framed.send(Message::transaction(big)).await;
        });

        let (stream, _) = listener.accept().await.unwrap();
        let mut framed = Framed::new(stream, FrameCodec::new(&small));
        let next = timeout(Duration::from_secs(2), framed.next()).await.unwrap();
        assert!(matches!(next, Some(Err(_))));
    }
}
