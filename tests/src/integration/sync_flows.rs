//! # Sync Flows
//!
//! Inventory propagation between real nodes:
//!
//! 1. **Relay**: a block published on one end of a line of nodes reaches the
//!    other end through the middle node.
//! 2. **Catch-up**: a node joining late walks back from the announced head
//!    through the orphan path until it links to its own chain.
//! 3. **Misbehaviour**: a peer feeding invalid blocks is cut off while honest
//!    peers keep syncing.

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures::{SinkExt, StreamExt};
    use tokio::net::TcpStream;
    use tokio::time::timeout;
    use tokio_util::codec::Framed;
    use wc_04_message_codec::{CodecConfig, DisconnectReason, FrameCodec, Message};

    use crate::harness::{child_of, eventually, tx, witness, TestNode};

    // =========================================================================
    // RELAY
    // =========================================================================

    #[tokio::test]
    async fn test_blocks_reach_the_far_end_of_a_line() {
        let a = TestNode::spawn().await;
        let b = TestNode::spawn().await;
        let c = TestNode::spawn().await;
        b.connect(&a).await;
        c.connect(&b).await;

        let mut produced = Vec::new();
        for _ in 0..3 {
            produced.push(a.produce(witness(0), 0, vec![]));
        }

        eventually("c reaches a's head", || c.head() == a.head()).await;
        for id in &produced {
            assert!(b.chain.has_block(id).unwrap());
            assert!(c.chain.has_block(id).unwrap());
        }
        eventually("requests settle", || {
            b.sync.pending_requests() == 0 && c.sync.pending_requests() == 0
        })
        .await;
    }

    #[tokio::test]
    async fn test_transactions_flood_the_network() {
        let a = TestNode::spawn().await;
        let b = TestNode::spawn().await;
        let c = TestNode::spawn().await;
        b.connect(&a).await;
        c.connect(&b).await;

        let id = a.sync.publish_transaction(tx(7)).unwrap();
        eventually("c pooled the transaction", || {
            c.chain.has_transaction(&id).unwrap()
        })
        .await;
        assert!(b.chain.has_transaction(&id).unwrap());
    }

    #[tokio::test]
    async fn test_included_transactions_leave_the_pool_everywhere() {
        let a = TestNode::spawn().await;
        let b = TestNode::spawn().await;
        b.connect(&a).await;

        let pending = tx(3);
        let id = a.sync.publish_transaction(pending.clone()).unwrap();
        eventually("b pooled the transaction", || {
            b.chain.has_transaction(&id).unwrap()
        })
        .await;

        a.produce(witness(0), 0, vec![pending]);
        eventually("b applied the block", || b.head() == a.head()).await;
        assert!(b.chain.pending_transactions().is_empty());
        assert_eq!(b.chain.get_transaction(&id).unwrap(), Some(tx(3)));
    }

    // =========================================================================
    // CATCH-UP
    // =========================================================================

    #[tokio::test]
    async fn test_late_joiner_catches_up_through_orphans() {
        let a = TestNode::spawn().await;
        for _ in 0..6 {
            a.produce(witness(0), 0, vec![]);
        }

        let b = TestNode::spawn().await;
        b.connect(&a).await;

        eventually("b reaches a's head", || b.head() == a.head()).await;
        assert_eq!(b.chain.head_number().unwrap(), 6);
        eventually("orphans and requests drain", || {
            b.sync.orphan_count() == 0 && b.sync.pending_requests() == 0
        })
        .await;
    }

    #[tokio::test]
    async fn test_late_joiner_relays_what_it_catches_up_on() {
        let a = TestNode::spawn().await;
        for _ in 0..3 {
            a.produce(witness(0), 0, vec![]);
        }
        let b = TestNode::spawn().await;
        let c = TestNode::spawn().await;
        c.connect(&b).await;
        b.connect(&a).await;

        eventually("c reaches a's head", || c.head() == a.head()).await;
    }

    // =========================================================================
    // MISBEHAVIOUR AND SHUTDOWN
    // =========================================================================

    #[tokio::test]
    async fn test_peer_sending_invalid_blocks_is_cut_off() {
        let a = TestNode::spawn().await;
        let b = TestNode::spawn().await;
        b.connect(&a).await;

        let stream = TcpStream::connect(a.addr).await.unwrap();
        let rogue_addr = stream.local_addr().unwrap();
        let mut rogue = Framed::new(stream, FrameCodec::new(&CodecConfig::default()));
        eventually("rogue registered", || a.network.peer_count() == 2).await;

        for salt in 0..2 {
            let mut bad = child_of(&a.head(), witness(salt), 0, vec![]);
            if let Some(header) = bad.header.as_mut() {
                header.witness_address = vec![1; 5];
            }
            rogue.send(Message::block(bad).unwrap()).await.unwrap();
        }

        let goodbye = timeout(Duration::from_secs(2), async {
            loop {
                match rogue.next().await {
                    Some(Ok(Ok(decoded))) => {
                        if let Message::Disconnect(_) = &decoded.message {
                            return decoded.message;
                        }
                    }
                    other => panic!("connection ended without a goodbye: {other:?}"),
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(goodbye, Message::disconnect(DisconnectReason::BadBlock));
        eventually("rogue dropped", || a.network.peer_count() == 1).await;
        assert_eq!(a.scores.score(&rogue_addr), 0);

        a.produce(witness(0), 0, vec![]);
        eventually("honest peer still syncs", || b.head() == a.head()).await;
    }

    #[tokio::test]
    async fn test_shutdown_disconnects_every_peer() {
        let a = TestNode::spawn().await;
        let b = TestNode::spawn().await;
        let c = TestNode::spawn().await;
        b.connect(&a).await;
        c.connect(&a).await;
        assert_eq!(a.network.peer_count(), 2);

        a.network.shutdown();
        eventually("peers saw the goodbye", || {
            b.network.peer_count() == 0 && c.network.peer_count() == 0
        })
        .await;
        eventually("a released its peers", || a.network.peer_count() == 0).await;
    }

    #[tokio::test]
    async fn test_find_node_answers_with_other_peers() {
        let a = TestNode::spawn().await;
        let b = TestNode::spawn().await;
        let c = TestNode::spawn().await;
        b.connect(&a).await;
        c.connect(&a).await;

        let stream = TcpStream::connect(a.addr).await.unwrap();
        let local = stream.local_addr().unwrap();
        let mut asking = Framed::new(stream, FrameCodec::new(&CodecConfig::default()));
        eventually("asking peer registered", || a.network.peer_count() == 3).await;

        asking
            .send(Message::find_node(local.into(), vec![0xAB; 32], 0))
            .await
            .unwrap();
        let neighbours = timeout(Duration::from_secs(2), async {
            loop {
                match asking.next().await {
                    Some(Ok(Ok(decoded))) => {
                        if let Message::Neighbours(payload) = decoded.message {
                            return payload.into_content().neighbours;
                        }
                    }
                    other => panic!("no neighbours before the stream ended: {other:?}"),
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(neighbours.len(), 2);
        assert!(neighbours
            .iter()
            .all(|endpoint| endpoint.socket_addr() != Some(local)));
    }
}
