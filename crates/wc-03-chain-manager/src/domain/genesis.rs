use shared_types::{Block, BlockHeader, ZERO_HASH};

/// Block 0. It has no producer and never votes.
pub fn genesis_block(timestamp: i64) -> Block {
    let mut block = Block {
        header: Some(BlockHeader {
            number: 0,
            parent_hash: ZERO_HASH.to_vec(),
            timestamp,
            ..Default::default()
        }),
        transactions: vec![],
    };
    let root = block.compute_tx_root();
    if let Some(header) = block.header.as_mut() {
        header.tx_trie_root = root.to_vec();
    }
    block
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_genesis_is_deterministic() {
        let a = genesis_block(42).id().unwrap();
        let b = genesis_block(42).id().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.num(), 0);
        assert_ne!(genesis_block(43).id().unwrap(), a);
    }
}
