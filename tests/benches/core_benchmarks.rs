//! # Core Benchmarks
//!
//! - Frame decode: tag routing plus protobuf decode, per message family
//! - Snapshot reads: a key written at the bottom of a deep layer chain
//! - Block apply: push and pop through the chain manager

use std::hint::black_box;

use bytes::Bytes;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use shared_types::{Block, BlockHeader, BlockId, Transaction};
use wc_01_snapshot_chain::{SnapshotChain, SnapshotConfig, StorageManager, Store};
use wc_03_chain_manager::{ChainConfig, ChainManager};
use wc_04_message_codec::{Inventory, Message, MessageDecoder};

fn transaction(n: u32) -> Transaction {
    Transaction {
        contract: n.to_be_bytes().repeat(16),
        fee_limit: 1_000_000,
        signatures: vec![vec![0xAA; 65]],
        ..Default::default()
    }
}

fn block_on(parent: &BlockId, tx_count: u32) -> Block {
    let mut block = Block {
        header: Some(BlockHeader {
            number: parent.num() + 1,
            parent_hash: parent.hash().to_vec(),
            timestamp: 1_700_000_000_000 + parent.num() as i64 * 3_000,
            witness_address: vec![1; 20],
            version: 6,
            ..Default::default()
        }),
        transactions: (0..tx_count).map(transaction).collect(),
    };
    let root = block.compute_tx_root();
    if let Some(header) = block.header.as_mut() {
        header.tx_trie_root = root.to_vec();
    }
    block
}

fn bench_frame_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_decode");
    let decoder = MessageDecoder::standard();
    let genesis = BlockId::new([0; 32], 0);

    for tx_count in [0u32, 100, 1_000] {
        let frame = Message::block(block_on(&genesis, tx_count))
            .map(|m| m.encode())
            .unwrap_or_default();
        group.throughput(Throughput::Bytes(frame.len() as u64));
        group.bench_with_input(BenchmarkId::new("block", tx_count), &frame, |b, frame| {
            b.iter(|| black_box(decoder.decode(frame.clone())))
        });
    }

    let ids: Vec<_> = (0..1_000u32).map(|n| transaction(n).id()).collect();
    let inventory = Message::inventory(Inventory::transactions(ids)).encode();
    group.throughput(Throughput::Bytes(inventory.len() as u64));
    group.bench_function("inventory_1000", |b| {
        b.iter(|| black_box(decoder.decode(inventory.clone())))
    });

    let keep_alive: Bytes = Message::keep_alive(1_700_000_000_000).encode();
    group.bench_function("keep_alive", |b| {
        b.iter(|| black_box(decoder.decode(keep_alive.clone())))
    });

    group.finish();
}

fn bench_snapshot_reads(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot_read");

    for depth in [1usize, 16, 128] {
        let chain = SnapshotChain::new_in_memory(SnapshotConfig { max_depth: depth + 1 });
        let _ = chain.put(Store::Account, b"bottom", vec![1; 32]);
        for layer in 0..depth {
            if chain.advance().is_err() {
                break;
            }
            let _ = chain.put(Store::Account, &(layer as u64).to_be_bytes(), vec![2; 32]);
        }

        group.bench_with_input(BenchmarkId::new("bottom_key", depth), &chain, |b, chain| {
            b.iter(|| black_box(chain.get(Store::Account, b"bottom")))
        });
        group.bench_with_input(BenchmarkId::new("missing_key", depth), &chain, |b, chain| {
            b.iter(|| black_box(chain.get(Store::Account, b"absent")))
        });
    }

    group.finish();
}

fn bench_block_apply(c: &mut Criterion) {
    let mut group = c.benchmark_group("block_apply");

    for tx_count in [0u32, 100] {
        let Ok(chain) = ChainManager::in_memory(ChainConfig::default()) else {
            continue;
        };
        let Ok(head) = chain.head() else {
            continue;
        };
        let block = block_on(&head, tx_count);
        group.bench_with_input(
            BenchmarkId::new("push_pop", tx_count),
            &block,
            |b, block| {
                b.iter(|| {
                    let pushed = chain.push_block(block);
                    let popped = chain.pop_block();
                    black_box((pushed, popped))
                })
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_frame_decode,
    bench_snapshot_reads,
    bench_block_apply,
);

criterion_main!(benches);
