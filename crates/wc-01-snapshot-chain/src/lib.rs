//! # wc-01-snapshot-chain
//!
//! Copy-on-write state layering for Witness-Chain.
//!
//! ## Role in System
//!
//! Every state mutation (blocks, accounts, witness list, fork votes) is
//! written into the *current* snapshot. Speculative work happens in a fresh
//! layer created by `advance()`; discarding it is `retreat()`. Older layers
//! are merged into the underlying ordered store by `flush()`.
//!
//! ```text
//!   current ──previous──→ layer ──previous──→ layer ──previous──→ [root store]
//!      ↑                    │
//!      └──── successor ─────┘   (lookup table, never keeps a layer alive)
//! ```
//!
//! ## Crash Safety
//!
//! A flush writes its merged batch to a checkpoint store before touching the
//! root store. `SnapshotChain::open` replays a leftover checkpoint, so a
//! crash mid-flush never leaves half of a layer (e.g. a block without its
//! fork vote) in the root store.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::MemoryStore;
pub use domain::*;
pub use ports::{OrderedStore, StorageManager, WriteBatch};
pub use service::SnapshotChain;
