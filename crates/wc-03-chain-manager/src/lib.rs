//! # wc-03-chain-manager
//!
//! Block acceptance for Witness-Chain.
//!
//! ## Pipeline
//!
//! ```text
//! push_encoded_block(block, raw)
//!   ├─ validate structure                  → InvalidBlock
//!   ├─ already stored?                     → Duplicate
//!   ├─ index[number-1] == parent?          → Unlinked
//!   ├─ extends head?                       → NotOnHead
//!   ├─ snapshot.advance()
//!   │    ├─ store raw block, index, transactions
//!   │    ├─ execute transactions
//!   │    ├─ move head
//!   │    └─ fork.update(block)
//!   ├─ any failure                         → snapshot.retreat()
//!   └─ flush_if_needed()                   (failure logged, block kept)
//! ```
//!
//! The block's state and its fork vote are written into one snapshot layer,
//! so they are either both visible or both gone.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::NoopExecutor;
pub use domain::*;
pub use ports::TransactionExecutor;
pub use service::ChainManager;
