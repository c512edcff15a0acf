//! Ports for the snapshot chain.
//!
//! - [`OrderedStore`]: the on-disk key-value engine (driven port)
//! - [`StorageManager`]: the logical-store view other subsystems consume
//!   (driving port, implemented by `SnapshotChain`)

mod storage;
mod store;

pub use storage::*;
pub use store::*;
