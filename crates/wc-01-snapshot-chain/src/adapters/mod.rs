//! Adapters for the snapshot chain ports.

mod memory_store;

pub use memory_store::MemoryStore;
