//! # Shared Types Crate
//!
//! Chain entities used by every Witness-Chain subsystem.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: `Block`, `BlockHeader` and `Transaction` are
//!   defined once, as protobuf messages, so the bytes stored in the snapshot
//!   chain and the bytes relayed to peers are the same encoding.
//! - **Content Identity**: every identifier (`BlockId`, transaction id) is
//!   derived from content, never from object identity.

pub mod entities;
pub mod errors;

pub use entities::*;
pub use errors::*;
