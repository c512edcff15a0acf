//! tokio side of the peer layer: handles, the connection task and the
//! registry of live peers.

pub(crate) mod connection;
mod handle;
mod registry;

pub use handle::{Direction, PeerHandle};
pub use registry::PeerRegistry;
