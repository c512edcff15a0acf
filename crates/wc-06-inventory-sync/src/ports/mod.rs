//! Ports for the sync protocol.
//!
//! - [`ChainGateway`]: block and transaction acceptance (driven port)
//! - [`PeerScoring`]: penalties for misbehaving peers (driven port)

mod chain;
mod scoring;

pub use chain::*;
pub use scoring::*;
