//! # Witness-Chain Test Suite
//!
//! Cross-subsystem flows over real loopback sockets, plus benchmarks.
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── src/
//! │   ├── harness.rs             # Full nodes wired like a node binary
//! │   └── integration/
//! │       ├── sync_flows.rs      # Propagation, catch-up, misbehaving peers
//! │       ├── consensus_flows.rs # Fork votes, rollback, flush and reopen
//! │       └── codec_properties.rs# Tag routing and framing over TCP
//! └── benches/
//!     └── core_benchmarks.rs     # Frame decode, deep snapshot reads, block apply
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All flows
//! cargo test -p wc-tests
//!
//! # By area
//! cargo test -p wc-tests integration::sync_flows
//! cargo test -p wc-tests integration::consensus_flows
//!
//! # Benchmarks
//! cargo bench -p wc-tests
//! ```

#[cfg(test)]
pub(crate) mod harness;
pub mod integration;
