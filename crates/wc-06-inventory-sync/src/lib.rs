//! # wc-06-inventory-sync
//!
//! Block and transaction propagation by inventory.
//!
//! ## Exchange
//!
//! ```text
//!  node A                                   node B
//!    │ ── BlockInventory [id] ───────────────► │  B lacks id
//!    │ ◄─────────────── FetchInventoryData [id] │  (unless cached or in flight)
//!    │ ── Block ─────────────────────────────► │  push_block → relay to peers
//!    │ ◄──────────────────── ItemNotFound [id] │  (when A no longer has it)
//! ```
//!
//! ## Orphans
//!
//! A block whose parent is missing is held, keyed by that parent, and the
//! parent is fetched from the same peer. Accepting a block releases every
//! orphan waiting on it, lowest number first.
//!
//! ## Timeouts
//!
//! A fetch with no transfer within `request_timeout_ms` moves to the next
//! peer that announced the item, up to `max_retries` times.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::ScoreBook;
pub use domain::*;
pub use ports::{ChainGateway, Penalty, PeerScoring};
pub use service::SyncService;
