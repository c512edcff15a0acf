//! # wc-04-message-codec
//!
//! Typed protocol messages and the byte-level codec around them.
//!
//! ## Frame Layout
//!
//! ```text
//! ┌──────────────┬─────────┬──────────────────────────┐
//! │ length (u32) │ tag (1) │ protobuf payload         │
//! └──────────────┴─────────┴──────────────────────────┘
//!   FrameCodec     MessageDecoder → family factory
//! ```
//!
//! ## Families
//!
//! | Range         | Family     | Factory               |
//! |---------------|------------|-----------------------|
//! | `0x01..=0x1F` | chain sync | [`ChainSyncFactory`]  |
//! | `0x20..=0x7F` | peer       | [`PeerMessageFactory`]|
//! | anything else | -          | `UnrecognizedType`    |
//!
//! Every decoded message keeps the payload bytes it arrived with. Relaying
//! a message re-sends those bytes, so fields this node does not understand
//! survive the hop.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::{ChainSyncFactory, FrameCodec, PeerMessageFactory};
pub use domain::*;
pub use ports::MessageFactory;
pub use service::{Decoded, MessageDecoder};
