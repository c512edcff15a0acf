//! # Domain Layer for the Message Codec
//!
//! - **tags**: type tags and family ranges
//! - **payloads**: protobuf payload structures
//! - **message**: the closed `Message` union and payload wrappers

mod config;
mod errors;
mod message;
mod payloads;
mod tags;

pub use config::*;
pub use errors::*;
pub use message::*;
pub use payloads::*;
pub use tags::*;
