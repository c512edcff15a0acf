//! Ports for the message codec.

mod factory;

pub use factory::*;
