//! Ports for peer connections.
//!
//! - [`ConnectionDelegate`]: business logic behind every connection (driven port)

mod delegate;

pub use delegate::*;
