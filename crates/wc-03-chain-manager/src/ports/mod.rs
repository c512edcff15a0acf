//! Ports for the chain manager.
//!
//! - [`TransactionExecutor`]: contract execution (driven port)

mod executor;

pub use executor::*;
