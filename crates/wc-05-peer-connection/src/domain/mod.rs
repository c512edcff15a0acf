mod config;
mod errors;
mod stats;

pub use config::*;
pub use errors::*;
pub use stats::*;
