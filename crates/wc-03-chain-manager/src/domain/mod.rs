mod config;
mod errors;
mod genesis;
mod pool;

pub use config::*;
pub use errors::*;
pub use genesis::*;
pub use pool::*;
