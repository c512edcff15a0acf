//! # Domain Layer for the Snapshot Chain
//!
//! - **store**: logical store names and physical key layout
//! - **snapshot**: a single copy-on-write layer
//! - **links**: successor lookup table shared by all layers of a chain
//! - **properties**: encodings for well-known chain properties
//! - **config** / **errors**

mod config;
mod errors;
mod links;
mod properties;
mod snapshot;
mod store;

pub use config::*;
pub use errors::*;
pub use links::*;
pub use properties::*;
pub use snapshot::*;
pub use store::*;
