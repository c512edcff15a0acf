mod cache;
mod config;
mod errors;
mod item;
mod known;
mod orphans;
mod requests;

pub use cache::*;
pub use config::*;
pub use errors::*;
pub use item::*;
pub use known::*;
pub use orphans::*;
pub use requests::*;
