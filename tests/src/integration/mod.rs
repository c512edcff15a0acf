//! # Integration Flows
//!
//! Every flow runs complete nodes over loopback TCP. Nothing is mocked
//! below the sync service: blocks travel as frames, land in the chain
//! manager and move snapshot layers.

pub mod codec_properties;
pub mod consensus_flows;
pub mod sync_flows;
