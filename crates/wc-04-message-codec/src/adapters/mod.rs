//! Factories for both tag families and the tokio frame codec.

mod chain_factory;
mod frame_codec;
mod peer_factory;

pub use chain_factory::ChainSyncFactory;
pub use frame_codec::FrameCodec;
pub use peer_factory::PeerMessageFactory;
