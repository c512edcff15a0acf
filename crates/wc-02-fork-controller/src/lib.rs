//! # wc-02-fork-controller
//!
//! Decides which protocol versions are active.
//!
//! ## Voting
//!
//! Every accepted block carries the version its producer supports. The
//! controller keeps one byte per witness slot for each version:
//!
//! ```text
//!   version 5: [1, 1, 1, 0]   ← slot 3 has not produced a v5 block yet
//!   version 6: [0, 1, 0, 0]
//! ```
//!
//! A version is active once every slot of its array is `1`. Voting for a
//! version retracts the voter's support for every newer version that has not
//! passed yet.
//!
//! ## Legacy Activation
//!
//! Versions up to [`LegacyActivation::version`] predate voting and are active
//! purely by chain height. Whether a deployment has such versions at all is
//! configuration ([`ForkConfig::legacy`]).
//!
//! ## Concurrency
//!
//! `pass`, `update` and `reset` are mutually exclusive. The controller is an
//! ordinary value: the chain manager owns it and hands out `Arc` handles.

pub mod domain;
pub mod service;

pub use domain::*;
pub use service::{ForkController, VoteOutcome};
