//! # Fork Controller Service
//!
//! Reads and writes vote arrays through the [`StorageManager`] it was bound
//! to at construction. When that storage manager is the snapshot chain, a
//! vote lands in the same layer as the block that cast it.

use std::collections::BTreeSet;
use std::sync::Arc;

use parking_lot::Mutex;
use shared_types::Block;
use tracing::{debug, info, trace};
use wc_01_snapshot_chain::{StorageManager, Store};

use crate::domain::{
    decode_stats, decode_versions, encode_versions, stats_key, ForkConfig, ForkError, VoteStats,
    VOTED_VERSIONS_KEY,
};

/// What `update` did with a block's vote.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VoteOutcome {
    /// The producer is not in the active witness list.
    UnknownWitness,
    /// The declared version predates voting.
    BelowLegacy,
    /// The declared version had already passed; nothing recorded.
    AlreadyPassed,
    /// The producer's slot was upgraded.
    Recorded { slot: usize, passed: bool },
}

pub struct ForkController {
    config: ForkConfig,
    storage: Arc<dyn StorageManager>,
    /// One critical section for `pass`, `update` and `reset`.
    monitor: Mutex<()>,
}

impl ForkController {
    pub fn new(config: ForkConfig, storage: Arc<dyn StorageManager>) -> Self {
        Self {
            config,
            storage,
            monitor: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &ForkConfig {
        &self.config
    }

    /// Whether the rules of `version` are active.
    pub fn pass(&self, version: u32) -> Result<bool, ForkError> {
        let _monitor = self.monitor.lock();
        self.pass_locked(version)
    }

    /// Record the vote carried by an accepted block.
    pub fn update(&self, block: &Block) -> Result<VoteOutcome, ForkError> {
        let witness = block.witness()?;
        let version = block.version()?;

        let _monitor = self.monitor.lock();
        let witnesses = self.storage.active_witnesses()?;
        let Some(slot) = witnesses.iter().position(|w| *w == witness) else {
            trace!(version, "Vote from witness outside the active list ignored");
            return Ok(VoteOutcome::UnknownWitness);
        };
        if self.config.below_legacy(version) {
            return Ok(VoteOutcome::BelowLegacy);
        }

        self.downgrade_newer(version, slot)?;

        let existing = self.load(version)?;
        if existing.as_ref().is_some_and(VoteStats::is_passed) {
            return Ok(VoteOutcome::AlreadyPassed);
        }

        let mut stats = match existing {
            Some(stats) if stats.len() == witnesses.len() => stats,
            Some(stats) => {
                debug!(
                    version,
                    stored = stats.len(),
                    witnesses = witnesses.len(),
                    "Vote array does not match witness count, reallocating"
                );
                VoteStats::zeroed(witnesses.len())
            }
            None => {
                self.track(version)?;
                VoteStats::zeroed(witnesses.len())
            }
        };
        stats.upgrade(slot);
        let passed = stats.is_passed();
        self.store(version, stats)?;

        if passed {
            info!(version, witnesses = witnesses.len(), "Protocol version passed");
        }
        Ok(VoteOutcome::Recorded { slot, passed })
    }

    /// Zero every version with votes that has not passed.
    ///
    /// Called when the active witness list changes shape and slot indices no
    /// longer identify the same witnesses.
    pub fn reset(&self) -> Result<(), ForkError> {
        let _monitor = self.monitor.lock();
        let versions = self.versions()?;
        for &version in &versions {
            if let Some(mut stats) = self.load(version)? {
                if !stats.is_passed() {
                    stats.clear();
                    self.store(version, stats)?;
                }
            }
        }
        debug!(versions = versions.len(), "Reset fork votes");
        Ok(())
    }

    /// Stored vote array for a version.
    pub fn stats(&self, version: u32) -> Result<Option<VoteStats>, ForkError> {
        let _monitor = self.monitor.lock();
        self.load(version)
    }

    fn pass_locked(&self, version: u32) -> Result<bool, ForkError> {
        if let Some(activation_height) = self.config.legacy_activation_height(version) {
            let height = self.storage.latest_block_header_number()?;
            return Ok(height >= activation_height);
        }
        Ok(self.load(version)?.is_some_and(|stats| stats.is_passed()))
    }

    /// Configured versions plus every version a block has voted for.
    fn versions(&self) -> Result<BTreeSet<u32>, ForkError> {
        let mut versions = self.voted_versions()?;
        versions.extend(self.config.known_versions.iter().copied());
        Ok(versions)
    }

    fn voted_versions(&self) -> Result<BTreeSet<u32>, ForkError> {
        match self.storage.get(Store::ForkStats, VOTED_VERSIONS_KEY)? {
            Some(bytes) => Ok(decode_versions(&bytes)?),
            None => Ok(BTreeSet::new()),
        }
    }

    /// Add `version` to the voted list in the current layer.
    fn track(&self, version: u32) -> Result<(), ForkError> {
        let mut voted = self.voted_versions()?;
        if voted.insert(version) {
            self.storage
                .put(Store::ForkStats, VOTED_VERSIONS_KEY, encode_versions(&voted))?;
        }
        Ok(())
    }

    /// A vote for `version` retracts the voter's support for every newer
    /// version that has not passed.
    fn downgrade_newer(&self, version: u32, slot: usize) -> Result<(), ForkError> {
        for newer in self.versions()?.into_iter().filter(|&v| v > version) {
            let Some(mut stats) = self.load(newer)? else {
                continue;
            };
            if !stats.is_passed() && stats.downgrade(slot) {
                trace!(version = newer, slot, "Retracted vote");
                self.store(newer, stats)?;
            }
        }
        Ok(())
    }

    fn load(&self, version: u32) -> Result<Option<VoteStats>, ForkError> {
        match self.storage.get(Store::ForkStats, &stats_key(version))? {
            Some(bytes) => Ok(Some(decode_stats(bytes)?)),
            None => Ok(None),
        }
    }

    fn store(&self, version: u32, stats: VoteStats) -> Result<(), ForkError> {
        self.storage
            .put(Store::ForkStats, &stats_key(version), stats.into_bytes())?;
        Ok(())
    }
}
