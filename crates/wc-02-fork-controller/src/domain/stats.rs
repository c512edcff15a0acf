use std::collections::BTreeSet;

use wc_01_snapshot_chain::SnapshotError;

/// Slot value of a witness that supports the version.
pub const UPGRADE: u8 = 1;
/// Slot value of a witness that does not (or no longer) supports the version.
pub const DOWNGRADE: u8 = 0;

/// Per-witness vote array for one version, indexed by witness slot.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VoteStats(Vec<u8>);

impl VoteStats {
    /// All slots downgraded.
    pub fn zeroed(witnesses: usize) -> Self {
        Self(vec![DOWNGRADE; witnesses])
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Non-empty and every slot upgraded.
    pub fn is_passed(&self) -> bool {
        !self.0.is_empty() && self.0.iter().all(|&slot| slot == UPGRADE)
    }

    pub fn upgrade(&mut self, slot: usize) {
        if let Some(value) = self.0.get_mut(slot) {
            *value = UPGRADE;
        }
    }

    /// Returns whether the slot changed.
    pub fn downgrade(&mut self, slot: usize) -> bool {
        match self.0.get_mut(slot) {
            Some(value) if *value != DOWNGRADE => {
                *value = DOWNGRADE;
                true
            }
            _ => false,
        }
    }

    pub fn clear(&mut self) {
        self.0.fill(DOWNGRADE);
    }

    pub fn upgraded_slots(&self) -> usize {
        self.0.iter().filter(|&&slot| slot == UPGRADE).count()
    }
}

/// `Store::ForkStats` key for a version.
pub fn stats_key(version: u32) -> [u8; 4] {
    version.to_be_bytes()
}

/// `Store::ForkStats` key of the list of every version that has a vote
/// array. Never four bytes long, so it cannot collide with a `stats_key`.
pub const VOTED_VERSIONS_KEY: &[u8] = b"voted-versions";

pub fn encode_versions(versions: &BTreeSet<u32>) -> Vec<u8> {
    versions.iter().flat_map(|v| v.to_be_bytes()).collect()
}

pub fn decode_versions(bytes: &[u8]) -> Result<BTreeSet<u32>, SnapshotError> {
    if bytes.len() % 4 != 0 {
        return Err(SnapshotError::Corrupt {
            what: "voted versions",
            reason: format!("length {}", bytes.len()),
        });
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

/// Stored arrays only ever hold `UPGRADE` or `DOWNGRADE`.
pub fn decode_stats(bytes: Vec<u8>) -> Result<VoteStats, SnapshotError> {
    if let Some(bad) = bytes.iter().find(|&&b| b != UPGRADE && b != DOWNGRADE) {
        return Err(SnapshotError::Corrupt {
            what: "fork stats",
            reason: format!("slot value {bad}"),
        });
    }
    Ok(VoteStats(bytes))
}
