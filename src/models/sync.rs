//! Outcome of a reconciliation pass

use serde::{Deserialize, Serialize};

/// Counters describing one reconciliation pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncResult {
    /// Distinct remote records after duplicate keys collapsed
    pub fetched: u64,

    /// Records inserted locally
    pub added: u64,

    /// Records whose image was updated
    pub updated: u64,

    /// Records removed locally
    pub removed: u64,

    /// Remote records that matched their local copy
    pub unchanged: u64,

    /// Individual store operations that failed
    pub failed: u64,

    /// Removals were skipped because the remote set was incomplete
    pub removals_skipped: bool,
}

impl SyncResult {
    /// Total number of writes applied to the store
    pub fn records_changed(&self) -> u64 {
        self.added + self.updated + self.removed
    }

    /// True when the pass applied no writes and none failed
    pub fn is_noop(&self) -> bool {
        self.records_changed() == 0 && self.failed == 0
    }
}
