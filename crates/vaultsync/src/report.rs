//! Outcome of a pull or push run

use std::path::PathBuf;

use crate::policy::Step;

/// An ignorable failure that was logged and skipped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IgnoredFailure {
    pub step: Step,
    pub dir: PathBuf,
    pub code: i32,
}

/// What happened during one run, beyond plain success
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Vaults processed by the run, in processing order
    pub vaults: Vec<String>,
    /// Every ignorable failure, in order of occurrence
    pub ignored: Vec<IgnoredFailure>,
    /// Vaults left mid-merge with conflicting history
    pub conflicts: Vec<String>,
    /// Vaults whose working tree could not be restored after decryption
    pub restore_failures: Vec<String>,
}

impl SyncReport {
    /// True when nothing needs manual attention
    pub fn is_clean(&self) -> bool {
        self.conflicts.is_empty() && self.restore_failures.is_empty()
    }

    pub fn ignored_for(&self, step: Step) -> impl Iterator<Item = &IgnoredFailure> {
        self.ignored.iter().filter(move |f| f.step == step)
    }
}
