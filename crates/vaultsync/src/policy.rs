//! Failure policy for external tool invocations
//!
//! Every command the protocol issues belongs to one [`Step`]. Whether a
//! non-zero exit aborts the run or is logged and skipped is decided by the
//! table in [`Step::classification`], never at the call site.

use anyhow::Result;
use std::fmt;
use std::path::Path;
use tracing::{debug, error, warn};
use vaultsync_core::ToolOutput;

use crate::error::SyncError;
use crate::report::{IgnoredFailure, SyncReport};

/// What a non-zero exit means for the run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Abort the whole run with the tool's exit code
    Fatal,
    /// Log, record in the report, continue
    Ignorable,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fatal => "fatal",
            Self::Ignorable => "ignorable",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Command classes issued by backup, push and pull
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    BackupCheckout,
    BackupStage,
    BackupCommit,
    VaultInit,
    VaultSetMainBranch,
    VaultStage,
    VaultCommit,
    RemoveReconcileRemote,
    LeaveBackupBranch,
    AbsorbBackupBranch,
    DeleteBackupBranch,
    Encrypt,
    UmbrellaStage,
    UmbrellaCommit,
    UmbrellaPush,
    UmbrellaPull,
    Decrypt,
    Restore,
    AddReconcileRemote,
    FetchReconcile,
    MergeReconcile,
}

impl Step {
    pub fn classification(&self) -> Classification {
        use Classification::{Fatal, Ignorable};

        match self {
            Self::BackupCheckout => Fatal,
            Self::BackupStage => Fatal,
            // "nothing to commit" in a snapshot is expected
            Self::BackupCommit => Ignorable,
            Self::VaultInit => Fatal,
            Self::VaultSetMainBranch => Fatal,
            Self::VaultStage => Fatal,
            Self::VaultCommit => Fatal,
            Self::RemoveReconcileRemote => Ignorable,
            Self::LeaveBackupBranch => Ignorable,
            // Reported as a conflict by the orchestrator
            Self::AbsorbBackupBranch => Ignorable,
            Self::DeleteBackupBranch => Ignorable,
            Self::Encrypt => Fatal,
            Self::UmbrellaStage => Fatal,
            Self::UmbrellaCommit => Fatal,
            Self::UmbrellaPush => Fatal,
            Self::UmbrellaPull => Fatal,
            Self::Decrypt => Fatal,
            Self::Restore => Ignorable,
            Self::AddReconcileRemote => Ignorable,
            Self::FetchReconcile => Ignorable,
            // Conflicts are reported loudly by the orchestrator
            Self::MergeReconcile => Ignorable,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BackupCheckout => "backup_checkout",
            Self::BackupStage => "backup_stage",
            Self::BackupCommit => "backup_commit",
            Self::VaultInit => "vault_init",
            Self::VaultSetMainBranch => "vault_set_main_branch",
            Self::VaultStage => "vault_stage",
            Self::VaultCommit => "vault_commit",
            Self::RemoveReconcileRemote => "remove_reconcile_remote",
            Self::LeaveBackupBranch => "leave_backup_branch",
            Self::AbsorbBackupBranch => "absorb_backup_branch",
            Self::DeleteBackupBranch => "delete_backup_branch",
            Self::Encrypt => "encrypt",
            Self::UmbrellaStage => "umbrella_stage",
            Self::UmbrellaCommit => "umbrella_commit",
            Self::UmbrellaPush => "umbrella_push",
            Self::UmbrellaPull => "umbrella_pull",
            Self::Decrypt => "decrypt",
            Self::Restore => "restore",
            Self::AddReconcileRemote => "add_reconcile_remote",
            Self::FetchReconcile => "fetch_reconcile",
            Self::MergeReconcile => "merge_reconcile",
        }
    }

    pub fn all() -> &'static [Self] {
        &[
            Self::BackupCheckout,
            Self::BackupStage,
            Self::BackupCommit,
            Self::VaultInit,
            Self::VaultSetMainBranch,
            Self::VaultStage,
            Self::VaultCommit,
            Self::RemoveReconcileRemote,
            Self::LeaveBackupBranch,
            Self::AbsorbBackupBranch,
            Self::DeleteBackupBranch,
            Self::Encrypt,
            Self::UmbrellaStage,
            Self::UmbrellaCommit,
            Self::UmbrellaPush,
            Self::UmbrellaPull,
            Self::Decrypt,
            Self::Restore,
            Self::AddReconcileRemote,
            Self::FetchReconcile,
            Self::MergeReconcile,
        ]
    }

    fn fatal_error(&self, dir: &Path, output: &ToolOutput) -> SyncError {
        match self {
            Self::Decrypt => SyncError::DecryptionFailed {
                archive: dir.to_path_buf(),
                code: output.exit_code(),
            },
            _ => SyncError::ToolFailure {
                step: *self,
                dir: dir.to_path_buf(),
                code: output.exit_code(),
                stderr: output.stderr.trim().to_string(),
            },
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Apply the policy to a finished invocation.
///
/// Returns `Ok(true)` on success, `Ok(false)` for a recorded ignorable
/// failure, and the matching [`SyncError`] for a fatal one. For
/// [`Step::Decrypt`], `dir` is the archive path.
pub fn settle(step: Step, dir: &Path, output: &ToolOutput, report: &mut SyncReport) -> Result<bool> {
    if output.success() {
        debug!(%step, dir = %dir.display(), "ok");
        return Ok(true);
    }

    let classification = step.classification();
    match classification {
        Classification::Fatal => {
            error!(
                %step,
                %classification,
                code = output.exit_code(),
                "{} failed in {}. Aborting.",
                step,
                dir.display()
            );
            Err(step.fatal_error(dir, output).into())
        }
        Classification::Ignorable => {
            warn!(
                %step,
                %classification,
                code = output.exit_code(),
                "{} failed in {}.",
                step,
                dir.display()
            );
            report.ignored.push(IgnoredFailure {
                step,
                dir: dir.to_path_buf(),
                code: output.exit_code(),
            });
            Ok(false)
        }
    }
}
