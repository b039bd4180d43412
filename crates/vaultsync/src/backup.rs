//! Backup manager
//!
//! Before any destructive step, every vault is copied into the backup
//! folder and, when it has history, committed onto the backup branch inside
//! the copy. The folder is rebuilt from scratch on every run.

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::info;
use vaultsync_core::paths::BACKUP_FOLDER;
use vaultsync_core::Layout;
use walkdir::WalkDir;

use crate::discovery::Vault;
use crate::policy::{settle, Step};
use crate::report::SyncReport;
use crate::vcs::Vcs;

/// Branch carrying the reconciliation snapshot
pub const BACKUP_BRANCH: &str = "backup_branch";
/// Commit message of a snapshot
pub const BACKUP_MESSAGE: &str = "Backup";

/// One vault's entry in the snapshot manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub name: String,
    /// Snapshot location relative to the umbrella root
    pub path: PathBuf,
    pub has_history: bool,
}

/// Manifest written next to the snapshots
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotManifest {
    /// ISO timestamp
    pub created_at: String,
    pub vaults: Vec<SnapshotEntry>,
}

pub struct BackupManager<'a> {
    layout: &'a Layout,
    vcs: &'a dyn Vcs,
}

impl<'a> BackupManager<'a> {
    pub fn new(layout: &'a Layout, vcs: &'a dyn Vcs) -> Self {
        Self { layout, vcs }
    }

    /// Snapshot every vault, replacing whatever the previous run left
    pub fn backup_all(&self, vaults: &[Vault], report: &mut SyncReport) -> Result<SnapshotManifest> {
        info!("Creating existing notes backup...");
        let backup_dir = self.layout.backup_root();

        if backup_dir.exists() {
            fs::remove_dir_all(&backup_dir)
                .with_context(|| format!("Failed to clear {}", backup_dir.display()))?;
        }
        fs::create_dir_all(&backup_dir)?;

        let mut entries = Vec::with_capacity(vaults.len());
        for vault in vaults {
            entries.push(self.snapshot(vault, report)?);
        }

        let manifest = SnapshotManifest {
            created_at: Utc::now().to_rfc3339(),
            vaults: entries,
        };
        let manifest_file = File::create(self.layout.manifest())?;
        serde_json::to_writer_pretty(manifest_file, &manifest)?;

        info!("Notes successfully backed up ({} vaults)", manifest.vaults.len());
        Ok(manifest)
    }

    fn snapshot(&self, vault: &Vault, report: &mut SyncReport) -> Result<SnapshotEntry> {
        let target = self.layout.backup_of(&vault.name);
        copy_tree(&vault.path, &target)
            .with_context(|| format!("Failed to back up {}", vault.path.display()))?;

        if vault.has_history {
            settle(
                Step::BackupCheckout,
                &target,
                &self.vcs.checkout_new_branch(&target, BACKUP_BRANCH)?,
                report,
            )?;
            settle(Step::BackupStage, &target, &self.vcs.add_all(&target)?, report)?;
            settle(
                Step::BackupCommit,
                &target,
                &self.vcs.commit_if_dirty(&target, BACKUP_MESSAGE)?,
                report,
            )?;
        }

        Ok(SnapshotEntry {
            name: vault.name.clone(),
            path: Path::new(BACKUP_FOLDER).join(&vault.name),
            has_history: vault.has_history,
        })
    }
}

/// Recursively copy `source` to `target`, metadata directory included
pub fn copy_tree(source: &Path, target: &Path) -> Result<()> {
    for entry in WalkDir::new(source).follow_links(false) {
        let entry = entry?;
        let path = entry.path();
        let rel_path = path.strip_prefix(source)?;
        let dest = target.join(rel_path);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&dest)?;
        } else if file_type.is_symlink() {
            #[cfg(unix)]
            std::os::unix::fs::symlink(fs::read_link(path)?, &dest)?;
            #[cfg(not(unix))]
            fs::copy(path, &dest)?;
        } else {
            fs::copy(path, &dest)
                .with_context(|| format!("Failed to copy {}", path.display()))?;
        }
    }
    Ok(())
}
