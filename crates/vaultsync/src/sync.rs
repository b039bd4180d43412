//! Sync orchestrator
//!
//! Drives `push` (backup, stage, encrypt, publish) and `pull` (backup,
//! fetch, decrypt and restore, reconcile). Every step runs to completion
//! before the next one starts; the backup taken first is the only recovery
//! mechanism if a run is interrupted.

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};
use vaultsync_core::{Config, Layout};

use crate::archive::Archiver;
use crate::backup::{BackupManager, BACKUP_BRANCH};
use crate::credentials::CredentialStore;
use crate::discovery::{has_history, list_vaults, Vault};
use crate::gitignore;
use crate::policy::{settle, Step};
use crate::report::SyncReport;
use crate::vcs::{current_branch, has_remote, Vcs};

/// Commit message for vault and umbrella commits
pub const SYNC_MESSAGE: &str = "Sync";
/// Remote pointing a live vault at its snapshot during reconciliation
pub const RECONCILE_REMOTE: &str = "backup_dir";

/// Create the shared secret and the umbrella ignore-list
pub fn init(layout: &Layout) -> Result<()> {
    info!("Creating '{}'...", layout.credential_file().display());
    CredentialStore::new(layout).initialize()?;
    gitignore::ensure_defaults(layout)?;
    Ok(())
}

pub struct Syncer<'a> {
    layout: &'a Layout,
    config: &'a Config,
    vcs: &'a dyn Vcs,
    archiver: &'a dyn Archiver,
}

impl<'a> Syncer<'a> {
    pub fn new(layout: &'a Layout, config: &'a Config, vcs: &'a dyn Vcs, archiver: &'a dyn Archiver) -> Self {
        Self {
            layout,
            config,
            vcs,
            archiver,
        }
    }

    fn backup(&self, vaults: &[Vault], report: &mut SyncReport) -> Result<()> {
        BackupManager::new(self.layout, self.vcs).backup_all(vaults, report)?;
        Ok(())
    }

    /// Encrypt every vault's history and publish the umbrella repository
    pub fn push(&self) -> Result<SyncReport> {
        let mut report = SyncReport::default();
        let vaults = list_vaults(self.layout)?;

        self.backup(&vaults, &mut report)?;
        let password = CredentialStore::new(self.layout).retrieve()?;

        for vault in &vaults {
            self.stage_vault(vault, &password, &mut report)?;
            report.vaults.push(vault.name.clone());
        }

        self.publish(&mut report)?;
        Ok(report)
    }

    fn stage_vault(&self, vault: &Vault, password: &str, report: &mut SyncReport) -> Result<()> {
        let dir = &vault.path;

        // Plaintext must never reach the umbrella repository
        gitignore::add_vault(self.layout, &vault.name)?;

        if !vault.has_history {
            info!("Starting history for {}", vault.name);
            settle(Step::VaultInit, dir, &self.vcs.init(dir)?, report)?;
            settle(
                Step::VaultSetMainBranch,
                dir,
                &self.vcs.set_main_branch(dir, &self.config.branch)?,
                report,
            )?;
        }

        settle(Step::VaultStage, dir, &self.vcs.add_all(dir)?, report)?;
        settle(Step::VaultCommit, dir, &self.vcs.commit_if_dirty(dir, SYNC_MESSAGE)?, report)?;

        if has_remote(&self.vcs.list_remotes(dir)?, RECONCILE_REMOTE) {
            settle(
                Step::RemoveReconcileRemote,
                dir,
                &self.vcs.remove_remote(dir, RECONCILE_REMOTE)?,
                report,
            )?;
        }

        let branches = self.vcs.list_branches(dir)?;
        if current_branch(&branches) == Some(BACKUP_BRANCH) {
            self.leave_backup_branch(vault, report)?;
        }

        info!("Encrypting {}...", vault.name);
        let archive = self.layout.archive_of(&vault.name);
        let output = self.archiver.encrypt(
            password,
            &self.layout.root,
            &Layout::metadata_subpath(&vault.name),
            &archive,
        )?;
        settle(Step::Encrypt, dir, &output, report)?;
        Ok(())
    }

    /// Bring work committed on the backup branch onto the main branch, then
    /// drop the branch. The branch is only deleted once merged; anything
    /// short of that leaves it in place and is reported.
    fn leave_backup_branch(&self, vault: &Vault, report: &mut SyncReport) -> Result<()> {
        let dir = &vault.path;
        let main = &self.config.branch;
        warn!("{} has {} checked out, switching back to {}", vault.name, BACKUP_BRANCH, main);

        let left = settle(Step::LeaveBackupBranch, dir, &self.vcs.checkout(dir, main)?, report)?;
        if !left {
            warn!("{} stays on {}; its work is published from that branch", vault.name, BACKUP_BRANCH);
            return Ok(());
        }

        let merged = settle(
            Step::AbsorbBackupBranch,
            dir,
            &self.vcs.merge(dir, BACKUP_BRANCH)?,
            report,
        )?;
        if !merged {
            warn!(
                "Merging {} into {} failed for {}. Resolve the conflicts in the vault; {} is kept.",
                BACKUP_BRANCH, main, vault.name, BACKUP_BRANCH
            );
            report.conflicts.push(vault.name.clone());
            return Ok(());
        }

        settle(
            Step::DeleteBackupBranch,
            dir,
            &self.vcs.delete_branch(dir, BACKUP_BRANCH)?,
            report,
        )?;
        Ok(())
    }

    fn publish(&self, report: &mut SyncReport) -> Result<()> {
        let root = &self.layout.root;
        info!("Publishing to {}/{}...", self.config.remote, self.config.branch);

        settle(Step::UmbrellaStage, root, &self.vcs.add_all(root)?, report)?;
        settle(Step::UmbrellaCommit, root, &self.vcs.commit_if_dirty(root, SYNC_MESSAGE)?, report)?;
        settle(
            Step::UmbrellaPush,
            root,
            &self.vcs.push(root, &self.config.remote, &self.config.branch)?,
            report,
        )?;
        Ok(())
    }

    /// Replace local vault history with the published archives, then merge
    /// local pre-pull work back in from the snapshots
    pub fn pull(&self) -> Result<SyncReport> {
        let mut report = SyncReport::default();
        let root = &self.layout.root;
        let vaults = list_vaults(self.layout)?;

        self.backup(&vaults, &mut report)?;

        info!("Pulling latest changes...");
        for vault in vaults.iter().filter(|v| v.has_history) {
            fs::remove_dir_all(&vault.path)
                .with_context(|| format!("Failed to remove {}", vault.path.display()))?;
        }
        settle(Step::UmbrellaPull, root, &self.vcs.pull(root)?, &mut report)?;

        let password = CredentialStore::new(self.layout).retrieve()?;
        let archives = self.archives()?;

        // Every archive is decrypted before any tree is restored, so a wrong
        // password aborts with no vault touched by restore
        for (name, archive) in &archives {
            info!("Decrypting {}...", name);
            settle(Step::Decrypt, archive, &self.archiver.decrypt(&password, archive, root)?, &mut report)?;
        }

        for (name, _) in &archives {
            info!("Restoring notes in {}...", name);
            let dir = self.layout.vault(name);
            let restored = if has_history(&dir) {
                settle(Step::Restore, &dir, &self.vcs.restore_all(&dir)?, &mut report)?
            } else {
                warn!("{} holds no history after decryption", name);
                false
            };
            if !restored {
                report.restore_failures.push(name.clone());
            }
            report.vaults.push(name.clone());
        }

        self.reconcile(&mut report)?;
        Ok(report)
    }

    /// Archives at the umbrella root, sorted by vault name
    fn archives(&self) -> Result<Vec<(String, PathBuf)>> {
        let mut archives = Vec::new();
        for entry in fs::read_dir(&self.layout.root)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            let vault = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(Layout::vault_for_archive)
                .map(str::to_string);
            if let Some(vault) = vault {
                archives.push((vault, path));
            }
        }
        archives.sort();
        Ok(archives)
    }

    /// Merge each snapshot's backup branch into its live vault
    pub(crate) fn reconcile(&self, report: &mut SyncReport) -> Result<()> {
        info!("Merging with backup notes...");
        let source = format!("{}/{}", RECONCILE_REMOTE, BACKUP_BRANCH);

        for vault in list_vaults(self.layout)?.into_iter().filter(|v| v.has_history) {
            let backup = self.layout.backup_of(&vault.name);
            if !has_history(&backup) {
                continue;
            }
            if report.restore_failures.contains(&vault.name) {
                warn!(
                    "Skipping merge for {}: its notes were not restored. The snapshot is in {}",
                    vault.name,
                    backup.display()
                );
                continue;
            }

            let dir = &vault.path;
            settle(
                Step::AddReconcileRemote,
                dir,
                &self.vcs.add_remote(dir, RECONCILE_REMOTE, &backup)?,
                report,
            )?;
            settle(Step::FetchReconcile, dir, &self.vcs.fetch(dir, RECONCILE_REMOTE)?, report)?;

            let merged = settle(Step::MergeReconcile, dir, &self.vcs.merge(dir, &source)?, report)?;
            if !merged {
                warn!(
                    "Merge failed for {}. Carefully check the logs and resolve your conflicts.",
                    vault.name
                );
                report.conflicts.push(vault.name);
            }
        }
        Ok(())
    }
}
