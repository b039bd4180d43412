//! Shared secret storage
//!
//! One random password encrypts every vault archive. It is created once by
//! `init` and only ever read afterwards; losing it strands every archive
//! already published.

use anyhow::{bail, Context, Result};
use rand::RngCore;
use std::fs;
use std::path::PathBuf;
use tracing::info;
use vaultsync_core::Layout;

use crate::error::SyncError;

/// Bytes of entropy in a generated secret
pub const SECRET_BYTES: usize = 32;

pub struct CredentialStore {
    dir: PathBuf,
    file: PathBuf,
}

impl CredentialStore {
    pub fn new(layout: &Layout) -> Self {
        Self {
            dir: layout.credential_dir(),
            file: layout.credential_file(),
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.file
    }

    /// Generate and persist a fresh secret.
    ///
    /// Refuses to run when the credential folder already exists.
    pub fn initialize(&self) -> Result<()> {
        if self.dir.exists() {
            bail!(SyncError::SetupConflict { path: self.dir.clone() });
        }

        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;
        fs::write(&self.file, generate_secret())
            .with_context(|| format!("Failed to write {}", self.file.display()))?;

        #[cfg(unix)]
        {
            use std::fs::Permissions;
            use std::os::unix::fs::PermissionsExt;

            fs::set_permissions(&self.dir, Permissions::from_mode(0o700))?;
            fs::set_permissions(&self.file, Permissions::from_mode(0o600))?;
        }

        info!("'{}' successfully created", self.file.display());
        Ok(())
    }

    /// Read the secret verbatim
    pub fn retrieve(&self) -> Result<String> {
        info!("Retrieving encryption password");
        if !self.file.exists() {
            bail!(SyncError::CredentialMissing { path: self.file.clone() });
        }

        fs::read_to_string(&self.file)
            .with_context(|| format!("Failed to read {}", self.file.display()))
    }
}

fn generate_secret() -> String {
    let mut bytes = [0u8; SECRET_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_initialize_then_retrieve() -> Result<()> {
        let tmp = TempDir::new()?;
        let store = CredentialStore::new(&Layout::new(tmp.path()));

        store.initialize()?;
        let secret = store.retrieve()?;

        assert_eq!(secret.len(), SECRET_BYTES * 2);
        assert!(secret.chars().all(|c| c.is_ascii_hexdigit()));
        Ok(())
    }

    #[test]
    fn test_initialize_never_overwrites() -> Result<()> {
        let tmp = TempDir::new()?;
        let store = CredentialStore::new(&Layout::new(tmp.path()));
        store.initialize()?;
        let first = store.retrieve()?;

        let err = store.initialize().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SyncError>(),
            Some(SyncError::SetupConflict { .. })
        ));
        assert_eq!(store.retrieve()?, first);
        Ok(())
    }

    #[test]
    fn test_existing_folder_blocks_initialize() -> Result<()> {
        let tmp = TempDir::new()?;
        let layout = Layout::new(tmp.path());
        fs::create_dir_all(layout.credential_dir())?;

        let err = CredentialStore::new(&layout).initialize().unwrap_err();
        assert_eq!(crate::error::exit_code(&err), 1);
        Ok(())
    }

    #[test]
    fn test_retrieve_missing() -> Result<()> {
        let tmp = TempDir::new()?;
        let err = CredentialStore::new(&Layout::new(tmp.path())).retrieve().unwrap_err();
        assert_eq!(crate::error::exit_code(&err), 2);
        Ok(())
    }

    #[test]
    fn test_retrieve_is_verbatim() -> Result<()> {
        let tmp = TempDir::new()?;
        let layout = Layout::new(tmp.path());
        fs::create_dir_all(layout.credential_dir())?;
        fs::write(layout.credential_file(), "imported secret\n")?;

        assert_eq!(CredentialStore::new(&layout).retrieve()?, "imported secret\n");
        Ok(())
    }

    #[test]
    fn test_secrets_differ() {
        assert_ne!(generate_secret(), generate_secret());
    }
}
