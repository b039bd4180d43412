//! Standard paths inside an umbrella repository
//!
//! Every location here is fixed relative to the umbrella root and is not
//! configurable.

use std::path::{Path, PathBuf};

/// Folder holding the per-run vault snapshots
pub const BACKUP_FOLDER: &str = ".backup";
/// Folder holding the shared secret
pub const CREDENTIAL_FOLDER: &str = ".pwd";
/// File name of the shared secret inside [`CREDENTIAL_FOLDER`]
pub const CREDENTIAL_FILE: &str = "7z_password";
/// Version-control metadata directory
pub const METADATA_DIR: &str = ".git";
/// Subdirectory that marks a directory as a vault
pub const VAULT_MARKER: &str = ".obsidian";
/// Extension of encrypted vault archives
pub const ARCHIVE_EXTENSION: &str = "7z";
/// Snapshot manifest written into the backup folder
pub const MANIFEST_FILE: &str = "manifest.json";
/// Optional configuration file
pub const CONFIG_FILE: &str = ".vaultsync.json";

/// Resolved paths for one umbrella repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    /// Umbrella repository root
    pub root: PathBuf,
}

impl Layout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Layout rooted at the current working directory
    pub fn current() -> std::io::Result<Self> {
        Ok(Self::new(std::env::current_dir()?))
    }

    pub fn backup_root(&self) -> PathBuf {
        self.root.join(BACKUP_FOLDER)
    }

    /// Snapshot location of a vault
    pub fn backup_of(&self, vault: &str) -> PathBuf {
        self.backup_root().join(vault)
    }

    pub fn manifest(&self) -> PathBuf {
        self.backup_root().join(MANIFEST_FILE)
    }

    pub fn credential_dir(&self) -> PathBuf {
        self.root.join(CREDENTIAL_FOLDER)
    }

    pub fn credential_file(&self) -> PathBuf {
        self.credential_dir().join(CREDENTIAL_FILE)
    }

    pub fn gitignore(&self) -> PathBuf {
        self.root.join(".gitignore")
    }

    pub fn config_file(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    /// Live directory of a vault
    pub fn vault(&self, vault: &str) -> PathBuf {
        self.root.join(vault)
    }

    /// Archive file name of a vault, relative to the root
    pub fn archive_name(vault: &str) -> String {
        format!("{}.{}", vault, ARCHIVE_EXTENSION)
    }

    pub fn archive_of(&self, vault: &str) -> PathBuf {
        self.root.join(Self::archive_name(vault))
    }

    /// Metadata directory of a vault, relative to the root
    pub fn metadata_subpath(vault: &str) -> PathBuf {
        Path::new(vault).join(METADATA_DIR)
    }

    /// Vault name for an archive file name, if it is one
    pub fn vault_for_archive(file_name: &str) -> Option<&str> {
        file_name
            .strip_suffix(ARCHIVE_EXTENSION)
            .and_then(|stem| stem.strip_suffix('.'))
            .filter(|stem| !stem.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_locations() {
        let layout = Layout::new("/notes");
        assert_eq!(layout.backup_of("work"), PathBuf::from("/notes/.backup/work"));
        assert_eq!(layout.credential_file(), PathBuf::from("/notes/.pwd/7z_password"));
        assert_eq!(layout.archive_of("work"), PathBuf::from("/notes/work.7z"));
        assert_eq!(Layout::metadata_subpath("work"), PathBuf::from("work/.git"));
    }

    #[test]
    fn test_vault_for_archive() {
        assert_eq!(Layout::vault_for_archive("work.7z"), Some("work"));
        assert_eq!(Layout::vault_for_archive("my.notes.7z"), Some("my.notes"));
        assert_eq!(Layout::vault_for_archive(".7z"), None);
        assert_eq!(Layout::vault_for_archive("work7z"), None);
        assert_eq!(Layout::vault_for_archive("work.zip"), None);
    }
}
