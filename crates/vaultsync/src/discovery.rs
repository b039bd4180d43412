//! Vault discovery
//!
//! Vaults are found by scanning the umbrella root on every run. Nothing is
//! cached between runs.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use vaultsync_core::paths::{METADATA_DIR, VAULT_MARKER};
use vaultsync_core::Layout;

/// A managed document collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vault {
    /// Directory name, unique within the umbrella root
    pub name: String,
    pub path: PathBuf,
    /// Whether the vault already carries version-control metadata
    pub has_history: bool,
}

/// True if `dir` contains version-control metadata
pub fn has_history(dir: &Path) -> bool {
    dir.is_dir() && dir.join(METADATA_DIR).exists()
}

fn is_vault(path: &Path) -> bool {
    path.is_dir()
        && path.file_name().map_or(false, |n| n != METADATA_DIR)
        && path.join(VAULT_MARKER).is_dir()
}

/// Lazily iterate the vaults under the root, in directory-listing order.
///
/// Call again to restart the scan.
pub fn scan(layout: &Layout) -> Result<impl Iterator<Item = Vault>> {
    let entries = fs::read_dir(&layout.root)
        .with_context(|| format!("Failed to list {}", layout.root.display()))?;

    Ok(entries.filter_map(|entry| {
        let path = entry.ok()?.path();
        if !is_vault(&path) {
            return None;
        }
        let name = path.file_name()?.to_str()?.to_string();
        Some(Vault {
            has_history: has_history(&path),
            name,
            path,
        })
    }))
}

/// All vaults under the root, sorted by name
pub fn list_vaults(layout: &Layout) -> Result<Vec<Vault>> {
    let mut vaults: Vec<Vault> = scan(layout)?.collect();
    vaults.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(vaults)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn make_vault(root: &Path, name: &str, with_history: bool) {
        fs::create_dir_all(root.join(name).join(VAULT_MARKER)).unwrap();
        if with_history {
            fs::create_dir_all(root.join(name).join(METADATA_DIR)).unwrap();
        }
    }

    #[test]
    fn test_lists_only_marked_directories() -> Result<()> {
        let tmp = TempDir::new()?;
        make_vault(tmp.path(), "work", true);
        make_vault(tmp.path(), "personal", false);
        fs::create_dir_all(tmp.path().join("plain"))?;
        fs::write(tmp.path().join("notes.7z"), "x")?;

        let vaults = list_vaults(&Layout::new(tmp.path()))?;
        let names: Vec<_> = vaults.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["personal", "work"]);
        assert!(!vaults[0].has_history);
        assert!(vaults[1].has_history);
        Ok(())
    }

    #[test]
    fn test_metadata_dir_is_never_a_vault() -> Result<()> {
        let tmp = TempDir::new()?;
        fs::create_dir_all(tmp.path().join(METADATA_DIR).join(VAULT_MARKER))?;

        assert!(list_vaults(&Layout::new(tmp.path()))?.is_empty());
        Ok(())
    }

    #[test]
    fn test_marker_must_be_directory() -> Result<()> {
        let tmp = TempDir::new()?;
        fs::create_dir_all(tmp.path().join("odd"))?;
        fs::write(tmp.path().join("odd").join(VAULT_MARKER), "")?;

        assert!(list_vaults(&Layout::new(tmp.path()))?.is_empty());
        Ok(())
    }

    #[test]
    fn test_scan_is_restartable() -> Result<()> {
        let tmp = TempDir::new()?;
        let layout = Layout::new(tmp.path());
        make_vault(tmp.path(), "a", false);

        assert_eq!(scan(&layout)?.count(), 1);
        make_vault(tmp.path(), "b", false);
        assert_eq!(scan(&layout)?.count(), 2);
        Ok(())
    }

    #[test]
    fn test_has_history() -> Result<()> {
        let tmp = TempDir::new()?;
        make_vault(tmp.path(), "a", true);
        assert!(has_history(&tmp.path().join("a")));
        assert!(!has_history(&tmp.path().join("missing")));
        Ok(())
    }
}
