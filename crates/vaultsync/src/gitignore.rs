//! Umbrella ignore-list maintenance
//!
//! The umbrella repository must never track the backup folder, the
//! credential folder, or any plaintext vault directory.

use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;
use tracing::info;
use vaultsync_core::paths::{BACKUP_FOLDER, CREDENTIAL_FOLDER};
use vaultsync_core::Layout;

const TOOL_HEADER: &str = "# vaultsync folders";
const VAULT_HEADER: &str = "# Vault folders";

fn lists(content: &str, entry: &str) -> bool {
    content.lines().map(str::trim).any(|line| {
        line == entry || line.strip_suffix('/') == Some(entry) || line.strip_prefix('/') == Some(entry)
    })
}

fn append(path: &Path, text: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    file.write_all(text.as_bytes())?;
    Ok(())
}

/// Create the ignore-list, or add the fixed entries it is missing
pub fn ensure_defaults(layout: &Layout) -> Result<()> {
    let path = layout.gitignore();

    if !path.exists() {
        info!("Creating {}", path.display());
        let content = format!(
            "{}\n{}\n{}\n\n{}\n",
            TOOL_HEADER, BACKUP_FOLDER, CREDENTIAL_FOLDER, VAULT_HEADER
        );
        fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))?;
        return Ok(());
    }

    let content = fs::read_to_string(&path)?;
    let mut missing = String::new();
    if !content.is_empty() && !content.ends_with('\n') {
        missing.push('\n');
    }
    for entry in [BACKUP_FOLDER, CREDENTIAL_FOLDER] {
        if !lists(&content, entry) {
            info!("Adding '{}' to {}", entry, path.display());
            missing.push_str(entry);
            missing.push('\n');
        }
    }
    if missing.trim().is_empty() {
        return Ok(());
    }
    append(&path, &missing)
}

/// Register a vault directory, once
pub fn add_vault(layout: &Layout, vault: &str) -> Result<()> {
    let path = layout.gitignore();
    let content = if path.exists() {
        fs::read_to_string(&path)?
    } else {
        String::new()
    };

    if lists(&content, vault) {
        return Ok(());
    }

    info!("Adding '{}' to {}", vault, path.display());
    let mut entry = String::new();
    if !content.is_empty() && !content.ends_with('\n') {
        entry.push('\n');
    }
    entry.push_str(vault);
    entry.push('\n');
    append(&path, &entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_fresh_file_lists_tool_folders() -> Result<()> {
        let tmp = TempDir::new()?;
        let layout = Layout::new(tmp.path());
        ensure_defaults(&layout)?;

        let content = fs::read_to_string(layout.gitignore())?;
        assert!(lists(&content, ".backup"));
        assert!(lists(&content, ".pwd"));
        Ok(())
    }

    #[test]
    fn test_existing_file_gets_missing_entries_only() -> Result<()> {
        let tmp = TempDir::new()?;
        let layout = Layout::new(tmp.path());
        fs::write(layout.gitignore(), "target\n.pwd/")?;

        ensure_defaults(&layout)?;
        ensure_defaults(&layout)?;

        let content = fs::read_to_string(layout.gitignore())?;
        assert_eq!(content, "target\n.pwd/\n.backup\n");
        Ok(())
    }

    #[test]
    fn test_add_vault_is_idempotent() -> Result<()> {
        let tmp = TempDir::new()?;
        let layout = Layout::new(tmp.path());
        ensure_defaults(&layout)?;

        add_vault(&layout, "work")?;
        add_vault(&layout, "work")?;
        add_vault(&layout, "personal")?;

        let content = fs::read_to_string(layout.gitignore())?;
        assert_eq!(content.lines().filter(|l| *l == "work").count(), 1);
        assert!(content.ends_with("work\npersonal\n"));
        Ok(())
    }

    #[test]
    fn test_vault_name_is_not_a_prefix_match() -> Result<()> {
        let tmp = TempDir::new()?;
        let layout = Layout::new(tmp.path());
        fs::write(layout.gitignore(), "workshop\n")?;

        add_vault(&layout, "work")?;
        assert_eq!(fs::read_to_string(layout.gitignore())?, "workshop\nwork\n");
        Ok(())
    }
}
