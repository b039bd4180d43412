//! Configuration loading
//!
//! Read from `.vaultsync.json` at the umbrella root when present. Only the
//! tool binaries and the umbrella remote can be changed; on-disk locations
//! are fixed.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;

use crate::paths::Layout;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Version-control binary
    pub git: String,
    /// Password-based archive binary
    pub archiver: String,
    /// Remote the umbrella repository is pushed to
    pub remote: String,
    /// Main branch of the umbrella repository and of every vault
    pub branch: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            git: "git".to_string(),
            archiver: "7z".to_string(),
            remote: "origin".to_string(),
            branch: "main".to_string(),
        }
    }
}

impl Config {
    /// Load the config for a layout, falling back to defaults
    pub fn load(layout: &Layout) -> Result<Self> {
        let path = layout.config_file();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }
}
