//! Protocol-level errors and their process exit codes

use std::path::PathBuf;
use thiserror::Error;

use crate::policy::Step;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("{} already exists - remove it manually if you are sure, then run init again", .path.display())]
    SetupConflict { path: PathBuf },

    #[error("{} could not be found - run 'vaultsync init' first or import your existing password there", .path.display())]
    CredentialMissing { path: PathBuf },

    #[error("{step} failed in {} (exit code {code}): {stderr}", .dir.display())]
    ToolFailure {
        step: Step,
        dir: PathBuf,
        code: i32,
        stderr: String,
    },

    #[error("Failed to decrypt {} (exit code {code}) - wrong password or corrupt archive", .archive.display())]
    DecryptionFailed { archive: PathBuf, code: i32 },
}

impl SyncError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::SetupConflict { .. } => 1,
            Self::CredentialMissing { .. } => 2,
            Self::ToolFailure { code, .. } | Self::DecryptionFailed { code, .. } => *code,
        }
    }
}

/// Exit code for any error leaving the binary
pub fn exit_code(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<SyncError>()
        .map(SyncError::exit_code)
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        let conflict = SyncError::SetupConflict { path: ".pwd".into() };
        let missing = SyncError::CredentialMissing { path: ".pwd/7z_password".into() };
        let push = SyncError::ToolFailure {
            step: Step::UmbrellaPush,
            dir: ".".into(),
            code: 128,
            stderr: "rejected".into(),
        };
        let decrypt = SyncError::DecryptionFailed { archive: "work.7z".into(), code: 2 };

        assert_eq!(conflict.exit_code(), 1);
        assert_eq!(missing.exit_code(), 2);
        assert_eq!(push.exit_code(), 128);
        assert_eq!(decrypt.exit_code(), 2);
    }

    #[test]
    fn test_exit_code_through_anyhow() {
        let err = anyhow::Error::new(SyncError::CredentialMissing { path: "x".into() })
            .context("pull aborted");
        assert_eq!(exit_code(&err), 2);
        assert_eq!(exit_code(&anyhow::anyhow!("io trouble")), 1);
    }
}
