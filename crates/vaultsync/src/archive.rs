//! Archive codec
//!
//! Wraps a password-based archive tool. Only the metadata directory of a
//! vault is ever packed; the plaintext working tree stays on the machine.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use vaultsync_core::{ToolCommand, ToolOutput};

pub trait Archiver {
    /// Pack `source` (relative to `base`) into `archive`, replacing any
    /// existing archive of that name
    fn encrypt(&self, password: &str, base: &Path, source: &Path, archive: &Path) -> Result<ToolOutput>;

    /// Extract `archive` into `destination`, overwriting existing files
    fn decrypt(&self, password: &str, archive: &Path, destination: &Path) -> Result<ToolOutput>;
}

/// [`Archiver`] backed by the 7-Zip command line
pub struct SevenZip {
    program: String,
}

impl SevenZip {
    pub fn new(program: impl Into<String>) -> Self {
        Self { program: program.into() }
    }
}

impl Default for SevenZip {
    fn default() -> Self {
        Self::new("7z")
    }
}

impl Archiver for SevenZip {
    fn encrypt(&self, password: &str, base: &Path, source: &Path, archive: &Path) -> Result<ToolOutput> {
        // `7z a` updates an existing archive in place
        if archive.exists() {
            fs::remove_file(archive)
                .with_context(|| format!("Failed to remove old archive {}", archive.display()))?;
        }

        ToolCommand::new(&self.program, base)
            .arg("a")
            .secret_arg(format!("-p{}", password))
            .arg("-mhe=on")
            .arg("-y")
            .arg(archive)
            .arg(source)
            .run()
    }

    fn decrypt(&self, password: &str, archive: &Path, destination: &Path) -> Result<ToolOutput> {
        ToolCommand::new(&self.program, destination)
            .arg("x")
            .arg("-y")
            .secret_arg(format!("-p{}", password))
            .arg(format!("-o{}", destination.display()))
            .arg(archive)
            .run()
    }
}


#[cfg(test)]
mod tests {
    use super::testing::seven_zip_available;
    use super::*;
    use tempfile::TempDir;

    fn make_metadata(root: &Path) {
        fs::create_dir_all(root.join("work/.git/refs")).unwrap();
        fs::write(root.join("work/.git/HEAD"), "ref: refs/heads/main\n").unwrap();
        fs::write(root.join("work/x.md"), "plaintext").unwrap();
    }

    #[test]
    fn test_round_trip_packs_only_metadata() -> Result<()> {
        if !seven_zip_available() {
            return Ok(());
        }
        let src = TempDir::new()?;
        make_metadata(src.path());
        let archive = src.path().join("work.7z");

        let zip = SevenZip::default();
        assert!(zip.encrypt("s3cret", src.path(), Path::new("work/.git"), &archive)?.success());

        let dst = TempDir::new()?;
        assert!(zip.decrypt("s3cret", &archive, dst.path())?.success());
        assert_eq!(
            fs::read_to_string(dst.path().join("work/.git/HEAD"))?,
            "ref: refs/heads/main\n"
        );
        assert!(!dst.path().join("work/x.md").exists());
        Ok(())
    }

    #[test]
    fn test_wrong_password_fails() -> Result<()> {
        if !seven_zip_available() {
            return Ok(());
        }
        let src = TempDir::new()?;
        make_metadata(src.path());
        let archive = src.path().join("work.7z");

        let zip = SevenZip::default();
        assert!(zip.encrypt("right", src.path(), Path::new("work/.git"), &archive)?.success());

        let dst = TempDir::new()?;
        assert!(!zip.decrypt("wrong", &archive, dst.path())?.success());
        Ok(())
    }

    #[test]
    fn test_encrypt_replaces_old_archive() -> Result<()> {
        if !seven_zip_available() {
            return Ok(());
        }
        let src = TempDir::new()?;
        make_metadata(src.path());
        let archive = src.path().join("work.7z");
        fs::write(&archive, "stale bytes that are not an archive")?;

        let output = SevenZip::default().encrypt("pw", src.path(), Path::new("work/.git"), &archive)?;
        assert!(output.success());
        Ok(())
    }
}
