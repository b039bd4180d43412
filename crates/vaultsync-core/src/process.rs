//! External tool invocation
//!
//! Every call blocks until the tool exits. The working directory is always
//! passed explicitly; nothing here changes the process-wide directory.

use anyhow::{Context, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, info};

/// Result of one finished tool invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code, `None` when the tool was terminated by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    /// Output of a step that succeeded without running anything
    pub fn skipped() -> Self {
        Self {
            code: Some(0),
            ..Default::default()
        }
    }

    /// Output carrying only an exit code
    pub fn with_code(code: i32) -> Self {
        Self {
            code: Some(code),
            ..Default::default()
        }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Exit code suitable for propagating as the process exit status
    pub fn exit_code(&self) -> i32 {
        match self.code {
            Some(0) | None => 1,
            Some(code) => code,
        }
    }

    /// Non-empty stdout lines, trimmed
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.stdout.lines().map(str::trim).filter(|l| !l.is_empty())
    }
}

/// A single external command with an explicit working directory
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: String,
    args: Vec<String>,
    /// Indices into `args` that must never be printed
    secret: Vec<usize>,
    cwd: PathBuf,
}

impl ToolCommand {
    pub fn new(program: impl Into<String>, cwd: &Path) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            secret: Vec::new(),
            cwd: cwd.to_path_buf(),
        }
    }

    pub fn arg(mut self, arg: impl AsRef<std::ffi::OsStr>) -> Self {
        self.args.push(arg.as_ref().to_string_lossy().into_owned());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<std::ffi::OsStr>,
    {
        for arg in args {
            self = self.arg(arg);
        }
        self
    }

    /// Argument rendered as `***` in logs
    pub fn secret_arg(mut self, arg: impl Into<String>) -> Self {
        self.secret.push(self.args.len());
        self.args.push(arg.into());
        self
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Run to completion, capturing stdout and stderr.
    ///
    /// A non-zero exit is not an error here; callers decide what it means.
    /// `Err` is returned only when the tool could not be started.
    pub fn run(&self) -> Result<ToolOutput> {
        info!(cwd = %self.cwd.display(), "{}", self);

        let output = Command::new(&self.program)
            .args(&self.args)
            .current_dir(&self.cwd)
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("Failed to run {}", self.program))?;

        let result = ToolOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        if !result.stdout.trim().is_empty() {
            debug!("stdout: {}", result.stdout.trim_end());
        }
        if !result.stderr.trim().is_empty() {
            debug!("stderr: {}", result.stderr.trim_end());
        }

        Ok(result)
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for (i, arg) in self.args.iter().enumerate() {
            if self.secret.contains(&i) {
                write!(f, " ***")?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_redacts_secrets() {
        let cmd = ToolCommand::new("7z", Path::new("."))
            .arg("a")
            .secret_arg("-phunter2")
            .arg("notes.7z");
        let shown = cmd.to_string();
        assert_eq!(shown, "7z a *** notes.7z");
        assert!(!shown.contains("hunter2"));
    }

    #[test]
    fn test_exit_code_never_zero_on_failure() {
        assert_eq!(ToolOutput::with_code(128).exit_code(), 128);
        assert_eq!(ToolOutput::default().exit_code(), 1);
        assert!(ToolOutput::skipped().success());
    }

    #[test]
    fn test_lines_skips_blanks() {
        let output = ToolOutput {
            code: Some(0),
            stdout: "origin\n\n  backup_dir \n".to_string(),
            stderr: String::new(),
        };
        assert_eq!(output.lines().collect::<Vec<_>>(), vec!["origin", "backup_dir"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_run_uses_explicit_cwd() -> Result<()> {
        let tmp = tempfile::TempDir::new()?;
        let output = ToolCommand::new("pwd", tmp.path()).run()?;
        assert!(output.success());
        let reported = PathBuf::from(output.stdout.trim()).canonicalize()?;
        assert_eq!(reported, tmp.path().canonicalize()?);
        Ok(())
    }

    #[test]
    fn test_missing_program_is_error() {
        let result = ToolCommand::new("vaultsync-no-such-tool", Path::new(".")).run();
        assert!(result.is_err());
    }
}
