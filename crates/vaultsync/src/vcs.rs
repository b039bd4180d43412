//! Version-control adapter
//!
//! Each operation maps to one external invocation in an explicit directory
//! and reports the raw exit status. Deciding whether a failure matters is
//! left to the caller (see [`crate::policy`]).

use anyhow::Result;
use std::path::Path;
use vaultsync_core::{ToolCommand, ToolOutput};

/// Operations the sync protocol needs from version control
pub trait Vcs {
    fn init(&self, dir: &Path) -> Result<ToolOutput>;

    /// Rename the current branch to `branch`
    fn set_main_branch(&self, dir: &Path, branch: &str) -> Result<ToolOutput>;

    fn add_all(&self, dir: &Path) -> Result<ToolOutput>;

    /// Commit staged changes; succeeds without committing when clean
    fn commit_if_dirty(&self, dir: &Path, message: &str) -> Result<ToolOutput>;

    /// Create or reset `branch` at HEAD and switch to it
    fn checkout_new_branch(&self, dir: &Path, branch: &str) -> Result<ToolOutput>;

    fn checkout(&self, dir: &Path, branch: &str) -> Result<ToolOutput>;

    /// Remote names, one per stdout line
    fn list_remotes(&self, dir: &Path) -> Result<ToolOutput>;

    fn add_remote(&self, dir: &Path, name: &str, path: &Path) -> Result<ToolOutput>;

    fn remove_remote(&self, dir: &Path, name: &str) -> Result<ToolOutput>;

    fn fetch(&self, dir: &Path, remote: &str) -> Result<ToolOutput>;

    /// Merge `remote_branch` (e.g. `remote/branch`, or a local branch) into
    /// the current branch
    fn merge(&self, dir: &Path, remote_branch: &str) -> Result<ToolOutput>;

    /// Local branches, the current one prefixed with `* `
    fn list_branches(&self, dir: &Path) -> Result<ToolOutput>;

    /// Delete `branch`; refused when it holds commits not merged into HEAD
    fn delete_branch(&self, dir: &Path, branch: &str) -> Result<ToolOutput>;

    fn pull(&self, dir: &Path) -> Result<ToolOutput>;

    /// Push `branch` to `remote`, setting upstream tracking
    fn push(&self, dir: &Path, remote: &str, branch: &str) -> Result<ToolOutput>;

    /// Discard working-tree modifications of tracked files
    fn restore_all(&self, dir: &Path) -> Result<ToolOutput>;
}

/// Name of the checked-out branch in `list_branches` output
pub fn current_branch(branches: &ToolOutput) -> Option<&str> {
    branches.stdout.lines().find_map(|l| l.strip_prefix("* ")).map(str::trim)
}

/// Whether `name` appears in `list_remotes` output
pub fn has_remote(remotes: &ToolOutput, name: &str) -> bool {
    remotes.lines().any(|r| r == name)
}

/// [`Vcs`] backed by the git command line
pub struct GitCli {
    program: String,
}

impl GitCli {
    pub fn new(program: impl Into<String>) -> Self {
        Self { program: program.into() }
    }

    fn git(&self, dir: &Path) -> ToolCommand {
        ToolCommand::new(&self.program, dir)
    }
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new("git")
    }
}

impl Vcs for GitCli {
    fn init(&self, dir: &Path) -> Result<ToolOutput> {
        self.git(dir).arg("init").run()
    }

    fn set_main_branch(&self, dir: &Path, branch: &str) -> Result<ToolOutput> {
        self.git(dir).args(["branch", "-M", branch]).run()
    }

    fn add_all(&self, dir: &Path) -> Result<ToolOutput> {
        self.git(dir).args(["add", "."]).run()
    }

    fn commit_if_dirty(&self, dir: &Path, message: &str) -> Result<ToolOutput> {
        // Works on an unborn branch too, unlike diffing against HEAD
        let status = self
            .git(dir)
            .args(["status", "--porcelain", "--untracked-files=no"])
            .run()?;
        if status.success() && status.stdout.trim().is_empty() {
            return Ok(ToolOutput::skipped());
        }

        self.git(dir).args(["commit", "-m", message]).run()
    }

    fn checkout_new_branch(&self, dir: &Path, branch: &str) -> Result<ToolOutput> {
        self.git(dir).args(["checkout", "-B", branch]).run()
    }

    fn checkout(&self, dir: &Path, branch: &str) -> Result<ToolOutput> {
        self.git(dir).args(["checkout", branch]).run()
    }

    fn list_remotes(&self, dir: &Path) -> Result<ToolOutput> {
        self.git(dir).arg("remote").run()
    }

    fn add_remote(&self, dir: &Path, name: &str, path: &Path) -> Result<ToolOutput> {
        self.git(dir).args(["remote", "add", name]).arg(path).run()
    }

    fn remove_remote(&self, dir: &Path, name: &str) -> Result<ToolOutput> {
        self.git(dir).args(["remote", "remove", name]).run()
    }

    fn fetch(&self, dir: &Path, remote: &str) -> Result<ToolOutput> {
        self.git(dir).args(["fetch", remote]).run()
    }

    fn merge(&self, dir: &Path, remote_branch: &str) -> Result<ToolOutput> {
        self.git(dir).args(["merge", "--no-edit", remote_branch]).run()
    }

    fn list_branches(&self, dir: &Path) -> Result<ToolOutput> {
        self.git(dir).arg("branch").run()
    }

    fn delete_branch(&self, dir: &Path, branch: &str) -> Result<ToolOutput> {
        self.git(dir).args(["branch", "-d", branch]).run()
    }

    fn pull(&self, dir: &Path) -> Result<ToolOutput> {
        self.git(dir).arg("pull").run()
    }

    fn push(&self, dir: &Path, remote: &str, branch: &str) -> Result<ToolOutput> {
        self.git(dir).args(["push", "-u", remote, branch]).run()
    }

    fn restore_all(&self, dir: &Path) -> Result<ToolOutput> {
        self.git(dir).args(["restore", "."]).run()
    }
}
