//! Git repository operations

use std::path::{Path, PathBuf};
use std::process::Command;

use git2::Repository;
use tracing::{debug, info, instrument};

use keyforge_core::error::GitError;

/// Result type for git operations
pub type Result<T> = std::result::Result<T, GitError>;

/// Outcome of a git CLI invocation
#[derive(Debug, Clone)]
pub(crate) struct GitOutput {
    pub success: bool,
    pub stderr: String,
}

impl GitOutput {
    /// Last non-empty stderr line, or a generic message
    pub fn reason(&self) -> String {
        self.stderr
            .lines()
            .rev()
            .find(|l| !l.trim().is_empty())
            .map(|l| l.trim().to_string())
            .unwrap_or_else(|| "git exited with a non-zero status".to_string())
    }
}

/// The shared firmware working tree
pub struct GitRepo {
    pub(crate) repo: Repository,
    path: PathBuf,
    dry_run: bool,
}

impl GitRepo {
    /// Open a repository at the given path
    #[instrument(fields(path = %path.display()))]
    pub fn open(path: &Path) -> Result<Self> {
        info!(path = %path.display(), "opening git repository");
        let repo = Repository::open(path).map_err(|e| {
            if e.code() == git2::ErrorCode::NotFound {
                GitError::RepositoryNotFound(path.to_path_buf())
            } else {
                GitError::OpenFailed(e.to_string())
            }
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            repo,
            dry_run: false,
        })
    }

    /// Log mutating commands instead of running them
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Get the repository path
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Short name of the checked-out branch, if HEAD is on one
    pub fn current_branch(&self) -> Option<String> {
        let head = self.repo.head().ok()?;
        if !head.is_branch() {
            return None;
        }
        head.shorthand().map(|s| s.to_string())
    }

    /// Run a git command in the working tree.
    ///
    /// In dry-run mode the command is logged and reported as successful.
    pub(crate) fn run_git(&self, args: &[&str]) -> Result<GitOutput> {
        let command = format!("git {}", args.join(" "));
        if self.dry_run {
            info!(%command, path = %self.path.display(), "dry run: skipping git command");
            return Ok(GitOutput {
                success: true,
                stderr: String::new(),
            });
        }

        let start = std::time::Instant::now();
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.path)
            .output()
            .map_err(|source| GitError::Spawn {
                command: args.join(" "),
                source,
            })?;

        debug!(
            %command,
            duration_ms = start.elapsed().as_millis(),
            success = output.status.success(),
            "git command finished"
        );

        Ok(GitOutput {
            success: output.status.success(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}
