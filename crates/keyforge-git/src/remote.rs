//! Remote operations

use tracing::{info, instrument, warn};

use crate::repository::{GitRepo, Result};
use keyforge_core::error::GitError;

/// Outcome of registering a remote
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteAdd {
    /// The remote was created
    Added,
    /// A remote with this name was already configured
    AlreadyExists {
        /// URL the existing remote points at
        url: Option<String>,
    },
}

impl GitRepo {
    /// Get list of remote names
    pub fn remotes(&self) -> Result<Vec<String>> {
        let remotes = self.repo.remotes()?;
        Ok(remotes
            .iter()
            .filter_map(|r| r.map(|s| s.to_string()))
            .collect())
    }

    /// Check if a remote exists
    pub fn has_remote(&self, name: &str) -> Result<bool> {
        Ok(self.remotes()?.contains(&name.to_string()))
    }

    /// Get the URL for a remote
    pub fn remote_url(&self, name: &str) -> Result<Option<String>> {
        match self.repo.find_remote(name) {
            Ok(remote) => Ok(remote.url().map(|s| s.to_string())),
            Err(e) if e.code() == git2::ErrorCode::NotFound => {
                Err(GitError::RemoteNotFound(name.to_string()))
            }
            Err(e) => Err(GitError::Git2(e)),
        }
    }

    /// Register a remote.
    ///
    /// An existing remote of the same name is reported as
    /// [`RemoteAdd::AlreadyExists`]; every other failure is an error.
    #[instrument(skip(self), fields(name, url))]
    pub fn add_remote(&self, name: &str, url: &str) -> Result<RemoteAdd> {
        if self.is_dry_run() {
            if self.has_remote(name)? {
                return self.existing_remote(name, url);
            }
            info!(remote = name, url, "dry run: skipping remote add");
            return Ok(RemoteAdd::Added);
        }

        match self.repo.remote(name, url) {
            Ok(_) => {
                info!(remote = name, url, "added remote");
                Ok(RemoteAdd::Added)
            }
            Err(e) if e.code() == git2::ErrorCode::Exists => self.existing_remote(name, url),
            Err(e) => Err(GitError::RemoteRegistration {
                remote: name.to_string(),
                reason: e.message().to_string(),
            }),
        }
    }

    /// An existing remote only counts as registered when it points at `url`
    fn existing_remote(&self, name: &str, url: &str) -> Result<RemoteAdd> {
        let existing = self.remote_url(name)?;
        if existing.as_deref() != Some(url) {
            warn!(
                remote = name,
                existing = existing.as_deref().unwrap_or("<none>"),
                requested = url,
                "remote exists with a different URL"
            );
            return Err(GitError::RemoteRegistration {
                remote: name.to_string(),
                reason: format!(
                    "already points at {}, expected {}",
                    existing.as_deref().unwrap_or("<none>"),
                    url
                ),
            });
        }
        Ok(RemoteAdd::AlreadyExists { url: existing })
    }

    /// Fetch a remote using the git CLI (uses the user's credential setup)
    #[instrument(skip(self), fields(remote))]
    pub fn fetch(&self, remote: &str) -> Result<()> {
        let start = std::time::Instant::now();
        let output = self.run_git(&["fetch", remote])?;
        if !output.success {
            return Err(GitError::Fetch {
                remote: remote.to_string(),
                reason: output.reason(),
            });
        }
        info!(
            remote,
            duration_ms = start.elapsed().as_millis(),
            "fetched from remote"
        );
        Ok(())
    }
}
