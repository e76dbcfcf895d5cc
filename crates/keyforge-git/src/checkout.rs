//! Branch switching, pulling and submodule sync through the git CLI

use tracing::{info, instrument};

use crate::repository::{GitRepo, Result};
use keyforge_core::error::GitError;

impl GitRepo {
    /// Check out a branch or remote-tracking ref
    #[instrument(skip(self), fields(refname))]
    pub fn checkout(&self, refname: &str) -> Result<()> {
        let start = std::time::Instant::now();
        let output = self.run_git(&["checkout", refname])?;
        if !output.success {
            return Err(GitError::Checkout {
                target: refname.to_string(),
                reason: output.reason(),
            });
        }
        info!(
            refname,
            duration_ms = start.elapsed().as_millis(),
            "checked out"
        );
        Ok(())
    }

    /// Update the current branch from its upstream
    #[instrument(skip(self))]
    pub fn pull(&self) -> Result<()> {
        let start = std::time::Instant::now();
        let output = self.run_git(&["pull"])?;
        if !output.success {
            return Err(GitError::Pull(output.reason()));
        }
        info!(duration_ms = start.elapsed().as_millis(), "pulled");
        Ok(())
    }

    /// Bring submodules in line with the checked-out commit
    #[instrument(skip(self))]
    pub fn sync_submodules(&self) -> Result<()> {
        let start = std::time::Instant::now();
        for args in [
            &["submodule", "sync", "--recursive"][..],
            &["submodule", "update", "--init", "--recursive"][..],
        ] {
            let output = self.run_git(args)?;
            if !output.success {
                return Err(GitError::SubmoduleSync(output.reason()));
            }
        }
        info!(duration_ms = start.elapsed().as_millis(), "synced submodules");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use git2::Repository;
    use tempfile::TempDir;

    fn setup_repo() -> (TempDir, GitRepo) {
        let temp = TempDir::new().unwrap();
        Repository::init(temp.path()).unwrap();
        let repo = GitRepo::open(temp.path()).unwrap();
        (temp, repo)
    }

    #[test]
    fn test_checkout_missing_branch_fails() {
        let (_temp, repo) = setup_repo();
        assert!(repo.checkout("no-such-branch").is_err());
    }

    #[test]
    fn test_dry_run_checkout_and_pull_succeed() {
        let (_temp, repo) = setup_repo();
        let repo = repo.with_dry_run(true);
        repo.checkout("someone/dev").unwrap();
        repo.pull().unwrap();
        repo.sync_submodules().unwrap();
    }
}
