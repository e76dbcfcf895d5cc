//! keyforge Git - version control for the shared firmware working tree
//!
//! Remotes are registered through `git2` so an existing remote is a typed
//! outcome; checkout, fetch, pull and submodule sync go through the `git`
//! CLI so the user's credential setup applies.

mod checkout;
mod remote;
mod repository;

pub use remote::RemoteAdd;
pub use repository::{GitRepo, Result};

/// Operations the build controller needs from the working tree
pub trait VersionControl {
    /// Check out a branch or `remote/branch` ref
    fn checkout(&mut self, target: &str) -> Result<()>;

    /// Update the current branch from its upstream
    fn pull(&mut self) -> Result<()>;

    /// Fetch a remote
    fn fetch(&mut self, remote: &str) -> Result<()>;

    /// Register a remote; an existing one is not an error
    fn add_remote(&mut self, name: &str, url: &str) -> Result<RemoteAdd>;

    /// Sync submodules with the checked-out commit
    fn sync_submodules(&mut self) -> Result<()>;
}

impl VersionControl for GitRepo {
    fn checkout(&mut self, target: &str) -> Result<()> {
        GitRepo::checkout(self, target)
    }

    fn pull(&mut self) -> Result<()> {
        GitRepo::pull(self)
    }

    fn fetch(&mut self, remote: &str) -> Result<()> {
        GitRepo::fetch(self, remote)
    }

    fn add_remote(&mut self, name: &str, url: &str) -> Result<RemoteAdd> {
        GitRepo::add_remote(self, name, url)
    }

    fn sync_submodules(&mut self) -> Result<()> {
        GitRepo::sync_submodules(self)
    }
}
