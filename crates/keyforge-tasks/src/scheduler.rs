//! Branch scheduler: moves the shared working tree between groups

use tracing::{debug, info};

use keyforge_core::{ForkFamily, KeyboardTask, Result};
use keyforge_git::{RemoteAdd, VersionControl};

use crate::reporter::{BuildEvent, BuildReporter};
use crate::state::RunState;

/// Decides when the working tree has to switch branches and performs the
/// switch, registering fork remotes on first use
#[derive(Debug, Clone, Copy)]
pub struct BranchScheduler {
    family: ForkFamily,
    sync_submodules: bool,
}

impl BranchScheduler {
    pub fn new(family: ForkFamily, sync_submodules: bool) -> Self {
        Self {
            family,
            sync_submodules,
        }
    }

    pub fn family(&self) -> ForkFamily {
        self.family
    }

    /// Check out the base branch and bring it up to date
    pub fn prepare<V: VersionControl + ?Sized>(&self, vcs: &mut V) -> Result<()> {
        let base = self.family.default_branch();
        vcs.checkout(base)?;
        vcs.pull()?;
        self.sync(vcs)?;
        info!(branch = base, "working tree prepared");
        Ok(())
    }

    /// Make sure the tree is checked out at the task's group.
    ///
    /// Returns true if a checkout happened.
    pub fn ensure_group<V: VersionControl + ?Sized>(
        &self,
        vcs: &mut V,
        state: &mut RunState,
        task: &KeyboardTask,
        reporter: &dyn BuildReporter,
    ) -> Result<bool> {
        let group = task.group_key(self.family);
        if &group == state.current_group() {
            return Ok(false);
        }

        if let Some(fork) = task.target.fork() {
            let key = fork.registration_key();
            if !state.is_registered(&key) {
                let remote = fork.remote_name();
                let url = fork.remote_url();
                let outcome = vcs.add_remote(&remote, &url)?;
                vcs.fetch(&remote)?;
                state.mark_registered(key);
                reporter.report(&BuildEvent::RemoteRegistered {
                    remote,
                    url,
                    already_existed: matches!(outcome, RemoteAdd::AlreadyExists { .. }),
                });
            }
        }

        let target = task.target.checkout_target(self.family);
        vcs.checkout(&target)?;
        self.sync(vcs)?;

        let from = state.current_group().clone();
        state.switch_to(group.clone());
        reporter.report(&BuildEvent::GroupSwitched {
            from,
            to: group,
            target,
        });
        Ok(true)
    }

    /// Return the tree to the base branch if it is elsewhere
    pub fn restore_home<V: VersionControl + ?Sized>(
        &self,
        vcs: &mut V,
        state: &mut RunState,
        reporter: &dyn BuildReporter,
    ) -> Result<bool> {
        if state.is_home() {
            debug!("already on home group, nothing to restore");
            return Ok(false);
        }

        let target = self.family.default_branch().to_string();
        vcs.checkout(&target)?;
        self.sync(vcs)?;
        state.switch_to(self.family.home());
        reporter.report(&BuildEvent::HomeRestored { target });
        Ok(true)
    }

    fn sync<V: VersionControl + ?Sized>(&self, vcs: &mut V) -> Result<()> {
        if self.sync_submodules {
            vcs.sync_submodules()?;
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::reporter::CollectingReporter;
    use keyforge_core::error::GitError;
    use keyforge_core::ForkReference;

    /// Records every call; `fail_checkout` makes checkouts of that target fail
    #[derive(Debug, Default)]
    pub(crate) struct MockVcs {
        pub calls: Vec<String>,
        pub existing_remotes: Vec<String>,
        pub fail_checkout: Option<String>,
        pub fail_remote: bool,
    }

    impl MockVcs {
        pub fn checkouts(&self) -> Vec<&str> {
            self.calls
                .iter()
                .filter_map(|c| c.strip_prefix("checkout "))
                .collect()
        }

        pub fn count(&self, prefix: &str) -> usize {
            self.calls.iter().filter(|c| c.starts_with(prefix)).count()
        }
    }

    impl VersionControl for MockVcs {
        fn checkout(&mut self, target: &str) -> keyforge_git::Result<()> {
            self.calls.push(format!("checkout {}", target));
            if self.fail_checkout.as_deref() == Some(target) {
                return Err(GitError::Checkout {
                    target: target.to_string(),
                    reason: "pathspec did not match".to_string(),
                });
            }
            Ok(())
        }

        fn pull(&mut self) -> keyforge_git::Result<()> {
            self.calls.push("pull".to_string());
            Ok(())
        }

        fn fetch(&mut self, remote: &str) -> keyforge_git::Result<()> {
            self.calls.push(format!("fetch {}", remote));
            Ok(())
        }

        fn add_remote(&mut self, name: &str, url: &str) -> keyforge_git::Result<RemoteAdd> {
            self.calls.push(format!("remote {} {}", name, url));
            if self.fail_remote {
                return Err(GitError::RemoteRegistration {
                    remote: name.to_string(),
                    reason: "invalid url".to_string(),
                });
            }
            if self.existing_remotes.iter().any(|r| r == name) {
                return Ok(RemoteAdd::AlreadyExists {
                    url: Some(url.to_string()),
                });
            }
            self.existing_remotes.push(name.to_string());
            Ok(RemoteAdd::Added)
        }

        fn sync_submodules(&mut self) -> keyforge_git::Result<()> {
            self.calls.push("submodules".to_string());
            Ok(())
        }
    }

    fn forked(kb: &str, user: &str) -> KeyboardTask {
        KeyboardTask::new(kb, ["default"]).with_fork(ForkReference::resolve(
            user,
            None,
            Some("dev".to_string()),
            ForkFamily::Qmk,
        ))
    }

    #[test]
    fn test_same_user_different_repositories_get_separate_remotes() {
        let scheduler = BranchScheduler::new(ForkFamily::Qmk, false);
        let mut vcs = MockVcs::default();
        let mut state = RunState::new(ForkFamily::Qmk.home());
        let reporter = CollectingReporter::default();
        let vial = KeyboardTask::new("b", ["vial"]).with_fork(ForkReference::resolve(
            "alice",
            Some("vial-qmk".to_string()),
            Some("dev".to_string()),
            ForkFamily::Qmk,
        ));

        scheduler
            .ensure_group(&mut vcs, &mut state, &forked("a", "alice"), &reporter)
            .unwrap();
        scheduler
            .ensure_group(&mut vcs, &mut state, &vial, &reporter)
            .unwrap();

        assert_eq!(state.registered_count(), 2);
        assert_eq!(
            vcs.checkouts(),
            vec!["alice_qmk_firmware/dev", "alice_vial-qmk/dev"]
        );
        assert!(vcs
            .calls
            .contains(&"remote alice_vial-qmk https://github.com/alice/vial-qmk.git".to_string()));
    }

    #[test]
    fn test_same_group_does_not_switch() {
        let scheduler = BranchScheduler::new(ForkFamily::Qmk, false);
        let mut vcs = MockVcs::default();
        let mut state = RunState::new(ForkFamily::Qmk.home());
        let reporter = CollectingReporter::default();

        let switched = scheduler
            .ensure_group(
                &mut vcs,
                &mut state,
                &KeyboardTask::new("a", ["default"]),
                &reporter,
            )
            .unwrap();
        assert!(!switched);
        assert!(vcs.calls.is_empty());
    }

    #[test]
    fn test_fork_registers_fetches_and_checks_out() {
        let scheduler = BranchScheduler::new(ForkFamily::Qmk, true);
        let mut vcs = MockVcs::default();
        let mut state = RunState::new(ForkFamily::Qmk.home());
        let reporter = CollectingReporter::default();

        scheduler
            .ensure_group(&mut vcs, &mut state, &forked("a", "alice"), &reporter)
            .unwrap();

        assert_eq!(
            vcs.calls,
            vec![
                "remote alice_qmk_firmware https://github.com/alice/qmk_firmware.git",
                "fetch alice_qmk_firmware",
                "checkout alice_qmk_firmware/dev",
                "submodules",
            ]
        );
        assert_eq!(state.current_group().as_str(), "alice-qmk_firmware-dev");
        assert_eq!(state.registered_count(), 1);
    }

    #[test]
    fn test_existing_remote_is_not_fatal() {
        let scheduler = BranchScheduler::new(ForkFamily::Qmk, false);
        let mut vcs = MockVcs {
            existing_remotes: vec!["alice_qmk_firmware".to_string()],
            ..Default::default()
        };
        let mut state = RunState::new(ForkFamily::Qmk.home());
        let reporter = CollectingReporter::default();

        scheduler
            .ensure_group(&mut vcs, &mut state, &forked("a", "alice"), &reporter)
            .unwrap();

        let existed = reporter.events().iter().any(|e| {
            matches!(
                e,
                BuildEvent::RemoteRegistered {
                    already_existed: true,
                    ..
                }
            )
        });
        assert!(existed);
    }

    #[test]
    fn test_remote_failure_is_fatal() {
        let scheduler = BranchScheduler::new(ForkFamily::Qmk, false);
        let mut vcs = MockVcs {
            fail_remote: true,
            ..Default::default()
        };
        let mut state = RunState::new(ForkFamily::Qmk.home());
        let reporter = CollectingReporter::default();

        let err = scheduler
            .ensure_group(&mut vcs, &mut state, &forked("a", "alice"), &reporter)
            .unwrap_err();
        assert!(err.is_git());
        assert!(state.is_home());
        assert_eq!(vcs.count("checkout"), 0);
    }

    #[test]
    fn test_restore_home_only_when_away() {
        let scheduler = BranchScheduler::new(ForkFamily::Vial, false);
        let mut vcs = MockVcs::default();
        let mut state = RunState::new(ForkFamily::Vial.home());
        let reporter = CollectingReporter::default();

        assert!(!scheduler
            .restore_home(&mut vcs, &mut state, &reporter)
            .unwrap());

        state.switch_to(keyforge_core::GroupKey::from_parts("x", "vial-qmk", "vial"));
        assert!(scheduler
            .restore_home(&mut vcs, &mut state, &reporter)
            .unwrap());
        assert_eq!(vcs.checkouts(), vec!["vial"]);
        assert!(state.is_home());
    }

    #[test]
    fn test_prepare_checks_out_base_and_pulls() {
        let scheduler = BranchScheduler::new(ForkFamily::Qmk, false);
        let mut vcs = MockVcs::default();
        scheduler.prepare(&mut vcs).unwrap();
        assert_eq!(vcs.calls, vec!["checkout master", "pull"]);
    }
}
