//! Mutable per-run state of the shared working tree
//!
//! A single `RunState` lives for one run and is only touched through
//! `&mut` borrows held by the controller, so access is sequential by
//! construction.

use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

use serde::Serialize;

use keyforge_core::GroupKey;

/// A keymap that did not build
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedBuild {
    pub keyboard: String,
    pub keymap: String,
}

impl fmt::Display for FailedBuild {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.keyboard, self.keymap)
    }
}

/// State of the working tree and counters for one run
#[derive(Debug, Clone)]
pub struct RunState {
    home: GroupKey,
    current_group: GroupKey,
    registered_forks: HashSet<(String, String)>,
    success_count: usize,
    failures: Vec<FailedBuild>,
    checkouts: usize,
}

impl RunState {
    /// Start a run with the tree checked out at `home`
    pub fn new(home: GroupKey) -> Self {
        Self {
            current_group: home.clone(),
            home,
            registered_forks: HashSet::new(),
            success_count: 0,
            failures: Vec::new(),
            checkouts: 0,
        }
    }

    pub fn home(&self) -> &GroupKey {
        &self.home
    }

    /// Group the working tree is checked out to
    pub fn current_group(&self) -> &GroupKey {
        &self.current_group
    }

    pub fn is_home(&self) -> bool {
        self.current_group == self.home
    }

    /// Record a checkout that moved the tree to `group`
    pub fn switch_to(&mut self, group: GroupKey) {
        self.current_group = group;
        self.checkouts += 1;
    }

    /// Whether a fork's remote was already registered this run
    pub fn is_registered(&self, fork: &(String, String)) -> bool {
        self.registered_forks.contains(fork)
    }

    /// Remember a registered fork; returns false if it was already known
    pub fn mark_registered(&mut self, fork: (String, String)) -> bool {
        self.registered_forks.insert(fork)
    }

    pub fn record_success(&mut self) {
        self.success_count += 1;
    }

    pub fn record_failure(&mut self, keyboard: &str, keymap: &str) {
        self.failures.push(FailedBuild {
            keyboard: keyboard.to_string(),
            keymap: keymap.to_string(),
        });
    }

    /// Number of keymaps compiled successfully
    pub fn success_count(&self) -> usize {
        self.success_count
    }

    pub fn failures(&self) -> &[FailedBuild] {
        &self.failures
    }

    /// Checkouts performed since the run started
    pub fn checkouts(&self) -> usize {
        self.checkouts
    }

    pub fn registered_count(&self) -> usize {
        self.registered_forks.len()
    }

    /// Snapshot for reporting
    pub fn summary(&self, duration: Duration) -> RunSummary {
        RunSummary {
            succeeded: self.success_count,
            failed: self.failures.clone(),
            checkouts: self.checkouts,
            remotes_registered: self.registered_forks.len(),
            duration,
        }
    }
}

/// Outcome of a completed run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Keymaps compiled successfully, fallbacks included
    pub succeeded: usize,
    /// Keymaps that failed, after any fallback
    pub failed: Vec<FailedBuild>,
    /// Branch checkouts performed during the plan, restore included
    pub checkouts: usize,
    /// Fork remotes registered
    pub remotes_registered: usize,
    #[serde(with = "duration_secs")]
    pub duration: Duration,
}

mod duration_secs {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(duration.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keyforge_core::ForkFamily;

    #[test]
    fn test_new_state_is_home() {
        let state = RunState::new(ForkFamily::Qmk.home());
        assert!(state.is_home());
        assert_eq!(state.checkouts(), 0);
        assert_eq!(state.success_count(), 0);
    }

    #[test]
    fn test_switch_and_counters() {
        let mut state = RunState::new(ForkFamily::Qmk.home());
        state.switch_to(GroupKey::from_parts("x", "qmk_firmware", "master"));
        assert!(!state.is_home());
        assert_eq!(state.checkouts(), 1);

        state.record_success();
        state.record_failure("kb", "via");
        let summary = state.summary(Duration::from_secs(2));
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed[0].to_string(), "kb:via");
        assert_eq!(summary.checkouts, 1);
    }

    #[test]
    fn test_mark_registered_once() {
        let mut state = RunState::new(ForkFamily::Qmk.home());
        let fork = ("x".to_string(), "qmk_firmware".to_string());
        assert!(!state.is_registered(&fork));
        assert!(state.mark_registered(fork.clone()));
        assert!(!state.mark_registered(fork.clone()));
        assert!(state.is_registered(&fork));
        assert_eq!(state.registered_count(), 1);
    }
}
