//! Build task model: fork families, fork references, group keys

use std::fmt;

use serde::{Deserialize, Serialize};

/// Family of defaults a run targets when a task names no fork
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForkFamily {
    /// Upstream qmk/qmk_firmware
    #[default]
    Qmk,
    /// vial-kb/vial-qmk
    Vial,
}

impl ForkFamily {
    /// Returns the string representation of the family
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Qmk => "qmk",
            Self::Vial => "vial",
        }
    }

    /// GitHub user owning the family's default repository
    pub fn default_user(&self) -> &'static str {
        match self {
            Self::Qmk => "qmk",
            Self::Vial => "vial-kb",
        }
    }

    /// Name of the family's default repository
    pub fn default_repository(&self) -> &'static str {
        match self {
            Self::Qmk => "qmk_firmware",
            Self::Vial => "vial-qmk",
        }
    }

    /// Branch checked out when a task names no fork
    pub fn default_branch(&self) -> &'static str {
        match self {
            Self::Qmk => "master",
            Self::Vial => "vial",
        }
    }

    /// Group key of the working tree's starting state
    pub fn home(&self) -> GroupKey {
        GroupKey::from_parts(
            self.default_user(),
            self.default_repository(),
            self.default_branch(),
        )
    }
}

impl fmt::Display for ForkFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ForkFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "qmk" => Ok(Self::Qmk),
            "vial" => Ok(Self::Vial),
            _ => Err(format!("Unknown fork family: {}", s)),
        }
    }
}

/// Canonical identity of the remote + branch a task is built against
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupKey(String);

impl GroupKey {
    /// Build a key from user, repository and branch
    pub fn from_parts(user: &str, repository: &str, branch: &str) -> Self {
        Self(format!("{}-{}-{}", user, repository, branch))
    }

    /// The key as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A fork with every default already resolved
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForkReference {
    /// GitHub user owning the fork
    pub username: String,
    /// Repository name
    pub repository: String,
    /// Branch to build from
    pub branch: String,
}

impl ForkReference {
    /// Create a fork reference, filling missing parts from the family defaults
    pub fn resolve(
        username: impl Into<String>,
        repository: Option<String>,
        branch: Option<String>,
        family: ForkFamily,
    ) -> Self {
        Self {
            username: username.into(),
            repository: non_empty(repository)
                .unwrap_or_else(|| family.default_repository().to_string()),
            branch: non_empty(branch).unwrap_or_else(|| family.default_branch().to_string()),
        }
    }

    /// Name of the git remote registered for this fork.
    ///
    /// GitHub usernames never contain `_`, so `user_repo` stays unique per
    /// `(username, repository)` pair.
    pub fn remote_name(&self) -> String {
        format!("{}_{}", self.username, self.repository)
    }

    /// Clone URL of the fork
    pub fn remote_url(&self) -> String {
        format!(
            "https://github.com/{}/{}.git",
            self.username, self.repository
        )
    }

    /// Remote-tracking ref checked out to build this fork
    pub fn checkout_target(&self) -> String {
        format!("{}/{}", self.remote_name(), self.branch)
    }

    /// Identity used to register a remote at most once per run
    pub fn registration_key(&self) -> (String, String) {
        (self.username.clone(), self.repository.clone())
    }

    pub fn group_key(&self) -> GroupKey {
        GroupKey::from_parts(&self.username, &self.repository, &self.branch)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// What a task is built against
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind")]
pub enum BuildTarget {
    /// The run family's default repository and branch
    #[default]
    Upstream,
    /// An explicitly named fork
    Fork(ForkReference),
}

impl BuildTarget {
    /// Group key for this target under the given family
    pub fn group_key(&self, family: ForkFamily) -> GroupKey {
        match self {
            Self::Upstream => family.home(),
            Self::Fork(fork) => fork.group_key(),
        }
    }

    /// The fork, if one is named
    pub fn fork(&self) -> Option<&ForkReference> {
        match self {
            Self::Upstream => None,
            Self::Fork(fork) => Some(fork),
        }
    }

    /// Ref to check out before building this target
    pub fn checkout_target(&self, family: ForkFamily) -> String {
        match self {
            Self::Upstream => family.default_branch().to_string(),
            Self::Fork(fork) => fork.checkout_target(),
        }
    }
}

/// One keyboard to build with one or more keymaps
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyboardTask {
    /// Keyboard identifier, e.g. `planck/rev6`
    pub keyboard: String,
    /// Keymaps to build, deduplicated in first-seen order
    pub keymaps: Vec<String>,
    /// Repository and branch to build against
    #[serde(default)]
    pub target: BuildTarget,
    /// Whether any record merged into this task came from auto-detection
    #[serde(default)]
    pub auto_detected: bool,
}

impl KeyboardTask {
    /// Create an upstream task
    pub fn new<I, S>(keyboard: impl Into<String>, keymaps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut task = Self {
            keyboard: keyboard.into(),
            keymaps: Vec::new(),
            target: BuildTarget::Upstream,
            auto_detected: false,
        };
        task.add_keymaps(keymaps.into_iter().map(Into::into));
        task
    }

    /// Build against the given fork
    pub fn with_fork(mut self, fork: ForkReference) -> Self {
        self.target = BuildTarget::Fork(fork);
        self
    }

    /// Mark as discovered by scanning the keyboards tree
    pub fn detected(mut self) -> Self {
        self.auto_detected = true;
        self
    }

    /// Append keymaps not already present
    pub fn add_keymaps(&mut self, keymaps: impl IntoIterator<Item = String>) {
        for keymap in keymaps {
            if !self.keymaps.contains(&keymap) {
                self.keymaps.push(keymap);
            }
        }
    }

    pub fn group_key(&self, family: ForkFamily) -> GroupKey {
        self.target.group_key(family)
    }

    /// Merge identity: group key plus keyboard
    pub fn identity(&self, family: ForkFamily) -> (GroupKey, String) {
        (self.group_key(family), self.keyboard.clone())
    }

}

/// Firmware file stem the compiler writes, e.g. `planck_rev6_default`
pub fn artifact_stem(keyboard: &str, keymap: &str) -> String {
    format!("{}_{}", keyboard.replace('/', "_"), keymap)
}

impl fmt::Display for KeyboardTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.keyboard, self.keymaps.join(", "))?;
        if let BuildTarget::Fork(fork) = &self.target {
            write!(f, " @ {}", fork.checkout_target())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_group_key() {
        assert_eq!(
            BuildTarget::Upstream.group_key(ForkFamily::Qmk).as_str(),
            "qmk-qmk_firmware-master"
        );
        assert_eq!(
            BuildTarget::Upstream.group_key(ForkFamily::Vial).as_str(),
            "vial-kb-vial-qmk-vial"
        );
    }

    #[test]
    fn test_fork_defaults_resolved() {
        let fork = ForkReference::resolve("drashna", None, None, ForkFamily::Qmk);
        assert_eq!(fork.repository, "qmk_firmware");
        assert_eq!(fork.branch, "master");
        assert_eq!(fork.group_key().as_str(), "drashna-qmk_firmware-master");

        let vial = ForkReference::resolve("someone", None, Some("dev".into()), ForkFamily::Vial);
        assert_eq!(vial.group_key().as_str(), "someone-vial-qmk-dev");
    }

    #[test]
    fn test_blank_optional_fields_use_defaults() {
        let fork = ForkReference::resolve("x", Some("".into()), Some("  ".into()), ForkFamily::Qmk);
        assert_eq!(fork.repository, "qmk_firmware");
        assert_eq!(fork.branch, "master");
    }

    #[test]
    fn test_structurally_equal_forks_group_together() {
        let a = BuildTarget::Fork(ForkReference::resolve(
            "u",
            Some("repo".into()),
            Some("b".into()),
            ForkFamily::Qmk,
        ));
        let b = BuildTarget::Fork(ForkReference::resolve(
            "u",
            Some("repo".into()),
            Some("b".into()),
            ForkFamily::Qmk,
        ));
        assert_eq!(a.group_key(ForkFamily::Qmk), b.group_key(ForkFamily::Qmk));
        assert_ne!(
            a.group_key(ForkFamily::Qmk),
            BuildTarget::Upstream.group_key(ForkFamily::Qmk)
        );
    }

    #[test]
    fn test_group_key_ignores_keyboard_and_keymaps() {
        let a = KeyboardTask::new("planck/rev6", ["default"]);
        let b = KeyboardTask::new("crkbd", ["via", "vial"]);
        assert_eq!(a.group_key(ForkFamily::Qmk), b.group_key(ForkFamily::Qmk));
    }

    #[test]
    fn test_checkout_targets() {
        let fork = ForkReference::resolve("drashna", None, Some("dev".into()), ForkFamily::Qmk);
        assert_eq!(fork.checkout_target(), "drashna_qmk_firmware/dev");
        assert_eq!(
            fork.remote_url(),
            "https://github.com/drashna/qmk_firmware.git"
        );
        assert_eq!(BuildTarget::Upstream.checkout_target(ForkFamily::Vial), "vial");
    }

    #[test]
    fn test_remote_name_distinguishes_repositories() {
        let qmk = ForkReference::resolve("alice", None, None, ForkFamily::Qmk);
        let vial = ForkReference::resolve("alice", None, None, ForkFamily::Vial);
        assert_eq!(qmk.remote_name(), "alice_qmk_firmware");
        assert_eq!(vial.remote_name(), "alice_vial-qmk");
        assert_ne!(qmk.checkout_target(), vial.checkout_target());
    }

    #[test]
    fn test_new_task_dedups_keymaps() {
        let task = KeyboardTask::new("kb", ["a", "b", "a"]);
        assert_eq!(task.keymaps, vec!["a", "b"]);
    }

    #[test]
    fn test_artifact_stem() {
        assert_eq!(
            artifact_stem("handwired/dactyl/promicro", "default"),
            "handwired_dactyl_promicro_default"
        );
    }

    #[test]
    fn test_family_from_str() {
        assert_eq!("VIAL".parse::<ForkFamily>().unwrap(), ForkFamily::Vial);
        assert!("other".parse::<ForkFamily>().is_err());
    }
}
