//! Keyboard auto-detection by scanning the firmware tree
//!
//! A directory under `keyboards/` is a keyboard when it holds a
//! `keyboard.json`, or a `rules.mk` outside any `keymaps` directory. Only
//! leaves count: `planck` is dropped when `planck/rev6` is also a keyboard.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobMatcher};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::{ConfigError, Result};
use crate::task::{ForkFamily, KeyboardTask};

use super::TaskSource;

/// Files whose presence marks a keyboard directory
const MARKER_FILES: &[&str] = &["keyboard.json", "rules.mk"];

const KEYMAPS_DIR: &str = "keymaps";

/// Keymap directory the vial fork ships for supported boards
pub const VIAL_KEYMAP: &str = "vial";

/// A keyboard found in the tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedKeyboard {
    /// Identifier relative to `keyboards/`, `/`-separated
    pub id: String,
    /// Directory of the keyboard
    pub path: PathBuf,
}

impl DetectedKeyboard {
    /// Whether the keyboard ships a keymap with the given name
    pub fn has_keymap(&self, keymap: &str) -> bool {
        self.path.join(KEYMAPS_DIR).join(keymap).is_dir()
    }
}

/// Scans `<qmk_home>/keyboards` for leaf keyboards
#[derive(Debug, Clone)]
pub struct KeyboardScanner {
    keyboards_dir: PathBuf,
    selector: Option<GlobMatcher>,
}

impl KeyboardScanner {
    /// Create a scanner for the working tree at `qmk_home`
    pub fn new(qmk_home: &Path) -> Self {
        Self {
            keyboards_dir: qmk_home.join("keyboards"),
            selector: None,
        }
    }

    /// Limit detection to keyboard identifiers matching `pattern`.
    ///
    /// `*` stays within one path segment; use `**` to cross `/`.
    pub fn with_selector(mut self, pattern: &str) -> Result<Self> {
        let glob = GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .map_err(|e| ConfigError::InvalidValue {
                field: "sources.keyboards".to_string(),
                message: e.to_string(),
            })?;
        self.selector = Some(glob.compile_matcher());
        Ok(self)
    }

    /// Find every leaf keyboard, sorted by identifier
    pub fn scan(&self) -> Result<Vec<DetectedKeyboard>> {
        if !self.keyboards_dir.is_dir() {
            return Err(ConfigError::InvalidValue {
                field: "qmk_home".to_string(),
                message: format!(
                    "no keyboards directory at {}",
                    self.keyboards_dir.display()
                ),
            }
            .into());
        }

        debug!(dir = %self.keyboards_dir.display(), "scanning for keyboards");
        let mut candidates = BTreeSet::new();

        let walker = WalkDir::new(&self.keyboards_dir)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || e.file_name() != KEYMAPS_DIR);

        for entry in walker {
            let entry = entry.map_err(|e| ConfigError::Io(e.into()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let is_marker = entry
                .file_name()
                .to_str()
                .is_some_and(|name| MARKER_FILES.contains(&name));
            if !is_marker {
                continue;
            }
            let Some(dir) = entry.path().parent() else {
                continue;
            };
            if let Some(id) = self.keyboard_id(dir) {
                candidates.insert(id);
            }
        }

        let keyboards: Vec<DetectedKeyboard> = candidates
            .iter()
            .filter(|id| is_leaf(id, &candidates))
            .filter(|id| self.selector.as_ref().map_or(true, |m| m.is_match(id.as_str())))
            .map(|id| DetectedKeyboard {
                id: id.clone(),
                path: self.keyboards_dir.join(id),
            })
            .collect();

        info!(count = keyboards.len(), "detected keyboards");
        Ok(keyboards)
    }

    fn keyboard_id(&self, dir: &Path) -> Option<String> {
        let relative = dir.strip_prefix(&self.keyboards_dir).ok()?;
        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().to_string())
            .collect();
        if parts.is_empty() {
            return None;
        }
        Some(parts.join("/"))
    }
}

fn is_leaf(id: &str, candidates: &BTreeSet<String>) -> bool {
    let prefix = format!("{}/", id);
    !candidates
        .range(prefix.clone()..)
        .next()
        .is_some_and(|next| next.starts_with(&prefix))
}

/// Every detected keyboard, built with the sentinel keymap
#[derive(Debug, Clone)]
pub struct AutoDetectSource {
    scanner: KeyboardScanner,
    sentinel_keymap: String,
}

impl AutoDetectSource {
    pub fn new(scanner: KeyboardScanner, sentinel_keymap: impl Into<String>) -> Self {
        Self {
            scanner,
            sentinel_keymap: sentinel_keymap.into(),
        }
    }
}

impl TaskSource for AutoDetectSource {
    fn name(&self) -> String {
        "auto-detect".to_string()
    }

    fn load(&self, _family: ForkFamily) -> Result<Vec<KeyboardTask>> {
        Ok(self
            .scanner
            .scan()?
            .into_iter()
            .map(|kb| KeyboardTask::new(kb.id, [self.sentinel_keymap.as_str()]).detected())
            .collect())
    }
}

/// Keyboards that ship a `vial` keymap, for runs targeting the vial family
#[derive(Debug, Clone)]
pub struct VialDetectSource {
    scanner: KeyboardScanner,
}

impl VialDetectSource {
    pub fn new(scanner: KeyboardScanner) -> Self {
        Self { scanner }
    }
}

impl TaskSource for VialDetectSource {
    fn name(&self) -> String {
        "vial-detect".to_string()
    }

    fn load(&self, family: ForkFamily) -> Result<Vec<KeyboardTask>> {
        if family != ForkFamily::Vial {
            debug!(%family, "vial detection skipped for non-vial family");
            return Ok(Vec::new());
        }
        Ok(self
            .scanner
            .scan()?
            .into_iter()
            .filter(|kb| kb.has_keymap(VIAL_KEYMAP))
            .map(|kb| KeyboardTask::new(kb.id, [VIAL_KEYMAP]))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "").unwrap();
    }

    fn fixture() -> TempDir {
        let temp = TempDir::new().unwrap();
        let kb = temp.path().join("keyboards");
        touch(&kb, "planck/info.json");
        touch(&kb, "planck/rules.mk");
        touch(&kb, "planck/rev6/keyboard.json");
        touch(&kb, "planck/rev7/rules.mk");
        touch(&kb, "planck/keymaps/default/rules.mk");
        touch(&kb, "crkbd/rev1/keyboard.json");
        touch(&kb, "crkbd/rev1/keymaps/vial/keymap.c");
        touch(&kb, "onekey/keyboard.json");
        touch(&kb, "notes/readme.md");
        temp
    }

    fn ids(keyboards: &[DetectedKeyboard]) -> Vec<&str> {
        keyboards.iter().map(|k| k.id.as_str()).collect()
    }

    #[test]
    fn test_scan_finds_leaf_keyboards() {
        let temp = fixture();
        let keyboards = KeyboardScanner::new(temp.path()).scan().unwrap();
        assert_eq!(
            ids(&keyboards),
            vec!["crkbd/rev1", "onekey", "planck/rev6", "planck/rev7"]
        );
    }

    #[test]
    fn test_scan_with_selector() {
        let temp = fixture();
        let keyboards = KeyboardScanner::new(temp.path())
            .with_selector("planck/*")
            .unwrap()
            .scan()
            .unwrap();
        assert_eq!(ids(&keyboards), vec!["planck/rev6", "planck/rev7"]);
    }

    #[test]
    fn test_selector_star_stays_in_one_segment() {
        let temp = fixture();
        touch(&temp.path().join("keyboards"), "planck/ez/glow/keyboard.json");

        let shallow = KeyboardScanner::new(temp.path())
            .with_selector("planck/*")
            .unwrap()
            .scan()
            .unwrap();
        assert_eq!(ids(&shallow), vec!["planck/rev6", "planck/rev7"]);

        let deep = KeyboardScanner::new(temp.path())
            .with_selector("planck/**")
            .unwrap()
            .scan()
            .unwrap();
        assert_eq!(
            ids(&deep),
            vec!["planck/ez/glow", "planck/rev6", "planck/rev7"]
        );
    }

    #[test]
    fn test_scan_missing_keyboards_dir() {
        let temp = TempDir::new().unwrap();
        assert!(KeyboardScanner::new(temp.path()).scan().is_err());
    }

    #[test]
    fn test_invalid_selector() {
        let temp = fixture();
        assert!(KeyboardScanner::new(temp.path())
            .with_selector("planck/{rev")
            .is_err());
    }

    #[test]
    fn test_auto_detect_uses_sentinel_keymap() {
        let temp = fixture();
        let source = AutoDetectSource::new(KeyboardScanner::new(temp.path()), "via");
        let tasks = source.load(ForkFamily::Qmk).unwrap();
        assert_eq!(tasks.len(), 4);
        assert!(tasks.iter().all(|t| t.keymaps == vec!["via"] && t.auto_detected));
    }

    #[test]
    fn test_vial_detect_only_for_vial_family() {
        let temp = fixture();
        let source = VialDetectSource::new(KeyboardScanner::new(temp.path()));

        assert!(source.load(ForkFamily::Qmk).unwrap().is_empty());

        let tasks = source.load(ForkFamily::Vial).unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].keyboard, "crkbd/rev1");
        assert_eq!(tasks[0].keymaps, vec!["vial"]);
        assert!(!tasks[0].auto_detected);
    }

    #[test]
    fn test_is_leaf() {
        let set: BTreeSet<String> = ["a", "a/b", "ab"].iter().map(|s| s.to_string()).collect();
        assert!(!is_leaf("a", &set));
        assert!(is_leaf("a/b", &set));
        assert!(is_leaf("ab", &set));
    }
}
