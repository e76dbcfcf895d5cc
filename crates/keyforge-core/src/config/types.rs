//! Configuration types

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::task::ForkFamily;

use super::defaults::{
    DEFAULT_ARTIFACT_EXTENSIONS, DEFAULT_COMPILER, DEFAULT_CONFIG_GLOB, DEFAULT_FALLBACK_KEYMAP,
    DEFAULT_QMK_HOME, DEFAULT_SENTINEL_KEYMAP,
};

/// Main configuration for keyforge
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to the shared firmware working tree
    pub qmk_home: PathBuf,

    /// Fork family whose defaults apply to tasks without a fork
    pub family: ForkFamily,

    /// Task source configuration
    pub sources: SourcesConfig,

    /// Build configuration
    pub build: BuildConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            qmk_home: PathBuf::from(DEFAULT_QMK_HOME),
            family: ForkFamily::default(),
            sources: SourcesConfig::default(),
            build: BuildConfig::default(),
        }
    }
}

/// Where tasks come from
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    /// Read declarative `keyboards.yml` task lists
    pub declarative: bool,

    /// Glob matching declarative task files, relative to the invocation directory
    pub config_glob: String,

    /// Scan the keyboards tree for buildable keyboards
    pub auto_detect: bool,

    /// Glob over keyboard identifiers limiting auto-detection
    pub keyboards: Option<String>,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            declarative: true,
            config_glob: DEFAULT_CONFIG_GLOB.to_string(),
            auto_detect: false,
            keyboards: None,
        }
    }
}

/// How builds are run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Compiler executable
    pub compiler: String,

    /// Keymap assigned to auto-detected keyboards
    pub sentinel_keymap: String,

    /// Keymap retried when the sentinel keymap fails
    pub fallback_keymap: String,

    /// Directory holding compiled firmware (defaults to `qmk_home`)
    pub artifact_dir: Option<PathBuf>,

    /// Firmware file extensions removed after a failed build
    pub artifact_extensions: Vec<String>,

    /// Sync submodules after every checkout
    pub sync_submodules: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            compiler: DEFAULT_COMPILER.to_string(),
            sentinel_keymap: DEFAULT_SENTINEL_KEYMAP.to_string(),
            fallback_keymap: DEFAULT_FALLBACK_KEYMAP.to_string(),
            artifact_dir: None,
            artifact_extensions: DEFAULT_ARTIFACT_EXTENSIONS
                .iter()
                .map(|e| e.to_string())
                .collect(),
            sync_submodules: false,
        }
    }
}

impl Config {
    /// Directory compiled firmware lands in
    pub fn artifact_dir(&self) -> PathBuf {
        self.build
            .artifact_dir
            .clone()
            .unwrap_or_else(|| self.qmk_home.clone())
    }
}
