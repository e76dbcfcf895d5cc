//! Declarative `keyboards.yml` task lists

use std::path::{Path, PathBuf};

use glob::glob;
use tracing::{debug, info};

use crate::error::{ConfigError, Result};
use crate::task::{ForkFamily, KeyboardTask};

use super::record::{parse_records, validate_records};
use super::TaskSource;

/// One declarative task file
#[derive(Debug, Clone)]
pub struct DeclarativeSource {
    path: PathBuf,
}

impl DeclarativeSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the task file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TaskSource for DeclarativeSource {
    fn name(&self) -> String {
        self.path.display().to_string()
    }

    fn load(&self, family: ForkFamily) -> Result<Vec<KeyboardTask>> {
        let content = std::fs::read_to_string(&self.path).map_err(ConfigError::Io)?;
        let records = parse_records(&content).map_err(|e| {
            ConfigError::ParseError(format!("{}: {}", self.path.display(), e))
        })?;
        validate_records(records, family, &self.name())
    }
}

/// Find declarative task files under `root` matching `pattern`.
///
/// Files inside `exclude` (the firmware working tree) are skipped. The
/// result is sorted by path so source order is stable between runs.
pub fn discover_declarative_sources(
    root: &Path,
    pattern: &str,
    exclude: Option<&Path>,
) -> Result<Vec<DeclarativeSource>> {
    let full_pattern = root.join(pattern).to_string_lossy().to_string();
    debug!(pattern = %full_pattern, "searching for declarative task files");

    let exclude = exclude.map(|p| p.canonicalize().unwrap_or_else(|_| p.to_path_buf()));

    let mut paths = Vec::new();
    for entry in glob(&full_pattern).map_err(|e| ConfigError::InvalidValue {
        field: "sources.config_glob".to_string(),
        message: e.to_string(),
    })? {
        let path = entry.map_err(|e| ConfigError::InvalidValue {
            field: "sources.config_glob".to_string(),
            message: e.to_string(),
        })?;

        if !path.is_file() {
            continue;
        }

        if let Some(exclude) = &exclude {
            let canonical = path.canonicalize().unwrap_or_else(|_| path.clone());
            if canonical.starts_with(exclude) {
                debug!(path = %path.display(), "skipping task file inside working tree");
                continue;
            }
        }

        paths.push(path);
    }

    paths.sort();
    info!(count = paths.len(), "found declarative task files");
    Ok(paths.into_iter().map(DeclarativeSource::new).collect())
}
