//! Raw task records as written in declarative files, and their validation

use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use tracing::debug;

use crate::error::{ConfigError, Result};
use crate::task::{ForkFamily, ForkReference, KeyboardTask};

/// A task record before validation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Keyboard identifier
    #[serde(default)]
    pub keyboard: Option<String>,

    /// Keymaps; kept untyped so a non-list is reported as a validation error
    #[serde(default)]
    pub keymaps: Option<Value>,

    /// Optional fork to build against
    #[serde(default)]
    pub fork: Option<ForkRecord>,
}

/// A fork record before defaults are resolved
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ForkRecord {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub repository: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
}

impl TaskRecord {
    /// Validate the record and resolve fork defaults for `family`
    pub fn into_task(self, family: ForkFamily, source: &str, index: usize) -> Result<KeyboardTask> {
        let invalid = |message: &str| ConfigError::InvalidTask {
            source_name: source.to_string(),
            index,
            message: message.to_string(),
        };

        let keyboard = match self.keyboard {
            Some(kb) if !kb.trim().is_empty() => kb.trim().to_string(),
            _ => return Err(invalid("keyboard is missing or empty").into()),
        };

        let keymaps = match self.keymaps {
            Some(Value::Sequence(items)) => items
                .into_iter()
                .map(|item| match item {
                    Value::String(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
                    _ => Err(invalid(&format!(
                        "keymaps for '{}' must be non-empty strings",
                        keyboard
                    ))),
                })
                .collect::<std::result::Result<Vec<_>, _>>()?,
            Some(_) => {
                return Err(invalid(&format!("keymaps for '{}' must be a list", keyboard)).into())
            }
            None => return Err(invalid(&format!("keymaps for '{}' are missing", keyboard)).into()),
        };

        if keymaps.is_empty() {
            return Err(invalid(&format!("keymaps for '{}' cannot be empty", keyboard)).into());
        }

        let mut task = KeyboardTask::new(keyboard, keymaps);

        if let Some(fork) = self.fork {
            let username = match fork.username {
                Some(u) if !u.trim().is_empty() => u.trim().to_string(),
                _ => {
                    return Err(invalid(&format!(
                        "fork for '{}' has no username",
                        task.keyboard
                    ))
                    .into())
                }
            };
            task = task.with_fork(ForkReference::resolve(
                username,
                fork.repository,
                fork.branch,
                family,
            ));
        }

        Ok(task)
    }
}

/// Parse a YAML task list. An empty document is an empty list.
pub fn parse_records(content: &str) -> Result<Vec<TaskRecord>> {
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }
    let records: Option<Vec<TaskRecord>> =
        serde_yaml::from_str(content).map_err(ConfigError::YamlError)?;
    Ok(records.unwrap_or_default())
}

/// Validate every record of one source, failing on the first invalid one
pub fn validate_records(
    records: Vec<TaskRecord>,
    family: ForkFamily,
    source: &str,
) -> Result<Vec<KeyboardTask>> {
    let tasks = records
        .into_iter()
        .enumerate()
        .map(|(index, record)| record.into_task(family, source, index))
        .collect::<Result<Vec<_>>>()?;
    debug!(source, count = tasks.len(), "validated task records");
    Ok(tasks)
}
