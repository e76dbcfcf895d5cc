//! Error types for keyforge

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using KeyforgeError
pub type Result<T> = std::result::Result<T, KeyforgeError>;

/// Main error type for keyforge operations
#[derive(Debug, Error)]
pub enum KeyforgeError {
    /// Configuration and task-source errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Version-control errors against the working tree
    #[error(transparent)]
    Git(#[from] GitError),

    /// A required external tool is not installed
    #[error("Required tool '{tool}' not found on PATH")]
    ToolNotFound { tool: String },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found at {0}")]
    NotFound(PathBuf),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {field} - {message}")]
    InvalidValue { field: String, message: String },

    /// A task record in a source failed validation
    #[error("Invalid task in {source_name} (entry {index}): {message}")]
    InvalidTask {
        source_name: String,
        index: usize,
        message: String,
    },

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// IO error
    #[error("IO error reading config: {0}")]
    Io(#[from] std::io::Error),
}

/// Git-related errors
#[derive(Debug, Error)]
pub enum GitError {
    /// Repository not found
    #[error("Git repository not found at {0}")]
    RepositoryNotFound(PathBuf),

    /// Failed to open repository
    #[error("Failed to open repository: {0}")]
    OpenFailed(String),

    /// Remote not found
    #[error("Remote not found: {0}")]
    RemoteNotFound(String),

    /// Adding a remote failed for a reason other than it already existing
    #[error("Failed to register remote {remote}: {reason}")]
    RemoteRegistration { remote: String, reason: String },

    /// Fetching a remote failed
    #[error("Failed to fetch {remote}: {reason}")]
    Fetch { remote: String, reason: String },

    /// Checking out a branch failed
    #[error("Failed to check out {target}: {reason}")]
    Checkout { target: String, reason: String },

    /// Pulling the current branch failed
    #[error("Failed to pull: {0}")]
    Pull(String),

    /// Submodule synchronisation failed
    #[error("Failed to sync submodules: {0}")]
    SubmoduleSync(String),

    /// The git executable could not be started
    #[error("Failed to run git {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Git2 library error
    #[error("Git error: {0}")]
    Git2(#[from] git2::Error),
}

impl KeyforgeError {
    /// Whether this error came from task validation or configuration
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Whether this error came from the working tree's version control
    pub fn is_git(&self) -> bool {
        matches!(self, Self::Git(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_task_message() {
        let err = ConfigError::InvalidTask {
            source_name: "keyboards.yml".to_string(),
            index: 2,
            message: "keyboard is empty".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid task in keyboards.yml (entry 2): keyboard is empty"
        );
    }

    #[test]
    fn test_error_classification() {
        let config: KeyforgeError = ConfigError::ParseError("bad".to_string()).into();
        assert!(config.is_config());
        assert!(!config.is_git());

        let git: KeyforgeError = GitError::Pull("diverged".to_string()).into();
        assert!(git.is_git());
        assert!(!git.is_config());
    }
}
