//! Exit codes for the CLI

use keyforge_core::{ConfigError, GitError, KeyforgeError};

/// General error
pub const ERROR: i32 = 1;

/// Configuration or task validation error
pub const CONFIG_ERROR: i32 = 2;

/// Git error
pub const GIT_ERROR: i32 = 3;

/// Exit code for a fatal error, from the first typed cause in its chain
pub fn for_error(err: &anyhow::Error) -> i32 {
    for cause in err.chain() {
        if let Some(e) = cause.downcast_ref::<KeyforgeError>() {
            return if e.is_config() {
                CONFIG_ERROR
            } else if e.is_git() {
                GIT_ERROR
            } else {
                ERROR
            };
        }
        if cause.is::<ConfigError>() {
            return CONFIG_ERROR;
        }
        if cause.is::<GitError>() {
            return GIT_ERROR;
        }
    }
    ERROR
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_config_error_code() {
        let err: anyhow::Error = KeyforgeError::from(ConfigError::ParseError("bad".into())).into();
        assert_eq!(for_error(&err), CONFIG_ERROR);
    }

    #[test]
    fn test_git_error_code_through_context() {
        let result: Result<(), GitError> = Err(GitError::Pull("diverged".into()));
        let err = result.context("preparing working tree").unwrap_err();
        assert_eq!(for_error(&err), GIT_ERROR);
    }

    #[test]
    fn test_other_errors() {
        let err: anyhow::Error = KeyforgeError::ToolNotFound { tool: "qmk".into() }.into();
        assert_eq!(for_error(&err), ERROR);
        assert_eq!(for_error(&anyhow::anyhow!("boom")), ERROR);
    }
}
