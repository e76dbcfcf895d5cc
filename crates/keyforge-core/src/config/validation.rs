//! Configuration validation

use tracing::debug;

use crate::error::{ConfigError, Result};

use super::types::Config;

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    debug!("validating configuration");
    validate_paths(config)?;
    validate_sources(config)?;
    validate_build(config)?;
    debug!("configuration validation passed");
    Ok(())
}

fn validate_paths(config: &Config) -> Result<()> {
    if config.qmk_home.as_os_str().is_empty() {
        return Err(ConfigError::InvalidValue {
            field: "qmk_home".to_string(),
            message: "working tree path cannot be empty".to_string(),
        }
        .into());
    }
    Ok(())
}

fn validate_sources(config: &Config) -> Result<()> {
    if config.sources.declarative && config.sources.config_glob.trim().is_empty() {
        return Err(ConfigError::InvalidValue {
            field: "sources.config_glob".to_string(),
            message: "glob cannot be empty when declarative sources are enabled".to_string(),
        }
        .into());
    }

    if let Err(e) = glob::Pattern::new(&config.sources.config_glob) {
        return Err(ConfigError::InvalidValue {
            field: "sources.config_glob".to_string(),
            message: e.to_string(),
        }
        .into());
    }

    if let Some(selector) = &config.sources.keyboards {
        if let Err(e) = globset::Glob::new(selector) {
            return Err(ConfigError::InvalidValue {
                field: "sources.keyboards".to_string(),
                message: e.to_string(),
            }
            .into());
        }
    }

    Ok(())
}

fn validate_build(config: &Config) -> Result<()> {
    let build = &config.build;

    if build.compiler.trim().is_empty() {
        return Err(ConfigError::InvalidValue {
            field: "build.compiler".to_string(),
            message: "compiler cannot be empty".to_string(),
        }
        .into());
    }

    for (field, value) in [
        ("build.sentinel_keymap", &build.sentinel_keymap),
        ("build.fallback_keymap", &build.fallback_keymap),
    ] {
        if value.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: field.to_string(),
                message: "keymap cannot be empty".to_string(),
            }
            .into());
        }
    }

    if build.sentinel_keymap == build.fallback_keymap {
        return Err(ConfigError::InvalidValue {
            field: "build.fallback_keymap".to_string(),
            message: "must differ from build.sentinel_keymap".to_string(),
        }
        .into());
    }

    if let Some(ext) = build
        .artifact_extensions
        .iter()
        .find(|e| e.is_empty() || e.starts_with('.'))
    {
        return Err(ConfigError::InvalidValue {
            field: "build.artifact_extensions".to_string(),
            message: format!("'{}' must be a bare extension such as 'hex'", ext),
        }
        .into());
    }

    Ok(())
}
