//! Task source flags shared by `build` and `plan`

use std::path::{Path, PathBuf};

use clap::Args;
use tracing::{debug, info};

use keyforge_core::config::{load_config_or_default, validate_config, Config};
use keyforge_core::sources::{
    discover_declarative_sources, AutoDetectSource, KeyboardScanner, TaskAggregator,
    VialDetectSource,
};
use keyforge_core::{ForkFamily, KeyboardTask};

/// Where tasks come from and which tree they build against
#[derive(Debug, Clone, Args)]
pub struct SourceArgs {
    /// Path to the QMK firmware working tree
    #[arg(long, env = "QMK_HOME")]
    pub qmk_home: Option<PathBuf>,

    /// Build every keyboard found in the working tree
    #[arg(long)]
    pub auto_detect: bool,

    /// Limit auto-detection to keyboards matching this glob
    #[arg(long, value_name = "GLOB")]
    pub keyboards: Option<String>,

    /// Ignore declarative keyboards.yml files
    #[arg(long)]
    pub no_config: bool,

    /// Glob for declarative task files
    #[arg(long, value_name = "GLOB")]
    pub config_glob: Option<String>,

    /// Target the vial fork family
    #[arg(long)]
    pub vial: bool,
}

impl SourceArgs {
    /// Load the settings file (or defaults) and apply flag overrides
    pub fn resolve_config(&self, cwd: &Path) -> anyhow::Result<(Config, Option<PathBuf>)> {
        let (mut config, path) = load_config_or_default(cwd)?;

        if let Some(qmk_home) = &self.qmk_home {
            config.qmk_home = cwd.join(qmk_home);
        }
        if self.auto_detect {
            config.sources.auto_detect = true;
        }
        if let Some(pattern) = &self.keyboards {
            config.sources.keyboards = Some(pattern.clone());
        }
        if self.no_config {
            config.sources.declarative = false;
        }
        if let Some(glob) = &self.config_glob {
            config.sources.config_glob = glob.clone();
        }
        if self.vial {
            config.family = ForkFamily::Vial;
        }

        validate_config(&config)?;
        debug!(
            qmk_home = %config.qmk_home.display(),
            family = %config.family,
            "resolved configuration"
        );
        Ok((config, path))
    }

    /// Register the enabled sources in merge order
    pub fn aggregator(&self, config: &Config, cwd: &Path) -> anyhow::Result<TaskAggregator> {
        let mut aggregator = TaskAggregator::new(config.family);

        let scanner = || -> anyhow::Result<KeyboardScanner> {
            let scanner = KeyboardScanner::new(&config.qmk_home);
            Ok(match &config.sources.keyboards {
                Some(pattern) => scanner.with_selector(pattern)?,
                None => scanner,
            })
        };

        if config.sources.auto_detect {
            aggregator.register(Box::new(AutoDetectSource::new(
                scanner()?,
                config.build.sentinel_keymap.clone(),
            )));
        }

        if config.sources.declarative {
            let files = discover_declarative_sources(
                cwd,
                &config.sources.config_glob,
                Some(&config.qmk_home),
            )?;
            for file in files {
                aggregator.register(Box::new(file));
            }
        }

        if config.family == ForkFamily::Vial {
            aggregator.register(Box::new(VialDetectSource::new(scanner()?)));
        }

        Ok(aggregator)
    }

    /// Load, validate and merge every enabled source
    pub fn gather(&self, config: &Config, cwd: &Path) -> anyhow::Result<Vec<KeyboardTask>> {
        let aggregator = self.aggregator(config, cwd)?;
        info!(sources = ?aggregator.names(), "gathering tasks");
        Ok(aggregator.collect()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn args() -> SourceArgs {
        SourceArgs {
            qmk_home: None,
            auto_detect: false,
            keyboards: None,
            no_config: false,
            config_glob: None,
            vial: false,
        }
    }

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn test_flags_override_defaults() {
        let temp = TempDir::new().unwrap();
        let mut args = args();
        args.qmk_home = Some(PathBuf::from("tree"));
        args.vial = true;
        args.no_config = true;

        let (config, path) = args.resolve_config(temp.path()).unwrap();
        assert!(path.is_none());
        assert_eq!(config.qmk_home, temp.path().join("tree"));
        assert_eq!(config.family, ForkFamily::Vial);
        assert!(!config.sources.declarative);
    }

    #[test]
    fn test_gather_merges_detected_and_declared() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "qmk_firmware/keyboards/planck/keyboard.json", "{}");
        write(temp.path(), "qmk_firmware/keyboards/crkbd/rules.mk", "");
        write(
            temp.path(),
            "keyboards.yml",
            "- keyboard: planck\n  keymaps: [default]\n",
        );
        // inside the working tree, ignored
        write(
            temp.path(),
            "qmk_firmware/keyboards.yml",
            "- keyboard: ignored\n  keymaps: [default]\n",
        );

        let mut args = args();
        args.auto_detect = true;
        let (config, _) = args.resolve_config(temp.path()).unwrap();
        let tasks = args.gather(&config, temp.path()).unwrap();

        let names: Vec<&str> = tasks.iter().map(|t| t.keyboard.as_str()).collect();
        assert_eq!(names, vec!["crkbd", "planck"]);
        let planck = &tasks[1];
        assert_eq!(planck.keymaps, vec!["via", "default"]);
        assert!(planck.auto_detected);
    }

    #[test]
    fn test_invalid_record_aborts_gather() {
        let temp = TempDir::new().unwrap();
        write(
            temp.path(),
            "keyboards.yml",
            "- keyboard: \"\"\n  keymaps: [default]\n",
        );

        let args = args();
        let (config, _) = args.resolve_config(temp.path()).unwrap();
        let err = args.gather(&config, temp.path()).unwrap_err();
        assert_eq!(crate::exit_codes::for_error(&err), crate::exit_codes::CONFIG_ERROR);
    }
}
