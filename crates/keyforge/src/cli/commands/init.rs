//! Init command

use std::path::PathBuf;

use clap::Args;
use console::style;
use tracing::info;

use keyforge_core::config::defaults::{DEFAULT_CONFIG_TEMPLATE, DEFAULT_CONFIG_YAML};
use keyforge_core::config::Config;

use crate::cli::output;
use crate::cli::Cli;

/// Write a default keyforge configuration file
#[derive(Debug, Args)]
pub struct InitCommand {
    /// Force overwrite existing configuration
    #[arg(short, long)]
    pub force: bool,

    /// Write TOML instead of YAML
    #[arg(long)]
    pub toml: bool,

    /// Output file path
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl InitCommand {
    /// Execute the init command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(force = self.force, toml = self.toml, "executing init command");
        let cwd = std::env::current_dir()?;
        let config_path = self.target_path(&cwd);

        if config_path.exists() && !self.force {
            anyhow::bail!(
                "Configuration file already exists at {}. Use --force to overwrite.",
                config_path.display()
            );
        }

        std::fs::write(&config_path, self.render()?)?;

        if !cli.quiet {
            output::success(&format!(
                "Created configuration at {}",
                output::path_style().apply_to(config_path.display())
            ));
            println!();
            println!("Next steps:");
            println!(
                "  1. Point {} at your firmware checkout",
                style("qmk_home").cyan()
            );
            println!(
                "  2. List keyboards in {} or enable auto-detection",
                style("keyboards.yml").cyan()
            );
            println!("  3. Run {} to review the build order", style("keyforge plan").cyan());
        }

        Ok(())
    }

    fn target_path(&self, cwd: &std::path::Path) -> PathBuf {
        let path = self
            .output
            .clone()
            .unwrap_or_else(|| cwd.join(DEFAULT_CONFIG_YAML));
        if self.toml && path.extension().is_some_and(|e| e == "yaml") {
            path.with_extension("toml")
        } else {
            path
        }
    }

    fn render(&self) -> anyhow::Result<String> {
        if self.toml {
            let config: Config = serde_yaml::from_str(DEFAULT_CONFIG_TEMPLATE)?;
            Ok(toml::to_string_pretty(&config)?)
        } else {
            Ok(DEFAULT_CONFIG_TEMPLATE.to_string())
        }
    }
}
