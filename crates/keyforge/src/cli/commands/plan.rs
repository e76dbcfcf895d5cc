//! Plan command

use clap::Args;
use console::style;
use tracing::info;

use keyforge_tasks::BuildPlan;

use super::sources::SourceArgs;
use crate::cli::output::{self, plural};
use crate::cli::{Cli, OutputFormat};

/// Show the grouped build plan without touching the working tree
#[derive(Debug, Args)]
pub struct PlanCommand {
    #[command(flatten)]
    pub sources: SourceArgs,
}

impl PlanCommand {
    /// Execute the plan command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!("executing plan command");
        let cwd = std::env::current_dir()?;
        let (config, config_path) = self.sources.resolve_config(&cwd)?;
        let tasks = self.sources.gather(&config, &cwd)?;
        let plan = BuildPlan::new(tasks, config.family);

        if cli.format == OutputFormat::Json {
            println!("{}", serde_json::to_string_pretty(&plan)?);
            return Ok(());
        }
        if cli.quiet {
            return Ok(());
        }

        println!("{}", output::header("Build plan"));
        println!(
            "{}",
            output::key_value(
                "config",
                &config_path
                    .map(|p| output::path_style().apply_to(p.display()).to_string())
                    .unwrap_or_else(|| style("defaults").dim().to_string())
            )
        );
        println!(
            "{}",
            output::key_value(
                "working tree",
                &output::path_style()
                    .apply_to(config.qmk_home.display())
                    .to_string()
            )
        );
        println!("{}", output::key_value("family", config.family.as_str()));
        println!();

        if plan.is_empty() {
            output::warning("No keyboards to build.");
            return Ok(());
        }

        print!("{}", plan.execution_plan());
        println!();
        output::info(&format!(
            "{} across {}, {} to switch",
            plural(plan.keymap_count(), "keymap"),
            plural(plan.len(), "keyboard"),
            plural(plan.groups().len().saturating_sub(1), "fork group"),
        ));
        Ok(())
    }
}
