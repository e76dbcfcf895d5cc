//! Build command

use std::ffi::OsString;
use std::path::Path;

use clap::Args;
use console::style;
use tracing::{debug, info};

use keyforge_git::GitRepo;
use keyforge_tasks::{
    BuildController, BuildEvent, BuildPlan, BuildReporter, BuildReporterRegistry,
    ControllerOptions, QmkCompiler, RunSummary,
};

use super::sources::SourceArgs;
use crate::cli::output::{self, plural};
use crate::cli::{Cli, OutputFormat};

/// Gather tasks, then build every keymap against the working tree
#[derive(Debug, Args)]
pub struct BuildCommand {
    #[command(flatten)]
    pub sources: SourceArgs,

    /// Sync submodules after every checkout
    #[arg(long)]
    pub sync_submodules: bool,

    /// Print git and compiler commands instead of running them; also on
    /// whenever DRY_RUN is set, whatever its value
    #[arg(long)]
    pub dry_run: bool,
}

/// Any defined `DRY_RUN`, even empty or `0`, requests a dry run
fn dry_run_requested(flag: bool, env: Option<OsString>) -> bool {
    flag || env.is_some()
}

impl BuildCommand {
    /// Execute the build command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        let cwd = std::env::current_dir()?;
        let summary = self.run(cli, &cwd)?;

        match cli.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
            OutputFormat::Text if !cli.quiet => print_summary(&summary),
            OutputFormat::Text => {}
        }

        Ok(())
    }

    /// Gather, plan and build; the summary is returned even for an empty plan
    pub fn run(&self, cli: &Cli, cwd: &Path) -> anyhow::Result<RunSummary> {
        let dry_run = dry_run_requested(self.dry_run, std::env::var_os("DRY_RUN"));
        info!(
            dry_run,
            sync_submodules = self.sync_submodules,
            "executing build command"
        );
        let (mut config, _) = self.sources.resolve_config(cwd)?;
        if self.sync_submodules {
            config.build.sync_submodules = true;
        }

        let tasks = self.sources.gather(&config, cwd)?;
        let plan = BuildPlan::new(tasks, config.family);
        let text = cli.format == OutputFormat::Text && !cli.quiet;

        if text && plan.is_empty() {
            output::warning("No keyboards to build.");
        } else if text {
            output::info(&format!(
                "{} across {} in {}",
                plural(plan.keymap_count(), "keymap"),
                plural(plan.len(), "keyboard"),
                plural(plan.groups().len(), "group"),
            ));
            if dry_run {
                println!(
                    "{}",
                    style("[DRY RUN - git and qmk commands are only logged]")
                        .yellow()
                        .bold()
                );
            }
            println!();
        }

        let repo = GitRepo::open(&config.qmk_home)?.with_dry_run(dry_run);
        if let Some(branch) = repo.current_branch() {
            debug!(%branch, "working tree branch before run");
        }
        let compiler =
            QmkCompiler::locate(&config.build.compiler, &config.qmk_home, dry_run)?;

        let mut reporters = BuildReporterRegistry::new();
        if text {
            reporters.register(ConsoleReporter::new(cli.verbose));
        }

        let mut controller = BuildController::new(
            repo,
            compiler,
            ControllerOptions::from_config(&config),
            Box::new(reporters),
        );
        Ok(controller.execute(&plan)?)
    }
}

fn print_summary(summary: &RunSummary) {
    println!();
    output::success(&format!("Compiled {}.", plural(summary.succeeded, "keymap")));
    if !summary.failed.is_empty() {
        output::error(&format!("{} failed:", plural(summary.failed.len(), "keymap")));
        for failure in &summary.failed {
            eprintln!("    {} {}", style("✗").red(), failure);
        }
    }
    println!(
        "{}",
        output::key_value(
            "checkouts",
            &format!(
                "{} ({} registered)",
                summary.checkouts,
                plural(summary.remotes_registered, "remote")
            )
        )
    );
    println!(
        "{}",
        output::key_value("duration", &format!("{:.1}s", summary.duration.as_secs_f64()))
    );
}

/// Console reporter with live progress
struct ConsoleReporter {
    verbose: bool,
}

impl ConsoleReporter {
    fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl BuildReporter for ConsoleReporter {
    fn report(&self, event: &BuildEvent) {
        match event {
            BuildEvent::PlanStarted { .. } => {}
            BuildEvent::RemoteRegistered {
                remote,
                url,
                already_existed,
            } => {
                if self.verbose || !already_existed {
                    println!(
                        "  {} remote {} {}",
                        style("+").dim(),
                        style(remote).bold(),
                        style(url).dim()
                    );
                }
            }
            BuildEvent::GroupSwitched { target, .. } => {
                println!(
                    "  {} checkout {}",
                    style("─").dim(),
                    output::path_style().apply_to(target)
                );
            }
            BuildEvent::CompileStarted { keyboard, keymap } => {
                if self.verbose {
                    println!(
                        "  {} {}",
                        style("▸").dim(),
                        output::target_style().apply_to(format!("{}:{}", keyboard, keymap))
                    );
                }
            }
            BuildEvent::Output {
                keyboard,
                keymap,
                line,
                is_stderr,
            } => {
                if self.verbose {
                    let tag = format!("[{}:{}]", keyboard, keymap);
                    if *is_stderr {
                        println!("    {} {}", style(tag).red().dim(), line);
                    } else {
                        println!("    {} {}", style(tag).dim(), line);
                    }
                }
            }
            BuildEvent::CompileSucceeded {
                keyboard,
                keymap,
                duration,
            } => {
                println!(
                    "  {} {} {}",
                    style("✓").green(),
                    style(format!("{}:{}", keyboard, keymap)).green(),
                    style(format!("{:.1}s", duration.as_secs_f64())).dim()
                );
            }
            BuildEvent::CompileFailed {
                keyboard,
                keymap,
                duration,
                cleaned,
            } => {
                println!(
                    "  {} {} {}",
                    style("✗").red(),
                    style(format!("{}:{}", keyboard, keymap)).red(),
                    style(format!("{:.1}s", duration.as_secs_f64())).dim()
                );
                if self.verbose {
                    for path in cleaned {
                        println!(
                            "    {} removed {}",
                            style("-").dim(),
                            output::path_style().apply_to(path.display())
                        );
                    }
                }
            }
            BuildEvent::FallbackStarted { keyboard, from, to } => {
                println!(
                    "  {} {}: {} failed, trying {}",
                    style("!").yellow(),
                    keyboard,
                    from,
                    style(to).yellow()
                );
            }
            BuildEvent::HomeRestored { target } => {
                println!(
                    "  {} restored {}",
                    style("─").dim(),
                    output::path_style().apply_to(target)
                );
            }
            BuildEvent::AllCompleted { .. } => {}
        }
    }
}
