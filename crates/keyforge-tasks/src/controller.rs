//! Build controller: owns the run state and drives a plan through the
//! shared working tree

use std::path::PathBuf;
use std::time::Instant;

use tracing::{info, instrument, warn};

use keyforge_core::config::Config;
use keyforge_core::{ForkFamily, KeyboardTask, Result};
use keyforge_git::VersionControl;

use crate::executor::{ArtifactCleaner, CompileExecutor, CompileOutcome, Compiler};
use crate::plan::BuildPlan;
use crate::reporter::{BuildEvent, BuildReporter};
use crate::scheduler::BranchScheduler;
use crate::state::{RunState, RunSummary};

/// Settings for one run
#[derive(Debug, Clone)]
pub struct ControllerOptions {
    pub family: ForkFamily,
    pub sync_submodules: bool,
    pub sentinel_keymap: String,
    pub fallback_keymap: String,
    pub artifact_dir: PathBuf,
    pub artifact_extensions: Vec<String>,
    /// Skip the initial checkout and pull of the base branch
    pub skip_prepare: bool,
}

impl ControllerOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            family: config.family,
            sync_submodules: config.build.sync_submodules,
            sentinel_keymap: config.build.sentinel_keymap.clone(),
            fallback_keymap: config.build.fallback_keymap.clone(),
            artifact_dir: config.artifact_dir(),
            artifact_extensions: config.build.artifact_extensions.clone(),
            skip_prepare: false,
        }
    }
}

/// Single owner of the working tree during a run.
///
/// Every mutation goes through `&mut self`; tasks run one at a time.
pub struct BuildController<V: VersionControl, C: Compiler> {
    vcs: V,
    executor: CompileExecutor<C>,
    scheduler: BranchScheduler,
    state: RunState,
    skip_prepare: bool,
    reporter: Box<dyn BuildReporter>,
}

impl<V: VersionControl, C: Compiler> BuildController<V, C> {
    pub fn new(
        vcs: V,
        compiler: C,
        options: ControllerOptions,
        reporter: Box<dyn BuildReporter>,
    ) -> Self {
        let cleaner = ArtifactCleaner::new(options.artifact_dir, options.artifact_extensions);
        Self {
            vcs,
            executor: CompileExecutor::new(
                compiler,
                cleaner,
                options.sentinel_keymap,
                options.fallback_keymap,
            ),
            scheduler: BranchScheduler::new(options.family, options.sync_submodules),
            state: RunState::new(options.family.home()),
            skip_prepare: options.skip_prepare,
            reporter,
        }
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn vcs(&self) -> &V {
        &self.vcs
    }

    pub fn compiler(&self) -> &C {
        self.executor.compiler()
    }

    /// Put the tree on the up-to-date base branch
    pub fn prepare(&mut self) -> Result<()> {
        self.scheduler.prepare(&mut self.vcs)
    }

    /// Switch to the task's group if the tree is elsewhere
    pub fn ensure_group(&mut self, task: &KeyboardTask) -> Result<bool> {
        self.scheduler
            .ensure_group(&mut self.vcs, &mut self.state, task, self.reporter.as_ref())
    }

    /// Return to the base branch if the tree is elsewhere
    pub fn restore_home(&mut self) -> Result<bool> {
        self.scheduler
            .restore_home(&mut self.vcs, &mut self.state, self.reporter.as_ref())
    }

    /// Build one keymap and record the outcome
    pub fn compile_with_fallback(&mut self, task: &KeyboardTask, keymap: &str) -> CompileOutcome {
        let outcome = self
            .executor
            .compile_with_fallback(task, keymap, self.reporter.as_ref());
        match &outcome {
            CompileOutcome::Succeeded | CompileOutcome::SucceededWithFallback { .. } => {
                self.state.record_success()
            }
            CompileOutcome::Failed { keymap } => self.state.record_failure(&task.keyboard, keymap),
        }
        outcome
    }

    /// Run the whole plan.
    ///
    /// Compile failures are recorded and the run continues; a failed branch
    /// switch or remote registration stops the run with an error.
    #[instrument(skip_all, fields(tasks = plan.len(), groups = plan.groups().len()))]
    pub fn execute(&mut self, plan: &BuildPlan) -> Result<RunSummary> {
        let start = Instant::now();
        if plan.family() != self.scheduler.family() {
            warn!(
                plan = %plan.family(),
                controller = %self.scheduler.family(),
                "plan was grouped for a different fork family"
            );
        }

        self.reporter.report(&BuildEvent::PlanStarted {
            tasks: plan.len(),
            keymaps: plan.keymap_count(),
            groups: plan.groups().len(),
        });

        if !self.skip_prepare {
            self.prepare()?;
        }

        for task in plan.tasks() {
            self.ensure_group(task)?;
            for keymap in &task.keymaps {
                self.compile_with_fallback(task, keymap);
            }
        }

        self.restore_home()?;

        let summary = self.state.summary(start.elapsed());
        info!(
            succeeded = summary.succeeded,
            failed = summary.failed.len(),
            checkouts = summary.checkouts,
            "run finished"
        );
        self.reporter.report(&BuildEvent::AllCompleted {
            succeeded: summary.succeeded,
            failed: summary.failed.len(),
            duration: summary.duration,
        });
        Ok(summary)
    }
}
