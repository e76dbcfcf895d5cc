//! keyforge Tasks - build plan execution against a shared working tree
//!
//! This crate orders merged keyboard tasks so each fork is checked out at
//! most once, compiles every keymap with failure isolation, and restores
//! the base branch when the run ends.

pub mod controller;
pub mod executor;
pub mod plan;
pub mod reporter;
pub mod scheduler;
pub mod state;

pub use controller::{BuildController, ControllerOptions};
pub use executor::{
    ArtifactCleaner, CompileExecutor, CompileOutcome, CompileOutput, Compiler, QmkCompiler,
};
pub use plan::{BuildPlan, PlanGroup};
pub use reporter::{
    BuildEvent, BuildReporter, BuildReporterRegistry, CollectingReporter, TracingReporter,
};
pub use scheduler::BranchScheduler;
pub use state::{FailedBuild, RunState, RunSummary};
