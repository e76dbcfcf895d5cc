//! keyforge Core - task model, configuration and source aggregation
//!
//! This crate provides the foundational types, error handling and
//! configuration for keyforge, plus the sources that produce keyboard build
//! tasks and the merge that turns them into one deduplicated list.

pub mod config;
pub mod error;
pub mod merge;
pub mod sources;
pub mod task;

pub use error::{ConfigError, GitError, KeyforgeError, Result};
pub use merge::{full_outer_join, merge_sources, merge_tasks};
pub use sources::{TaskAggregator, TaskSource};
pub use task::{BuildTarget, ForkFamily, ForkReference, GroupKey, KeyboardTask};
