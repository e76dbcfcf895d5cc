//! Build execution reporting

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use keyforge_core::GroupKey;

/// Events emitted while a plan runs
#[derive(Debug, Clone)]
pub enum BuildEvent {
    /// Execution of a plan is starting
    PlanStarted {
        tasks: usize,
        keymaps: usize,
        groups: usize,
    },
    /// A fork remote was registered (or found already registered)
    RemoteRegistered {
        remote: String,
        url: String,
        already_existed: bool,
    },
    /// The working tree moved to another group
    GroupSwitched {
        from: GroupKey,
        to: GroupKey,
        target: String,
    },
    /// A compile is starting
    CompileStarted { keyboard: String, keymap: String },
    /// The compiler produced output
    Output {
        keyboard: String,
        keymap: String,
        line: String,
        is_stderr: bool,
    },
    /// A compile succeeded
    CompileSucceeded {
        keyboard: String,
        keymap: String,
        duration: Duration,
    },
    /// A compile failed; stale artifacts listed in `cleaned` were removed
    CompileFailed {
        keyboard: String,
        keymap: String,
        duration: Duration,
        cleaned: Vec<PathBuf>,
    },
    /// The sentinel keymap failed and the fallback keymap is being tried
    FallbackStarted {
        keyboard: String,
        from: String,
        to: String,
    },
    /// The working tree was returned to the home group
    HomeRestored { target: String },
    /// All tasks completed
    AllCompleted {
        succeeded: usize,
        failed: usize,
        duration: Duration,
    },
}

/// Trait for reporting build progress
pub trait BuildReporter: Send + Sync {
    /// Handle a build event
    fn report(&self, event: &BuildEvent);
}

/// Simple reporter that logs to tracing
#[derive(Debug, Default)]
pub struct TracingReporter;

impl BuildReporter for TracingReporter {
    fn report(&self, event: &BuildEvent) {
        match event {
            BuildEvent::PlanStarted {
                tasks,
                keymaps,
                groups,
            } => {
                tracing::info!(tasks, keymaps, groups, "starting build plan");
            }
            BuildEvent::RemoteRegistered {
                remote,
                url,
                already_existed,
            } => {
                if *already_existed {
                    tracing::info!(%remote, %url, "fork remote already exists");
                } else {
                    tracing::info!(%remote, %url, "registered fork remote");
                }
            }
            BuildEvent::GroupSwitched { from, to, target } => {
                tracing::info!(%from, %to, checkout = %target, "switched group");
            }
            BuildEvent::CompileStarted { keyboard, keymap } => {
                tracing::debug!(%keyboard, %keymap, "compiling");
            }
            BuildEvent::Output {
                keyboard,
                keymap,
                line,
                is_stderr,
            } => {
                if *is_stderr {
                    tracing::debug!("[{}:{}] {}", keyboard, keymap, line);
                } else {
                    tracing::trace!("[{}:{}] {}", keyboard, keymap, line);
                }
            }
            BuildEvent::CompileSucceeded {
                keyboard,
                keymap,
                duration,
            } => {
                tracing::info!(
                    "{}:{} compiled in {:.1}s",
                    keyboard,
                    keymap,
                    duration.as_secs_f64()
                );
            }
            BuildEvent::CompileFailed {
                keyboard,
                keymap,
                duration,
                cleaned,
            } => {
                tracing::error!(
                    cleaned = cleaned.len(),
                    "{}:{} failed after {:.1}s",
                    keyboard,
                    keymap,
                    duration.as_secs_f64()
                );
            }
            BuildEvent::FallbackStarted { keyboard, from, to } => {
                tracing::warn!(%keyboard, %from, %to, "retrying with fallback keymap");
            }
            BuildEvent::HomeRestored { target } => {
                tracing::info!(checkout = %target, "restored home branch");
            }
            BuildEvent::AllCompleted {
                succeeded,
                failed,
                duration,
            } => {
                tracing::info!(
                    "Build complete: {} succeeded, {} failed ({:.1}s)",
                    succeeded,
                    failed,
                    duration.as_secs_f64()
                );
            }
        }
    }
}

/// Reporter that collects events for later inspection (useful for testing)
#[derive(Debug, Default)]
pub struct CollectingReporter {
    events: std::sync::Mutex<Vec<BuildEvent>>,
}

impl CollectingReporter {
    /// Get all collected events
    pub fn events(&self) -> Vec<BuildEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl BuildReporter for CollectingReporter {
    fn report(&self, event: &BuildEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

/// Registry of build reporters
pub struct BuildReporterRegistry {
    reporters: Vec<Arc<dyn BuildReporter>>,
}

impl BuildReporterRegistry {
    pub fn new() -> Self {
        Self {
            reporters: vec![Arc::new(TracingReporter)],
        }
    }

    pub fn empty() -> Self {
        Self {
            reporters: Vec::new(),
        }
    }

    pub fn register<R: BuildReporter + 'static>(&mut self, reporter: R) {
        self.reporters.push(Arc::new(reporter));
    }

    pub fn all(&self) -> &[Arc<dyn BuildReporter>] {
        &self.reporters
    }
}

impl Default for BuildReporterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl BuildReporter for BuildReporterRegistry {
    /// Broadcast an event to all registered reporters
    fn report(&self, event: &BuildEvent) {
        for reporter in &self.reporters {
            reporter.report(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started() -> BuildEvent {
        BuildEvent::CompileStarted {
            keyboard: "planck/rev6".to_string(),
            keymap: "default".to_string(),
        }
    }

    #[test]
    fn test_collecting_reporter() {
        let reporter = CollectingReporter::default();
        reporter.report(&started());
        reporter.report(&BuildEvent::CompileSucceeded {
            keyboard: "planck/rev6".to_string(),
            keymap: "default".to_string(),
            duration: Duration::from_secs(5),
        });

        assert_eq!(reporter.events().len(), 2);
    }

    #[test]
    fn test_tracing_reporter() {
        let reporter = TracingReporter;
        // Just verify it doesn't panic
        reporter.report(&started());
        reporter.report(&BuildEvent::AllCompleted {
            succeeded: 1,
            failed: 0,
            duration: Duration::from_secs(1),
        });
    }

    #[test]
    fn test_empty_registry() {
        let registry = BuildReporterRegistry::empty();
        assert!(registry.all().is_empty());
    }

    #[test]
    fn test_broadcast() {
        let collecting = Arc::new(CollectingReporter::default());
        let mut registry = BuildReporterRegistry::empty();
        registry.reporters.push(collecting.clone());

        registry.report(&started());

        assert_eq!(collecting.events().len(), 1);
    }

    #[test]
    fn test_register() {
        let mut registry = BuildReporterRegistry::empty();
        registry.register(TracingReporter);
        registry.register(CollectingReporter::default());
        assert_eq!(registry.all().len(), 2);
    }
}
