//! Task sources and their aggregation into one merged task list

pub mod declarative;
pub mod detect;
pub mod record;

use tracing::{debug, info};

use crate::error::Result;
use crate::merge::merge_sources;
use crate::task::{ForkFamily, KeyboardTask};

pub use declarative::{discover_declarative_sources, DeclarativeSource};
pub use detect::{AutoDetectSource, DetectedKeyboard, KeyboardScanner, VialDetectSource};
pub use record::{ForkRecord, TaskRecord};

/// Something that produces a list of build tasks
pub trait TaskSource: Send + Sync {
    /// Human-readable source name used in logs and errors
    fn name(&self) -> String;

    /// Load and validate the source's tasks, resolving fork defaults for `family`
    fn load(&self, family: ForkFamily) -> Result<Vec<KeyboardTask>>;
}

/// Ordered list of sources; later sources override earlier ones when merged
pub struct TaskAggregator {
    family: ForkFamily,
    sources: Vec<Box<dyn TaskSource>>,
}

impl TaskAggregator {
    /// Create an aggregator with no sources
    pub fn new(family: ForkFamily) -> Self {
        Self {
            family,
            sources: Vec::new(),
        }
    }

    /// Append a source
    pub fn register(&mut self, source: Box<dyn TaskSource>) {
        self.sources.push(source);
    }

    /// Names of all registered sources, in merge order
    pub fn names(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    pub fn family(&self) -> ForkFamily {
        self.family
    }

    /// Load every source, then merge.
    ///
    /// All sources are loaded and validated before anything is merged, so an
    /// invalid record anywhere aborts with no partial result.
    pub fn collect(&self) -> Result<Vec<KeyboardTask>> {
        let mut loaded = Vec::with_capacity(self.sources.len());
        for source in &self.sources {
            let tasks = source.load(self.family)?;
            debug!(source = %source.name(), count = tasks.len(), "loaded task source");
            loaded.push(tasks);
        }

        let merged = merge_sources(loaded, self.family);
        info!(
            sources = self.sources.len(),
            tasks = merged.len(),
            "merged task sources"
        );
        Ok(merged)
    }
}
