//! Compile executor: runs the firmware compiler per keymap, isolates
//! failures and applies the fallback keymap to auto-detected boards

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Instant;

use tracing::{debug, warn};

use keyforge_core::task::artifact_stem;
use keyforge_core::{KeyboardTask, KeyforgeError, Result};

use crate::reporter::{BuildEvent, BuildReporter};

/// Captured result of one compiler invocation
#[derive(Debug, Clone, Default)]
pub struct CompileOutput {
    /// Exit status was zero
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl CompileOutput {
    pub fn succeeded() -> Self {
        Self {
            success: true,
            ..Default::default()
        }
    }

    pub fn failed(stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }
}

/// Something that can compile one keyboard/keymap pair in the working tree
pub trait Compiler {
    /// Compile; never errors, the exit status is the only signal
    fn compile(&mut self, keyboard: &str, keymap: &str) -> CompileOutput;
}

/// `qmk compile -kb <keyboard> -km <keymap>`
#[derive(Debug, Clone)]
pub struct QmkCompiler {
    program: PathBuf,
    qmk_home: PathBuf,
    dry_run: bool,
}

impl QmkCompiler {
    pub fn new(program: impl Into<PathBuf>, qmk_home: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            qmk_home: qmk_home.into(),
            dry_run: false,
        }
    }

    /// Find `program` on PATH.
    ///
    /// A missing tool is only an error outside dry runs; a dry run never
    /// spawns it.
    pub fn locate(program: &str, qmk_home: &Path, dry_run: bool) -> Result<Self> {
        let resolved = match which::which(program) {
            Ok(path) => path,
            Err(_) if dry_run => PathBuf::from(program),
            Err(_) => {
                return Err(KeyforgeError::ToolNotFound {
                    tool: program.to_string(),
                })
            }
        };
        debug!(program = %resolved.display(), "using compiler");
        Ok(Self::new(resolved, qmk_home).with_dry_run(dry_run))
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl Compiler for QmkCompiler {
    fn compile(&mut self, keyboard: &str, keymap: &str) -> CompileOutput {
        if self.dry_run {
            tracing::info!(
                "[dry-run] {} compile -kb {} -km {}",
                self.program.display(),
                keyboard,
                keymap
            );
            return CompileOutput::succeeded();
        }

        let output = Command::new(&self.program)
            .args(["compile", "-kb", keyboard, "-km", keymap])
            .current_dir(&self.qmk_home)
            .env("QMK_HOME", &self.qmk_home)
            .output();

        match output {
            Ok(output) => CompileOutput {
                success: output.status.success(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            },
            Err(e) => {
                warn!(error = %e, "failed to spawn compiler");
                CompileOutput::failed(format!("failed to spawn {}: {}", self.program.display(), e))
            }
        }
    }
}

/// Removes build artifacts left behind by a failed compile
#[derive(Debug, Clone)]
pub struct ArtifactCleaner {
    dir: PathBuf,
    extensions: Vec<String>,
}

impl ArtifactCleaner {
    pub fn new(dir: impl Into<PathBuf>, extensions: Vec<String>) -> Self {
        Self {
            dir: dir.into(),
            extensions,
        }
    }

    /// Paths the compiler would produce for this pair
    pub fn candidates(&self, keyboard: &str, keymap: &str) -> Vec<PathBuf> {
        let stem = artifact_stem(keyboard, keymap);
        self.extensions
            .iter()
            .map(|ext| self.dir.join(format!("{}.{}", stem, ext)))
            .collect()
    }

    /// Delete whichever candidates exist; returns the removed paths
    pub fn clean(&self, keyboard: &str, keymap: &str) -> Vec<PathBuf> {
        let mut removed = Vec::new();
        for path in self.candidates(keyboard, keymap) {
            if !path.is_file() {
                continue;
            }
            match std::fs::remove_file(&path) {
                Ok(()) => {
                    debug!(path = %path.display(), "removed stale artifact");
                    removed.push(path);
                }
                Err(e) => warn!(path = %path.display(), error = %e, "could not remove artifact"),
            }
        }
        removed
    }
}

/// Result of building one keymap of a task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileOutcome {
    /// The requested keymap built
    Succeeded,
    /// The requested keymap failed and the fallback built
    SucceededWithFallback { fallback: String },
    /// Nothing built; `keymap` is the last keymap attempted
    Failed { keymap: String },
}

impl CompileOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }
}

/// Runs compiles, reports them and cleans up after failures
pub struct CompileExecutor<C: Compiler> {
    compiler: C,
    cleaner: ArtifactCleaner,
    sentinel_keymap: String,
    fallback_keymap: String,
}

impl<C: Compiler> CompileExecutor<C> {
    pub fn new(
        compiler: C,
        cleaner: ArtifactCleaner,
        sentinel_keymap: impl Into<String>,
        fallback_keymap: impl Into<String>,
    ) -> Self {
        Self {
            compiler,
            cleaner,
            sentinel_keymap: sentinel_keymap.into(),
            fallback_keymap: fallback_keymap.into(),
        }
    }

    pub fn compiler(&self) -> &C {
        &self.compiler
    }

    /// Compile one pair. Failures are reported and cleaned up, never raised.
    pub fn compile(&mut self, keyboard: &str, keymap: &str, reporter: &dyn BuildReporter) -> bool {
        let start = Instant::now();
        reporter.report(&BuildEvent::CompileStarted {
            keyboard: keyboard.to_string(),
            keymap: keymap.to_string(),
        });

        let output = self.compiler.compile(keyboard, keymap);
        for (text, is_stderr) in [(&output.stdout, false), (&output.stderr, true)] {
            for line in text.lines().filter(|l| !l.trim().is_empty()) {
                reporter.report(&BuildEvent::Output {
                    keyboard: keyboard.to_string(),
                    keymap: keymap.to_string(),
                    line: line.to_string(),
                    is_stderr,
                });
            }
        }

        let duration = start.elapsed();
        if output.success {
            reporter.report(&BuildEvent::CompileSucceeded {
                keyboard: keyboard.to_string(),
                keymap: keymap.to_string(),
                duration,
            });
            return true;
        }

        let cleaned = self.cleaner.clean(keyboard, keymap);
        reporter.report(&BuildEvent::CompileFailed {
            keyboard: keyboard.to_string(),
            keymap: keymap.to_string(),
            duration,
            cleaned,
        });
        false
    }

    /// Compile one keymap of a task, retrying once with the fallback keymap
    /// when an auto-detected task's sentinel keymap fails
    pub fn compile_with_fallback(
        &mut self,
        task: &KeyboardTask,
        keymap: &str,
        reporter: &dyn BuildReporter,
    ) -> CompileOutcome {
        if self.compile(&task.keyboard, keymap, reporter) {
            return CompileOutcome::Succeeded;
        }

        if !self.should_fall_back(task, keymap) {
            return CompileOutcome::Failed {
                keymap: keymap.to_string(),
            };
        }

        let fallback = self.fallback_keymap.clone();
        reporter.report(&BuildEvent::FallbackStarted {
            keyboard: task.keyboard.clone(),
            from: keymap.to_string(),
            to: fallback.clone(),
        });
        if self.compile(&task.keyboard, &fallback, reporter) {
            CompileOutcome::SucceededWithFallback { fallback }
        } else {
            CompileOutcome::Failed { keymap: fallback }
        }
    }

    fn should_fall_back(&self, task: &KeyboardTask, keymap: &str) -> bool {
        task.auto_detected && keymap == self.sentinel_keymap
    }
}
