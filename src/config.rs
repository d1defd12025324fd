//! Project manifest (`drover.toml`).
//!
//! The manifest declares the task graph: a `default` task, `[tasks.*]`
//! tables with dependencies and optional commands, and `[[watch]]` rules
//! mapping glob patterns to tasks. Loading validates cross-references
//! (default and watch targets must be defined tasks) so mistakes surface
//! before anything runs.
//!
//! ```toml
//! default = "build"
//!
//! [tasks.sass-lint]
//! command = "stylelint 'src/**/*.scss'"
//! check = true
//!
//! [tasks.sass]
//! deps = ["sass-lint"]
//! command = "sass src/theme.scss dist/theme.css"
//!
//! [tasks.build]
//! deps = ["sass"]
//!
//! [[watch]]
//! patterns = ["src/**/*.scss"]
//! task = "sass"
//! ```

use crate::core::graph::TaskRegistry;
use crate::core::task::Task;
use crate::dlog_debug;
use crate::error::{Error, Result};
use crate::tools::ToolCommand;
use crate::watch::{WatchEntry, WatchSet};
use glob::Pattern;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Manifest filename looked up in the working directory by default.
pub const MANIFEST_FILE: &str = "drover.toml";

/// Root of the parsed manifest.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Manifest {
    /// Task to run when the CLI is invoked without one.
    pub default: Option<String>,
    /// Task definitions, keyed by task name.
    #[serde(default)]
    pub tasks: BTreeMap<String, TaskEntry>,
    /// Watch rules, in declaration order.
    #[serde(default, rename = "watch")]
    pub watches: Vec<WatchRule>,
}

/// One `[tasks.*]` table.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskEntry {
    /// Tasks that must complete first, in declared order.
    #[serde(default)]
    pub deps: Vec<String>,
    /// Command line to run. Omitted for pure aggregator tasks.
    pub command: Option<String>,
    /// Lint-style check whose failure is suppressible with
    /// `--continue-on-lint-error`.
    #[serde(default)]
    pub check: bool,
    /// Working directory for the command, relative to the project root.
    pub cwd: Option<PathBuf>,
}

/// One `[[watch]]` rule.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchRule {
    /// Glob patterns relative to the project root.
    pub patterns: Vec<String>,
    /// Task to run when a matching path changes.
    pub task: String,
}

impl Manifest {
    /// Load and validate a manifest file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let manifest: Manifest = toml::from_str(&text)?;
        manifest.validate()?;
        dlog_debug!(
            "Loaded manifest from {}: {} task(s), {} watch rule(s)",
            path.display(),
            manifest.tasks.len(),
            manifest.watches.len()
        );
        Ok(manifest)
    }

    fn validate(&self) -> Result<()> {
        for (name, entry) in &self.tasks {
            if name.is_empty() {
                return Err(Error::Validation(
                    "task name must be non-empty".to_string(),
                ));
            }
            if let Some(command) = &entry.command {
                if command.trim().is_empty() {
                    return Err(Error::Validation(format!(
                        "Task '{}' has an empty command",
                        name
                    )));
                }
            }
        }
        if let Some(default) = &self.default {
            if !self.tasks.contains_key(default) {
                return Err(Error::Validation(format!(
                    "Default task '{}' is not defined",
                    default
                )));
            }
        }
        for rule in &self.watches {
            if rule.patterns.is_empty() {
                return Err(Error::Validation(format!(
                    "Watch rule for task '{}' has no patterns",
                    rule.task
                )));
            }
            if !self.tasks.contains_key(&rule.task) {
                return Err(Error::Validation(format!(
                    "Watch rule targets unknown task '{}'",
                    rule.task
                )));
            }
        }
        Ok(())
    }

    /// Build a task registry from the manifest.
    ///
    /// Command working directories resolve relative to `root`; tasks
    /// without a `cwd` run in `root` itself.
    pub fn build_registry(&self, root: &Path) -> Result<TaskRegistry> {
        let mut registry = TaskRegistry::new();
        for (name, entry) in &self.tasks {
            let mut task = Task::new(name.clone()).deps(entry.deps.clone());
            if entry.check {
                task = task.check();
            }
            if let Some(command) = &entry.command {
                let cwd = match &entry.cwd {
                    Some(dir) => root.join(dir),
                    None => root.to_path_buf(),
                };
                let tool = ToolCommand::parse(command, Some(cwd))?;
                task = task.boxed_action(tool.into_action());
            }
            registry.register(task)?;
        }
        Ok(registry)
    }

    /// Compile the `[[watch]]` rules into a watch set.
    pub fn watch_set(&self) -> Result<WatchSet> {
        let mut entries = Vec::with_capacity(self.watches.len());
        for rule in &self.watches {
            let patterns = rule
                .patterns
                .iter()
                .map(|p| Pattern::new(p))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            entries.push(WatchEntry {
                patterns,
                task: rule.task.clone(),
            });
        }
        Ok(WatchSet::new(entries))
    }
}
