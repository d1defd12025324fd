//! Watch mode: re-run tasks when watched files change.
//!
//! A notify watcher observes the project root recursively. Modify and
//! create events are matched against glob patterns from the manifest; each
//! matching entry's task is re-run through the normal runner path, so
//! memoization, fan-out, and failure handling behave exactly as in a
//! one-shot invocation. A run failure is reported and watching continues.

use crate::core::runner::Runner;
use crate::error::Result;
use crate::{dlog, dlog_debug, dlog_warn};
use glob::Pattern;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};

const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(200);

/// One watch rule: glob patterns mapped to the task they trigger.
#[derive(Debug, Clone)]
pub struct WatchEntry {
    /// Patterns matched against paths relative to the project root.
    pub patterns: Vec<Pattern>,
    /// Task to run when a matching path changes.
    pub task: String,
}

/// The full set of watch rules for a project.
#[derive(Debug)]
pub struct WatchSet {
    entries: Vec<WatchEntry>,
    debounce: Duration,
    debounce_state: Mutex<HashMap<PathBuf, Instant>>,
}

impl WatchSet {
    pub fn new(entries: Vec<WatchEntry>) -> Self {
        Self::with_debounce(entries, DEFAULT_DEBOUNCE)
    }

    pub fn with_debounce(entries: Vec<WatchEntry>, debounce: Duration) -> Self {
        Self {
            entries,
            debounce,
            debounce_state: Mutex::new(HashMap::new()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Tasks triggered by a change to `path`, in manifest order, deduped.
    ///
    /// `path` must be relative to the watched root.
    pub fn tasks_for(&self, path: &Path) -> Vec<&str> {
        let mut tasks: Vec<&str> = Vec::new();
        for entry in &self.entries {
            if entry.patterns.iter().any(|p| p.matches_path(path))
                && !tasks.contains(&entry.task.as_str())
            {
                tasks.push(&entry.task);
            }
        }
        tasks
    }

    /// Debounce check: editors fire several events per save, so changes to
    /// the same path inside the window collapse into one trigger.
    fn should_process(&self, path: &Path) -> bool {
        let mut state = self.debounce_state.lock().unwrap();
        let now = Instant::now();
        match state.get(path) {
            Some(last) if now.duration_since(*last) < self.debounce => false,
            _ => {
                state.insert(path.to_path_buf(), now);
                true
            }
        }
    }

    /// Watch `root` recursively and re-run matching tasks until the event
    /// stream closes.
    ///
    /// Run failures are logged and printed but never end the watch; config
    /// errors from the manifest (unknown task in a watch rule) do.
    pub async fn run(&self, runner: &Runner<'_>, root: &Path) -> Result<()> {
        let (tx, mut rx) = tokio::sync::mpsc::channel::<PathBuf>(64);

        let mut watcher = RecommendedWatcher::new(
            move |result: notify::Result<Event>| {
                if let Ok(event) = result {
                    if matches!(
                        event.kind,
                        EventKind::Modify(_) | EventKind::Create(_)
                    ) {
                        for path in event.paths {
                            // The receiver lags only if runs pile up;
                            // dropped events resurface on the next save.
                            let _ = tx.blocking_send(path);
                        }
                    }
                }
            },
            notify::Config::default(),
        )?;
        watcher.watch(root, RecursiveMode::Recursive)?;
        dlog!("Watching {} with {} rule(s)", root.display(), self.entries.len());

        while let Some(path) = rx.recv().await {
            if !self.should_process(&path) {
                continue;
            }
            let relative = path.strip_prefix(root).unwrap_or(&path);
            let tasks = self.tasks_for(relative);
            if tasks.is_empty() {
                dlog_debug!("Change to {} matched no watch rule", relative.display());
                continue;
            }

            for task in tasks {
                dlog!("Change to {} triggers '{}'", relative.display(), task);
                println!("\x1b[2m{} changed, running '{}'\x1b[0m", relative.display(), task);
                match runner.run(task).await {
                    Ok(report) => {
                        if let Some(failure) = &report.failure {
                            dlog_warn!(
                                "Watched run of '{}' failed at '{}': {}",
                                task,
                                failure.task,
                                failure.cause
                            );
                            eprintln!(
                                "\x1b[31m✗ '{}' failed: {}\x1b[0m",
                                failure.task, failure.cause
                            );
                        }
                    }
                    Err(err) => {
                        dlog_warn!("Watched run of '{}' errored: {}", task, err);
                        eprintln!("\x1b[31m✗ {}\x1b[0m", err);
                    }
                }
            }
        }

        Ok(())
    }
}
