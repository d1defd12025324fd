//! Task data model for the build graph.
//!
//! Tasks are the atomic units of build work. Each task has a unique name,
//! an ordered list of dependency names, and an optional async action.
//! Tasks without an action are pure aggregators of their dependencies.

use crate::error::Result;
use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Async unit of work a task performs once its dependencies are done.
///
/// Boxed so heterogeneous closures (subprocess spawns, inline test
/// actions) can live in the same registry; Arc'd so the runner can move
/// a clone into the spawned task future.
pub type Action = Arc<dyn Fn() -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// Per-invocation status of a task.
///
/// Statuses live in the run report, not on the registered task, so they
/// reset naturally at the start of every top-level invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    /// Not yet started in this invocation.
    Pending,
    /// Dependencies satisfied, action in progress.
    Running,
    /// Action (or aggregation) completed successfully.
    Succeeded,
    /// Action reported failure.
    Failed {
        /// Error message describing the failure.
        error: String,
    },
    /// Never started because a dependency failed.
    Skipped,
}

impl Default for TaskStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::Running => write!(f, "running"),
            TaskStatus::Succeeded => write!(f, "succeeded"),
            TaskStatus::Failed { error } => write!(f, "failed: {}", error),
            TaskStatus::Skipped => write!(f, "skipped"),
        }
    }
}

impl TaskStatus {
    /// Check if the status is terminal for this invocation.
    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            TaskStatus::Succeeded | TaskStatus::Failed { .. } | TaskStatus::Skipped
        )
    }
}

/// A named unit of build work with declared prerequisites.
#[derive(Clone)]
pub struct Task {
    /// Unique name identifying the task in the registry.
    pub name: String,
    /// Names of tasks that must complete before this one, in declared order.
    /// They need not be registered yet; resolution happens at run time.
    pub deps: Vec<String>,
    /// The work to perform. `None` means the task only aggregates its deps.
    pub action: Option<Action>,
    /// Marks a lint-style check whose failure is suppressible in
    /// continue-on-error mode.
    pub check: bool,
}

impl Task {
    /// Create an aggregator task with no dependencies and no action.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            deps: Vec::new(),
            action: None,
            check: false,
        }
    }

    /// Set the ordered dependency list.
    pub fn deps<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.deps = deps.into_iter().map(Into::into).collect();
        self
    }

    /// Attach an async action.
    pub fn action<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.action = Some(Arc::new(move || Box::pin(f())));
        self
    }

    /// Attach an already-boxed action.
    pub fn boxed_action(mut self, action: Action) -> Self {
        self.action = Some(action);
        self
    }

    /// Mark this task as a suppressible check task.
    pub fn check(mut self) -> Self {
        self.check = true;
        self
    }

    /// Check if the task has no action of its own.
    pub fn is_aggregator(&self) -> bool {
        self.action.is_none()
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("deps", &self.deps)
            .field("action", &self.action.as_ref().map(|_| "<action>"))
            .field("check", &self.check)
            .finish()
    }
}

/// Outcome of a single task within one invocation.
#[derive(Debug, Clone)]
pub struct TaskOutcome {
    /// The task's name.
    pub name: String,
    /// Terminal status for this invocation.
    pub status: TaskStatus,
    /// Wall-clock action duration. `None` when the action never ran.
    pub elapsed: Option<Duration>,
}
