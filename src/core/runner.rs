//! Concurrent task execution.
//!
//! The runner resolves a target task into a plan, then spawns every
//! reachable task exactly once. Each task's future awaits the shared
//! completion handles of its dependencies before running its own action,
//! so independent branches fan out concurrently while the dependency
//! order is preserved. A failed dependency short-circuits its dependents
//! without cancelling unrelated branches already in flight.

use crate::core::graph::TaskRegistry;
use crate::core::task::{TaskOutcome, TaskStatus};
use crate::error::{Error, Result};
use crate::{dlog, dlog_warn};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Failure signal propagated from a task to its dependents.
///
/// Kept separate from [`Error`] so it can be cloned through the shared
/// completion handles; it always names the originally failing task, even
/// after passing through a chain of dependents.
#[derive(Debug, Clone)]
struct TaskFailure {
    task: String,
    message: String,
}

type CompletionHandle = Shared<BoxFuture<'static, std::result::Result<(), TaskFailure>>>;

/// Per-invocation runner options.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Convert failures of check tasks into non-blocking warnings.
    pub continue_on_error: bool,
}

/// A suppressed check-task failure.
#[derive(Debug, Clone)]
pub struct Warning {
    /// The check task that failed.
    pub task: String,
    /// The failure message.
    pub message: String,
}

/// The failure that decided a run's outcome.
#[derive(Debug, Clone)]
pub struct Failure {
    /// The task whose action failed.
    pub task: String,
    /// The failure message.
    pub cause: String,
}

/// Per-run bookkeeping, shared between the spawned task futures.
///
/// Appended to only when a task reaches a state transition, so dependents
/// never observe partial state.
#[derive(Debug, Default)]
struct Ledger {
    statuses: HashMap<String, TaskStatus>,
    elapsed: HashMap<String, Duration>,
    warnings: Vec<Warning>,
}

impl Ledger {
    fn mark_running(&mut self, name: &str) {
        self.statuses.insert(name.to_string(), TaskStatus::Running);
    }

    fn mark_succeeded(&mut self, name: &str, elapsed: Duration) {
        self.statuses.insert(name.to_string(), TaskStatus::Succeeded);
        self.elapsed.insert(name.to_string(), elapsed);
    }

    fn mark_failed(&mut self, name: &str, error: String, elapsed: Duration) {
        self.statuses
            .insert(name.to_string(), TaskStatus::Failed { error });
        self.elapsed.insert(name.to_string(), elapsed);
    }

    fn mark_skipped(&mut self, name: &str) {
        self.statuses
            .entry(name.to_string())
            .or_insert(TaskStatus::Skipped);
    }

    fn warn(&mut self, task: &str, message: String) {
        self.warnings.push(Warning {
            task: task.to_string(),
            message,
        });
    }
}

/// Result of one top-level invocation.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Per-task outcomes in plan (dependency) order.
    pub outcomes: Vec<TaskOutcome>,
    /// Suppressed check-task failures.
    pub warnings: Vec<Warning>,
    /// The deciding failure, if the run did not succeed.
    pub failure: Option<Failure>,
}

impl RunReport {
    /// Check if the run succeeded overall.
    pub fn succeeded(&self) -> bool {
        self.failure.is_none()
    }

    /// Status of a task in this run.
    pub fn status_of(&self, name: &str) -> Option<&TaskStatus> {
        self.outcomes
            .iter()
            .find(|outcome| outcome.name == name)
            .map(|outcome| &outcome.status)
    }

    /// Convert the report's failure, if any, into an error.
    pub fn to_result(&self) -> Result<()> {
        match &self.failure {
            None => Ok(()),
            Some(failure) => Err(Error::ActionFailure {
                task: failure.task.clone(),
                cause: failure.cause.clone(),
            }),
        }
    }
}

/// Executes tasks from a registry, respecting declared dependencies.
pub struct Runner<'r> {
    registry: &'r TaskRegistry,
    options: RunOptions,
}

impl<'r> Runner<'r> {
    /// Create a runner over a registry.
    pub fn new(registry: &'r TaskRegistry, options: RunOptions) -> Self {
        Self { registry, options }
    }

    /// Run the named task and everything it transitively depends on.
    ///
    /// Configuration errors (`UnknownTask`, `CyclicDependency`) are
    /// returned as `Err` before any action runs. An action failure is
    /// recorded in the report's `failure` field so per-task statuses stay
    /// observable; use [`RunReport::to_result`] to surface it as an error.
    pub async fn run(&self, target: &str) -> Result<RunReport> {
        let plan = self.registry.resolve(target)?;
        dlog!("Run '{}': {} task(s) planned", target, plan.len());

        let ledger = Arc::new(Mutex::new(Ledger::default()));
        let mut handles: HashMap<String, CompletionHandle> =
            HashMap::with_capacity(plan.len());

        // Plan order guarantees every dependency handle exists before its
        // dependents are spawned.
        for name in plan.order() {
            let task = self
                .registry
                .get(name)
                .ok_or_else(|| Error::UnknownTask(name.clone()))?;
            let mut dep_handles = Vec::with_capacity(task.deps.len());
            for dep in &task.deps {
                let handle = handles
                    .get(dep)
                    .cloned()
                    .ok_or_else(|| Error::UnknownTask(dep.clone()))?;
                dep_handles.push(handle);
            }

            let action = task.action.clone();
            let check = task.check;
            let continue_on_error = self.options.continue_on_error;
            let task_name = name.clone();
            let ledger = Arc::clone(&ledger);

            let body = async move {
                // Await deps in declared order. All tasks are already
                // spawned, so siblings still overlap in time.
                for dep in dep_handles {
                    if let Err(failure) = dep.await {
                        ledger.lock().unwrap().mark_skipped(&task_name);
                        return Err(failure);
                    }
                }

                ledger.lock().unwrap().mark_running(&task_name);
                let started = Instant::now();
                let result = match &action {
                    Some(run) => run().await,
                    None => Ok(()),
                };
                let elapsed = started.elapsed();

                match result {
                    Ok(()) => {
                        ledger.lock().unwrap().mark_succeeded(&task_name, elapsed);
                        Ok(())
                    }
                    Err(err) if check && continue_on_error => {
                        dlog_warn!(
                            "Check task '{}' failed, continuing: {}",
                            task_name,
                            err
                        );
                        let mut ledger = ledger.lock().unwrap();
                        ledger.mark_succeeded(&task_name, elapsed);
                        ledger.warn(&task_name, err.to_string());
                        Ok(())
                    }
                    Err(err) => {
                        let message = err.to_string();
                        ledger.lock().unwrap().mark_failed(
                            &task_name,
                            message.clone(),
                            elapsed,
                        );
                        Err(TaskFailure {
                            task: task_name.clone(),
                            message,
                        })
                    }
                }
            };

            let join = tokio::spawn(body);
            let panic_name = name.clone();
            let handle: CompletionHandle = async move {
                match join.await {
                    Ok(result) => result,
                    Err(err) => Err(TaskFailure {
                        task: panic_name,
                        message: format!("task panicked: {}", err),
                    }),
                }
            }
            .boxed()
            .shared();
            handles.insert(name.clone(), handle);
        }

        let target_handle = handles
            .get(target)
            .cloned()
            .ok_or_else(|| Error::UnknownTask(target.to_string()))?;
        let outcome = target_handle.await;

        // Let every branch reach a terminal state so the report is
        // complete; results of branches unrelated to the target outcome
        // are discarded.
        for handle in handles.into_values() {
            let _ = handle.await;
        }

        let ledger = ledger.lock().unwrap();
        let outcomes = plan
            .order()
            .iter()
            .map(|name| TaskOutcome {
                name: name.clone(),
                status: ledger
                    .statuses
                    .get(name)
                    .cloned()
                    .unwrap_or(TaskStatus::Pending),
                elapsed: ledger.elapsed.get(name).copied(),
            })
            .collect();
        let failure = match outcome {
            Ok(()) => None,
            Err(f) => {
                dlog!("Run '{}' failed at task '{}': {}", target, f.task, f.message);
                Some(Failure {
                    task: f.task,
                    cause: f.message,
                })
            }
        };

        Ok(RunReport {
            outcomes,
            warnings: ledger.warnings.clone(),
            failure,
        })
    }
}
