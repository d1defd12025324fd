//! End-to-end pipelines over a programmatic registry.

use drover::{RunOptions, Runner, Task, TaskRegistry, TaskStatus};
use std::sync::{Arc, Mutex};

type Log = Arc<Mutex<Vec<String>>>;

fn recording(name: &str, log: &Log) -> Task {
    let log = Arc::clone(log);
    let recorded = name.to_string();
    Task::new(name).action(move || {
        let log = Arc::clone(&log);
        let recorded = recorded.clone();
        async move {
            log.lock().unwrap().push(recorded);
            Ok(())
        }
    })
}

fn failing(name: &str) -> Task {
    let message = format!("{} failed", name);
    Task::new(name).action(move || {
        let message = message.clone();
        async move { Err(drover::Error::Validation(message)) }
    })
}

/// A registry shaped like a real frontend build: lint tasks feed compile
/// tasks, aggregators fan everything in.
fn build_registry(log: &Log) -> TaskRegistry {
    let mut registry = TaskRegistry::new();
    for name in ["js-lint", "sass-lint", "ts-lint"] {
        registry.register(recording(name, log).check()).unwrap();
    }
    registry
        .register(recording("sass", log).deps(["sass-lint"]))
        .unwrap();
    registry
        .register(recording("css-min", log).deps(["sass"]))
        .unwrap();
    registry
        .register(recording("ts", log).deps(["ts-lint"]))
        .unwrap();
    registry
        .register(recording("dev", log).deps(["js-lint"]))
        .unwrap();
    registry
        .register(recording("production", log).deps(["js-lint"]))
        .unwrap();
    registry
        .register(Task::new("compress").deps(["dev", "production"]))
        .unwrap();
    registry
        .register(Task::new("lint").deps(["js-lint", "sass-lint", "ts-lint"]))
        .unwrap();
    registry
        .register(Task::new("build").deps(["compress", "css-min", "ts"]))
        .unwrap();
    registry
}

fn position(log: &[String], name: &str) -> usize {
    log.iter()
        .position(|entry| entry == name)
        .unwrap_or_else(|| panic!("'{}' never ran", name))
}

#[tokio::test]
async fn test_full_build_runs_each_task_once_in_order() {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let registry = build_registry(&log);
    let runner = Runner::new(&registry, RunOptions::default());

    let report = runner.run("build").await.unwrap();
    assert!(report.succeeded());

    let log = log.lock().unwrap();
    // Seven tasks with actions, each exactly once.
    assert_eq!(log.len(), 7);
    assert!(position(&log, "sass-lint") < position(&log, "sass"));
    assert!(position(&log, "sass") < position(&log, "css-min"));
    assert!(position(&log, "ts-lint") < position(&log, "ts"));
    assert!(position(&log, "js-lint") < position(&log, "dev"));
    assert!(position(&log, "js-lint") < position(&log, "production"));
    assert_eq!(report.status_of("compress"), Some(&TaskStatus::Succeeded));
    assert_eq!(report.status_of("build"), Some(&TaskStatus::Succeeded));
}

#[tokio::test]
async fn test_lint_aggregator_runs_only_checks() {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let registry = build_registry(&log);
    let runner = Runner::new(&registry, RunOptions::default());

    let report = runner.run("lint").await.unwrap();
    assert!(report.succeeded());

    let mut ran = log.lock().unwrap().clone();
    ran.sort();
    assert_eq!(ran, vec!["js-lint", "sass-lint", "ts-lint"]);
}

#[tokio::test]
async fn test_lint_failure_blocks_the_whole_build() {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let mut registry = build_registry(&log);
    registry.register(failing("sass-lint").check()).unwrap();

    let runner = Runner::new(&registry, RunOptions::default());
    let report = runner.run("build").await.unwrap();

    assert!(!report.succeeded());
    assert_eq!(report.failure.as_ref().unwrap().task, "sass-lint");
    assert_eq!(report.status_of("sass"), Some(&TaskStatus::Skipped));
    assert_eq!(report.status_of("css-min"), Some(&TaskStatus::Skipped));
    assert_eq!(report.status_of("build"), Some(&TaskStatus::Skipped));

    let log = log.lock().unwrap();
    assert!(!log.contains(&"sass".to_string()));
    assert!(!log.contains(&"css-min".to_string()));
    // The js branch is independent of the failing lint and completes.
    assert!(log.contains(&"dev".to_string()));
    assert!(log.contains(&"production".to_string()));
}

#[tokio::test]
async fn test_continue_on_lint_error_collects_warnings_and_builds() {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let mut registry = build_registry(&log);
    registry.register(failing("sass-lint").check()).unwrap();
    registry.register(failing("ts-lint").check()).unwrap();

    let runner = Runner::new(
        &registry,
        RunOptions {
            continue_on_error: true,
        },
    );
    let report = runner.run("build").await.unwrap();

    assert!(report.succeeded());
    assert_eq!(report.warnings.len(), 2);
    let mut warned: Vec<&str> = report.warnings.iter().map(|w| w.task.as_str()).collect();
    warned.sort();
    assert_eq!(warned, vec!["sass-lint", "ts-lint"]);

    let log = log.lock().unwrap();
    assert!(log.contains(&"sass".to_string()));
    assert!(log.contains(&"ts".to_string()));
    assert!(log.contains(&"css-min".to_string()));
}

#[tokio::test]
async fn test_continue_on_lint_error_does_not_rescue_compile_failures() {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let mut registry = build_registry(&log);
    registry
        .register(failing("sass").deps(["sass-lint"]))
        .unwrap();

    let runner = Runner::new(
        &registry,
        RunOptions {
            continue_on_error: true,
        },
    );
    let report = runner.run("build").await.unwrap();

    assert!(!report.succeeded());
    assert_eq!(report.failure.as_ref().unwrap().task, "sass");
    assert_eq!(report.status_of("css-min"), Some(&TaskStatus::Skipped));
}

#[tokio::test]
async fn test_repeated_invocations_are_independent() {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let registry = build_registry(&log);
    let runner = Runner::new(&registry, RunOptions::default());

    assert!(runner.run("css-min").await.unwrap().succeeded());
    assert!(runner.run("css-min").await.unwrap().succeeded());

    let log = log.lock().unwrap();
    assert_eq!(
        log.iter().filter(|entry| *entry == "sass").count(),
        2,
        "memoization is per invocation, not global"
    );
}

#[tokio::test]
async fn test_config_errors_abort_before_any_action() {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let mut registry = build_registry(&log);
    registry
        .register(Task::new("broken").deps(["no-such-task"]))
        .unwrap();

    let runner = Runner::new(&registry, RunOptions::default());
    let result = runner.run("broken").await;

    assert!(matches!(result, Err(drover::Error::UnknownTask(name)) if name == "no-such-task"));
    assert!(log.lock().unwrap().is_empty());
}
