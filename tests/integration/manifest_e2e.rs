//! Manifest-driven runs with real subprocesses.

use drover::config::Manifest;
use drover::{RunOptions, Runner, TaskStatus};
use std::path::Path;
use tempfile::TempDir;

fn write_manifest(dir: &TempDir, text: &str) -> std::path::PathBuf {
    let path = dir.path().join("drover.toml");
    std::fs::write(&path, text).unwrap();
    path
}

fn trace(dir: &TempDir) -> Vec<String> {
    match std::fs::read_to_string(dir.path().join("trace.log")) {
        Ok(text) => text.lines().map(str::to_string).collect(),
        Err(_) => Vec::new(),
    }
}

#[tokio::test]
async fn test_manifest_chain_runs_in_order() {
    let dir = TempDir::new().unwrap();
    let path = write_manifest(
        &dir,
        r#"
            default = "css-min"

            [tasks.sass-lint]
            command = "sh -c 'echo sass-lint >> trace.log'"
            check = true

            [tasks.sass]
            deps = ["sass-lint"]
            command = "sh -c 'echo sass >> trace.log'"

            [tasks.css-min]
            deps = ["sass"]
            command = "sh -c 'echo css-min >> trace.log'"
        "#,
    );

    let manifest = Manifest::load(&path).unwrap();
    assert_eq!(manifest.default.as_deref(), Some("css-min"));

    let registry = manifest.build_registry(dir.path()).unwrap();
    let runner = Runner::new(&registry, RunOptions::default());
    let report = runner.run("css-min").await.unwrap();

    assert!(report.succeeded());
    assert_eq!(trace(&dir), vec!["sass-lint", "sass", "css-min"]);
}

#[tokio::test]
async fn test_manifest_failing_command_blocks_dependent() {
    let dir = TempDir::new().unwrap();
    let path = write_manifest(
        &dir,
        r#"
            [tasks.ts-lint]
            command = "sh -c 'exit 1'"
            check = true

            [tasks.ts]
            deps = ["ts-lint"]
            command = "sh -c 'echo ts >> trace.log'"
        "#,
    );

    let manifest = Manifest::load(&path).unwrap();
    let registry = manifest.build_registry(dir.path()).unwrap();
    let runner = Runner::new(&registry, RunOptions::default());
    let report = runner.run("ts").await.unwrap();

    assert!(!report.succeeded());
    let failure = report.failure.as_ref().unwrap();
    assert_eq!(failure.task, "ts-lint");
    assert!(failure.cause.contains("exited with status 1"));
    assert_eq!(report.status_of("ts"), Some(&TaskStatus::Skipped));
    assert!(trace(&dir).is_empty());

    assert!(matches!(
        report.to_result(),
        Err(drover::Error::ActionFailure { .. })
    ));
}

#[tokio::test]
async fn test_manifest_check_failure_suppressed_with_flag() {
    let dir = TempDir::new().unwrap();
    let path = write_manifest(
        &dir,
        r#"
            [tasks.ts-lint]
            command = "sh -c 'exit 1'"
            check = true

            [tasks.ts]
            deps = ["ts-lint"]
            command = "sh -c 'echo ts >> trace.log'"
        "#,
    );

    let manifest = Manifest::load(&path).unwrap();
    let registry = manifest.build_registry(dir.path()).unwrap();
    let runner = Runner::new(
        &registry,
        RunOptions {
            continue_on_error: true,
        },
    );
    let report = runner.run("ts").await.unwrap();

    assert!(report.succeeded());
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(report.warnings[0].task, "ts-lint");
    assert_eq!(trace(&dir), vec!["ts"]);
}

#[tokio::test]
async fn test_manifest_aggregator_fans_out() {
    let dir = TempDir::new().unwrap();
    let path = write_manifest(
        &dir,
        r#"
            [tasks.sass]
            command = "sh -c 'touch theme.css'"

            [tasks.ts]
            command = "sh -c 'touch main.js'"

            [tasks.build]
            deps = ["sass", "ts"]
        "#,
    );

    let manifest = Manifest::load(&path).unwrap();
    let registry = manifest.build_registry(dir.path()).unwrap();
    let runner = Runner::new(&registry, RunOptions::default());
    let report = runner.run("build").await.unwrap();

    assert!(report.succeeded());
    assert!(dir.path().join("theme.css").exists());
    assert!(dir.path().join("main.js").exists());
}

#[tokio::test]
async fn test_manifest_cwd_is_honored() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir(dir.path().join("sub")).unwrap();
    let path = write_manifest(
        &dir,
        r#"
            [tasks.mark]
            command = "sh -c 'touch here'"
            cwd = "sub"
        "#,
    );

    let manifest = Manifest::load(&path).unwrap();
    let registry = manifest.build_registry(dir.path()).unwrap();
    let runner = Runner::new(&registry, RunOptions::default());
    assert!(runner.run("mark").await.unwrap().succeeded());

    assert!(dir.path().join("sub/here").exists());
    assert!(!dir.path().join("here").exists());
}

#[tokio::test]
async fn test_manifest_missing_tool_fails_the_task() {
    let dir = TempDir::new().unwrap();
    let path = write_manifest(
        &dir,
        r#"
            [tasks.ghost]
            command = "drover-no-such-tool-xyz --version"
        "#,
    );

    let manifest = Manifest::load(&path).unwrap();
    let registry = manifest.build_registry(dir.path()).unwrap();
    let runner = Runner::new(&registry, RunOptions::default());
    let report = runner.run("ghost").await.unwrap();

    assert!(!report.succeeded());
    assert!(report
        .failure
        .unwrap()
        .cause
        .contains("Tool not found in PATH"));
}

#[test]
fn test_manifest_watch_rules_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = write_manifest(
        &dir,
        r#"
            [tasks.sass]
            command = "sh -c 'true'"

            [tasks.ts]
            command = "sh -c 'true'"

            [[watch]]
            patterns = ["src/**/*.scss"]
            task = "sass"

            [[watch]]
            patterns = ["src/**/*.ts"]
            task = "ts"
        "#,
    );

    let manifest = Manifest::load(&path).unwrap();
    let watch_set = manifest.watch_set().unwrap();
    assert_eq!(watch_set.len(), 2);
    assert_eq!(
        watch_set.tasks_for(Path::new("src/theme/dark.scss")),
        vec!["sass"]
    );
    assert_eq!(watch_set.tasks_for(Path::new("src/main.ts")), vec!["ts"]);
}
