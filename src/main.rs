use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use drover::config::{Manifest, MANIFEST_FILE};
use drover::core::runner::{RunOptions, RunReport, Runner};
use drover::core::task::TaskStatus;
use drover::{dlog, Result};

/// Drover - a task-graph build runner
#[derive(Parser, Debug)]
#[command(name = "drover")]
#[command(version, about, long_about = None)]
#[command(
    after_help = "ENVIRONMENT:\n    DROVER_DEBUG=1     Enable debug logging (alternative to --debug)"
)]
pub struct Cli {
    /// Task to run (defaults to the manifest's `default` task)
    pub task: Option<String>,

    /// Treat failures of check tasks as warnings and keep going
    #[arg(long)]
    pub continue_on_lint_error: bool,

    /// After the run, watch the project and re-run tasks on file changes
    #[arg(short = 'w', long)]
    pub watch: bool,

    /// Path to the manifest (defaults to ./drover.toml)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// List the tasks defined in the manifest and exit
    #[arg(short = 'l', long)]
    pub list: bool,

    /// Enable debug logging (writes to ~/.drover/drover.log)
    #[arg(short = 'd', long)]
    pub debug: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on debug flag
    drover::log::init_with_debug(cli.debug);
    dlog!("Drover starting");

    let manifest_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(MANIFEST_FILE));
    let manifest = Manifest::load(&manifest_path)?;
    let root = manifest_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));

    if cli.list {
        print_task_list(&manifest);
        return Ok(());
    }

    let target = match cli.task.clone().or_else(|| manifest.default.clone()) {
        Some(target) => target,
        None => {
            return Err(drover::Error::Validation(
                "No task given and no default task configured".to_string(),
            ))
        }
    };

    let registry = manifest.build_registry(&root)?;
    let runner = Runner::new(
        &registry,
        RunOptions {
            continue_on_error: cli.continue_on_lint_error,
        },
    );

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let report = runner.run(&target).await?;
        print_report(&target, &report);
        report.to_result()?;

        if cli.watch {
            let watch_set = manifest.watch_set()?;
            if watch_set.is_empty() {
                return Err(drover::Error::Validation(
                    "No [[watch]] rules in the manifest".to_string(),
                ));
            }
            println!(
                "Watching {} ({} rule(s), Ctrl-C to stop)",
                root.display(),
                watch_set.len()
            );
            watch_set.run(&runner, &root).await?;
        }
        Ok(())
    })
}

/// Print the manifest's tasks with their dependencies.
fn print_task_list(manifest: &Manifest) {
    for (name, entry) in &manifest.tasks {
        let marker = if Some(name.as_str()) == manifest.default.as_deref() {
            " (default)"
        } else {
            ""
        };
        if entry.deps.is_empty() {
            println!("  {}{}", name, marker);
        } else {
            println!("  {}{}  <- {}", name, marker, entry.deps.join(", "));
        }
    }
}

/// Print the per-task outcomes, warnings, and overall result.
fn print_report(target: &str, report: &RunReport) {
    for outcome in &report.outcomes {
        match &outcome.status {
            TaskStatus::Succeeded => {
                println!(
                    "  \x1b[32m✓\x1b[0m {}{}",
                    outcome.name,
                    format_elapsed(outcome.elapsed)
                );
            }
            TaskStatus::Failed { error } => {
                println!("  \x1b[31m✗\x1b[0m {}: {}", outcome.name, error);
            }
            TaskStatus::Skipped => {
                println!("  \x1b[90m-\x1b[0m {} (skipped)", outcome.name);
            }
            status => {
                println!("  \x1b[90m?\x1b[0m {} ({})", outcome.name, status);
            }
        }
    }
    for warning in &report.warnings {
        println!(
            "  \x1b[33m!\x1b[0m {}: {} (continuing)",
            warning.task, warning.message
        );
    }
    match &report.failure {
        None => println!("\x1b[32m'{}' succeeded\x1b[0m", target),
        Some(failure) => println!(
            "\x1b[31m'{}' failed at task '{}'\x1b[0m",
            target, failure.task
        ),
    }
}

fn format_elapsed(elapsed: Option<Duration>) -> String {
    match elapsed {
        Some(elapsed) => format!(" \x1b[90m({:.2?})\x1b[0m", elapsed),
        None => String::new(),
    }
}
