//! drover - a task-graph build runner
//!
//! Tasks are named units of build work with declared dependencies. Running
//! a task runs its transitive dependency closure in dependency order, with
//! independent branches fanning out concurrently and every task executing
//! at most once per invocation.

pub mod config;
pub mod core;
pub mod error;
pub mod log;
pub mod tools;
pub mod watch;

pub use self::core::graph::{ExecutionPlan, TaskRegistry};
pub use self::core::runner::{Failure, RunOptions, RunReport, Runner, Warning};
pub use self::core::task::{Action, Task, TaskOutcome, TaskStatus};
pub use config::Manifest;
pub use error::{Error, Result};
pub use tools::ToolCommand;
pub use watch::{WatchEntry, WatchSet};
