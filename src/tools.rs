//! External tool invocation.
//!
//! Manifest tasks run command lines through the system PATH. A command is
//! parsed once at registry-build time; each run preflights the binary with
//! `which` so a missing tool produces a clear error instead of a raw spawn
//! failure, then spawns it with inherited stdio.

use crate::core::task::Action;
use crate::dlog_debug;
use crate::error::{Error, Result};
use std::path::PathBuf;
use std::sync::Arc;

/// A parsed command line bound to an optional working directory.
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: String,
    args: Vec<String>,
    cwd: Option<PathBuf>,
}

impl ToolCommand {
    /// Parse a shell-style command line.
    ///
    /// Uses shell word splitting so quoted arguments (glob patterns, paths
    /// with spaces) survive intact. No shell is involved at run time.
    ///
    /// # Errors
    /// Returns a validation error for an empty or unparseable command line
    /// (e.g. an unclosed quote).
    pub fn parse(command_line: &str, cwd: Option<PathBuf>) -> Result<Self> {
        let mut words = shlex::split(command_line).ok_or_else(|| {
            Error::Validation(format!("Unparseable command line: {}", command_line))
        })?;
        if words.is_empty() {
            return Err(Error::Validation("Command line is empty".to_string()));
        }
        let program = words.remove(0);
        Ok(Self {
            program,
            args: words,
            cwd,
        })
    }

    /// The program name (first word of the command line).
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments after the program name.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Spawn the tool and wait for it to finish.
    ///
    /// Stdio is inherited so the tool's own output reaches the terminal.
    ///
    /// # Errors
    /// - `ToolNotFound` if the program is not on PATH.
    /// - `ToolExit` on a non-zero exit status.
    pub async fn run(&self) -> Result<()> {
        which::which(&self.program)
            .map_err(|_| Error::ToolNotFound(self.program.clone()))?;

        dlog_debug!("Spawning '{}' with args {:?}", self.program, self.args);
        let mut command = tokio::process::Command::new(&self.program);
        command.args(&self.args);
        if let Some(cwd) = &self.cwd {
            command.current_dir(cwd);
        }

        let status = command.status().await?;
        if status.success() {
            Ok(())
        } else {
            Err(Error::ToolExit {
                program: self.program.clone(),
                code: status.code().unwrap_or(-1),
            })
        }
    }

    /// Turn the command into a registrable task action.
    pub fn into_action(self) -> Action {
        Arc::new(move || {
            let command = self.clone();
            Box::pin(async move { command.run().await })
        })
    }
}
