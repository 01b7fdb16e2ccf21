//! Worker process launch.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;

use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::EnvMap;

/// Errors that prevent the worker from running at all.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("Worker entry point not found: {0}")]
    EntryPointMissing(PathBuf),

    #[error("Interpreter not found: {0}")]
    InterpreterMissing(String),

    #[error("Interpreter {program} is not executable: {source}")]
    NotExecutable { program: String, source: io::Error },

    #[error("Failed to start worker with {program}: {source}")]
    Spawn { program: String, source: io::Error },

    #[error("Failed to wait for worker: {0}")]
    Wait(#[source] io::Error),
}

/// How to start the worker: `interpreter entry_point`, no further arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerCommand {
    interpreter: OsString,
    entry_point: PathBuf,
}

impl WorkerCommand {
    /// Creates a worker command.
    #[must_use]
    pub fn new(interpreter: impl Into<OsString>, entry_point: impl Into<PathBuf>) -> Self {
        Self {
            interpreter: interpreter.into(),
            entry_point: entry_point.into(),
        }
    }

    /// The worker entry point.
    #[must_use]
    pub fn entry_point(&self) -> &Path {
        &self.entry_point
    }

    /// Runs the worker with `env` as its complete environment and waits for it.
    ///
    /// Standard streams are inherited. The entry point is checked before
    /// anything is spawned.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry point is missing or the interpreter
    /// cannot be started. A worker that starts and then fails is not an
    /// error; its status is returned.
    pub async fn run(&self, env: &EnvMap) -> Result<ExitStatus, LaunchError> {
        if !self.entry_point.is_file() {
            return Err(LaunchError::EntryPointMissing(self.entry_point.clone()));
        }

        let program = self.interpreter.to_string_lossy().into_owned();
        debug!("Launching {} {}", program, self.entry_point.display());

        let mut child = Command::new(&self.interpreter)
            .arg(&self.entry_point)
            .env_clear()
            .envs(env)
            .spawn()
            .map_err(|source| match source.kind() {
                io::ErrorKind::NotFound => LaunchError::InterpreterMissing(program.clone()),
                io::ErrorKind::PermissionDenied => LaunchError::NotExecutable {
                    program: program.clone(),
                    source,
                },
                _ => LaunchError::Spawn {
                    program: program.clone(),
                    source,
                },
            })?;

        info!("Worker started (pid {})", child.id().unwrap_or_default());

        child.wait().await.map_err(LaunchError::Wait)
    }
}
