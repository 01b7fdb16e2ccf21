//! The bootstrap sequence.
//!
//! The sequence is strictly linear:
//! 1. Enter the root directory (restored when the run ends)
//! 2. Merge the root's `.env` files into the caller environment
//! 3. Resolve the configuration and write it into the environment block
//! 4. Activate the isolated environment if an artifact exists
//! 5. Launch the worker and wait for it
//!
//! Every failure ends the run; [`BootstrapError::exit_code`] gives the
//! status the process should exit with.

use std::process::ExitStatus;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::activation::{ActivationArtifact, ActivationError};
use crate::config::{self, Defaults, EnvMap, Layout};
use crate::launcher::{LaunchError, WorkerCommand};
use crate::status::{EXIT_BOOTSTRAP_FAILURE, EXIT_LAUNCH_FAILURE, EXIT_NOT_EXECUTABLE, exit_code};
use crate::workdir::{self, WorkdirError, WorkdirGuard};

/// Errors that end a bootstrap run before the worker status is known.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("Working directory error: {0}")]
    Workdir(#[from] WorkdirError),

    #[error("Environment activation failed: {0}")]
    Activation(#[from] ActivationError),

    #[error("Worker launch failed: {0}")]
    Launch(#[from] LaunchError),
}

impl BootstrapError {
    /// The status the bootstrapper exits with for this error.
    ///
    /// A failing activation artifact propagates its own status.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Workdir(_) => EXIT_BOOTSTRAP_FAILURE,
            Self::Activation(ActivationError::Failed { code, .. }) => *code,
            Self::Activation(
                ActivationError::Spawn { .. } | ActivationError::IncompleteEnvironment { .. },
            ) => EXIT_BOOTSTRAP_FAILURE,
            Self::Launch(LaunchError::EntryPointMissing(_) | LaunchError::InterpreterMissing(_)) => {
                EXIT_LAUNCH_FAILURE
            }
            Self::Launch(LaunchError::NotExecutable { .. }) => EXIT_NOT_EXECUTABLE,
            Self::Launch(LaunchError::Spawn { .. } | LaunchError::Wait(_)) => EXIT_BOOTSTRAP_FAILURE,
        }
    }
}

/// Result of a completed run: the worker started and terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    /// Whether an activation artifact was sourced.
    pub activated: bool,

    /// The worker's termination status.
    pub status: ExitStatus,
}

impl Outcome {
    /// The worker's exit code, unchanged.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        exit_code(self.status)
    }
}

/// Runs the bootstrap sequence for one bot installation.
#[derive(Debug, Clone)]
pub struct Bootstrapper {
    layout: Layout,
    defaults: Defaults,
}

impl Bootstrapper {
    /// Creates a bootstrapper for `layout` with the built-in defaults.
    #[must_use]
    pub fn new(layout: Layout) -> Self {
        Self {
            layout,
            defaults: Defaults::default(),
        }
    }

    /// Creates a bootstrapper from the caller's environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the root directory cannot be resolved.
    pub fn from_env(caller_env: &EnvMap) -> Result<Self, BootstrapError> {
        let root = workdir::resolve_root(caller_env)?;
        Ok(Self::new(Layout::from_env(root, caller_env)))
    }

    /// Replaces the defaults for bootstrapper-owned keys.
    #[must_use]
    pub fn with_defaults(mut self, defaults: Defaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// The layout this bootstrapper runs.
    #[must_use]
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Runs the sequence with `caller_env` as the starting environment.
    ///
    /// The process environment is never read or written here; the worker
    /// receives exactly the block built from `caller_env`.
    ///
    /// # Errors
    ///
    /// Returns an error if the root cannot be entered, activation fails,
    /// or the worker cannot be started.
    pub async fn run(&self, caller_env: EnvMap) -> Result<Outcome, BootstrapError> {
        let _workdir = WorkdirGuard::enter(self.layout.root())?;

        let mut env = caller_env;
        for env_file in self.layout.env_file_paths() {
            match config::load_env_file(&env_file, &mut env) {
                Ok(0) => {}
                Ok(n) => info!("Loaded {} variable(s) from {}", n, env_file.display()),
                Err(e) => warn!("Skipping env file: {}", e),
            }
        }

        let configuration = config::merge(&env, &self.defaults);
        info!("Resolved configuration: {:?}", configuration);
        configuration.apply_to(&mut env);

        let activated = match ActivationArtifact::detect(self.layout.activation_path()) {
            Some(artifact) => {
                let mut activated_env = artifact.activate(&env).await?;
                configuration.ensure_model(&mut activated_env);
                env = activated_env;
                true
            }
            None => {
                debug!("Activation skipped");
                false
            }
        };

        let worker = WorkerCommand::new(
            self.layout.interpreter.clone(),
            self.layout.entry_point_path(),
        );
        let status = worker.run(&env).await?;
        info!("Worker exited with {}", status);

        Ok(Outcome { activated, status })
    }
}
