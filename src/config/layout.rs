//! Filesystem layout of a bot installation.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use super::{BOOTSTRAP_ACTIVATE, BOOTSTRAP_ENTRY, BOOTSTRAP_INTERPRETER, EnvMap};

/// Default activation artifact, relative to the root.
pub const DEFAULT_ACTIVATION: &str = ".venv/bin/activate";

/// Default worker entry point, relative to the root.
pub const DEFAULT_ENTRY_POINT: &str = "main.py";

/// Default interpreter for the worker entry point.
pub const DEFAULT_INTERPRETER: &str = "python3";

/// Where the bootstrapper finds its collaborators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    /// Anchor directory; all relative paths resolve against it.
    pub root: PathBuf,

    /// Optional activation artifact, relative to `root`.
    pub activation: PathBuf,

    /// Worker entry point, relative to `root`.
    pub entry_point: PathBuf,

    /// Program used to run the entry point.
    pub interpreter: OsString,
}

impl Layout {
    /// Creates a layout with the default paths under `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            activation: PathBuf::from(DEFAULT_ACTIVATION),
            entry_point: PathBuf::from(DEFAULT_ENTRY_POINT),
            interpreter: OsString::from(DEFAULT_INTERPRETER),
        }
    }

    /// Creates a layout under `root`, applying `BOOTSTRAP_*` overrides from `env`.
    #[must_use]
    pub fn from_env(root: impl Into<PathBuf>, env: &EnvMap) -> Self {
        let mut layout = Self::new(root);

        if let Some(interpreter) = non_empty(env, BOOTSTRAP_INTERPRETER) {
            layout.interpreter = interpreter.to_owned();
        }
        if let Some(entry) = non_empty(env, BOOTSTRAP_ENTRY) {
            layout.entry_point = PathBuf::from(entry);
        }
        if let Some(activation) = non_empty(env, BOOTSTRAP_ACTIVATE) {
            layout.activation = PathBuf::from(activation);
        }

        layout
    }

    /// Sets the interpreter.
    #[must_use]
    pub fn with_interpreter(mut self, interpreter: impl Into<OsString>) -> Self {
        self.interpreter = interpreter.into();
        self
    }

    /// Sets the entry point.
    #[must_use]
    pub fn with_entry_point(mut self, entry_point: impl Into<PathBuf>) -> Self {
        self.entry_point = entry_point.into();
        self
    }

    /// Sets the activation artifact path.
    #[must_use]
    pub fn with_activation(mut self, activation: impl Into<PathBuf>) -> Self {
        self.activation = activation.into();
        self
    }

    /// Absolute location of the activation artifact.
    #[must_use]
    pub fn activation_path(&self) -> PathBuf {
        self.root.join(&self.activation)
    }

    /// Absolute location of the worker entry point.
    #[must_use]
    pub fn entry_point_path(&self) -> PathBuf {
        self.root.join(&self.entry_point)
    }

    /// `.env` files to read, highest precedence first.
    ///
    /// The root's own file comes first, then the one in the root's parent.
    #[must_use]
    pub fn env_file_paths(&self) -> Vec<PathBuf> {
        let mut paths = vec![self.root.join(super::ENV_FILE_NAME)];
        if let Some(parent) = self.root.parent() {
            paths.push(parent.join(super::ENV_FILE_NAME));
        }
        paths
    }

    /// Root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn non_empty<'a>(env: &'a EnvMap, key: &str) -> Option<&'a OsStr> {
    env.get(OsStr::new(key))
        .map(OsString::as_os_str)
        .filter(|value| !value.is_empty())
}
