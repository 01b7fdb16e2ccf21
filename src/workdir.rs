//! Bootstrap root resolution and the scoped working-directory guard.

use std::env;
use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use crate::config::{BOOTSTRAP_HOME, EnvMap};

/// Errors that can occur while resolving or entering the root directory.
#[derive(Debug, Error)]
pub enum WorkdirError {
    #[error("Cannot locate the bootstrapper executable: {0}")]
    CurrentExe(#[source] io::Error),

    #[error("Executable path has no parent directory: {0}")]
    NoParent(PathBuf),

    #[error("Cannot resolve root directory {path}: {source}")]
    Canonicalize { path: PathBuf, source: io::Error },

    #[error("Cannot read current working directory: {0}")]
    CurrentDir(#[source] io::Error),

    #[error("Cannot change working directory to {path}: {source}")]
    Enter { path: PathBuf, source: io::Error },
}

/// Resolves the directory the bootstrapper's relative paths are anchored to.
///
/// `BOOTSTRAP_HOME` in `env` takes priority; otherwise this is the directory
/// containing the running executable. Either way the result is canonical, so
/// it does not depend on the caller's working directory.
///
/// # Errors
///
/// Returns an error if the directory cannot be determined or does not exist.
pub fn resolve_root(env: &EnvMap) -> Result<PathBuf, WorkdirError> {
    let candidate = match env.get(OsStr::new(BOOTSTRAP_HOME)).filter(|v| !v.is_empty()) {
        Some(home) => {
            debug!("Using {} override", BOOTSTRAP_HOME);
            PathBuf::from(home)
        }
        None => {
            let exe = env::current_exe().map_err(WorkdirError::CurrentExe)?;
            exe.parent()
                .map(Path::to_path_buf)
                .ok_or(WorkdirError::NoParent(exe))?
        }
    };

    candidate
        .canonicalize()
        .map_err(|source| WorkdirError::Canonicalize {
            path: candidate,
            source,
        })
}

/// Changes the working directory for as long as it is alive.
///
/// The previous working directory is restored on drop, including when the
/// owning scope exits through an error.
#[derive(Debug)]
pub struct WorkdirGuard {
    previous: PathBuf,
}

impl WorkdirGuard {
    /// Enters `dir`, remembering the current working directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the current directory cannot be read or `dir`
    /// cannot be entered. The working directory is unchanged in that case.
    pub fn enter(dir: impl AsRef<Path>) -> Result<Self, WorkdirError> {
        let dir = dir.as_ref();
        let previous = env::current_dir().map_err(WorkdirError::CurrentDir)?;

        env::set_current_dir(dir).map_err(|source| WorkdirError::Enter {
            path: dir.to_path_buf(),
            source,
        })?;

        debug!("Entered {} (was {})", dir.display(), previous.display());
        Ok(Self { previous })
    }

    /// The directory that will be restored.
    #[must_use]
    pub fn previous(&self) -> &Path {
        &self.previous
    }
}

impl Drop for WorkdirGuard {
    fn drop(&mut self) {
        match env::set_current_dir(&self.previous) {
            Ok(()) => debug!("Restored working directory {}", self.previous.display()),
            Err(e) => warn!(
                "Failed to restore working directory {}: {}",
                self.previous.display(),
                e
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::ffi::OsString;

    use super::*;
    use crate::test_support::cwd_lock;

    #[test]
    fn test_guard_restores_cwd() {
        let _lock = cwd_lock();
        let before = env::current_dir().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().canonicalize().unwrap();

        {
            let guard = WorkdirGuard::enter(&target).unwrap();
            assert_eq!(env::current_dir().unwrap(), target);
            assert_eq!(guard.previous(), before);
        }

        assert_eq!(env::current_dir().unwrap(), before);
    }

    #[test]
    fn test_guard_restores_on_error_path() {
        fn failing_step(dir: &Path) -> Result<(), WorkdirError> {
            let _guard = WorkdirGuard::enter(dir)?;
            Err(WorkdirError::NoParent(dir.to_path_buf()))
        }

        let _lock = cwd_lock();
        let before = env::current_dir().unwrap();
        let dir = tempfile::tempdir().unwrap();

        assert!(failing_step(dir.path()).is_err());
        assert_eq!(env::current_dir().unwrap(), before);
    }

    #[test]
    fn test_enter_missing_dir_leaves_cwd() {
        let _lock = cwd_lock();
        let before = env::current_dir().unwrap();
        let dir = tempfile::tempdir().unwrap();

        let result = WorkdirGuard::enter(dir.path().join("missing"));
        assert!(matches!(result, Err(WorkdirError::Enter { .. })));
        assert_eq!(env::current_dir().unwrap(), before);
    }

    #[test]
    fn test_resolve_root_override() {
        let dir = tempfile::tempdir().unwrap();
        let mut env = EnvMap::new();
        env.insert(OsString::from(BOOTSTRAP_HOME), dir.path().as_os_str().to_owned());

        let root = resolve_root(&env).unwrap();
        assert_eq!(root, dir.path().canonicalize().unwrap());
    }

    #[test]
    fn test_resolve_root_defaults_to_exe_dir() {
        let root = resolve_root(&EnvMap::new()).unwrap();
        let exe = env::current_exe().unwrap().canonicalize().unwrap();
        assert_eq!(Some(root.as_path()), exe.parent());
    }

    #[test]
    fn test_resolve_root_missing_override() {
        let dir = tempfile::tempdir().unwrap();
        let mut env = EnvMap::new();
        env.insert(
            OsString::from(BOOTSTRAP_HOME),
            dir.path().join("nope").into_os_string(),
        );

        assert!(matches!(
            resolve_root(&env),
            Err(WorkdirError::Canonicalize { .. })
        ));
    }
}
