//! Optional activation of an isolated runtime environment.
//!
//! Activation is split into a capability check ([`ActivationArtifact::detect`])
//! and the action itself ([`ActivationArtifact::activate`]). The artifact is
//! sourced by a POSIX shell with an explicit environment block, and the
//! environment the shell ends up with becomes the worker's environment.

use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::EnvMap;
use crate::status::exit_code;

/// Shell used to source the artifact.
const ACTIVATION_SHELL: &str = "sh";

/// Marker appended after a complete environment dump.
const DUMP_SENTINEL: &str = "__BOT_BOOTSTRAP_ACTIVATED";

/// Sources the artifact (`$0`) and dumps the resulting environment.
///
/// The dump runs from an `EXIT` trap, so it also happens when the artifact
/// calls `exit 0` itself. The artifact's stdout goes to stderr; the dump and
/// the trailing [`DUMP_SENTINEL`] record go to the saved stdout on fd 3.
const ACTIVATION_SCRIPT: &str = r#"exec 3>&1 1>&2
trap 'status=$?; trap - EXIT; if [ "$status" -eq 0 ]; then env -0 >&3 && printf "%s\0" "__BOT_BOOTSTRAP_ACTIVATED=1" >&3; fi; exit "$status"' EXIT
. "$0"
"#;

/// Errors that can occur while activating the environment.
#[derive(Debug, Error)]
pub enum ActivationError {
    #[error("Failed to start activation shell for {path}: {source}")]
    Spawn { path: PathBuf, source: io::Error },

    #[error("Activation artifact {path} failed with exit code {code}")]
    Failed { path: PathBuf, code: i32 },

    #[error("Activation of {path} did not produce a complete environment")]
    IncompleteEnvironment { path: PathBuf },
}

/// An activation artifact known to exist on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationArtifact {
    path: PathBuf,
}

impl ActivationArtifact {
    /// Returns the artifact at `path` if one exists.
    #[must_use]
    pub fn detect(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();
        if path.is_file() {
            debug!("Found activation artifact at {}", path.display());
            Some(Self {
                path: path.to_path_buf(),
            })
        } else {
            debug!("No activation artifact at {}", path.display());
            None
        }
    }

    /// Location of the artifact.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sources the artifact with `env` and returns the environment it produced.
    ///
    /// The returned block replaces `env` entirely, so variables the artifact
    /// unsets are gone as well.
    ///
    /// # Errors
    ///
    /// Returns an error if the shell cannot be started, the artifact exits
    /// with a non-zero status, or the resulting environment could not be
    /// captured in full.
    pub async fn activate(&self, env: &EnvMap) -> Result<EnvMap, ActivationError> {
        info!("Activating environment from {}", self.path.display());

        let output = Command::new(ACTIVATION_SHELL)
            .arg("-c")
            .arg(ACTIVATION_SCRIPT)
            .arg(&self.path)
            .env_clear()
            .envs(env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .output()
            .await
            .map_err(|source| ActivationError::Spawn {
                path: self.path.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(ActivationError::Failed {
                path: self.path.clone(),
                code: exit_code(output.status),
            });
        }

        let mut activated = parse_env_dump(&output.stdout);
        if activated.remove(OsStr::new(DUMP_SENTINEL)).is_none() {
            return Err(ActivationError::IncompleteEnvironment {
                path: self.path.clone(),
            });
        }

        debug!(
            "Activation produced {} variable(s) (was {})",
            activated.len(),
            env.len()
        );
        Ok(activated)
    }
}

/// Parses the output of `env -0` into an environment block.
///
/// Entries without `=` are skipped.
fn parse_env_dump(dump: &[u8]) -> EnvMap {
    dump.split(|&b| b == 0)
        .filter(|entry| !entry.is_empty())
        .filter_map(|entry| {
            let eq = entry.iter().position(|&b| b == b'=')?;
            let (key, value) = (&entry[..eq], &entry[eq + 1..]);
            (!key.is_empty()).then(|| (os_from_bytes(key), os_from_bytes(value)))
        })
        .collect()
}

#[cfg(unix)]
fn os_from_bytes(bytes: &[u8]) -> std::ffi::OsString {
    use std::os::unix::ffi::OsStrExt;

    std::ffi::OsStr::from_bytes(bytes).to_owned()
}

#[cfg(not(unix))]
fn os_from_bytes(bytes: &[u8]) -> std::ffi::OsString {
    String::from_utf8_lossy(bytes).into_owned().into()
}
