//! `.env` file loading into an explicit environment block.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use super::EnvMap;

/// Errors that can occur while reading a `.env` file.
#[derive(Debug, Error)]
pub enum EnvFileError {
    #[error("Failed to read env file {path}: {source}")]
    Read {
        path: PathBuf,
        source: dotenvy::Error,
    },

    #[error("Failed to parse env file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: dotenvy::Error,
    },
}

/// Merges the variables of a `.env` file into `env`.
///
/// Variables already present in `env` are never overridden. A missing file
/// is not an error and yields `Ok(0)`.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_env_file(path: impl AsRef<Path>, env: &mut EnvMap) -> Result<usize, EnvFileError> {
    let path = path.as_ref();

    let iter = match dotenvy::from_path_iter(path) {
        Ok(iter) => iter,
        Err(e) if e.not_found() => {
            debug!("No env file at {}", path.display());
            return Ok(0);
        }
        Err(source) => {
            return Err(EnvFileError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let mut added = 0;
    for item in iter {
        let (key, value) = item.map_err(|source| EnvFileError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        if env.contains_key(OsStr::new(&key)) {
            debug!("{} already set by caller, ignoring env file value", key);
            continue;
        }

        env.insert(key.into(), value.into());
        added += 1;
    }

    debug!("Loaded {} variable(s) from {}", added, path.display());
    Ok(added)
}
