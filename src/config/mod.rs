//! Configuration module for the bootstrapper.
//!
//! Handles the worker's configuration keys, the defaults the bootstrapper
//! owns, `.env` loading, and the filesystem layout of the bot installation.

use std::collections::BTreeMap;
use std::ffi::OsString;

mod dotenv;
mod layout;
mod settings;

pub use dotenv::{EnvFileError, load_env_file};
pub use layout::Layout;
pub use settings::{Configuration, Defaults, is_valid_model, merge};

/// An explicit environment block, passed between bootstrap steps and
/// handed to child processes as their complete environment.
pub type EnvMap = BTreeMap<OsString, OsString>;

/// Telegram bot token consumed by the worker.
pub const TELEGRAM_BOT_TOKEN: &str = "TELEGRAM_BOT_TOKEN";

/// `OpenAI` API key consumed by the worker.
pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";

/// `OpenAI` model identifier consumed by the worker.
pub const OPENAI_MODEL: &str = "OPENAI_MODEL";

/// Model used when the caller does not supply a valid one.
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

/// Overrides the bootstrap root directory.
pub const BOOTSTRAP_HOME: &str = "BOOTSTRAP_HOME";

/// Overrides the interpreter used to run the worker.
pub const BOOTSTRAP_INTERPRETER: &str = "BOOTSTRAP_INTERPRETER";

/// Overrides the worker entry point, relative to the root.
pub const BOOTSTRAP_ENTRY: &str = "BOOTSTRAP_ENTRY";

/// Overrides the activation artifact path, relative to the root.
pub const BOOTSTRAP_ACTIVATE: &str = "BOOTSTRAP_ACTIVATE";

/// Name of the `.env` file looked up in the root directory.
pub const ENV_FILE_NAME: &str = ".env";
