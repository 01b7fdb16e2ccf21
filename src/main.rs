//! Bot Bootstrap - Main Entry Point
//!
//! Resolves the worker configuration, activates the bot's isolated
//! environment when present, runs the worker and exits with its status.

use std::process;

use anyhow::{Context, Result};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use bot_bootstrap::Bootstrapper;
use bot_bootstrap::config::EnvMap;
use bot_bootstrap::status::EXIT_BOOTSTRAP_FAILURE;

fn main() {
    init_logging("info");

    let code = match run() {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            EXIT_BOOTSTRAP_FAILURE
        }
    };

    process::exit(code);
}

/// Runs the bootstrap sequence and returns the code to exit with.
fn run() -> Result<i32> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build async runtime")?;

    let caller_env: EnvMap = std::env::vars_os().collect();

    let code = runtime.block_on(async move {
        let bootstrapper = match Bootstrapper::from_env(&caller_env) {
            Ok(bootstrapper) => bootstrapper,
            Err(e) => {
                error!("{}", e);
                return e.exit_code();
            }
        };

        info!("Bootstrapping bot in {}", bootstrapper.layout().root().display());

        match bootstrapper.run(caller_env).await {
            Ok(outcome) => outcome.exit_code(),
            Err(e) => {
                error!("{}", e);
                e.exit_code()
            }
        }
    });

    Ok(code)
}

/// Initializes the logging subsystem.
///
/// Logs go to stderr; the worker owns stdout.
fn init_logging(level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
