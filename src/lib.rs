//! Bot Bootstrap Library
//!
//! Launches a chat-bot worker process with a resolved configuration.
//!
//! This crate provides the core functionality for:
//! - Resolving the worker's configuration from the caller's environment and `.env`
//! - Anchoring all paths to the bootstrapper's own location
//! - Activating an isolated runtime environment when one is installed
//! - Running the worker and relaying its exit status

pub mod activation;
pub mod bootstrap;
pub mod config;
pub mod launcher;
pub mod status;
pub mod workdir;

#[cfg(test)]
mod test_support;

pub use bootstrap::{BootstrapError, Bootstrapper, Outcome};
