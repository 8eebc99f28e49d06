//! # xo-cli
//!
//! Command-line front end for [`xo_client`].
//!
//! Provides commands for:
//! - Showing the signed-in user
//! - Looking up objects by id, name, pool or tags
//! - Listing hosts in a chosen order
//! - Starting and stopping VMs, optionally waiting for the power state
//! - Listing resource sets
//!
//! Connection settings come from flags or the `XOA_*` environment
//! variables and are validated through [`xo_client::RawConfig`] before any
//! connection is attempted.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod commands;
pub mod error;
pub mod output;

pub use cli::{Cli, Commands, Format};
pub use error::CliError;
pub use output::OutputFormat;
