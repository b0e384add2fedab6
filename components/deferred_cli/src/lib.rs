//! Demo runner library for the deferred crate
//!
//! Provides the argument parser, the scenario runner and its report type
//! behind the `deferred-demo` binary.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cli;
pub mod error;
pub mod logging;
pub mod runtime;

pub use cli::{Cli, Scenario};
pub use error::{CliError, CliResult};
pub use runtime::{Report, Runner};
