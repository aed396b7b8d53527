#![forbid(unsafe_code)]

//! Command-line driver for the `formstore` field store.
//!
//! Seeds a store from the built-in form (or a JSON seed file), replays
//! `--select` actions against it, and prints the resulting fields in display
//! order as JSON.

pub mod cli;
pub mod error;
pub mod logging;
pub mod seeds;

pub use cli::{Cli, Commands, RunArgs, run, run_from_env};
pub use error::{DemoError, Result};
