//! Command-line interface for cue-minder.
//!
//! This module provides the CLI commands for scanning a collection and for
//! applying the planned corrections.

mod commands;

pub use commands::{Cli, Commands, run_command};
