//! Cue Minder - a metadata reconciliation tool for personal audio libraries.
//!
//! Cue Minder brings album directories to a canonical form: coerced titles,
//! consistent tags, a single authoritative cuesheet, a square `cover.jpg`,
//! and `NN. Title.ext` file names. `scan` reports what would change, `coerce`
//! changes it.

pub mod album;
pub mod cli;
pub mod coerce;
pub mod collab;
pub mod complex;
pub mod config;
pub mod cuesheet;
pub mod diagnostics;
pub mod error;
pub mod model;
pub mod report;
pub mod scanner;
#[cfg(test)]
pub mod test_utils;
pub mod titling;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(EnvFilter::from_default_env().add_directive("cue_minder=info".parse().unwrap()))
        .init();

    cli::run_command(&args)
}
