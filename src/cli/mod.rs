//! Command-line interface

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use commands::{ClientCommand, RunCommand, ServeCommand, ValidateCommand};
use std::ffi::OsString;

/// Pipeline scheduler and runner
#[derive(Debug, Parser, Clone)]
#[command(name = "pipeline-runner")]
#[command(version)]
#[command(about = "Schedules and supervises multi-stage pipelines", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Serve the pipeline HTTP API
    Serve(ServeCommand),

    /// Run a pipeline file locally and wait for it
    Run(RunCommand),

    /// Validate a pipeline file
    Validate(ValidateCommand),

    /// Call the HTTP API of a running server
    Client(ClientCommand),
}

impl Cli {
    /// Parse CLI arguments from environment
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Parse CLI arguments from a slice
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(itr)
    }
}
