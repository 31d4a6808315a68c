//! CLI command definitions

use clap::{Args, Subcommand};
use std::time::Duration;

/// Serve the pipeline HTTP API
#[derive(Debug, Args, Clone)]
pub struct ServeCommand {
    /// Address to listen on
    #[arg(long, env = "PIPELINE_BIND", default_value = "0.0.0.0:5001")]
    pub bind: String,

    /// Username for basic auth
    #[arg(long, env = "PIPELINE_USERNAME", default_value = "admin")]
    pub username: String,

    /// Password for basic auth
    #[arg(long, env = "PIPELINE_PASSWORD", default_value = "admin", hide_env_values = true)]
    pub password: String,

    /// How stages are executed
    #[arg(long, value_enum, default_value_t = ExecutorArg::Simulated)]
    pub executor: ExecutorArg,

    /// Timeout in seconds for Build and Deploy stages
    #[arg(long, value_parser = parse_seconds)]
    pub stage_timeout: Option<Duration>,
}

/// Run a pipeline definition locally
#[derive(Debug, Args, Clone)]
pub struct RunCommand {
    /// Path to pipeline YAML or JSON file
    #[arg(short, long)]
    pub file: String,

    /// Run all stages in parallel, overriding the file
    #[arg(long)]
    pub parallel: bool,

    /// How stages are executed
    #[arg(long, value_enum, default_value_t = ExecutorArg::Shell)]
    pub executor: ExecutorArg,

    /// Timeout in seconds for Build and Deploy stages
    #[arg(long, value_parser = parse_seconds)]
    pub stage_timeout: Option<Duration>,
}

/// Validate a pipeline definition
#[derive(Debug, Args, Clone)]
pub struct ValidateCommand {
    /// Path to pipeline YAML or JSON file
    #[arg(short, long)]
    pub file: String,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Talk to a running server
#[derive(Debug, Args, Clone)]
pub struct ClientCommand {
    /// Base URL of the server
    #[arg(long, env = "PIPELINE_URL", default_value = "http://localhost:5001")]
    pub base_url: String,

    /// Username for basic auth
    #[arg(long, env = "PIPELINE_USERNAME", default_value = "admin")]
    pub username: String,

    /// Password for basic auth
    #[arg(long, env = "PIPELINE_PASSWORD", default_value = "admin", hide_env_values = true)]
    pub password: String,

    #[command(subcommand)]
    pub action: ClientAction,
}

/// Requests the client can make
#[derive(Debug, Subcommand, Clone)]
pub enum ClientAction {
    /// Create a pipeline from a YAML or JSON file
    Create {
        #[arg(short, long)]
        file: String,
    },

    /// List pipeline definitions
    List,

    /// Show a pipeline definition
    Get {
        #[arg(long)]
        id: String,
    },

    /// Replace a pipeline definition
    Update {
        #[arg(long)]
        id: String,
        #[arg(short, long)]
        file: String,
    },

    /// Delete a pipeline, cancelling its run
    Delete {
        #[arg(long)]
        id: String,
    },

    /// Start a run
    Trigger {
        #[arg(long)]
        id: String,
    },

    /// Cancel the current run
    Cancel {
        #[arg(long)]
        id: String,
    },

    /// Show the latest run
    Status {
        #[arg(long)]
        id: String,
    },
}

/// Stage executor argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ExecutorArg {
    /// Log and sleep instead of doing the work
    Simulated,
    /// Run commands with `sh -c`; simulate Build and Deploy
    Shell,
}

/// Parse a whole number of seconds
pub fn parse_seconds(s: &str) -> Result<Duration, String> {
    let secs: u64 = s
        .parse()
        .map_err(|_| format!("Invalid number of seconds: {}", s))?;
    if secs == 0 {
        return Err("Timeout must be greater than zero".to_string());
    }
    Ok(Duration::from_secs(secs))
}
