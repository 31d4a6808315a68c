use anyhow::{Context, Result};
use pipeline_runner::api::{self, AppState, Credentials};
use pipeline_runner::cli::commands::{
    ClientAction, ClientCommand, ExecutorArg, RunCommand, ServeCommand, ValidateCommand,
};
use pipeline_runner::cli::output::*;
use pipeline_runner::cli::{Cli, Command};
use pipeline_runner::client::PipelineClient;
use pipeline_runner::core::{PipelineConfig, RunStatus};
use pipeline_runner::execution::{ExecutionEngine, ExecutionEvent, RunRegistry, StageRunner};
use pipeline_runner::persistence::InMemoryPipelineStore;
use pipeline_runner::stages::{SharedExecutor, ShellExecutor, SimulatedExecutor};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging; RUST_LOG wins over --verbose
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to set logging subscriber: {}", e))?;

    // Execute command
    match &cli.command {
        Command::Serve(cmd) => serve(cmd).await?,
        Command::Run(cmd) => run_pipeline(cmd).await?,
        Command::Validate(cmd) => validate_pipeline(cmd)?,
        Command::Client(cmd) => call_api(cmd).await?,
    }

    Ok(())
}

fn build_engine(executor: ExecutorArg, stage_timeout: Option<Duration>) -> ExecutionEngine<SharedExecutor> {
    let executor: SharedExecutor = match executor {
        ExecutorArg::Simulated => Arc::new(SimulatedExecutor::new()),
        ExecutorArg::Shell => Arc::new(ShellExecutor::default()),
    };

    let mut runner = StageRunner::new(executor);
    if let Some(timeout) = stage_timeout {
        runner = runner.with_default_timeout(timeout);
    }

    ExecutionEngine::with_runner(runner, RunRegistry::new())
}

async fn serve(cmd: &ServeCommand) -> Result<()> {
    let engine = Arc::new(build_engine(cmd.executor, cmd.stage_timeout));
    let state = AppState::new(
        Arc::new(InMemoryPipelineStore::new()),
        engine,
        Credentials::new(&cmd.username, &cmd.password),
    );

    let listener = TcpListener::bind(&cmd.bind)
        .await
        .with_context(|| format!("Failed to bind {}", cmd.bind))?;
    info!("Listening on {}", listener.local_addr()?);

    api::serve(listener, state, shutdown_signal()).await
}

/// Wait for SIGINT or SIGTERM
#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(sigterm) => sigterm,
        Err(e) => {
            error!("Failed to set up SIGTERM handler: {}", e);
            return ctrl_c().await;
        }
    };

    tokio::select! {
        _ = ctrl_c() => {}
        _ = sigterm.recv() => info!(signal = "SIGTERM", "Signal received"),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    ctrl_c().await
}

async fn ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!(signal = "SIGINT", "Signal received"),
        Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
    }
}

async fn run_pipeline(cmd: &RunCommand) -> Result<()> {
    // Load pipeline config
    let mut config = PipelineConfig::from_file(&cmd.file).context("Failed to load pipeline config")?;
    if cmd.parallel {
        config.parallel = true;
    }
    config.validate().context("Invalid pipeline config")?;

    println!("{} Loaded pipeline: {}", INFO, style(&config.name).bold());

    let pipeline = config.to_pipeline(config.name.clone());
    let pipeline_id = pipeline.id.clone();
    let engine = build_engine(cmd.executor, cmd.stage_timeout);

    let progress = create_progress_bar(pipeline.stages.len());
    let bar = progress.clone();
    engine
        .add_event_handler(move |event| {
            if matches!(
                event,
                ExecutionEvent::StageCompleted { .. }
                    | ExecutionEvent::StageFailed { .. }
                    | ExecutionEvent::StageCancelled { .. }
            ) {
                bar.inc(1);
            }
            bar.println(format_execution_event(&event));
        })
        .await;

    println!();
    engine.trigger(pipeline).await;

    let status = tokio::select! {
        status = engine.wait(&pipeline_id) => status,
        _ = ctrl_c() => {
            warn!("Interrupted, cancelling run");
            engine.cancel_if_running(&pipeline_id).await;
            engine.run_status(&pipeline_id).await.map(|summary| summary.status)
        }
    };
    progress.finish_and_clear();

    // Print final status
    match status {
        Some(RunStatus::Completed) => {
            println!(
                "\n{} {} completed {}",
                CHECK,
                style(&config.name).bold(),
                style("successfully").green()
            );
            Ok(())
        }
        other => {
            let status = other.map(format_status).unwrap_or_else(|| "unknown".to_string());
            println!("\n{} {} {}", CROSS, style(&config.name).bold(), status);
            std::process::exit(1);
        }
    }
}

fn validate_pipeline(cmd: &ValidateCommand) -> Result<()> {
    println!("{} Validating pipeline...", INFO);

    let result = PipelineConfig::from_file(&cmd.file).and_then(|config| {
        config.validate()?;
        Ok(config)
    });

    match result {
        Ok(config) => {
            println!("{} Pipeline configuration is valid!", CHECK);
            println!("  Name: {}", style(&config.name).bold());
            println!("  Stages: {}", style(config.stages.len()).cyan());
            println!(
                "  Mode: {}",
                style(if config.parallel { "parallel" } else { "sequential" }).cyan()
            );

            if cmd.json {
                let json = serde_json::to_string_pretty(&config)?;
                println!("\n{}", json);
            }
            Ok(())
        }
        Err(e) => {
            println!("{} Validation failed:", CROSS);
            println!("  {}", style(format!("{:#}", e)).red());
            std::process::exit(1);
        }
    }
}

async fn call_api(cmd: &ClientCommand) -> Result<()> {
    let client = PipelineClient::new(&cmd.base_url, Credentials::new(&cmd.username, &cmd.password));
    let load = |file: &str| PipelineConfig::from_file(file).context("Failed to load pipeline config");

    let body = match &cmd.action {
        ClientAction::Create { file } => serde_json::to_value(client.create(&load(file)?).await?)?,
        ClientAction::List => serde_json::to_value(client.list().await?)?,
        ClientAction::Get { id } => serde_json::to_value(client.get(id).await?)?,
        ClientAction::Update { id, file } => serde_json::to_value(client.update(id, &load(file)?).await?)?,
        ClientAction::Delete { id } => serde_json::to_value(client.delete(id).await?)?,
        ClientAction::Trigger { id } => serde_json::to_value(client.trigger(id).await?)?,
        ClientAction::Cancel { id } => serde_json::to_value(client.cancel(id).await?)?,
        ClientAction::Status { id } => serde_json::to_value(client.status(id).await?)?,
    };

    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}
