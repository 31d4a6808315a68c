//! CLI output formatting

use crate::{
    core::{RunStatus, RunSummary},
    execution::ExecutionEvent,
};
use console::Emoji;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static SPINNER: Emoji<'_, '_> = Emoji("⏳ ", "~ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "!");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");

/// Create a progress bar over a pipeline's stages
pub fn create_progress_bar(total: usize) -> ProgressBar {
    let progress = ProgressBar::new(total as u64);
    if let Ok(template) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
    {
        progress.set_style(template.progress_chars("#>-"));
    }
    progress.enable_steady_tick(Duration::from_millis(100));
    progress
}

/// Format a run status for display
pub fn format_status(status: RunStatus) -> String {
    match status {
        RunStatus::Running => style("RUNNING").yellow().to_string(),
        RunStatus::Completed => style("COMPLETED").green().to_string(),
        RunStatus::Failed => style("FAILED").red().to_string(),
        RunStatus::Canceled => style("CANCELED").yellow().to_string(),
    }
}

/// Format a run summary for display
pub fn format_run_summary(summary: &RunSummary) -> String {
    let status_icon = match summary.status {
        RunStatus::Completed => CHECK,
        RunStatus::Failed => CROSS,
        RunStatus::Running => SPINNER,
        RunStatus::Canceled => WARN,
    };

    let duration = summary
        .finished_at
        .and_then(|end| end.signed_duration_since(summary.started_at).to_std().ok())
        .map(|d| format!(" in {}", format_duration(d)))
        .unwrap_or_default();

    format!(
        "{} {} - {} - {}{}",
        status_icon,
        style(&summary.run_id.to_string()[..8]).dim(),
        style(&summary.pipeline_id).bold(),
        format_status(summary.status),
        duration
    )
}

/// Format an execution event for display
pub fn format_execution_event(event: &ExecutionEvent) -> String {
    match event {
        ExecutionEvent::RunStarted {
            pipeline_id,
            run_id,
            strategy,
            stages,
        } => format!(
            "{} Starting pipeline {} ({}) - {} stages, {}",
            ROCKET,
            style(pipeline_id).bold(),
            style(&run_id.to_string()[..8]).dim(),
            stages,
            strategy
        ),
        ExecutionEvent::StageStarted { stage, kind, .. } => {
            format!("{} {} [{}]", SPINNER, style(stage).cyan(), style(kind).dim())
        }
        ExecutionEvent::StageCompleted { stage, .. } => {
            format!("{} {}", CHECK, style(stage).green())
        }
        ExecutionEvent::StageFailed { stage, error, .. } => {
            format!("{} {}: {}", CROSS, style(stage).red(), style(error).dim())
        }
        ExecutionEvent::StageCancelled { stage, .. } => {
            format!("{} {} cancelled", WARN, style(stage).yellow())
        }
        ExecutionEvent::RunFinished {
            run_id, status, ..
        } => format!(
            "{} Run ({}) {}",
            INFO,
            style(&run_id.to_string()[..8]).dim(),
            format_status(*status)
        ),
    }
}

pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{}.{:01}s", secs, duration.subsec_millis() / 100)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
