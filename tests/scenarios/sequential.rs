//! Test: sequential runs - declaration order, fail-fast, skipped stages

use crate::helpers::*;
use pipeline_runner::core::{RunStatus, Stage};
use std::time::Duration;

/// Stages run one at a time in declaration order
#[tokio::test]
async fn test_sequential_runs_in_order() {
    let executor = ScriptedExecutor::new()
        .with_delay("test", Duration::from_millis(20))
        .with_delay("img", Duration::from_millis(10));
    let (engine, executor) = engine_with(executor);

    engine.trigger(pipeline("p1", release_stages(), false)).await;
    assert_eq!(engine.wait("p1").await, Some(RunStatus::Completed));

    // Each stage finishes before the next one starts
    assert_eq!(
        executor.calls(),
        vec![
            Call::Started("test".to_string()),
            Call::Finished("test".to_string()),
            Call::Started("img".to_string()),
            Call::Finished("img".to_string()),
            Call::Started("app".to_string()),
            Call::Finished("app".to_string()),
        ]
    );

    let summary = engine.run_status("p1").await.unwrap();
    assert_eq!(summary.status, RunStatus::Completed);
    assert!(summary.finished_at.unwrap() >= summary.started_at);
}

/// A failing stage stops the run; later stages are never invoked
#[tokio::test]
async fn test_sequential_failure_skips_remaining_stages() {
    let (engine, executor) = engine_with(ScriptedExecutor::new().with_failure("img"));

    engine.trigger(pipeline("p1", release_stages(), false)).await;

    assert_eq!(engine.wait("p1").await, Some(RunStatus::Failed));
    assert_eq!(executor.started(), vec!["test", "img"]);
}

/// A Run stage that outlives its own timeout fails the run
#[tokio::test]
async fn test_sequential_stage_timeout_fails_run() {
    let (engine, executor) = engine_with(
        ScriptedExecutor::new().with_delay("slow", Duration::from_secs(5)),
    );

    let mut slow = Stage::run("slow", "sleep 5");
    if let Stage::Run(run) = &mut slow {
        run.timeout_secs = 1;
    }
    let stages = vec![slow, Stage::run("after", "true")];

    engine.trigger(pipeline("p1", stages, false)).await;

    assert_eq!(engine.wait("p1").await, Some(RunStatus::Failed));
    assert_eq!(executor.started(), vec!["slow"]);
    assert!(executor.finished().is_empty());
}

/// An unrecognised stage type fails the run instead of being skipped
#[tokio::test]
async fn test_unknown_stage_fails_run() {
    let (engine, executor) = engine_with(ScriptedExecutor::new());

    let stages = vec![Stage::run("test", "true"), Stage::Unknown, Stage::run("never", "true")];
    engine.trigger(pipeline("p1", stages, false)).await;

    assert_eq!(engine.wait("p1").await, Some(RunStatus::Failed));
    assert_eq!(executor.started(), vec!["test"]);
}

/// An executor that panics fails the run; it never hangs in `Running`
#[tokio::test]
async fn test_panicking_stage_fails_run() {
    let (engine, executor) = engine_with(ScriptedExecutor::new().with_panic("img"));

    engine.trigger(pipeline("p1", release_stages(), false)).await;

    let status = tokio::time::timeout(Duration::from_secs(5), engine.wait("p1"))
        .await
        .expect("run should settle after a stage panics");
    assert_eq!(status, Some(RunStatus::Failed));
    assert_eq!(executor.started(), vec!["test", "img"]);

    // Nothing left to cancel, and cancelling doesn't relabel the failure
    engine.cancel_if_running("p1").await;
    assert_eq!(engine.run_status("p1").await.unwrap().status, RunStatus::Failed);
}
