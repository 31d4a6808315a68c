//! Test: parallel runs - every stage starts, one failure fails the run

use crate::helpers::*;
use pipeline_runner::core::{RunStatus, Stage};
use pipeline_runner::execution::ExecutionEvent;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Every stage is invoked exactly once and they overlap in time
#[tokio::test]
async fn test_parallel_invokes_each_stage_once() {
    let delay = Duration::from_millis(200);
    let executor = ScriptedExecutor::new()
        .with_delay("test", delay)
        .with_delay("img", delay)
        .with_delay("app", delay);
    let (engine, executor) = engine_with(executor);

    let started = Instant::now();
    engine.trigger(pipeline("p1", release_stages(), true)).await;
    assert_eq!(engine.wait("p1").await, Some(RunStatus::Completed));

    // Sequential would take at least 3 x delay
    assert!(started.elapsed() < delay * 3);

    let mut names = executor.started();
    names.sort();
    assert_eq!(names, vec!["app", "img", "test"]);
    assert_eq!(executor.finished().len(), 3);
}

/// One failing stage fails the whole run and cancels its siblings
#[tokio::test]
async fn test_parallel_failure_fails_run() {
    let executor = ScriptedExecutor::new()
        .with_failure("b")
        .with_delay("slow", Duration::from_secs(30));
    let (engine, executor) = engine_with(executor);

    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    engine
        .add_event_handler(move |event| sink.lock().unwrap().push(event))
        .await;

    let stages = vec![
        Stage::run("a", "true"),
        Stage::run("b", "false"),
        Stage::run("slow", "sleep 30"),
    ];
    engine.trigger(pipeline("p1", stages, true)).await;

    let status = tokio::time::timeout(Duration::from_secs(5), engine.wait("p1"))
        .await
        .expect("fail-fast should not wait for the slow stage");
    assert_eq!(status, Some(RunStatus::Failed));

    // Siblings may be cancelled before they are ever polled
    assert!(executor.started().contains(&"b".to_string()));
    assert!(!executor.finished().contains(&"slow".to_string()));

    let events = events.lock().unwrap();
    assert!(events.iter().any(|e| matches!(
        e,
        ExecutionEvent::StageFailed { stage, .. } if stage == "b"
    )));
    assert!(events.iter().any(|e| matches!(
        e,
        ExecutionEvent::RunFinished { status: RunStatus::Failed, .. }
    )));
}

/// Two stages, A succeeds and B fails: the run fails
#[tokio::test]
async fn test_parallel_one_success_one_failure() {
    let (engine, executor) = engine_with(ScriptedExecutor::new().with_failure("b"));

    let stages = vec![Stage::run("a", "true"), Stage::run("b", "false")];
    engine.trigger(pipeline("p1", stages, true)).await;

    assert_eq!(engine.wait("p1").await, Some(RunStatus::Failed));
    assert!(executor.started().contains(&"b".to_string()));
    assert!(!engine.registry().running().await.contains(&"p1".to_string()));
}

/// A panicking stage fails a parallel run like any other failure
#[tokio::test]
async fn test_parallel_panicking_stage_fails_run() {
    let executor = ScriptedExecutor::new()
        .with_panic("b")
        .with_delay("slow", Duration::from_secs(30));
    let (engine, executor) = engine_with(executor);

    let stages = vec![Stage::run("b", "false"), Stage::run("slow", "sleep 30")];
    engine.trigger(pipeline("p1", stages, true)).await;

    let status = tokio::time::timeout(Duration::from_secs(5), engine.wait("p1"))
        .await
        .expect("fail-fast should not wait for the slow stage");
    assert_eq!(status, Some(RunStatus::Failed));
    assert!(!executor.finished().contains(&"slow".to_string()));
}
