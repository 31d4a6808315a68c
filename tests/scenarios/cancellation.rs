//! Test: cancellation, re-triggering and deletion of runs

use crate::helpers::*;
use pipeline_runner::core::{RunStatus, Stage};
use pipeline_runner::core::PipelineConfig;
use pipeline_runner::execution::ExecutionEvent;
use pipeline_runner::persistence::{InMemoryPipelineStore, PipelineStore};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn slow_stages() -> Vec<Stage> {
    vec![Stage::run("slow", "sleep 30"), Stage::run("after", "true")]
}

fn slow_executor() -> ScriptedExecutor {
    ScriptedExecutor::new().with_delay("slow", Duration::from_secs(30))
}

/// Deleting a pipeline mid-run cancels it and drops its state
#[tokio::test]
async fn test_forget_cancels_running_pipeline() {
    let (engine, executor) = engine_with(slow_executor());

    engine.trigger(pipeline("p1", slow_stages(), false)).await;
    let last = tokio::time::timeout(Duration::from_secs(5), engine.forget("p1"))
        .await
        .expect("forget should not wait for the stage to finish")
        .expect("there was a run to forget");

    assert_eq!(last.status, RunStatus::Canceled);
    assert!(engine.run_status("p1").await.is_none());
    assert!(!executor.started().contains(&"after".to_string()));
}

/// Triggering again replaces the running run; only one is ever active
#[tokio::test]
async fn test_retrigger_cancels_previous_run() {
    let (engine, _executor) = engine_with(slow_executor());

    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    engine
        .add_event_handler(move |event| sink.lock().unwrap().push(event))
        .await;

    let first = engine.trigger(pipeline("p1", slow_stages(), false)).await;
    let second = engine
        .trigger(pipeline("p1", vec![Stage::run("quick", "true")], false))
        .await;
    assert_ne!(first.run_id, second.run_id);

    assert_eq!(engine.wait("p1").await, Some(RunStatus::Completed));
    let summary = engine.run_status("p1").await.unwrap();
    assert_eq!(summary.run_id, second.run_id);

    let finished: Vec<_> = events
        .lock()
        .unwrap()
        .iter()
        .filter_map(|e| match e {
            ExecutionEvent::RunFinished { run_id, status, .. } => Some((*run_id, *status)),
            _ => None,
        })
        .collect();
    assert_eq!(
        finished,
        vec![(first.run_id, RunStatus::Canceled), (second.run_id, RunStatus::Completed)]
    );
}

/// Re-triggering a pipeline whose last run already finished starts a fresh run
#[tokio::test]
async fn test_retrigger_after_completion() {
    let (engine, executor) = engine_with(ScriptedExecutor::new());

    let first = engine.trigger(pipeline("p1", release_stages(), false)).await;
    assert_eq!(engine.wait("p1").await, Some(RunStatus::Completed));

    let second = engine.trigger(pipeline("p1", release_stages(), false)).await;
    assert_ne!(first.run_id, second.run_id);
    assert_eq!(engine.wait("p1").await, Some(RunStatus::Completed));
    assert_eq!(executor.started().len(), 6);
}

/// Cancelling a pipeline with nothing running changes nothing
#[tokio::test]
async fn test_cancel_idle_pipeline_is_noop() {
    let (engine, _executor) = engine_with(ScriptedExecutor::new());

    engine.cancel_if_running("never-triggered").await;
    assert!(engine.run_status("never-triggered").await.is_none());

    engine.trigger(pipeline("p1", release_stages(), false)).await;
    assert_eq!(engine.wait("p1").await, Some(RunStatus::Completed));

    engine.cancel_if_running("p1").await;
    assert_eq!(engine.run_status("p1").await.unwrap().status, RunStatus::Completed);
}

/// Cancelling twice is the same as cancelling once
#[tokio::test]
async fn test_cancel_is_idempotent() {
    let (engine, _executor) = engine_with(slow_executor());

    engine.trigger(pipeline("p1", slow_stages(), false)).await;
    engine.cancel_if_running("p1").await;
    engine.cancel_if_running("p1").await;

    let summary = engine.run_status("p1").await.unwrap();
    assert_eq!(summary.status, RunStatus::Canceled);
    assert!(summary.finished_at.is_some());
}

/// Concurrent triggers of the same pipeline leave exactly one run active
#[tokio::test]
async fn test_concurrent_triggers_leave_one_run() {
    let (engine, _executor) = engine_with(slow_executor());
    let engine = Arc::new(engine);

    let mut handles = Vec::new();
    for _ in 0..5 {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            engine.trigger(pipeline("p1", slow_stages(), false)).await
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(engine.registry().running().await, vec!["p1".to_string()]);
    engine.shutdown().await;
    assert!(engine.registry().running().await.is_empty());
}

/// Runs of different pipelines are independent
#[tokio::test]
async fn test_cancel_leaves_other_pipelines_alone() {
    let (engine, _executor) = engine_with(slow_executor());

    engine.trigger(pipeline("p1", slow_stages(), false)).await;
    engine.trigger(pipeline("p2", release_stages(), false)).await;

    engine.cancel_if_running("p1").await;
    assert_eq!(engine.wait("p2").await, Some(RunStatus::Completed));
    assert_eq!(engine.run_status("p1").await.unwrap().status, RunStatus::Canceled);
}

/// A trigger queued behind a delete sees the definition gone and starts nothing
#[tokio::test]
async fn test_trigger_queued_behind_delete_starts_nothing() {
    let (engine, executor) = engine_with(slow_executor());
    let engine = Arc::new(engine);
    let store = Arc::new(InMemoryPipelineStore::new());

    let config = PipelineConfig {
        name: "release".to_string(),
        repository: String::new(),
        stages: slow_stages(),
        parallel: false,
    };
    let id = store.create(config).await.unwrap().id;
    let first = store.get(&id).await.unwrap().unwrap();
    engine.trigger(first).await;

    // Delete path takes the lock first
    let delete_lock = engine.lock_pipeline(&id).await;

    let trigger = {
        let engine = engine.clone();
        let store = store.clone();
        let id = id.clone();
        tokio::spawn(async move {
            let lock = engine.lock_pipeline(&id).await;
            match store.get(&id).await.unwrap() {
                Some(pipeline) => Some(engine.trigger_locked(&lock, pipeline).await),
                None => None,
            }
        })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!trigger.is_finished());

    let last = engine.forget_locked(&delete_lock).await.unwrap();
    assert_eq!(last.status, RunStatus::Canceled);
    assert!(store.delete(&id).await.unwrap());
    drop(delete_lock);

    assert!(trigger.await.unwrap().is_none());
    assert!(engine.run_status(&id).await.is_none());
    assert!(engine.registry().running().await.is_empty());
    assert_eq!(executor.started(), vec!["slow"]);
}
