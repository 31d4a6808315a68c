//! Scenario-based tests for pipeline-runner

#[path = "../helpers.rs"]
mod helpers;

mod cancellation;
mod parallel;
mod sequential;
