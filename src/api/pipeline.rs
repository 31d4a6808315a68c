//! Pipeline API handlers

use crate::api::{
    error::{ApiError, ApiResult},
    AppState,
};
use crate::core::{Pipeline, PipelineConfig, RunSummary};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Acknowledgement for pipeline mutations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResponse {
    pub id: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<Uuid>,
}

impl PipelineResponse {
    fn new(id: impl Into<String>, message: &str) -> Self {
        Self {
            id: id.into(),
            message: message.to_string(),
            run_id: None,
        }
    }
}

async fn load(state: &AppState, id: &str) -> ApiResult<Pipeline> {
    state.store.get(id).await?.ok_or_else(|| {
        ApiError::NotFound("Pipeline not found. Make sure to create the pipeline first.".to_string())
    })
}

fn validate(config: &PipelineConfig) -> ApiResult<()> {
    config
        .validate()
        .map_err(|e| ApiError::BadRequest(e.to_string()))
}

/// GET /v1/pipelines
pub async fn list_pipelines(State(state): State<AppState>) -> ApiResult<Json<Vec<Pipeline>>> {
    Ok(Json(state.store.list().await?))
}

/// POST /v1/pipelines
pub async fn create_pipeline(
    State(state): State<AppState>,
    Json(config): Json<PipelineConfig>,
) -> ApiResult<Json<PipelineResponse>> {
    validate(&config)?;
    let pipeline = state.store.create(config).await?;
    tracing::info!(pipeline = %pipeline.id, "Created pipeline '{}'", pipeline.name);

    Ok(Json(PipelineResponse::new(pipeline.id, "Pipeline created successfully.")))
}

/// GET /v1/pipelines/{id}
pub async fn get_pipeline(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Pipeline>> {
    Ok(Json(load(&state, &id).await?))
}

/// PUT /v1/pipelines/{id}
///
/// A run that is already in flight keeps executing the old definition.
pub async fn update_pipeline(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(config): Json<PipelineConfig>,
) -> ApiResult<Json<PipelineResponse>> {
    validate(&config)?;
    let updated = state.store.update(&id, config).await?;
    if updated.is_none() {
        return Err(ApiError::NotFound(
            "Pipeline not found. Make sure to create the pipeline first.".to_string(),
        ));
    }
    tracing::info!(pipeline = %id, "Updated pipeline");

    Ok(Json(PipelineResponse::new(id, "Pipeline updated successfully.")))
}

/// DELETE /v1/pipelines/{id}
///
/// Any active run is cancelled and its state dropped before the definition goes.
pub async fn delete_pipeline(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<PipelineResponse>> {
    // Held until the definition is gone, so a queued trigger finds nothing to run
    let lock = state.engine.lock_pipeline(&id).await;
    load(&state, &id).await?;

    if let Some(last) = state.engine.forget_locked(&lock).await {
        tracing::info!(pipeline = %id, "Discarded run state ({})", last.status);
    }
    state.store.delete(&id).await?;
    drop(lock);
    tracing::info!(pipeline = %id, "Deleted pipeline");

    Ok(Json(PipelineResponse::new(id, "Pipeline deleted successfully.")))
}

/// POST /v1/pipelines/{id}/trigger
pub async fn trigger_pipeline(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<(StatusCode, Json<PipelineResponse>)> {
    let lock = state.engine.lock_pipeline(&id).await;
    let pipeline = load(&state, &id).await?;
    let ticket = state.engine.trigger_locked(&lock, pipeline).await;
    drop(lock);

    let mut response = PipelineResponse::new(id, "Pipeline triggered successfully.");
    response.run_id = Some(ticket.run_id);
    Ok((StatusCode::ACCEPTED, Json(response)))
}

/// POST /v1/pipelines/{id}/cancel
pub async fn cancel_pipeline(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<RunSummary>> {
    load(&state, &id).await?;
    state.engine.cancel_if_running(&id).await;
    run_summary(&state, &id).await.map(Json)
}

/// GET /v1/pipelines/{id}/status
pub async fn get_run_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<RunSummary>> {
    run_summary(&state, &id).await.map(Json)
}

/// GET /v1/runs
pub async fn list_runs(State(state): State<AppState>) -> Json<Vec<RunSummary>> {
    Json(state.engine.runs().await)
}

async fn run_summary(state: &AppState, id: &str) -> ApiResult<RunSummary> {
    state
        .engine
        .run_status(id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("No run recorded for pipeline {}", id)))
}
