//! HTTP API layer
//!
//! Every route under `/v1` requires basic auth; `/` is open and serves as a
//! health check.

pub mod auth;
pub mod error;
pub mod health;
pub mod pipeline;

use crate::execution::ExecutionEngine;
use crate::persistence::PipelineStore;
use crate::stages::SharedExecutor;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use auth::Credentials;

/// Shared handles for request handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn PipelineStore>,
    pub engine: Arc<ExecutionEngine<SharedExecutor>>,
    pub credentials: Arc<Credentials>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn PipelineStore>,
        engine: Arc<ExecutionEngine<SharedExecutor>>,
        credentials: Credentials,
    ) -> Self {
        Self {
            store,
            engine,
            credentials: Arc::new(credentials),
        }
    }
}

/// Create the API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    let v1 = Router::new()
        .route(
            "/pipelines",
            get(pipeline::list_pipelines).post(pipeline::create_pipeline),
        )
        .route(
            "/pipelines/{id}",
            get(pipeline::get_pipeline)
                .put(pipeline::update_pipeline)
                .delete(pipeline::delete_pipeline),
        )
        .route("/pipelines/{id}/trigger", post(pipeline::trigger_pipeline))
        .route("/pipelines/{id}/cancel", post(pipeline::cancel_pipeline))
        .route("/pipelines/{id}/status", get(pipeline::get_run_status))
        .route("/runs", get(pipeline::list_runs))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_basic_auth,
        ));

    Router::new()
        .route("/", get(health::welcome).head(health::welcome))
        .nest("/v1", v1)
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Serve the API until `shutdown` resolves, then cancel every active run
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let engine = state.engine.clone();
    let app = create_router(state);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    tracing::info!("Server stopped, cancelling active runs");
    engine.shutdown().await;
    Ok(())
}
