//! HTTP client for the pipeline API
//!
//! Every `/v1` call carries basic-auth credentials. Non-success responses
//! become errors holding the status and the server's `detail` text.

use crate::api::pipeline::PipelineResponse;
use crate::api::Credentials;
use crate::core::{Pipeline, PipelineConfig, RunSummary};
use anyhow::{bail, Context, Result};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;

/// Client for a running `serve` instance
#[derive(Debug, Clone)]
pub struct PipelineClient {
    /// Base URL of the server (e.g., "http://localhost:5001")
    base_url: String,
    credentials: Credentials,
    client: Client,
}

impl PipelineClient {
    pub fn new(base_url: impl Into<String>, credentials: Credentials) -> Self {
        Self::with_client(base_url, credentials, Client::new())
    }

    /// Create a client around a configured reqwest `Client`
    pub fn with_client(base_url: impl Into<String>, credentials: Credentials, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
            client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/pipelines{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header(AUTHORIZATION, self.credentials.to_basic_header())
            .header(ACCEPT, "application/json")
    }

    /// POST /v1/pipelines
    pub async fn create(&self, config: &PipelineConfig) -> Result<PipelineResponse> {
        let request = self.client.post(self.url("")).json(config);
        self.send(request).await
    }

    /// GET /v1/pipelines
    pub async fn list(&self) -> Result<Vec<Pipeline>> {
        self.send(self.client.get(self.url(""))).await
    }

    /// GET /v1/pipelines/{id}
    pub async fn get(&self, id: &str) -> Result<Pipeline> {
        self.send(self.client.get(self.url(&format!("/{}", id)))).await
    }

    /// PUT /v1/pipelines/{id}
    pub async fn update(&self, id: &str, config: &PipelineConfig) -> Result<PipelineResponse> {
        let request = self.client.put(self.url(&format!("/{}", id))).json(config);
        self.send(request).await
    }

    /// DELETE /v1/pipelines/{id}
    pub async fn delete(&self, id: &str) -> Result<PipelineResponse> {
        self.send(self.client.delete(self.url(&format!("/{}", id)))).await
    }

    /// POST /v1/pipelines/{id}/trigger
    pub async fn trigger(&self, id: &str) -> Result<PipelineResponse> {
        self.send(self.client.post(self.url(&format!("/{}/trigger", id)))).await
    }

    /// POST /v1/pipelines/{id}/cancel
    pub async fn cancel(&self, id: &str) -> Result<RunSummary> {
        self.send(self.client.post(self.url(&format!("/{}/cancel", id)))).await
    }

    /// GET /v1/pipelines/{id}/status
    pub async fn status(&self, id: &str) -> Result<RunSummary> {
        self.send(self.client.get(self.url(&format!("/{}/status", id)))).await
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = self
            .authorized(request)
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", self.base_url))?;
        handle_response(response).await
    }
}

/// Check the status code, then deserialize the JSON body
async fn handle_response<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();

    if !status.is_success() {
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        let detail = serde_json::from_str::<serde_json::Value>(&text)
            .ok()
            .and_then(|body| body["detail"].as_str().map(str::to_string))
            .unwrap_or(text);
        bail!("API error ({}): {}", status.as_u16(), detail);
    }

    response
        .json()
        .await
        .context("Failed to parse JSON response")
}
