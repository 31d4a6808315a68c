//! HTTP basic authentication

use crate::api::{error::ApiError, AppState};
use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use sha2::{Digest, Sha256};

/// Username and password accepted by the API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Parse an `Authorization: Basic ...` header value
    pub fn from_basic_header(value: &str) -> Option<Self> {
        let encoded = value.strip_prefix("Basic ")?.trim();
        let decoded = STANDARD.decode(encoded).ok()?;
        let decoded = String::from_utf8(decoded).ok()?;
        let (username, password) = decoded.split_once(':')?;
        Some(Self::new(username, password))
    }

    /// Value for an `Authorization` header
    pub fn to_basic_header(&self) -> String {
        let raw = format!("{}:{}", self.username, self.password);
        format!("Basic {}", STANDARD.encode(raw))
    }

    /// Compare without short-circuiting on the first differing byte
    pub fn matches(&self, other: &Credentials) -> bool {
        let username_ok = constant_time_eq(self.username.as_bytes(), other.username.as_bytes());
        let password_ok = constant_time_eq(self.password.as_bytes(), other.password.as_bytes());
        username_ok & password_ok
    }
}

/// Compares SHA-256 digests, so the time taken depends on neither the
/// contents nor the lengths of the inputs
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    let (a, b) = (Sha256::digest(a), Sha256::digest(b));
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Middleware rejecting requests without valid credentials
pub async fn require_basic_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let supplied = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(Credentials::from_basic_header);

    match supplied {
        Some(credentials) if state.credentials.matches(&credentials) => Ok(next.run(request).await),
        _ => {
            tracing::debug!("Rejected request to {}", request.uri().path());
            Err(ApiError::Unauthorized)
        }
    }
}
