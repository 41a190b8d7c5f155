//! Upstream pass-through
//!
//! Admitted requests that match no gateway route are forwarded unchanged to
//! the internal API, and its answer is relayed back.

use crate::config::InternalApiConfig;
use crate::error::{GatewayError, GatewayResult};
use crate::GatewayState;
use axum::body::{to_bytes, Body};
use axum::extract::{Request, State};
use axum::http::header::{CONNECTION, HOST, TRANSFER_ENCODING};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use std::time::Duration;

/// Largest request body the proxy will buffer
const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// HTTP client bound to the internal API
#[derive(Debug, Clone)]
pub struct Upstream {
    client: reqwest::Client,
    base_url: String,
}

impl Upstream {
    pub fn new(config: &InternalApiConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Forward `request` and relay the upstream response
    pub async fn forward(&self, request: Request) -> GatewayResult<Response> {
        let (parts, body) = request.into_parts();
        let path_and_query = parts.uri.path_and_query().map_or("/", |pq| pq.as_str());
        let url = format!("{}{}", self.base_url, path_and_query);

        let body = to_bytes(body, MAX_BODY_BYTES)
            .await
            .map_err(|e| GatewayError::Internal(format!("failed to read request body: {}", e)))?;

        let mut headers = parts.headers;
        headers.remove(HOST);

        let upstream = self
            .client
            .request(parts.method, url.as_str())
            .headers(headers)
            .body(body)
            .send()
            .await
            .map_err(|e| GatewayError::Internal(format!("upstream request to {} failed: {}", url, e)))?;

        let status = upstream.status();
        let mut response_headers = upstream.headers().clone();
        let bytes = upstream
            .bytes()
            .await
            .map_err(|e| GatewayError::Internal(format!("failed to read upstream body: {}", e)))?;

        // Body is re-framed by the server
        response_headers.remove(TRANSFER_ENCODING);
        response_headers.remove(CONNECTION);

        let mut response = Response::new(Body::from(bytes));
        *response.status_mut() = status;
        *response.headers_mut() = response_headers;
        Ok(response)
    }
}

/// Fallback handler proxying to the internal API
pub async fn forward(State(state): State<GatewayState>, request: Request) -> GatewayResult<Response> {
    state.upstream.forward(request).await
}

#[derive(Debug, Serialize)]
pub struct StubResponse {
    pub message: String,
    pub timestamp: String,
}

/// Local protected endpoint, useful for exercising the pipeline without an upstream
pub async fn internal_stub() -> impl IntoResponse {
    Json(StubResponse {
        message: "OK".into(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}
