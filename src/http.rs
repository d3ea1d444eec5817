use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;

use crate::utils::redact_url;
use crate::AnalyzeError;

/// Raw upstream answer. Non-2xx statuses are returned, not raised.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

impl FetchResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Anything that can answer a GET. The per-call timeout is the source's concern.
#[async_trait]
pub trait HttpSource: Send + Sync {
    async fn get(&self, url: &str) -> Result<FetchResponse, AnalyzeError>;
}

/// GET `url` and return the body, failing on non-2xx or an empty body.
pub async fn fetch_text(http: &dyn HttpSource, url: &str) -> Result<String, AnalyzeError> {
    let response = http.get(url).await?;
    if !response.is_success() {
        return Err(AnalyzeError::from_status(response.status, url));
    }
    if response.body.trim().is_empty() {
        return Err(AnalyzeError::FetchError(format!(
            "empty body from {}",
            redact_url(url)
        )));
    }
    Ok(response.body)
}

/// GET `url` and deserialize a JSON body.
pub async fn fetch_json<T: DeserializeOwned>(
    http: &dyn HttpSource,
    url: &str,
) -> Result<T, AnalyzeError> {
    let body = fetch_text(http, url).await?;
    serde_json::from_str(&body)
        .map_err(|e| {
            AnalyzeError::ExtractError(format!("malformed JSON from {}: {e}", redact_url(url)))
        })
}

/// Replays canned responses keyed by exact URL; records every request.
///
/// Unregistered URLs fail with a connection error, the same way an
/// unreachable host would.
#[derive(Default)]
pub struct CannedSource {
    responses: HashMap<String, FetchResponse>,
    requests: Mutex<Vec<String>>,
}

impl CannedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(mut self, url: &str, status: u16, body: impl Into<String>) -> Self {
        self.responses.insert(
            url.to_string(),
            FetchResponse {
                status,
                body: body.into(),
            },
        );
        self
    }

    pub fn with_body(self, url: &str, body: impl Into<String>) -> Self {
        self.with_response(url, 200, body)
    }

    /// Every URL requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    pub fn request_count(&self, url: &str) -> usize {
        self.requests().iter().filter(|r| r.as_str() == url).count()
    }
}

#[async_trait]
impl HttpSource for CannedSource {
    async fn get(&self, url: &str) -> Result<FetchResponse, AnalyzeError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(url.to_string());
        }
        debug!(url = %redact_url(url), "Serving canned response");
        self.responses.get(url).cloned().ok_or_else(|| {
            AnalyzeError::ConnectionError(format!("no canned response for {}", redact_url(url)))
        })
    }
}
