//! Client for the remote Stockfish evaluation API (HTTP GET, `fen` + `depth`).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::AnnotatorError;

/// Deepest search the service accepts.
pub const MAX_DEPTH: u32 = 15;

pub const DEFAULT_API_URL: &str = "https://stockfish.online/api/s/v2.php";

/// Depth actually sent to the service.
pub fn effective_depth(requested: u32) -> u32 {
    if requested > MAX_DEPTH {
        MAX_DEPTH
    } else {
        requested
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    EmptyResponse,
    MalformedResponse,
    TransportFailure,
}

/// A per-position analysis failure, recorded in place of the evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorPayload {
    pub error: String,
    pub kind: ErrorKind,
}

impl ErrorPayload {
    pub fn empty_response() -> Self {
        Self {
            error: "Empty response from API".to_string(),
            kind: ErrorKind::EmptyResponse,
        }
    }

    pub fn malformed_response() -> Self {
        Self {
            error: "Invalid JSON response".to_string(),
            kind: ErrorKind::MalformedResponse,
        }
    }

    pub fn transport(cause: impl std::fmt::Display) -> Self {
        Self {
            error: format!("Request failed: {cause}"),
            kind: ErrorKind::TransportFailure,
        }
    }
}

/// Evaluation of one position: the service's JSON untouched, or why there is none.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AnalysisResult {
    Success(Value),
    Error(ErrorPayload),
}

impl AnalysisResult {
    pub fn is_success(&self) -> bool {
        matches!(self, AnalysisResult::Success(_))
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            AnalysisResult::Success(_) => None,
            AnalysisResult::Error(payload) => Some(payload.kind),
        }
    }
}

/// Classify a 2xx response body.
pub fn classify_body(body: &str) -> AnalysisResult {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return AnalysisResult::Error(ErrorPayload::empty_response());
    }
    match serde_json::from_str::<Value>(trimmed) {
        Ok(value) => AnalysisResult::Success(value),
        Err(_) => AnalysisResult::Error(ErrorPayload::malformed_response()),
    }
}

/// Anything that can evaluate a FEN position.
#[async_trait]
pub trait PositionAnalyzer: Send + Sync {
    async fn analyze(&self, fen: &str, requested_depth: u32) -> AnalysisResult;
}

/// HTTP client for the Stockfish API.
#[derive(Clone)]
pub struct StockfishApiClient {
    client: Client,
    url: String,
}

impl StockfishApiClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, AnnotatorError> {
        let client = Client::builder()
            .user_agent("PgnAnnotator/0.1")
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl PositionAnalyzer for StockfishApiClient {
    async fn analyze(&self, fen: &str, requested_depth: u32) -> AnalysisResult {
        let depth = effective_depth(requested_depth).to_string();
        debug!(fen, depth = %depth, "API <");

        let resp = match self
            .client
            .get(&self.url)
            .query(&[("fen", fen), ("depth", depth.as_str())])
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => return AnalysisResult::Error(ErrorPayload::transport(e)),
        };

        let resp = match resp.error_for_status() {
            Ok(resp) => resp,
            Err(e) => return AnalysisResult::Error(ErrorPayload::transport(e)),
        };

        let text = match resp.text().await {
            Ok(text) => text,
            Err(e) => return AnalysisResult::Error(ErrorPayload::transport(e)),
        };

        debug!(bytes = text.len(), "API >");
        classify_body(&text)
    }
}

/// Retries transport failures with exponential backoff. Other failures are returned as-is.
pub struct RetryingAnalyzer<A> {
    inner: A,
    max_retries: u32,
    base_backoff: Duration,
}

impl<A: PositionAnalyzer> RetryingAnalyzer<A> {
    pub fn new(inner: A, max_retries: u32, base_backoff: Duration) -> Self {
        Self {
            inner,
            max_retries,
            base_backoff,
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        self.base_backoff.saturating_mul(1u32 << attempt.min(10))
    }
}

#[async_trait]
impl<A: PositionAnalyzer> PositionAnalyzer for RetryingAnalyzer<A> {
    async fn analyze(&self, fen: &str, requested_depth: u32) -> AnalysisResult {
        let mut attempt = 0;
        loop {
            let result = self.inner.analyze(fen, requested_depth).await;
            if result.error_kind() != Some(ErrorKind::TransportFailure) || attempt >= self.max_retries {
                return result;
            }

            let wait = self.backoff(attempt);
            attempt += 1;
            warn!(attempt, max = self.max_retries, wait_ms = wait.as_millis() as u64, "Transport failure, retrying");
            tokio::time::sleep(wait).await;
        }
    }
}
