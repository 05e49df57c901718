//! HTTP summarizer adapter.
//!
//! Talks to the external summarization service over a small JSON POST
//! contract. Transport failures and non-2xx replies surface as
//! `SummarizerFailed`; the orchestrator treats both as retryable.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::SummarizerConfig;
use crate::domain::ports::{SummarizeOutcome, SummarizeRequest, Summarizer};

pub struct HttpSummarizer {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpSummarizer {
    pub fn new(config: &SummarizerConfig, request_timeout: Duration) -> DomainResult<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| DomainError::SummarizerFailed(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone().or_else(|| std::env::var("RECAP_SUMMARIZER__API_KEY").ok()),
        })
    }
}

#[derive(Serialize)]
struct WireRequest {
    window_start: String,
    window_end: String,
    force: bool,
}

#[derive(Deserialize)]
struct WireResponse {
    success: bool,
    #[serde(default)]
    note_id: Option<Uuid>,
    #[serde(default)]
    file_path: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    skipped_idle: bool,
    #[serde(default)]
    idle_reason: Option<String>,
}

#[async_trait]
impl Summarizer for HttpSummarizer {
    async fn summarize(&self, request: SummarizeRequest) -> DomainResult<SummarizeOutcome> {
        let body = WireRequest {
            window_start: request.window_start.to_rfc3339(),
            window_end: request.window_end.to_rfc3339(),
            force: request.force,
        };

        let mut builder = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| DomainError::SummarizerFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(DomainError::SummarizerFailed(format!(
                "HTTP {status}: {text}"
            )));
        }

        let wire: WireResponse = response
            .json()
            .await
            .map_err(|e| DomainError::SummarizerFailed(e.to_string()))?;

        Ok(SummarizeOutcome {
            success: wire.success,
            note_id: wire.note_id,
            file_path: wire.file_path,
            error: wire.error,
            skipped_idle: wire.skipped_idle,
            idle_reason: wire.idle_reason,
        })
    }
}
