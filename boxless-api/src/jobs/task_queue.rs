//! Durable task queue boundary.
//!
//! A task is an at-least-once unit of deferred work, persisted by an
//! external queue service and delivered back to this API as an HTTP
//! callback. The backend is injected so tests can substitute an in-memory
//! recorder.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[async_trait]
pub trait TaskBackend: Send + Sync {
    /// Enqueue an HTTP callback task. `not_before` delays eligibility for
    /// execution. Returns the queue's name for the task.
    async fn enqueue(
        &self,
        target_url: &str,
        payload: Vec<u8>,
        not_before: Option<DateTime<Utc>>,
    ) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct TaskEnvelope<'a> {
    http_method: &'a str,
    url: &'a str,
    /// Base64 of the callback request body
    body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    schedule_time: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct EnqueueResponse {
    name: Option<String>,
}

/// Queue service client: POSTs task envelopes to a single queue endpoint
pub struct HttpTaskBackend {
    http: reqwest::Client,
    queue_url: String,
}

impl HttpTaskBackend {
    pub fn new(queue_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            queue_url: queue_url.into(),
        }
    }
}

#[async_trait]
impl TaskBackend for HttpTaskBackend {
    async fn enqueue(
        &self,
        target_url: &str,
        payload: Vec<u8>,
        not_before: Option<DateTime<Utc>>,
    ) -> Result<String> {
        let envelope = TaskEnvelope {
            http_method: "POST",
            url: target_url,
            body: STANDARD.encode(&payload),
            schedule_time: not_before.map(|t| t.to_rfc3339()),
        };

        let response = self
            .http
            .post(&self.queue_url)
            .json(&envelope)
            .send()
            .await
            .context("Failed to reach task queue")?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("Task queue returned status {}", status));
        }

        let parsed: EnqueueResponse = response.json().await.unwrap_or_default();
        Ok(parsed.name.unwrap_or_else(|| target_url.to_string()))
    }
}
