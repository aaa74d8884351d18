//! Webhook completion notifier.
//!
//! POSTs a JSON payload to a configured URL when an assessment
//! terminates. Delivery is retried with exponential backoff for a
//! bounded window; failure is reported to the caller, which logs it
//! and moves on.

use std::time::Duration;

use async_trait::async_trait;
use backoff::ExponentialBackoff;
use serde::Serialize;
use tracing::{debug, warn};

use crate::domain::errors::{EngineError, EngineResult};
use crate::domain::models::Assessment;
use crate::domain::ports::CompletionNotifier;

/// Payload delivered to the webhook endpoint.
#[derive(Debug, Serialize)]
struct CompletionPayload<'a> {
    assessment_id: uuid::Uuid,
    candidate_id: uuid::Uuid,
    job_role_id: uuid::Uuid,
    status: &'a str,
    total_score: Option<f64>,
    suspicious_activity: bool,
    completed_at: Option<String>,
}

pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
    max_elapsed: Duration,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, max_elapsed: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            max_elapsed,
        }
    }

    async fn post_once(&self, payload: &CompletionPayload<'_>) -> Result<(), backoff::Error<String>> {
        let response = self
            .client
            .post(&self.url)
            .json(payload)
            .send()
            .await
            .map_err(|e| backoff::Error::transient(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        // 4xx means the receiver rejected the payload; retrying won't help.
        if status.is_client_error() {
            return Err(backoff::Error::permanent(format!(
                "webhook rejected notification: {status}"
            )));
        }
        Err(backoff::Error::transient(format!(
            "webhook returned {status}"
        )))
    }
}

#[async_trait]
impl CompletionNotifier for WebhookNotifier {
    async fn assessment_finished(&self, assessment: &Assessment) -> EngineResult<()> {
        let payload = CompletionPayload {
            assessment_id: assessment.id,
            candidate_id: assessment.candidate_id,
            job_role_id: assessment.job_role_id,
            status: assessment.status.as_str(),
            total_score: assessment.total_score,
            suspicious_activity: assessment.integrity.suspicious_activity,
            completed_at: assessment.completed_at.map(|t| t.to_rfc3339()),
        };

        let policy = ExponentialBackoff {
            max_elapsed_time: Some(self.max_elapsed),
            ..ExponentialBackoff::default()
        };

        backoff::future::retry(policy, || async {
            self.post_once(&payload).await.map_err(|e| {
                if let backoff::Error::Transient { ref err, .. } = e {
                    warn!(assessment_id = %assessment.id, %err, "webhook delivery failed, will retry");
                }
                e
            })
        })
        .await
        .map_err(EngineError::DependencyUnavailable)?;

        debug!(assessment_id = %assessment.id, "completion notification delivered");
        Ok(())
    }
}
