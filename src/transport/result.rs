use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outcome of a single delivery attempt.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransportStatus {
    Success,
    Failed,
    Retrying,
    Timeout,
    RateLimited,
}

impl TransportStatus {
    pub fn should_retry(&self) -> bool {
        matches!(
            self,
            TransportStatus::Failed | TransportStatus::Timeout | TransportStatus::RateLimited
        )
    }
}

impl fmt::Display for TransportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransportStatus::Success => "success",
            TransportStatus::Failed => "failed",
            TransportStatus::Retrying => "retrying",
            TransportStatus::Timeout => "timeout",
            TransportStatus::RateLimited => "rate_limited",
        };
        write!(f, "{}", name)
    }
}

/// Immutable record of one `send` call.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TransportResult {
    pub status: TransportStatus,
    pub artifact_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub retry_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<f64>,
}

impl TransportResult {
    pub fn new(status: TransportStatus, artifact_id: impl Into<String>) -> Self {
        Self {
            status,
            artifact_id: artifact_id.into(),
            timestamp: Utc::now(),
            response: None,
            error: None,
            retry_count: 0,
            duration_ms: None,
        }
    }

    pub fn success(artifact_id: impl Into<String>) -> Self {
        Self::new(TransportStatus::Success, artifact_id)
    }

    pub fn failed(artifact_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self::new(TransportStatus::Failed, artifact_id).with_error(error)
    }

    pub fn with_response(mut self, response: Value) -> Self {
        self.response = Some(response);
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn with_retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: f64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == TransportStatus::Success
    }
}
