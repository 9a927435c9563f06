use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::transport::result::TransportResult;

/// Running delivery statistics for one transport instance.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct TransportMetrics {
    pub total_sent: u64,
    pub total_success: u64,
    pub total_failed: u64,
    pub total_retries: u64,
    pub average_duration_ms: f64,
    pub last_error: Option<String>,
    pub last_success_time: Option<DateTime<Utc>>,
    pub last_failure_time: Option<DateTime<Utc>>,
}

impl TransportMetrics {
    /// Percentage of sends that succeeded, 0 when nothing was sent.
    pub fn success_rate(&self) -> f64 {
        if self.total_sent == 0 {
            return 0.0;
        }
        100.0 * self.total_success as f64 / self.total_sent as f64
    }

    pub fn record_success(&mut self, duration_ms: Option<f64>) {
        self.total_sent += 1;
        self.total_success += 1;
        self.last_success_time = Some(Utc::now());

        if let Some(duration) = duration_ms {
            let n = self.total_sent as f64;
            self.average_duration_ms = (self.average_duration_ms * (n - 1.0) + duration) / n;
        }
    }

    pub fn record_failure(&mut self, error: Option<&str>, retry_count: u32) {
        self.total_sent += 1;
        self.total_failed += 1;
        self.last_failure_time = Some(Utc::now());
        if let Some(error) = error {
            self.last_error = Some(error.to_string());
        }
        self.total_retries += u64::from(retry_count);
    }

    /// Fold a completed send into the counters.
    pub fn record(&mut self, result: &TransportResult) {
        if result.is_success() {
            self.record_success(result.duration_ms);
        } else {
            self.record_failure(result.error.as_deref(), result.retry_count);
        }
    }
}
