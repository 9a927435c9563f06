use anyhow::{Context, Result};
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::transport::{TransportMetrics, TransportResult, TransportStatus};

/// Create a JSON summary of a relay run.
///
/// The summary records where the run happened, which transport delivered the
/// artifacts, the per-artifact outcomes and the transport metrics at the end
/// of the run.
///
/// # Example Output
///
/// ```json
/// {
///   "run_id": "550e8400-e29b-41d4-a716-446655440000",
///   "hostname": "relay-01",
///   "transport": "policy_scanner",
///   "artifact_count": 2,
///   "succeeded": 1,
///   "failed": 1,
///   "results": [...],
///   "metrics": {...}
/// }
/// ```
pub fn create_run_summary(
    hostname: &str,
    transport: &str,
    results: &[TransportResult],
    metrics: &TransportMetrics,
) -> Result<String> {
    let succeeded = results.iter().filter(|r| r.is_success()).count();
    let rate_limited = results
        .iter()
        .filter(|r| r.status == TransportStatus::RateLimited)
        .count();

    let summary = json!({
        "run_id": Uuid::new_v4().to_string(),
        "hostname": hostname,
        "transport": transport,
        "finished_at": Utc::now().to_rfc3339(),
        "relay_version": env!("CARGO_PKG_VERSION"),
        "artifact_count": results.len(),
        "succeeded": succeeded,
        "failed": results.len() - succeeded,
        "rate_limited": rate_limited,
        "success_rate": metrics.success_rate(),
        "results": results,
        "metrics": metrics,
    });

    serde_json::to_string_pretty(&summary).context("Failed to serialize run summary to JSON")
}
