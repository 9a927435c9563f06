//! Test utilities for config-relay
//!
//! This module provides common testing utilities, helpers, and mocks
//! for use across all test modules.

#![cfg(test)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::json;

use crate::models::Artifact;
use crate::transport::{Transport, TransportError, TransportResult, TransportState};

/// Build artifacts carrying only a top-level resource id.
pub fn artifacts_with_ids(ids: &[&str]) -> Vec<Artifact> {
    ids.iter()
        .map(|id| Artifact::from_value(json!({"resource_id": id})).unwrap())
        .collect()
}

/// A realistic AWS artifact as produced by an extractor.
pub fn aws_artifact(resource_id: &str, account_id: &str, region: &str) -> Artifact {
    Artifact::from_value(json!({
        "resource_id": resource_id,
        "cloud_provider": "aws",
        "configuration": {"versioning": "Enabled", "encryption": {"sse_algorithm": "aws:kms"}},
        "metadata": {
            "account_id": account_id,
            "region": region,
            "service": "s3",
            "resource_type": "AWS::S3::Bucket"
        }
    }))
    .unwrap()
}

/// Transport whose behaviour per artifact id is scripted up front.
///
/// Ids in `fail_on` come back as `Ok(failed result)`, ids in `raise_on` as
/// `Err`. Everything else succeeds after an optional delay.
pub struct ScriptedTransport {
    state: TransportState,
    fail_on: HashSet<String>,
    raise_on: HashSet<String>,
    delays: HashMap<String, Duration>,
    default_delay: Option<Duration>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self {
            state: TransportState::with_defaults("scripted"),
            fail_on: HashSet::new(),
            raise_on: HashSet::new(),
            delays: HashMap::new(),
            default_delay: None,
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn fail_on(mut self, id: &str) -> Self {
        self.fail_on.insert(id.to_string());
        self
    }

    pub fn raise_on(mut self, id: &str) -> Self {
        self.raise_on.insert(id.to_string());
        self
    }

    pub fn delay_for(mut self, id: &str, delay: Duration) -> Self {
        self.delays.insert(id.to_string(), delay);
        self
    }

    pub fn with_default_delay(mut self, delay: Duration) -> Self {
        self.default_delay = Some(delay);
        self
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    fn state(&self) -> &TransportState {
        &self.state
    }

    async fn connect(&self) -> bool {
        self.state.set_connected(true);
        true
    }

    async fn disconnect(&self) {
        self.state.set_connected(false);
    }

    async fn send(&self, artifact: &Artifact) -> Result<TransportResult, TransportError> {
        let id = artifact.artifact_id();
        let started = Instant::now();

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);

        if let Some(delay) = self.delays.get(&id).copied().or(self.default_delay) {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.raise_on.contains(&id) {
            self.state.record_error("scripted failure", 0);
            return Err(TransportError::Delivery(format!("scripted failure for {}", id)));
        }

        let result = if self.fail_on.contains(&id) {
            TransportResult::failed(id, "scripted rejection")
        } else {
            TransportResult::success(id)
                .with_duration_ms(started.elapsed().as_secs_f64() * 1000.0)
        };
        self.state.record(&result);
        Ok(result)
    }

    async fn health_check(&self) -> bool {
        true
    }
}
