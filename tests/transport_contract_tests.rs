//! Integration tests for the transport contract.
//!
//! These tests drive transports only through the public `Transport` trait,
//! the batch helpers and the factory, using an in-memory transport that
//! reports connection failures on request.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use config_relay::config::TransportConfig;
use config_relay::models::Artifact;
use config_relay::transport::{
    send_bounded_parallel, send_sequential, BatchStrategy, Transport, TransportError,
    TransportFactory, TransportResult, TransportState, TransportStatus,
};

/// In-memory transport that fails for selected ids.
///
/// Ids in `unreachable` are reported as connection failures and count
/// against the circuit breaker.
struct MemoryTransport {
    state: TransportState,
    unreachable: HashSet<String>,
    rejected: HashSet<String>,
    delivered: AtomicUsize,
}

impl MemoryTransport {
    fn new(max_connection_errors: u32) -> Self {
        Self {
            state: TransportState::new("memory", max_connection_errors),
            unreachable: HashSet::new(),
            rejected: HashSet::new(),
            delivered: AtomicUsize::new(0),
        }
    }

    fn unreachable_for(mut self, ids: &[&str]) -> Self {
        self.unreachable.extend(ids.iter().map(|id| id.to_string()));
        self
    }

    fn rejecting(mut self, ids: &[&str]) -> Self {
        self.rejected.extend(ids.iter().map(|id| id.to_string()));
        self
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    fn state(&self) -> &TransportState {
        &self.state
    }

    async fn connect(&self) -> bool {
        self.state.set_connected(true);
        self.state.reset_connection_errors();
        true
    }

    async fn disconnect(&self) {
        self.state.set_connected(false);
    }

    async fn send(&self, artifact: &Artifact) -> Result<TransportResult, TransportError> {
        let id = artifact.artifact_id();
        // Stagger completion so later artifacts can finish first
        let delay = 5 * (id.len() % 3) as u64;
        tokio::time::sleep(Duration::from_millis(delay)).await;

        let result = if self.unreachable.contains(&id) {
            self.state.record_connection_error();
            TransportResult::failed(id, "connection refused")
        } else if self.rejected.contains(&id) {
            TransportResult::failed(id, "rejected")
        } else {
            self.delivered.fetch_add(1, Ordering::SeqCst);
            TransportResult::success(id).with_duration_ms(delay as f64)
        };

        self.state.record(&result);
        Ok(result)
    }

    async fn health_check(&self) -> bool {
        true
    }
}

fn artifacts(ids: &[&str]) -> Vec<Artifact> {
    ids.iter()
        .map(|id| Artifact::from_value(json!({"resource_id": id, "cloud_provider": "aws"})).unwrap())
        .collect()
}

/// Every send moves exactly one of success or failure
#[tokio::test]
async fn test_send_updates_metrics_exactly_once() {
    let transport = MemoryTransport::new(5).rejecting(&["bad"]);

    for (index, artifact) in artifacts(&["ok-1", "bad", "ok-2"]).iter().enumerate() {
        let before = transport.get_metrics();
        transport.send(artifact).await.unwrap();
        let after = transport.get_metrics();

        assert_eq!(after.total_sent, before.total_sent + 1, "send {}", index);
        let success_delta = after.total_success - before.total_success;
        let failed_delta = after.total_failed - before.total_failed;
        assert_eq!(success_delta + failed_delta, 1);
        assert!(after.success_rate() >= 0.0 && after.success_rate() <= 100.0);
    }

    let metrics = transport.get_metrics();
    assert_eq!(metrics.total_success, 2);
    assert_eq!(metrics.last_error.as_deref(), Some("rejected"));

    transport.reset_metrics();
    assert_eq!(transport.get_metrics().total_sent, 0);
    assert_eq!(transport.get_metrics().success_rate(), 0.0);
}

/// Sequential and parallel batches agree per index
#[tokio::test]
async fn test_sequential_and_parallel_batches_agree() {
    let ids = ["a", "bb", "ccc", "dddd", "eeeee", "bad", "g"];
    let input = artifacts(&ids);

    let sequential = send_sequential(&MemoryTransport::new(5).rejecting(&["bad"]), &input).await;
    let parallel = send_bounded_parallel(&MemoryTransport::new(5).rejecting(&["bad"]), &input, 3).await;

    assert_eq!(sequential.len(), ids.len());
    assert_eq!(parallel.len(), ids.len());
    for (seq, par) in sequential.iter().zip(&parallel) {
        assert_eq!(seq.artifact_id, par.artifact_id);
        assert_eq!(seq.status, par.status);
    }
    assert_eq!(parallel[5].status, TransportStatus::Failed);
}

#[tokio::test]
async fn test_batch_strategy_from_config() {
    let config = TransportConfig::from_yaml_str("batch:\n  strategy: parallel\n  max_concurrent: 2\n").unwrap();
    assert_eq!(config.batch, BatchStrategy::Parallel { max_concurrent: 2 });

    let transport = MemoryTransport::new(5);
    let results = config.batch.send_batch(&transport, &artifacts(&["x", "y", "z"])).await;
    let ids: Vec<_> = results.iter().map(|r| r.artifact_id.as_str()).collect();
    assert_eq!(ids, vec!["x", "y", "z"]);
    assert_eq!(transport.delivered.load(Ordering::SeqCst), 3);
}

/// Consecutive connection failures trip the breaker
#[tokio::test]
async fn test_circuit_breaker_trips_and_resets() {
    let transport = MemoryTransport::new(3).unreachable_for(&["down-1", "down-2", "down-3"]);
    assert!(transport.connect().await);

    transport.send_batch(&artifacts(&["down-1", "down-2"])).await;
    assert!(transport.is_connected());
    assert_eq!(transport.connection_errors(), 2);

    transport.send_batch(&artifacts(&["down-3"])).await;
    assert!(!transport.is_connected());
    assert_eq!(transport.connection_errors(), 3);

    transport.state().reset_connection_errors();
    assert_eq!(transport.connection_errors(), 0);
}

#[tokio::test]
async fn test_success_clears_error_streak() {
    let transport = MemoryTransport::new(3).unreachable_for(&["down"]);

    transport.send_batch(&artifacts(&["down", "down"])).await;
    assert_eq!(transport.connection_errors(), 2);

    transport.send_batch(&artifacts(&["up"])).await;
    assert_eq!(transport.connection_errors(), 0);
}

#[tokio::test]
async fn test_factory_with_custom_transport() {
    let mut factory = TransportFactory::with_builtin_transports();
    factory
        .register("Memory", |config: &TransportConfig| {
            let transport: Arc<dyn Transport> = Arc::new(MemoryTransport::new(config.max_connection_errors));
            Ok(transport)
        })
        .unwrap();

    assert!(factory.available().contains(&"memory".to_string()));

    let transport = factory.create("MEMORY", &TransportConfig::default()).unwrap();
    let results = transport.send_batch(&artifacts(&["one", "two"])).await;
    assert!(results.iter().all(|r| r.is_success()));
    assert_eq!(transport.get_metrics().total_success, 2);

    match factory.create("carrier-pigeon", &TransportConfig::default()) {
        Err(TransportError::UnknownTransportType { available, .. }) => {
            assert!(available.contains(&"memory".to_string()));
        }
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("unknown transport should not be created"),
    }
}

#[tokio::test]
async fn test_missing_resource_id_reports_unknown() {
    let transport = MemoryTransport::new(5);
    let input = vec![Artifact::from_value(json!({"cloud_provider": "gcp"})).unwrap()];

    let results = transport.send_batch(&input).await;
    assert_eq!(results[0].artifact_id, "unknown");
}
