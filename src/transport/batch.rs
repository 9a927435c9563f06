use futures::future;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

use crate::constants::DEFAULT_BATCH_MAX_CONCURRENT;
use crate::models::Artifact;
use crate::transport::result::TransportResult;
use crate::transport::Transport;

/// How a batch of artifacts is pushed through a transport's `send`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum BatchStrategy {
    Sequential,
    Parallel {
        #[serde(default = "default_max_concurrent")]
        max_concurrent: usize,
    },
}

fn default_max_concurrent() -> usize {
    DEFAULT_BATCH_MAX_CONCURRENT
}

impl Default for BatchStrategy {
    fn default() -> Self {
        BatchStrategy::Sequential
    }
}

impl BatchStrategy {
    pub async fn send_batch<T>(&self, transport: &T, artifacts: &[Artifact]) -> Vec<TransportResult>
    where
        T: Transport + ?Sized,
    {
        match *self {
            BatchStrategy::Sequential => send_sequential(transport, artifacts).await,
            BatchStrategy::Parallel { max_concurrent } => {
                send_bounded_parallel(transport, artifacts, max_concurrent).await
            }
        }
    }
}

/// Send one artifact, turning a raised error into a `failed` result.
async fn send_one<T>(transport: &T, artifact: &Artifact) -> TransportResult
where
    T: Transport + ?Sized,
{
    match transport.send(artifact).await {
        Ok(result) => result,
        Err(e) => {
            let artifact_id = artifact.artifact_id();
            warn!("{}: failed to send {}: {}", transport.name(), artifact_id, e.safe_message());
            TransportResult::failed(artifact_id, e.safe_message())
        }
    }
}

/// Send artifacts one at a time in input order. A failing artifact never
/// aborts the rest of the batch.
pub async fn send_sequential<T>(transport: &T, artifacts: &[Artifact]) -> Vec<TransportResult>
where
    T: Transport + ?Sized,
{
    debug!("{}: sending batch of {} sequentially", transport.name(), artifacts.len());

    let mut results = Vec::with_capacity(artifacts.len());
    for artifact in artifacts {
        results.push(send_one(transport, artifact).await);
    }
    results
}

/// Send all artifacts concurrently with at most `max_concurrent` in flight.
///
/// Results come back in input order regardless of completion order.
pub async fn send_bounded_parallel<T>(
    transport: &T,
    artifacts: &[Artifact],
    max_concurrent: usize,
) -> Vec<TransportResult>
where
    T: Transport + ?Sized,
{
    let limit = max_concurrent.max(1);
    debug!(
        "{}: sending batch of {} with up to {} in flight",
        transport.name(),
        artifacts.len(),
        limit
    );

    let semaphore = Semaphore::new(limit);
    let sends = artifacts.iter().map(|artifact| {
        let semaphore = &semaphore;
        async move {
            match semaphore.acquire().await {
                Ok(_permit) => send_one(transport, artifact).await,
                // The semaphore is local and never closed
                Err(e) => TransportResult::failed(artifact.artifact_id(), e.to_string()),
            }
        }
    });

    future::join_all(sends).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{artifacts_with_ids, ScriptedTransport};
    use crate::transport::result::TransportStatus;
    use serde_json::json;
    use std::time::Duration;

    #[tokio::test]
    async fn test_sequential_preserves_order_and_continues() {
        let transport = ScriptedTransport::new().fail_on("b").raise_on("c");
        let artifacts = artifacts_with_ids(&["a", "b", "c", "d"]);

        let results = send_sequential(&transport, &artifacts).await;

        let ids: Vec<_> = results.iter().map(|r| r.artifact_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c", "d"]);
        assert_eq!(results[0].status, TransportStatus::Success);
        assert_eq!(results[1].status, TransportStatus::Failed);
        assert_eq!(results[2].status, TransportStatus::Failed);
        assert!(results[2].error.as_deref().unwrap().contains("scripted failure"));
        assert_eq!(results[3].status, TransportStatus::Success);
    }

    #[tokio::test]
    async fn test_parallel_preserves_input_order() {
        // Earlier artifacts take longer so completion order is reversed
        let transport = ScriptedTransport::new()
            .delay_for("a", Duration::from_millis(60))
            .delay_for("b", Duration::from_millis(30));
        let artifacts = artifacts_with_ids(&["a", "b", "c"]);

        let results = send_bounded_parallel(&transport, &artifacts, 10).await;

        let ids: Vec<_> = results.iter().map(|r| r.artifact_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert!(results.iter().all(|r| r.is_success()));
    }

    #[tokio::test]
    async fn test_parallel_respects_limit() {
        let transport = ScriptedTransport::new().with_default_delay(Duration::from_millis(20));
        let ids: Vec<String> = (0..12).map(|i| format!("r{}", i)).collect();
        let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let artifacts = artifacts_with_ids(&id_refs);

        let results = send_bounded_parallel(&transport, &artifacts, 3).await;

        assert_eq!(results.len(), 12);
        assert!(transport.peak_in_flight() <= 3);
        assert!(transport.peak_in_flight() >= 2);
    }

    #[tokio::test]
    async fn test_strategies_agree() {
        let transport = ScriptedTransport::new().fail_on("x2").raise_on("x4");
        let artifacts = artifacts_with_ids(&["x1", "x2", "x3", "x4", "x5"]);

        let sequential = BatchStrategy::Sequential.send_batch(&transport, &artifacts).await;
        let parallel = BatchStrategy::Parallel { max_concurrent: 2 }
            .send_batch(&transport, &artifacts)
            .await;

        assert_eq!(sequential.len(), parallel.len());
        for (s, p) in sequential.iter().zip(parallel.iter()) {
            assert_eq!(s.artifact_id, p.artifact_id);
            assert_eq!(s.status, p.status);
        }
    }

    #[tokio::test]
    async fn test_missing_resource_id_becomes_unknown() {
        let transport = ScriptedTransport::new().raise_on("unknown");
        let artifacts = vec![Artifact::from_value(json!({"configuration": {}})).unwrap()];

        let sequential = send_sequential(&transport, &artifacts).await;
        let parallel = send_bounded_parallel(&transport, &artifacts, 0).await;

        assert_eq!(sequential[0].artifact_id, "unknown");
        assert_eq!(parallel[0].artifact_id, "unknown");
        assert_eq!(parallel[0].status, TransportStatus::Failed);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let transport = ScriptedTransport::new();
        assert!(send_sequential(&transport, &[]).await.is_empty());
        assert!(send_bounded_parallel(&transport, &[], 4).await.is_empty());
    }

    #[test]
    fn test_strategy_from_yaml() {
        let parallel: BatchStrategy = serde_yaml::from_str("strategy: parallel\nmax_concurrent: 4\n").unwrap();
        assert_eq!(parallel, BatchStrategy::Parallel { max_concurrent: 4 });

        let defaulted: BatchStrategy = serde_yaml::from_str("strategy: parallel\n").unwrap();
        assert_eq!(defaulted, BatchStrategy::Parallel { max_concurrent: 10 });

        let sequential: BatchStrategy = serde_yaml::from_str("strategy: sequential\n").unwrap();
        assert_eq!(sequential, BatchStrategy::Sequential);
    }
}
