//! Pluggable delivery transports.
//!
//! Every destination implements [`Transport`]: a small async contract
//! (connect, disconnect, send, send_batch, health_check) plus shared
//! [`TransportState`] carrying metrics and the connection-error circuit
//! breaker.
//!
//! ## Architecture
//!
//! ```text
//!  Artifact ──▶ TransportFactory::create(name, config)
//!                         │
//!          ┌──────────┬───┴──────┬──────────┬────────────────┐
//!          ▼          ▼          ▼          ▼                ▼
//!       console     file       http        s3        policy_scanner
//!                                │          │                │
//!                                └── retry_transient ────────┤
//!                                                            ▼
//!                                                     PolicyResolver
//! ```
//!
//! ## Send discipline
//!
//! `console`, `file`, `http` and `s3` report delivery failures as
//! `Ok(result)` with a non-success status. `policy_scanner` raises a
//! [`TransportError`] instead. The batch helpers in [`batch`] accept both
//! and always return one result per artifact, in input order.

use async_trait::async_trait;

use crate::models::Artifact;

/// Bounded-parallel and sequential batch strategies
pub mod batch;

/// Console (stdout) sink
pub mod console;

/// Error taxonomy shared by transports, the factory and the retry wrapper
pub mod error;

/// Name → constructor registry
pub mod factory;

/// Filesystem sink, one JSON file per artifact
pub mod file;

/// Generic HTTP (webhook) transport
pub mod http;

/// Running delivery statistics
pub mod metrics;

/// Delivery outcome model
pub mod result;

/// Exponential-backoff retry wrapper for network calls
pub mod retry;

/// Amazon S3 sink
pub mod s3;

/// Policy-scanner submission transport
pub mod scanner;

/// Metrics and circuit breaker state
pub mod state;

pub use batch::{send_bounded_parallel, send_sequential, BatchStrategy};
pub use error::TransportError;
pub use factory::TransportFactory;
pub use metrics::TransportMetrics;
pub use result::{TransportResult, TransportStatus};
pub use retry::{retry_transient, RetryFailure, RetryPolicy};
pub use state::TransportState;

/// Contract implemented by every delivery destination.
///
/// All methods may be called concurrently on the same instance.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Shared metrics and breaker state.
    fn state(&self) -> &TransportState;

    /// Registered name of this transport, used in logs.
    fn name(&self) -> &str {
        self.state().name()
    }

    /// Establish readiness. Never errors; leaves `is_connected` false on failure.
    async fn connect(&self) -> bool;

    /// Release resources. Calling it twice is harmless.
    async fn disconnect(&self);

    /// Deliver exactly one artifact. The outcome is recorded in the metrics
    /// before this returns, whether it returns a result or an error.
    async fn send(&self, artifact: &Artifact) -> Result<TransportResult, TransportError>;

    /// Deliver several artifacts, one result per input in input order.
    async fn send_batch(&self, artifacts: &[Artifact]) -> Vec<TransportResult> {
        send_sequential(self, artifacts).await
    }

    /// Lightweight reachability probe. Does not touch the metrics.
    async fn health_check(&self) -> bool;

    fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    fn connection_errors(&self) -> u32 {
        self.state().connection_errors()
    }

    fn get_metrics(&self) -> TransportMetrics {
        self.state().metrics()
    }

    fn reset_metrics(&self) {
        self.state().reset_metrics()
    }
}
