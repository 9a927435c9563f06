//! Submission of artifacts to a remote policy scanner.
//!
//! Each artifact is evaluated against the policy chosen by
//! [`PolicyResolver`]. The request carries the resolved labels and the
//! artifact itself:
//!
//! ```text
//! POST {host}/api/v1/policies/{policy}/scan
//! Authorization: Bearer <token>
//!
//! { "labels": { .. }, "inputData": { ..artifact.. } }
//! ```
//!
//! Unlike the sink transports, failures are raised as [`TransportError`];
//! the outcome is still recorded in the metrics first.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::{Client, Url};
use serde_json::{json, Value};
use tokio::sync::Semaphore;

use crate::config::{read_credential, ScannerConfig};
use crate::constants::{
    HEALTH_CHECK_TIMEOUT_SECS, POLICY_SCANNER_TRANSPORT, SCANNER_HEALTH_PATH, SCANNER_SCAN_PATH,
};
use crate::models::Artifact;
use crate::policy::{PolicyLevel, PolicyResolver};
use crate::security::scrub_secret;
use crate::transport::http::{build_client, read_response};
use crate::transport::retry::Retried;
use crate::transport::{
    retry_transient, send_bounded_parallel, RetryFailure, RetryPolicy, Transport,
    TransportError, TransportResult, TransportState,
};

/// Prefix `https://` when the host carries no scheme and drop trailing slashes.
pub fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

pub struct PolicyScannerTransport {
    state: TransportState,
    client: Client,
    base_url: String,
    token: String,
    resolver: PolicyResolver,
    retry: RetryPolicy,
    max_concurrent: usize,
    permits: Semaphore,
}

impl PolicyScannerTransport {
    /// Fails when the host is blank or the token variable is not set.
    pub fn new(config: &ScannerConfig, max_connection_errors: u32) -> Result<Self, TransportError> {
        if config.host.trim().is_empty() {
            return Err(TransportError::Configuration(
                "policy_scanner host must not be empty".to_string(),
            ));
        }
        let base_url = normalize_host(&config.host);
        Url::parse(&base_url).map_err(|e| {
            TransportError::Configuration(format!(
                "Invalid policy_scanner host '{}': {}",
                base_url, e
            ))
        })?;
        let token = read_credential(&config.token_env_var)?;
        let max_concurrent = config.max_concurrent.max(1);
        let resolver = PolicyResolver::new(&config.policies);

        info!(
            "Policy scanner at {} (default policy '{}', {} concurrent requests)",
            base_url,
            resolver.default_policy(),
            max_concurrent
        );

        Ok(Self {
            state: TransportState::new(POLICY_SCANNER_TRANSPORT, max_connection_errors),
            client: build_client(config.timeout_secs)?,
            base_url,
            token,
            resolver,
            retry: config.retry.clone(),
            max_concurrent,
            permits: Semaphore::new(max_concurrent),
        })
    }

    pub fn resolver(&self) -> &PolicyResolver {
        &self.resolver
    }

    /// Scan endpoint for `policy`, which always lands in a single path segment.
    pub fn scan_url(&self, policy: &str) -> Result<Url, TransportError> {
        let invalid = |reason: String| {
            TransportError::Configuration(format!(
                "Invalid scanner URL '{}': {}",
                self.base_url, reason
            ))
        };
        let mut url = Url::parse(&self.base_url).map_err(|e| invalid(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| invalid("cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(
                SCANNER_SCAN_PATH
                    .split('/')
                    .filter(|segment| !segment.is_empty())
                    .map(|segment| if segment == "{policy}" { policy } else { segment }),
            );
        Ok(url)
    }

    /// Request body for one artifact.
    pub fn request_body(&self, artifact: &Artifact) -> Result<Value, TransportError> {
        Ok(json!({
            "labels": self.resolver.labels_for(artifact),
            "inputData": artifact.to_json()?,
        }))
    }

    fn scrub(&self, message: &str) -> String {
        scrub_secret(message, &self.token)
    }

    async fn post_scan(&self, url: &Url, body: &Value) -> Result<Value, TransportError> {
        let response = self
            .client
            .post(url.clone())
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await?;

        let text = read_response(response).await?;
        serde_json::from_str(&text).map_err(|e| {
            TransportError::Delivery(format!("Scanner returned invalid JSON: {}", e))
        })
    }

    async fn submit(
        &self,
        artifact: &Artifact,
        policy: &str,
    ) -> Result<Retried<Value>, RetryFailure> {
        let body = self.request_body(artifact)?;
        let url = self.scan_url(policy)?;

        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| TransportError::Delivery(format!("Request limiter closed: {}", e)))?;

        retry_transient(&self.retry, url.as_str(), || self.post_scan(&url, &body)).await
    }
}

#[async_trait]
impl Transport for PolicyScannerTransport {
    fn state(&self) -> &TransportState {
        &self.state
    }

    async fn connect(&self) -> bool {
        let healthy = self.health_check().await;
        self.state.set_connected(healthy);
        if healthy {
            self.state.reset_connection_errors();
        } else {
            warn!("Policy scanner at {} is not reachable", self.base_url);
        }
        healthy
    }

    async fn disconnect(&self) {
        self.state.set_connected(false);
    }

    async fn send(&self, artifact: &Artifact) -> Result<TransportResult, TransportError> {
        let artifact_id = artifact.artifact_id();
        let (policy, level) = self.resolver.resolve_with_level(artifact);
        let started = Instant::now();

        if level == PolicyLevel::Default && policy.is_empty() {
            let error = TransportError::Configuration(format!(
                "no policy resolved for {} and no default policy configured",
                artifact_id
            ));
            self.state.record_error(&error.safe_message(), 0);
            return Err(error);
        }

        match self.submit(artifact, policy).await {
            Ok(Retried { value, retries }) => {
                debug!("Scanned {} against '{}' ({} level)", artifact_id, policy, level);
                let result = TransportResult::success(artifact_id)
                    .with_response(value)
                    .with_retry_count(retries)
                    .with_duration_ms(started.elapsed().as_secs_f64() * 1000.0);
                self.state.record(&result);
                Ok(result)
            }
            Err(RetryFailure { error: e, retries }) => {
                let message = self.scrub(&e.to_string());

                self.state.record_error(&message, retries);
                if e.is_connection_error() {
                    self.state.record_connection_error();
                }
                warn!("Scan of {} against '{}' failed: {}", artifact_id, policy, message);
                Err(e)
            }
        }
    }

    async fn send_batch(&self, artifacts: &[Artifact]) -> Vec<TransportResult> {
        send_bounded_parallel(self, artifacts, self.max_concurrent).await
    }

    async fn health_check(&self) -> bool {
        let url = format!("{}{}", self.base_url, SCANNER_HEALTH_PATH);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .timeout(Duration::from_secs(HEALTH_CHECK_TIMEOUT_SECS))
            .send()
            .await;

        match response {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("Health check for {} failed: {}", url, self.scrub(&e.to_string()));
                false
            }
        }
    }
}
