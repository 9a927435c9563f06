use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;
use serde_json::Value;

use crate::config::{read_credential, HttpConfig};
use crate::constants::{HEALTH_CHECK_TIMEOUT_SECS, HTTP_TRANSPORT};
use crate::models::Artifact;
use crate::security::scrub_secret;
use crate::transport::retry::Retried;
use crate::transport::{
    retry_transient, RetryFailure, RetryPolicy, Transport, TransportError, TransportResult,
    TransportState, TransportStatus,
};

/// Build the shared reqwest client used by the network transports.
pub(crate) fn build_client(timeout_secs: u64) -> Result<Client, TransportError> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs.max(1)))
        .build()
        .map_err(|e| TransportError::Configuration(format!("Failed to build HTTP client: {}", e)))
}

/// Turn a non-2xx response into `HttpStatus`, otherwise read the body.
///
/// A body that fails to arrive on a 2xx response is a transport fault, not
/// an empty answer.
pub(crate) async fn read_response(response: reqwest::Response) -> Result<String, TransportError> {
    let status = response.status();
    let body = response.text().await;

    if !status.is_success() {
        return Err(TransportError::HttpStatus {
            status: status.as_u16(),
            body: body.unwrap_or_else(|e| format!("<unreadable body: {}>", e)),
        });
    }
    Ok(body?)
}

/// POSTs each artifact as JSON to a fixed webhook endpoint.
pub struct HttpTransport {
    state: TransportState,
    client: Client,
    endpoint: String,
    token: Option<String>,
    headers: BTreeMap<String, String>,
    retry: RetryPolicy,
}

impl HttpTransport {
    pub fn new(config: &HttpConfig, max_connection_errors: u32) -> Result<Self, TransportError> {
        let endpoint = config.endpoint.trim();
        if endpoint.is_empty() {
            return Err(TransportError::Configuration("http endpoint must not be empty".to_string()));
        }

        let token = match &config.token_env_var {
            Some(var) => Some(read_credential(var)?),
            None => None,
        };

        Ok(Self {
            state: TransportState::new(HTTP_TRANSPORT, max_connection_errors),
            client: build_client(config.timeout_secs)?,
            endpoint: endpoint.to_string(),
            token,
            headers: config.headers.clone(),
            retry: config.retry.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn scrub(&self, message: &str) -> String {
        scrub_secret(message, self.token.as_deref().unwrap_or(""))
    }

    async fn post(&self, body: &Value) -> Result<String, TransportError> {
        let mut request = self.client.post(&self.endpoint).json(body);
        for (name, value) in &self.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        read_response(response).await
    }

    /// Map the final outcome of a retried POST onto a result.
    fn to_result(
        &self,
        artifact_id: String,
        outcome: Result<Retried<String>, RetryFailure>,
        started: Instant,
    ) -> TransportResult {
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

        match outcome {
            Ok(Retried { value: body, retries }) => {
                let response = serde_json::from_str(&body).unwrap_or(Value::String(body));
                TransportResult::success(artifact_id)
                    .with_response(response)
                    .with_retry_count(retries)
                    .with_duration_ms(elapsed_ms)
            }
            Err(RetryFailure { error: e, retries }) => {
                let message = self.scrub(&e.to_string());

                let status = match &e {
                    TransportError::HttpStatus { status: 429, .. } => TransportStatus::RateLimited,
                    TransportError::Timeout(_) => TransportStatus::Timeout,
                    _ => TransportStatus::Failed,
                };

                if e.is_connection_error() {
                    self.state.record_connection_error();
                }
                warn!("Failed to deliver {} to {}: {}", artifact_id, self.endpoint, message);

                TransportResult::new(status, artifact_id)
                    .with_error(message)
                    .with_retry_count(retries)
                    .with_duration_ms(elapsed_ms)
            }
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn state(&self) -> &TransportState {
        &self.state
    }

    async fn connect(&self) -> bool {
        let healthy = self.health_check().await;
        self.state.set_connected(healthy);
        if healthy {
            self.state.reset_connection_errors();
        }
        healthy
    }

    async fn disconnect(&self) {
        self.state.set_connected(false);
    }

    async fn send(&self, artifact: &Artifact) -> Result<TransportResult, TransportError> {
        let artifact_id = artifact.artifact_id();
        let started = Instant::now();

        let body = match artifact.to_json() {
            Ok(body) => body,
            Err(e) => {
                let result = TransportResult::failed(
                    artifact_id,
                    format!("Failed to serialize artifact: {}", e),
                );
                self.state.record(&result);
                return Ok(result);
            }
        };

        let label = format!("POST {}", artifact_id);
        let outcome = retry_transient(&self.retry, &label, || self.post(&body)).await;
        let result = self.to_result(artifact_id, outcome, started);

        debug!("{} -> {}", result.artifact_id, result.status);
        self.state.record(&result);
        Ok(result)
    }

    /// Any HTTP answer below 500 counts as reachable.
    async fn health_check(&self) -> bool {
        let response = self
            .client
            .head(&self.endpoint)
            .timeout(Duration::from_secs(HEALTH_CHECK_TIMEOUT_SECS))
            .send()
            .await;

        match response {
            Ok(response) => !response.status().is_server_error(),
            Err(e) => {
                debug!("Health check for {} failed: {}", self.endpoint, self.scrub(&e.to_string()));
                false
            }
        }
    }
}
