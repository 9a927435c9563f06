use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use log::{debug, warn};
use rusoto_core::{ByteStream, Region, RusotoError};
use rusoto_s3::{HeadBucketRequest, PutObjectRequest, S3Client, S3};
use serde_json::json;
use tokio::time::timeout;
use uuid::Uuid;

use crate::config::S3Config;
use crate::constants::{HEALTH_CHECK_TIMEOUT_SECS, S3_TRANSPORT, UNKNOWN_RESOURCE_ID};
use crate::models::Artifact;
use crate::transport::retry::Retried;
use crate::transport::{
    retry_transient, RetryFailure, RetryPolicy, Transport, TransportError, TransportResult,
    TransportState,
};

/// Create an S3 client for the given region and optional named profile.
fn create_s3_client(region_name: Option<&str>, profile: Option<&str>) -> Result<Arc<S3Client>, TransportError> {
    let region = match region_name {
        Some(name) => match name.parse::<Region>() {
            Ok(r) => r,
            Err(_) => {
                warn!("Invalid region '{}', using default", name);
                Region::default()
            }
        },
        None => Region::default(),
    };

    let client = match profile {
        Some(profile_name) => match rusoto_credential::ProfileProvider::new() {
            Ok(mut provider) => {
                provider.set_profile(profile_name);
                let http_client = rusoto_core::HttpClient::new().map_err(|e| {
                    TransportError::Configuration(format!("Failed to create HTTP client: {}", e))
                })?;
                S3Client::new_with(http_client, provider, region)
            }
            Err(e) => {
                warn!("Failed to create AWS profile provider: {}, using default", e);
                S3Client::new(region)
            }
        },
        None => S3Client::new(region),
    };

    Ok(Arc::new(client))
}

fn sanitize_key_component(value: &str) -> String {
    value
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' { c } else { '_' })
        .collect()
}

/// `{prefix}/{provider}/{sanitized_id}-{uuid}.json`, without a leading slash
/// when no prefix is configured.
pub fn object_key(prefix: &str, artifact: &Artifact) -> String {
    let provider = artifact.provider();
    let provider = match provider.as_str() {
        "" => UNKNOWN_RESOURCE_ID.to_string(),
        name => sanitize_key_component(name),
    };
    let id = sanitize_key_component(&artifact.artifact_id());
    let name = format!("{}/{}-{}.json", provider, id, Uuid::new_v4());

    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        name
    } else {
        format!("{}/{}", prefix, name)
    }
}

fn map_rusoto_error<E: std::error::Error + 'static>(e: RusotoError<E>) -> TransportError {
    match e {
        RusotoError::HttpDispatch(err) => TransportError::Connection(err.to_string()),
        RusotoError::Unknown(response) => TransportError::HttpStatus {
            status: response.status.as_u16(),
            body: response.body_as_str().to_string(),
        },
        other => TransportError::Delivery(other.to_string()),
    }
}

/// Archives artifacts as JSON objects in an S3 bucket.
pub struct S3Transport {
    state: TransportState,
    client: Arc<S3Client>,
    bucket: String,
    prefix: String,
    retry: RetryPolicy,
}

impl S3Transport {
    pub fn new(config: &S3Config, max_connection_errors: u32) -> Result<Self, TransportError> {
        if config.bucket.trim().is_empty() {
            return Err(TransportError::Configuration("s3 bucket must not be empty".to_string()));
        }

        let client = create_s3_client(config.region.as_deref(), config.profile.as_deref())?;

        Ok(Self {
            state: TransportState::new(S3_TRANSPORT, max_connection_errors),
            client,
            bucket: config.bucket.trim().to_string(),
            prefix: config.prefix.clone(),
            retry: config.retry.clone(),
        })
    }

    async fn put(&self, key: &str, body: &[u8]) -> Result<(), TransportError> {
        let request = PutObjectRequest {
            bucket: self.bucket.clone(),
            key: key.to_string(),
            body: Some(ByteStream::from(body.to_vec())),
            content_type: Some("application/json".to_string()),
            ..Default::default()
        };

        self.client
            .put_object(request)
            .await
            .map(|_| ())
            .map_err(map_rusoto_error)
    }
}

#[async_trait]
impl Transport for S3Transport {
    fn state(&self) -> &TransportState {
        &self.state
    }

    async fn connect(&self) -> bool {
        let healthy = self.health_check().await;
        self.state.set_connected(healthy);
        healthy
    }

    async fn disconnect(&self) {
        self.state.set_connected(false);
    }

    async fn send(&self, artifact: &Artifact) -> Result<TransportResult, TransportError> {
        let artifact_id = artifact.artifact_id();
        let started = Instant::now();

        let body = match serde_json::to_vec(artifact) {
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

        let key = object_key(&self.prefix, artifact);
        let label = format!("s3://{}/{}", self.bucket, key);
        let outcome = retry_transient(&self.retry, &label, || self.put(&key, &body)).await;

        let result = match outcome {
            Ok(Retried { retries, .. }) => {
                debug!("Uploaded {} to {}", artifact_id, label);
                TransportResult::success(artifact_id)
                    .with_response(json!({ "bucket": self.bucket, "key": key }))
                    .with_retry_count(retries)
                    .with_duration_ms(started.elapsed().as_secs_f64() * 1000.0)
            }
            Err(RetryFailure { error: e, retries }) => {
                if e.is_connection_error() {
                    self.state.record_connection_error();
                }
                warn!("Failed to upload {} to {}: {}", artifact_id, label, e.safe_message());
                TransportResult::failed(artifact_id, e.safe_message()).with_retry_count(retries)
            }
        };

        self.state.record(&result);
        Ok(result)
    }

    async fn health_check(&self) -> bool {
        let request = HeadBucketRequest {
            bucket: self.bucket.clone(),
            ..Default::default()
        };

        match timeout(Duration::from_secs(HEALTH_CHECK_TIMEOUT_SECS), self.client.head_bucket(request)).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                debug!("HeadBucket {} failed: {}", self.bucket, map_rusoto_error(e).safe_message());
                false
            }
            Err(_) => {
                debug!("HeadBucket {} timed out", self.bucket);
                false
            }
        }
    }
}
