use std::path::{Path, PathBuf};
use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde_json::json;
use tokio::fs;
use uuid::Uuid;

use crate::config::FileConfig;
use crate::constants::{FILE_TRANSPORT, MAX_NAME_FRAGMENT_LEN, RANDOM_SUFFIX_LEN};
use crate::models::Artifact;
use crate::transport::{Transport, TransportError, TransportResult, TransportState};

/// Writes one JSON file per artifact under a base directory.
pub struct FileTransport {
    state: TransportState,
    base_dir: PathBuf,
    pretty: bool,
}

/// Lowercase and replace anything that is not ASCII alphanumeric with `_`.
pub fn normalize_component(value: &str) -> String {
    value
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect()
}

/// Last `/` or `:` separated segment of a resource id, filename safe.
pub fn name_fragment(resource_id: &str) -> String {
    let last = resource_id
        .rsplit(|c| c == '/' || c == ':')
        .find(|segment| !segment.is_empty())
        .unwrap_or(resource_id);

    let sanitized: String = last
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' { c } else { '_' })
        .take(MAX_NAME_FRAGMENT_LEN)
        .collect();

    if sanitized.is_empty() {
        "resource".to_string()
    } else {
        sanitized
    }
}

/// `{service}_{resource_type}_{name_fragment}_{timestamp}_{suffix}.json`
pub fn artifact_file_name(artifact: &Artifact, now: DateTime<Utc>) -> String {
    let service = normalize_component(artifact.service().unwrap_or("unknown"));
    let resource_type = normalize_component(artifact.resource_type().unwrap_or("resource"));
    let fragment = name_fragment(&artifact.artifact_id());
    let timestamp = now.format("%Y%m%dT%H%M%S%.3fZ").to_string().replace('.', "");
    let suffix: String = Uuid::new_v4().simple().to_string().chars().take(RANDOM_SUFFIX_LEN).collect();

    format!("{}_{}_{}_{}_{}.json", service, resource_type, fragment, timestamp, suffix)
}

impl FileTransport {
    pub fn new(config: &FileConfig, max_connection_errors: u32) -> Self {
        Self {
            state: TransportState::new(FILE_TRANSPORT, max_connection_errors),
            base_dir: config.base_dir.clone(),
            pretty: config.pretty,
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    async fn write_artifact(&self, artifact: &Artifact) -> Result<PathBuf, TransportError> {
        let content = if self.pretty {
            serde_json::to_vec_pretty(artifact)?
        } else {
            serde_json::to_vec(artifact)?
        };

        fs::create_dir_all(&self.base_dir).await?;
        let path = self.base_dir.join(artifact_file_name(artifact, Utc::now()));
        fs::write(&path, content).await?;
        Ok(path)
    }
}

#[async_trait]
impl Transport for FileTransport {
    fn state(&self) -> &TransportState {
        &self.state
    }

    async fn connect(&self) -> bool {
        match fs::create_dir_all(&self.base_dir).await {
            Ok(()) => {
                self.state.set_connected(true);
                true
            }
            Err(e) => {
                warn!("Failed to create output directory {}: {}", self.base_dir.display(), e);
                self.state.set_connected(false);
                false
            }
        }
    }

    async fn disconnect(&self) {
        self.state.set_connected(false);
    }

    async fn send(&self, artifact: &Artifact) -> Result<TransportResult, TransportError> {
        let artifact_id = artifact.artifact_id();
        let started = Instant::now();

        let result = match self.write_artifact(artifact).await {
            Ok(path) => {
                debug!("Wrote {} to {}", artifact_id, path.display());
                TransportResult::success(artifact_id)
                    .with_response(json!({ "path": path.to_string_lossy() }))
                    .with_duration_ms(started.elapsed().as_secs_f64() * 1000.0)
            }
            Err(e) => {
                warn!("Failed to write {}: {}", artifact_id, e);
                TransportResult::failed(artifact_id, e.safe_message())
            }
        };

        self.state.record(&result);
        Ok(result)
    }

    async fn health_check(&self) -> bool {
        fs::metadata(&self.base_dir)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use crate::test_utils::aws_artifact;
    use tempfile::TempDir;

    fn transport_in(dir: &Path) -> FileTransport {
        let config = FileConfig {
            base_dir: dir.to_path_buf(),
            pretty: true,
        };
        FileTransport::new(&config, 5)
    }

    #[test]
    fn test_name_fragment() {
        assert_eq!(name_fragment("arn:aws:s3:::my-bucket"), "my-bucket");
        assert_eq!(name_fragment("projects/p1/instances/vm 1"), "vm_1");
        assert_eq!(name_fragment("trailing/"), "trailing");
        assert_eq!(name_fragment(&"x".repeat(100)).len(), 64);
    }

    #[test]
    fn test_file_name_layout() {
        let artifact = aws_artifact("arn:aws:s3:::my-bucket", "111111111111", "us-east-1");
        let now = Utc.with_ymd_and_hms(2024, 3, 5, 7, 8, 9).unwrap();
        let name = artifact_file_name(&artifact, now);

        assert!(name.starts_with("s3_aws__s3__bucket_my-bucket_20240305T070809000Z_"));
        assert!(name.ends_with(".json"));
        let suffix = name.trim_end_matches(".json").rsplit('_').next().unwrap();
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[tokio::test]
    async fn test_connect_creates_directory() {
        let temp_dir = TempDir::new().unwrap();
        let transport = transport_in(&temp_dir.path().join("nested/out"));

        assert!(!transport.health_check().await);
        assert!(transport.connect().await);
        assert!(transport.is_connected());
        assert!(transport.health_check().await);
    }

    #[tokio::test]
    async fn test_repeated_sends_write_distinct_identical_files() {
        let temp_dir = TempDir::new().unwrap();
        let transport = transport_in(temp_dir.path());
        let artifact = aws_artifact("arn:aws:s3:::my-bucket", "111111111111", "us-east-1");

        let first = transport.send(&artifact).await.unwrap();
        let second = transport.send(&artifact).await.unwrap();
        assert!(first.is_success() && second.is_success());

        let mut paths: Vec<PathBuf> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect();
        paths.sort();
        assert_eq!(paths.len(), 2);
        assert_ne!(paths[0], paths[1]);

        let a = std::fs::read(&paths[0]).unwrap();
        let b = std::fs::read(&paths[1]).unwrap();
        assert_eq!(a, b);

        let parsed: Artifact = serde_json::from_slice(&a).unwrap();
        assert_eq!(parsed, artifact);
        assert_eq!(transport.get_metrics().total_success, 2);
    }

    #[tokio::test]
    async fn test_unwritable_directory_is_a_failed_result() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"x").unwrap();
        let transport = transport_in(&blocker);

        let result = transport
            .send(&aws_artifact("vol-1", "111111111111", "us-east-1"))
            .await
            .unwrap();

        assert!(!result.is_success());
        assert!(result.error.is_some());
        assert_eq!(transport.get_metrics().total_failed, 1);
    }
}
