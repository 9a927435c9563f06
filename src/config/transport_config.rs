use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::config::env_vars::expand_env_vars;
use crate::constants::{
    DEFAULT_MAX_CONNECTION_ERRORS, DEFAULT_OUTPUT_DIR, DEFAULT_REQUEST_TIMEOUT_SECS,
    DEFAULT_SCANNER_MAX_CONCURRENT, DEFAULT_SCANNER_TOKEN_ENV, POLICY_SCANNER_TRANSPORT,
};
use crate::policy::PolicyConfig;
use crate::transport::{BatchStrategy, RetryPolicy};

fn default_true() -> bool {
    true
}

fn default_max_connection_errors() -> u32 {
    DEFAULT_MAX_CONNECTION_ERRORS
}

fn default_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_scanner_max_concurrent() -> usize {
    DEFAULT_SCANNER_MAX_CONCURRENT
}

fn default_scanner_token_env() -> String {
    DEFAULT_SCANNER_TOKEN_ENV.to_string()
}

fn default_transport() -> String {
    POLICY_SCANNER_TRANSPORT.to_string()
}

/// Console sink settings
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ConsoleConfig {
    #[serde(default = "default_true")]
    pub pretty: bool,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self { pretty: true }
    }
}

/// Filesystem sink settings
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FileConfig {
    pub base_dir: PathBuf,
    #[serde(default = "default_true")]
    pub pretty: bool,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            pretty: true,
        }
    }
}

/// Generic HTTP (webhook) transport settings
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct HttpConfig {
    pub endpoint: String,
    /// Environment variable holding a bearer token, if the endpoint needs one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_env_var: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub retry: RetryPolicy,
}

/// S3 sink settings
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct S3Config {
    pub bucket: String,
    #[serde(default)]
    pub prefix: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    #[serde(default)]
    pub retry: RetryPolicy,
}

/// Policy scanner submission settings
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ScannerConfig {
    /// Scanner host, with or without scheme (`https://` is assumed)
    pub host: String,
    #[serde(default = "default_scanner_token_env")]
    pub token_env_var: String,
    #[serde(default = "default_scanner_max_concurrent")]
    pub max_concurrent: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub retry: RetryPolicy,
    #[serde(default)]
    pub policies: PolicyConfig,
}

/// Complete relay configuration: shared settings plus one optional
/// section per transport.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TransportConfig {
    /// Transport selected when the CLI is not told otherwise
    #[serde(default = "default_transport")]
    pub transport: String,
    #[serde(default = "default_max_connection_errors")]
    pub max_connection_errors: u32,
    #[serde(default)]
    pub batch: BatchStrategy,
    #[serde(default)]
    pub console: ConsoleConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<FileConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http: Option<HttpConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s3: Option<S3Config>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_scanner: Option<ScannerConfig>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            transport: default_transport(),
            max_connection_errors: DEFAULT_MAX_CONNECTION_ERRORS,
            batch: BatchStrategy::default(),
            console: ConsoleConfig::default(),
            file: None,
            http: None,
            s3: None,
            policy_scanner: None,
        }
    }
}

impl TransportConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;

        let mut config = Self::from_yaml_str(&content)
            .context(format!("Failed to parse YAML config: {}", path.display()))?;
        config.process_environment_variables();

        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: TransportConfig = serde_yaml::from_str(content)?;
        Ok(config)
    }

    /// Save configuration to a YAML file
    pub fn save_to_yaml_file(&self, path: &Path) -> Result<()> {
        let yaml = serde_yaml::to_string(self).context("Failed to serialize config to YAML")?;

        fs::write(path, yaml).context(format!("Failed to write config to {}", path.display()))?;

        info!("Saved configuration to {}", path.display());
        Ok(())
    }

    /// Expand `$VAR` / `${VAR}` in endpoints, hosts and paths.
    pub fn process_environment_variables(&mut self) {
        if let Some(file) = &mut self.file {
            let expanded = expand_env_vars(&file.base_dir.to_string_lossy());
            file.base_dir = PathBuf::from(expanded);
        }
        if let Some(http) = &mut self.http {
            http.endpoint = expand_env_vars(&http.endpoint);
            for value in http.headers.values_mut() {
                *value = expand_env_vars(value);
            }
        }
        if let Some(s3) = &mut self.s3 {
            s3.bucket = expand_env_vars(&s3.bucket);
            s3.prefix = expand_env_vars(&s3.prefix);
        }
        if let Some(scanner) = &mut self.policy_scanner {
            scanner.host = expand_env_vars(&scanner.host);
        }
    }

    /// A documented starting point written by `init-config`.
    pub fn example() -> Self {
        let policies: PolicyConfig = serde_yaml::from_str(EXAMPLE_POLICIES)
            .unwrap_or_default();

        Self {
            file: Some(FileConfig::default()),
            policy_scanner: Some(ScannerConfig {
                host: "scanner.example.com".to_string(),
                token_env_var: default_scanner_token_env(),
                max_concurrent: DEFAULT_SCANNER_MAX_CONCURRENT,
                timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
                retry: RetryPolicy::default(),
                policies,
            }),
            ..Default::default()
        }
    }

    /// Create an example configuration YAML file
    pub fn create_example_config_file(path: &Path) -> Result<()> {
        Self::example().save_to_yaml_file(path)
    }
}

const EXAMPLE_POLICIES: &str = r#"
default_policy: cloud-baseline
labels:
  source: config-relay
aws:
  policy: aws-baseline
  accounts:
    - id: "123456789012"
      policy: aws-production
      regions:
        - id: us-west-2
          policy: aws-production-us-west-2
gcp:
  projects:
    - my-project
azure:
  subscriptions:
    - id: 00000000-0000-0000-0000-000000000000
      locations:
        - westeurope
"#;

/// Load the configuration from `path`, or fall back to defaults.
pub fn load_or_default(config_path: Option<&Path>) -> Result<TransportConfig> {
    match config_path {
        Some(path) => TransportConfig::from_yaml_file(path),
        None => {
            info!("No config path provided, using default configuration");
            Ok(TransportConfig::default())
        }
    }
}
