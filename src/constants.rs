//! Global constants for the config-relay application.
//!
//! This module centralizes all hardcoded values to improve maintainability
//! and make configuration changes easier.

// Circuit breaker constants
/// Consecutive connection errors before a transport flags itself disconnected
pub const DEFAULT_MAX_CONNECTION_ERRORS: u32 = 5;

// Concurrency constants
/// Default in-flight limit for bounded-parallel batch sends
pub const DEFAULT_BATCH_MAX_CONCURRENT: usize = 10;

/// Default in-flight limit for the policy scanner transport
pub const DEFAULT_SCANNER_MAX_CONCURRENT: usize = 5;

// Timeout and retry constants
/// Maximum attempts for a network call (first try included)
pub const MAX_DELIVERY_ATTEMPTS: usize = 3;

/// Delay before the first retry in seconds
pub const RETRY_INITIAL_DELAY_SECS: u64 = 2;

/// Backoff multiplier between retries
pub const RETRY_BACKOFF_MULTIPLIER: u32 = 2;

/// Maximum delay between retries in seconds
pub const RETRY_MAX_DELAY_SECS: u64 = 10;

/// Default request timeout for HTTP transports in seconds
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Timeout used by health-check probes in seconds
pub const HEALTH_CHECK_TIMEOUT_SECS: u64 = 5;

// Artifact constants
/// Identifier used when an artifact carries no resource id
pub const UNKNOWN_RESOURCE_ID: &str = "unknown";

/// Maximum length of the resource-name fragment in sink filenames
pub const MAX_NAME_FRAGMENT_LEN: usize = 64;

/// Length of the random suffix appended to sink filenames
pub const RANDOM_SUFFIX_LEN: usize = 8;

// Transport names
pub const CONSOLE_TRANSPORT: &str = "console";
pub const FILE_TRANSPORT: &str = "file";
pub const HTTP_TRANSPORT: &str = "http";
pub const S3_TRANSPORT: &str = "s3";
pub const POLICY_SCANNER_TRANSPORT: &str = "policy_scanner";

// Remote scanner
/// Path template for policy scans, `{policy}` is replaced by the resolved name
pub const SCANNER_SCAN_PATH: &str = "/api/v1/policies/{policy}/scan";

/// Path probed by the scanner health check
pub const SCANNER_HEALTH_PATH: &str = "/api/v1/health";

/// Default environment variable holding the scanner token
pub const DEFAULT_SCANNER_TOKEN_ENV: &str = "POLICY_SCANNER_TOKEN";

// Default file names
pub const DEFAULT_CONFIG_NAME: &str = "relay_config.yaml";
pub const DEFAULT_OUTPUT_DIR: &str = "relay-output";
