//! # config-relay
//!
//! Delivery of extracted cloud-configuration artifacts to pluggable
//! destinations, with a policy hierarchy that decides which remote policy
//! evaluates each artifact.
//!
//! ## Overview
//!
//! Extractors produce one JSON record per cloud resource (an S3 bucket, a
//! GCE instance, an Azure storage account). config-relay pushes those
//! records through a [`transport::Transport`]: stdout, a local directory,
//! an HTTP webhook, an S3 bucket, or a remote policy scanner.
//!
//! ## Features
//!
//! - **Pluggable transports**: one async contract, a registry mapping names to constructors
//! - **Batch delivery**: sequential or bounded-parallel, results always in input order
//! - **Bounded retries**: exponential backoff for timeouts and connection failures only
//! - **Circuit breaker**: per-transport connection-error counter with advisory disconnect
//! - **Policy hierarchy**: region > account/project/subscription > cloud > default
//! - **Metrics**: per-transport counters, success rate and running mean latency
//!
//! ## Usage
//!
//! ### Sending a batch
//!
//! ```no_run
//! use config_relay::config::TransportConfig;
//! use config_relay::models::Artifact;
//! use config_relay::transport::TransportFactory;
//! use serde_json::json;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = TransportConfig::from_yaml_file("relay_config.yaml".as_ref())?;
//! let factory = TransportFactory::with_builtin_transports();
//! let transport = factory.create("policy_scanner", &config)?;
//!
//! let artifacts = vec![Artifact::from_value(json!({
//!     "resource_id": "arn:aws:s3:::logs",
//!     "cloud_provider": "aws",
//!     "metadata": {"account_id": "123456789012", "region": "us-west-2"}
//! }))?];
//!
//! transport.connect().await;
//! let results = transport.send_batch(&artifacts).await;
//! println!("{} delivered", results.iter().filter(|r| r.is_success()).count());
//! # Ok(())
//! # }
//! ```
//!
//! ### Resolving a policy
//!
//! ```
//! use config_relay::models::Artifact;
//! use config_relay::policy::{PolicyConfig, PolicyResolver};
//! use serde_json::json;
//!
//! let config: PolicyConfig = serde_yaml::from_str(r#"
//! default_policy: baseline
//! aws:
//!   accounts:
//!     - id: "123456789012"
//!       policy: production
//! "#).unwrap();
//!
//! let resolver = PolicyResolver::new(&config);
//! let artifact = Artifact::from_value(json!({
//!     "cloud_provider": "aws",
//!     "metadata": {"account_id": "123456789012", "region": "eu-west-1"}
//! })).unwrap();
//!
//! assert_eq!(resolver.resolve(&artifact), "production");
//! ```
//!
//! ## Module Organization
//!
//! - [`cli`]: Command-line interface definitions and argument parsing
//! - [`models`]: The artifact record and cloud provider enum
//! - [`transport`]: Transport contract, concrete transports, batching, retry and the registry
//! - [`policy`]: Policy and label resolution
//! - [`config`]: YAML configuration and environment handling
//! - [`security`]: Credential scrubbing for logged and stored errors
//! - [`utils`]: Artifact input files and run summaries
//! - [`constants`]: Application-wide constants

/// Command-line interface definitions and argument parsing
pub mod cli;

/// Core data models
pub mod models;

/// Delivery transports and their shared machinery
pub mod transport;

/// Policy hierarchy and label resolution
pub mod policy;

/// Configuration management
pub mod config;

/// Input files and run summaries
pub mod utils;

/// Application constants and configuration values
pub mod constants;

/// Security utilities for credential protection
pub mod security;

/// Test utilities and helpers
#[cfg(test)]
pub mod test_utils;
