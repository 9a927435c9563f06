//! Reporting helpers for relay runs.
//!
//! ## Creating a run summary
//!
//! ```no_run
//! use config_relay::transport::{TransportMetrics, TransportResult};
//! use config_relay::utils::summary::create_run_summary;
//!
//! # fn example() -> anyhow::Result<()> {
//! let results = vec![TransportResult::success("arn:aws:s3:::logs")];
//! let metrics = TransportMetrics::default();
//!
//! let summary = create_run_summary("relay-01", "policy_scanner", &results, &metrics)?;
//! println!("{}", summary);
//! # Ok(())
//! # }
//! ```

/// Run summary generation and reporting
pub mod summary;

/// Artifact input files (JSON array or JSON lines)
pub mod input;
