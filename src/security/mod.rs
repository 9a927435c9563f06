//! Security utilities.
//!
//! Delivery errors may carry tokens echoed back by remote services; this
//! module redacts them before they reach logs, metrics or summaries.

pub mod credential_scrubber;

pub use credential_scrubber::{scrub_credentials, scrub_secret};
