use thiserror::Error;

use crate::security::scrub_credentials;

/// Errors raised by transports, the factory and the retry wrapper.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Invalid or incomplete transport configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A required credential environment variable is not set
    #[error("Missing credential: environment variable {var} is not set")]
    MissingCredential { var: String },

    /// Registration rejected by the factory
    #[error("Invalid transport implementation '{name}': {reason}")]
    InvalidTransportImplementation { name: String, reason: String },

    /// The factory has no transport registered under the requested name
    #[error("Unknown transport type '{requested}' (available: {})", available.join(", "))]
    UnknownTransportType {
        requested: String,
        available: Vec<String>,
    },

    /// The request did not complete in time
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Low-level network or connection failure
    #[error("Connection error: {0}")]
    Connection(String),

    /// The remote peer answered with an error status
    #[error("Delivery failed with HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// Any other terminal delivery fault
    #[error("Delivery error: {0}")]
    Delivery(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl TransportError {
    /// Timeouts and connection failures are worth retrying; everything else is terminal.
    pub fn is_transient(&self) -> bool {
        matches!(self, TransportError::Timeout(_) | TransportError::Connection(_))
    }

    /// Errors that count against the circuit breaker.
    pub fn is_connection_error(&self) -> bool {
        self.is_transient()
    }

    /// Message safe to log or store: credentials are redacted.
    pub fn safe_message(&self) -> String {
        scrub_credentials(&self.to_string())
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        let message = scrub_credentials(&e.to_string());
        if e.is_timeout() {
            TransportError::Timeout(message)
        } else if e.is_connect() || e.is_request() || e.is_body() || e.is_decode() {
            // includes bodies cut short mid-read
            TransportError::Connection(message)
        } else if let Some(status) = e.status() {
            TransportError::HttpStatus {
                status: status.as_u16(),
                body: message,
            }
        } else {
            TransportError::Delivery(message)
        }
    }
}
