//! Credential scrubbing for delivery errors.
//!
//! Transport errors end up in logs, in `TransportMetrics::last_error` and in
//! run summaries. Remote services sometimes echo request headers or URLs
//! back in error bodies, so every message is scrubbed before it is stored.

use lazy_static::lazy_static;
use regex::Regex;

const REDACTED: &str = "<REDACTED>";

lazy_static! {
    /// Patterns for credentials that can show up in delivery errors
    static ref CREDENTIAL_PATTERNS: Vec<(Regex, &'static str)> = vec![
        // Authorization headers and bearer tokens
        (Regex::new(r"(?i)(bearer|authorization)\s*[:=]\s*(bearer\s+)?([A-Za-z0-9\-._~+/]+=*)").unwrap(),
         "$1=<REDACTED_TOKEN>"),

        // Bare bearer credentials echoed in error bodies
        (Regex::new(r"(?i)\b(bearer)\s+([A-Za-z0-9\-._~+/]{8,}=*)").unwrap(),
         "$1 <REDACTED_TOKEN>"),

        // Tokens and API keys in key=value form or query strings
        (Regex::new(r"(?i)\b(token|access[_-]?token|auth[_-]?token|api[_-]?key|apikey)\s*[:=]\s*([A-Za-z0-9\-._~+/]{8,})").unwrap(),
         "$1=<REDACTED_TOKEN>"),

        // AWS Access Key ID
        (Regex::new(r"\b(AKIA|ASIA)[A-Z0-9]{16}\b").unwrap(),
         "<REDACTED_AWS_KEY>"),

        // AWS Secret Access Key
        (Regex::new(r"(?i)(aws[_-]?secret[_-]?access[_-]?key|secret[_-]?access[_-]?key)\s*[:=]\s*([A-Za-z0-9/+=]{32,})").unwrap(),
         "$1=<REDACTED_AWS_SECRET>"),

        // Basic auth in URLs
        (Regex::new(r"(https?://)([^:/@\s]+):([^@\s]+)@").unwrap(),
         "$1<REDACTED_USER>:<REDACTED_PASS>@"),
    ];
}

/// Scrub credentials from a string.
///
/// # Example
///
/// ```
/// use config_relay::security::scrub_credentials;
///
/// let scrubbed = scrub_credentials("401 for Authorization: Bearer eyJhbGciOi");
/// assert_eq!(scrubbed, "401 for Authorization=<REDACTED_TOKEN>");
/// ```
pub fn scrub_credentials(input: &str) -> String {
    let mut result = input.to_string();

    for (pattern, replacement) in CREDENTIAL_PATTERNS.iter() {
        result = pattern.replace_all(&result, *replacement).to_string();
    }

    result
}

/// Remove a specific known secret (e.g. the configured token) wherever it
/// appears, then apply the generic patterns.
pub fn scrub_secret(input: &str, secret: &str) -> String {
    if secret.len() < 4 {
        return scrub_credentials(input);
    }
    scrub_credentials(&input.replace(secret, REDACTED))
}
