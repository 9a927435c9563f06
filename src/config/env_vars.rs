use lazy_static::lazy_static;
use regex::{Captures, Regex};

use crate::transport::TransportError;

lazy_static! {
    /// `${VAR}` or `$VAR`
    static ref ENV_VAR_PATTERN: Regex =
        Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}|\$([A-Za-z_][A-Za-z0-9_]*)").unwrap();
}

/// Expand `$VAR` and `${VAR}` references in a configuration value.
///
/// Unset variables are left in place so the problem is visible in errors.
pub fn expand_env_vars(value: &str) -> String {
    if !value.contains('$') {
        return value.to_string();
    }

    ENV_VAR_PATTERN
        .replace_all(value, |caps: &Captures| {
            let name = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map(|m| m.as_str())
                .unwrap_or_default();
            std::env::var(name).unwrap_or_else(|_| caps[0].to_string())
        })
        .into_owned()
}

/// Read a credential from the environment. Missing or empty is an error.
pub fn read_credential(var: &str) -> Result<String, TransportError> {
    match std::env::var(var) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(TransportError::MissingCredential {
            var: var.to_string(),
        }),
    }
}
