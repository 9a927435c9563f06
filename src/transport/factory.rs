use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, info};

use crate::config::TransportConfig;
use crate::constants::{
    CONSOLE_TRANSPORT, FILE_TRANSPORT, HTTP_TRANSPORT, POLICY_SCANNER_TRANSPORT, S3_TRANSPORT,
};
use crate::transport::console::ConsoleTransport;
use crate::transport::file::FileTransport;
use crate::transport::http::HttpTransport;
use crate::transport::s3::S3Transport;
use crate::transport::scanner::PolicyScannerTransport;
use crate::transport::{Transport, TransportError};

/// Builds a transport from the relay configuration.
pub type TransportConstructor =
    Arc<dyn Fn(&TransportConfig) -> Result<Arc<dyn Transport>, TransportError> + Send + Sync>;

type BuiltinConstructor = fn(&TransportConfig) -> Result<Arc<dyn Transport>, TransportError>;

/// Registry of transport constructors keyed by lowercase name.
///
/// Constructed explicitly and passed to whoever needs it; there is no
/// process-wide instance.
#[derive(Clone, Default)]
pub struct TransportFactory {
    constructors: HashMap<String, TransportConstructor>,
}

fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

fn missing_section(transport: &str) -> TransportError {
    TransportError::Configuration(format!("no '{}' section in the transport configuration", transport))
}

fn build_console(config: &TransportConfig) -> Result<Arc<dyn Transport>, TransportError> {
    let transport = ConsoleTransport::new(&config.console, config.max_connection_errors);
    Ok(Arc::new(transport))
}

fn build_file(config: &TransportConfig) -> Result<Arc<dyn Transport>, TransportError> {
    let section = config.file.clone().unwrap_or_default();
    Ok(Arc::new(FileTransport::new(&section, config.max_connection_errors)))
}

fn build_http(config: &TransportConfig) -> Result<Arc<dyn Transport>, TransportError> {
    let section = config.http.as_ref().ok_or_else(|| missing_section(HTTP_TRANSPORT))?;
    Ok(Arc::new(HttpTransport::new(section, config.max_connection_errors)?))
}

fn build_s3(config: &TransportConfig) -> Result<Arc<dyn Transport>, TransportError> {
    let section = config.s3.as_ref().ok_or_else(|| missing_section(S3_TRANSPORT))?;
    Ok(Arc::new(S3Transport::new(section, config.max_connection_errors)?))
}

fn build_policy_scanner(config: &TransportConfig) -> Result<Arc<dyn Transport>, TransportError> {
    let section = config
        .policy_scanner
        .as_ref()
        .ok_or_else(|| missing_section(POLICY_SCANNER_TRANSPORT))?;
    Ok(Arc::new(PolicyScannerTransport::new(section, config.max_connection_errors)?))
}

impl TransportFactory {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with `console`, `file`, `http`, `s3` and `policy_scanner`.
    pub fn with_builtin_transports() -> Self {
        let mut factory = Self::new();
        let builtins: [(&str, BuiltinConstructor); 5] = [
            (CONSOLE_TRANSPORT, build_console),
            (FILE_TRANSPORT, build_file),
            (HTTP_TRANSPORT, build_http),
            (S3_TRANSPORT, build_s3),
            (POLICY_SCANNER_TRANSPORT, build_policy_scanner),
        ];

        for (name, constructor) in builtins {
            let registered = factory.register(name, constructor);
            debug_assert!(registered.is_ok(), "invalid built-in transport name '{}'", name);
        }
        factory
    }

    /// Register a constructor under `name`, replacing any previous entry.
    ///
    /// The name is trimmed and lowercased; it must be non-empty and use only
    /// `a-z`, `0-9`, `_` and `-`.
    pub fn register<F>(&mut self, name: &str, constructor: F) -> Result<(), TransportError>
    where
        F: Fn(&TransportConfig) -> Result<Arc<dyn Transport>, TransportError> + Send + Sync + 'static,
    {
        self.register_constructor(name, Arc::new(constructor))
    }

    fn register_constructor(&mut self, name: &str, constructor: TransportConstructor) -> Result<(), TransportError> {
        let key = normalize_name(name);

        if key.is_empty() {
            return Err(TransportError::InvalidTransportImplementation {
                name: name.to_string(),
                reason: "transport name must not be blank".to_string(),
            });
        }
        if !key
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
        {
            return Err(TransportError::InvalidTransportImplementation {
                name: name.to_string(),
                reason: "transport names may only contain a-z, 0-9, '_' and '-'".to_string(),
            });
        }

        if self.constructors.insert(key.clone(), constructor).is_some() {
            info!("Replaced transport registration '{}'", key);
        } else {
            debug!("Registered transport '{}'", key);
        }
        Ok(())
    }

    /// Build the transport registered under `name` (case-insensitive).
    pub fn create(&self, name: &str, config: &TransportConfig) -> Result<Arc<dyn Transport>, TransportError> {
        let key = normalize_name(name);
        match self.constructors.get(&key) {
            Some(constructor) => {
                debug!("Creating transport '{}'", key);
                constructor(config)
            }
            None => Err(TransportError::UnknownTransportType {
                requested: name.to_string(),
                available: self.available(),
            }),
        }
    }

    /// Registered names, sorted.
    pub fn available(&self) -> Vec<String> {
        let mut names: Vec<String> = self.constructors.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.constructors.contains_key(&normalize_name(name))
    }
}
