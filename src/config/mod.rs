// Re-export all items from the submodules
mod env_vars;
mod transport_config;

// Re-export transport configuration
pub use transport_config::{
    ConsoleConfig,
    FileConfig,
    HttpConfig,
    S3Config,
    ScannerConfig,
    TransportConfig,
    load_or_default,
};

// Re-export environment variable helpers
pub use env_vars::{
    expand_env_vars,
    read_credential,
};
