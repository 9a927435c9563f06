use std::time::Instant;

use async_trait::async_trait;
use log::debug;

use crate::config::ConsoleConfig;
use crate::constants::CONSOLE_TRANSPORT;
use crate::models::Artifact;
use crate::transport::{Transport, TransportError, TransportResult, TransportState};

/// Prints each artifact to stdout as one JSON document.
pub struct ConsoleTransport {
    state: TransportState,
    pretty: bool,
}

impl ConsoleTransport {
    pub fn new(config: &ConsoleConfig, max_connection_errors: u32) -> Self {
        Self {
            state: TransportState::new(CONSOLE_TRANSPORT, max_connection_errors),
            pretty: config.pretty,
        }
    }

    fn render(&self, artifact: &Artifact) -> serde_json::Result<String> {
        if self.pretty {
            serde_json::to_string_pretty(artifact)
        } else {
            serde_json::to_string(artifact)
        }
    }
}

#[async_trait]
impl Transport for ConsoleTransport {
    fn state(&self) -> &TransportState {
        &self.state
    }

    async fn connect(&self) -> bool {
        self.state.set_connected(true);
        true
    }

    async fn disconnect(&self) {
        self.state.set_connected(false);
    }

    async fn send(&self, artifact: &Artifact) -> Result<TransportResult, TransportError> {
        let artifact_id = artifact.artifact_id();
        let started = Instant::now();

        let result = match self.render(artifact) {
            Ok(document) => {
                println!("{}", document);
                debug!("Printed artifact {}", artifact_id);
                TransportResult::success(artifact_id)
                    .with_duration_ms(started.elapsed().as_secs_f64() * 1000.0)
            }
            Err(e) => TransportResult::failed(artifact_id, format!("Failed to serialize artifact: {}", e)),
        };

        self.state.record(&result);
        Ok(result)
    }

    async fn health_check(&self) -> bool {
        true
    }
}
