use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard};

use log::{debug, warn};

use crate::constants::DEFAULT_MAX_CONNECTION_ERRORS;
use crate::transport::metrics::TransportMetrics;
use crate::transport::result::TransportResult;

/// Bookkeeping shared by every transport: metrics plus the connection-error
/// circuit breaker.
///
/// Metrics sit behind a mutex so concurrent sends on parallel worker threads
/// apply their updates one at a time. The breaker is advisory: it flips
/// `is_connected` but never blocks a send.
#[derive(Debug)]
pub struct TransportState {
    name: String,
    metrics: Mutex<TransportMetrics>,
    connected: AtomicBool,
    connection_errors: AtomicU32,
    max_connection_errors: u32,
}

impl TransportState {
    pub fn new(name: &str, max_connection_errors: u32) -> Self {
        Self {
            name: name.to_string(),
            metrics: Mutex::new(TransportMetrics::default()),
            connected: AtomicBool::new(false),
            connection_errors: AtomicU32::new(0),
            max_connection_errors: max_connection_errors.max(1),
        }
    }

    pub fn with_defaults(name: &str) -> Self {
        Self::new(name, DEFAULT_MAX_CONNECTION_ERRORS)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn lock_metrics(&self) -> MutexGuard<'_, TransportMetrics> {
        // A panic while holding the lock cannot leave the counters half-written
        self.metrics.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn metrics(&self) -> TransportMetrics {
        self.lock_metrics().clone()
    }

    pub fn reset_metrics(&self) {
        *self.lock_metrics() = TransportMetrics::default();
    }

    /// Record a completed send and update the breaker accordingly.
    pub fn record(&self, result: &TransportResult) {
        self.lock_metrics().record(result);
        if result.is_success() {
            self.reset_connection_errors();
        }
    }

    /// Record a send that ended in a raised error.
    pub fn record_error(&self, error: &str, retry_count: u32) {
        self.lock_metrics().record_failure(Some(error), retry_count);
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    pub fn connection_errors(&self) -> u32 {
        self.connection_errors.load(Ordering::SeqCst)
    }

    pub fn max_connection_errors(&self) -> u32 {
        self.max_connection_errors
    }

    /// Count a connection failure. Returns true when the breaker trips.
    pub fn record_connection_error(&self) -> bool {
        let errors = self.connection_errors.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("{}: connection error {}/{}", self.name, errors, self.max_connection_errors);

        if errors >= self.max_connection_errors {
            if self.connected.swap(false, Ordering::SeqCst) {
                warn!(
                    "{}: {} consecutive connection errors, marking transport disconnected",
                    self.name, errors
                );
            }
            return true;
        }
        false
    }

    /// A successful operation clears the error streak.
    pub fn reset_connection_errors(&self) {
        self.connection_errors.store(0, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_breaker_trips_at_threshold() {
        let state = TransportState::new("test", 3);
        state.set_connected(true);

        assert!(!state.record_connection_error());
        assert!(!state.record_connection_error());
        assert!(state.is_connected());
        assert!(state.record_connection_error());
        assert!(!state.is_connected());
        assert_eq!(state.connection_errors(), 3);

        state.reset_connection_errors();
        assert_eq!(state.connection_errors(), 0);
    }

    #[test]
    fn test_default_threshold() {
        let state = TransportState::with_defaults("test");
        state.set_connected(true);
        for _ in 0..4 {
            state.record_connection_error();
        }
        assert!(state.is_connected());
        state.record_connection_error();
        assert!(!state.is_connected());
    }

    #[test]
    fn test_success_resets_error_streak() {
        let state = TransportState::new("test", 5);
        state.record_connection_error();
        state.record_connection_error();
        state.record(&TransportResult::success("a"));
        assert_eq!(state.connection_errors(), 0);
        assert_eq!(state.metrics().total_success, 1);
    }

    #[test]
    fn test_record_error_counts_failure() {
        let state = TransportState::with_defaults("test");
        state.record_error("HTTP 500", 0);
        let metrics = state.metrics();
        assert_eq!(metrics.total_sent, 1);
        assert_eq!(metrics.total_failed, 1);
        assert_eq!(metrics.last_error.as_deref(), Some("HTTP 500"));

        state.reset_metrics();
        assert_eq!(state.metrics(), TransportMetrics::default());
    }

    #[test]
    fn test_concurrent_records() {
        use std::sync::Arc;
        use std::thread;

        let state = Arc::new(TransportState::with_defaults("test"));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let state = Arc::clone(&state);
                thread::spawn(move || {
                    for _ in 0..100 {
                        if i % 2 == 0 {
                            state.record(&TransportResult::success("a").with_duration_ms(1.0));
                        } else {
                            state.record(&TransportResult::failed("a", "err"));
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let metrics = state.metrics();
        assert_eq!(metrics.total_sent, 800);
        assert_eq!(metrics.total_success, 400);
        assert_eq!(metrics.total_failed, 400);
    }
}
