//! In-memory transport for testing
//!
//! Serves canned per-host responses without spawning processes, and records
//! how many executions were in flight at once.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use crate::core::transport::{ExecContext, RemoteOutput, Transport, TransportError};

#[derive(Debug, Default)]
pub struct MockTransport {
    responses: HashMap<String, RemoteOutput>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Successful response for `host`
    pub fn with_output(mut self, host: &str, stdout: &str) -> Self {
        self.responses.insert(
            host.to_string(),
            RemoteOutput {
                stdout: stdout.to_string(),
                stderr: String::new(),
                exit_code: Some(0),
            },
        );
        self
    }

    /// Error-stream response for `host`
    pub fn with_error(mut self, host: &str, stderr: &str) -> Self {
        self.responses.insert(
            host.to_string(),
            RemoteOutput {
                stdout: String::new(),
                stderr: stderr.to_string(),
                exit_code: Some(255),
            },
        );
        self
    }

    /// Sleep this long inside every execution
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl Transport for MockTransport {
    fn execute(&self, host: &str, _ctx: &ExecContext<'_>) -> Result<RemoteOutput, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            thread::sleep(delay);
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        // Unknown hosts answer with an empty account table
        Ok(self.responses.get(host).cloned().unwrap_or(RemoteOutput {
            stdout: String::new(),
            stderr: String::new(),
            exit_code: Some(0),
        }))
    }
}
