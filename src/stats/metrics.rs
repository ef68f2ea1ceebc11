//! Counters for the relay loop

use std::time::{Duration, Instant};

/// Relay-wide statistics
#[derive(Debug, Clone)]
pub struct RelayStats {
    /// When the relay started
    pub started_at: Instant,
    /// Registrations that produced a client record
    pub registrations: u64,
    /// Registrations refused by policy (duplicate, invalid id, limit)
    pub rejected_registrations: u64,
    /// Registrations abandoned on a channel or marker failure
    pub failed_registrations: u64,
    /// Clients that reached end-of-stream
    pub disconnects: u64,
    /// Chunks read from clients and relayed
    pub messages_relayed: u64,
    /// Bytes read from clients and relayed
    pub bytes_relayed: u64,
    /// Successful per-recipient writes
    pub deliveries: u64,
    /// Failed per-recipient writes
    pub delivery_failures: u64,
}

impl RelayStats {
    /// Create zeroed stats starting now
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            registrations: 0,
            rejected_registrations: 0,
            failed_registrations: 0,
            disconnects: 0,
            messages_relayed: 0,
            bytes_relayed: 0,
            deliveries: 0,
            delivery_failures: 0,
        }
    }

    /// Time since the relay started
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Account one relayed chunk
    pub fn record_relay(&mut self, bytes: usize, delivered: usize, failed: usize) {
        self.messages_relayed += 1;
        self.bytes_relayed += bytes as u64;
        self.deliveries += delivered as u64;
        self.delivery_failures += failed as u64;
    }

    /// Fraction of per-recipient writes that failed
    pub fn delivery_failure_rate(&self) -> f64 {
        let attempts = self.deliveries + self.delivery_failures;
        if attempts > 0 {
            self.delivery_failures as f64 / attempts as f64
        } else {
            0.0
        }
    }

    /// Emit the counters as one log line
    pub fn log(&self) {
        tracing::info!(
            uptime_secs = self.uptime().as_secs(),
            registrations = self.registrations,
            rejected = self.rejected_registrations,
            failed = self.failed_registrations,
            disconnects = self.disconnects,
            messages = self.messages_relayed,
            bytes = self.bytes_relayed,
            deliveries = self.deliveries,
            delivery_failures = self.delivery_failures,
            "Relay stats"
        );
    }
}

impl Default for RelayStats {
    fn default() -> Self {
        Self::new()
    }
}
