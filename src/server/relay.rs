//! Relay server
//!
//! Owns the registry and runs the single-threaded loop:
//!
//! ```text
//!   loop {
//!       ready = wait(rendezvous + active clients, poll_timeout)
//!       if ready.rendezvous  -> register one client
//!       for index in ready.clients (ascending) -> dispatch
//!   }
//! ```
//!
//! Registry mutation only happens between waits, so nothing is shared and
//! nothing is locked.

use std::future::Future;
use std::time::Instant;

use crate::channel::{EndpointFactory, FifoFactory, ReadReady};
use crate::error::Result;
use crate::protocol::constants::RENDEZVOUS_READ_SIZE;
use crate::registry::ClientRegistry;
use crate::stats::RelayStats;

use super::config::RelayConfig;
use super::dispatch::{self, DispatchOutcome};
use super::multiplexer::{self, ReadySet};
use super::registration;

/// Broadcast relay
pub struct RelayServer<F: EndpointFactory> {
    config: RelayConfig,
    factory: F,
    registry: ClientRegistry<F::Endpoint>,
    stats: RelayStats,
    last_stats_log: Instant,
}

impl RelayServer<FifoFactory> {
    /// Create a relay over named FIFOs in `config.base_dir`
    pub fn new(config: RelayConfig) -> Self {
        let factory = FifoFactory::from_config(&config);
        Self::with_factory(config, factory)
    }
}

impl<F: EndpointFactory> RelayServer<F> {
    /// Create a relay over a custom channel factory
    pub fn with_factory(config: RelayConfig, factory: F) -> Self {
        Self {
            config,
            factory,
            registry: ClientRegistry::new(),
            stats: RelayStats::new(),
            last_stats_log: Instant::now(),
        }
    }

    /// Relay configuration
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Channel factory
    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Client registry
    pub fn registry(&self) -> &ClientRegistry<F::Endpoint> {
        &self.registry
    }

    /// Relay statistics
    pub fn stats(&self) -> &RelayStats {
        &self.stats
    }

    /// Create and open the rendezvous channel
    ///
    /// This is the only fatal failure: without it no client can register.
    pub fn open_rendezvous(&self) -> Result<F::Rendezvous> {
        Ok(self.factory.open_rendezvous()?)
    }

    /// Run the relay
    ///
    /// Only returns if the rendezvous channel cannot be opened.
    pub async fn run(&mut self) -> Result<()> {
        let rendezvous = self.open_rendezvous()?;
        tracing::info!(
            rendezvous = %self.config.rendezvous_path().display(),
            "Relay started. Waiting for clients..."
        );

        self.serve(&rendezvous).await;
        Ok(())
    }

    /// Run the relay until `shutdown` completes
    ///
    /// The rendezvous channel is dropped (and, for FIFOs, removed) on return.
    pub async fn run_until<S>(&mut self, shutdown: S) -> Result<()>
    where
        S: Future<Output = ()>,
    {
        let rendezvous = self.open_rendezvous()?;
        tracing::info!(
            rendezvous = %self.config.rendezvous_path().display(),
            "Relay started. Waiting for clients..."
        );

        tokio::select! {
            _ = shutdown => {
                tracing::info!("Shutdown signal received");
            }
            _ = self.serve(&rendezvous) => {}
        }

        self.stats.log();
        Ok(())
    }

    async fn serve(&mut self, rendezvous: &F::Rendezvous) {
        loop {
            self.step(rendezvous).await;
        }
    }

    /// Run one loop iteration and return what the multiplexer reported
    ///
    /// The rendezvous channel is handled before any client, clients in
    /// ascending registry index order.
    pub async fn step(&mut self, rendezvous: &F::Rendezvous) -> ReadySet {
        let ready = multiplexer::wait(rendezvous, &self.registry, self.config.poll_timeout).await;

        if ready.rendezvous {
            self.handle_rendezvous(rendezvous).await;
        }

        for &index in &ready.clients {
            self.handle_client(index);
        }

        self.maybe_log_stats();
        ready
    }

    async fn handle_rendezvous(&mut self, rendezvous: &F::Rendezvous) {
        let mut buf = [0u8; RENDEZVOUS_READ_SIZE];

        match rendezvous.try_read(&mut buf) {
            Ok(0) => {
                tracing::debug!("Empty read on rendezvous channel");
            }
            Ok(n) => self.handle_registration(&buf[..n]).await,
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {}
            Err(e) => {
                tracing::warn!(error = %e, "Rendezvous read failed");
            }
        }
    }

    async fn handle_registration(&mut self, raw: &[u8]) {
        tracing::info!(
            request = %String::from_utf8_lossy(raw).trim_end(),
            "Registration request"
        );

        let result =
            registration::register(&self.factory, &mut self.registry, &self.config, raw).await;

        match result {
            Ok(_) => self.stats.registrations += 1,
            Err(e) if e.is_rejection() => {
                self.stats.rejected_registrations += 1;
                tracing::info!(error = %e, "Registration rejected");
            }
            Err(e) => {
                self.stats.failed_registrations += 1;
                tracing::warn!(error = %e, "Registration failed");
            }
        }
    }

    fn handle_client(&mut self, index: usize) {
        match dispatch::on_readable(&mut self.registry, index, &self.config) {
            DispatchOutcome::Relayed {
                bytes,
                delivered,
                failed,
            } => self.stats.record_relay(bytes, delivered, failed),
            DispatchOutcome::Disconnected => self.stats.disconnects += 1,
            DispatchOutcome::Spurious => {}
        }
    }

    fn maybe_log_stats(&mut self) {
        let interval = self.config.stats_interval;
        if !interval.is_zero() && self.last_stats_log.elapsed() >= interval {
            self.stats.log();
            self.last_stats_log = Instant::now();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::channel::memory::MemoryFactory;

    fn server() -> RelayServer<MemoryFactory> {
        let config = RelayConfig::default().poll_timeout(Duration::from_millis(10));
        RelayServer::with_factory(config, MemoryFactory::new())
    }

    /// Step until the rendezvous queue is drained
    async fn register_all(
        server: &mut RelayServer<MemoryFactory>,
        rendezvous: &<MemoryFactory as EndpointFactory>::Rendezvous,
        names: &[&str],
    ) {
        for name in names {
            server.factory().submit(format!("{}\n", name).as_bytes());
        }
        for _ in names {
            server.step(rendezvous).await;
        }
    }

    #[tokio::test]
    async fn test_idle_step_times_out() {
        let mut server = server();
        let rendezvous = server.open_rendezvous().unwrap();

        let ready = server.step(&rendezvous).await;
        assert!(ready.is_empty());
    }

    #[tokio::test]
    async fn test_basic_chat() {
        let mut server = server();
        let rendezvous = server.open_rendezvous().unwrap();
        register_all(&mut server, &rendezvous, &["alice", "bob"]).await;

        let alice = server.factory().peer("alice");
        let bob = server.factory().peer("bob");
        assert_eq!(server.registry().active_count(), 2);

        alice.send(b"hello\n");
        let ready = server.step(&rendezvous).await;
        assert_eq!(ready.clients, vec![0]);

        assert_eq!(bob.received(), b"READY\nhello\n");
        assert_eq!(alice.received(), b"READY\n");
        assert_eq!(server.stats().messages_relayed, 1);
        assert_eq!(server.stats().deliveries, 1);
    }

    #[tokio::test]
    async fn test_duplicate_registration() {
        let mut server = server();
        let rendezvous = server.open_rendezvous().unwrap();
        register_all(&mut server, &rendezvous, &["alice", "alice"]).await;

        assert_eq!(server.registry().active_count(), 1);
        assert_eq!(server.registry().len(), 1);
        assert_eq!(server.stats().registrations, 1);
        assert_eq!(server.stats().rejected_registrations, 1);
        assert_eq!(server.factory().peers("alice").len(), 1);
        assert!(!server.factory().peer("alice").is_released());
    }

    #[tokio::test]
    async fn test_disconnect_scenario() {
        let mut server = server();
        let rendezvous = server.open_rendezvous().unwrap();
        register_all(&mut server, &rendezvous, &["alice", "bob"]).await;
        let alice = server.factory().peer("alice");
        let bob = server.factory().peer("bob");

        alice.hang_up();
        server.step(&rendezvous).await;
        assert!(!server.registry().get(0).unwrap().is_active());
        assert_eq!(server.stats().disconnects, 1);

        bob.send(b"still there?\n");
        server.step(&rendezvous).await;

        assert_eq!(alice.received(), b"READY\n");
        assert_eq!(server.stats().delivery_failures, 0);
        assert_eq!(server.registry().active_count(), 1);
    }

    #[tokio::test]
    async fn test_registration_and_message_in_one_step() {
        let mut server = server();
        let rendezvous = server.open_rendezvous().unwrap();
        register_all(&mut server, &rendezvous, &["alice"]).await;
        let alice = server.factory().peer("alice");

        server.factory().submit(b"bob");
        alice.send(b"hi bob");
        let ready = server.step(&rendezvous).await;

        // Rendezvous handled first, so bob is already a recipient
        assert!(ready.rendezvous);
        assert_eq!(ready.clients, vec![0]);
        assert_eq!(server.factory().peer("bob").received(), b"READY\nhi bob");
    }

    #[tokio::test]
    async fn test_failed_registration_counted() {
        let mut server = server();
        let rendezvous = server.open_rendezvous().unwrap();
        server.factory().refuse("alice");

        register_all(&mut server, &rendezvous, &["alice", "bad/name"]).await;

        assert!(server.registry().is_empty());
        assert_eq!(server.stats().failed_registrations, 1);
        assert_eq!(server.stats().rejected_registrations, 1);
    }

    #[tokio::test]
    async fn test_run_until_returns_on_shutdown() {
        let mut server = server();
        server.factory().submit(b"alice");

        let shutdown = tokio::time::sleep(Duration::from_millis(50));
        server.run_until(shutdown).await.unwrap();

        assert_eq!(server.registry().active_count(), 1);
    }
}
