//! # fifo-relay
//!
//! A local broadcast relay over named FIFOs.
//!
//! Clients write their identifier to a well-known rendezvous FIFO. The relay
//! creates a private FIFO pair for each one (`<id>_to_server`,
//! `server_to_<id>`), sends `READY\n`, and from then on copies every chunk a
//! client writes to every other connected client.
//!
//! ## Architecture
//!
//! ```text
//!   registration_fifo ──► registration ──► ClientRegistry
//!                                              │
//!   <id>_to_server ──► multiplexer ──► dispatch ──► server_to_<peer> (all peers)
//! ```
//!
//! Everything runs on one thread. The multiplexer's bounded wait is the only
//! place the relay parks for long. Opening a client's write end is retried
//! against a deadline, and writes to recipients never block: a client that
//! stops draining its channel misses chunks instead of stalling everyone.
//!
//! ## Example
//!
//! ```no_run
//! use fifo_relay::{RelayConfig, RelayServer};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RelayConfig::with_dir("/tmp/chat");
//!     std::fs::create_dir_all(&config.base_dir)?;
//!
//!     let mut server = RelayServer::new(config);
//!     server.run_until(async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     }).await?;
//!     Ok(())
//! }
//! ```

pub mod channel;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod stats;

pub use channel::{ClientEndpoint, EndpointFactory, FifoFactory, ReadReady};
pub use error::{Error, Result};
pub use protocol::ClientId;
pub use registry::ClientRegistry;
pub use server::{RelayConfig, RelayServer};
pub use stats::RelayStats;
