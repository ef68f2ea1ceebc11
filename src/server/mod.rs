//! Relay server
//!
//! - [`config`]: relay options
//! - [`multiplexer`]: the single bounded wait per loop iteration
//! - [`registration`]: rendezvous reads into client records
//! - [`dispatch`]: client reads into broadcasts or disconnects
//! - [`relay`]: the loop tying them together

pub mod config;
pub mod dispatch;
pub mod multiplexer;
pub mod registration;
pub mod relay;

pub use config::RelayConfig;
pub use dispatch::DispatchOutcome;
pub use multiplexer::ReadySet;
pub use relay::RelayServer;
