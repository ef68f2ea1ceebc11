//! Client registry
//!
//! The registry is an append-only table of every client that ever registered.
//! A record's index never changes, so the multiplexer and dispatcher can refer
//! to clients by index instead of by handle.
//!
//! # Layout
//!
//! ```text
//!                          ClientRegistry
//!              ┌──────────────────────────────────────┐
//!              │ records: Vec<ClientRecord>           │
//!              │   [0] alice   endpoint: None   (gone)│
//!              │   [1] bob     endpoint: Some(..)     │
//!              │   [2] alice   endpoint: Some(..)     │
//!              │ active: HashMap<ClientId, index>     │
//!              │   bob -> 1, alice -> 2               │
//!              └──────────────────────────────────────┘
//! ```
//!
//! Disconnected records stay in place as tombstones. Re-registering an
//! identifier appends a fresh record.

pub mod entry;
pub mod error;
pub mod store;

pub use entry::{ClientRecord, ClientState};
pub use error::RegistryError;
pub use store::ClientRegistry;
