//! Relay wire protocol
//!
//! The relay speaks almost no protocol at all:
//! - The rendezvous FIFO carries raw client identifiers, one per read.
//! - Each client gets a FIFO pair named after its identifier.
//! - A single `READY\n` marker is written to a new client before any relay
//!   traffic; everything after that is opaque bytes, at most
//!   [`MAX_MESSAGE_SIZE`](constants::MAX_MESSAGE_SIZE) per relayed chunk.

pub mod constants;
pub mod ident;

pub use ident::ClientId;
