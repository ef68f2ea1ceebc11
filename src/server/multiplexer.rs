//! I/O multiplexer
//!
//! One bounded wait per loop iteration over the rendezvous channel plus the
//! read end of every active client. The watch set is rebuilt from the
//! registry on each call, so a record deactivated in the previous iteration
//! is never polled again.

use std::future::poll_fn;
use std::task::Poll;
use std::time::Duration;

use crate::channel::ReadReady;
use crate::registry::ClientRegistry;

/// Handles reported readable by one wait
///
/// Client indices are in ascending order. The relay processes the rendezvous
/// channel first, then the clients in that order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadySet {
    /// Rendezvous channel has data
    pub rendezvous: bool,
    /// Registry indices of readable clients
    pub clients: Vec<usize>,
}

impl ReadySet {
    /// Nothing became ready (the wait timed out)
    pub fn is_empty(&self) -> bool {
        !self.rendezvous && self.clients.is_empty()
    }
}

/// Wait until at least one watched handle is readable, or `timeout` elapses
///
/// Readiness includes end-of-stream and errors; the subsequent read tells
/// them apart. A timeout yields an empty set.
pub async fn wait<R, E>(rendezvous: &R, registry: &ClientRegistry<E>, timeout: Duration) -> ReadySet
where
    R: ReadReady,
    E: ReadReady,
{
    let ready = poll_fn(|cx| {
        let mut set = ReadySet {
            rendezvous: rendezvous.poll_read_ready(cx).is_ready(),
            clients: Vec::new(),
        };

        for (index, record) in registry.active() {
            if let Some(endpoint) = record.endpoint() {
                if endpoint.poll_read_ready(cx).is_ready() {
                    set.clients.push(index);
                }
            }
        }

        if set.is_empty() {
            Poll::Pending
        } else {
            Poll::Ready(set)
        }
    });

    tokio::time::timeout(timeout, ready)
        .await
        .unwrap_or_default()
}
