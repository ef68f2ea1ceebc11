//! In-memory channels for driving the relay in unit tests
//!
//! Each client gets a [`MemoryPeer`], the test's view of the other end of its
//! channel pair. Readiness is level-triggered and never registers a waker, so
//! a wait with nothing ready simply runs into the multiplexer timeout.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet, VecDeque};
use std::io;
use std::rc::Rc;
use std::task::{Context, Poll};

use crate::error::ChannelError;
use crate::protocol::ClientId;

use super::{ClientEndpoint, EndpointFactory, ReadReady};

#[derive(Debug, Default)]
struct Pipe {
    data: VecDeque<u8>,
    closed: bool,
    broken: bool,
}

/// Test-side handle on a client's channel pair
#[derive(Debug, Clone, Default)]
pub(crate) struct MemoryPeer {
    to_server: Rc<RefCell<Pipe>>,
    from_server: Rc<RefCell<Vec<Vec<u8>>>>,
    fail_writes: Rc<Cell<bool>>,
    stalled: Rc<Cell<bool>>,
    endpoint_dropped: Rc<Cell<bool>>,
}

impl MemoryPeer {
    /// Client writes bytes towards the server
    pub(crate) fn send(&self, data: &[u8]) {
        self.to_server.borrow_mut().data.extend(data);
    }

    /// Client closes its write end
    pub(crate) fn hang_up(&self) {
        self.to_server.borrow_mut().closed = true;
    }

    /// Every write the server made, in order
    pub(crate) fn writes(&self) -> Vec<Vec<u8>> {
        self.from_server.borrow().clone()
    }

    /// All bytes the server wrote, concatenated
    pub(crate) fn received(&self) -> Vec<u8> {
        self.from_server.borrow().concat()
    }

    /// Make further server writes to this client fail
    pub(crate) fn break_pipe(&self) {
        self.fail_writes.set(true);
    }

    /// Make the server's read end fail with a hard error
    pub(crate) fn break_read(&self) {
        self.to_server.borrow_mut().broken = true;
    }

    /// Stop draining: further server writes find the channel full
    pub(crate) fn stall(&self) {
        self.stalled.set(true);
    }

    /// Whether the server released this client's handles
    pub(crate) fn is_released(&self) -> bool {
        self.endpoint_dropped.get()
    }
}

/// Server side of a [`MemoryPeer`]
#[derive(Debug)]
pub(crate) struct MemoryEndpoint {
    peer: MemoryPeer,
}

impl MemoryEndpoint {
    pub(crate) fn new() -> (Self, MemoryPeer) {
        let peer = MemoryPeer::default();
        (Self { peer: peer.clone() }, peer)
    }
}

impl ReadReady for MemoryEndpoint {
    fn poll_read_ready(&self, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let pipe = self.peer.to_server.borrow();
        if !pipe.data.is_empty() || pipe.closed || pipe.broken {
            Poll::Ready(Ok(()))
        } else {
            Poll::Pending
        }
    }

    fn try_read(&self, buf: &mut [u8]) -> io::Result<usize> {
        let mut pipe = self.peer.to_server.borrow_mut();
        if pipe.broken {
            return Err(io::Error::new(io::ErrorKind::Other, "read end broken"));
        }
        if pipe.data.is_empty() {
            return if pipe.closed {
                Ok(0)
            } else {
                Err(io::ErrorKind::WouldBlock.into())
            };
        }

        let n = buf.len().min(pipe.data.len());
        for (slot, byte) in buf.iter_mut().zip(pipe.data.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

impl ClientEndpoint for MemoryEndpoint {
    fn try_write(&self, data: &[u8]) -> io::Result<usize> {
        if self.peer.fail_writes.get() {
            return Err(io::ErrorKind::BrokenPipe.into());
        }
        if self.peer.stalled.get() {
            return Err(io::ErrorKind::WouldBlock.into());
        }
        self.peer.from_server.borrow_mut().push(data.to_vec());
        Ok(data.len())
    }
}

impl Drop for MemoryEndpoint {
    fn drop(&mut self) {
        self.peer.endpoint_dropped.set(true);
    }
}

/// Rendezvous queue; every submitted registration is delivered as one read
#[derive(Debug, Clone, Default)]
pub(crate) struct MemoryRendezvous {
    queue: Rc<RefCell<VecDeque<Vec<u8>>>>,
}

impl ReadReady for MemoryRendezvous {
    fn poll_read_ready(&self, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        if self.queue.borrow().is_empty() {
            Poll::Pending
        } else {
            Poll::Ready(Ok(()))
        }
    }

    fn try_read(&self, buf: &mut [u8]) -> io::Result<usize> {
        let mut queue = self.queue.borrow_mut();
        let Some(mut next) = queue.pop_front() else {
            return Err(io::ErrorKind::WouldBlock.into());
        };

        let n = buf.len().min(next.len());
        buf[..n].copy_from_slice(&next[..n]);
        if next.len() > n {
            queue.push_front(next.split_off(n));
        }
        Ok(n)
    }
}

/// Factory handing out in-memory endpoints
#[derive(Debug, Default)]
pub(crate) struct MemoryFactory {
    rendezvous: MemoryRendezvous,
    peers: RefCell<HashMap<String, Vec<MemoryPeer>>>,
    refuse: RefCell<HashSet<String>>,
    broken_on_open: RefCell<HashSet<String>>,
    opened: Cell<usize>,
}

impl MemoryFactory {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Queue a registration on the rendezvous channel
    pub(crate) fn submit(&self, raw: &[u8]) {
        self.rendezvous.queue.borrow_mut().push_back(raw.to_vec());
    }

    /// Latest peer opened for `id`
    pub(crate) fn peer(&self, id: &str) -> MemoryPeer {
        self.peers
            .borrow()
            .get(id)
            .and_then(|peers| peers.last().cloned())
            .unwrap_or_else(|| panic!("no peer opened for {}", id))
    }

    /// Every peer opened for `id`, oldest first
    pub(crate) fn peers(&self, id: &str) -> Vec<MemoryPeer> {
        self.peers.borrow().get(id).cloned().unwrap_or_default()
    }

    /// Make `open_client` fail for `id`
    pub(crate) fn refuse(&self, id: &str) {
        self.refuse.borrow_mut().insert(id.to_string());
    }

    /// Open `id` with a write end that already fails
    pub(crate) fn break_on_open(&self, id: &str) {
        self.broken_on_open.borrow_mut().insert(id.to_string());
    }

    /// Number of endpoints successfully opened
    pub(crate) fn opened(&self) -> usize {
        self.opened.get()
    }
}

impl EndpointFactory for MemoryFactory {
    type Endpoint = MemoryEndpoint;
    type Rendezvous = MemoryRendezvous;

    fn open_rendezvous(&self) -> Result<MemoryRendezvous, ChannelError> {
        Ok(self.rendezvous.clone())
    }

    async fn open_client(&self, id: &ClientId) -> Result<MemoryEndpoint, ChannelError> {
        if self.refuse.borrow().contains(id.as_str()) {
            return Err(ChannelError::Open {
                path: id.outbound_name().into(),
                source: io::ErrorKind::PermissionDenied.into(),
            });
        }

        let (endpoint, peer) = MemoryEndpoint::new();
        if self.broken_on_open.borrow().contains(id.as_str()) {
            peer.break_pipe();
        }
        self.peers
            .borrow_mut()
            .entry(id.to_string())
            .or_default()
            .push(peer);
        self.opened.set(self.opened.get() + 1);

        Ok(endpoint)
    }
}
