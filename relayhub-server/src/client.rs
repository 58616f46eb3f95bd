//! Per-connection client state.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use relayhub_proto::identity::{AddressError, ClientId};
use tokio::sync::mpsc;

static NEXT_CONNECTION: AtomicU64 = AtomicU64::new(1);

/// Process-unique tag for one accepted connection.
///
/// Two connections can share a [`ClientId`] when a source port is reused;
/// the connection id tells them apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    fn next() -> Self {
        Self(NEXT_CONNECTION.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lightweight reference to a connection, carried by reader-side events.
///
/// It deliberately holds no sender: the outbound queue is owned by the
/// [`Client`] in the registry, so removing the entry closes the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientHandle {
    connection: ConnectionId,
    remote_addr: Arc<str>,
}

impl ClientHandle {
    /// The connection this handle refers to.
    #[must_use]
    pub const fn connection(&self) -> ConnectionId {
        self.connection
    }

    /// Remote address as reported by the transport, e.g. `127.0.0.1:51234`.
    #[must_use]
    pub fn remote_addr(&self) -> &str {
        &self.remote_addr
    }

    /// Resolves the identity of this connection from its remote address.
    ///
    /// # Errors
    ///
    /// Returns [`AddressError`] if the address has no parseable port.
    pub fn identity(&self) -> Result<ClientId, AddressError> {
        ClientId::from_remote_addr(&self.remote_addr)
    }
}

/// One live connection: its handle plus the sending half of its outbound
/// queue.
#[derive(Debug)]
pub struct Client {
    handle: ClientHandle,
    outbound: mpsc::UnboundedSender<Vec<u8>>,
}

impl Client {
    /// Creates a client for a freshly accepted connection.
    pub fn new(remote_addr: impl Into<Arc<str>>, outbound: mpsc::UnboundedSender<Vec<u8>>) -> Self {
        Self {
            handle: ClientHandle {
                connection: ConnectionId::next(),
                remote_addr: remote_addr.into(),
            },
            outbound,
        }
    }

    /// Returns this client's handle.
    #[must_use]
    pub const fn handle(&self) -> &ClientHandle {
        &self.handle
    }

    /// Queues a payload for the client's writer task.
    ///
    /// Never blocks. Returns `false` if the writer has already gone away;
    /// the connection's own disconnect event cleans up after it.
    pub fn send(&self, payload: Vec<u8>) -> bool {
        self.outbound.send(payload).is_ok()
    }
}
