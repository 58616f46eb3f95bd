//! The hub: a single serialized event loop that owns the client registry.
//!
//! Connection tasks never touch the registry. They send connect, message and
//! disconnect events through one shared event queue, and the hub talks back
//! through each client's unbounded outbound queue, so handling an event never
//! waits on I/O or on another client.

use relayhub_proto::command::{self, COMMAND_NOT_RECOGNIZED, Command};
use relayhub_proto::identity::ClientId;
use relayhub_proto::relay::{self, RelayRequest};
use tokio::sync::mpsc;

use crate::client::{Client, ClientHandle};
use crate::registry::ClientRegistry;

/// Capacity of the hub's event queue.
pub const EVENT_QUEUE_CAPACITY: usize = 1024;

/// An event consumed by the hub.
#[derive(Debug)]
pub enum InboundEvent {
    /// A connection was accepted. Carries the only sender of its outbound
    /// queue.
    Connect(Client),
    /// A connection's reader stopped.
    Disconnect(ClientHandle),
    /// A non-empty frame was read from a connection.
    Message(Vec<u8>, ClientHandle),
}

/// Returned when an event is sent to a hub that is no longer running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("relay hub is no longer running")]
pub struct HubClosed;

/// Cloneable sending side of the hub's event queue.
#[derive(Debug, Clone)]
pub struct HubHandle {
    events: mpsc::Sender<InboundEvent>,
}

impl HubHandle {
    /// Announces a newly accepted connection.
    ///
    /// # Errors
    ///
    /// Returns [`HubClosed`] if the hub has stopped.
    pub async fn connect(&self, client: Client) -> Result<(), HubClosed> {
        self.send(InboundEvent::Connect(client)).await
    }

    /// Announces that a connection has gone away.
    ///
    /// # Errors
    ///
    /// Returns [`HubClosed`] if the hub has stopped.
    pub async fn disconnect(&self, client: ClientHandle) -> Result<(), HubClosed> {
        self.send(InboundEvent::Disconnect(client)).await
    }

    /// Forwards a frame read from `from`.
    ///
    /// # Errors
    ///
    /// Returns [`HubClosed`] if the hub has stopped.
    pub async fn message(&self, contents: Vec<u8>, from: ClientHandle) -> Result<(), HubClosed> {
        self.send(InboundEvent::Message(contents, from)).await
    }

    async fn send(&self, event: InboundEvent) -> Result<(), HubClosed> {
        self.events.send(event).await.map_err(|_| HubClosed)
    }
}

/// Creates a hub and the handle used to feed it.
///
/// `capacity` bounds the event queue. A full queue only slows down the
/// connection tasks that feed it; the hub itself never sends on it.
#[must_use]
pub fn channel(capacity: usize) -> (HubHandle, Hub) {
    let (tx, rx) = mpsc::channel(capacity);
    let hub = Hub {
        registry: ClientRegistry::new(),
        events: rx,
    };
    (HubHandle { events: tx }, hub)
}

/// The serializer. Owns the registry and is its only mutator.
#[derive(Debug)]
pub struct Hub {
    registry: ClientRegistry,
    events: mpsc::Receiver<InboundEvent>,
}

impl Hub {
    /// Read access to the registry.
    #[must_use]
    pub const fn registry(&self) -> &ClientRegistry {
        &self.registry
    }

    /// Processes events one at a time until every [`HubHandle`] is dropped.
    pub async fn run(mut self) {
        tracing::info!("relay hub started");
        while let Some(event) = self.next_event().await {
            self.handle_event(event);
        }
        tracing::info!(clients = self.registry.len(), "relay hub stopped");
    }

    /// Waits for the next event, in arrival order.
    ///
    /// A connection sends its Connect before spawning its reader and its
    /// Disconnect after its last message, so its events come out in the order
    /// they were produced. Events from different connections interleave by
    /// arrival only.
    pub async fn next_event(&mut self) -> Option<InboundEvent> {
        self.events.recv().await
    }

    /// Applies a single event to completion.
    ///
    /// Never fails: every per-connection problem is logged and contained to
    /// that connection.
    pub fn handle_event(&mut self, event: InboundEvent) {
        match event {
            InboundEvent::Connect(client) => self.on_connect(client),
            InboundEvent::Disconnect(client) => self.on_disconnect(&client),
            InboundEvent::Message(contents, from) => self.on_message(&contents, &from),
        }
    }

    fn on_connect(&mut self, client: Client) {
        let handle = client.handle().clone();
        let id = match handle.identity() {
            Ok(id) => id,
            Err(e) => {
                // Dropping the client closes its queue, which ends the connection.
                tracing::warn!(
                    remote_addr = %handle.remote_addr(),
                    error = %e,
                    "connection error, discarding client"
                );
                return;
            }
        };

        if let Some(previous) = self.registry.insert(id, client) {
            tracing::warn!(
                identity = %id,
                replaced = %previous.handle().connection(),
                "identity reused, replacing previous connection"
            );
        }
        tracing::info!(
            identity = %id,
            remote_addr = %handle.remote_addr(),
            connection = %handle.connection(),
            "client connected"
        );
    }

    fn on_disconnect(&mut self, client: &ClientHandle) {
        let id = match client.identity() {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(
                    remote_addr = %client.remote_addr(),
                    error = %e,
                    "cannot resolve identity on disconnect, skipping registry removal"
                );
                return;
            }
        };

        if self.registry.remove(id, client.connection()).is_some() {
            tracing::info!(identity = %id, remote_addr = %client.remote_addr(), "client disconnected");
        } else {
            tracing::debug!(
                identity = %id,
                connection = %client.connection(),
                "disconnect for connection that is not registered"
            );
        }
    }

    fn on_message(&mut self, contents: &[u8], from: &ClientHandle) {
        let id = match from.identity() {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(
                    remote_addr = %from.remote_addr(),
                    error = %e,
                    "connection error on message, disconnecting client"
                );
                self.on_disconnect(from);
                return;
            }
        };

        let Some(sender) = self.registry.get_connection(id, from.connection()) else {
            tracing::debug!(
                identity = %id,
                connection = %from.connection(),
                "dropping message from unregistered connection"
            );
            return;
        };

        tracing::debug!(identity = %id, len = contents.len(), "message received");

        let reply = match Command::parse(contents) {
            Command::Identity => command::identity_reply(id),
            Command::List => command::list_reply(&self.registry.ids_except(id)),
            Command::Relay(Ok(request)) => {
                self.relay(id, sender, &request);
                return;
            }
            Command::Relay(Err(e)) => {
                tracing::debug!(identity = %id, reason = %e, "relay rejected");
                e.to_string().into_bytes()
            }
            Command::Unrecognized => COMMAND_NOT_RECOGNIZED.to_vec(),
        };
        sender.send(reply);
    }

    /// Fans a validated relay out to its destinations.
    ///
    /// Each destination is handled on its own: unknown ones are reported to
    /// the sender and the rest still receive the body.
    fn relay(&self, sender_id: ClientId, sender: &Client, request: &RelayRequest<'_>) {
        let mut delivered = 0usize;
        for token in &request.destinations {
            let destination = ClientId::from_token(token).and_then(|id| self.registry.get(id));
            match destination {
                Some(dest) => {
                    if dest.send(relay::delivery_frame(sender_id, request.body)) {
                        delivered += 1;
                    }
                }
                None => {
                    sender.send(relay::not_found_reply(token));
                }
            }
        }
        tracing::debug!(
            identity = %sender_id,
            destinations = request.destinations.len(),
            delivered,
            body_len = request.body.len(),
            "relay processed"
        );
    }
}
