//! Client registry: identity to live client.
//!
//! Only the hub's event loop holds a `ClientRegistry`, so it needs no lock.
//! Each entry owns the only sender of its client's outbound queue; dropping
//! the entry closes the queue and ends that client's writer task.

use std::collections::HashMap;

use relayhub_proto::identity::ClientId;

use crate::client::{Client, ConnectionId};

/// Registered clients keyed by identity.
#[derive(Debug, Default)]
pub struct ClientRegistry {
    clients: HashMap<ClientId, Client>,
}

impl ClientRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a client, returning the client it displaced if the identity
    /// was already taken.
    pub fn insert(&mut self, id: ClientId, client: Client) -> Option<Client> {
        self.clients.insert(id, client)
    }

    /// Removes the entry for `id` if it belongs to `connection`.
    ///
    /// An entry registered by a different connection under the same identity
    /// is left alone.
    pub fn remove(&mut self, id: ClientId, connection: ConnectionId) -> Option<Client> {
        if self.get_connection(id, connection).is_none() {
            return None;
        }
        self.clients.remove(&id)
    }

    /// Returns the client registered under `id`.
    #[must_use]
    pub fn get(&self, id: ClientId) -> Option<&Client> {
        self.clients.get(&id)
    }

    /// Returns the client registered under `id` only if it is `connection`.
    #[must_use]
    pub fn get_connection(&self, id: ClientId, connection: ConnectionId) -> Option<&Client> {
        self.clients
            .get(&id)
            .filter(|c| c.handle().connection() == connection)
    }

    /// Whether `id` is registered.
    #[must_use]
    pub fn contains(&self, id: ClientId) -> bool {
        self.clients.contains_key(&id)
    }

    /// All registered identities except `id`, in ascending order.
    #[must_use]
    pub fn ids_except(&self, id: ClientId) -> Vec<ClientId> {
        let mut ids: Vec<ClientId> = self.clients.keys().copied().filter(|k| *k != id).collect();
        ids.sort_unstable();
        ids
    }

    /// Number of registered clients.
    #[must_use]
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Whether no client is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
