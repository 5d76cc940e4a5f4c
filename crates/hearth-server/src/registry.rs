//! Connection registry: the single source of truth for who is online.
//!
//! At most one live connection per identity. A newer registration replaces
//! the older one, which is handed back to the caller for eviction.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, Notify, RwLock};
use tracing::{debug, info};

use hearth_shared::protocol::ServerEvent;
use hearth_shared::types::{ConnectionId, UserId};

/// Outcome of a best-effort push.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Queued on the recipient's live connection.
    Delivered,
    /// Recipient has no live connection; nothing was sent.
    Offline,
    /// Recipient is connected but its buffer is full or closing.
    Dropped,
}

/// Sending side of one live connection.
///
/// Cloning is cheap; all clones refer to the same connection and compare
/// equal.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    identity: UserId,
    username: String,
    tx: mpsc::Sender<ServerEvent>,
    evicted: Arc<Notify>,
}

impl PartialEq for ConnectionHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ConnectionHandle {}

impl ConnectionHandle {
    /// Create a handle and the receiver its transport task drains.
    pub fn open(
        identity: UserId,
        username: String,
        buffer: usize,
    ) -> (Self, mpsc::Receiver<ServerEvent>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let handle = Self {
            id: ConnectionId::new(),
            identity,
            username,
            tx,
            evicted: Arc::new(Notify::new()),
        };
        (handle, rx)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn identity(&self) -> &UserId {
        &self.identity
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Queue an event without waiting. Never blocks, never retries.
    pub fn push(&self, event: ServerEvent) -> Delivery {
        match self.tx.try_send(event) {
            Ok(()) => Delivery::Delivered,
            Err(err) => {
                debug!(
                    user = %self.identity.short(),
                    connection = %self.id,
                    event = err.into_inner().name(),
                    "Dropping event for slow or closing connection"
                );
                Delivery::Dropped
            }
        }
    }

    /// Tell the owning transport task to close this connection.
    pub fn evict(&self) {
        self.evicted.notify_one();
    }

    /// Resolves once [`evict`](Self::evict) has been called.
    pub async fn evicted(&self) {
        self.evicted.notified().await
    }
}

#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    connections: Arc<RwLock<HashMap<UserId, ConnectionHandle>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection, replacing any previous one for the same
    /// identity. The replaced handle is returned so the caller can evict it.
    #[cfg(test)]
    pub async fn register(&self, handle: ConnectionHandle) -> Option<ConnectionHandle> {
        let mut connections = self.connections.write().await;
        Self::insert(&mut connections, handle)
    }

    /// Register a connection and push `event` to every live handle, the new
    /// one included, before the write lock is released. No other transition
    /// for the identity can interleave between the two.
    ///
    /// Returns the replaced handle and how many handles accepted the event.
    pub async fn register_announcing(
        &self,
        handle: ConnectionHandle,
        event: &ServerEvent,
    ) -> (Option<ConnectionHandle>, usize) {
        let mut connections = self.connections.write().await;
        let previous = Self::insert(&mut connections, handle);
        let delivered = Self::broadcast(&connections, event);
        (previous, delivered)
    }

    /// Remove the entry only if it still points at `handle`. A stale
    /// disconnect racing a newer registration is a no-op.
    ///
    /// Returns `true` if the entry was removed.
    #[cfg(test)]
    pub async fn unregister(&self, handle: &ConnectionHandle) -> bool {
        let mut connections = self.connections.write().await;
        Self::remove_current(&mut connections, handle)
    }

    /// Like [`unregister`](Self::unregister), but if the entry was removed
    /// `event` goes to every remaining handle under the same write lock, so
    /// a reconnect cannot slip in between the removal and the broadcast.
    ///
    /// Returns `None` for a stale handle, otherwise how many handles
    /// accepted the event.
    pub async fn unregister_announcing(
        &self,
        handle: &ConnectionHandle,
        event: &ServerEvent,
    ) -> Option<usize> {
        let mut connections = self.connections.write().await;
        if Self::remove_current(&mut connections, handle) {
            Some(Self::broadcast(&connections, event))
        } else {
            None
        }
    }

    fn insert(
        connections: &mut HashMap<UserId, ConnectionHandle>,
        handle: ConnectionHandle,
    ) -> Option<ConnectionHandle> {
        let previous = connections.insert(handle.identity.clone(), handle.clone());
        info!(
            user = %handle.identity.short(),
            connection = %handle.id,
            replaced = previous.is_some(),
            online = connections.len(),
            "Connection registered"
        );
        previous
    }

    fn remove_current(
        connections: &mut HashMap<UserId, ConnectionHandle>,
        handle: &ConnectionHandle,
    ) -> bool {
        let is_current = connections
            .get(&handle.identity)
            .map(|current| current == handle)
            .unwrap_or(false);

        if is_current {
            connections.remove(&handle.identity);
            info!(
                user = %handle.identity.short(),
                connection = %handle.id,
                online = connections.len(),
                "Connection unregistered"
            );
        } else {
            debug!(
                user = %handle.identity.short(),
                connection = %handle.id,
                "Ignoring stale unregister"
            );
        }

        is_current
    }

    fn broadcast(connections: &HashMap<UserId, ConnectionHandle>, event: &ServerEvent) -> usize {
        connections
            .values()
            .filter(|handle| handle.push(event.clone()) == Delivery::Delivered)
            .count()
    }

    pub async fn lookup(&self, identity: &UserId) -> Option<ConnectionHandle> {
        self.connections.read().await.get(identity).cloned()
    }

    pub async fn is_online(&self, identity: &UserId) -> bool {
        self.connections.read().await.contains_key(identity)
    }

    /// Identities with a live connection, sorted for stable output.
    pub async fn online_users(&self) -> Vec<UserId> {
        let mut users: Vec<UserId> = self.connections.read().await.keys().cloned().collect();
        users.sort();
        users
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Best-effort push to one identity: delivered only if it is connected
    /// right now. No queueing for offline recipients.
    pub async fn push_best_effort(&self, identity: &UserId, event: ServerEvent) -> Delivery {
        match self.lookup(identity).await {
            Some(handle) => handle.push(event),
            None => Delivery::Offline,
        }
    }
}
