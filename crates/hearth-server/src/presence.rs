//! Presence broadcast.
//!
//! Every online/offline transition goes to every registered connection,
//! the subject's own connection included. There is no interest filtering,
//! no acknowledgement and no replay for connections that join later.

use tracing::debug;

use hearth_shared::protocol::ServerEvent;
use hearth_shared::types::{PresenceStatus, UserId};

use crate::registry::{ConnectionHandle, ConnectionRegistry};

#[derive(Clone)]
pub struct PresenceBroadcaster {
    registry: ConnectionRegistry,
}

impl PresenceBroadcaster {
    pub fn new(registry: ConnectionRegistry) -> Self {
        Self { registry }
    }

    /// Register `handle` and announce it online to every connection,
    /// itself included. Returns the replaced handle, if any.
    pub async fn go_online(&self, handle: ConnectionHandle) -> Option<ConnectionHandle> {
        let event = Self::event(handle.identity(), PresenceStatus::Online);
        let (identity, connection) = (handle.identity().clone(), handle.id());
        let (previous, delivered) = self.registry.register_announcing(handle, &event).await;

        debug!(
            user = %identity.short(),
            connection = %connection,
            status = PresenceStatus::Online.as_str(),
            delivered,
            "Presence broadcast"
        );

        previous
    }

    /// Unregister `handle` and announce offline, only if it was still the
    /// live connection for its identity. Returns whether it was.
    pub async fn go_offline(&self, handle: &ConnectionHandle) -> bool {
        let event = Self::event(handle.identity(), PresenceStatus::Offline);
        match self.registry.unregister_announcing(handle, &event).await {
            Some(delivered) => {
                debug!(
                    user = %handle.identity().short(),
                    connection = %handle.id(),
                    status = PresenceStatus::Offline.as_str(),
                    delivered,
                    "Presence broadcast"
                );
                true
            }
            None => false,
        }
    }

    fn event(identity: &UserId, status: PresenceStatus) -> ServerEvent {
        ServerEvent::PresenceChanged {
            identity: identity.clone(),
            status,
        }
    }

    /// Current online roster, for clients that need a full snapshot.
    pub async fn roster(&self) -> Vec<UserId> {
        self.registry.online_users().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open(identity: &str) -> (ConnectionHandle, tokio::sync::mpsc::Receiver<ServerEvent>) {
        ConnectionHandle::open(UserId::from(identity), identity.to_string(), 8)
    }

    #[tokio::test]
    async fn test_broadcast_reaches_everyone_including_subject() {
        let registry = ConnectionRegistry::new();
        let broadcaster = PresenceBroadcaster::new(registry);
        let (a, mut rx_a) = open("a");
        let (b, mut rx_b) = open("b");
        broadcaster.go_online(a).await;
        rx_a.try_recv().unwrap();

        assert!(broadcaster.go_online(b).await.is_none());

        let expected = ServerEvent::PresenceChanged {
            identity: UserId::from("b"),
            status: PresenceStatus::Online,
        };
        assert_eq!(rx_a.try_recv().unwrap(), expected);
        assert_eq!(rx_b.try_recv().unwrap(), expected);
    }

    #[tokio::test]
    async fn test_no_replay_for_late_joiners() {
        let registry = ConnectionRegistry::new();
        let broadcaster = PresenceBroadcaster::new(registry.clone());
        let (a, _rx_a) = open("a");
        broadcaster.go_online(a.clone()).await;
        broadcaster.go_offline(&a).await;

        let (late, mut rx) = open("late");
        broadcaster.go_online(late).await;
        assert_eq!(
            rx.try_recv().unwrap(),
            ServerEvent::PresenceChanged {
                identity: UserId::from("late"),
                status: PresenceStatus::Online,
            }
        );
        assert!(rx.try_recv().is_err());

        assert_eq!(broadcaster.roster().await, vec![UserId::from("late")]);
    }

    #[tokio::test]
    async fn test_offline_for_replaced_handle_is_suppressed() {
        let registry = ConnectionRegistry::new();
        let broadcaster = PresenceBroadcaster::new(registry.clone());
        let (observer, mut rx) = open("observer");
        broadcaster.go_online(observer).await;

        let (first, _rx1) = open("a");
        let (second, _rx2) = open("a");
        broadcaster.go_online(first.clone()).await;
        assert_eq!(broadcaster.go_online(second).await, Some(first.clone()));
        while rx.try_recv().is_ok() {}

        assert!(!broadcaster.go_offline(&first).await);
        assert!(rx.try_recv().is_err());
        assert!(registry.is_online(&UserId::from("a")).await);
    }
}
