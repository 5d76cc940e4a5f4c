//! The realtime hub: owns the registry and the components built on it, and
//! maps each inbound client event to exactly one component call.
//!
//! The hub knows nothing about sockets. A transport obtains a [`Session`]
//! from [`Hub::connect`], drains its event receiver, feeds parsed
//! [`ClientEvent`]s into [`Hub::dispatch`] and calls [`Hub::disconnect`]
//! when the transport closes.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use hearth_shared::models::NotificationKind;
use hearth_shared::protocol::{ClientEvent, ServerEvent};
use hearth_shared::types::UserId;
use hearth_store::{NotificationEntry, Persistence};

use crate::auth::VerifiedIdentity;
use crate::error::ServerError;
use crate::messaging::DirectMessageRouter;
use crate::notifications::{FanoutOutcome, NotificationFanout};
use crate::presence::PresenceBroadcaster;
use crate::receipts::ReadReceiptPropagator;
use crate::registry::{ConnectionHandle, ConnectionRegistry};
use crate::storage::BlockingStore;
use crate::typing::TypingRelay;

/// A registered connection: the handle other tasks push to, and the
/// receiver its transport drains.
pub struct Session {
    pub handle: ConnectionHandle,
    pub events: mpsc::Receiver<ServerEvent>,
}

#[derive(Clone)]
pub struct Hub {
    store: BlockingStore,
    registry: ConnectionRegistry,
    presence: PresenceBroadcaster,
    messages: DirectMessageRouter,
    typing: TypingRelay,
    receipts: ReadReceiptPropagator,
    notifications: NotificationFanout,
    connection_buffer: usize,
}

impl Hub {
    pub fn new(store: Arc<dyn Persistence>, connection_buffer: usize) -> Self {
        let store = BlockingStore::new(store);
        let registry = ConnectionRegistry::new();
        let notifications = NotificationFanout::new(store.clone(), registry.clone());

        Self {
            presence: PresenceBroadcaster::new(registry.clone()),
            messages: DirectMessageRouter::new(
                store.clone(),
                registry.clone(),
                notifications.clone(),
            ),
            typing: TypingRelay::new(registry.clone()),
            receipts: ReadReceiptPropagator::new(store.clone(), registry.clone()),
            notifications,
            registry,
            store,
            connection_buffer,
        }
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Register a verified identity and announce it online.
    ///
    /// Any older connection for the same identity is evicted; its transport
    /// closes on its own and its later disconnect is a no-op.
    pub async fn connect(&self, identity: VerifiedIdentity) -> Result<Session, ServerError> {
        if identity.user_id.is_empty() {
            return Err(ServerError::Authentication("Missing identity".into()));
        }

        let recorded = self
            .store
            .run({
                let (id, username) = (identity.user_id.clone(), identity.username.clone());
                move |s| s.ensure_user(&id, &username)
            })
            .await;
        if let Err(e) = recorded {
            warn!(user = %identity.user_id.short(), error = %e, "Failed to record user");
        }

        let (handle, events) = ConnectionHandle::open(
            identity.user_id.clone(),
            identity.username,
            self.connection_buffer,
        );

        if let Some(previous) = self.presence.go_online(handle.clone()).await {
            info!(
                user = %previous.identity().short(),
                connection = %previous.id(),
                "Evicting older connection"
            );
            previous.evict();
        }

        Ok(Session { handle, events })
    }

    /// Unregister a connection. Offline is announced only if this handle
    /// was still the live one.
    pub async fn disconnect(&self, handle: &ConnectionHandle) {
        self.presence.go_offline(handle).await;
    }

    /// Handle one inbound event from `handle`'s connection.
    pub async fn dispatch(
        &self,
        handle: &ConnectionHandle,
        event: ClientEvent,
    ) -> Result<(), ServerError> {
        let sender = handle.identity();
        match event {
            ClientEvent::MessageSend {
                receiver_id,
                content,
            } => {
                self.messages
                    .send_message(sender, &receiver_id, &content)
                    .await?;
            }
            ClientEvent::MessageMarkRead { message_id } => {
                self.receipts.mark_read(sender, message_id).await?;
            }
            ClientEvent::TypingSet {
                receiver_id,
                is_typing,
            } => {
                self.typing.set_typing(sender, &receiver_id, is_typing).await;
            }
        }
        Ok(())
    }

    /// Like/comment/follow trigger from outside the realtime channel.
    ///
    /// Acting on your own content produces no notification.
    pub async fn record_activity(
        &self,
        actor: &UserId,
        kind: NotificationKind,
        target: &UserId,
        entity_id: Option<Uuid>,
    ) -> Result<Option<FanoutOutcome>, ServerError> {
        if kind == NotificationKind::Message {
            return Err(ServerError::Validation(
                "Message notifications are created by sending a message".into(),
            ));
        }
        if target.is_empty() {
            return Err(ServerError::Validation("Missing target user".into()));
        }

        self.notifications
            .notify(kind, actor, std::slice::from_ref(target), entity_id)
            .await
    }

    pub async fn unread_count(&self, identity: &UserId) -> Result<u64, ServerError> {
        self.notifications.unread_count(identity).await
    }

    pub async fn mark_all_read(&self, identity: &UserId) -> Result<(), ServerError> {
        self.notifications.mark_all_read(identity).await
    }

    pub async fn list_notifications(
        &self,
        identity: &UserId,
        limit: u32,
    ) -> Result<Vec<NotificationEntry>, ServerError> {
        self.notifications.list(identity, limit).await
    }

    pub async fn roster(&self) -> Vec<UserId> {
        self.presence.roster().await
    }
}
