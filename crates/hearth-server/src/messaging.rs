//! Direct message routing.

use tracing::{debug, warn};

use hearth_shared::constants::MAX_MESSAGE_SIZE;
use hearth_shared::models::{Message, NotificationKind};
use hearth_shared::protocol::ServerEvent;
use hearth_shared::types::UserId;

use crate::error::ServerError;
use crate::notifications::NotificationFanout;
use crate::registry::ConnectionRegistry;
use crate::storage::BlockingStore;

#[derive(Clone)]
pub struct DirectMessageRouter {
    store: BlockingStore,
    registry: ConnectionRegistry,
    fanout: NotificationFanout,
}

impl DirectMessageRouter {
    pub fn new(
        store: BlockingStore,
        registry: ConnectionRegistry,
        fanout: NotificationFanout,
    ) -> Self {
        Self {
            store,
            registry,
            fanout,
        }
    }

    /// Persist a message, record its notification, then push it to the
    /// receiver if connected.
    ///
    /// Returns once the message row exists. Sends are not idempotent: a
    /// retried submission produces a second row.
    pub async fn send_message(
        &self,
        sender: &UserId,
        receiver: &UserId,
        content: &str,
    ) -> Result<Message, ServerError> {
        if content.trim().is_empty() {
            return Err(ServerError::Validation("Message content is empty".into()));
        }
        if content.len() > MAX_MESSAGE_SIZE {
            return Err(ServerError::Validation(format!(
                "Message content exceeds {MAX_MESSAGE_SIZE} bytes"
            )));
        }
        let exists = self
            .store
            .run({
                let receiver = receiver.clone();
                move |s| s.user_exists(&receiver)
            })
            .await?;
        if !exists {
            return Err(ServerError::NotFound(format!("User {receiver}")));
        }

        let message = self
            .store
            .run({
                let (sender, receiver) = (sender.clone(), receiver.clone());
                let content = content.to_string();
                move |s| s.create_message(&sender, &receiver, &content)
            })
            .await?;

        // The message row is authoritative; a missing notification is tolerated.
        if let Err(e) = self
            .fanout
            .notify(
                NotificationKind::Message,
                sender,
                std::slice::from_ref(receiver),
                None,
            )
            .await
        {
            warn!(
                message = %message.id,
                receiver = %receiver.short(),
                error = %e,
                "Message stored without notification"
            );
        }

        let delivery = self
            .registry
            .push_best_effort(receiver, ServerEvent::MessageDelivered(message.clone()))
            .await;

        debug!(
            message = %message.id,
            sender = %sender.short(),
            receiver = %receiver.short(),
            delivery = ?delivery,
            "Direct message routed"
        );

        Ok(message)
    }
}
