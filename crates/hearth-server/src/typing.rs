//! Typing indicator relay. Stateless: no persistence, no timers.
//!
//! Clients debounce on their side and send `isTyping: false` after
//! `TYPING_IDLE_TIMEOUT_SECS` of inactivity.

use hearth_shared::protocol::ServerEvent;
use hearth_shared::types::UserId;

use crate::registry::{ConnectionRegistry, Delivery};

#[derive(Clone)]
pub struct TypingRelay {
    registry: ConnectionRegistry,
}

impl TypingRelay {
    pub fn new(registry: ConnectionRegistry) -> Self {
        Self { registry }
    }

    /// Forward the signal if the receiver is online; drop it otherwise.
    pub async fn set_typing(&self, sender: &UserId, receiver: &UserId, is_typing: bool) -> Delivery {
        self.registry
            .push_best_effort(
                receiver,
                ServerEvent::TypingChanged {
                    sender_identity: sender.clone(),
                    is_typing,
                },
            )
            .await
    }
}
