//! Read receipts.

use tracing::debug;

use hearth_shared::protocol::ServerEvent;
use hearth_shared::types::{MessageId, UserId};

use crate::error::ServerError;
use crate::registry::{ConnectionRegistry, Delivery};
use crate::storage::BlockingStore;

#[derive(Clone)]
pub struct ReadReceiptPropagator {
    store: BlockingStore,
    registry: ConnectionRegistry,
}

impl ReadReceiptPropagator {
    pub fn new(store: BlockingStore, registry: ConnectionRegistry) -> Self {
        Self { store, registry }
    }

    /// Flip the read flag and tell the original sender.
    ///
    /// Already-read and unknown ids both touch zero rows and succeed
    /// silently, so a repeated mark emits no second receipt.
    pub async fn mark_read(
        &self,
        reader: &UserId,
        message_id: MessageId,
    ) -> Result<Option<Delivery>, ServerError> {
        let flipped = self
            .store
            .run(move |s| s.update_message_read(message_id))
            .await?;
        if flipped == 0 {
            debug!(message = %message_id, reader = %reader.short(), "Nothing to mark read");
            return Ok(None);
        }

        let found = self
            .store
            .run(move |s| s.find_message_by_id(message_id))
            .await?;
        let Some(message) = found else {
            return Ok(None);
        };

        if &message.sender_id == reader {
            return Ok(None);
        }

        let delivery = self
            .registry
            .push_best_effort(&message.sender_id, ServerEvent::MessageRead { message_id })
            .await;

        debug!(
            message = %message_id,
            reader = %reader.short(),
            sender = %message.sender_id.short(),
            delivery = ?delivery,
            "Read receipt"
        );

        Ok(Some(delivery))
    }
}
