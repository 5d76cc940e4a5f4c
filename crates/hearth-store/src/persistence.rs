//! The persistence boundary seen by the realtime layer.
//!
//! The server never touches [`Database`] directly; it holds an
//! `Arc<dyn Persistence>` so that each operation is an independent,
//! non-transactional call and tests can swap in failing stores.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use uuid::Uuid;

use hearth_shared::types::{MessageId, NotificationId, UserId};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{Message, Notification, NotificationEntry, NotificationKind};

pub trait Persistence: Send + Sync {
    /// Record (or refresh) the display name for an identity.
    fn ensure_user(&self, id: &UserId, username: &str) -> Result<()>;

    fn user_exists(&self, id: &UserId) -> Result<bool>;

    fn create_message(&self, sender_id: &UserId, receiver_id: &UserId, content: &str)
        -> Result<Message>;

    /// Number of rows flipped from unread to read.
    fn update_message_read(&self, id: MessageId) -> Result<usize>;

    fn find_message_by_id(&self, id: MessageId) -> Result<Option<Message>>;

    fn create_notification(
        &self,
        kind: NotificationKind,
        actor_id: Option<&UserId>,
        entity_id: Option<Uuid>,
    ) -> Result<Notification>;

    fn create_notification_receivers(
        &self,
        notification_id: NotificationId,
        recipient_ids: &[UserId],
    ) -> Result<()>;

    fn count_unread_notifications(&self, user_id: &UserId) -> Result<u64>;

    fn mark_all_notifications_read(&self, user_id: &UserId) -> Result<()>;

    fn list_notifications(&self, user_id: &UserId, limit: u32) -> Result<Vec<NotificationEntry>>;
}

/// A [`Database`] behind a mutex, shareable across connection tasks.
#[derive(Clone)]
pub struct SharedDatabase {
    inner: Arc<Mutex<Database>>,
}

impl SharedDatabase {
    pub fn new(db: Database) -> Self {
        Self {
            inner: Arc::new(Mutex::new(db)),
        }
    }

    pub fn open_at(path: &Path) -> Result<Self> {
        Ok(Self::new(Database::open_at(path)?))
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::new(Database::open_in_memory()?))
    }

    /// Lock the database for direct access (ad-hoc queries, tests).
    pub fn lock(&self) -> Result<MutexGuard<'_, Database>> {
        self.inner.lock().map_err(|_| StoreError::LockPoisoned)
    }
}

impl Persistence for SharedDatabase {
    fn ensure_user(&self, id: &UserId, username: &str) -> Result<()> {
        self.lock()?.ensure_user(id, username)
    }

    fn user_exists(&self, id: &UserId) -> Result<bool> {
        self.lock()?.user_exists(id)
    }

    fn create_message(
        &self,
        sender_id: &UserId,
        receiver_id: &UserId,
        content: &str,
    ) -> Result<Message> {
        self.lock()?.create_message(sender_id, receiver_id, content)
    }

    fn update_message_read(&self, id: MessageId) -> Result<usize> {
        self.lock()?.update_message_read(id)
    }

    fn find_message_by_id(&self, id: MessageId) -> Result<Option<Message>> {
        self.lock()?.find_message_by_id(id)
    }

    fn create_notification(
        &self,
        kind: NotificationKind,
        actor_id: Option<&UserId>,
        entity_id: Option<Uuid>,
    ) -> Result<Notification> {
        self.lock()?.create_notification(kind, actor_id, entity_id)
    }

    fn create_notification_receivers(
        &self,
        notification_id: NotificationId,
        recipient_ids: &[UserId],
    ) -> Result<()> {
        self.lock()?
            .create_notification_receivers(notification_id, recipient_ids)
            .map(|_| ())
    }

    fn count_unread_notifications(&self, user_id: &UserId) -> Result<u64> {
        self.lock()?.count_unread_notifications(user_id)
    }

    fn mark_all_notifications_read(&self, user_id: &UserId) -> Result<()> {
        self.lock()?.mark_all_notifications_read(user_id).map(|_| ())
    }

    fn list_notifications(&self, user_id: &UserId, limit: u32) -> Result<Vec<NotificationEntry>> {
        self.lock()?.list_notifications(user_id, limit)
    }
}
