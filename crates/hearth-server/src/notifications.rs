//! Notification fanout and per-user read state.
//!
//! A trigger persists one notification plus one unread receiver row per
//! recipient, then signals recipients that are connected at that moment.
//! Offline recipients find out on their next unread-count fetch.

use std::collections::BTreeSet;

use tracing::{debug, info};
use uuid::Uuid;

use hearth_shared::models::{Notification, NotificationKind};
use hearth_shared::protocol::ServerEvent;
use hearth_shared::types::UserId;
use hearth_store::NotificationEntry;

use crate::error::ServerError;
use crate::registry::{ConnectionRegistry, Delivery};
use crate::storage::BlockingStore;

/// What one fanout persisted and how many live connections it reached.
#[derive(Debug, Clone)]
pub struct FanoutOutcome {
    pub notification: Notification,
    pub recipients: Vec<UserId>,
    pub signalled: usize,
}

#[derive(Clone)]
pub struct NotificationFanout {
    store: BlockingStore,
    registry: ConnectionRegistry,
}

impl NotificationFanout {
    pub fn new(store: BlockingStore, registry: ConnectionRegistry) -> Self {
        Self { store, registry }
    }

    /// Persist and signal a notification.
    ///
    /// The actor is never its own recipient; if nobody is left after
    /// removing it (e.g. liking your own post) nothing is written and
    /// `None` is returned.
    pub async fn notify(
        &self,
        kind: NotificationKind,
        actor: &UserId,
        recipients: &[UserId],
        entity_id: Option<Uuid>,
    ) -> Result<Option<FanoutOutcome>, ServerError> {
        let recipients: Vec<UserId> = recipients
            .iter()
            .filter(|id| *id != actor)
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        if recipients.is_empty() {
            debug!(actor = %actor.short(), kind = %kind, "No recipients, skipping notification");
            return Ok(None);
        }

        let notification = self
            .store
            .run({
                let actor = actor.clone();
                move |s| s.create_notification(kind, Some(&actor), entity_id)
            })
            .await?;
        self.store
            .run({
                let id = notification.id;
                let recipients = recipients.clone();
                move |s| s.create_notification_receivers(id, &recipients)
            })
            .await?;

        let mut signalled = 0;
        for recipient in &recipients {
            if self
                .registry
                .push_best_effort(recipient, ServerEvent::NotificationAvailable)
                .await
                == Delivery::Delivered
            {
                signalled += 1;
            }
        }

        info!(
            notification = %notification.id,
            kind = %kind,
            actor = %actor.short(),
            recipients = recipients.len(),
            signalled,
            "Notification fanned out"
        );

        Ok(Some(FanoutOutcome {
            notification,
            recipients,
            signalled,
        }))
    }

    pub async fn unread_count(&self, identity: &UserId) -> Result<u64, ServerError> {
        let identity = identity.clone();
        self.store
            .run(move |s| s.count_unread_notifications(&identity))
            .await
    }

    /// Flip every unread notification for the user. Succeeds with nothing
    /// to flip.
    pub async fn mark_all_read(&self, identity: &UserId) -> Result<(), ServerError> {
        let owned = identity.clone();
        self.store
            .run(move |s| s.mark_all_notifications_read(&owned))
            .await?;
        debug!(user = %identity.short(), "Marked all notifications read");
        Ok(())
    }

    pub async fn list(
        &self,
        identity: &UserId,
        limit: u32,
    ) -> Result<Vec<NotificationEntry>, ServerError> {
        let identity = identity.clone();
        self.store
            .run(move |s| s.list_notifications(&identity, limit))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ConnectionHandle;
    use hearth_store::SharedDatabase;
    use std::sync::Arc;

    fn setup() -> (NotificationFanout, SharedDatabase, ConnectionRegistry) {
        let db = SharedDatabase::open_in_memory().unwrap();
        let registry = ConnectionRegistry::new();
        let store = BlockingStore::new(Arc::new(db.clone()));
        let fanout = NotificationFanout::new(store, registry.clone());
        (fanout, db, registry)
    }

    fn notification_count(db: &SharedDatabase) -> i64 {
        db.lock()
            .unwrap()
            .conn()
            .query_row("SELECT COUNT(*) FROM notifications", [], |row| row.get(0))
            .unwrap()
    }

    #[tokio::test]
    async fn test_one_notification_many_receivers() {
        let (fanout, db, _registry) = setup();
        let a = UserId::from("a");

        let outcome = fanout
            .notify(
                NotificationKind::Comment,
                &a,
                &[UserId::from("b"), UserId::from("c")],
                Some(Uuid::new_v4()),
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(notification_count(&db), 1);
        let receivers = db
            .lock()
            .unwrap()
            .get_notification_receivers(outcome.notification.id)
            .unwrap();
        assert_eq!(receivers.len(), 2);
        assert!(receivers.iter().all(|r| !r.is_read));
        assert_eq!(outcome.notification.actor_id, Some(a));
    }

    #[tokio::test]
    async fn test_self_notification_is_skipped() {
        let (fanout, db, _registry) = setup();
        let a = UserId::from("a");

        let outcome = fanout
            .notify(NotificationKind::Like, &a, &[a.clone()], None)
            .await
            .unwrap();

        assert!(outcome.is_none());
        assert_eq!(notification_count(&db), 0);
        assert_eq!(fanout.unread_count(&a).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_actor_removed_from_mixed_recipients() {
        let (fanout, _db, _registry) = setup();
        let a = UserId::from("a");

        let outcome = fanout
            .notify(
                NotificationKind::Follow,
                &a,
                &[a.clone(), UserId::from("b"), UserId::from("b")],
                None,
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(outcome.recipients, vec![UserId::from("b")]);
    }

    #[tokio::test]
    async fn test_only_connected_recipients_are_signalled() {
        let (fanout, _db, registry) = setup();
        let (b, mut rx_b) = ConnectionHandle::open(UserId::from("b"), "b".into(), 8);
        registry.register(b).await;

        let outcome = fanout
            .notify(
                NotificationKind::Like,
                &UserId::from("a"),
                &[UserId::from("b"), UserId::from("c")],
                None,
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(outcome.signalled, 1);
        assert_eq!(rx_b.try_recv().unwrap(), ServerEvent::NotificationAvailable);
        assert_eq!(fanout.unread_count(&UserId::from("c")).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_mark_all_read_without_unread_rows() {
        let (fanout, _db, _registry) = setup();
        fanout.mark_all_read(&UserId::from("nobody")).await.unwrap();
    }
}
