use chrono::Utc;
use rusqlite::params;
use uuid::Uuid;

use hearth_shared::types::{NotificationId, UserId};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{Notification, NotificationEntry, NotificationKind, NotificationReceiver};
use crate::row::{opt_uuid_at, timestamp_at, uuid_at};

impl Database {
    pub fn create_notification(
        &self,
        kind: NotificationKind,
        actor_id: Option<&UserId>,
        entity_id: Option<Uuid>,
    ) -> Result<Notification> {
        let notification = Notification {
            id: NotificationId::new(),
            kind,
            entity_id,
            actor_id: actor_id.cloned(),
            created_at: Utc::now(),
        };

        self.conn().execute(
            "INSERT INTO notifications (id, kind, entity_id, actor_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                notification.id.0.to_string(),
                notification.kind.as_str(),
                notification.entity_id.map(|id| id.to_string()),
                notification.actor_id.as_ref().map(UserId::as_str),
                notification.created_at.to_rfc3339(),
            ],
        )?;

        Ok(notification)
    }

    /// Insert one unread receiver row per recipient in a single transaction.
    ///
    /// A recipient that already has a row for this notification is skipped.
    /// Returns the number of rows inserted.
    pub fn create_notification_receivers(
        &self,
        notification_id: NotificationId,
        recipient_ids: &[UserId],
    ) -> Result<usize> {
        let tx = self.conn().unchecked_transaction()?;
        let now = Utc::now().to_rfc3339();
        let mut inserted = 0;

        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO notification_receivers
                     (id, notification_id, user_id, is_read, created_at)
                 VALUES (?1, ?2, ?3, 0, ?4)",
            )?;
            for user_id in recipient_ids {
                inserted += stmt.execute(params![
                    Uuid::new_v4().to_string(),
                    notification_id.0.to_string(),
                    user_id.as_str(),
                    now,
                ])?;
            }
        }

        tx.commit()?;
        Ok(inserted)
    }

    pub fn count_unread_notifications(&self, user_id: &UserId) -> Result<u64> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM notification_receivers WHERE user_id = ?1 AND is_read = 0",
            params![user_id.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Flip every unread receiver row for the user. Zero rows is fine.
    pub fn mark_all_notifications_read(&self, user_id: &UserId) -> Result<usize> {
        let affected = self.conn().execute(
            "UPDATE notification_receivers SET is_read = 1 WHERE user_id = ?1 AND is_read = 0",
            params![user_id.as_str()],
        )?;
        Ok(affected)
    }

    /// Newest notifications addressed to the user, with that user's read flag.
    pub fn list_notifications(&self, user_id: &UserId, limit: u32) -> Result<Vec<NotificationEntry>> {
        let mut stmt = self.conn().prepare(
            "SELECT n.id, n.kind, n.entity_id, n.actor_id, n.created_at, r.is_read
             FROM notification_receivers r
             JOIN notifications n ON n.id = r.notification_id
             WHERE r.user_id = ?1
             ORDER BY n.created_at DESC
             LIMIT ?2",
        )?;

        let rows = stmt.query_map(params![user_id.as_str(), limit], |row| {
            Ok((row_to_notification(row)?, row.get::<_, bool>(5)?))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (notification, is_read) = row?;
            entries.push(NotificationEntry {
                notification: notification?,
                is_read,
            });
        }
        Ok(entries)
    }

    pub fn get_notification_receivers(
        &self,
        notification_id: NotificationId,
    ) -> Result<Vec<NotificationReceiver>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, notification_id, user_id, is_read, created_at
             FROM notification_receivers WHERE notification_id = ?1
             ORDER BY user_id ASC",
        )?;

        let rows = stmt.query_map(params![notification_id.0.to_string()], |row| {
            Ok(NotificationReceiver {
                id: uuid_at(row, 0)?,
                notification_id: NotificationId(uuid_at(row, 1)?),
                user_id: UserId(row.get(2)?),
                is_read: row.get(3)?,
                created_at: timestamp_at(row, 4)?,
            })
        })?;

        let mut receivers = Vec::new();
        for row in rows {
            receivers.push(row?);
        }
        Ok(receivers)
    }
}

// The kind column is validated outside rusqlite so an unknown value surfaces
// as `StoreError::InvalidValue` instead of a conversion failure.
fn row_to_notification(row: &rusqlite::Row<'_>) -> rusqlite::Result<Result<Notification>> {
    let kind_str: String = row.get(1)?;
    let Some(kind) = NotificationKind::parse(&kind_str) else {
        return Ok(Err(StoreError::InvalidValue(format!(
            "unknown notification kind '{kind_str}'"
        ))));
    };

    let actor: Option<String> = row.get(3)?;

    Ok(Ok(Notification {
        id: NotificationId(uuid_at(row, 0)?),
        kind,
        entity_id: opt_uuid_at(row, 2)?,
        actor_id: actor.map(UserId),
        created_at: timestamp_at(row, 4)?,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(names: &[&str]) -> Vec<UserId> {
        names.iter().map(|n| UserId::from(*n)).collect()
    }

    #[test]
    fn fanout_creates_one_row_per_recipient() {
        let db = Database::open_in_memory().unwrap();
        let actor = UserId::from("a");
        let n = db
            .create_notification(NotificationKind::Comment, Some(&actor), Some(Uuid::new_v4()))
            .unwrap();

        let inserted = db.create_notification_receivers(n.id, &ids(&["b", "c"])).unwrap();
        assert_eq!(inserted, 2);

        let receivers = db.get_notification_receivers(n.id).unwrap();
        assert_eq!(receivers.len(), 2);
        assert!(receivers.iter().all(|r| !r.is_read));
        assert_eq!(receivers[0].user_id, UserId::from("b"));
        assert_eq!(receivers[1].user_id, UserId::from("c"));
    }

    #[test]
    fn duplicate_recipient_gets_single_row() {
        let db = Database::open_in_memory().unwrap();
        let n = db.create_notification(NotificationKind::Follow, None, None).unwrap();

        let inserted = db
            .create_notification_receivers(n.id, &ids(&["b", "b"]))
            .unwrap();
        assert_eq!(inserted, 1);
        assert_eq!(db.count_unread_notifications(&UserId::from("b")).unwrap(), 1);
    }

    #[test]
    fn unread_count_and_mark_all_read() {
        let db = Database::open_in_memory().unwrap();
        let b = UserId::from("b");

        for _ in 0..3 {
            let n = db
                .create_notification(NotificationKind::Like, Some(&UserId::from("a")), None)
                .unwrap();
            db.create_notification_receivers(n.id, &[b.clone()]).unwrap();
        }
        assert_eq!(db.count_unread_notifications(&b).unwrap(), 3);

        assert_eq!(db.mark_all_notifications_read(&b).unwrap(), 3);
        assert_eq!(db.count_unread_notifications(&b).unwrap(), 0);

        // Nothing left to flip; still succeeds.
        assert_eq!(db.mark_all_notifications_read(&b).unwrap(), 0);
    }

    #[test]
    fn mark_all_read_only_touches_that_user() {
        let db = Database::open_in_memory().unwrap();
        let n = db.create_notification(NotificationKind::Like, None, None).unwrap();
        db.create_notification_receivers(n.id, &ids(&["b", "c"])).unwrap();

        db.mark_all_notifications_read(&UserId::from("b")).unwrap();

        assert_eq!(db.count_unread_notifications(&UserId::from("b")).unwrap(), 0);
        assert_eq!(db.count_unread_notifications(&UserId::from("c")).unwrap(), 1);
    }

    #[test]
    fn list_notifications_carries_read_flag() {
        let db = Database::open_in_memory().unwrap();
        let b = UserId::from("b");
        let post = Uuid::new_v4();

        let n = db
            .create_notification(NotificationKind::Like, Some(&UserId::from("a")), Some(post))
            .unwrap();
        db.create_notification_receivers(n.id, &[b.clone()]).unwrap();

        let entries = db.list_notifications(&b, 10).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].notification, n);
        assert!(!entries[0].is_read);

        db.mark_all_notifications_read(&b).unwrap();
        assert!(db.list_notifications(&b, 10).unwrap()[0].is_read);
    }

    #[test]
    fn list_notifications_respects_limit() {
        let db = Database::open_in_memory().unwrap();
        let b = UserId::from("b");
        for _ in 0..5 {
            let n = db.create_notification(NotificationKind::Follow, None, None).unwrap();
            db.create_notification_receivers(n.id, &[b.clone()]).unwrap();
        }
        assert_eq!(db.list_notifications(&b, 2).unwrap().len(), 2);
    }

    #[test]
    fn list_notifications_newest_first() {
        let db = Database::open_in_memory().unwrap();
        let b = UserId::from("b");
        let created = [
            NotificationKind::Follow,
            NotificationKind::Like,
            NotificationKind::Comment,
        ];
        for kind in created {
            let n = db.create_notification(kind, None, None).unwrap();
            db.create_notification_receivers(n.id, &[b.clone()]).unwrap();
            std::thread::sleep(std::time::Duration::from_millis(5));
        }

        let kinds: Vec<NotificationKind> = db
            .list_notifications(&b, 10)
            .unwrap()
            .into_iter()
            .map(|entry| entry.notification.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                NotificationKind::Comment,
                NotificationKind::Like,
                NotificationKind::Follow,
            ]
        );

        // The limit keeps the newest rows.
        let newest = db.list_notifications(&b, 1).unwrap();
        assert_eq!(newest[0].notification.kind, NotificationKind::Comment);
    }

    #[test]
    fn unknown_kind_is_reported() {
        let db = Database::open_in_memory().unwrap();
        let b = UserId::from("b");
        let n = db.create_notification(NotificationKind::Like, None, None).unwrap();
        db.create_notification_receivers(n.id, &[b.clone()]).unwrap();
        db.conn()
            .execute("UPDATE notifications SET kind = 'poke'", [])
            .unwrap();

        assert!(matches!(
            db.list_notifications(&b, 10),
            Err(StoreError::InvalidValue(_))
        ));
    }
}
