use chrono::Utc;
use rusqlite::{params, OptionalExtension};

use hearth_shared::types::{MessageId, UserId};

use crate::database::Database;
use crate::error::Result;
use crate::models::Message;
use crate::row::{timestamp_at, uuid_at};

impl Database {
    /// Append a new unread message. There is no dedup key: submitting the
    /// same content twice yields two rows.
    pub fn create_message(
        &self,
        sender_id: &UserId,
        receiver_id: &UserId,
        content: &str,
    ) -> Result<Message> {
        let message = Message {
            id: MessageId::new(),
            content: content.to_string(),
            sender_id: sender_id.clone(),
            receiver_id: receiver_id.clone(),
            created_at: Utc::now(),
            is_read: false,
        };

        self.conn().execute(
            "INSERT INTO messages (id, sender_id, receiver_id, content, is_read, created_at)
             VALUES (?1, ?2, ?3, ?4, 0, ?5)",
            params![
                message.id.0.to_string(),
                message.sender_id.as_str(),
                message.receiver_id.as_str(),
                message.content,
                message.created_at.to_rfc3339(),
            ],
        )?;

        Ok(message)
    }

    /// Flip `is_read` to true. Returns the number of rows that actually
    /// changed, so an already-read or unknown message yields 0.
    pub fn update_message_read(&self, id: MessageId) -> Result<usize> {
        let affected = self.conn().execute(
            "UPDATE messages SET is_read = 1 WHERE id = ?1 AND is_read = 0",
            params![id.0.to_string()],
        )?;
        Ok(affected)
    }

    pub fn find_message_by_id(&self, id: MessageId) -> Result<Option<Message>> {
        let message = self
            .conn()
            .query_row(
                "SELECT id, sender_id, receiver_id, content, is_read, created_at
                 FROM messages WHERE id = ?1",
                params![id.0.to_string()],
                row_to_message,
            )
            .optional()?;
        Ok(message)
    }
}

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    Ok(Message {
        id: MessageId(uuid_at(row, 0)?),
        sender_id: UserId(row.get(1)?),
        receiver_id: UserId(row.get(2)?),
        content: row.get(3)?,
        is_read: row.get(4)?,
        created_at: timestamp_at(row, 5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> UserId {
        UserId::from("alice")
    }

    fn bob() -> UserId {
        UserId::from("bob")
    }

    #[test]
    fn create_and_find() {
        let db = Database::open_in_memory().unwrap();
        let created = db.create_message(&alice(), &bob(), "hi").unwrap();

        let found = db.find_message_by_id(created.id).unwrap().unwrap();
        assert_eq!(found.content, "hi");
        assert_eq!(found.sender_id, alice());
        assert_eq!(found.receiver_id, bob());
        assert!(!found.is_read);
    }

    #[test]
    fn find_missing_is_none() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.find_message_by_id(MessageId::new()).unwrap().is_none());
    }

    #[test]
    fn duplicate_sends_create_duplicate_rows() {
        let db = Database::open_in_memory().unwrap();
        let first = db.create_message(&alice(), &bob(), "again").unwrap();
        let second = db.create_message(&alice(), &bob(), "again").unwrap();
        assert_ne!(first.id, second.id);

        let count: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn update_read_is_one_way_and_idempotent() {
        let db = Database::open_in_memory().unwrap();
        let msg = db.create_message(&alice(), &bob(), "read me").unwrap();

        assert_eq!(db.update_message_read(msg.id).unwrap(), 1);
        assert_eq!(db.update_message_read(msg.id).unwrap(), 0);
        assert!(db.find_message_by_id(msg.id).unwrap().unwrap().is_read);
    }

    #[test]
    fn update_read_unknown_message_affects_nothing() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.update_message_read(MessageId::new()).unwrap(), 0);
    }
}
