//! Domain model structs persisted in the SQLite database.
//!
//! `Message` and `Notification` live in `hearth-shared` because they are
//! pushed to clients verbatim; they are re-exported here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use hearth_shared::models::{Message, Notification, NotificationKind};
use hearth_shared::types::{NotificationId, UserId};

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// A known user. The username is display data only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub username: String,
    /// When this user was first seen.
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// NotificationReceiver
// ---------------------------------------------------------------------------

/// Join row between a notification and one recipient.
///
/// At most one row exists per (notification, user) pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NotificationReceiver {
    pub id: Uuid,
    pub notification_id: NotificationId,
    pub user_id: UserId,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// A notification as seen by one recipient, with that recipient's read flag.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NotificationEntry {
    #[serde(flatten)]
    pub notification: Notification,
    pub is_read: bool,
}
