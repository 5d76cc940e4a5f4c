use rusqlite::Connection;

const UP_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS notifications (
    id         TEXT PRIMARY KEY NOT NULL,     -- UUID v4
    kind       TEXT NOT NULL,                 -- like | comment | follow | message
    entity_id  TEXT,                          -- referenced post, if any
    actor_id   TEXT,                          -- who triggered it
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS notification_receivers (
    id              TEXT PRIMARY KEY NOT NULL,  -- UUID v4
    notification_id TEXT NOT NULL,              -- FK -> notifications(id)
    user_id         TEXT NOT NULL,
    is_read         INTEGER NOT NULL DEFAULT 0,
    created_at      TEXT NOT NULL,

    FOREIGN KEY (notification_id) REFERENCES notifications(id) ON DELETE CASCADE
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_receivers_unique
    ON notification_receivers(notification_id, user_id);
CREATE INDEX IF NOT EXISTS idx_receivers_user_unread
    ON notification_receivers(user_id, is_read);
"#;

pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
