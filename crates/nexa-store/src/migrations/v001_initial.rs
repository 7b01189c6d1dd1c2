//! v001 -- Initial schema creation.
//!
//! Creates the `kv_entries` table. Every collection (users, conversations,
//! messages, tasks, deals) and the session record live in it as one JSON
//! document per key.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS kv_entries (
    key        TEXT PRIMARY KEY NOT NULL,   -- namespaced, e.g. 'nexa_users'
    value      TEXT NOT NULL,               -- JSON document
    updated_at TEXT NOT NULL                -- RFC-3339
);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
