//! v001 -- Initial schema creation.
//!
//! Creates the `messages` table and its two query indexes.  Public and
//! private messages share the table; the `scope` column plus CHECK
//! constraints keep the shapes apart.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Messages
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS messages (
    id             TEXT PRIMARY KEY NOT NULL,  -- UUID v4
    scope          TEXT NOT NULL,              -- 'public' | 'private'
    sender_id      TEXT NOT NULL,
    sender_name    TEXT NOT NULL,
    recipient_id   TEXT,                       -- NULL for public messages
    recipient_name TEXT,
    kind           TEXT NOT NULL,              -- 'text' | 'voice'
    content        TEXT,                       -- text body
    voice_url      TEXT,                       -- voice attachment URL
    created_at     TEXT NOT NULL,              -- RFC-3339, fixed width

    CHECK (scope IN ('public', 'private')),
    CHECK (kind IN ('text', 'voice')),
    CHECK ((scope = 'private') = (recipient_id IS NOT NULL)),
    CHECK ((scope = 'private') = (recipient_name IS NOT NULL)),
    CHECK ((kind = 'text') = (content IS NOT NULL)),
    CHECK ((kind = 'voice') = (voice_url IS NOT NULL))
);

-- Public room reads: the newest slice of one scope.
CREATE INDEX IF NOT EXISTS idx_messages_scope_ts
    ON messages(scope, created_at DESC);

-- Private pair reads: either direction of (sender, recipient).
CREATE INDEX IF NOT EXISTS idx_messages_pair_ts
    ON messages(sender_id, recipient_id, created_at DESC);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
