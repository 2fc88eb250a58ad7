//! Append and fetch operations for chat messages.
//!
//! Appends assign id and timestamp inside the store so callers cannot
//! backdate a message.  `created_at` is clamped to the newest stored value,
//! which keeps the column non-decreasing even if the wall clock steps
//! backwards; equal timestamps fall back to insertion order via `rowid`.

use chrono::{DateTime, SecondsFormat, Timelike, Utc};
use rusqlite::params;
use uuid::Uuid;

use palaver_shared::{Message, MessageBody, Scope};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::NewMessage;

impl Database {
    /// Append a message to the public room.
    ///
    /// Any recipient on `new` is ignored; public messages have none.
    pub fn append_public(&self, new: NewMessage) -> Result<Message> {
        let message = Message {
            id: Uuid::new_v4(),
            scope: Scope::Public,
            sender_id: new.sender.id,
            sender_name: new.sender.name,
            recipient_id: None,
            recipient_name: None,
            body: new.body,
            created_at: self.next_created_at()?,
        };
        self.insert_message(&message)?;
        Ok(message)
    }

    /// Append a message to a private conversation.
    pub fn append_private(&self, new: NewMessage) -> Result<Message> {
        let recipient = new.recipient.ok_or(StoreError::MissingRecipient)?;
        let message = Message {
            id: Uuid::new_v4(),
            scope: Scope::Private,
            sender_id: new.sender.id,
            sender_name: new.sender.name,
            recipient_id: Some(recipient.id),
            recipient_name: Some(recipient.name),
            body: new.body,
            created_at: self.next_created_at()?,
        };
        self.insert_message(&message)?;
        Ok(message)
    }

    /// The newest `limit` public messages, oldest first.
    pub fn list_public(&self, limit: u32) -> Result<Vec<Message>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, scope, sender_id, sender_name, recipient_id, recipient_name,
                    kind, content, voice_url, created_at
             FROM messages
             WHERE scope = 'public'
             ORDER BY created_at DESC, rowid DESC
             LIMIT ?1",
        )?;

        let rows = stmt.query_map(params![limit], row_to_message)?;

        let mut messages = Vec::new();
        for row in rows {
            messages.push(row?);
        }
        messages.reverse();
        Ok(messages)
    }

    /// The newest `limit` private messages between `user_a` and `user_b`,
    /// oldest first.  Both directions of the pair count as one conversation,
    /// so the argument order does not matter.
    pub fn list_private(&self, user_a: &str, user_b: &str, limit: u32) -> Result<Vec<Message>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, scope, sender_id, sender_name, recipient_id, recipient_name,
                    kind, content, voice_url, created_at
             FROM messages
             WHERE scope = 'private'
               AND ((sender_id = ?1 AND recipient_id = ?2)
                 OR (sender_id = ?2 AND recipient_id = ?1))
             ORDER BY created_at DESC, rowid DESC
             LIMIT ?3",
        )?;

        let rows = stmt.query_map(params![user_a, user_b, limit], row_to_message)?;

        let mut messages = Vec::new();
        for row in rows {
            messages.push(row?);
        }
        messages.reverse();
        Ok(messages)
    }

    /// Raw insert of a fully-formed message.  Only the append helpers (and
    /// their tests) call this; it performs no timestamp clamping.
    fn insert_message(&self, message: &Message) -> Result<()> {
        let (kind, content, voice_url) = match &message.body {
            MessageBody::Text { content } => ("text", Some(content.as_str()), None),
            MessageBody::Voice { voice_url } => ("voice", None, Some(voice_url.as_str())),
        };

        self.conn().execute(
            "INSERT INTO messages (id, scope, sender_id, sender_name, recipient_id,
                                   recipient_name, kind, content, voice_url, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                message.id.to_string(),
                message.scope.as_str(),
                message.sender_id,
                message.sender_name,
                message.recipient_id,
                message.recipient_name,
                kind,
                content,
                voice_url,
                to_db_timestamp(message.created_at),
            ],
        )?;
        Ok(())
    }

    /// Timestamp for the next append: wall clock, clamped so it never falls
    /// below the newest stored `created_at`.
    fn next_created_at(&self) -> Result<DateTime<Utc>> {
        let newest: Option<String> =
            self.conn()
                .query_row("SELECT MAX(created_at) FROM messages", [], |row| row.get(0))?;

        let now = truncate_to_micros(Utc::now());
        match newest {
            Some(ts) => {
                let newest = DateTime::parse_from_rfc3339(&ts)?.with_timezone(&Utc);
                Ok(now.max(newest))
            }
            None => Ok(now),
        }
    }
}

/// Fixed-width RFC-3339 with microseconds, e.g. `2025-03-01T09:30:00.000000Z`.
/// Constant width makes the TEXT column's lexicographic order temporal.
fn to_db_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Drop sub-microsecond precision so an in-memory message compares equal to
/// its stored-and-reloaded copy.
fn truncate_to_micros(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.with_nanosecond(ts.nanosecond() / 1_000 * 1_000).unwrap_or(ts)
}

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    let id_str: String = row.get(0)?;
    let scope_str: String = row.get(1)?;
    let sender_id: String = row.get(2)?;
    let sender_name: String = row.get(3)?;
    let recipient_id: Option<String> = row.get(4)?;
    let recipient_name: Option<String> = row.get(5)?;
    let kind: String = row.get(6)?;
    let content: Option<String> = row.get(7)?;
    let voice_url: Option<String> = row.get(8)?;
    let ts_str: String = row.get(9)?;

    let id = Uuid::parse_str(&id_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let scope = Scope::parse(&scope_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            1,
            rusqlite::types::Type::Text,
            format!("unknown scope {scope_str:?}").into(),
        )
    })?;

    // The CHECK constraints guarantee the matching column is populated.
    let body = match kind.as_str() {
        "text" => MessageBody::Text {
            content: content.unwrap_or_default(),
        },
        "voice" => MessageBody::Voice {
            voice_url: voice_url.unwrap_or_default(),
        },
        other => {
            return Err(rusqlite::Error::FromSqlConversionFailure(
                6,
                rusqlite::types::Type::Text,
                format!("unknown message kind {other:?}").into(),
            ))
        }
    };

    let created_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&ts_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(9, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(Message {
        id,
        scope,
        sender_id,
        sender_name,
        recipient_id,
        recipient_name,
        body,
        created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use palaver_shared::Participant;

    fn open_test_db() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("test.db")).unwrap();
        (dir, db)
    }

    fn alice() -> Participant {
        Participant::new("u-alice", "Alice")
    }

    fn bob() -> Participant {
        Participant::new("u-bob", "Bob")
    }

    fn carol() -> Participant {
        Participant::new("u-carol", "Carol")
    }

    fn text_of(message: &Message) -> &str {
        match &message.body {
            MessageBody::Text { content } => content,
            MessageBody::Voice { .. } => panic!("expected a text message"),
        }
    }

    fn public_at(db: &Database, content: &str, created_at: DateTime<Utc>) -> Message {
        let message = Message {
            id: Uuid::new_v4(),
            scope: Scope::Public,
            sender_id: "u-alice".into(),
            sender_name: "Alice".into(),
            recipient_id: None,
            recipient_name: None,
            body: MessageBody::text(content),
            created_at,
        };
        db.insert_message(&message).unwrap();
        message
    }

    #[test]
    fn public_messages_come_back_oldest_first() {
        let (_dir, db) = open_test_db();

        let m1 = db.append_public(NewMessage::public_text(alice(), "one")).unwrap();
        let m2 = db.append_public(NewMessage::public_text(bob(), "two")).unwrap();
        let m3 = db.append_public(NewMessage::public_text(alice(), "three")).unwrap();

        assert!(m1.created_at <= m2.created_at);
        assert!(m2.created_at <= m3.created_at);

        let listed = db.list_public(10).unwrap();
        assert_eq!(listed, vec![m1, m2, m3]);
    }

    #[test]
    fn public_fetch_limit_keeps_the_newest() {
        let (_dir, db) = open_test_db();

        for i in 0..5 {
            db.append_public(NewMessage::public_text(alice(), format!("m{i}")))
                .unwrap();
        }

        let listed = db.list_public(2).unwrap();
        let texts: Vec<&str> = listed.iter().map(text_of).collect();
        assert_eq!(texts, ["m3", "m4"]);
    }

    #[test]
    fn equal_timestamps_keep_insertion_order() {
        let (_dir, db) = open_test_db();
        let ts = truncate_to_micros(Utc::now());

        for i in 0..3 {
            public_at(&db, &format!("m{i}"), ts);
        }

        let listed = db.list_public(10).unwrap();
        let texts: Vec<&str> = listed.iter().map(text_of).collect();
        assert_eq!(texts, ["m0", "m1", "m2"]);

        // A limited fetch of a tie keeps the newest inserts.
        let last_two = db.list_public(2).unwrap();
        let texts: Vec<&str> = last_two.iter().map(text_of).collect();
        assert_eq!(texts, ["m1", "m2"]);
    }

    #[test]
    fn append_never_goes_below_newest_stored_timestamp() {
        let (_dir, db) = open_test_db();

        let future = truncate_to_micros(Utc::now() + chrono::Duration::hours(1));
        let planted = public_at(&db, "from the future", future);

        let next = db.append_public(NewMessage::public_text(bob(), "after")).unwrap();
        assert!(next.created_at >= planted.created_at);

        let listed = db.list_public(10).unwrap();
        assert_eq!(listed.last().map(|m| m.id), Some(next.id));
    }

    #[test]
    fn private_pair_sees_both_directions_only() {
        let (_dir, db) = open_test_db();

        let a2b = db
            .append_private(NewMessage::private_text(alice(), bob(), "a to b"))
            .unwrap();
        let b2a = db
            .append_private(NewMessage::private_text(bob(), alice(), "b to a"))
            .unwrap();
        let a2c = db
            .append_private(NewMessage::private_text(alice(), carol(), "a to c"))
            .unwrap();
        db.append_public(NewMessage::public_text(alice(), "hello room"))
            .unwrap();

        let ab = db.list_private("u-alice", "u-bob", 10).unwrap();
        assert_eq!(ab, vec![a2b, b2a]);

        // Same pair queried with the arguments swapped.
        let ba = db.list_private("u-bob", "u-alice", 10).unwrap();
        assert_eq!(ba, ab);

        let ac = db.list_private("u-alice", "u-carol", 10).unwrap();
        assert_eq!(ac, vec![a2c]);
    }

    #[test]
    fn public_listing_excludes_private_messages() {
        let (_dir, db) = open_test_db();

        db.append_private(NewMessage::private_text(alice(), bob(), "secret"))
            .unwrap();
        let open = db.append_public(NewMessage::public_text(alice(), "open")).unwrap();

        let listed = db.list_public(10).unwrap();
        assert_eq!(listed, vec![open]);
    }

    #[test]
    fn private_append_requires_recipient() {
        let (_dir, db) = open_test_db();

        let mut msg = NewMessage::private_text(alice(), bob(), "x");
        msg.recipient = None;

        let err = db.append_private(msg).unwrap_err();
        assert!(matches!(err, StoreError::MissingRecipient));
        assert!(db.list_private("u-alice", "u-bob", 10).unwrap().is_empty());
    }

    #[test]
    fn public_append_drops_any_recipient() {
        let (_dir, db) = open_test_db();

        let mut msg = NewMessage::public_text(alice(), "open");
        msg.recipient = Some(bob());

        let stored = db.append_public(msg).unwrap();
        assert_eq!(stored.scope, Scope::Public);
        assert!(stored.recipient_id.is_none());
        assert!(stored.recipient_name.is_none());
    }

    #[test]
    fn voice_message_keeps_its_url() {
        let (_dir, db) = open_test_db();
        let url = "http://localhost:8080/attachments/private/1-a-u-alice-u-bob.webm";

        let sent = db
            .append_private(NewMessage::private_voice(alice(), bob(), url))
            .unwrap();

        let listed = db.list_private("u-alice", "u-bob", 10).unwrap();
        assert_eq!(listed[0].id, sent.id);
        assert_eq!(listed[0].body, MessageBody::voice(url));
    }

    #[test]
    fn self_conversation_is_a_valid_pair() {
        let (_dir, db) = open_test_db();

        db.append_private(NewMessage::private_text(alice(), alice(), "note to self"))
            .unwrap();

        let own = db.list_private("u-alice", "u-alice", 10).unwrap();
        assert_eq!(own.len(), 1);

        // It must not leak into conversations with anyone else.
        assert!(db.list_private("u-alice", "u-bob", 10).unwrap().is_empty());
    }
}
