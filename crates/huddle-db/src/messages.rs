use rusqlite::OptionalExtension;
use tracing::{debug, info};

use huddle_types::models::{MessageId, ReactionId, RoomId, RoomUserId, UserId};

use crate::models::MessageRow;
use crate::{Database, DbError, Result};

/// Separates emoji inside the aggregated reaction column. ASCII unit
/// separator, which never appears in an emoji sequence.
const REACTION_SEPARATOR: char = '\u{1f}';

impl Database {
    /// Posts `text` as the member `room_user_id`. The membership must exist;
    /// otherwise the foreign key rejects the row.
    pub fn send_message(&self, room_user_id: RoomUserId, text: &str) -> Result<MessageId> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO message (room_user_id, text) VALUES (?1, ?2)",
                (room_user_id, text),
            )?;
            let message_id = conn.last_insert_rowid();
            info!(message_id, room_user_id, "Message sent");
            Ok(message_id)
        })
    }

    /// The whole transcript of a room, oldest first, with each sender's
    /// username and every reaction left on each message.
    ///
    /// `_user_id` identifies the viewer but does not narrow the result.
    pub fn get_messages_with_reactions_by_room_id(
        &self,
        room_id: RoomId,
        _user_id: UserId,
    ) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT m.message_id, m.room_user_id, u.username, m.text, m.sent_datetime,
                        GROUP_CONCAT(mr.emoji, char(31)) AS reactions
                 FROM message m
                 JOIN room_user ru ON m.room_user_id = ru.room_user_id
                 JOIN user u ON ru.user_id = u.user_id
                 LEFT JOIN message_reaction mr ON mr.message_id = m.message_id
                 WHERE ru.room_id = ?1
                 GROUP BY m.message_id
                 ORDER BY m.sent_datetime, m.message_id",
            )?;

            let rows = stmt
                .query_map([room_id], |row| {
                    let reactions: Option<String> = row.get(5)?;
                    Ok(MessageRow {
                        message_id: row.get(0)?,
                        room_user_id: row.get(1)?,
                        username: row.get(2)?,
                        text: row.get(3)?,
                        sent_datetime: row.get(4)?,
                        reactions: split_reactions(reactions),
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            debug!(room_id, count = rows.len(), "Loaded room transcript");
            Ok(rows)
        })
    }

    /// Records a reaction and returns its id. The same user may react with
    /// the same emoji more than once.
    pub fn add_reaction(&self, message_id: MessageId, user_id: UserId, emoji: &str) -> Result<ReactionId> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO message_reaction (message_id, user_id, emoji) VALUES (?1, ?2, ?3)",
                (message_id, user_id, emoji),
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// The room a message was posted in, `None` for an unknown message.
    pub fn get_message_room_id(&self, message_id: MessageId) -> Result<Option<RoomId>> {
        self.with_conn(|conn| {
            let room_id = conn
                .query_row(
                    "SELECT ru.room_id FROM message m
                     JOIN room_user ru ON m.room_user_id = ru.room_user_id
                     WHERE m.message_id = ?1",
                    [message_id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(room_id)
        })
    }

    /// Resolves the membership a message from `user_id` in `room_id` is
    /// attributed to. With duplicate memberships the oldest one wins.
    pub fn get_room_user_id(&self, room_id: RoomId, user_id: UserId) -> Result<RoomUserId> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT room_user_id FROM room_user
                 WHERE room_id = ?1 AND user_id = ?2
                 ORDER BY room_user_id
                 LIMIT 1",
                (room_id, user_id),
                |row| row.get(0),
            )
            .optional()?
            .ok_or(DbError::NotFound("room membership"))
        })
    }
}

fn split_reactions(joined: Option<String>) -> Vec<String> {
    joined
        .map(|s| s.split(REACTION_SEPARATOR).map(str::to_owned).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{db, message_at, room_with, user};

    #[test]
    fn send_message_to_unknown_membership_fails_on_constraint() {
        let db = db();
        let err = db.send_message(42, "anyone there?").unwrap_err();
        assert!(err.is_constraint_violation(), "unexpected error: {err}");
    }

    #[test]
    fn sent_message_shows_in_transcript() {
        let db = db();
        let a = user(&db, "ada");
        let (room_id, members) = room_with(&db, "g", &[a]);

        let id = db.send_message(members[0], "first!").unwrap();

        let messages = db.get_messages_with_reactions_by_room_id(room_id, a).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].message_id, id);
        assert_eq!(messages[0].username, "ada");
        assert_eq!(messages[0].text, "first!");
        assert!(messages[0].reactions.is_empty());
        assert_eq!(messages[0].sent_datetime.len(), "YYYY-MM-DD HH:MM:SS.SSS".len());
    }

    #[test]
    fn transcript_is_ordered_by_send_time() {
        let db = db();
        let a = user(&db, "ada");
        let g = user(&db, "grace");
        let (room_id, members) = room_with(&db, "g", &[a, g]);

        // ids deliberately out of time order
        message_at(&db, 10, members[0], "third", "2024-01-01 12:00:02.000");
        message_at(&db, 11, members[1], "first", "2024-01-01 12:00:00.000");
        message_at(&db, 12, members[0], "second", "2024-01-01 12:00:01.000");

        let texts: Vec<String> = db
            .get_messages_with_reactions_by_room_id(room_id, a)
            .unwrap()
            .into_iter()
            .map(|m| m.text)
            .collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
    }

    #[test]
    fn reactions_aggregate_onto_a_single_message() {
        let db = db();
        let a = user(&db, "ada");
        let g = user(&db, "grace");
        let (room_id, members) = room_with(&db, "g", &[a, g]);
        let id = db.send_message(members[0], "ship it").unwrap();

        db.add_reaction(id, a, "👍").unwrap();
        db.add_reaction(id, g, "❤️").unwrap();

        let messages = db.get_messages_with_reactions_by_room_id(room_id, g).unwrap();
        assert_eq!(messages.len(), 1);
        let mut reactions = messages[0].reactions.clone();
        reactions.sort();
        let mut expected = vec!["👍".to_string(), "❤️".to_string()];
        expected.sort();
        assert_eq!(reactions, expected);
    }

    #[test]
    fn duplicate_reactions_are_kept() {
        let db = db();
        let a = user(&db, "ada");
        let (room_id, members) = room_with(&db, "g", &[a]);
        let id = db.send_message(members[0], "again").unwrap();

        let r1 = db.add_reaction(id, a, "🎉").unwrap();
        let r2 = db.add_reaction(id, a, "🎉").unwrap();
        assert_ne!(r1, r2);

        let messages = db.get_messages_with_reactions_by_room_id(room_id, a).unwrap();
        assert_eq!(messages[0].reactions, vec!["🎉", "🎉"]);
    }

    #[test]
    fn transcript_excludes_other_rooms() {
        let db = db();
        let a = user(&db, "ada");
        let (room_one, one) = room_with(&db, "one", &[a]);
        let (_, two) = room_with(&db, "two", &[a]);

        db.send_message(one[0], "here").unwrap();
        db.send_message(two[0], "elsewhere").unwrap();

        let messages = db.get_messages_with_reactions_by_room_id(room_one, a).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].text, "here");
    }

    #[test]
    fn room_user_id_requires_membership() {
        let db = db();
        let a = user(&db, "ada");
        let g = user(&db, "grace");
        let (room_id, members) = room_with(&db, "g", &[a]);

        assert_eq!(db.get_room_user_id(room_id, a).unwrap(), members[0]);
        let err = db.get_room_user_id(room_id, g).unwrap_err();
        assert!(matches!(err, DbError::NotFound(_)));
    }

    #[test]
    fn message_room_is_resolved_through_membership() {
        let db = db();
        let a = user(&db, "ada");
        let (room_one, one) = room_with(&db, "one", &[a]);
        let (room_two, two) = room_with(&db, "two", &[a]);

        let first = db.send_message(one[0], "a").unwrap();
        let second = db.send_message(two[0], "b").unwrap();

        assert_eq!(db.get_message_room_id(first).unwrap(), Some(room_one));
        assert_eq!(db.get_message_room_id(second).unwrap(), Some(room_two));
        assert_eq!(db.get_message_room_id(second + 10).unwrap(), None);
    }

    #[test]
    fn split_reactions_handles_null() {
        assert!(split_reactions(None).is_empty());
        assert_eq!(split_reactions(Some("👍\u{1f}😂".into())), vec!["👍", "😂"]);
    }
}
