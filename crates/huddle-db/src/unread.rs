//! Read watermarks and unread counts.
//!
//! A membership's `last_read_message` is a watermark: messages with a larger
//! id count as unread. Counting is a two step protocol (look up the
//! watermark, then count past it). [`Database::unread_count`] runs both steps
//! in one transaction; the individual steps stay public for callers that
//! need them separately.

use rusqlite::{Connection, OptionalExtension};
use tracing::debug;

use huddle_types::models::{MessageId, RoomId, RoomUserId};

use crate::{Database, Result};

impl Database {
    /// The watermark stored on the room's first membership row, or `None`
    /// when the room has no members or the watermark was never set.
    pub fn get_most_recent_read_message_id(&self, room_id: RoomId) -> Result<Option<MessageId>> {
        self.with_conn(|conn| query_room_watermark(conn, room_id))
    }

    /// Messages attributed to `room_user_id` with an id above `watermark`.
    pub fn count_unread_messages(&self, room_user_id: RoomUserId, watermark: MessageId) -> Result<i64> {
        self.with_conn(|conn| query_unread_count(conn, room_user_id, watermark))
    }

    /// Both steps in one snapshot. A room without a watermark has nothing
    /// unread.
    pub fn unread_count(&self, room_id: RoomId, room_user_id: RoomUserId) -> Result<i64> {
        self.with_tx(|tx| match query_room_watermark(tx, room_id)? {
            Some(watermark) => query_unread_count(tx, room_user_id, watermark),
            None => Ok(0),
        })
    }

    /// Moves the member's watermark up to the newest message in its room.
    /// Never lowers it. Returns the newest message id, `None` for an empty
    /// room.
    pub fn mark_read(&self, room_user_id: RoomUserId) -> Result<Option<MessageId>> {
        self.with_tx(|tx| {
            let latest: Option<MessageId> = tx.query_row(
                "SELECT MAX(m.message_id)
                 FROM message m
                 JOIN room_user ru ON m.room_user_id = ru.room_user_id
                 WHERE ru.room_id = (SELECT room_id FROM room_user WHERE room_user_id = ?1)",
                [room_user_id],
                |row| row.get(0),
            )?;

            if let Some(latest) = latest {
                tx.execute(
                    "UPDATE room_user SET last_read_message = ?2
                     WHERE room_user_id = ?1
                       AND (last_read_message IS NULL OR last_read_message < ?2)",
                    (room_user_id, latest),
                )?;
                debug!(room_user_id, latest, "Watermark advanced");
            }
            Ok(latest)
        })
    }
}

fn query_room_watermark(conn: &Connection, room_id: RoomId) -> Result<Option<MessageId>> {
    let watermark: Option<Option<MessageId>> = conn
        .query_row(
            "SELECT last_read_message FROM room_user
             WHERE room_id = ?1
             ORDER BY room_user_id
             LIMIT 1",
            [room_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(watermark.flatten())
}

fn query_unread_count(conn: &Connection, room_user_id: RoomUserId, watermark: MessageId) -> Result<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM message WHERE room_user_id = ?1 AND message_id > ?2",
        (room_user_id, watermark),
        |row| row.get(0),
    )?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use crate::test_support::{db, message_at, room_with, user};

    fn set_watermark(db: &crate::Database, room_user_id: i64, watermark: i64) {
        db.with_conn(|conn| {
            conn.execute(
                "UPDATE room_user SET last_read_message = ?2 WHERE room_user_id = ?1",
                (room_user_id, watermark),
            )?;
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn counts_messages_past_watermark() {
        let db = db();
        let a = user(&db, "ada");
        let (room_id, members) = room_with(&db, "g", &[a]);
        for id in 5..=7 {
            message_at(&db, id, members[0], "m", "2024-01-01 00:00:00.000");
        }
        set_watermark(&db, members[0], 5);

        assert_eq!(db.get_most_recent_read_message_id(room_id).unwrap(), Some(5));
        assert_eq!(db.count_unread_messages(members[0], 5).unwrap(), 2);
        assert_eq!(db.unread_count(room_id, members[0]).unwrap(), 2);
    }

    #[test]
    fn room_without_members_has_no_watermark() {
        let db = db();
        let room_id = db.create_group("empty").unwrap();

        assert_eq!(db.get_most_recent_read_message_id(room_id).unwrap(), None);
        assert_eq!(db.unread_count(room_id, 1).unwrap(), 0);
    }

    #[test]
    fn unset_watermark_means_nothing_unread() {
        let db = db();
        let a = user(&db, "ada");
        let (room_id, members) = room_with(&db, "g", &[a]);
        db.send_message(members[0], "hi").unwrap();

        assert_eq!(db.get_most_recent_read_message_id(room_id).unwrap(), None);
        assert_eq!(db.unread_count(room_id, members[0]).unwrap(), 0);
    }

    #[test]
    fn watermark_is_read_from_first_membership_of_room() {
        let db = db();
        let a = user(&db, "ada");
        let g = user(&db, "grace");
        let (room_id, members) = room_with(&db, "g", &[a, g]);
        set_watermark(&db, members[0], 3);
        set_watermark(&db, members[1], 9);

        assert_eq!(db.get_most_recent_read_message_id(room_id).unwrap(), Some(3));
    }

    #[test]
    fn count_is_scoped_to_one_membership() {
        let db = db();
        let a = user(&db, "ada");
        let g = user(&db, "grace");
        let (_, members) = room_with(&db, "g", &[a, g]);
        message_at(&db, 1, members[0], "a", "2024-01-01 00:00:00.000");
        message_at(&db, 2, members[1], "g", "2024-01-01 00:00:01.000");
        message_at(&db, 3, members[1], "g", "2024-01-01 00:00:02.000");

        assert_eq!(db.count_unread_messages(members[0], 0).unwrap(), 1);
        assert_eq!(db.count_unread_messages(members[1], 0).unwrap(), 2);
    }

    #[test]
    fn mark_read_advances_but_never_lowers() {
        let db = db();
        let a = user(&db, "ada");
        let g = user(&db, "grace");
        let (room_id, members) = room_with(&db, "g", &[a, g]);

        assert_eq!(db.mark_read(members[0]).unwrap(), None);
        assert_eq!(db.get_most_recent_read_message_id(room_id).unwrap(), None);

        db.send_message(members[1], "one").unwrap();
        let newest = db.send_message(members[1], "two").unwrap();
        assert_eq!(db.mark_read(members[0]).unwrap(), Some(newest));
        assert_eq!(db.get_most_recent_read_message_id(room_id).unwrap(), Some(newest));

        set_watermark(&db, members[0], newest + 50);
        db.mark_read(members[0]).unwrap();
        assert_eq!(
            db.get_most_recent_read_message_id(room_id).unwrap(),
            Some(newest + 50)
        );
    }
}
