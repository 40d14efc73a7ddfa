use std::collections::HashSet;

use rusqlite::types::ToSql;
use rusqlite::{Connection, OptionalExtension};
use tracing::{info, warn};

use huddle_types::models::{RoomId, UserId};

use crate::models::{GroupRow, RoomRow};
use crate::{Database, Result};

impl Database {
    pub fn create_group(&self, name: &str) -> Result<RoomId> {
        self.with_conn(|conn| {
            conn.execute("INSERT INTO room (name) VALUES (?1)", [name])?;
            let room_id = conn.last_insert_rowid();
            info!(room_id, "Created group {}", name);
            Ok(room_id)
        })
    }

    pub fn get_group_data(&self, room_id: RoomId) -> Result<Option<RoomRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT room_id, name FROM room WHERE room_id = ?1",
                    [room_id],
                    |row| {
                        Ok(RoomRow {
                            room_id: row.get(0)?,
                            name: row.get(1)?,
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })
    }

    /// Adds the given users to a room in one multi-row insert.
    ///
    /// `None` entries and repeated ids are dropped first; if nothing is left
    /// no statement runs. Existing memberships are not checked, so calling
    /// this twice for the same user creates a second membership row.
    /// Returns the number of rows inserted.
    pub fn add_users_to_group(&self, room_id: RoomId, user_ids: &[Option<UserId>]) -> Result<usize> {
        let inserted = self.with_tx(|tx| insert_members(tx, room_id, user_ids))?;
        info!(room_id, inserted, "Users added to group");
        Ok(inserted)
    }

    /// Creates a room and its initial members in one transaction. An unknown
    /// user id rolls back the room as well.
    pub fn create_group_with_members(&self, name: &str, user_ids: &[Option<UserId>]) -> Result<RoomId> {
        let (room_id, inserted) = self.with_tx(|tx| {
            tx.execute("INSERT INTO room (name) VALUES (?1)", [name])?;
            let room_id = tx.last_insert_rowid();
            let inserted = insert_members(tx, room_id, user_ids)?;
            Ok((room_id, inserted))
        })?;
        info!(room_id, inserted, "Created group {} with members", name);
        Ok(room_id)
    }

    /// Every room `user_id` belongs to, with the newest message timestamp
    /// from any member of that room.
    pub fn get_groups_data(&self, user_id: UserId) -> Result<Vec<GroupRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT ru.room_id, r.name, ru.room_user_id,
                        (SELECT MAX(m.sent_datetime)
                         FROM message m
                         JOIN room_user ru2 ON m.room_user_id = ru2.room_user_id
                         WHERE ru2.room_id = ru.room_id) AS most_recent_message_date
                 FROM room_user ru
                 JOIN room r ON ru.room_id = r.room_id
                 WHERE ru.user_id = ?1
                 ORDER BY ru.room_user_id",
            )?;
            let rows = stmt
                .query_map([user_id], |row| {
                    Ok(GroupRow {
                        room_id: row.get(0)?,
                        name: row.get(1)?,
                        room_user_id: row.get(2)?,
                        most_recent_message_date: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn insert_members(conn: &Connection, room_id: RoomId, user_ids: &[Option<UserId>]) -> Result<usize> {
    let mut seen = HashSet::new();
    let unique: Vec<UserId> = user_ids
        .iter()
        .flatten()
        .copied()
        .filter(|id| seen.insert(*id))
        .collect();

    if unique.is_empty() {
        warn!("No valid user ids provided for room {}", room_id);
        return Ok(0);
    }

    // ?1 is the room, ?2.. are the users
    let values: Vec<String> = (0..unique.len())
        .map(|i| format!("(?1, ?{})", i + 2))
        .collect();
    let sql = format!(
        "INSERT INTO room_user (room_id, user_id) VALUES {}",
        values.join(", ")
    );

    let mut params: Vec<&dyn ToSql> = Vec::with_capacity(unique.len() + 1);
    params.push(&room_id);
    params.extend(unique.iter().map(|id| id as &dyn ToSql));

    Ok(conn.execute(&sql, params.as_slice())?)
}
