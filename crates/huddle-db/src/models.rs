//! Database row types, mapped directly from SQLite rows.
//! Kept apart from the huddle-types API models so the storage layer stays
//! independent of the wire format.

use huddle_types::models::{MessageId, RoomId, RoomUserId, UserId};

#[derive(Debug, Clone)]
pub struct UserRow {
    pub user_id: UserId,
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSummaryRow {
    pub user_id: UserId,
    pub username: String,
}

#[derive(Debug, Clone)]
pub struct RoomRow {
    pub room_id: RoomId,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct GroupRow {
    pub room_id: RoomId,
    pub name: String,
    /// The querying user's membership in this room.
    pub room_user_id: RoomUserId,
    /// `YYYY-MM-DD HH:MM:SS.SSS` UTC; `None` while the room has no messages.
    pub most_recent_message_date: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MessageRow {
    pub message_id: MessageId,
    pub room_user_id: RoomUserId,
    pub username: String,
    pub text: String,
    pub sent_datetime: String,
    pub reactions: Vec<String>,
}
