use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Surrogate keys are SQLite INTEGER PRIMARY KEYs.
pub type UserId = i64;
pub type RoomId = i64;
pub type RoomUserId = i64;
pub type MessageId = i64;
pub type ReactionId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub user_id: UserId,
    pub username: String,
}

/// One entry of a member's group list.
///
/// `most_recent_message_date` reflects activity from every member of the
/// room, not only the viewer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupListItem {
    pub room_id: RoomId,
    pub name: String,
    pub room_user_id: RoomUserId,
    pub most_recent_message_date: Option<DateTime<Utc>>,
    pub unread_messages_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub message_id: MessageId,
    pub room_user_id: RoomUserId,
    pub username: String,
    pub text: String,
    pub sent_datetime: DateTime<Utc>,
    /// Every emoji left on the message, duplicates included.
    pub reactions: Vec<String>,
}
