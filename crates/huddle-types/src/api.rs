use serde::{Deserialize, Serialize};

use crate::models::{Message, MessageId, ReactionId, RoomId, UserId, UserSummary};

// -- Session Claims --

/// Session token claims. Shared by the login handler that issues them and
/// the middleware that validates them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: UserId,
    pub username: String,
    pub email: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignupRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SignupResponse {
    pub user_id: UserId,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user_id: UserId,
    pub username: String,
    pub token: String,
}

// -- Groups --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateGroupRequest {
    #[serde(default)]
    pub name: String,
    /// Nulls are accepted and dropped by the membership insert.
    #[serde(default)]
    pub member_ids: Vec<Option<UserId>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateGroupResponse {
    pub room_id: RoomId,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddMembersRequest {
    #[serde(default)]
    pub user_ids: Vec<Option<UserId>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GroupChatResponse {
    pub room_id: RoomId,
    pub name: String,
    pub messages: Vec<Message>,
    pub members: Vec<UserSummary>,
}

// -- Messages --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SendMessageResponse {
    pub message_id: MessageId,
}

// -- Reactions --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddReactionRequest {
    #[serde(default)]
    pub emoji: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AddReactionResponse {
    pub reaction_id: ReactionId,
}

// -- Errors --

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
