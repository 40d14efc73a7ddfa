use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use huddle_types::api::{AddReactionRequest, AddReactionResponse, Claims};
use huddle_types::models::{MessageId, RoomId};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::extract::JsonBody;
use crate::with_db;

/// POST /groups/{room_id}/messages/{message_id}/reactions
pub async fn add_reaction(
    State(state): State<AppState>,
    Path((room_id, message_id)): Path<(RoomId, MessageId)>,
    Extension(claims): Extension<Claims>,
    JsonBody(req): JsonBody<AddReactionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.emoji.trim().is_empty() {
        return Err(ApiError::BadRequest("Emoji is required".into()));
    }

    let user_id = claims.sub;
    let emoji = req.emoji;
    let reaction_id = with_db(&state, move |db| {
        if db.get_message_room_id(message_id)? != Some(room_id) {
            return Ok(None);
        }
        db.add_reaction(message_id, user_id, &emoji).map(Some)
    })
    .await?
    .ok_or(ApiError::NotFound("Message"))?;

    Ok((StatusCode::CREATED, Json(AddReactionResponse { reaction_id })))
}
