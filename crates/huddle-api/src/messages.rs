use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::warn;

use huddle_db::DbError;
use huddle_db::models::MessageRow;
use huddle_types::api::{Claims, SendMessageRequest, SendMessageResponse};
use huddle_types::models::{Message, RoomId};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::extract::JsonBody;
use crate::{parse_timestamp, with_db};

/// POST /groups/{room_id}/messages
///
/// The caller must already be a member; the message is attributed to that
/// membership.
pub async fn send_message(
    State(state): State<AppState>,
    Path(room_id): Path<RoomId>,
    Extension(claims): Extension<Claims>,
    JsonBody(req): JsonBody<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.text.trim().is_empty() {
        return Err(ApiError::BadRequest("Message is required".into()));
    }

    let user_id = claims.sub;
    let text = req.text;
    let message_id = with_db(&state, move |db| {
        let room_user_id = db.get_room_user_id(room_id, user_id)?;
        db.send_message(room_user_id, &text)
    })
    .await
    .map_err(|e| match e {
        ApiError::Db(DbError::NotFound(_)) => ApiError::NotMember,
        other => other,
    })?;

    Ok((StatusCode::CREATED, Json(SendMessageResponse { message_id })))
}

pub(crate) fn message_from_row(row: MessageRow) -> Message {
    let sent_datetime = parse_timestamp(&row.sent_datetime).unwrap_or_else(|| {
        warn!(
            "Corrupt sent_datetime '{}' on message {}",
            row.sent_datetime, row.message_id
        );
        chrono::DateTime::default()
    });

    Message {
        message_id: row.message_id,
        room_user_id: row.room_user_id,
        username: row.username,
        text: row.text,
        sent_datetime,
        reactions: row.reactions,
    }
}
