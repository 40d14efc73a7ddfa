use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{info, warn};

use huddle_db::DbError;
use huddle_types::api::{
    AddMembersRequest, Claims, CreateGroupRequest, CreateGroupResponse, GroupChatResponse,
};
use huddle_types::models::{GroupListItem, RoomId, UserSummary};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::extract::JsonBody;
use crate::messages::message_from_row;
use crate::{parse_timestamp, with_db};

/// GET /groups: the caller's groups, each with its unread count.
pub async fn list_groups(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = claims.sub;

    let groups = with_db(&state, move |db| {
        db.get_groups_data(user_id)?
            .into_iter()
            .map(|row| {
                let unread = db.unread_count(row.room_id, row.room_user_id)?;
                Ok((row, unread))
            })
            .collect::<huddle_db::Result<Vec<_>>>()
    })
    .await?;

    let items: Vec<GroupListItem> = groups
        .into_iter()
        .map(|(row, unread_messages_count)| GroupListItem {
            most_recent_message_date: row.most_recent_message_date.as_deref().and_then(|raw| {
                let parsed = parse_timestamp(raw);
                if parsed.is_none() {
                    warn!("Corrupt sent_datetime '{}' in room {}", raw, row.room_id);
                }
                parsed
            }),
            room_id: row.room_id,
            name: row.name,
            room_user_id: row.room_user_id,
            unread_messages_count,
        })
        .collect();

    Ok(Json(items))
}

/// POST /groups: create a group and add the selected members.
pub async fn create_group(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    JsonBody(req): JsonBody<CreateGroupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let name = req.name.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::BadRequest("Group name is required".into()));
    }

    let member_ids = req.member_ids;
    let room_id = with_db(&state, move |db| db.create_group_with_members(&name, &member_ids))
        .await
        .map_err(unknown_member)?;

    info!(room_id, created_by = claims.sub, "Group created");
    Ok((StatusCode::CREATED, Json(CreateGroupResponse { room_id })))
}

/// GET /groups/{room_id}: group name, full transcript and the member picker
/// list. Opening the chat marks it read for the caller.
pub async fn get_group_chat(
    State(state): State<AppState>,
    Path(room_id): Path<RoomId>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = claims.sub;

    let (room, users, rows) = with_db(&state, move |db| {
        let Some(room) = db.get_group_data(room_id)? else {
            return Ok(None);
        };
        let users = db.get_all_users()?;
        let rows = db.get_messages_with_reactions_by_room_id(room_id, user_id)?;

        match db.get_room_user_id(room_id, user_id) {
            Ok(room_user_id) => {
                db.mark_read(room_user_id)?;
            }
            Err(DbError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }

        Ok(Some((room, users, rows)))
    })
    .await?
    .ok_or(ApiError::NotFound("Group"))?;

    Ok(Json(GroupChatResponse {
        room_id: room.room_id,
        name: room.name,
        messages: rows.into_iter().map(message_from_row).collect(),
        members: users
            .into_iter()
            .map(|u| UserSummary {
                user_id: u.user_id,
                username: u.username,
            })
            .collect(),
    }))
}

/// POST /groups/{room_id}/members
pub async fn add_members(
    State(state): State<AppState>,
    Path(room_id): Path<RoomId>,
    Extension(_claims): Extension<Claims>,
    JsonBody(req): JsonBody<AddMembersRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.user_ids.is_empty() {
        return Err(ApiError::BadRequest("No users selected".into()));
    }

    let user_ids = req.user_ids;
    with_db(&state, move |db| db.add_users_to_group(room_id, &user_ids))
        .await
        .map_err(unknown_member)?;

    Ok(StatusCode::NO_CONTENT)
}

fn unknown_member(e: ApiError) -> ApiError {
    match e {
        ApiError::Db(db_err) if db_err.is_constraint_violation() => {
            ApiError::BadRequest("Unknown group or user".into())
        }
        other => other,
    }
}
