use axum::{Json, extract::State, response::IntoResponse};

use huddle_types::models::UserSummary;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::with_db;

/// GET /users: every registered user, for picking group members.
pub async fn list_users(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let users = with_db(&state, |db| db.get_all_users()).await?;

    Ok(Json(
        users
            .into_iter()
            .map(|u| UserSummary {
                user_id: u.user_id,
                username: u.username,
            })
            .collect::<Vec<_>>(),
    ))
}
