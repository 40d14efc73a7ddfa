pub mod auth;
pub mod error;
pub mod extract;
pub mod groups;
pub mod messages;
pub mod middleware;
pub mod reactions;
pub mod users;

use axum::{
    Json, Router,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::error;

use huddle_db::Database;
use huddle_types::api::ErrorResponse;

use crate::auth::AppState;
use crate::error::ApiError;

/// Builds the full route table. Logging and CORS layers are added by the
/// binary.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health))
        .route("/auth/signup", post(auth::signup))
        .route("/auth/login", post(auth::login));

    let protected_routes = Router::new()
        .route("/users", get(users::list_users))
        .route("/groups", get(groups::list_groups).post(groups::create_group))
        .route("/groups/{room_id}", get(groups::get_group_chat))
        .route("/groups/{room_id}/members", post(groups::add_members))
        .route("/groups/{room_id}/messages", post(messages::send_message))
        .route(
            "/groups/{room_id}/messages/{message_id}/reactions",
            post(reactions::add_reaction),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .fallback(not_found)
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: "Not found".into(),
        }),
    )
}

/// Runs a blocking database call off the async runtime.
pub(crate) async fn with_db<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> huddle_db::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal
        })?
        .map_err(ApiError::from)
}

/// SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS.SSS" without a zone;
/// they are always UTC.
pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f").map(|ndt| ndt.and_utc()))
        .ok()
}
