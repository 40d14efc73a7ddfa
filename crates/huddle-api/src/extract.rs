use axum::extract::FromRequest;

use crate::error::ApiError;

/// `axum::Json` whose rejections come back as `{"error": ...}` bodies like
/// every other failure.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);
