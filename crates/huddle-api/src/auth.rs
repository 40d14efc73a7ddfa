use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::{error, info, warn};

use huddle_db::Database;
use huddle_db::models::UserRow;
use huddle_types::api::{Claims, LoginRequest, LoginResponse, SignupRequest, SignupResponse};

use crate::error::ApiError;
use crate::extract::JsonBody;
use crate::with_db;

pub const MIN_PASSWORD_LEN: usize = 10;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub session_ttl: chrono::Duration,
}

pub async fn signup(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_signup(&req)?;

    let email = req.email.clone();
    if with_db(&state, move |db| db.get_user_by_email(&email))
        .await?
        .is_some()
    {
        return Err(ApiError::Conflict(
            "Email already exists. Please use a different email.".into(),
        ));
    }

    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| {
            error!("Password hashing failed: {}", e);
            ApiError::Internal
        })?
        .to_string();

    let SignupRequest { username, email, .. } = req;
    let user_id = with_db(&state, move |db| db.create_user(&username, &email, &password_hash))
        .await
        .map_err(|e| match e {
            ApiError::Db(db_err) if db_err.is_constraint_violation() => {
                ApiError::Conflict("Username already taken".into())
            }
            other => other,
        })?;

    Ok((StatusCode::CREATED, Json(SignupResponse { user_id })))
}

pub async fn login(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = req.username.clone();
    let mut users = with_db(&state, move |db| db.find_users(&username, None)).await?;

    let user = match users.len() {
        0 => return Err(ApiError::InvalidCredentials),
        1 => users.remove(0),
        n => {
            error!("Duplicate users found: {} rows for username {}", n, req.username);
            return Err(ApiError::InvalidCredentials);
        }
    };

    verify_password(&user, &req.password)?;

    let token = create_token(&state.jwt_secret, &user, state.session_ttl).map_err(|e| {
        error!("Token creation failed: {}", e);
        ApiError::Internal
    })?;

    info!(user_id = user.user_id, "User {} logged in", user.username);
    Ok(Json(LoginResponse {
        user_id: user.user_id,
        username: user.username,
        token,
    }))
}

fn verify_password(user: &UserRow, password: &str) -> Result<(), ApiError> {
    if user.password_hash.is_empty() {
        error!("Password hash missing for user {}", user.user_id);
        return Err(ApiError::InvalidCredentials);
    }

    let parsed_hash = PasswordHash::new(&user.password_hash).map_err(|e| {
        error!("Stored hash for user {} is unreadable: {}", user.user_id, e);
        ApiError::InvalidCredentials
    })?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| {
            warn!("Wrong password for user {}", user.user_id);
            ApiError::InvalidCredentials
        })
}

fn create_token(secret: &str, user: &UserRow, ttl: chrono::Duration) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user.user_id,
        username: user.username.clone(),
        email: user.email.clone(),
        exp: (chrono::Utc::now() + ttl).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

/// Rejects the first missing field, then a weak password.
pub fn validate_signup(req: &SignupRequest) -> Result<(), ApiError> {
    let missing = if req.username.trim().is_empty() {
        Some("username")
    } else if req.email.trim().is_empty() {
        Some("email")
    } else if req.password.is_empty() {
        Some("password")
    } else {
        None
    };
    if let Some(field) = missing {
        return Err(ApiError::BadRequest(format!("Please enter {field}")));
    }

    if !is_strong_password(&req.password) {
        return Err(ApiError::BadRequest(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters long and contain at least one \
             uppercase letter, one lowercase letter, one digit, and one symbol."
        )));
    }
    Ok(())
}

pub fn is_strong_password(password: &str) -> bool {
    password.chars().count() >= MIN_PASSWORD_LEN
        && password.chars().any(|c| c.is_uppercase())
        && password.chars().any(|c| c.is_lowercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password
            .chars()
            .any(|c| !c.is_alphanumeric() && !c.is_whitespace())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(username: &str, email: &str, password: &str) -> SignupRequest {
        SignupRequest {
            username: username.into(),
            email: email.into(),
            password: password.into(),
        }
    }

    #[test]
    fn password_rules() {
        assert!(is_strong_password("Str0ngP@ssw0rd!"));
        assert!(!is_strong_password("Sh0rt!"));
        assert!(!is_strong_password("alllowercase1!"));
        assert!(!is_strong_password("ALLUPPERCASE1!"));
        assert!(!is_strong_password("NoDigitsHere!"));
        assert!(!is_strong_password("NoSymbols123"));
        assert!(!is_strong_password("Spaces Only 1a"));
    }

    #[test]
    fn first_missing_field_is_reported() {
        let err = validate_signup(&req("", "", "")).unwrap_err();
        assert_eq!(err.to_string(), "Please enter username");

        let err = validate_signup(&req("ada", " ", "x")).unwrap_err();
        assert_eq!(err.to_string(), "Please enter email");

        let err = validate_signup(&req("ada", "ada@example.com", "")).unwrap_err();
        assert_eq!(err.to_string(), "Please enter password");
    }

    #[test]
    fn weak_password_is_rejected() {
        let err = validate_signup(&req("ada", "ada@example.com", "password")).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(msg) if msg.starts_with("Password must be")));
        assert!(validate_signup(&req("ada", "ada@example.com", "Str0ngP@ssw0rd!")).is_ok());
    }

    #[test]
    fn verify_password_round_trip() {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(b"Str0ngP@ssw0rd!", &salt)
            .unwrap()
            .to_string();
        let user = UserRow {
            user_id: 1,
            username: "ada".into(),
            email: "ada@example.com".into(),
            password_hash: hash,
        };

        assert!(verify_password(&user, "Str0ngP@ssw0rd!").is_ok());
        assert!(matches!(
            verify_password(&user, "Wr0ngP@ssw0rd!"),
            Err(ApiError::InvalidCredentials)
        ));
    }

    #[test]
    fn unreadable_hash_is_a_credentials_failure() {
        let user = UserRow {
            user_id: 1,
            username: "ada".into(),
            email: "ada@example.com".into(),
            password_hash: "not-a-phc-string".into(),
        };
        assert!(matches!(
            verify_password(&user, "anything"),
            Err(ApiError::InvalidCredentials)
        ));
    }
}
