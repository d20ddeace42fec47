//! Registration and token issuance. Stands in for the external
//! identity provider: there is no password handling, a token is
//! granted for a known handle.

use axum::extract::State;
use axum::Json;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::issue_token;
use crate::models::User;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, success};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub handle: String,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone: String,
}

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub handle: String,
}

#[derive(Serialize)]
struct AuthPayload {
    user: User,
    token: String,
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Response, AppError> {
    let handle = req.handle.trim();
    if handle.is_empty() {
        return Err(AppError::ValidationError("handle is required".to_string()));
    }
    let email = req.email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::ValidationError(
            "a valid email is required".to_string(),
        ));
    }

    let user: User = sqlx::query_as(
        "INSERT INTO users (id, handle, email, first_name, last_name, phone) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         RETURNING id, handle, email, first_name, last_name, phone, bio, date_of_birth, \
                   created_at, updated_at",
    )
    .bind(Uuid::new_v4())
    .bind(handle)
    .bind(email)
    .bind(&req.first_name)
    .bind(&req.last_name)
    .bind(&req.phone)
    .fetch_one(&state.pool)
    .await
    .map_err(map_register_error)?;

    let token = issue_token(user.id, &state.auth.secret, state.auth.token_ttl_secs)?;

    tracing::info!(user_id = %user.id, handle = %user.handle, "User registered");

    Ok(created(AuthPayload { user, token }, "User registered successfully").into_response())
}

pub async fn token(
    State(state): State<AppState>,
    Json(req): Json<TokenRequest>,
) -> Result<Response, AppError> {
    let user: Option<User> = sqlx::query_as(
        "SELECT id, handle, email, first_name, last_name, phone, bio, date_of_birth, \
                created_at, updated_at \
         FROM users WHERE handle = $1",
    )
    .bind(req.handle.trim())
    .fetch_optional(&state.pool)
    .await?;

    let user = user.ok_or_else(|| AppError::NotFound("user not found".to_string()))?;
    let token = issue_token(user.id, &state.auth.secret, state.auth.token_ttl_secs)?;

    Ok(success(AuthPayload { user, token }, "Token issued").into_response())
}

fn map_register_error(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(ref db) = e {
        match db.constraint() {
            Some("users_handle_key") => {
                return AppError::ValidationError("handle already taken".to_string())
            }
            Some("users_email_key") => {
                return AppError::ValidationError("email already registered".to_string())
            }
            _ => {}
        }
    }
    AppError::DatabaseError(e)
}
