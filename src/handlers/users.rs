use axum::extract::State;
use axum::Json;
use axum::response::{IntoResponse, Response};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::models::User;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::success;

const USER_COLUMNS: &str = "id, handle, email, first_name, last_name, phone, bio, \
     date_of_birth, created_at, updated_at";

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub bio: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
}

pub async fn get_profile(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Response, AppError> {
    let user = fetch_user(&state, current.id).await?;
    Ok(success(user, "Profile retrieved").into_response())
}

/// Partial update; absent fields keep their current value. Only the
/// owning user can reach this handler, so no further permission check.
pub async fn update_profile(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Response, AppError> {
    let user: User = sqlx::query_as(&format!(
        "UPDATE users SET \
             first_name = COALESCE($1, first_name), \
             last_name = COALESCE($2, last_name), \
             phone = COALESCE($3, phone), \
             bio = COALESCE($4, bio), \
             date_of_birth = COALESCE($5, date_of_birth), \
             updated_at = NOW() \
         WHERE id = $6 RETURNING {USER_COLUMNS}"
    ))
    .bind(req.first_name)
    .bind(req.last_name)
    .bind(req.phone)
    .bind(req.bio)
    .bind(req.date_of_birth)
    .bind(current.id)
    .fetch_one(&state.pool)
    .await?;

    Ok(success(user, "Profile updated").into_response())
}

#[derive(Serialize)]
struct RecentTrip {
    id: Uuid,
    title: String,
    destination: String,
}

#[derive(Serialize)]
struct RecentBooking {
    id: Uuid,
    trip_title: String,
    status: String,
}

#[derive(Serialize)]
struct UserStats {
    trips_created: i64,
    bookings_made: i64,
    recent_trips: Vec<RecentTrip>,
    recent_bookings: Vec<RecentBooking>,
}

pub async fn stats(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Response, AppError> {
    let (trips_created,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM trips WHERE creator_id = $1")
            .bind(current.id)
            .fetch_one(&state.pool)
            .await?;

    let (bookings_made,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM bookings WHERE user_id = $1")
            .bind(current.id)
            .fetch_one(&state.pool)
            .await?;

    let recent_trips: Vec<(Uuid, String, String)> = sqlx::query_as(
        "SELECT id, title, destination FROM trips \
         WHERE creator_id = $1 ORDER BY created_at DESC LIMIT 5",
    )
    .bind(current.id)
    .fetch_all(&state.pool)
    .await?;

    let recent_bookings: Vec<(Uuid, String, String)> = sqlx::query_as(
        "SELECT b.id, t.title, b.status FROM bookings b \
         JOIN trips t ON t.id = b.trip_id \
         WHERE b.user_id = $1 ORDER BY b.created_at DESC LIMIT 5",
    )
    .bind(current.id)
    .fetch_all(&state.pool)
    .await?;

    let stats = UserStats {
        trips_created,
        bookings_made,
        recent_trips: recent_trips
            .into_iter()
            .map(|(id, title, destination)| RecentTrip {
                id,
                title,
                destination,
            })
            .collect(),
        recent_bookings: recent_bookings
            .into_iter()
            .map(|(id, trip_title, status)| RecentBooking {
                id,
                trip_title,
                status,
            })
            .collect(),
    };

    Ok(success(stats, "Stats retrieved").into_response())
}

async fn fetch_user(state: &AppState, id: Uuid) -> Result<User, AppError> {
    let user: Option<User> =
        sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&state.pool)
            .await?;
    user.ok_or_else(|| AppError::NotFound("user not found".to_string()))
}
