use axum::extract::{Path, State};
use axum::Json;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::models::{Booking, BookingStatus};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, success};

#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    pub trip_id: Uuid,
    pub participants: i32,
}

pub async fn create_booking(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(req): Json<CreateBookingRequest>,
) -> Result<Response, AppError> {
    let booking = state
        .ledger
        .create_booking(current.id, req.trip_id, req.participants)
        .await?;

    Ok(created(booking, "Booking created successfully").into_response())
}

pub async fn my_bookings(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Response, AppError> {
    let bookings: Vec<Booking> = sqlx::query_as(
        "SELECT id, trip_id, user_id, status, participants, total_price, created_at, \
         updated_at FROM bookings WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(current.id)
    .fetch_all(&state.pool)
    .await?;

    Ok(success(bookings, "Bookings retrieved").into_response())
}

/// Booking detail, visible to the booker and the trip's creator.
/// Anyone else sees a 404 rather than learning the booking exists.
pub async fn get_booking(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(booking_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let row: Option<BookingWithCreator> = sqlx::query_as(
        "SELECT b.id, b.trip_id, b.user_id, b.status, b.participants, b.total_price, \
         b.created_at, b.updated_at, t.creator_id \
         FROM bookings b JOIN trips t ON t.id = b.trip_id WHERE b.id = $1",
    )
    .bind(booking_id)
    .fetch_optional(&state.pool)
    .await?;

    let row = row.ok_or_else(|| AppError::NotFound("booking not found".to_string()))?;

    if row.booking.user_id != current.id && row.creator_id != current.id {
        return Err(AppError::NotFound("booking not found".to_string()));
    }

    Ok(success(row.booking, "Booking retrieved").into_response())
}

/// Booker or trip creator cancels a booking. Repeat cancellation is a
/// state error.
pub async fn cancel_booking(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(booking_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let booking = state
        .ledger
        .transition_status(booking_id, BookingStatus::Cancelled, current.id)
        .await?;

    Ok(success(booking, "Booking cancelled successfully").into_response())
}

#[derive(sqlx::FromRow)]
struct BookingWithCreator {
    #[sqlx(flatten)]
    booking: Booking,
    creator_id: Uuid,
}
