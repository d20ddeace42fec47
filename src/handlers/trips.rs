use axum::extract::{Path, State};
use axum::Json;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::ledger::rules;
use crate::models::{Booking, BookingStatus, Trip, TripStatus};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, empty_success, success};

/// Trips hydrated with confirmed occupancy and revenue in one grouped
/// query instead of per-trip count queries.
fn trip_query(filter: &str) -> String {
    format!(
        "SELECT t.id, t.creator_id, t.title, t.description, t.destination, t.start_date, \
         t.end_date, t.max_participants, t.price_per_person, t.status, t.created_at, \
         t.updated_at, \
         COALESCE(SUM(b.participants) FILTER (WHERE b.status = 'confirmed'), 0) \
             AS confirmed_participants, \
         COALESCE(SUM(b.total_price) FILTER (WHERE b.status = 'confirmed'), 0) \
             AS confirmed_revenue \
         FROM trips t LEFT JOIN bookings b ON b.trip_id = t.id \
         {filter} \
         GROUP BY t.id ORDER BY t.created_at DESC"
    )
}

#[derive(FromRow)]
struct TripOccupancyRow {
    #[sqlx(flatten)]
    trip: Trip,
    confirmed_participants: i64,
    confirmed_revenue: Decimal,
}

#[derive(Serialize)]
pub struct TripResponse {
    pub id: Uuid,
    pub creator_id: Uuid,
    pub title: String,
    pub description: String,
    pub destination: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub max_participants: i32,
    pub price_per_person: Decimal,
    pub status: String,
    pub available_spots: i64,
    pub is_available: bool,
    /// Only exposed to the trip's creator.
    pub total_revenue: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TripResponse {
    fn build(row: TripOccupancyRow, viewer: Option<Uuid>) -> Self {
        let raw = rules::available_spots(row.trip.max_participants, row.confirmed_participants);
        let total_revenue = match viewer {
            Some(id) if id == row.trip.creator_id => Some(row.confirmed_revenue),
            _ => None,
        };
        Self {
            id: row.trip.id,
            creator_id: row.trip.creator_id,
            title: row.trip.title,
            description: row.trip.description,
            destination: row.trip.destination,
            start_date: row.trip.start_date,
            end_date: row.trip.end_date,
            max_participants: row.trip.max_participants,
            price_per_person: row.trip.price_per_person,
            status: row.trip.status,
            available_spots: rules::display_spots(raw),
            is_available: rules::is_available(raw),
            total_revenue,
            created_at: row.trip.created_at,
            updated_at: row.trip.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateTripRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub destination: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub max_participants: i32,
    pub price_per_person: Decimal,
    pub status: Option<TripStatus>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTripRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub destination: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub max_participants: Option<i32>,
    pub price_per_person: Option<Decimal>,
    pub status: Option<TripStatus>,
}

pub async fn list_trips(
    State(state): State<AppState>,
    viewer: Option<CurrentUser>,
) -> Result<Response, AppError> {
    let rows: Vec<TripOccupancyRow> =
        sqlx::query_as(&trip_query("WHERE t.status = 'published'"))
            .fetch_all(&state.pool)
            .await?;

    let viewer_id = viewer.map(|v| v.id);
    let trips: Vec<TripResponse> = rows
        .into_iter()
        .map(|row| TripResponse::build(row, viewer_id))
        .collect();

    Ok(success(trips, "Trips retrieved").into_response())
}

pub async fn get_trip(
    State(state): State<AppState>,
    Path(trip_id): Path<Uuid>,
    viewer: Option<CurrentUser>,
) -> Result<Response, AppError> {
    let row: Option<TripOccupancyRow> =
        sqlx::query_as(&trip_query("WHERE t.id = $1 AND t.status = 'published'"))
            .bind(trip_id)
            .fetch_optional(&state.pool)
            .await?;

    let row = row.ok_or_else(|| AppError::NotFound("trip not found".to_string()))?;
    let viewer_id = viewer.map(|v| v.id);

    Ok(success(TripResponse::build(row, viewer_id), "Trip retrieved").into_response())
}

pub async fn my_trips(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Response, AppError> {
    let rows: Vec<TripOccupancyRow> = sqlx::query_as(&trip_query("WHERE t.creator_id = $1"))
        .bind(current.id)
        .fetch_all(&state.pool)
        .await?;

    let trips: Vec<TripResponse> = rows
        .into_iter()
        .map(|row| TripResponse::build(row, Some(current.id)))
        .collect();

    Ok(success(trips, "Trips retrieved").into_response())
}

pub async fn create_trip(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(req): Json<CreateTripRequest>,
) -> Result<Response, AppError> {
    validate_trip_fields(
        &req.title,
        &req.destination,
        req.start_date,
        req.end_date,
        req.max_participants,
        req.price_per_person,
    )?;

    let status = req.status.unwrap_or(TripStatus::Draft);

    let trip: Trip = sqlx::query_as(
        "INSERT INTO trips (id, creator_id, title, description, destination, start_date, \
         end_date, max_participants, price_per_person, status) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
         RETURNING id, creator_id, title, description, destination, start_date, end_date, \
                   max_participants, price_per_person, status, created_at, updated_at",
    )
    .bind(Uuid::new_v4())
    .bind(current.id)
    .bind(req.title.trim())
    .bind(&req.description)
    .bind(req.destination.trim())
    .bind(req.start_date)
    .bind(req.end_date)
    .bind(req.max_participants)
    .bind(req.price_per_person)
    .bind(status.as_str())
    .fetch_one(&state.pool)
    .await?;

    tracing::info!(trip_id = %trip.id, creator_id = %current.id, "Trip created");

    let row = TripOccupancyRow {
        trip,
        confirmed_participants: 0,
        confirmed_revenue: Decimal::ZERO,
    };

    Ok(created(
        TripResponse::build(row, Some(current.id)),
        "Trip created successfully",
    )
    .into_response())
}

pub async fn update_trip(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(trip_id): Path<Uuid>,
    Json(req): Json<UpdateTripRequest>,
) -> Result<Response, AppError> {
    let trip = fetch_owned_trip(&state, trip_id, current.id).await?;

    // Merge before validating so partial updates cannot bypass the
    // date-ordering or capacity invariants
    let title = req.title.unwrap_or(trip.title);
    let description = req.description.unwrap_or(trip.description);
    let destination = req.destination.unwrap_or(trip.destination);
    let start_date = req.start_date.unwrap_or(trip.start_date);
    let end_date = req.end_date.unwrap_or(trip.end_date);
    let max_participants = req.max_participants.unwrap_or(trip.max_participants);
    let price_per_person = req.price_per_person.unwrap_or(trip.price_per_person);
    let status = match req.status {
        Some(status) => status.as_str().to_string(),
        None => trip.status,
    };

    validate_trip_fields(
        &title,
        &destination,
        start_date,
        end_date,
        max_participants,
        price_per_person,
    )?;

    sqlx::query(
        "UPDATE trips SET title = $1, description = $2, destination = $3, start_date = $4, \
         end_date = $5, max_participants = $6, price_per_person = $7, status = $8, \
         updated_at = NOW() WHERE id = $9",
    )
    .bind(title.trim())
    .bind(&description)
    .bind(destination.trim())
    .bind(start_date)
    .bind(end_date)
    .bind(max_participants)
    .bind(price_per_person)
    .bind(&status)
    .bind(trip_id)
    .execute(&state.pool)
    .await?;

    let row: TripOccupancyRow = sqlx::query_as(&trip_query("WHERE t.id = $1"))
        .bind(trip_id)
        .fetch_one(&state.pool)
        .await?;

    Ok(success(
        TripResponse::build(row, Some(current.id)),
        "Trip updated successfully",
    )
    .into_response())
}

pub async fn delete_trip(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(trip_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let trip = fetch_owned_trip(&state, trip_id, current.id).await?;

    // Bookings cascade with the trip
    sqlx::query("DELETE FROM trips WHERE id = $1")
        .bind(trip.id)
        .execute(&state.pool)
        .await?;

    tracing::info!(trip_id = %trip.id, "Trip deleted");

    Ok(empty_success("Trip deleted successfully").into_response())
}

/// Bookings on a trip, for its creator.
pub async fn trip_bookings(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(trip_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let trip = fetch_trip(&state, trip_id).await?;
    if trip.creator_id != current.id {
        return Err(AppError::Forbidden(
            "only the trip creator can view its bookings".to_string(),
        ));
    }

    let bookings: Vec<Booking> = sqlx::query_as(
        "SELECT id, trip_id, user_id, status, participants, total_price, created_at, \
         updated_at FROM bookings WHERE trip_id = $1 ORDER BY created_at DESC",
    )
    .bind(trip_id)
    .fetch_all(&state.pool)
    .await?;

    Ok(success(bookings, "Bookings retrieved").into_response())
}

/// Creator confirms a pending booking on their trip. Capacity is
/// re-checked by the ledger under the trip lock.
pub async fn confirm_booking(
    State(state): State<AppState>,
    current: CurrentUser,
    Path((trip_id, booking_id)): Path<(Uuid, Uuid)>,
) -> Result<Response, AppError> {
    let booking: Option<Booking> = sqlx::query_as(
        "SELECT id, trip_id, user_id, status, participants, total_price, created_at, \
         updated_at FROM bookings WHERE id = $1",
    )
    .bind(booking_id)
    .fetch_optional(&state.pool)
    .await?;

    let booking = booking.ok_or_else(|| AppError::NotFound("booking not found".to_string()))?;
    if booking.trip_id != trip_id {
        return Err(AppError::NotFound(
            "booking not found for this trip".to_string(),
        ));
    }

    let updated = state
        .ledger
        .transition_status(booking_id, BookingStatus::Confirmed, current.id)
        .await?;

    Ok(success(updated, "Booking confirmed successfully").into_response())
}

async fn fetch_trip(state: &AppState, trip_id: Uuid) -> Result<Trip, AppError> {
    let trip: Option<Trip> = sqlx::query_as(
        "SELECT id, creator_id, title, description, destination, start_date, end_date, \
         max_participants, price_per_person, status, created_at, updated_at \
         FROM trips WHERE id = $1",
    )
    .bind(trip_id)
    .fetch_optional(&state.pool)
    .await?;
    trip.ok_or_else(|| AppError::NotFound("trip not found".to_string()))
}

/// Trips are only managed by their creator; everyone else sees a 404
/// rather than learning the trip exists.
async fn fetch_owned_trip(
    state: &AppState,
    trip_id: Uuid,
    creator_id: Uuid,
) -> Result<Trip, AppError> {
    let trip = fetch_trip(state, trip_id).await?;
    if trip.creator_id != creator_id {
        return Err(AppError::NotFound("trip not found".to_string()));
    }
    Ok(trip)
}

fn validate_trip_fields(
    title: &str,
    destination: &str,
    start_date: NaiveDate,
    end_date: NaiveDate,
    max_participants: i32,
    price_per_person: Decimal,
) -> Result<(), AppError> {
    if title.trim().is_empty() {
        return Err(AppError::ValidationError("title is required".to_string()));
    }
    if destination.trim().is_empty() {
        return Err(AppError::ValidationError(
            "destination is required".to_string(),
        ));
    }
    if start_date >= end_date {
        return Err(AppError::ValidationError(
            "start date must be before end date".to_string(),
        ));
    }
    if max_participants < 1 {
        return Err(AppError::ValidationError(
            "max participants must be at least 1".to_string(),
        ));
    }
    if price_per_person < Decimal::ZERO {
        return Err(AppError::ValidationError(
            "price per person cannot be negative".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_valid_trip_fields() {
        assert!(validate_trip_fields(
            "Coastal hike",
            "Lisbon",
            date(2026, 9, 1),
            date(2026, 9, 7),
            8,
            Decimal::new(25000, 2),
        )
        .is_ok());
    }

    #[test]
    fn test_date_ordering_enforced() {
        let err = validate_trip_fields(
            "Coastal hike",
            "Lisbon",
            date(2026, 9, 7),
            date(2026, 9, 1),
            8,
            Decimal::ZERO,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));

        // Equal dates are rejected too
        assert!(validate_trip_fields(
            "Coastal hike",
            "Lisbon",
            date(2026, 9, 1),
            date(2026, 9, 1),
            8,
            Decimal::ZERO,
        )
        .is_err());
    }

    #[test]
    fn test_capacity_and_price_bounds() {
        assert!(validate_trip_fields(
            "Coastal hike",
            "Lisbon",
            date(2026, 9, 1),
            date(2026, 9, 7),
            0,
            Decimal::ZERO,
        )
        .is_err());

        assert!(validate_trip_fields(
            "Coastal hike",
            "Lisbon",
            date(2026, 9, 1),
            date(2026, 9, 7),
            1,
            Decimal::new(-100, 2),
        )
        .is_err());

        // Free trips are allowed
        assert!(validate_trip_fields(
            "Coastal hike",
            "Lisbon",
            date(2026, 9, 1),
            date(2026, 9, 7),
            1,
            Decimal::ZERO,
        )
        .is_ok());
    }

    #[test]
    fn test_blank_title_and_destination_rejected() {
        assert!(validate_trip_fields(
            "   ",
            "Lisbon",
            date(2026, 9, 1),
            date(2026, 9, 7),
            1,
            Decimal::ZERO,
        )
        .is_err());
        assert!(validate_trip_fields(
            "Coastal hike",
            "",
            date(2026, 9, 1),
            date(2026, 9, 7),
            1,
            Decimal::ZERO,
        )
        .is_err());
    }
}
