//! The booking ledger: owns whether a trip can accept a booking,
//! price snapshotting, and booking status transitions.
//!
//! Write paths (`create_booking`, `transition_status`) run inside a
//! single transaction that locks the trip row before counting
//! occupancy, so concurrent writers against the same trip serialize
//! and capacity can never be exceeded by an interleaved check. Read
//! paths are lock-free and may return a value that is stale by the
//! time a write is attempted; writers always re-check under the lock.

use rust_decimal::Decimal;
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::models::{Booking, BookingStatus, Trip};
use crate::utils::error::AppError;

pub mod rules;

const TRIP_COLUMNS: &str = "id, creator_id, title, description, destination, start_date, \
     end_date, max_participants, price_per_person, status, created_at, updated_at";

const BOOKING_COLUMNS: &str =
    "id, trip_id, user_id, status, participants, total_price, created_at, updated_at";

#[derive(Clone)]
pub struct BookingLedger {
    pool: PgPool,
}

impl BookingLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Raw remaining capacity of a trip. Lock-free; may be stale under
    /// concurrent writes.
    pub async fn available_spots(&self, trip_id: Uuid) -> Result<i64, AppError> {
        let max: Option<(i32,)> = sqlx::query_as("SELECT max_participants FROM trips WHERE id = $1")
            .bind(trip_id)
            .fetch_optional(&self.pool)
            .await?;
        let (max_participants,) =
            max.ok_or_else(|| AppError::NotFound("trip not found".to_string()))?;

        let occupied = confirmed_occupancy(&self.pool, trip_id).await?;
        Ok(rules::available_spots(max_participants, occupied))
    }

    pub async fn is_available(&self, trip_id: Uuid) -> Result<bool, AppError> {
        Ok(rules::is_available(self.available_spots(trip_id).await?))
    }

    /// Creates a pending booking, snapshotting the total price.
    ///
    /// The capacity check and the insert execute under a lock on the
    /// trip row; two concurrent calls that together exceed capacity
    /// cannot both succeed.
    pub async fn create_booking(
        &self,
        booker_id: Uuid,
        trip_id: Uuid,
        participants: i32,
    ) -> Result<Booking, AppError> {
        if participants < 1 {
            return Err(AppError::ValidationError(
                "at least 1 participant required".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await?;

        let trip: Option<Trip> = sqlx::query_as(&format!(
            "SELECT {TRIP_COLUMNS} FROM trips WHERE id = $1 FOR UPDATE"
        ))
        .bind(trip_id)
        .fetch_optional(&mut *tx)
        .await?;

        let trip = match trip {
            Some(trip) if trip.is_published() => trip,
            _ => {
                return Err(AppError::ValidationError(
                    "trip not found or unavailable".to_string(),
                ))
            }
        };

        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM bookings WHERE user_id = $1 AND trip_id = $2)",
        )
        .bind(booker_id)
        .bind(trip_id)
        .fetch_one(&mut *tx)
        .await?;
        if exists {
            return Err(AppError::ValidationError("duplicate booking".to_string()));
        }

        let occupied = confirmed_occupancy(&mut *tx, trip_id).await?;
        rules::check_capacity(
            participants,
            rules::available_spots(trip.max_participants, occupied),
        )?;

        let total_price = rules::booking_total(participants, trip.price_per_person);

        let booking: Booking = sqlx::query_as(&format!(
            "INSERT INTO bookings (id, trip_id, user_id, status, participants, total_price) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {BOOKING_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(trip_id)
        .bind(booker_id)
        .bind(BookingStatus::Pending.as_str())
        .bind(participants)
        .bind(total_price)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_booking_insert_error)?;

        tx.commit().await?;

        tracing::info!(
            booking_id = %booking.id,
            trip_id = %trip_id,
            participants,
            "Booking created"
        );

        Ok(booking)
    }

    /// Moves a booking to `target` on behalf of `actor_id`, enforcing
    /// the transition table and, on confirmation, re-checking capacity
    /// under the trip lock.
    pub async fn transition_status(
        &self,
        booking_id: Uuid,
        target: BookingStatus,
        actor_id: Uuid,
    ) -> Result<Booking, AppError> {
        let mut tx = self.pool.begin().await?;

        let booking: Option<Booking> = sqlx::query_as(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1 FOR UPDATE"
        ))
        .bind(booking_id)
        .fetch_optional(&mut *tx)
        .await?;
        let booking =
            booking.ok_or_else(|| AppError::NotFound("booking not found".to_string()))?;

        let trip: Trip = sqlx::query_as(&format!(
            "SELECT {TRIP_COLUMNS} FROM trips WHERE id = $1 FOR UPDATE"
        ))
        .bind(booking.trip_id)
        .fetch_one(&mut *tx)
        .await?;

        let current: BookingStatus = booking.status.parse().map_err(|_| {
            AppError::InternalServerError(format!(
                "booking {} has corrupt status '{}'",
                booking.id, booking.status
            ))
        })?;

        let is_booker = actor_id == booking.user_id;
        let is_creator = actor_id == trip.creator_id;
        rules::authorize_transition(current, target, is_booker, is_creator)?;

        // Overlapping pending bookings may each pass the creation-time
        // check; confirmation is the second gate that keeps the sum of
        // confirmed participants within capacity.
        if target == BookingStatus::Confirmed {
            let occupied = confirmed_occupancy(&mut *tx, booking.trip_id).await?;
            rules::check_capacity(
                booking.participants,
                rules::available_spots(trip.max_participants, occupied),
            )?;
        }

        let updated: Booking = sqlx::query_as(&format!(
            "UPDATE bookings SET status = $1, updated_at = NOW() WHERE id = $2 \
             RETURNING {BOOKING_COLUMNS}"
        ))
        .bind(target.as_str())
        .bind(booking_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            booking_id = %booking_id,
            from = %current,
            to = %target,
            "Booking status updated"
        );

        Ok(updated)
    }

    /// Total revenue of a trip: the sum of the price snapshots of its
    /// confirmed bookings.
    pub async fn total_revenue(&self, trip_id: Uuid) -> Result<Decimal, AppError> {
        let (sum,): (Decimal,) = sqlx::query_as(
            "SELECT COALESCE(SUM(total_price), 0) FROM bookings \
             WHERE trip_id = $1 AND status = $2",
        )
        .bind(trip_id)
        .bind(BookingStatus::Confirmed.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(sum)
    }
}

/// Sum of participants across a trip's confirmed bookings. Callers on
/// a write path pass their transaction so the count is read under the
/// trip row lock.
async fn confirmed_occupancy<'e, E>(executor: E, trip_id: Uuid) -> Result<i64, AppError>
where
    E: PgExecutor<'e>,
{
    let (occupied,): (i64,) = sqlx::query_as(
        "SELECT COALESCE(SUM(participants), 0) FROM bookings \
         WHERE trip_id = $1 AND status = $2",
    )
    .bind(trip_id)
    .bind(BookingStatus::Confirmed.as_str())
    .fetch_one(executor)
    .await?;
    Ok(occupied)
}

fn map_booking_insert_error(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(ref db) = e {
        // The UNIQUE (user_id, trip_id) constraint backs the in-transaction
        // duplicate check against racing inserts
        if db.constraint() == Some("bookings_user_id_trip_id_key") {
            return AppError::ValidationError("duplicate booking".to_string());
        }
    }
    AppError::DatabaseError(e)
}
