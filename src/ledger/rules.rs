//! Capacity, pricing, and transition rules for bookings.
//!
//! Everything here is free of I/O. The write paths in the parent
//! module evaluate these rules inside a transaction holding the trip
//! row lock; read paths may evaluate them against a stale count.

use rust_decimal::Decimal;

use crate::models::BookingStatus;
use crate::utils::error::AppError;

/// Remaining capacity of a trip, in people. Negative only if
/// confirmations were ever allowed past capacity; callers that display
/// the value clamp it with [`display_spots`], write-time checks use
/// the raw value.
pub fn available_spots(max_participants: i32, confirmed_participants: i64) -> i64 {
    i64::from(max_participants) - confirmed_participants
}

pub fn display_spots(raw: i64) -> i64 {
    raw.max(0)
}

pub fn is_available(raw: i64) -> bool {
    raw > 0
}

/// Price snapshot taken at booking creation. Never recomputed, even if
/// the trip's price changes later.
pub fn booking_total(participants: i32, price_per_person: Decimal) -> Decimal {
    price_per_person * Decimal::from(participants)
}

pub fn check_capacity(participants: i32, raw_spots: i64) -> Result<(), AppError> {
    if i64::from(participants) > raw_spots {
        return Err(AppError::ValidationError(
            "insufficient capacity".to_string(),
        ));
    }
    Ok(())
}

/// The booking state machine.
///
/// | from      | to        | permitted actor           |
/// |-----------|-----------|---------------------------|
/// | pending   | confirmed | trip creator              |
/// | pending   | cancelled | booker or trip creator    |
/// | confirmed | cancelled | booker or trip creator    |
/// | cancelled | *         | nobody (terminal)         |
///
/// Actors outside the booking (neither booker nor creator) are
/// rejected before any state check, so they cannot probe a booking's
/// status.
pub fn authorize_transition(
    current: BookingStatus,
    target: BookingStatus,
    is_booker: bool,
    is_creator: bool,
) -> Result<(), AppError> {
    if !is_booker && !is_creator {
        return Err(AppError::Forbidden(
            "you do not have access to this booking".to_string(),
        ));
    }

    if current == target {
        return Err(AppError::StateError(format!(
            "booking already {}",
            target.as_str()
        )));
    }

    match (current, target) {
        (BookingStatus::Pending, BookingStatus::Confirmed) => {
            if !is_creator {
                return Err(AppError::Forbidden(
                    "only the trip creator can confirm a booking".to_string(),
                ));
            }
            Ok(())
        }
        (BookingStatus::Pending, BookingStatus::Cancelled)
        | (BookingStatus::Confirmed, BookingStatus::Cancelled) => Ok(()),
        _ => Err(AppError::StateError("invalid transition".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_available_spots_arithmetic() {
        assert_eq!(available_spots(10, 0), 10);
        assert_eq!(available_spots(10, 7), 3);
        assert_eq!(available_spots(10, 10), 0);
        // Overbooked trips surface the negative raw value for diagnostics
        assert_eq!(available_spots(10, 12), -2);
        assert_eq!(display_spots(-2), 0);
        assert_eq!(display_spots(3), 3);
    }

    #[test]
    fn test_is_available() {
        assert!(is_available(1));
        assert!(!is_available(0));
        assert!(!is_available(-1));
    }

    #[test]
    fn test_booking_total_is_participant_weighted() {
        let price = Decimal::new(5000, 2); // 50.00
        assert_eq!(booking_total(3, price), Decimal::new(15000, 2)); // 150.00
        assert_eq!(booking_total(1, price), price);
    }

    #[test]
    fn test_check_capacity() {
        assert!(check_capacity(2, 2).is_ok());
        assert!(check_capacity(2, 3).is_ok());
        let err = check_capacity(3, 2).unwrap_err();
        assert!(matches!(err, AppError::ValidationError(msg) if msg == "insufficient capacity"));
        // Raw negative spots reject everything
        assert!(check_capacity(1, -1).is_err());
    }

    #[test]
    fn test_creator_confirms_pending() {
        assert!(authorize_transition(
            BookingStatus::Pending,
            BookingStatus::Confirmed,
            false,
            true
        )
        .is_ok());
    }

    #[test]
    fn test_booker_cannot_confirm() {
        let err = authorize_transition(
            BookingStatus::Pending,
            BookingStatus::Confirmed,
            true,
            false,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn test_booker_and_creator_can_cancel() {
        for (is_booker, is_creator) in [(true, false), (false, true)] {
            assert!(authorize_transition(
                BookingStatus::Pending,
                BookingStatus::Cancelled,
                is_booker,
                is_creator
            )
            .is_ok());
            assert!(authorize_transition(
                BookingStatus::Confirmed,
                BookingStatus::Cancelled,
                is_booker,
                is_creator
            )
            .is_ok());
        }
    }

    #[test]
    fn test_stranger_is_rejected_first() {
        let err = authorize_transition(
            BookingStatus::Pending,
            BookingStatus::Cancelled,
            false,
            false,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn test_cancelled_is_terminal() {
        for target in [BookingStatus::Pending, BookingStatus::Confirmed] {
            let err =
                authorize_transition(BookingStatus::Cancelled, target, true, true).unwrap_err();
            assert!(matches!(err, AppError::StateError(msg) if msg == "invalid transition"));
        }
    }

    #[test]
    fn test_same_state_transitions_rejected() {
        let err = authorize_transition(
            BookingStatus::Confirmed,
            BookingStatus::Confirmed,
            false,
            true,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::StateError(msg) if msg == "booking already confirmed"));

        let err = authorize_transition(
            BookingStatus::Cancelled,
            BookingStatus::Cancelled,
            true,
            false,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::StateError(msg) if msg == "booking already cancelled"));
    }

    #[test]
    fn test_nothing_returns_to_pending() {
        let err = authorize_transition(
            BookingStatus::Confirmed,
            BookingStatus::Pending,
            false,
            true,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::StateError(_)));
    }

    // Spec-level scenario: a two-person trip is fully occupied by one
    // confirmed two-person booking, and a later one-person request is
    // rejected.
    #[test]
    fn test_capacity_exhaustion_scenario() {
        let price = Decimal::new(10000, 2); // 100.00
        let total = booking_total(2, price);
        assert_eq!(total, Decimal::new(20000, 2)); // 200.00

        let spots = available_spots(2, 2);
        assert_eq!(spots, 0);
        assert!(!is_available(spots));
        assert!(check_capacity(1, spots).is_err());
    }

    // Cancelling a confirmed booking frees its participant count.
    #[test]
    fn test_cancellation_frees_participant_count() {
        let before = available_spots(5, 4);
        assert_eq!(before, 1);
        // The cancelled booking held 3 people
        let after = available_spots(5, 4 - 3);
        assert_eq!(after, 4);
    }
}
