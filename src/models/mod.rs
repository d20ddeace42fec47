pub mod booking;
pub mod trip;
pub mod user;

pub use booking::{Booking, BookingStatus};
pub use trip::{Trip, TripStatus};
pub use user::User;
