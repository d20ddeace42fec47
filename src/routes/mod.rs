use axum::{
    routing::{get, post},
    Router,
};

use crate::config::{create_cors_layer, create_security_headers_layer};
use crate::handlers::{auth, bookings, health_check, trips, users};
use crate::state::AppState;

pub fn create_routes(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/token", post(auth::token));

    let user_routes = Router::new()
        .route(
            "/profile",
            get(users::get_profile).put(users::update_profile),
        )
        .route("/stats", get(users::stats));

    let trip_routes = Router::new()
        .route("/", get(trips::list_trips).post(trips::create_trip))
        .route("/mine", get(trips::my_trips))
        .route(
            "/:trip_id",
            get(trips::get_trip)
                .put(trips::update_trip)
                .delete(trips::delete_trip),
        )
        .route("/:trip_id/bookings", get(trips::trip_bookings))
        .route(
            "/:trip_id/bookings/:booking_id/confirm",
            post(trips::confirm_booking),
        );

    let booking_routes = Router::new()
        .route("/", post(bookings::create_booking))
        .route("/mine", get(bookings::my_bookings))
        .route("/:booking_id", get(bookings::get_booking))
        .route("/:booking_id/cancel", post(bookings::cancel_booking));

    Router::new()
        .route("/health", get(health_check))
        .nest("/auth", auth_routes)
        .nest("/users", user_routes)
        .nest("/trips", trip_routes)
        .nest("/bookings", booking_routes)
        .layer(create_security_headers_layer())
        .layer(create_cors_layer())
        .with_state(state)
}
