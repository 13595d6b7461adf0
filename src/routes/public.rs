use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Defines endpoints that are **unauthenticated** and accessible to any client
/// (anonymous or logged-in): catalogue browsing plus the register/login gateway.
/// The catalogue (tapes, publishers, box sets) is world-readable; only per-user
/// lists and catalogue maintenance require a session.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // A simple, unauthenticated endpoint used for monitoring and load balancer checks.
        // Returns "ok" immediately to verify the service is running and responsive.
        .route("/health", get(|| async { "ok" }))
        // POST /api/auth/register
        // Creates a new account and returns a signed token plus the new profile.
        .route("/api/auth/register", post(handlers::register))
        // POST /api/auth/login
        // Verifies email + password and issues a fresh token.
        .route("/api/auth/login", post(handlers::login))
        // GET /api/tapes?year=&genre=&search=&publisher_id=&box_set_id=
        // Lists catalogue tapes, supporting filtering and case-insensitive search.
        .route("/api/tapes", get(handlers::get_tapes))
        // GET /api/tapes/{id}
        // Retrieves the detailed view of a single tape.
        .route("/api/tapes/{id}", get(handlers::get_tape_details))
        // GET /api/publishers
        // Lists all publishers alphabetically.
        .route("/api/publishers", get(handlers::get_publishers))
        // GET /api/publishers/{id}
        // Retrieves a single publisher.
        .route("/api/publishers/{id}", get(handlers::get_publisher_details))
        // GET /api/boxsets
        // Lists all box sets.
        .route("/api/boxsets", get(handlers::get_box_sets))
        // GET /api/boxsets/{id}
        // Retrieves a box set together with every tape it contains.
        .route("/api/boxsets/{id}", get(handlers::get_box_set_details))
}
