use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, get, post, put},
};

/// Authenticated Router Module
///
/// Defines the routes accessible only with a validated bearer token: the user's
/// own profile and token refresh, the per-user collection and wantlist, and
/// catalogue maintenance on publishers.
///
/// Access Control Strategy:
/// Every handler in this module relies on the `AuthUser` extractor middleware
/// being present on the router layer above this module. Each handler also takes
/// `AuthUser` directly, so the identity used for ownership checks (collection
/// and wantlist deletes) always comes from the verified token, never the body.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /api/auth/me
        // Retrieves the currently authenticated user's profile.
        .route("/api/auth/me", get(handlers::get_me))
        // POST /api/auth/refresh
        // Exchanges a valid, unexpired token for a fresh one.
        .route("/api/auth/refresh", post(handlers::refresh_token))
        // --- Collection ---
        // GET/POST /api/collection
        // Lists the caller's owned tapes; adds a tape to the collection.
        // Duplicate (user, tape) pairs are rejected with 400.
        .route(
            "/api/collection",
            get(handlers::get_collection).post(handlers::add_to_collection),
        )
        // DELETE /api/collection/{id}
        // Removes an entry. Entries belonging to another user yield 403.
        .route("/api/collection/{id}", delete(handlers::remove_from_collection))
        // --- Wantlist ---
        // GET/POST /api/wantlist
        // Lists the caller's wanted tapes (highest priority first); adds one.
        .route(
            "/api/wantlist",
            get(handlers::get_wantlist).post(handlers::add_to_wantlist),
        )
        // DELETE /api/wantlist/{id}
        // Removes an entry, with the same 403/404 ownership split as collection.
        .route("/api/wantlist/{id}", delete(handlers::remove_from_wantlist))
        // --- Publisher Maintenance ---
        // POST /api/publishers
        // Creates a publisher; the slug is derived from the name when absent.
        .route("/api/publishers", post(handlers::create_publisher))
        // PUT/DELETE /api/publishers/{id}
        // Partial update via COALESCE; delete refuses with 400 + tapesCount
        // while tapes still reference the publisher.
        .route(
            "/api/publishers/{id}",
            put(handlers::update_publisher).delete(handlers::delete_publisher),
        )
}
