use crate::{
    AppState,
    auth::{self, AuthUser, MIN_PASSWORD_LENGTH},
    models::{
        AddCollectionRequest, AddWantlistRequest, AuthResponse, BoxSet, BoxSetResponse,
        CollectionEntryResponse, CreatePublisherRequest, LoginRequest, Publisher,
        PublisherInUseResponse, RegisterRequest, Tape, UpdatePublisherRequest, UserProfile,
        WantlistEntryResponse,
    },
    repository::{PublisherUpdate, TapeFilter},
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use uuid::Uuid;

// --- Filter Structs ---

/// TapeListFilter
///
/// Accepted query parameters for the catalogue listing endpoint (GET /api/tapes).
/// Used by Axum's Query extractor to safely bind HTTP query parameters.
#[derive(Deserialize, utoipa::IntoParams)]
pub struct TapeListFilter {
    /// Filter by release year.
    pub year: Option<i32>,
    /// Filter by genre (case-insensitive exact match).
    pub genre: Option<String>,
    /// Case-insensitive search across title, label, and description.
    pub search: Option<String>,
    /// Filter by publisher.
    pub publisher_id: Option<Uuid>,
    /// Filter by box set membership.
    pub box_set_id: Option<Uuid>,
}

/// slugify
///
/// Derives a URL-safe slug from a publisher name: lowercase alphanumerics,
/// runs of everything else collapsed to single dashes.
fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_dash = true;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

// --- Auth Handlers ---

/// register
///
/// [Public Route] Creates a new account. Validates field presence and password
/// length, rejects duplicate usernames/emails, stores an Argon2id hash, and
/// returns a signed token alongside the new profile.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registered", body = AuthResponse),
        (status = 400, description = "Missing field, weak password, or duplicate username/email")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), StatusCode> {
    let username = payload.username.trim();
    let email = payload.email.trim();

    if username.is_empty() || email.is_empty() || payload.password.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    if payload.password.len() < MIN_PASSWORD_LENGTH {
        return Err(StatusCode::BAD_REQUEST);
    }

    // Duplicate checks before hashing; the unique constraints still back this
    // up at insert time.
    if state.repo.get_user_by_username(username).await.is_some() {
        return Err(StatusCode::BAD_REQUEST);
    }
    if state.repo.get_user_by_email(email).await.is_some() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let password_hash = auth::hash_password(&payload.password).map_err(|e| {
        tracing::error!("password hashing failed: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    let user = state
        .repo
        .create_user(username, email, &password_hash)
        .await
        // None here means we lost a duplicate race to the unique constraint.
        .ok_or(StatusCode::BAD_REQUEST)?;

    let token = auth::issue_token(user.id, &state.config.jwt_secret, state.config.token_ttl_secs)
        .map_err(|e| {
            tracing::error!("token issuance failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user: user.into(),
        }),
    ))
}

/// login
///
/// [Public Route] Verifies email + password and issues a fresh token.
/// Wrong email and wrong password both map to a plain 401; the response never
/// reveals which half failed.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = AuthResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, StatusCode> {
    if payload.email.trim().is_empty() || payload.password.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let user = state
        .repo
        .get_user_by_email(payload.email.trim())
        .await
        .ok_or(StatusCode::UNAUTHORIZED)?;

    if !auth::verify_password(&payload.password, &user.password_hash) {
        return Err(StatusCode::UNAUTHORIZED);
    }

    let token = auth::issue_token(user.id, &state.config.jwt_secret, state.config.token_ttl_secs)
        .map_err(|e| {
            tracing::error!("token issuance failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    Ok(Json(AuthResponse {
        token,
        user: user.into(),
    }))
}

/// get_me
///
/// [Authenticated Route] Returns the authenticated user's profile.
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Profile", body = UserProfile),
        (status = 401, description = "Unauthenticated")
    )
)]
pub async fn get_me(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<UserProfile>, StatusCode> {
    // The extractor already confirmed existence; a miss here means the account
    // vanished mid-request.
    let user = state.repo.get_user(id).await.ok_or(StatusCode::UNAUTHORIZED)?;
    Ok(Json(user.into()))
}

/// refresh_token
///
/// [Authenticated Route] Exchanges a valid, unexpired token for a fresh one.
/// This backs the frontend's token-refresh flow; expired tokens are rejected by
/// the extractor and require a full login.
#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    responses(
        (status = 200, description = "New token", body = AuthResponse),
        (status = 401, description = "Unauthenticated")
    )
)]
pub async fn refresh_token(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<AuthResponse>, StatusCode> {
    let user = state.repo.get_user(id).await.ok_or(StatusCode::UNAUTHORIZED)?;

    let token = auth::issue_token(user.id, &state.config.jwt_secret, state.config.token_ttl_secs)
        .map_err(|e| {
            tracing::error!("token issuance failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    Ok(Json(AuthResponse {
        token,
        user: user.into(),
    }))
}

// --- Tape Handlers ---

/// get_tapes
///
/// [Public Route] Lists catalogue tapes with filtering and search.
#[utoipa::path(
    get,
    path = "/api/tapes",
    params(TapeListFilter),
    responses((status = 200, description = "Filtered tape list", body = [Tape]))
)]
pub async fn get_tapes(
    State(state): State<AppState>,
    Query(filter): Query<TapeListFilter>,
) -> Json<Vec<Tape>> {
    let tapes = state
        .repo
        .get_tapes(TapeFilter {
            year: filter.year,
            genre: filter.genre,
            search: filter.search,
            publisher_id: filter.publisher_id,
            box_set_id: filter.box_set_id,
        })
        .await;
    Json(tapes)
}

/// get_tape_details
///
/// [Public Route] Retrieves a single tape by ID.
#[utoipa::path(
    get,
    path = "/api/tapes/{id}",
    params(("id" = Uuid, Path, description = "Tape ID")),
    responses(
        (status = 200, description = "Found", body = Tape),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_tape_details(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Tape>, StatusCode> {
    match state.repo.get_tape(id).await {
        Some(tape) => Ok(Json(tape)),
        None => Err(StatusCode::NOT_FOUND),
    }
}

// --- Publisher Handlers ---

/// get_publishers
///
/// [Public Route] Lists all publishers.
#[utoipa::path(
    get,
    path = "/api/publishers",
    responses((status = 200, description = "Publishers", body = [Publisher]))
)]
pub async fn get_publishers(State(state): State<AppState>) -> Json<Vec<Publisher>> {
    Json(state.repo.get_publishers().await)
}

/// get_publisher_details
///
/// [Public Route] Retrieves a single publisher by ID.
#[utoipa::path(
    get,
    path = "/api/publishers/{id}",
    params(("id" = Uuid, Path, description = "Publisher ID")),
    responses(
        (status = 200, description = "Found", body = Publisher),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_publisher_details(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Publisher>, StatusCode> {
    match state.repo.get_publisher(id).await {
        Some(publisher) => Ok(Json(publisher)),
        None => Err(StatusCode::NOT_FOUND),
    }
}

/// create_publisher
///
/// [Authenticated Route] Creates a publisher. The slug is derived from the name
/// when not provided. Duplicate names/slugs map to 400, as does a name that
/// yields no usable slug.
#[utoipa::path(
    post,
    path = "/api/publishers",
    request_body = CreatePublisherRequest,
    responses(
        (status = 201, description = "Created", body = Publisher),
        (status = 400, description = "Missing/unsluggable name or duplicate name/slug")
    )
)]
pub async fn create_publisher(
    AuthUser { .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreatePublisherRequest>,
) -> Result<(StatusCode, Json<Publisher>), StatusCode> {
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let slug = payload
        .slug
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| slugify(name));

    // A name with no ASCII alphanumerics slugifies to "", which would collide
    // with every other unsluggable name. Ask the caller for an explicit slug.
    if slug.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let publisher = state
        .repo
        .create_publisher(name, &slug, payload.description, payload.logo_image)
        .await
        // None means the unique constraint on name/slug fired.
        .ok_or(StatusCode::BAD_REQUEST)?;

    Ok((StatusCode::CREATED, Json(publisher)))
}

/// update_publisher
///
/// [Authenticated Route] Partial update of a publisher via COALESCE; only the
/// provided fields change. Renaming onto an existing name/slug is a 400; the
/// 404 is reserved for a publisher that does not exist.
#[utoipa::path(
    put,
    path = "/api/publishers/{id}",
    params(("id" = Uuid, Path, description = "Publisher ID")),
    request_body = UpdatePublisherRequest,
    responses(
        (status = 200, description = "Updated", body = Publisher),
        (status = 400, description = "New name/slug already taken"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_publisher(
    AuthUser { .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePublisherRequest>,
) -> Result<Json<Publisher>, StatusCode> {
    match state.repo.update_publisher(id, payload).await {
        PublisherUpdate::Updated(publisher) => Ok(Json(publisher)),
        PublisherUpdate::Conflict => Err(StatusCode::BAD_REQUEST),
        PublisherUpdate::NotFound => Err(StatusCode::NOT_FOUND),
    }
}

/// delete_publisher
///
/// [Authenticated Route] Deletes a publisher, refusing while tapes still
/// reference it. The refusal body carries the blocking tape count as
/// `tapesCount` so the frontend can explain the failure.
#[utoipa::path(
    delete,
    path = "/api/publishers/{id}",
    params(("id" = Uuid, Path, description = "Publisher ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 400, description = "Tapes still reference this publisher", body = PublisherInUseResponse),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_publisher(
    AuthUser { .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Response {
    if state.repo.get_publisher(id).await.is_none() {
        return StatusCode::NOT_FOUND.into_response();
    }

    let tapes_count = state.repo.count_publisher_tapes(id).await;
    if tapes_count > 0 {
        let body = PublisherInUseResponse {
            message: "Cannot delete a publisher that still has tapes".to_string(),
            tapes_count,
        };
        return (StatusCode::BAD_REQUEST, Json(body)).into_response();
    }

    if state.repo.delete_publisher(id).await {
        StatusCode::NO_CONTENT.into_response()
    } else {
        StatusCode::NOT_FOUND.into_response()
    }
}

// --- Box Set Handlers ---

/// get_box_sets
///
/// [Public Route] Lists all box sets.
#[utoipa::path(
    get,
    path = "/api/boxsets",
    responses((status = 200, description = "Box sets", body = [BoxSet]))
)]
pub async fn get_box_sets(State(state): State<AppState>) -> Json<Vec<BoxSet>> {
    Json(state.repo.get_box_sets().await)
}

/// get_box_set_details
///
/// [Public Route] Retrieves a box set together with every tape it contains.
#[utoipa::path(
    get,
    path = "/api/boxsets/{id}",
    params(("id" = Uuid, Path, description = "Box set ID")),
    responses(
        (status = 200, description = "Found", body = BoxSetResponse),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_box_set_details(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<BoxSetResponse>, StatusCode> {
    let box_set = state.repo.get_box_set(id).await.ok_or(StatusCode::NOT_FOUND)?;
    let tapes = state.repo.get_box_set_tapes(id).await;

    Ok(Json(BoxSetResponse {
        id: box_set.id,
        title: box_set.title,
        year: box_set.year,
        label: box_set.label,
        cover_image: box_set.cover_image,
        description: box_set.description,
        tapes,
    }))
}

// --- Collection Handlers ---

/// get_collection
///
/// [Authenticated Route] Lists the caller's collection, each entry joined with
/// its tape's display fields.
#[utoipa::path(
    get,
    path = "/api/collection",
    responses((status = 200, description = "My collection", body = [CollectionEntryResponse]))
)]
pub async fn get_collection(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Json<Vec<CollectionEntryResponse>> {
    Json(state.repo.get_collection(id).await)
}

/// add_to_collection
///
/// [Authenticated Route] Adds a tape to the caller's collection.
/// Unknown tape: 404. Tape already in the collection: 400.
#[utoipa::path(
    post,
    path = "/api/collection",
    request_body = AddCollectionRequest,
    responses(
        (status = 201, description = "Added", body = CollectionEntryResponse),
        (status = 400, description = "Tape already in collection"),
        (status = 404, description = "Tape does not exist")
    )
)]
pub async fn add_to_collection(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<AddCollectionRequest>,
) -> Result<(StatusCode, Json<CollectionEntryResponse>), StatusCode> {
    if state.repo.get_tape(payload.tape_id).await.is_none() {
        return Err(StatusCode::NOT_FOUND);
    }

    match state.repo.add_to_collection(user_id, payload).await {
        Some(entry) => Ok((StatusCode::CREATED, Json(entry))),
        // The (user_id, tape_id) unique constraint fired.
        None => Err(StatusCode::BAD_REQUEST),
    }
}

/// remove_from_collection
///
/// [Authenticated Route] Removes an entry from the caller's collection.
/// An entry belonging to another user yields 403, a missing entry 404.
#[utoipa::path(
    delete,
    path = "/api/collection/{id}",
    params(("id" = Uuid, Path, description = "Collection entry ID")),
    responses(
        (status = 204, description = "Removed"),
        (status = 403, description = "Entry belongs to another user"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn remove_from_collection(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> StatusCode {
    let entry = match state.repo.get_collection_entry(id).await {
        Some(entry) => entry,
        None => return StatusCode::NOT_FOUND,
    };

    if entry.user_id != user_id {
        return StatusCode::FORBIDDEN;
    }

    if state.repo.remove_collection_entry(id).await {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

// --- Wantlist Handlers ---

/// get_wantlist
///
/// [Authenticated Route] Lists the caller's wantlist, highest priority first.
#[utoipa::path(
    get,
    path = "/api/wantlist",
    responses((status = 200, description = "My wantlist", body = [WantlistEntryResponse]))
)]
pub async fn get_wantlist(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Json<Vec<WantlistEntryResponse>> {
    Json(state.repo.get_wantlist(id).await)
}

/// add_to_wantlist
///
/// [Authenticated Route] Adds a tape to the caller's wantlist.
/// Unknown tape: 404. Tape already wanted: 400.
#[utoipa::path(
    post,
    path = "/api/wantlist",
    request_body = AddWantlistRequest,
    responses(
        (status = 201, description = "Added", body = WantlistEntryResponse),
        (status = 400, description = "Tape already in wantlist"),
        (status = 404, description = "Tape does not exist")
    )
)]
pub async fn add_to_wantlist(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<AddWantlistRequest>,
) -> Result<(StatusCode, Json<WantlistEntryResponse>), StatusCode> {
    if state.repo.get_tape(payload.tape_id).await.is_none() {
        return Err(StatusCode::NOT_FOUND);
    }

    match state.repo.add_to_wantlist(user_id, payload).await {
        Some(entry) => Ok((StatusCode::CREATED, Json(entry))),
        None => Err(StatusCode::BAD_REQUEST),
    }
}

/// remove_from_wantlist
///
/// [Authenticated Route] Removes an entry from the caller's wantlist.
/// Same 403/404 split as the collection delete.
#[utoipa::path(
    delete,
    path = "/api/wantlist/{id}",
    params(("id" = Uuid, Path, description = "Wantlist entry ID")),
    responses(
        (status = 204, description = "Removed"),
        (status = 403, description = "Entry belongs to another user"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn remove_from_wantlist(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> StatusCode {
    let entry = match state.repo.get_wantlist_entry(id).await {
        Some(entry) => entry,
        None => return StatusCode::NOT_FOUND,
    };

    if entry.user_id != user_id {
        return StatusCode::FORBIDDEN;
    }

    if state.repo.remove_wantlist_entry(id).await {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

#[cfg(test)]
mod tests {
    use super::slugify;

    #[test]
    fn slugify_collapses_punctuation() {
        assert_eq!(slugify("Vestron Video Int'l."), "vestron-video-int-l");
        assert_eq!(slugify("  CBS/FOX  "), "cbs-fox");
        assert_eq!(slugify("Media Home Entertainment"), "media-home-entertainment");
    }
}
