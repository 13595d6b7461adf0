use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// Raw database row (internal use). Maps to the `users` table, including the
/// Argon2 password hash. Never serialized to clients directly; handlers convert
/// it into a `UserProfile` first.
#[derive(Debug, Clone, FromRow, Default)]
pub struct User {
    pub id: Uuid,
    // Display identity, unique across the catalogue.
    pub username: String,
    // Login identity, unique.
    pub email: String,
    // Argon2id PHC string. Stays server-side.
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// UserProfile
///
/// Client-facing projection of a `User`, returned by the auth endpoints.
/// Carries everything the frontend needs and nothing it must not see.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            created_at: user.created_at,
        }
    }
}

/// Tape
///
/// A catalogued VHS title record from the `tapes` table. This is the primary
/// data structure of the catalogue; `(title, year)` is unique.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Tape {
    pub id: Uuid,
    pub title: String,
    pub year: i32,
    pub genre: Option<String>,
    // Physical release format, e.g. "VHS", "Betamax", "S-VHS".
    pub format: Option<String>,
    // Distribution label printed on the sleeve.
    pub label: Option<String>,
    pub runtime_minutes: Option<i32>,
    pub description: Option<String>,
    // URL or object key of the cover scan.
    pub cover_image: Option<String>,
    // FK to publishers.id.
    pub publisher_id: Option<Uuid>,
    // FK to box_sets.id, set when the tape was released as part of a set.
    pub box_set_id: Option<Uuid>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Publisher
///
/// A distribution company record from the `publishers` table.
/// `name` and `slug` are both unique.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Publisher {
    pub id: Uuid,
    pub name: String,
    // URL-safe identifier derived from the name.
    pub slug: String,
    pub description: Option<String>,
    pub logo_image: Option<String>,
}

/// BoxSet
///
/// A grouping of tapes released together, from the `box_sets` table.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct BoxSet {
    pub id: Uuid,
    pub title: String,
    pub year: Option<i32>,
    pub label: Option<String>,
    pub cover_image: Option<String>,
    pub description: Option<String>,
}

/// CollectionEntry
///
/// Raw database row for the `user_collection` table: one tape owned by one user.
/// `(user_id, tape_id)` is unique. Used internally by the repository for
/// ownership checks before deletion.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Default)]
pub struct CollectionEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub tape_id: Uuid,
    // Free-form grading, e.g. "mint", "worn sleeve".
    pub condition: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// WantlistEntry
///
/// Raw database row for the `user_wantlist` table: one tape a user is hunting for.
/// `(user_id, tape_id)` is unique.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Default)]
pub struct WantlistEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub tape_id: Uuid,
    // 1 = highest. Nullable; unranked entries sort last.
    pub priority: Option<i32>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

// --- Enriched Responses (Output Schemas) ---

/// CollectionEntryResponse
///
/// UI-ready collection row: the entry joined with its tape's display fields.
/// The flat shape comes straight out of the repository JOIN.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct CollectionEntryResponse {
    pub id: Uuid,
    pub tape_id: Uuid,
    pub condition: Option<String>,
    pub notes: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    // Joined from tapes.
    pub tape_title: String,
    pub tape_year: i32,
    pub tape_format: Option<String>,
    pub tape_cover_image: Option<String>,
}

/// WantlistEntryResponse
///
/// UI-ready wantlist row: the entry joined with its tape's display fields.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct WantlistEntryResponse {
    pub id: Uuid,
    pub tape_id: Uuid,
    pub priority: Option<i32>,
    pub notes: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    // Joined from tapes.
    pub tape_title: String,
    pub tape_year: i32,
    pub tape_format: Option<String>,
    pub tape_cover_image: Option<String>,
}

/// BoxSetResponse
///
/// Detail view for a box set: the set's own fields plus every tape it contains.
/// Assembled in the handler from two repository calls.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct BoxSetResponse {
    pub id: Uuid,
    pub title: String,
    pub year: Option<i32>,
    pub label: Option<String>,
    pub cover_image: Option<String>,
    pub description: Option<String>,
    pub tapes: Vec<Tape>,
}

/// AuthResponse
///
/// Output of register/login/refresh: the signed bearer token plus the profile
/// the frontend stores alongside it.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserProfile,
}

/// PublisherInUseResponse
///
/// Error body returned when deleting a publisher that still has tapes attached.
/// The frontend shows the count, hence the camelCase `tapesCount` key.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct PublisherInUseResponse {
    pub message: String,
    #[serde(rename = "tapesCount")]
    #[ts(rename = "tapesCount")]
    pub tapes_count: i64,
}

// --- Request Payloads (Input Schemas) ---

/// RegisterRequest
///
/// Input payload for POST /api/auth/register.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// LoginRequest
///
/// Input payload for POST /api/auth/login. Login is by email.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// AddCollectionRequest
///
/// Input payload for POST /api/collection.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct AddCollectionRequest {
    pub tape_id: Uuid,
    pub condition: Option<String>,
    pub notes: Option<String>,
}

/// AddWantlistRequest
///
/// Input payload for POST /api/wantlist.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct AddWantlistRequest {
    pub tape_id: Uuid,
    pub priority: Option<i32>,
    pub notes: Option<String>,
}

/// CreatePublisherRequest
///
/// Input payload for POST /api/publishers. The slug is optional and derived
/// from the name when absent.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreatePublisherRequest {
    pub name: String,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub logo_image: Option<String>,
}

/// UpdatePublisherRequest
///
/// Partial update payload for PUT /api/publishers/{id}.
///
/// Uses `Option<T>` for all fields with `#[serde(skip_serializing_if = "Option::is_none")]`
/// so only provided fields appear in the JSON payload; the repository applies them
/// with COALESCE.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdatePublisherRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_image: Option<String>,
}
