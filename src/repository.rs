use crate::models::{
    AddCollectionRequest, AddWantlistRequest, BoxSet, CollectionEntry, CollectionEntryResponse,
    Publisher, Tape, UpdatePublisherRequest, User, WantlistEntry, WantlistEntryResponse,
};
use async_trait::async_trait;
use sqlx::{PgPool, query_builder::QueryBuilder};
use std::sync::Arc;
use uuid::Uuid;

/// TapeFilter
///
/// Bundle of optional filters for the catalogue listing. Every field narrows
/// the result set; absent fields are ignored.
#[derive(Debug, Clone, Default)]
pub struct TapeFilter {
    pub year: Option<i32>,
    pub genre: Option<String>,
    pub search: Option<String>,
    pub publisher_id: Option<Uuid>,
    pub box_set_id: Option<Uuid>,
}

/// Repository Trait
///
/// Defines the abstract contract for all persistence operations. Handlers talk
/// to this trait, never to the pool, so the whole data layer can be swapped for
/// a mock in tests.
///
/// **Send + Sync + async_trait** are required to make the trait object
/// (`Arc<dyn Repository>`) safely shareable across Axum's task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn get_user(&self, id: Uuid) -> Option<User>;
    async fn get_user_by_email(&self, email: &str) -> Option<User>;
    async fn get_user_by_username(&self, username: &str) -> Option<User>;
    // Returns None when the username or email is already taken.
    async fn create_user(&self, username: &str, email: &str, password_hash: &str) -> Option<User>;

    // --- Tapes ---
    async fn get_tapes(&self, filter: TapeFilter) -> Vec<Tape>;
    async fn get_tape(&self, id: Uuid) -> Option<Tape>;

    // --- Publishers ---
    async fn get_publishers(&self) -> Vec<Publisher>;
    async fn get_publisher(&self, id: Uuid) -> Option<Publisher>;
    // Returns None on a duplicate name/slug.
    async fn create_publisher(
        &self,
        name: &str,
        slug: &str,
        description: Option<String>,
        logo_image: Option<String>,
    ) -> Option<Publisher>;
    // Partial update via COALESCE; only provided fields change.
    async fn update_publisher(&self, id: Uuid, req: UpdatePublisherRequest) -> PublisherUpdate;
    // Number of tapes still referencing the publisher; gates deletion.
    async fn count_publisher_tapes(&self, id: Uuid) -> i64;
    async fn delete_publisher(&self, id: Uuid) -> bool;

    // --- Box Sets ---
    async fn get_box_sets(&self) -> Vec<BoxSet>;
    async fn get_box_set(&self, id: Uuid) -> Option<BoxSet>;
    async fn get_box_set_tapes(&self, id: Uuid) -> Vec<Tape>;

    // --- Collection ---
    async fn get_collection(&self, user_id: Uuid) -> Vec<CollectionEntryResponse>;
    // Returns None when the (user, tape) pair already exists.
    async fn add_to_collection(
        &self,
        user_id: Uuid,
        req: AddCollectionRequest,
    ) -> Option<CollectionEntryResponse>;
    // Raw entry fetch, used for the ownership check before deletion.
    async fn get_collection_entry(&self, id: Uuid) -> Option<CollectionEntry>;
    async fn remove_collection_entry(&self, id: Uuid) -> bool;

    // --- Wantlist ---
    async fn get_wantlist(&self, user_id: Uuid) -> Vec<WantlistEntryResponse>;
    async fn add_to_wantlist(
        &self,
        user_id: Uuid,
        req: AddWantlistRequest,
    ) -> Option<WantlistEntryResponse>;
    async fn get_wantlist_entry(&self, id: Uuid) -> Option<WantlistEntry>;
    async fn remove_wantlist_entry(&self, id: Uuid) -> bool;
}

/// PublisherUpdate
///
/// Outcome of a publisher update. `Conflict` means the new name or slug is
/// already taken by another row, which the handler maps to 400 rather than
/// the 404 reserved for a missing publisher.
#[derive(Debug, Clone)]
pub enum PublisherUpdate {
    Updated(Publisher),
    NotFound,
    Conflict,
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer access across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by PostgreSQL.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const TAPE_COLUMNS: &str = "id, title, year, genre, format, label, runtime_minutes, \
     description, cover_image, publisher_id, box_set_id, created_at, updated_at";

#[async_trait]
impl Repository for PostgresRepository {
    // --- USERS ---

    /// get_user
    ///
    /// Retrieves the full user row (including the password hash) by primary key.
    /// Backs the auth extractor's existence check.
    async fn get_user(&self, id: Uuid) -> Option<User> {
        sqlx::query_as::<_, User>(
            "SELECT id, username, email, password_hash, created_at, updated_at \
             FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_user error: {:?}", e);
            None
        })
    }

    /// get_user_by_email
    ///
    /// Login lookup. Email comparison is case-insensitive to match how the
    /// registration form stores addresses.
    async fn get_user_by_email(&self, email: &str) -> Option<User> {
        sqlx::query_as::<_, User>(
            "SELECT id, username, email, password_hash, created_at, updated_at \
             FROM users WHERE lower(email) = lower($1)",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_user_by_email error: {:?}", e);
            None
        })
    }

    /// get_user_by_username
    ///
    /// Duplicate check during registration.
    async fn get_user_by_username(&self, username: &str) -> Option<User> {
        sqlx::query_as::<_, User>(
            "SELECT id, username, email, password_hash, created_at, updated_at \
             FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_user_by_username error: {:?}", e);
            None
        })
    }

    /// create_user
    ///
    /// Inserts a new user. `ON CONFLICT DO NOTHING` turns a duplicate
    /// username/email race into a clean None instead of an error, so the
    /// handler can map it to a 400.
    async fn create_user(&self, username: &str, email: &str, password_hash: &str) -> Option<User> {
        sqlx::query_as::<_, User>(
            "INSERT INTO users (id, username, email, password_hash, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, NOW(), NOW()) \
             ON CONFLICT DO NOTHING \
             RETURNING id, username, email, password_hash, created_at, updated_at",
        )
        .bind(Uuid::new_v4())
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("create_user error: {:?}", e);
            None
        })
    }

    // --- TAPES ---

    /// get_tapes
    ///
    /// Implements flexible search/filtering using QueryBuilder for safe
    /// parameterization. Search is case-insensitive across title, label,
    /// and description.
    async fn get_tapes(&self, filter: TapeFilter) -> Vec<Tape> {
        let mut builder: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(format!(
            "SELECT {} FROM tapes WHERE true ",
            TAPE_COLUMNS
        ));

        if let Some(y) = filter.year {
            builder.push(" AND year = ");
            builder.push_bind(y);
        }

        // Exact match, case-folded. ILIKE would let % and _ in the query
        // string act as wildcards.
        if let Some(g) = filter.genre {
            builder.push(" AND lower(genre) = lower(");
            builder.push_bind(g);
            builder.push(")");
        }

        if let Some(p) = filter.publisher_id {
            builder.push(" AND publisher_id = ");
            builder.push_bind(p);
        }

        if let Some(b) = filter.box_set_id {
            builder.push(" AND box_set_id = ");
            builder.push_bind(b);
        }

        if let Some(s) = filter.search {
            let search_pattern = format!("%{}%", s);
            builder.push(" AND (title ILIKE ");
            builder.push_bind(search_pattern.clone());
            builder.push(" OR label ILIKE ");
            builder.push_bind(search_pattern.clone());
            builder.push(" OR description ILIKE ");
            builder.push_bind(search_pattern);
            builder.push(")");
        }

        builder.push(" ORDER BY title ASC, year ASC");

        let query = builder.build_query_as::<Tape>();

        match query.fetch_all(&self.pool).await {
            Ok(t) => t,
            Err(e) => {
                tracing::error!("get_tapes error: {:?}", e);
                vec![]
            }
        }
    }

    /// get_tape
    ///
    /// Retrieves a single tape by ID.
    async fn get_tape(&self, id: Uuid) -> Option<Tape> {
        sqlx::query_as::<_, Tape>(&format!(
            "SELECT {} FROM tapes WHERE id = $1",
            TAPE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_tape error: {:?}", e);
            None
        })
    }

    // --- PUBLISHERS ---

    /// get_publishers
    ///
    /// Lists every publisher, alphabetically.
    async fn get_publishers(&self) -> Vec<Publisher> {
        sqlx::query_as::<_, Publisher>(
            "SELECT id, name, slug, description, logo_image FROM publishers ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_publishers error: {:?}", e);
            vec![]
        })
    }

    /// get_publisher
    ///
    /// Retrieves a single publisher by ID.
    async fn get_publisher(&self, id: Uuid) -> Option<Publisher> {
        sqlx::query_as::<_, Publisher>(
            "SELECT id, name, slug, description, logo_image FROM publishers WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_publisher error: {:?}", e);
            None
        })
    }

    /// create_publisher
    ///
    /// Inserts a new publisher. A duplicate name or slug hits the unique
    /// constraint and comes back as None via `ON CONFLICT DO NOTHING`.
    async fn create_publisher(
        &self,
        name: &str,
        slug: &str,
        description: Option<String>,
        logo_image: Option<String>,
    ) -> Option<Publisher> {
        sqlx::query_as::<_, Publisher>(
            "INSERT INTO publishers (id, name, slug, description, logo_image) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT DO NOTHING \
             RETURNING id, name, slug, description, logo_image",
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(slug)
        .bind(description)
        .bind(logo_image)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("create_publisher error: {:?}", e);
            None
        })
    }

    /// update_publisher
    ///
    /// Partial update using PostgreSQL `COALESCE`: a column only changes when
    /// the corresponding request field is `Some`. A unique violation on the
    /// new name/slug (SQLSTATE 23505) is reported as `Conflict` so the handler
    /// can tell "name taken" apart from "no such publisher".
    async fn update_publisher(&self, id: Uuid, req: UpdatePublisherRequest) -> PublisherUpdate {
        let result = sqlx::query_as::<_, Publisher>(
            "UPDATE publishers \
             SET name = COALESCE($2, name), \
                 slug = COALESCE($3, slug), \
                 description = COALESCE($4, description), \
                 logo_image = COALESCE($5, logo_image) \
             WHERE id = $1 \
             RETURNING id, name, slug, description, logo_image",
        )
        .bind(id)
        .bind(req.name)
        .bind(req.slug)
        .bind(req.description)
        .bind(req.logo_image)
        .fetch_optional(&self.pool)
        .await;

        match result {
            Ok(Some(publisher)) => PublisherUpdate::Updated(publisher),
            Ok(None) => PublisherUpdate::NotFound,
            Err(sqlx::Error::Database(db_err)) if db_err.code().as_deref() == Some("23505") => {
                PublisherUpdate::Conflict
            }
            Err(e) => {
                tracing::error!("update_publisher error: {:?}", e);
                PublisherUpdate::NotFound
            }
        }
    }

    /// count_publisher_tapes
    ///
    /// Counts tapes still referencing a publisher. The delete handler refuses
    /// to remove a publisher while this is non-zero.
    async fn count_publisher_tapes(&self, id: Uuid) -> i64 {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM tapes WHERE publisher_id = $1")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("count_publisher_tapes error: {:?}", e);
                0
            })
    }

    /// delete_publisher
    ///
    /// Removes a publisher row. Returns true only if a row was deleted.
    async fn delete_publisher(&self, id: Uuid) -> bool {
        match sqlx::query("DELETE FROM publishers WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
        {
            Ok(res) => res.rows_affected() > 0,
            Err(e) => {
                tracing::error!("delete_publisher error: {:?}", e);
                false
            }
        }
    }

    // --- BOX SETS ---

    /// get_box_sets
    ///
    /// Lists every box set, newest release year first.
    async fn get_box_sets(&self) -> Vec<BoxSet> {
        sqlx::query_as::<_, BoxSet>(
            "SELECT id, title, year, label, cover_image, description \
             FROM box_sets ORDER BY year DESC NULLS LAST, title ASC",
        )
        .fetch_all(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_box_sets error: {:?}", e);
            vec![]
        })
    }

    /// get_box_set
    ///
    /// Retrieves a single box set by ID.
    async fn get_box_set(&self, id: Uuid) -> Option<BoxSet> {
        sqlx::query_as::<_, BoxSet>(
            "SELECT id, title, year, label, cover_image, description FROM box_sets WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_box_set error: {:?}", e);
            None
        })
    }

    /// get_box_set_tapes
    ///
    /// All tapes belonging to a box set, in sleeve order (title).
    async fn get_box_set_tapes(&self, id: Uuid) -> Vec<Tape> {
        sqlx::query_as::<_, Tape>(&format!(
            "SELECT {} FROM tapes WHERE box_set_id = $1 ORDER BY title ASC",
            TAPE_COLUMNS
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_box_set_tapes error: {:?}", e);
            vec![]
        })
    }

    // --- COLLECTION ---

    /// get_collection
    ///
    /// Retrieves all collection entries for a user, joined with the tape's
    /// display fields for the UI-ready response shape.
    async fn get_collection(&self, user_id: Uuid) -> Vec<CollectionEntryResponse> {
        sqlx::query_as::<_, CollectionEntryResponse>(
            "SELECT c.id, c.tape_id, c.condition, c.notes, c.created_at, \
                    t.title AS tape_title, t.year AS tape_year, \
                    t.format AS tape_format, t.cover_image AS tape_cover_image \
             FROM user_collection c \
             JOIN tapes t ON c.tape_id = t.id \
             WHERE c.user_id = $1 \
             ORDER BY c.created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_collection error: {:?}", e);
            vec![]
        })
    }

    /// add_to_collection
    ///
    /// Inserts a collection entry and joins the tape in one round trip using a
    /// CTE, so the created entity already carries the joined tape data.
    /// `ON CONFLICT DO NOTHING` makes a duplicate (user, tape) pair return None.
    async fn add_to_collection(
        &self,
        user_id: Uuid,
        req: AddCollectionRequest,
    ) -> Option<CollectionEntryResponse> {
        sqlx::query_as::<_, CollectionEntryResponse>(
            "WITH inserted AS ( \
                 INSERT INTO user_collection (id, user_id, tape_id, condition, notes, created_at) \
                 VALUES ($1, $2, $3, $4, $5, NOW()) \
                 ON CONFLICT (user_id, tape_id) DO NOTHING \
                 RETURNING id, tape_id, condition, notes, created_at \
             ) \
             SELECT i.id, i.tape_id, i.condition, i.notes, i.created_at, \
                    t.title AS tape_title, t.year AS tape_year, \
                    t.format AS tape_format, t.cover_image AS tape_cover_image \
             FROM inserted i JOIN tapes t ON i.tape_id = t.id",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(req.tape_id)
        .bind(req.condition)
        .bind(req.notes)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("add_to_collection error: {:?}", e);
            None
        })
    }

    /// get_collection_entry
    ///
    /// Raw entry lookup. The delete handler uses this to distinguish
    /// "not yours" (403) from "not there" (404).
    async fn get_collection_entry(&self, id: Uuid) -> Option<CollectionEntry> {
        sqlx::query_as::<_, CollectionEntry>(
            "SELECT id, user_id, tape_id, condition, notes, created_at \
             FROM user_collection WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_collection_entry error: {:?}", e);
            None
        })
    }

    /// remove_collection_entry
    ///
    /// Deletes an entry by primary key. Ownership has already been verified by
    /// the handler.
    async fn remove_collection_entry(&self, id: Uuid) -> bool {
        match sqlx::query("DELETE FROM user_collection WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
        {
            Ok(res) => res.rows_affected() > 0,
            Err(e) => {
                tracing::error!("remove_collection_entry error: {:?}", e);
                false
            }
        }
    }

    // --- WANTLIST ---

    /// get_wantlist
    ///
    /// Retrieves all wantlist entries for a user, highest priority first,
    /// joined with the tape's display fields.
    async fn get_wantlist(&self, user_id: Uuid) -> Vec<WantlistEntryResponse> {
        sqlx::query_as::<_, WantlistEntryResponse>(
            "SELECT w.id, w.tape_id, w.priority, w.notes, w.created_at, \
                    t.title AS tape_title, t.year AS tape_year, \
                    t.format AS tape_format, t.cover_image AS tape_cover_image \
             FROM user_wantlist w \
             JOIN tapes t ON w.tape_id = t.id \
             WHERE w.user_id = $1 \
             ORDER BY w.priority ASC NULLS LAST, w.created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_wantlist error: {:?}", e);
            vec![]
        })
    }

    /// add_to_wantlist
    ///
    /// Same CTE insert-then-join shape as `add_to_collection`.
    async fn add_to_wantlist(
        &self,
        user_id: Uuid,
        req: AddWantlistRequest,
    ) -> Option<WantlistEntryResponse> {
        sqlx::query_as::<_, WantlistEntryResponse>(
            "WITH inserted AS ( \
                 INSERT INTO user_wantlist (id, user_id, tape_id, priority, notes, created_at) \
                 VALUES ($1, $2, $3, $4, $5, NOW()) \
                 ON CONFLICT (user_id, tape_id) DO NOTHING \
                 RETURNING id, tape_id, priority, notes, created_at \
             ) \
             SELECT i.id, i.tape_id, i.priority, i.notes, i.created_at, \
                    t.title AS tape_title, t.year AS tape_year, \
                    t.format AS tape_format, t.cover_image AS tape_cover_image \
             FROM inserted i JOIN tapes t ON i.tape_id = t.id",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(req.tape_id)
        .bind(req.priority)
        .bind(req.notes)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("add_to_wantlist error: {:?}", e);
            None
        })
    }

    /// get_wantlist_entry
    ///
    /// Raw entry lookup for the ownership check before deletion.
    async fn get_wantlist_entry(&self, id: Uuid) -> Option<WantlistEntry> {
        sqlx::query_as::<_, WantlistEntry>(
            "SELECT id, user_id, tape_id, priority, notes, created_at \
             FROM user_wantlist WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_wantlist_entry error: {:?}", e);
            None
        })
    }

    /// remove_wantlist_entry
    ///
    /// Deletes an entry by primary key after the handler's ownership check.
    async fn remove_wantlist_entry(&self, id: Uuid) -> bool {
        match sqlx::query("DELETE FROM user_wantlist WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
        {
            Ok(res) => res.rows_affected() > 0,
            Err(e) => {
                tracing::error!("remove_wantlist_entry error: {:?}", e);
                false
            }
        }
    }
}
