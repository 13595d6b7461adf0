use async_trait::async_trait;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;
use tape_head::{
    AppState,
    auth::{self, AuthUser},
    config::AppConfig,
    handlers,
    models::{
        AddCollectionRequest, AddWantlistRequest, AuthResponse, BoxSet, CollectionEntry,
        CollectionEntryResponse, CreatePublisherRequest, LoginRequest, Publisher, RegisterRequest,
        Tape, UpdatePublisherRequest, User, WantlistEntry, WantlistEntryResponse,
    },
    repository::{PublisherUpdate, Repository, TapeFilter},
};
use tokio::test;
use uuid::Uuid;

// --- MOCK REPOSITORY IMPLEMENTATION ---

// Central control point for testing handler logic. Handlers rely on the
// Repository trait, so we mock the trait implementation with pre-canned
// outputs.
pub struct MockRepoControl {
    pub user_to_return: Option<User>,
    pub user_by_email: Option<User>,
    pub user_by_username: Option<User>,
    // When true, create_user returns None as if the unique constraint fired.
    pub create_user_conflict: bool,

    pub tape_to_return: Option<Tape>,
    pub tapes_to_return: Vec<Tape>,

    pub publisher_to_return: Option<Publisher>,
    pub publishers_to_return: Vec<Publisher>,
    pub create_publisher_conflict: bool,
    pub update_publisher_result: PublisherUpdate,
    pub publisher_tapes_count: i64,
    pub delete_publisher_result: bool,

    pub box_set_to_return: Option<BoxSet>,
    pub box_sets_to_return: Vec<BoxSet>,

    pub collection_to_return: Vec<CollectionEntryResponse>,
    pub add_collection_result: Option<CollectionEntryResponse>,
    pub collection_entry_to_return: Option<CollectionEntry>,

    pub wantlist_to_return: Vec<WantlistEntryResponse>,
    pub add_wantlist_result: Option<WantlistEntryResponse>,
    pub wantlist_entry_to_return: Option<WantlistEntry>,

    pub remove_entry_result: bool,
}

impl Default for MockRepoControl {
    fn default() -> Self {
        MockRepoControl {
            user_to_return: Some(User::default()),
            user_by_email: None,
            user_by_username: None,
            create_user_conflict: false,
            tape_to_return: Some(Tape::default()),
            tapes_to_return: vec![],
            publisher_to_return: Some(Publisher::default()),
            publishers_to_return: vec![],
            create_publisher_conflict: false,
            update_publisher_result: PublisherUpdate::Updated(Publisher::default()),
            publisher_tapes_count: 0,
            delete_publisher_result: true,
            box_set_to_return: Some(BoxSet::default()),
            box_sets_to_return: vec![],
            collection_to_return: vec![],
            add_collection_result: Some(CollectionEntryResponse::default()),
            collection_entry_to_return: Some(CollectionEntry::default()),
            wantlist_to_return: vec![],
            add_wantlist_result: Some(WantlistEntryResponse::default()),
            wantlist_entry_to_return: Some(WantlistEntry::default()),
            remove_entry_result: true,
        }
    }
}

#[async_trait]
impl Repository for MockRepoControl {
    async fn get_user(&self, _id: Uuid) -> Option<User> {
        self.user_to_return.clone()
    }
    async fn get_user_by_email(&self, _email: &str) -> Option<User> {
        self.user_by_email.clone()
    }
    async fn get_user_by_username(&self, _username: &str) -> Option<User> {
        self.user_by_username.clone()
    }
    async fn create_user(&self, username: &str, email: &str, password_hash: &str) -> Option<User> {
        if self.create_user_conflict {
            return None;
        }
        // Echo the inputs back so tests can assert round-tripping.
        Some(User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            ..User::default()
        })
    }

    async fn get_tapes(&self, _filter: TapeFilter) -> Vec<Tape> {
        self.tapes_to_return.clone()
    }
    async fn get_tape(&self, _id: Uuid) -> Option<Tape> {
        self.tape_to_return.clone()
    }

    async fn get_publishers(&self) -> Vec<Publisher> {
        self.publishers_to_return.clone()
    }
    async fn get_publisher(&self, _id: Uuid) -> Option<Publisher> {
        self.publisher_to_return.clone()
    }
    async fn create_publisher(
        &self,
        name: &str,
        slug: &str,
        description: Option<String>,
        logo_image: Option<String>,
    ) -> Option<Publisher> {
        if self.create_publisher_conflict {
            return None;
        }
        // Echo inputs so the slug-derivation test can inspect what the
        // handler passed down.
        Some(Publisher {
            id: Uuid::new_v4(),
            name: name.to_string(),
            slug: slug.to_string(),
            description,
            logo_image,
        })
    }
    async fn update_publisher(
        &self,
        _id: Uuid,
        _req: UpdatePublisherRequest,
    ) -> PublisherUpdate {
        self.update_publisher_result.clone()
    }
    async fn count_publisher_tapes(&self, _id: Uuid) -> i64 {
        self.publisher_tapes_count
    }
    async fn delete_publisher(&self, _id: Uuid) -> bool {
        self.delete_publisher_result
    }

    async fn get_box_sets(&self) -> Vec<BoxSet> {
        self.box_sets_to_return.clone()
    }
    async fn get_box_set(&self, _id: Uuid) -> Option<BoxSet> {
        self.box_set_to_return.clone()
    }
    async fn get_box_set_tapes(&self, _id: Uuid) -> Vec<Tape> {
        self.tapes_to_return.clone()
    }

    async fn get_collection(&self, _user_id: Uuid) -> Vec<CollectionEntryResponse> {
        self.collection_to_return.clone()
    }
    async fn add_to_collection(
        &self,
        _user_id: Uuid,
        _req: AddCollectionRequest,
    ) -> Option<CollectionEntryResponse> {
        self.add_collection_result.clone()
    }
    async fn get_collection_entry(&self, _id: Uuid) -> Option<CollectionEntry> {
        self.collection_entry_to_return.clone()
    }
    async fn remove_collection_entry(&self, _id: Uuid) -> bool {
        self.remove_entry_result
    }

    async fn get_wantlist(&self, _user_id: Uuid) -> Vec<WantlistEntryResponse> {
        self.wantlist_to_return.clone()
    }
    async fn add_to_wantlist(
        &self,
        _user_id: Uuid,
        _req: AddWantlistRequest,
    ) -> Option<WantlistEntryResponse> {
        self.add_wantlist_result.clone()
    }
    async fn get_wantlist_entry(&self, _id: Uuid) -> Option<WantlistEntry> {
        self.wantlist_entry_to_return.clone()
    }
    async fn remove_wantlist_entry(&self, _id: Uuid) -> bool {
        self.remove_entry_result
    }
}

// --- TEST UTILITIES ---

const TEST_USER_ID: Uuid = Uuid::from_u128(123);
const OTHER_USER_ID: Uuid = Uuid::from_u128(456);
const TEST_ENTRY_ID: Uuid = Uuid::from_u128(789);

// Creates an AppState using the mock repository
fn create_test_state(repo_control: MockRepoControl) -> AppState {
    AppState {
        repo: Arc::new(repo_control),
        config: AppConfig::default(),
    }
}

// Creates an AuthUser for handler calls
fn test_user() -> AuthUser {
    AuthUser {
        id: TEST_USER_ID,
        username: "tapehound".to_string(),
    }
}

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let (_parts, body) = response.into_parts();
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// --- TAPE HANDLER TESTS ---

#[test]
async fn test_get_tape_details_success() {
    let mock_tape = Tape {
        title: "The Thing".to_string(),
        year: 1982,
        ..Tape::default()
    };
    let state = create_test_state(MockRepoControl {
        tape_to_return: Some(mock_tape.clone()),
        ..MockRepoControl::default()
    });

    let result = handlers::get_tape_details(State(state), Path(mock_tape.id)).await;

    assert!(result.is_ok());
    let tape: Tape = body_json(result.unwrap().into_response()).await;
    assert_eq!(tape.title, "The Thing");
    assert_eq!(tape.year, 1982);
}

#[test]
async fn test_get_tape_details_not_found() {
    let state = create_test_state(MockRepoControl {
        tape_to_return: None,
        ..MockRepoControl::default()
    });

    let result = handlers::get_tape_details(State(state), Path(Uuid::new_v4())).await;

    assert!(result.is_err());
    assert_eq!(result.unwrap_err(), StatusCode::NOT_FOUND);
}

// --- AUTH HANDLER TESTS ---

#[test]
async fn test_register_success_returns_token_and_profile() {
    let state = create_test_state(MockRepoControl {
        user_by_email: None,
        user_by_username: None,
        ..MockRepoControl::default()
    });

    let payload = RegisterRequest {
        username: "tapehound".to_string(),
        email: "hound@example.com".to_string(),
        password: "rewind-before-returning".to_string(),
    };

    let result = handlers::register(State(state), Json(payload)).await;

    assert!(result.is_ok());
    let (status, Json(auth)) = result.unwrap();
    assert_eq!(status, StatusCode::CREATED);
    assert!(!auth.token.is_empty());
    assert_eq!(auth.user.username, "tapehound");
    assert_eq!(auth.user.email, "hound@example.com");
}

#[test]
async fn test_register_rejects_short_password() {
    let state = create_test_state(MockRepoControl::default());

    let payload = RegisterRequest {
        username: "tapehound".to_string(),
        email: "hound@example.com".to_string(),
        password: "short".to_string(),
    };

    let result = handlers::register(State(state), Json(payload)).await;

    assert!(result.is_err());
    assert_eq!(result.unwrap_err(), StatusCode::BAD_REQUEST);
}

#[test]
async fn test_register_rejects_duplicate_username() {
    let state = create_test_state(MockRepoControl {
        user_by_username: Some(User::default()),
        ..MockRepoControl::default()
    });

    let payload = RegisterRequest {
        username: "tapehound".to_string(),
        email: "hound@example.com".to_string(),
        password: "rewind-before-returning".to_string(),
    };

    let result = handlers::register(State(state), Json(payload)).await;

    assert!(result.is_err());
    assert_eq!(result.unwrap_err(), StatusCode::BAD_REQUEST);
}

#[test]
async fn test_login_success() {
    let hash = auth::hash_password("rewind-before-returning").unwrap();
    let state = create_test_state(MockRepoControl {
        user_by_email: Some(User {
            id: TEST_USER_ID,
            username: "tapehound".to_string(),
            email: "hound@example.com".to_string(),
            password_hash: hash,
            ..User::default()
        }),
        ..MockRepoControl::default()
    });

    let payload = LoginRequest {
        email: "hound@example.com".to_string(),
        password: "rewind-before-returning".to_string(),
    };

    let result = handlers::login(State(state), Json(payload)).await;

    assert!(result.is_ok());
    let Json(auth_response) = result.unwrap();
    assert!(!auth_response.token.is_empty());
    assert_eq!(auth_response.user.id, TEST_USER_ID);
}

#[test]
async fn test_login_wrong_password() {
    let hash = auth::hash_password("rewind-before-returning").unwrap();
    let state = create_test_state(MockRepoControl {
        user_by_email: Some(User {
            password_hash: hash,
            ..User::default()
        }),
        ..MockRepoControl::default()
    });

    let payload = LoginRequest {
        email: "hound@example.com".to_string(),
        password: "be-kind-rewind".to_string(),
    };

    let result = handlers::login(State(state), Json(payload)).await;

    assert!(result.is_err());
    assert_eq!(result.unwrap_err(), StatusCode::UNAUTHORIZED);
}

#[test]
async fn test_login_unknown_email() {
    let state = create_test_state(MockRepoControl {
        user_by_email: None,
        ..MockRepoControl::default()
    });

    let payload = LoginRequest {
        email: "nobody@example.com".to_string(),
        password: "whatever-password".to_string(),
    };

    let result = handlers::login(State(state), Json(payload)).await;

    assert!(result.is_err());
    assert_eq!(result.unwrap_err(), StatusCode::UNAUTHORIZED);
}

#[test]
async fn test_refresh_token_issues_new_token() {
    let state = create_test_state(MockRepoControl {
        user_to_return: Some(User {
            id: TEST_USER_ID,
            username: "tapehound".to_string(),
            ..User::default()
        }),
        ..MockRepoControl::default()
    });

    let result = handlers::refresh_token(test_user(), State(state)).await;

    assert!(result.is_ok());
    let Json(auth_response): Json<AuthResponse> = result.unwrap();
    assert!(!auth_response.token.is_empty());
    assert_eq!(auth_response.user.id, TEST_USER_ID);
}

// --- COLLECTION HANDLER TESTS ---

#[test]
async fn test_add_to_collection_success_includes_tape_data() {
    let entry = CollectionEntryResponse {
        id: TEST_ENTRY_ID,
        tape_title: "Halloween III".to_string(),
        tape_year: 1982,
        ..CollectionEntryResponse::default()
    };
    let state = create_test_state(MockRepoControl {
        add_collection_result: Some(entry.clone()),
        ..MockRepoControl::default()
    });

    let payload = AddCollectionRequest {
        tape_id: Uuid::new_v4(),
        condition: Some("mint".to_string()),
        notes: None,
    };

    let result = handlers::add_to_collection(test_user(), State(state), Json(payload)).await;

    assert!(result.is_ok());
    let (status, Json(created)) = result.unwrap();
    assert_eq!(status, StatusCode::CREATED);
    // The created entity carries the joined tape data.
    assert_eq!(created.tape_title, "Halloween III");
    assert_eq!(created.tape_year, 1982);
}

#[test]
async fn test_add_to_collection_unknown_tape() {
    let state = create_test_state(MockRepoControl {
        tape_to_return: None,
        ..MockRepoControl::default()
    });

    let payload = AddCollectionRequest {
        tape_id: Uuid::new_v4(),
        condition: None,
        notes: None,
    };

    let result = handlers::add_to_collection(test_user(), State(state), Json(payload)).await;

    assert!(result.is_err());
    assert_eq!(result.unwrap_err(), StatusCode::NOT_FOUND);
}

#[test]
async fn test_add_to_collection_duplicate() {
    let state = create_test_state(MockRepoControl {
        // Tape exists, but the insert hits the (user, tape) unique constraint.
        add_collection_result: None,
        ..MockRepoControl::default()
    });

    let payload = AddCollectionRequest {
        tape_id: Uuid::new_v4(),
        condition: None,
        notes: None,
    };

    let result = handlers::add_to_collection(test_user(), State(state), Json(payload)).await;

    assert!(result.is_err());
    assert_eq!(result.unwrap_err(), StatusCode::BAD_REQUEST);
}

#[test]
async fn test_remove_from_collection_success() {
    let state = create_test_state(MockRepoControl {
        collection_entry_to_return: Some(CollectionEntry {
            id: TEST_ENTRY_ID,
            user_id: TEST_USER_ID,
            ..CollectionEntry::default()
        }),
        ..MockRepoControl::default()
    });

    let status =
        handlers::remove_from_collection(test_user(), State(state), Path(TEST_ENTRY_ID)).await;

    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[test]
async fn test_remove_from_collection_wrong_owner() {
    let state = create_test_state(MockRepoControl {
        collection_entry_to_return: Some(CollectionEntry {
            id: TEST_ENTRY_ID,
            user_id: OTHER_USER_ID,
            ..CollectionEntry::default()
        }),
        ..MockRepoControl::default()
    });

    let status =
        handlers::remove_from_collection(test_user(), State(state), Path(TEST_ENTRY_ID)).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[test]
async fn test_remove_from_collection_not_found() {
    let state = create_test_state(MockRepoControl {
        collection_entry_to_return: None,
        ..MockRepoControl::default()
    });

    let status =
        handlers::remove_from_collection(test_user(), State(state), Path(TEST_ENTRY_ID)).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

// --- WANTLIST HANDLER TESTS ---

#[test]
async fn test_add_to_wantlist_duplicate() {
    let state = create_test_state(MockRepoControl {
        add_wantlist_result: None,
        ..MockRepoControl::default()
    });

    let payload = AddWantlistRequest {
        tape_id: Uuid::new_v4(),
        priority: Some(1),
        notes: None,
    };

    let result = handlers::add_to_wantlist(test_user(), State(state), Json(payload)).await;

    assert!(result.is_err());
    assert_eq!(result.unwrap_err(), StatusCode::BAD_REQUEST);
}

#[test]
async fn test_remove_from_wantlist_wrong_owner() {
    let state = create_test_state(MockRepoControl {
        wantlist_entry_to_return: Some(WantlistEntry {
            id: TEST_ENTRY_ID,
            user_id: OTHER_USER_ID,
            ..WantlistEntry::default()
        }),
        ..MockRepoControl::default()
    });

    let status =
        handlers::remove_from_wantlist(test_user(), State(state), Path(TEST_ENTRY_ID)).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

// --- PUBLISHER HANDLER TESTS ---

#[test]
async fn test_create_publisher_derives_slug() {
    let state = create_test_state(MockRepoControl::default());

    let payload = CreatePublisherRequest {
        name: "Vestron Video".to_string(),
        slug: None,
        description: None,
        logo_image: None,
    };

    let result = handlers::create_publisher(test_user(), State(state), Json(payload)).await;

    assert!(result.is_ok());
    let (status, Json(publisher)) = result.unwrap();
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(publisher.slug, "vestron-video");
}

#[test]
async fn test_create_publisher_missing_name() {
    let state = create_test_state(MockRepoControl::default());

    let payload = CreatePublisherRequest {
        name: "   ".to_string(),
        slug: None,
        description: None,
        logo_image: None,
    };

    let result = handlers::create_publisher(test_user(), State(state), Json(payload)).await;

    assert!(result.is_err());
    assert_eq!(result.unwrap_err(), StatusCode::BAD_REQUEST);
}

#[test]
async fn test_create_publisher_duplicate() {
    let state = create_test_state(MockRepoControl {
        create_publisher_conflict: true,
        ..MockRepoControl::default()
    });

    let payload = CreatePublisherRequest {
        name: "Vestron Video".to_string(),
        slug: None,
        description: None,
        logo_image: None,
    };

    let result = handlers::create_publisher(test_user(), State(state), Json(payload)).await;

    assert!(result.is_err());
    assert_eq!(result.unwrap_err(), StatusCode::BAD_REQUEST);
}

#[test]
async fn test_delete_publisher_with_tapes_returns_count() {
    let state = create_test_state(MockRepoControl {
        publisher_tapes_count: 3,
        ..MockRepoControl::default()
    });

    let response =
        handlers::delete_publisher(test_user(), State(state), Path(Uuid::new_v4())).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = body_json(response).await;
    assert_eq!(body["tapesCount"], 3);
    assert!(body["message"].as_str().unwrap().contains("publisher"));
}

#[test]
async fn test_delete_publisher_success() {
    let state = create_test_state(MockRepoControl {
        publisher_tapes_count: 0,
        delete_publisher_result: true,
        ..MockRepoControl::default()
    });

    let response =
        handlers::delete_publisher(test_user(), State(state), Path(Uuid::new_v4())).await;

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[test]
async fn test_delete_publisher_not_found() {
    let state = create_test_state(MockRepoControl {
        publisher_to_return: None,
        ..MockRepoControl::default()
    });

    let response =
        handlers::delete_publisher(test_user(), State(state), Path(Uuid::new_v4())).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[test]
async fn test_create_publisher_unsluggable_name() {
    let state = create_test_state(MockRepoControl::default());

    // No ASCII alphanumerics: the derived slug would be empty.
    let payload = CreatePublisherRequest {
        name: "???!!!".to_string(),
        slug: None,
        description: None,
        logo_image: None,
    };

    let result = handlers::create_publisher(test_user(), State(state), Json(payload)).await;

    assert!(result.is_err());
    assert_eq!(result.unwrap_err(), StatusCode::BAD_REQUEST);
}

#[test]
async fn test_update_publisher_duplicate_name() {
    // Renaming onto a name/slug already held by another publisher.
    let state = create_test_state(MockRepoControl {
        update_publisher_result: PublisherUpdate::Conflict,
        ..MockRepoControl::default()
    });

    let payload = UpdatePublisherRequest {
        name: Some("Vestron Video".to_string()),
        ..UpdatePublisherRequest::default()
    };

    let result =
        handlers::update_publisher(test_user(), State(state), Path(Uuid::new_v4()), Json(payload))
            .await;

    assert!(result.is_err());
    assert_eq!(result.unwrap_err(), StatusCode::BAD_REQUEST);
}

#[test]
async fn test_update_publisher_not_found() {
    let state = create_test_state(MockRepoControl {
        update_publisher_result: PublisherUpdate::NotFound,
        ..MockRepoControl::default()
    });

    let payload = UpdatePublisherRequest {
        name: Some("New Name".to_string()),
        ..UpdatePublisherRequest::default()
    };

    let result =
        handlers::update_publisher(test_user(), State(state), Path(Uuid::new_v4()), Json(payload))
            .await;

    assert!(result.is_err());
    assert_eq!(result.unwrap_err(), StatusCode::NOT_FOUND);
}

// --- BOX SET HANDLER TESTS ---

#[test]
async fn test_get_box_set_details_includes_tapes() {
    let box_set = BoxSet {
        title: "Universal Monsters".to_string(),
        ..BoxSet::default()
    };
    let tapes = vec![
        Tape {
            title: "Dracula".to_string(),
            year: 1931,
            ..Tape::default()
        },
        Tape {
            title: "Frankenstein".to_string(),
            year: 1931,
            ..Tape::default()
        },
    ];
    let state = create_test_state(MockRepoControl {
        box_set_to_return: Some(box_set),
        tapes_to_return: tapes,
        ..MockRepoControl::default()
    });

    let result = handlers::get_box_set_details(State(state), Path(Uuid::new_v4())).await;

    assert!(result.is_ok());
    let Json(detail) = result.unwrap();
    assert_eq!(detail.title, "Universal Monsters");
    assert_eq!(detail.tapes.len(), 2);
}

#[test]
async fn test_get_box_set_details_not_found() {
    let state = create_test_state(MockRepoControl {
        box_set_to_return: None,
        ..MockRepoControl::default()
    });

    let result = handlers::get_box_set_details(State(state), Path(Uuid::new_v4())).await;

    assert!(result.is_err());
    assert_eq!(result.unwrap_err(), StatusCode::NOT_FOUND);
}
