//! HTTP integration tests for Bookaholic.
//!
//! Each test spawns the full API router on an ephemeral local port, backed by
//! in-memory storage and sessions and the in-process fakes from
//! `bookaholic_api::services::testing`. Clients are `reqwest` clients with a
//! cookie store, so the session cookie flows exactly as in a browser.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p bookaholic-integration-tests
//! ```
//!
//! No database, SMTP server, or geocoding key is needed.

#![allow(clippy::missing_panics_doc)]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use reqwest::{Client, Response, StatusCode};
use secrecy::SecretString;
use serde_json::{Value, json};
use tower_sessions::MemoryStore;

use bookaholic_api::config::{ApiConfig, GeocoderConfig, UploadConfig};
use bookaholic_api::db::MemoryDatabase;
use bookaholic_api::models::UserInput;
use bookaholic_api::services::UserAdminService;
use bookaholic_api::services::testing::{FakeGeocoder, MemoryFileStore, RecordingMailer};
use bookaholic_api::state::AppState;
use bookaholic_core::{GeoPoint, Role};

/// Password used for every account the harness creates.
pub const PASSWORD: &str = "123456";

/// Largest cover upload the test server accepts.
pub const MAX_UPLOAD_BYTES: usize = 64 * 1024;

/// Store address in Boston.
pub const BOSTON_ADDRESS: &str = "233 Bay State Rd Boston MA 02215";
/// Store address in Cambridge, about two miles from Boston.
pub const CAMBRIDGE_ADDRESS: &str = "1 Brattle Sq Cambridge MA 02138";
/// Store address in Los Angeles.
pub const LA_ADDRESS: &str = "200 N Spring St Los Angeles CA 90012";
/// Boston postal code near both Massachusetts stores.
pub const BOSTON_ZIP: &str = "02118";

/// A running API server and handles on its fakes.
pub struct TestApp {
    pub addr: SocketAddr,
    pub db: Arc<MemoryDatabase>,
    pub geocoder: Arc<FakeGeocoder>,
    pub mailer: Arc<RecordingMailer>,
    pub files: Arc<MemoryFileStore>,
}

impl TestApp {
    /// Start a fresh server.
    pub async fn spawn() -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Failed to read local address");

        let config = ApiConfig {
            database_url: None,
            host: addr.ip(),
            port: addr.port(),
            base_url: format!("http://{addr}"),
            geocoder: GeocoderConfig {
                api_key: SecretString::from("unused"),
                base_url: "http://127.0.0.1:9/geocoding".to_owned(),
            },
            email: None,
            uploads: UploadConfig {
                path: PathBuf::from("./target/test-uploads"),
                max_bytes: MAX_UPLOAD_BYTES,
            },
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 0.0,
            sentry_traces_sample_rate: 0.0,
        };

        let db = Arc::new(MemoryDatabase::new());
        let geocoder = Arc::new(
            FakeGeocoder::new()
                .with(BOSTON_ADDRESS, GeoPoint::new(-71.1004, 42.3505))
                .with(CAMBRIDGE_ADDRESS, GeoPoint::new(-71.1218, 42.3736))
                .with(LA_ADDRESS, GeoPoint::new(-118.2430, 34.0537))
                .with(BOSTON_ZIP, GeoPoint::new(-71.0700, 42.3390)),
        );
        let mailer = Arc::new(RecordingMailer::default());
        let files = Arc::new(MemoryFileStore::default());

        let state = AppState::new(
            config,
            db.clone(),
            geocoder.clone(),
            mailer.clone(),
            files.clone(),
        );
        let app = bookaholic_api::app(state, MemoryStore::default());

        tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .expect("Test server failed");
        });

        Self {
            addr,
            db,
            geocoder,
            mailer,
            files,
        }
    }

    /// Absolute URL for an `/api/v1` path.
    #[must_use]
    pub fn api(&self, path: &str) -> String {
        format!("http://{}/api/v1{path}", self.addr)
    }

    /// Absolute URL for a path outside the API prefix.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// A client with its own cookie jar and no session.
    #[must_use]
    pub fn client() -> Client {
        Client::builder()
            .cookie_store(true)
            .build()
            .expect("Failed to create HTTP client")
    }

    /// Register an account with `role` and return a client logged in as it.
    pub async fn register(&self, name: &str, role: Role) -> (Client, Value) {
        let client = Self::client();
        let response = client
            .post(self.api("/auth/register"))
            .json(&json!({
                "name": name,
                "email": email_for(name),
                "password": PASSWORD,
                "role": role,
            }))
            .send()
            .await
            .expect("register request failed");
        let (status, body) = read(response).await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        (client, body["data"].clone())
    }

    /// Create an admin directly in storage and return a client logged in as it.
    pub async fn admin(&self) -> (Client, Value) {
        UserAdminService::new(self.db.as_ref())
            .create(UserInput {
                name: Some("Admin".to_owned()),
                email: Some(email_for("Admin")),
                password: Some(PASSWORD.to_owned()),
                role: Some(Role::Admin),
            })
            .await
            .expect("Failed to create admin");

        let client = Self::client();
        let body = self.login(&client, &email_for("Admin"), PASSWORD).await;
        (client, body["data"].clone())
    }

    /// Log `client` in, asserting success.
    pub async fn login(&self, client: &Client, email: &str, password: &str) -> Value {
        let response = client
            .post(self.api("/auth/login"))
            .json(&json!({"email": email, "password": password}))
            .send()
            .await
            .expect("login request failed");
        let (status, body) = read(response).await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        body
    }

    /// Create a store at `address` as `client`, returning its data.
    pub async fn create_store(&self, client: &Client, name: &str, address: &str) -> Value {
        let (status, body) = send(
            client
                .post(self.api("/stores"))
                .json(&json!({"name": name, "address": address})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "store create failed: {body}");
        body["data"].clone()
    }

    /// Create a book in `store` as `client`, returning its data.
    pub async fn create_book(&self, client: &Client, store: &Value, name: &str) -> Value {
        let (status, body) = send(client.post(self.api(&format!("/books/{}", store["id"]))).json(
            &json!({
                "name": name,
                "description": "A novel",
                "price": "12.50",
                "authorName": "Frank Herbert",
            }),
        ))
        .await;
        assert_eq!(status, StatusCode::CREATED, "book create failed: {body}");
        body["data"].clone()
    }

    /// Review `book` as `client`, returning the review data.
    pub async fn create_review(&self, client: &Client, book: &Value, rating: i64) -> Value {
        let (status, body) = send(
            client
                .post(self.api(&format!("/books/{}/reviews", book["id"])))
                .json(&json!({"title": "Review", "text": "Worth reading", "rating": rating})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "review create failed: {body}");
        body["data"].clone()
    }

    /// Fetch a book's current data.
    pub async fn book(&self, book: &Value) -> Value {
        let (status, body) =
            send(Self::client().get(self.api(&format!("/books/{}", book["id"])))).await;
        assert_eq!(status, StatusCode::OK, "book fetch failed: {body}");
        body["data"].clone()
    }
}

/// Deterministic email address for a display name.
#[must_use]
pub fn email_for(name: &str) -> String {
    format!("{}@example.com", name.to_lowercase().replace(' ', "."))
}

/// Send a request and decode its JSON body.
pub async fn send(request: reqwest::RequestBuilder) -> (StatusCode, Value) {
    read(request.send().await.expect("request failed")).await
}

/// Decode a response's status and JSON body.
pub async fn read(response: Response) -> (StatusCode, Value) {
    let status = response.status();
    let body = response.json().await.expect("response body is not JSON");
    (status, body)
}
