//! Seed the database from JSON fixtures, or wipe it.
//!
//! # Usage
//!
//! ```bash
//! bookaholic-cli seed import ./_data
//! bookaholic-cli seed destroy
//! ```
//!
//! # Fixture Files
//!
//! The directory must contain `users.json`, `stores.json`, `books.json`, and
//! `reviews.json`. Each record carries a fixture-local `id` that other files
//! reference (`owner`, `store`, `book`); database ids are assigned on insert.
//!
//! ```json
//! [{ "id": 1, "name": "Corner Books", "address": "233 Bay State Rd Boston MA 02215", "owner": 2 }]
//! ```
//!
//! Stores are geocoded, passwords hashed, and every seeded book's average
//! rating recomputed from its seeded reviews.

use std::collections::HashMap;
use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::info;

use bookaholic_api::config::{ConfigError, GeocoderConfig};
use bookaholic_api::db::{Database, PgDatabase, RepositoryError, create_pool};
use bookaholic_api::models::{BookInput, NewStore, NewUser, ReviewInput, ValidationError};
use bookaholic_api::services::auth::{AuthError, hash_password, validate_password};
use bookaholic_api::services::geocoder::{GeocodeError, Geocoder, MapQuestGeocoder};
use bookaholic_api::services::rating::recompute_average_rating;
use bookaholic_core::{BookId, Email, Role, StoreId, UserId};

use super::database_url;

/// Errors that can occur while seeding.
#[derive(Debug, Error)]
pub enum SeedError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Geocoder configuration is invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Connect(#[from] sqlx::Error),

    /// A fixture file could not be read.
    #[error("Failed to read {file}: {source}")]
    Io {
        file: String,
        source: std::io::Error,
    },

    /// A fixture file is not valid JSON for its record type.
    #[error("Failed to parse {file}: {source}")]
    Json {
        file: String,
        source: serde_json::Error,
    },

    /// A record references a fixture id that does not exist.
    #[error("{kind} {id} referenced but not defined")]
    UnknownReference { kind: &'static str, id: u32 },

    /// A record failed validation.
    #[error("Invalid {kind} {id}: {source}")]
    Invalid {
        kind: &'static str,
        id: u32,
        source: ValidationError,
    },

    /// A user record has a bad email or password.
    #[error("Invalid user {id}: {source}")]
    User { id: u32, source: AuthError },

    /// A store address could not be geocoded.
    #[error(transparent)]
    Geocode(#[from] GeocodeError),

    /// Storage rejected a write.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),
}

#[derive(Debug, Deserialize)]
struct UserFixture {
    id: u32,
    name: String,
    email: String,
    password: String,
    #[serde(default)]
    role: Role,
}

#[derive(Debug, Deserialize)]
struct StoreFixture {
    id: u32,
    name: String,
    address: String,
    owner: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BookFixture {
    id: u32,
    name: String,
    description: String,
    price: Decimal,
    author_name: String,
    owner: u32,
    store: u32,
}

#[derive(Debug, Deserialize)]
struct ReviewFixture {
    #[serde(default)]
    id: u32,
    title: String,
    text: String,
    rating: i64,
    owner: u32,
    book: u32,
}

/// All fixtures of one seed directory.
#[derive(Debug)]
pub struct Fixtures {
    users: Vec<UserFixture>,
    stores: Vec<StoreFixture>,
    books: Vec<BookFixture>,
    reviews: Vec<ReviewFixture>,
}

/// Counts of inserted records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub users: usize,
    pub stores: usize,
    pub books: usize,
    pub reviews: usize,
}

impl Fixtures {
    /// Read the four fixture files from `dir`.
    ///
    /// # Errors
    ///
    /// Returns `SeedError::Io` or `SeedError::Json` for a missing or
    /// malformed file.
    pub async fn load(dir: &Path) -> Result<Self, SeedError> {
        Ok(Self {
            users: read_fixture(dir, "users.json").await?,
            stores: read_fixture(dir, "stores.json").await?,
            books: read_fixture(dir, "books.json").await?,
            reviews: read_fixture(dir, "reviews.json").await?,
        })
    }
}

async fn read_fixture<T: DeserializeOwned>(dir: &Path, file: &str) -> Result<Vec<T>, SeedError> {
    let path = dir.join(file);
    let content = tokio::fs::read_to_string(&path)
        .await
        .map_err(|source| SeedError::Io {
            file: path.display().to_string(),
            source,
        })?;
    serde_json::from_str(&content).map_err(|source| SeedError::Json {
        file: path.display().to_string(),
        source,
    })
}

fn resolve<T: Copy>(ids: &HashMap<u32, T>, kind: &'static str, id: u32) -> Result<T, SeedError> {
    ids.get(&id)
        .copied()
        .ok_or(SeedError::UnknownReference { kind, id })
}

/// Insert `fixtures` into `db`, geocoding store addresses with `geocoder`.
///
/// Records are inserted parents first. Inserts are not rolled back on
/// failure; run `seed destroy` before retrying.
///
/// # Errors
///
/// Returns `SeedError` for invalid records, dangling references, geocoding
/// failures, or storage errors.
pub async fn import_into(
    db: &dyn Database,
    geocoder: &dyn Geocoder,
    fixtures: Fixtures,
) -> Result<SeedSummary, SeedError> {
    let mut users: HashMap<u32, UserId> = HashMap::new();
    for fixture in fixtures.users {
        let id = fixture.id;
        let email = Email::parse(&fixture.email).map_err(|e| SeedError::User {
            id,
            source: AuthError::from(e),
        })?;
        validate_password(&fixture.password).map_err(|source| SeedError::User { id, source })?;
        let password_hash =
            hash_password(&fixture.password).map_err(|source| SeedError::User { id, source })?;

        let user = db
            .create_user(NewUser {
                name: fixture.name,
                email,
                role: fixture.role,
                password_hash,
            })
            .await?;
        users.insert(id, user.id);
    }

    let mut stores: HashMap<u32, StoreId> = HashMap::new();
    for fixture in fixtures.stores {
        let owner = resolve(&users, "user", fixture.owner)?;
        let location = geocoder.geocode(&fixture.address).await?;
        let store = db
            .create_store(NewStore {
                name: fixture.name,
                address: fixture.address,
                location,
                owner,
            })
            .await?;
        stores.insert(fixture.id, store.id);
    }

    let mut books: HashMap<u32, BookId> = HashMap::new();
    for fixture in fixtures.books {
        let id = fixture.id;
        let owner = resolve(&users, "user", fixture.owner)?;
        let store = resolve(&stores, "store", fixture.store)?;
        let new_book = BookInput {
            name: Some(fixture.name),
            description: Some(fixture.description),
            price: Some(fixture.price),
            author_name: Some(fixture.author_name),
        }
        .into_new_book(owner, store)
        .map_err(|source| SeedError::Invalid {
            kind: "book",
            id,
            source,
        })?;
        let book = db.create_book(new_book).await?;
        books.insert(id, book.id);
    }

    let review_count = fixtures.reviews.len();
    for fixture in fixtures.reviews {
        let owner = resolve(&users, "user", fixture.owner)?;
        let book = resolve(&books, "book", fixture.book)?;
        let new_review = ReviewInput {
            title: Some(fixture.title),
            text: Some(fixture.text),
            rating: Some(fixture.rating),
        }
        .into_new_review(owner, book)
        .map_err(|source| SeedError::Invalid {
            kind: "review",
            id: fixture.id,
            source,
        })?;
        db.create_review(new_review).await?;
    }

    for &book in books.values() {
        recompute_average_rating(db, book).await;
    }

    Ok(SeedSummary {
        users: users.len(),
        stores: stores.len(),
        books: books.len(),
        reviews: review_count,
    })
}

/// Load fixtures from `dir` and insert them into the configured database.
///
/// # Errors
///
/// Returns `SeedError` if configuration is missing or any step of the
/// import fails.
pub async fn import(dir: &str) -> Result<(), SeedError> {
    dotenvy::dotenv().ok();

    let url = database_url().map_err(SeedError::MissingEnvVar)?;
    let geocoder = MapQuestGeocoder::new(&GeocoderConfig::from_env()?)?;

    let fixtures = Fixtures::load(Path::new(dir)).await?;
    info!(path = %dir, "Loaded fixtures");

    let db = PgDatabase::new(create_pool(&url).await?);
    let summary = import_into(&db, &geocoder, fixtures).await?;

    info!(
        users = summary.users,
        stores = summary.stores,
        books = summary.books,
        reviews = summary.reviews,
        "Data inserted"
    );
    Ok(())
}

/// Delete every user, store, book, and review.
///
/// # Errors
///
/// Returns `SeedError` if the database URL is missing or the delete fails.
pub async fn destroy() -> Result<(), SeedError> {
    dotenvy::dotenv().ok();

    let url = database_url().map_err(SeedError::MissingEnvVar)?;
    let db = PgDatabase::new(create_pool(&url).await?);
    db.clear().await?;

    info!("Data destroyed");
    Ok(())
}
