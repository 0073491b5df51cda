//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::ApiConfig;
use crate::db::Database;
use crate::services::email::Mailer;
use crate::services::geocoder::Geocoder;
use crate::services::uploads::FileStore;
use crate::services::{AuthService, BookService, ReviewService, StoreService, UserAdminService};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`. Collaborators are trait
/// objects so the server and the tests can plug in different backends.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    db: Arc<dyn Database>,
    geocoder: Arc<dyn Geocoder>,
    mailer: Arc<dyn Mailer>,
    files: Arc<dyn FileStore>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(
        config: ApiConfig,
        db: Arc<dyn Database>,
        geocoder: Arc<dyn Geocoder>,
        mailer: Arc<dyn Mailer>,
        files: Arc<dyn FileStore>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                db,
                geocoder,
                mailer,
                files,
            }),
        }
    }

    /// Get a reference to the API configuration.
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// Get a reference to the storage backend.
    #[must_use]
    pub fn db(&self) -> &dyn Database {
        self.inner.db.as_ref()
    }

    #[must_use]
    pub fn geocoder(&self) -> &dyn Geocoder {
        self.inner.geocoder.as_ref()
    }

    #[must_use]
    pub fn mailer(&self) -> &dyn Mailer {
        self.inner.mailer.as_ref()
    }

    #[must_use]
    pub fn files(&self) -> &dyn FileStore {
        self.inner.files.as_ref()
    }

    // =========================================================================
    // Services
    // =========================================================================

    #[must_use]
    pub fn auth(&self) -> AuthService<'_> {
        AuthService::new(self.db(), self.mailer(), &self.config().base_url)
    }

    #[must_use]
    pub fn stores(&self) -> StoreService<'_> {
        StoreService::new(self.db(), self.geocoder())
    }

    #[must_use]
    pub fn books(&self) -> BookService<'_> {
        BookService::new(self.db(), self.files(), self.config().uploads.max_bytes)
    }

    #[must_use]
    pub fn reviews(&self) -> ReviewService<'_> {
        ReviewService::new(self.db())
    }

    #[must_use]
    pub fn users(&self) -> UserAdminService<'_> {
        UserAdminService::new(self.db())
    }
}
