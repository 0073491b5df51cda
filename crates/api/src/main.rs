//! Bookaholic API server.
//!
//! Serves the REST API on port 5000 by default.
//!
//! # Backends
//!
//! - `PostgreSQL` storage and sessions when `BOOKAHOLIC_DATABASE_URL` is set,
//!   in-memory otherwise
//! - `MapQuest` geocoding
//! - SMTP email when configured, otherwise password reset emails fail
//! - Book covers on the local filesystem, served under `/uploads`

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use sentry::integrations::tracing as sentry_tracing;
use tower_sessions::MemoryStore;
use tower_sessions_sqlx_store::PostgresStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bookaholic_api::config::ApiConfig;
use bookaholic_api::db::{Database, MemoryDatabase, PgDatabase, create_pool};
use bookaholic_api::services::email::{DisabledMailer, Mailer, SmtpMailer};
use bookaholic_api::services::geocoder::MapQuestGeocoder;
use bookaholic_api::services::uploads::LocalFileStore;
use bookaholic_api::state::AppState;

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &ApiConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            sample_rate: config.sentry_sample_rate,
            traces_sample_rate: config.sentry_traces_sample_rate,
            attach_stacktrace: true,
            send_default_pii: false,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    // Load configuration from environment (needed for Sentry init)
    let config = ApiConfig::from_env().expect("Failed to load configuration");

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    // Defaults to info level for our crate if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "bookaholic_api=info,tower_http=debug".into());

    // Use JSON format on Fly.io for structured log parsing, text format locally
    let is_fly = std::env::var("FLY_APP_NAME").is_ok();
    let json_layer = is_fly.then(|| tracing_subscriber::fmt::layer().json().flatten_event(true));
    let text_layer = (!is_fly).then(tracing_subscriber::fmt::layer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let geocoder =
        Arc::new(MapQuestGeocoder::new(&config.geocoder).expect("Failed to create geocoder"));

    let mailer: Arc<dyn Mailer> = match &config.email {
        Some(email) => Arc::new(SmtpMailer::new(email).expect("Failed to configure SMTP")),
        None => {
            tracing::warn!("SMTP not configured, password reset emails are disabled");
            Arc::new(DisabledMailer)
        }
    };

    let files = Arc::new(LocalFileStore::new(config.uploads.path.clone()));

    // NOTE: Migrations are NOT run automatically on startup.
    // Run them explicitly via: cargo run -p bookaholic-cli -- migrate
    let app = if let Some(database_url) = &config.database_url {
        let pool = create_pool(database_url)
            .await
            .expect("Failed to create database pool");
        tracing::info!("Database pool created");

        let db: Arc<dyn Database> = Arc::new(PgDatabase::new(pool.clone()));
        let session_store = PostgresStore::new(pool);
        let state = AppState::new(config.clone(), db, geocoder, mailer, files);
        bookaholic_api::app(state, session_store)
    } else {
        tracing::warn!("No database configured, using in-memory storage");
        let db: Arc<dyn Database> = Arc::new(MemoryDatabase::new());
        let state = AppState::new(config.clone(), db, geocoder, mailer, files);
        bookaholic_api::app(state, MemoryStore::default())
    };

    // Sentry layers (outermost for full request coverage)
    let app = app
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction());

    let addr = config.socket_addr();
    tracing::info!("api listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
