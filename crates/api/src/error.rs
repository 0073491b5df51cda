//! Unified error handling for the API.
//!
//! Every failure leaves a handler as an [`AppError`], rendered as
//! `{"success": false, "message": ...}` with the matching status code.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::models::ValidationError;
use crate::services::auth::AuthError;
use crate::services::email::EmailError;
use crate::services::geocoder::GeocodeError;
use crate::services::guard::AccessDenied;
use crate::services::uploads::UploadError;

/// Message shown to clients for server-side failures.
const INTERNAL_MESSAGE: &str = "Internal server error";

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication or account operation failed.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The guard refused a mutation.
    #[error(transparent)]
    Denied(#[from] AccessDenied),

    /// Request input failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Geocoding failed.
    #[error("Geocoding error: {0}")]
    Geocode(#[from] GeocodeError),

    /// Email delivery failed.
    #[error("Email error: {0}")]
    Email(#[from] EmailError),

    /// File upload failed.
    #[error(transparent)]
    Upload(#[from] UploadError),

    /// Request body was not valid JSON for the endpoint.
    #[error("Invalid request body: {0}")]
    Json(#[from] JsonRejection),

    /// A path parameter could not be parsed.
    #[error("Invalid path: {0}")]
    Path(#[from] PathRejection),

    /// The query string could not be parsed.
    #[error("Invalid query: {0}")]
    Query(#[from] QueryRejection),

    /// Resource not found.
    #[error("{0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("{0}")]
    Unauthorized(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Database(RepositoryError::NotFound) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Database(RepositoryError::Conflict(_))
            | Self::Validation(_)
            | Self::Json(_)
            | Self::Path(_)
            | Self::Query(_)
            | Self::Geocode(GeocodeError::NoMatch(_)) => StatusCode::BAD_REQUEST,
            Self::Upload(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            Self::Denied(AccessDenied::RoleNotPermitted { .. }) => StatusCode::FORBIDDEN,
            Self::Denied(AccessDenied::NotOwner { .. }) | Self::Unauthorized(_) => {
                StatusCode::UNAUTHORIZED
            }
            Self::Auth(e) => auth_status(e),
            Self::Database(_)
            | Self::Geocode(_)
            | Self::Email(_)
            | Self::Upload(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to clients.
    #[must_use]
    pub fn client_message(&self) -> String {
        match self {
            Self::Database(RepositoryError::NotFound) => "Resource not found".to_owned(),
            Self::Database(RepositoryError::Conflict(message)) => message.clone(),
            Self::Auth(AuthError::Email(_)) | Self::Email(_) => "Email could not be sent".to_owned(),
            Self::Upload(UploadError::Io(_)) => "Problem with file upload".to_owned(),
            Self::Geocode(GeocodeError::NoMatch(_)) => self.to_string(),
            Self::Json(rejection) => rejection.body_text(),
            Self::Path(rejection) => rejection.body_text(),
            Self::Query(rejection) => rejection.body_text(),
            _ if self.status().is_server_error() => INTERNAL_MESSAGE.to_owned(),
            _ => self.to_string(),
        }
    }
}

const fn auth_status(error: &AuthError) -> StatusCode {
    match error {
        AuthError::InvalidEmail(_)
        | AuthError::MissingCredentials
        | AuthError::EmailAlreadyRegistered
        | AuthError::AdminRegistration
        | AuthError::WeakPassword(_)
        | AuthError::UnknownEmail
        | AuthError::Validation(_) => StatusCode::BAD_REQUEST,
        AuthError::InvalidCredentials
        | AuthError::IncorrectPassword
        | AuthError::InvalidResetToken => StatusCode::UNAUTHORIZED,
        AuthError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        AuthError::Email(_) | AuthError::Repository(_) | AuthError::PasswordHash => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Log server errors with Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "API request error"
            );
        }

        let body = Json(json!({
            "success": false,
            "message": self.client_message(),
        }));
        (status, body).into_response()
    }
}

/// Set the Sentry user context for the authenticated user.
pub fn set_sentry_user(user_id: i32, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

#[cfg(test)]
mod tests {
    use bookaholic_core::{Role, UserId};

    use super::*;
    use crate::services::guard::{Action, Resource};

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("Book not found with id of 9".to_string());
        assert_eq!(err.to_string(), "Book not found with id of 9");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Database(RepositoryError::NotFound)),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Database(RepositoryError::Conflict("dup".to_string()))),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Validation(ValidationError::Required("name"))),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            get_status(AppError::Email(EmailError::NotConfigured)),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_denials_split_401_and_403() {
        assert_eq!(
            get_status(AppError::Denied(AccessDenied::RoleNotPermitted {
                role: Role::User
            })),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AppError::Denied(AccessDenied::NotOwner {
                user: UserId::new(2),
                action: Action::Update,
                resource: Resource::Book,
            })),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn test_auth_statuses() {
        assert_eq!(
            get_status(AppError::Auth(AuthError::MissingCredentials)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Auth(AuthError::InvalidCredentials)),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Auth(AuthError::InvalidResetToken)),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Auth(AuthError::Email(EmailError::NotConfigured))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_server_errors_hide_details() {
        let err = AppError::Internal("connection refused at 10.0.0.3".to_string());
        assert_eq!(err.client_message(), "Internal server error");

        let err = AppError::Auth(AuthError::Email(EmailError::NotConfigured));
        assert_eq!(err.client_message(), "Email could not be sent");
    }

    #[test]
    fn test_upload_errors() {
        assert_eq!(
            get_status(AppError::Upload(UploadError::NotAnImage)),
            StatusCode::BAD_REQUEST
        );
        let io = std::io::Error::other("disk full");
        assert_eq!(
            get_status(AppError::Upload(UploadError::Io(io))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
