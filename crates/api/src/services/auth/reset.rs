//! Password reset tokens.
//!
//! A raw token is 20 random bytes, hex encoded, and only ever leaves the
//! server inside the reset email. Storage keeps its SHA-256 digest and an
//! expiry; consuming a token clears both, so each token works at most once.

use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};

use crate::models::ResetToken;

/// Minutes a reset token stays valid after issuance.
pub const RESET_TOKEN_TTL_MINUTES: i64 = 10;

const TOKEN_BYTES: usize = 20;

/// A freshly issued token: the raw value to email and the record to persist.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub raw: String,
    pub stored: ResetToken,
}

/// Generate a new reset token valid until `now` plus the TTL.
#[must_use]
pub fn issue_reset_token(now: DateTime<Utc>) -> IssuedToken {
    let bytes: [u8; TOKEN_BYTES] = rand::random();
    let raw = hex::encode(bytes);
    let stored = ResetToken {
        hash: hash_reset_token(&raw),
        expires_at: now + Duration::minutes(RESET_TOKEN_TTL_MINUTES),
    };
    IssuedToken { raw, stored }
}

/// SHA-256 hex digest of a raw token, as persisted.
#[must_use]
pub fn hash_reset_token(raw: &str) -> String {
    hex::encode(Sha256::digest(raw.as_bytes()))
}

/// Link the user follows to reset their password.
#[must_use]
pub fn reset_url(base_url: &str, raw: &str) -> String {
    format!(
        "{}/api/v1/auth/resetpassword/{raw}",
        base_url.trim_end_matches('/')
    )
}
