//! CLI subcommand implementations.

pub mod migrate;
pub mod seed;
pub mod user;

use secrecy::SecretString;

/// Read the database URL from `BOOKAHOLIC_DATABASE_URL`, falling back to
/// `DATABASE_URL`.
///
/// # Errors
///
/// Returns the name of the primary variable if neither is set.
pub fn database_url() -> Result<SecretString, &'static str> {
    std::env::var("BOOKAHOLIC_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()
        .filter(|url| !url.is_empty())
        .map(SecretString::from)
        .ok_or("BOOKAHOLIC_DATABASE_URL")
}
