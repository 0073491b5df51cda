//! Session-stored authentication state.
//!
//! Only the user id is kept in the session. The full user is reloaded on
//! every authenticated request so role changes and deletions apply at once.

/// Session keys for authentication data.
pub mod session_keys {
    /// Key for the logged-in user's id.
    pub const USER_ID: &str = "user_id";
}
