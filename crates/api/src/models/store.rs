//! Store domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bookaholic_core::{Location, StoreId, UserId};

use super::{Book, ValidationError, optional_text, required_text};

/// Maximum store name length in characters.
pub const STORE_NAME_MAX: usize = 100;

/// A bookstore with its geocoded location.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Store {
    pub id: StoreId,
    pub name: String,
    pub address: String,
    /// Derived from `address` by the geocoder; never edited directly.
    pub location: Location,
    pub owner: UserId,
    pub created_at: DateTime<Utc>,
}

/// A store together with the books listed in it.
#[derive(Debug, Clone, Serialize)]
pub struct StoreWithBooks {
    #[serde(flatten)]
    pub store: Store,
    pub books: Vec<Book>,
}

/// A store to be inserted.
#[derive(Debug, Clone)]
pub struct NewStore {
    pub name: String,
    pub address: String,
    pub location: Location,
    pub owner: UserId,
}

/// Field changes for a store.
///
/// The address and its location always change together.
#[derive(Debug, Clone, Default)]
pub struct StoreChanges {
    pub name: Option<String>,
    pub address: Option<(String, Location)>,
}

/// Request body for creating a store.
#[derive(Debug, Default, Deserialize)]
pub struct StoreInput {
    pub name: Option<String>,
    pub address: Option<String>,
}

impl StoreInput {
    /// Validate and return the trimmed `(name, address)`.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for missing or overlong fields.
    pub fn validate(self) -> Result<(String, String), ValidationError> {
        let name = required_text("name", self.name, Some(STORE_NAME_MAX))?;
        let address = required_text("address", self.address, None)?;
        Ok((name, address))
    }
}

/// Request body for updating a store. Owner and location are not accepted.
#[derive(Debug, Default, Deserialize)]
pub struct StorePatch {
    pub name: Option<String>,
    pub address: Option<String>,
}

impl StorePatch {
    /// Validate and return the trimmed `(name, address)` changes.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for blank or overlong fields.
    pub fn validate(self) -> Result<(Option<String>, Option<String>), ValidationError> {
        let name = optional_text("name", self.name, Some(STORE_NAME_MAX))?;
        let address = optional_text("address", self.address, None)?;
        Ok((name, address))
    }
}
