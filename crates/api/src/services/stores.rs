//! Store management and radius search.

use bookaholic_core::{StoreId, radius_from_miles};

use crate::db::{Database, PageRequest, Paged};
use crate::error::AppError;
use crate::models::{
    NewStore, Store, StoreChanges, StoreInput, StorePatch, StoreWithBooks, User, ValidationError,
};
use crate::services::geocoder::Geocoder;
use crate::services::guard::{Action, Resource, authorize_create, authorize_mutation};

pub(crate) fn store_not_found(id: StoreId) -> AppError {
    AppError::NotFound(format!("Store not found with id of {id}"))
}

/// Parse a radius in miles from a path segment.
///
/// # Errors
///
/// Returns `ValidationError::Invalid` unless the value is a finite,
/// non-negative number.
pub fn parse_distance(raw: &str) -> Result<f64, ValidationError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| invalid_distance())
        .and_then(check_distance)
}

fn check_distance(miles: f64) -> Result<f64, ValidationError> {
    if miles.is_finite() && miles >= 0.0 {
        Ok(miles)
    } else {
        Err(invalid_distance())
    }
}

fn invalid_distance() -> ValidationError {
    ValidationError::Invalid {
        field: "distance",
        reason: "must be a non-negative number of miles".to_owned(),
    }
}

/// Stores service.
pub struct StoreService<'a> {
    db: &'a dyn Database,
    geocoder: &'a dyn Geocoder,
}

impl<'a> StoreService<'a> {
    #[must_use]
    pub const fn new(db: &'a dyn Database, geocoder: &'a dyn Geocoder) -> Self {
        Self { db, geocoder }
    }

    /// One page of stores, newest first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if storage fails.
    pub async fn list(&self, page: PageRequest) -> Result<Paged<Store>, AppError> {
        Ok(self.db.list_stores(page).await?)
    }

    /// A store with the books listed in it.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the store does not exist.
    pub async fn get(&self, id: StoreId) -> Result<StoreWithBooks, AppError> {
        let store = self
            .db
            .get_store(id)
            .await?
            .ok_or_else(|| store_not_found(id))?;
        let books = self.db.books_for_store(id).await?;
        Ok(StoreWithBooks { store, books })
    }

    /// Create a store owned by `user`, geocoding its address.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Denied` if the user's role may not create stores,
    /// `AppError::Validation` for bad input, and `AppError::Geocode` if the
    /// address cannot be located.
    pub async fn create(&self, user: &User, input: StoreInput) -> Result<Store, AppError> {
        authorize_create(user, Resource::Store)?;
        let (name, address) = input.validate()?;
        let location = self.geocoder.geocode(&address).await?;

        let store = self
            .db
            .create_store(NewStore {
                name,
                address,
                location,
                owner: user.id,
            })
            .await?;

        tracing::info!(store = %store.id, owner = %user.id, "store created");
        Ok(store)
    }

    /// Update a store's name and/or address. A new address is re-geocoded.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the store does not exist and
    /// `AppError::Denied` if the user may not modify it.
    pub async fn update(&self, user: &User, id: StoreId, patch: StorePatch) -> Result<Store, AppError> {
        let existing = self
            .db
            .get_store(id)
            .await?
            .ok_or_else(|| store_not_found(id))?;
        authorize_mutation(user, existing.owner, Resource::Store, Action::Update)?;

        let (name, address) = patch.validate()?;
        let address = match address {
            Some(address) if address != existing.address => {
                let location = self.geocoder.geocode(&address).await?;
                Some((address, location))
            }
            _ => None,
        };

        let changes = StoreChanges { name, address };
        if changes.name.is_none() && changes.address.is_none() {
            return Ok(existing);
        }
        Ok(self.db.update_store(id, changes).await?)
    }

    /// Delete a store together with its books and their reviews.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the store does not exist and
    /// `AppError::Denied` if the user may not delete it.
    pub async fn delete(&self, user: &User, id: StoreId) -> Result<(), AppError> {
        let existing = self
            .db
            .get_store(id)
            .await?
            .ok_or_else(|| store_not_found(id))?;
        authorize_mutation(user, existing.owner, Resource::Store, Action::Delete)?;

        self.db.delete_store(id).await?;
        tracing::info!(store = %id, user = %user.id, "store deleted");
        Ok(())
    }

    /// Stores within `miles` of the location `zipcode` geocodes to.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` for a negative or non-finite distance
    /// and `AppError::Geocode` if the postal code cannot be located.
    pub async fn within_radius(&self, zipcode: &str, miles: f64) -> Result<Vec<Store>, AppError> {
        let miles = check_distance(miles)?;
        let center = self.geocoder.geocode(zipcode).await?;
        let radius = radius_from_miles(miles);
        tracing::debug!(zipcode = %zipcode, miles, radius, "radius search");
        Ok(self.db.stores_within_radius(center.point, radius).await?)
    }
}
