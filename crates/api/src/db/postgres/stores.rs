//! Store queries, including the great-circle radius search.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use bookaholic_core::{GeoPoint, Location, StoreId, UserId};

use super::{PgDatabase, limit_offset};
use crate::db::{PageRequest, Paged, RepositoryError, StoreRepository};
use crate::models::{NewStore, Store, StoreChanges};

const STORE_COLUMNS: &str = "id, name, address, longitude, latitude, formatted_address, \
                             street, city, state, zipcode, country, owner_id, created_at";

#[derive(Debug, sqlx::FromRow)]
struct StoreRow {
    id: i32,
    name: String,
    address: String,
    longitude: f64,
    latitude: f64,
    formatted_address: String,
    street: Option<String>,
    city: Option<String>,
    state: Option<String>,
    zipcode: Option<String>,
    country: Option<String>,
    owner_id: i32,
    created_at: DateTime<Utc>,
}

impl From<StoreRow> for Store {
    fn from(row: StoreRow) -> Self {
        Self {
            id: StoreId::new(row.id),
            name: row.name,
            address: row.address,
            location: Location {
                point: GeoPoint::new(row.longitude, row.latitude),
                formatted_address: row.formatted_address,
                street: row.street,
                city: row.city,
                state: row.state,
                zipcode: row.zipcode,
                country: row.country,
            },
            owner: UserId::new(row.owner_id),
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl StoreRepository for PgDatabase {
    async fn create_store(&self, store: NewStore) -> Result<Store, RepositoryError> {
        let location = &store.location;
        let row = sqlx::query_as::<_, StoreRow>(&format!(
            "INSERT INTO stores (name, address, longitude, latitude, formatted_address,
                                 street, city, state, zipcode, country, owner_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             RETURNING {STORE_COLUMNS}"
        ))
        .bind(&store.name)
        .bind(&store.address)
        .bind(location.point.longitude)
        .bind(location.point.latitude)
        .bind(&location.formatted_address)
        .bind(&location.street)
        .bind(&location.city)
        .bind(&location.state)
        .bind(&location.zipcode)
        .bind(&location.country)
        .bind(store.owner)
        .fetch_one(self.pool())
        .await?;

        Ok(row.into())
    }

    async fn get_store(&self, id: StoreId) -> Result<Option<Store>, RepositoryError> {
        let row = sqlx::query_as::<_, StoreRow>(&format!(
            "SELECT {STORE_COLUMNS} FROM stores WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        Ok(row.map(Into::into))
    }

    async fn list_stores(&self, page: PageRequest) -> Result<Paged<Store>, RepositoryError> {
        let total = self.count("stores").await?;
        let (limit, offset) = limit_offset(page);
        let rows = sqlx::query_as::<_, StoreRow>(&format!(
            "SELECT {STORE_COLUMNS} FROM stores
             ORDER BY created_at DESC, id DESC
             LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool())
        .await?;

        Ok(Paged {
            items: rows.into_iter().map(Into::into).collect(),
            total,
            page,
        })
    }

    async fn update_store(
        &self,
        id: StoreId,
        changes: StoreChanges,
    ) -> Result<Store, RepositoryError> {
        let mut tx = self.pool().begin().await?;

        let current = sqlx::query_as::<_, StoreRow>(&format!(
            "SELECT {STORE_COLUMNS} FROM stores WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        let mut store = Store::from(current);
        if let Some(name) = changes.name {
            store.name = name;
        }
        if let Some((address, location)) = changes.address {
            store.address = address;
            store.location = location;
        }

        let location = &store.location;
        let row = sqlx::query_as::<_, StoreRow>(&format!(
            "UPDATE stores
             SET name = $2, address = $3, longitude = $4, latitude = $5,
                 formatted_address = $6, street = $7, city = $8, state = $9,
                 zipcode = $10, country = $11
             WHERE id = $1
             RETURNING {STORE_COLUMNS}"
        ))
        .bind(id)
        .bind(&store.name)
        .bind(&store.address)
        .bind(location.point.longitude)
        .bind(location.point.latitude)
        .bind(&location.formatted_address)
        .bind(&location.street)
        .bind(&location.city)
        .bind(&location.state)
        .bind(&location.zipcode)
        .bind(&location.country)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(row.into())
    }

    async fn delete_store(&self, id: StoreId) -> Result<(), RepositoryError> {
        // Books and their reviews go with it via ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM stores WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn stores_within_radius(
        &self,
        center: GeoPoint,
        radius: f64,
    ) -> Result<Vec<Store>, RepositoryError> {
        // Haversine central angle, compared in radians.
        let rows = sqlx::query_as::<_, StoreRow>(&format!(
            "SELECT {STORE_COLUMNS} FROM stores
             WHERE 2 * ASIN(LEAST(1.0, SQRT(
                     POWER(SIN(RADIANS(latitude - $2) / 2), 2)
                     + COS(RADIANS($2)) * COS(RADIANS(latitude))
                       * POWER(SIN(RADIANS(longitude - $1) / 2), 2)
                   ))) <= $3
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(center.longitude)
        .bind(center.latitude)
        .bind(radius)
        .fetch_all(self.pool())
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}
