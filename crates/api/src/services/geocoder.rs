//! Address geocoding.
//!
//! Stores are located by geocoding their free-text address; radius searches
//! geocode a postal code to find the search center.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;

use bookaholic_core::{GeoPoint, Location};

use crate::config::GeocoderConfig;

/// Errors that can occur while geocoding.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// The provider returned no match for the query.
    #[error("No location found for '{0}'")]
    NoMatch(String),

    /// HTTP request failed.
    #[error("Geocoding request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider URL could not be built.
    #[error("Invalid geocoder URL: {0}")]
    Url(#[from] url::ParseError),

    /// The provider answered with an error status or unexpected body.
    #[error("Geocoding response error: {0}")]
    Response(String),
}

/// Resolves free text (an address or postal code) to one best-match location.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Geocode `query`, returning the best match.
    async fn geocode(&self, query: &str) -> Result<Location, GeocodeError>;
}

/// Geocoder backed by the `MapQuest` geocoding API.
pub struct MapQuestGeocoder {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
}

impl MapQuestGeocoder {
    /// Create a geocoder from configuration.
    ///
    /// # Errors
    ///
    /// Returns `GeocodeError::Http` if the HTTP client cannot be built.
    pub fn new(config: &GeocoderConfig) -> Result<Self, GeocodeError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
        })
    }
}

#[async_trait]
impl Geocoder for MapQuestGeocoder {
    async fn geocode(&self, query: &str) -> Result<Location, GeocodeError> {
        let url = url::Url::parse_with_params(
            &self.base_url,
            &[("key", self.api_key.expose_secret()), ("location", query)],
        )?;

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(GeocodeError::Response(format!("status {status}")));
        }

        let body: MapQuestResponse = response
            .json()
            .await
            .map_err(|e| GeocodeError::Response(format!("failed to parse response: {e}")))?;

        let location = best_match(body, query)?;
        tracing::debug!(
            query = %query,
            longitude = location.point.longitude,
            latitude = location.point.latitude,
            "geocoded"
        );
        Ok(location)
    }
}

#[derive(Debug, Deserialize)]
struct MapQuestResponse {
    #[serde(default)]
    results: Vec<MapQuestResult>,
}

#[derive(Debug, Deserialize)]
struct MapQuestResult {
    #[serde(default)]
    locations: Vec<MapQuestLocation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MapQuestLocation {
    lat_lng: MapQuestLatLng,
    #[serde(default)]
    street: Option<String>,
    /// City.
    #[serde(default)]
    admin_area5: Option<String>,
    /// State code.
    #[serde(default)]
    admin_area3: Option<String>,
    /// Country code.
    #[serde(default)]
    admin_area1: Option<String>,
    #[serde(default)]
    postal_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MapQuestLatLng {
    lat: f64,
    lng: f64,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn best_match(response: MapQuestResponse, query: &str) -> Result<Location, GeocodeError> {
    let found = response
        .results
        .into_iter()
        .next()
        .and_then(|r| r.locations.into_iter().next())
        .ok_or_else(|| GeocodeError::NoMatch(query.to_owned()))?;

    let street = non_empty(found.street);
    let city = non_empty(found.admin_area5);
    let state = non_empty(found.admin_area3);
    let zipcode = non_empty(found.postal_code);
    let country = non_empty(found.admin_area1);

    let state_zip = [state.as_deref(), zipcode.as_deref()]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");
    let parts: Vec<&str> = [street.as_deref(), city.as_deref()]
        .into_iter()
        .flatten()
        .chain((!state_zip.is_empty()).then_some(state_zip.as_str()))
        .chain(country.as_deref())
        .collect();
    let formatted_address = if parts.is_empty() {
        query.to_owned()
    } else {
        parts.join(", ")
    };

    Ok(Location {
        point: GeoPoint::new(found.lat_lng.lng, found.lat_lng.lat),
        formatted_address,
        street,
        city,
        state,
        zipcode,
        country,
    })
}
