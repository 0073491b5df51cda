//! Geolocation types and great-circle helpers.
//!
//! Radius searches are expressed as an angular radius in radians:
//! `distance_miles / EARTH_RADIUS_MILES`. Storage backends compare that
//! radius against the great-circle angle between two points.

use serde::{Deserialize, Serialize};

/// Mean earth radius in miles used to convert distances to radians.
pub const EARTH_RADIUS_MILES: f64 = 3958.0;

/// A point on the earth's surface in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Longitude in degrees, east positive.
    pub longitude: f64,
    /// Latitude in degrees, north positive.
    pub latitude: f64,
}

impl GeoPoint {
    /// Create a point from longitude and latitude (in that order).
    #[must_use]
    pub const fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
        }
    }

    /// Great-circle angle to `other` in radians (haversine formula).
    #[must_use]
    pub fn angular_distance(&self, other: &Self) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let d_lat = lat2 - lat1;
        let d_lng = (other.longitude - self.longitude).to_radians();

        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
        2.0 * a.sqrt().min(1.0).asin()
    }

    /// Whether `other` lies within `radius` radians of this point.
    #[must_use]
    pub fn within(&self, other: &Self, radius: f64) -> bool {
        self.angular_distance(other) <= radius
    }
}

/// Convert a distance in miles to an angular radius in radians.
#[must_use]
pub fn radius_from_miles(miles: f64) -> f64 {
    miles / EARTH_RADIUS_MILES
}

/// A geocoded location with its formatted address components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    /// Coordinates of the best match.
    pub point: GeoPoint,
    /// Full single-line address.
    pub formatted_address: String,
    /// Street name and number.
    pub street: Option<String>,
    /// City or locality.
    pub city: Option<String>,
    /// State or region code.
    pub state: Option<String>,
    /// Postal code.
    pub zipcode: Option<String>,
    /// Country code.
    pub country: Option<String>,
}
