//! Core types for Bookaholic.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod geo;
pub mod id;
pub mod price;
pub mod rating;
pub mod role;

pub use email::{Email, EmailError};
pub use geo::{EARTH_RADIUS_MILES, GeoPoint, Location, radius_from_miles};
pub use id::*;
pub use price::{MAX_PRICE, Price, PriceError};
pub use rating::{Rating, RatingError, average_rating};
pub use role::{Role, RoleError};
