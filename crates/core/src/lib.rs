//! Bookaholic Core - Shared domain types.
//!
//! This crate provides the types shared by every Bookaholic component:
//! - `api` - The REST API server
//! - `cli` - Command-line tools for migrations, seeding and user management
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. Validation that does not need storage (email shape,
//! rating bounds, price sign, role names) lives here so every entry point
//! enforces it the same way.
//!
//! # Modules
//!
//! - [`types`] - Type-safe IDs, emails, roles, ratings, prices and geolocation

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
