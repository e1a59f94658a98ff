//! Infrastructure layer for Parley.
//!
//! Concrete implementations of the seams defined in `parley-core`: a SQLite
//! key/value store for local activity records, the HTTP client for the
//! remote session authority, and configuration loading.

pub mod config;
pub mod http;
pub mod sqlite;
