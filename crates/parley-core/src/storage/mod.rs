//! Storage abstractions for Parley.
//!
//! Defines the key-value port the local activity store persists through,
//! plus an in-memory implementation. The durable SQLite implementation
//! lives in parley-infra.

pub mod kv_store;
pub mod memory;
