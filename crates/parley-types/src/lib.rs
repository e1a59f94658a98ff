//! Shared domain types for Parley.
//!
//! This crate contains the domain types used across the Parley client:
//! topics, sessions, messages, local activity records, history queries,
//! remote request/response shapes, configuration, and their error types.
//!
//! Zero infrastructure dependencies -- only serde, chrono, thiserror.

pub mod activity;
pub mod config;
pub mod error;
pub mod history;
pub mod message;
pub mod remote;
pub mod session;
