//! HTTP adapter for the remote session authority.

pub mod client;
pub mod types;

pub use client::HttpSessionRemote;
