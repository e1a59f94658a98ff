//! Session-continuity engine for Parley.
//!
//! This crate defines the ports (`SessionRemote`, `KvStore`) that the
//! infrastructure layer implements, and the logic built on them: local
//! activity bookkeeping, session negotiation, optimistic sends and history
//! browsing. It depends only on `parley-types`, never on `parley-infra`.

pub mod activity;
pub mod cache;
pub mod clock;
pub mod controller;
pub mod history;
pub mod mutator;
pub mod negotiator;
pub mod remote;
pub mod retry;
pub mod storage;

#[cfg(test)]
pub(crate) mod testing;
