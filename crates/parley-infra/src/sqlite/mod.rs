//! SQLite storage layer.
//!
//! The durable `KvStore` behind the local activity store, on a WAL-mode
//! database with split read/write connection pools.

pub mod kv;
pub mod pool;
