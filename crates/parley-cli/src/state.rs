//! Application state wiring the engine to concrete infrastructure.
//!
//! AppState pins the core's generic seams to the infra implementations:
//! the HTTP session remote and either the SQLite key/value store or, with
//! `--ephemeral`, an in-memory one.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;

use parley_core::activity::LocalActivityStore;
use parley_core::controller::ChatController;
use parley_core::history::HistoryBrowser;
use parley_core::storage::kv_store::KvStore;
use parley_core::storage::memory::InMemoryKvStore;
use parley_infra::config::{api_token, load_config, resolve_data_dir};
use parley_infra::http::HttpSessionRemote;
use parley_infra::sqlite::kv::SqliteKvStore;
use parley_infra::sqlite::pool::DatabasePool;
use parley_types::config::ParleyConfig;
use parley_types::error::StorageError;

/// Where activity records live for this process.
pub enum ActivityKv {
    Sqlite(SqliteKvStore),
    Memory(InMemoryKvStore),
}

impl ActivityKv {
    pub fn describe(&self) -> &'static str {
        match self {
            ActivityKv::Sqlite(_) => "sqlite",
            ActivityKv::Memory(_) => "memory",
        }
    }
}

impl KvStore for ActivityKv {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, StorageError> {
        match self {
            ActivityKv::Sqlite(kv) => kv.get(key).await,
            ActivityKv::Memory(kv) => kv.get(key).await,
        }
    }

    async fn set(&self, key: &str, value: &serde_json::Value) -> Result<(), StorageError> {
        match self {
            ActivityKv::Sqlite(kv) => kv.set(key, value).await,
            ActivityKv::Memory(kv) => kv.set(key, value).await,
        }
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        match self {
            ActivityKv::Sqlite(kv) => kv.delete(key).await,
            ActivityKv::Memory(kv) => kv.delete(key).await,
        }
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        match self {
            ActivityKv::Sqlite(kv) => kv.list_keys(prefix).await,
            ActivityKv::Memory(kv) => kv.list_keys(prefix).await,
        }
    }
}

pub type ConcreteController = ChatController<HttpSessionRemote, ActivityKv>;

/// Shared state for every command.
pub struct AppState {
    pub config: ParleyConfig,
    pub data_dir: PathBuf,
    pub remote: Arc<HttpSessionRemote>,
    pub store: Arc<LocalActivityStore<ActivityKv>>,
    db_pool: Option<DatabasePool>,
}

impl AppState {
    /// Load config, open the activity database and build the remote.
    pub async fn init(ephemeral: bool) -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        let config = load_config(&data_dir).await;

        let (kv, db_pool) = if ephemeral {
            (ActivityKv::Memory(InMemoryKvStore::new()), None)
        } else {
            tokio::fs::create_dir_all(&data_dir)
                .await
                .with_context(|| format!("Failed to create {}", data_dir.display()))?;
            let pool = DatabasePool::open_in(&data_dir)
                .await
                .with_context(|| format!("Failed to open database in {}", data_dir.display()))?;
            (ActivityKv::Sqlite(SqliteKvStore::new(pool.clone())), Some(pool))
        };

        let remote = HttpSessionRemote::from_config(&config, api_token())
            .context("Failed to configure the session API client")?;
        let store = LocalActivityStore::new(kv, config.inactivity_timeout());

        tracing::debug!(
            data_dir = %data_dir.display(),
            api = %config.api_base_url,
            ephemeral,
            "Initialized application state"
        );

        Ok(Self {
            config,
            data_dir,
            remote: Arc::new(remote),
            store: Arc::new(store),
            db_pool,
        })
    }

    /// A controller hosting one interactive conversation.
    pub fn controller(&self) -> ConcreteController {
        ChatController::new(self.remote.clone(), self.store.clone(), &self.config)
    }

    pub fn history_browser(&self) -> HistoryBrowser<HttpSessionRemote> {
        HistoryBrowser::new(self.remote.clone(), self.config.history_limit())
    }

    /// Close the database pools, flushing the WAL.
    pub async fn close(self) {
        if let Some(pool) = self.db_pool {
            pool.close().await;
        }
    }
}
