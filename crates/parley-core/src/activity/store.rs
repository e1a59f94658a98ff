//! Local activity store.
//!
//! Persists one `LocalActivityRecord` per topic through a `KvStore`. The
//! store is a fast-path hint, never a source of truth, so every storage
//! failure is absorbed here: unreadable or corrupt records read as absent
//! and failed writes are logged and dropped.

use std::sync::Arc;
use std::time::Duration;

use parley_types::activity::LocalActivityRecord;
use parley_types::session::{SessionId, TopicId};
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::storage::kv_store::KvStore;

/// Namespace for activity records inside the key-value store.
pub const ACTIVITY_KEY_PREFIX: &str = "parley.activity.";

/// Storage key for a topic's record.
pub fn activity_key(topic: &TopicId) -> String {
    format!("{ACTIVITY_KEY_PREFIX}{topic}")
}

/// Per-topic session hints with lazy and active expiry.
pub struct LocalActivityStore<K: KvStore> {
    kv: K,
    clock: Arc<dyn Clock>,
    threshold: chrono::Duration,
}

impl<K: KvStore> LocalActivityStore<K> {
    /// Create a store that purges records idle for longer than `inactivity_timeout`.
    pub fn new(kv: K, inactivity_timeout: Duration) -> Self {
        Self {
            kv,
            clock: Arc::new(SystemClock),
            threshold: chrono::Duration::from_std(inactivity_timeout)
                .unwrap_or_else(|_| chrono::Duration::days(365)),
        }
    }

    /// Replace the wall clock (tests).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Access the underlying key-value store.
    pub fn kv(&self) -> &K {
        &self.kv
    }

    /// The inactivity threshold.
    pub fn threshold(&self) -> chrono::Duration {
        self.threshold
    }

    /// Record `session_id` as the current session for `topic`, valid and fresh.
    pub async fn store(&self, topic: &TopicId, session_id: &SessionId) {
        let record = LocalActivityRecord::new(session_id.clone(), self.clock.now());
        self.write(topic, &record).await;
        debug!(topic = %topic, session_id = %session_id, "Stored local activity record");
    }

    /// Read a topic's record.
    ///
    /// Returns `None` when there is no record, when it cannot be read, or
    /// when it has expired. Expired and corrupt records are deleted.
    pub async fn get(&self, topic: &TopicId) -> Option<LocalActivityRecord> {
        let record = self.read(topic).await?;
        let now = self.clock.now();
        if record.is_expired(now, self.threshold) {
            info!(
                topic = %topic,
                session_id = %record.session_id,
                idle_secs = record.elapsed(now).num_seconds(),
                "Local activity record expired"
            );
            self.delete(topic).await;
            return None;
        }
        Some(record)
    }

    /// Refresh the last-activity timestamp.
    ///
    /// Returns `false` (and writes nothing) when the topic has no live
    /// record, so activity can never resurrect an expired session hint.
    pub async fn touch(&self, topic: &TopicId) -> bool {
        let Some(mut record) = self.get(topic).await else {
            return false;
        };
        record.last_activity = self.clock.now();
        self.write(topic, &record).await;
        true
    }

    /// Mark the record as not trustworthy without deleting it.
    pub async fn invalidate(&self, topic: &TopicId) {
        let Some(mut record) = self.read(topic).await else {
            return;
        };
        record.is_valid = false;
        self.write(topic, &record).await;
        debug!(topic = %topic, session_id = %record.session_id, "Invalidated local activity record");
    }

    /// Delete the record.
    pub async fn clear(&self, topic: &TopicId) {
        self.delete(topic).await;
        debug!(topic = %topic, "Cleared local activity record");
    }

    /// Delete every expired or unreadable record. Returns the number removed.
    pub async fn sweep_expired(&self) -> usize {
        let keys = match self.kv.list_keys(ACTIVITY_KEY_PREFIX).await {
            Ok(keys) => keys,
            Err(e) => {
                warn!(error = %e, "Activity sweep could not list records");
                return 0;
            }
        };

        let now = self.clock.now();
        let mut removed = 0;
        for key in keys {
            let stale = match self.kv.get(&key).await {
                Ok(Some(value)) => match serde_json::from_value::<LocalActivityRecord>(value) {
                    Ok(record) => record.is_expired(now, self.threshold),
                    Err(_) => true,
                },
                Ok(None) => false,
                Err(e) => {
                    warn!(key = %key, error = %e, "Activity sweep could not read record");
                    false
                }
            };
            if stale {
                match self.kv.delete(&key).await {
                    Ok(()) => removed += 1,
                    Err(e) => warn!(key = %key, error = %e, "Activity sweep could not delete record"),
                }
            }
        }

        if removed > 0 {
            info!(removed, "Swept expired local activity records");
        }
        removed
    }

    /// Raw read without the expiry check. Corrupt values are deleted.
    async fn read(&self, topic: &TopicId) -> Option<LocalActivityRecord> {
        let key = activity_key(topic);
        let value = match self.kv.get(&key).await {
            Ok(Some(value)) => value,
            Ok(None) => return None,
            Err(e) => {
                warn!(topic = %topic, error = %e, "Local activity storage unreadable");
                return None;
            }
        };

        match serde_json::from_value::<LocalActivityRecord>(value) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(topic = %topic, error = %e, "Discarding corrupt local activity record");
                self.delete(topic).await;
                None
            }
        }
    }

    async fn write(&self, topic: &TopicId, record: &LocalActivityRecord) {
        let value = match serde_json::to_value(record) {
            Ok(value) => value,
            Err(e) => {
                warn!(topic = %topic, error = %e, "Failed to encode local activity record");
                return;
            }
        };
        if let Err(e) = self.kv.set(&activity_key(topic), &value).await {
            warn!(topic = %topic, error = %e, "Failed to persist local activity record");
        }
    }

    async fn delete(&self, topic: &TopicId) {
        if let Err(e) = self.kv.delete(&activity_key(topic)).await {
            warn!(topic = %topic, error = %e, "Failed to delete local activity record");
        }
    }
}

impl<K: KvStore> std::fmt::Debug for LocalActivityStore<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalActivityStore")
            .field("threshold_secs", &self.threshold.num_seconds())
            .finish()
    }
}
