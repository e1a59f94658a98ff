//! Activity tracker.
//!
//! Turns a stream of user interaction events into throttled touches of the
//! local activity store. A tracker is an owned subscription scoped to one
//! topic: dropping or detaching the handle stops its task.

use std::sync::Arc;
use std::time::Duration;

use parley_types::activity::ActivityEvent;
use parley_types::session::TopicId;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use super::store::LocalActivityStore;
use super::throttle::{ThrottleAction, TrailingThrottle};
use crate::storage::kv_store::KvStore;

/// Buffered events per tracker. Excess events are dropped; they would be
/// coalesced by the throttle anyway.
const EVENT_BUFFER: usize = 64;

/// Handle to a running activity tracker.
///
/// The tracker stops when the handle is detached or dropped, or when the
/// parent cancellation token fires.
#[derive(Debug)]
pub struct TrackerHandle {
    topic: TopicId,
    events: mpsc::Sender<ActivityEvent>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl TrackerHandle {
    /// Start tracking activity for `topic`.
    ///
    /// The first throttle window opens now, since the caller has just
    /// written the topic's record.
    pub fn attach<K>(
        store: Arc<LocalActivityStore<K>>,
        topic: TopicId,
        interval: Duration,
        parent: &CancellationToken,
    ) -> Self
    where
        K: KvStore + 'static,
    {
        let (events, rx) = mpsc::channel(EVENT_BUFFER);
        let cancel = parent.child_token();
        let task = tokio::spawn(run_tracker(
            store,
            topic.clone(),
            interval,
            rx,
            cancel.clone(),
        ));
        debug!(topic = %topic, interval_secs = interval.as_secs(), "Activity tracker attached");

        Self {
            topic,
            events,
            cancel,
            task: Some(task),
        }
    }

    /// Report one user interaction. Never blocks.
    pub fn record(&self, event: ActivityEvent) {
        if self.cancel.is_cancelled() {
            return;
        }
        if self.events.try_send(event).is_err() {
            trace!(topic = %self.topic, %event, "Activity event dropped");
        }
    }

    pub fn topic(&self) -> &TopicId {
        &self.topic
    }

    pub fn is_attached(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    /// Stop the tracker and wait for its task to finish.
    pub async fn detach(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
        debug!(topic = %self.topic, "Activity tracker detached");
    }
}

impl Drop for TrackerHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run_tracker<K: KvStore>(
    store: Arc<LocalActivityStore<K>>,
    topic: TopicId,
    interval: Duration,
    mut rx: mpsc::Receiver<ActivityEvent>,
    cancel: CancellationToken,
) {
    let mut throttle = TrailingThrottle::started_at(interval, Instant::now());

    loop {
        let deadline = throttle.deadline();
        tokio::select! {
            _ = cancel.cancelled() => break,
            event = rx.recv() => {
                let Some(event) = event else { break };
                match throttle.on_event(Instant::now()) {
                    ThrottleAction::Fire => {
                        trace!(topic = %topic, %event, "Activity touch");
                        store.touch(&topic).await;
                    }
                    ThrottleAction::Scheduled(_) | ThrottleAction::Coalesced => {}
                }
            }
            _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                if throttle.take_due(Instant::now()) {
                    trace!(topic = %topic, "Deferred activity touch");
                    store.touch(&topic).await;
                }
            }
        }
    }
}
