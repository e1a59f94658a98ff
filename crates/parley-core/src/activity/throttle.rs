//! Trailing-edge throttle.
//!
//! The decision itself is a pure function of (last fire, now, interval);
//! `TrailingThrottle` adds the bookkeeping that coalesces a burst of events
//! into a single deferred fire at the window boundary.

use std::time::Duration;

use tokio::time::Instant;

/// What to do with an event, given when the throttle last fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleDecision {
    /// The window has elapsed: fire immediately.
    FireNow,
    /// Inside the window: fire once at this instant.
    FireAt(Instant),
}

/// Pure throttle decision.
pub fn decide(last_fire: Option<Instant>, now: Instant, interval: Duration) -> ThrottleDecision {
    match last_fire {
        None => ThrottleDecision::FireNow,
        Some(last) => {
            let boundary = last + interval;
            if now >= boundary {
                ThrottleDecision::FireNow
            } else {
                ThrottleDecision::FireAt(boundary)
            }
        }
    }
}

/// Outcome of feeding one event to a `TrailingThrottle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleAction {
    Fire,
    Scheduled(Instant),
    /// A deferred fire for this window is already pending.
    Coalesced,
}

/// Stateful trailing-edge throttle.
#[derive(Debug, Clone)]
pub struct TrailingThrottle {
    interval: Duration,
    last_fire: Option<Instant>,
    pending: Option<Instant>,
}

impl TrailingThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_fire: None,
            pending: None,
        }
    }

    /// A throttle whose first window opens at `at`, as if it had just fired.
    pub fn started_at(interval: Duration, at: Instant) -> Self {
        Self {
            interval,
            last_fire: Some(at),
            pending: None,
        }
    }

    pub fn on_event(&mut self, now: Instant) -> ThrottleAction {
        if self.pending.is_some() {
            return ThrottleAction::Coalesced;
        }
        match decide(self.last_fire, now, self.interval) {
            ThrottleDecision::FireNow => {
                self.last_fire = Some(now);
                ThrottleAction::Fire
            }
            ThrottleDecision::FireAt(at) => {
                self.pending = Some(at);
                ThrottleAction::Scheduled(at)
            }
        }
    }

    /// Deadline of the pending deferred fire, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending
    }

    /// Consume the pending fire if it is due. Returns whether to fire.
    pub fn take_due(&mut self, now: Instant) -> bool {
        match self.pending {
            Some(at) if now >= at => {
                self.pending = None;
                self.last_fire = Some(now);
                true
            }
            _ => false,
        }
    }
}
