//! Session history query and result types.

use serde::{Deserialize, Serialize};

use crate::session::{Session, SessionStatus};

/// Server-enforced ceiling on sessions returned by one history call.
pub const MAX_HISTORY_LIMIT: u32 = 30;

/// Longest session title the server stores.
pub const MAX_TITLE_LEN: usize = 255;

/// Filter for a session-history request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryQuery {
    /// Requested page size. `None` means the ceiling.
    pub limit: Option<u32>,
    /// Only return sessions with this status.
    pub status: Option<SessionStatus>,
    /// Include sessions the server no longer considers current.
    /// `None` leaves the server default (include).
    pub include_inactive: Option<bool>,
}

impl HistoryQuery {
    /// Limit actually sent to the server: defaulted and clamped to the ceiling.
    pub fn effective_limit(&self) -> u32 {
        self.limit
            .unwrap_or(MAX_HISTORY_LIMIT)
            .clamp(1, MAX_HISTORY_LIMIT)
    }
}

/// A bounded window of past sessions for one topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionHistory {
    /// Most-recently-updated first.
    pub sessions: Vec<Session>,
    pub total_count: u32,
    pub active_count: u32,
}
