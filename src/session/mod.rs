#![forbid(unsafe_code)]

// Session registry - the fixed set of sessions belonging to one test run

pub mod reconcile;

pub use crate::protocol::Status;

use crate::validate::Concurrency;
use serde::Serialize;
use std::fmt;

/// Response shown for a session before the runner reports anything.
pub const PLACEHOLDER_RESPONSE: &str = "Preparing request...";

/// 1-based session number assigned at run creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SessionId(u32);

impl SessionId {
    pub fn new(raw: u32) -> Option<Self> {
        (raw > 0).then_some(Self(raw))
    }

    pub fn get(self) -> u32 {
        self.0
    }

    fn index(self) -> usize {
        (self.0 - 1) as usize
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub id: SessionId,
    pub status: Status,
    /// Latest snapshot reported by the runner; replaced, never appended
    pub response: String,
}

impl Session {
    pub fn pending(id: SessionId) -> Self {
        Self {
            id,
            status: Status::Pending,
            response: PLACEHOLDER_RESPONSE.to_string(),
        }
    }
}

/// Result of routing one progress update into the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciled {
    Applied { previous: Status, current: Status },
    /// No session with that id in this run
    Stale,
    /// Session already finished; late frame dropped
    AlreadyFinished { status: Status },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub pending: usize,
    pub loading: usize,
    pub success: usize,
    pub error: usize,
}

impl StatusCounts {
    pub fn in_flight(&self) -> usize {
        self.pending + self.loading
    }
}

/// Ordered sessions of the current run.
///
/// Ids are contiguous 1..=N, so the session with id `k` lives at index `k - 1`.
/// The id set only changes through [`SessionRegistry::seed`].
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    sessions: Vec<Session>,
}

impl SessionRegistry {
    /// Replace the registry with `concurrency` pending sessions.
    pub fn seed(&mut self, concurrency: Concurrency) {
        self.sessions = (1..=concurrency.get())
            .filter_map(SessionId::new)
            .map(Session::pending)
            .collect();
    }

    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn get(&self, id: SessionId) -> Option<&Session> {
        self.sessions.get(id.index())
    }

    /// Apply a progress snapshot to exactly one session.
    pub fn apply(&mut self, id: SessionId, response: &str) -> Reconciled {
        let Some(slot) = self.sessions.get_mut(id.index()) else {
            return Reconciled::Stale;
        };
        if slot.status.is_terminal() {
            return Reconciled::AlreadyFinished { status: slot.status };
        }

        let previous = slot.status;
        *slot = reconcile::reduce(slot, response);
        Reconciled::Applied { previous, current: slot.status }
    }

    /// True once no session is pending or loading. Idempotent.
    pub fn all_finished(&self) -> bool {
        !self.sessions.is_empty() && self.sessions.iter().all(|s| s.status.is_terminal())
    }

    pub fn counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for session in &self.sessions {
            match session.status {
                Status::Pending => counts.pending += 1,
                Status::Loading => counts.loading += 1,
                Status::Success => counts.success += 1,
                Status::Error => counts.error += 1,
            }
        }
        counts
    }
}
