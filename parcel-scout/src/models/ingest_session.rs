//! Ingestion session state machine
//!
//! A session progresses through:
//! IDLE → STREAMING → SETTLING → READY
//!
//! or ends early in FAILED (transport error, partial data kept) or CANCELLED
//! (consumer went away, nothing written after the cancel).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Progress ceiling while the stream is still open
pub const STREAMING_PERCENT_CAP: u8 = 95;

/// Ingestion state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IngestState {
    /// Nothing requested yet
    Idle,
    /// Reading chunks and publishing throttled snapshots
    Streaming,
    /// Stream closed, 100% shown, waiting out the settle delay
    Settling,
    /// Final dataset published and ready
    Ready,
    /// Transport failure; partial dataset published
    Failed,
    /// Abandoned by the consumer
    Cancelled,
}

impl IngestState {
    /// Still loading (progress indicator visible)
    pub fn is_loading(self) -> bool {
        matches!(self, IngestState::Streaming | IngestState::Settling)
    }

    /// No further transitions
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            IngestState::Ready | IngestState::Failed | IngestState::Cancelled
        )
    }
}

/// State transition record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub session_id: Uuid,
    pub old_state: IngestState,
    pub new_state: IngestState,
    pub transitioned_at: DateTime<Utc>,
}

/// Progress as seen by a progress indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestProgress {
    pub state: IngestState,
    /// Parcels decoded so far
    pub record_count: usize,
    /// 0-95 while streaming, 100 once the stream closed cleanly
    pub percent: u8,
}

impl Default for IngestProgress {
    fn default() -> Self {
        Self {
            state: IngestState::Idle,
            record_count: 0,
            percent: 0,
        }
    }
}

/// Streaming progress: `min(95, floor(count / expected_total * 100))`
///
/// `expected_total` is an estimate. Counts beyond it saturate at 95 so the
/// indicator never reads "done" before the stream closes.
pub fn progress_percent(record_count: usize, expected_total: usize) -> u8 {
    if expected_total == 0 {
        return if record_count > 0 { STREAMING_PERCENT_CAP } else { 0 };
    }
    let raw = (record_count as u128 * 100) / expected_total as u128;
    raw.min(u128::from(STREAMING_PERCENT_CAP)) as u8
}

/// One ingestion run (in-memory state)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestSession {
    pub session_id: Uuid,

    /// County or source label being loaded
    pub source: String,

    pub state: IngestState,

    /// Parcels decoded so far
    pub record_count: usize,

    /// Lines dropped as malformed
    pub malformed_lines: usize,

    /// Snapshots published during streaming
    pub snapshots_published: usize,

    /// Transport error text when FAILED
    pub error: Option<String>,

    pub started_at: DateTime<Utc>,

    /// Set on READY, FAILED and CANCELLED
    pub ended_at: Option<DateTime<Utc>>,
}

impl IngestSession {
    /// Create new session in IDLE
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            source: source.into(),
            state: IngestState::Idle,
            record_count: 0,
            malformed_lines: 0,
            snapshots_published: 0,
            error: None,
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    /// Transition to new state
    pub fn transition_to(&mut self, new_state: IngestState) -> StateTransition {
        let transition = StateTransition {
            session_id: self.session_id,
            old_state: self.state,
            new_state,
            transitioned_at: Utc::now(),
        };
        self.state = new_state;

        if new_state.is_terminal() {
            self.ended_at = Some(Utc::now());
        }

        transition
    }

    /// Record a transport failure and move to FAILED
    pub fn fail(&mut self, error: impl Into<String>) -> StateTransition {
        self.error = Some(error.into());
        self.transition_to(IngestState::Failed)
    }

    /// Progress percentage for the current state
    pub fn percent(&self, expected_total: usize) -> u8 {
        match self.state {
            IngestState::Settling | IngestState::Ready => 100,
            IngestState::Idle => 0,
            _ => progress_percent(self.record_count, expected_total),
        }
    }

    /// Progress snapshot for the state holder
    pub fn progress(&self, expected_total: usize) -> IngestProgress {
        IngestProgress {
            state: self.state,
            record_count: self.record_count,
            percent: self.percent(expected_total),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}
