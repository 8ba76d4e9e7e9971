//! Organize session state machine
//!
//! A session covers one queue run: IDENTIFYING → ORGANIZING → COMPLETED,
//! with CANCELLED and FAILED as the other terminal states. Dry runs stop
//! after IDENTIFYING.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Session workflow state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SessionState {
    /// Parsing, matching, enrichment, scoring
    Identifying,
    /// Moving/copying confirmed files into the library
    Organizing,
    /// Run finished with every file accounted for
    Completed,
    /// Run cancelled by the caller
    Cancelled,
    /// Run aborted by an unrecoverable error
    Failed,
}

/// State transition event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub session_id: Uuid,
    pub old_state: SessionState,
    pub new_state: SessionState,
    pub transitioned_at: DateTime<Utc>,
}

/// Progress tracking for one session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionProgress {
    /// Files finished so far (any outcome)
    pub current: usize,
    /// Total files in the queue
    pub total: usize,
    /// Percentage complete (0.0 - 100.0)
    pub percentage: f64,
    /// Current operation description
    pub current_operation: String,
    /// Elapsed time (seconds)
    pub elapsed_seconds: u64,
    /// Estimated remaining time (seconds), None if unknown
    pub estimated_remaining_seconds: Option<u64>,
}

impl Default for SessionProgress {
    fn default() -> Self {
        Self {
            current: 0,
            total: 0,
            percentage: 0.0,
            current_operation: String::from("Starting..."),
            elapsed_seconds: 0,
            estimated_remaining_seconds: None,
        }
    }
}

/// One queue run (in-memory state)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizeSession {
    pub session_id: Uuid,
    pub state: SessionState,
    /// Library root this run organizes into
    pub library_root: String,
    pub progress: SessionProgress,
    /// Per-file failure messages accumulated during the run
    pub errors: Vec<String>,
    pub started_at: DateTime<Utc>,
    /// Set when a terminal state is entered
    pub ended_at: Option<DateTime<Utc>>,
}

impl OrganizeSession {
    pub fn new(library_root: String) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            state: SessionState::Identifying,
            library_root,
            progress: SessionProgress::default(),
            errors: Vec::new(),
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    /// Transition to a new state, stamping `ended_at` on terminal states
    pub fn transition_to(&mut self, new_state: SessionState) -> StateTransition {
        let transition = StateTransition {
            session_id: self.session_id,
            old_state: self.state,
            new_state,
            transitioned_at: Utc::now(),
        };
        self.state = new_state;

        if self.is_terminal() {
            self.ended_at = Some(Utc::now());
        }

        transition
    }

    /// Update progress counters and the remaining-time estimate
    pub fn update_progress(&mut self, current: usize, total: usize, operation: String) {
        self.progress.current = current;
        self.progress.total = total;
        self.progress.percentage = if total > 0 {
            (current as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        self.progress.current_operation = operation;

        let elapsed = (Utc::now() - self.started_at).num_seconds().max(0) as u64;
        self.progress.elapsed_seconds = elapsed;

        if current > 0 && total > current {
            let rate = elapsed as f64 / current as f64;
            self.progress.estimated_remaining_seconds = Some(((total - current) as f64 * rate) as u64);
        } else {
            self.progress.estimated_remaining_seconds = None;
        }
    }

    pub fn add_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    /// True once the session reached Completed, Cancelled, or Failed
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.state,
            SessionState::Completed | SessionState::Cancelled | SessionState::Failed
        )
    }
}
