//! Event types for the Longbox event system
//!
//! Provides the shared event enum and EventBus used by the engine and any
//! front end observing a run. Events are broadcast in-process and can be
//! serialized for logging or export.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Longbox event types
///
/// Events use a central enum for type safety and exhaustive matching.
/// Payload enums owned by the engine (confidence, status, action kind) are
/// carried in their string form so subscribers do not need the engine crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LongboxEvent {
    /// An organize session began processing a queue
    SessionStarted {
        /// Session UUID
        session_id: Uuid,
        /// Number of files queued
        total_files: usize,
        /// When the session started
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Periodic progress during a session
    ///
    /// Emitted after each file completes. Lossy: it is acceptable for no
    /// subscriber to be listening.
    SessionProgress {
        /// Session UUID
        session_id: Uuid,
        /// Files finished so far (any outcome)
        processed: usize,
        /// Total files in the queue
        total: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Session finished with all files accounted for
    SessionCompleted {
        session_id: Uuid,
        succeeded: usize,
        warnings: usize,
        errors: usize,
        cancelled: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Session was cancelled before the queue drained
    SessionCancelled {
        session_id: Uuid,
        /// Files left unprocessed at cancellation
        remaining: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A queued file finished identification (parse, match, enrich, score)
    FileIdentified {
        /// QueuedFile UUID
        file_id: Uuid,
        /// File display name
        display_name: String,
        /// Assigned confidence level ("Low"/"Medium"/"High"), if any
        confidence: Option<String>,
        /// Resulting status ("Success"/"Warning"/"Error")
        status: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A file was moved or copied into the library
    FileOrganized {
        file_id: Uuid,
        /// Final path actually written (collision handling may alter it)
        final_path: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Organizing a file failed; the source file is untouched
    OrganizeFailed {
        file_id: Uuid,
        /// Human-readable cause
        message: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A queued file was skipped because the session was cancelled
    FileCancelled {
        file_id: Uuid,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The organizer recorded a reversible action
    ActionRecorded {
        action_id: Uuid,
        /// Action kind ("Move"/"Copy"/"Undo")
        kind: String,
        /// Human-readable description
        message: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A recorded action was reversed
    ActionUndone {
        action_id: Uuid,
        message: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A knowledge-base entry was added, updated, or removed (between runs)
    KnowledgeBaseChanged {
        series_name: String,
        /// "upserted" or "removed"
        change: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl LongboxEvent {
    /// Get event type as string for filtering
    pub fn event_type(&self) -> &str {
        match self {
            LongboxEvent::SessionStarted { .. } => "SessionStarted",
            LongboxEvent::SessionProgress { .. } => "SessionProgress",
            LongboxEvent::SessionCompleted { .. } => "SessionCompleted",
            LongboxEvent::SessionCancelled { .. } => "SessionCancelled",
            LongboxEvent::FileIdentified { .. } => "FileIdentified",
            LongboxEvent::FileOrganized { .. } => "FileOrganized",
            LongboxEvent::OrganizeFailed { .. } => "OrganizeFailed",
            LongboxEvent::FileCancelled { .. } => "FileCancelled",
            LongboxEvent::ActionRecorded { .. } => "ActionRecorded",
            LongboxEvent::ActionUndone { .. } => "ActionUndone",
            LongboxEvent::KnowledgeBaseChanged { .. } => "KnowledgeBaseChanged",
        }
    }
}

/// Broadcast bus for LongboxEvent
///
/// Wraps a `tokio::sync::broadcast` channel. Cloning is cheap; all clones
/// share the same channel. Subscribers receive events emitted after they
/// subscribe; slow subscribers may observe `Lagged` when the buffer wraps.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<LongboxEvent>,
    capacity: usize,
}

impl EventBus {
    /// Create a new EventBus with the given channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<LongboxEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)`; `Err` when no subscriber is listening,
    /// which callers of critical events should log.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: LongboxEvent,
    ) -> Result<usize, broadcast::error::SendError<LongboxEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring whether anyone is listening
    ///
    /// For progress-style events where a missing subscriber is normal.
    pub fn emit_lossy(&self, event: LongboxEvent) {
        let _ = self.tx.send(event);
    }

    /// Current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_event() -> LongboxEvent {
        LongboxEvent::FileIdentified {
            file_id: Uuid::new_v4(),
            display_name: "Saga #1 (2012).cbz".to_string(),
            confidence: Some("High".to_string()),
            status: "Success".to_string(),
            timestamp: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_emit_and_receive() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.emit(sample_event()).unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received.event_type(), "FileIdentified");
    }

    #[tokio::test]
    async fn test_emit_without_subscribers_errors() {
        let bus = EventBus::new(16);
        assert!(bus.emit(sample_event()).is_err());
        // emit_lossy swallows the same condition
        bus.emit_lossy(sample_event());
    }

    #[tokio::test]
    async fn test_multiple_subscribers_each_receive() {
        let bus = EventBus::new(16);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        bus.emit(sample_event()).unwrap();

        assert_eq!(rx1.recv().await.unwrap().event_type(), "FileIdentified");
        assert_eq!(rx2.recv().await.unwrap().event_type(), "FileIdentified");
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = LongboxEvent::SessionStarted {
            session_id: Uuid::new_v4(),
            total_files: 5,
            timestamp: chrono::Utc::now(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"SessionStarted""#));
        assert!(json.contains(r#""total_files":5"#));

        let back: LongboxEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back.event_type(), "SessionStarted");
    }

    #[test]
    fn test_capacity_reported() {
        assert_eq!(EventBus::new(100).capacity(), 100);
    }
}
