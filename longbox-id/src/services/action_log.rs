//! Bounded action history
//!
//! Session-scoped log of organizer actions, newest first, capped at
//! [`MAX_ACTIONS`] entries with strict FIFO eviction. Not persisted; undo
//! only covers the current session. The log itself is a plain container —
//! the queue processor serializes access behind a single mutex.

use uuid::Uuid;

use crate::models::action::RecentAction;

/// Maximum retained actions; inserting past this evicts the oldest
pub const MAX_ACTIONS: usize = 20;

#[derive(Debug, Default)]
pub struct ActionLog {
    /// Front is newest
    entries: std::collections::VecDeque<RecentAction>,
}

impl ActionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an action, evicting the oldest entry once the cap is reached
    pub fn record(&mut self, action: RecentAction) {
        self.entries.push_front(action);
        self.entries.truncate(MAX_ACTIONS);
    }

    /// Actions newest first
    pub fn actions(&self) -> impl Iterator<Item = &RecentAction> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&RecentAction> {
        self.entries.front()
    }

    /// Remove and return the action with `id`, if still retained.
    /// Used by the undo executor; removal makes undo one-shot.
    pub fn take(&mut self, id: Uuid) -> Option<RecentAction> {
        let index = self.entries.iter().position(|a| a.id == id)?;
        self.entries.remove(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::action::ActionKind;

    fn action(n: usize) -> RecentAction {
        RecentAction::new(ActionKind::Move, format!("action {n}"), None)
    }

    #[test]
    fn test_caps_at_max_with_fifo_eviction() {
        let mut log = ActionLog::new();
        for n in 1..=25 {
            log.record(action(n));
        }
        assert_eq!(log.len(), MAX_ACTIONS);

        let messages: Vec<&str> = log.actions().map(|a| a.message.as_str()).collect();
        // Newest first: 25 down to 6; 1-5 were evicted
        assert_eq!(messages.first(), Some(&"action 25"));
        assert_eq!(messages.last(), Some(&"action 6"));
        assert_eq!(messages.len(), MAX_ACTIONS);
    }

    #[test]
    fn test_latest_is_most_recent() {
        let mut log = ActionLog::new();
        log.record(action(1));
        log.record(action(2));
        assert_eq!(log.latest().map(|a| a.message.as_str()), Some("action 2"));
    }

    #[test]
    fn test_take_is_one_shot() {
        let mut log = ActionLog::new();
        let a = action(1);
        let id = a.id;
        log.record(a);
        log.record(action(2));

        let taken = log.take(id);
        assert!(taken.is_some());
        assert_eq!(log.len(), 1);
        assert!(log.take(id).is_none());
    }
}
