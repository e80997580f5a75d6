//! Undo/redo history of timeline snapshots.
//!
//! A bounded, linear history: each entry is a full snapshot of the timeline
//! taken before a mutation. Undo and redo swap the live model with the
//! snapshot at the cursor; a new mutation after undo discards the redo side.

use crate::timeline::Timeline;

/// Default maximum number of retained snapshots.
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

#[derive(Debug, Clone)]
struct HistoryEntry {
    label: String,
    timeline: Timeline,
}

/// Bounded undo/redo stacks of timeline snapshots.
#[derive(Debug)]
pub struct History {
    undo_stack: Vec<HistoryEntry>,
    redo_stack: Vec<HistoryEntry>,
    max_entries: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl History {
    /// Create a history bounded to `max_entries` snapshots.
    pub fn new(max_entries: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_entries: max_entries.max(1),
        }
    }

    /// Record the pre-mutation state of the timeline.
    ///
    /// Clears any redo entries and evicts the oldest snapshot past the
    /// bound. Call only for operations that actually changed the model;
    /// rejected operations must not reach here.
    pub fn record(&mut self, label: impl Into<String>, before: Timeline) {
        let label = label.into();
        self.redo_stack.clear();
        self.undo_stack.push(HistoryEntry {
            label: label.clone(),
            timeline: before,
        });
        if self.undo_stack.len() > self.max_entries {
            self.undo_stack.remove(0);
        }
        tracing::debug!(
            label = %label,
            undo_depth = self.undo_stack.len(),
            "Recorded history entry"
        );
    }

    /// Replace the live timeline with the most recent snapshot.
    /// Returns false (no-op) at the oldest entry.
    pub fn undo(&mut self, current: &mut Timeline) -> bool {
        let Some(entry) = self.undo_stack.pop() else {
            return false;
        };
        let label = entry.label.clone();
        let live = std::mem::replace(current, entry.timeline);
        self.redo_stack.push(HistoryEntry {
            label: label.clone(),
            timeline: live,
        });
        tracing::debug!(
            label = %label,
            undo_depth = self.undo_stack.len(),
            redo_depth = self.redo_stack.len(),
            "Undid operation"
        );
        true
    }

    /// Replace the live timeline with the most recently undone state.
    /// Returns false (no-op) at the newest entry.
    pub fn redo(&mut self, current: &mut Timeline) -> bool {
        let Some(entry) = self.redo_stack.pop() else {
            return false;
        };
        let label = entry.label.clone();
        let live = std::mem::replace(current, entry.timeline);
        self.undo_stack.push(HistoryEntry {
            label: label.clone(),
            timeline: live,
        });
        tracing::debug!(
            label = %label,
            undo_depth = self.undo_stack.len(),
            redo_depth = self.redo_stack.len(),
            "Redid operation"
        );
        true
    }

    /// Whether an undo is available.
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Whether a redo is available.
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Number of retained undo snapshots.
    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    /// Number of retained redo snapshots.
    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    /// Label of the operation the next undo would revert.
    pub fn undo_label(&self) -> Option<&str> {
        self.undo_stack.last().map(|e| e.label.as_str())
    }

    /// Label of the operation the next redo would reapply.
    pub fn redo_label(&self) -> Option<&str> {
        self.redo_stack.last().map(|e| e.label.as_str())
    }

    /// Drop all history.
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}
