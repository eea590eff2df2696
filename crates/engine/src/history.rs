//! Undo/Redo history for bulk-edit operations.
//!
//! One entry is one user action (single edit, paste, fill); undoing it
//! reverts every cell it touched.

use casegrid_core::CellKey;

const DEFAULT_MAX_ENTRIES: usize = 100;

#[derive(Clone, Debug, PartialEq)]
pub struct CellChange {
    pub cell: CellKey,
    pub old_value: String,
    pub new_value: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct HistoryEntry {
    pub description: String,
    pub changes: Vec<CellChange>,
}

#[derive(Debug)]
pub struct History {
    undo_stack: Vec<HistoryEntry>,
    redo_stack: Vec<HistoryEntry>,
    max_entries: usize,
}

impl History {
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_MAX_ENTRIES)
    }

    pub fn with_limit(max_entries: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_entries: max_entries.max(1),
        }
    }

    /// Record multiple cell changes as a single undoable operation
    pub fn record_batch(&mut self, description: impl Into<String>, changes: Vec<CellChange>) {
        let changes: Vec<CellChange> = changes
            .into_iter()
            .filter(|c| c.old_value != c.new_value)
            .collect();
        if changes.is_empty() {
            return;
        }

        self.undo_stack.push(HistoryEntry {
            description: description.into(),
            changes,
        });
        self.redo_stack.clear();

        // Limit history size
        if self.undo_stack.len() > self.max_entries {
            self.undo_stack.remove(0);
        }
    }

    /// Pop the last entry for undo, returns the changes to revert
    pub fn undo(&mut self) -> Option<HistoryEntry> {
        let entry = self.undo_stack.pop()?;
        self.redo_stack.push(entry.clone());
        Some(entry)
    }

    /// Pop from redo stack, returns the changes to reapply
    pub fn redo(&mut self) -> Option<HistoryEntry> {
        let entry = self.redo_stack.pop()?;
        self.undo_stack.push(entry.clone());
        Some(entry)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn change(record: &str, old: &str, new: &str) -> CellChange {
        CellChange {
            cell: CellKey::new(record, "title"),
            old_value: old.to_string(),
            new_value: new.to_string(),
        }
    }

    #[test]
    fn test_undo_redo_order() {
        let mut history = History::new();
        history.record_batch("first", vec![change("1", "a", "b")]);
        history.record_batch("second", vec![change("2", "c", "d"), change("3", "e", "f")]);

        let entry = history.undo().unwrap();
        assert_eq!(entry.description, "second");
        assert_eq!(entry.changes.len(), 2);
        assert!(history.can_redo());

        let entry = history.redo().unwrap();
        assert_eq!(entry.description, "second");
        assert!(!history.can_redo());
    }

    #[test]
    fn test_new_entry_clears_redo() {
        let mut history = History::new();
        history.record_batch("first", vec![change("1", "a", "b")]);
        history.undo();
        assert!(history.can_redo());

        history.record_batch("other", vec![change("1", "a", "z")]);
        assert!(!history.can_redo());
    }

    #[test]
    fn test_noop_changes_are_not_recorded() {
        let mut history = History::new();
        history.record_batch("noop", vec![change("1", "a", "a")]);
        assert!(!history.can_undo());
    }

    #[test]
    fn test_limit_drops_oldest() {
        let mut history = History::with_limit(2);
        history.record_batch("1", vec![change("1", "a", "b")]);
        history.record_batch("2", vec![change("1", "b", "c")]);
        history.record_batch("3", vec![change("1", "c", "d")]);

        assert_eq!(history.undo_len(), 2);
        assert_eq!(history.undo().unwrap().description, "3");
        assert_eq!(history.undo().unwrap().description, "2");
        assert!(history.undo().is_none());
    }
}
