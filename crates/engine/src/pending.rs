//! Staged, not-yet-saved cell edits.
//!
//! Only the delta is kept: a cell has an entry here iff its edited text
//! differs from the last-known server value. Records with no remaining
//! entries are removed.

use std::collections::BTreeMap;

use casegrid_core::{CellKey, ColumnKey, RecordId};

pub type RecordChanges = BTreeMap<ColumnKey, String>;

/// Pending cell values keyed by record, then column.
///
/// BTreeMap for deterministic save order and payload field order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PendingChanges {
    entries: BTreeMap<RecordId, RecordChanges>,
}

impl PendingChanges {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage `value` for `cell`, or drop the entry when it equals `baseline`
    /// (the server value). Returns true if the stored state changed.
    pub fn set(&mut self, cell: &CellKey, value: &str, baseline: &str) -> bool {
        if value == baseline {
            return self.remove(cell);
        }

        let changes = self.entries.entry(cell.record.clone()).or_default();
        match changes.get(&cell.column) {
            Some(existing) if existing == value => false,
            _ => {
                changes.insert(cell.column.clone(), value.to_string());
                true
            }
        }
    }

    /// Remove one cell's entry.
    pub fn remove(&mut self, cell: &CellKey) -> bool {
        let Some(changes) = self.entries.get_mut(&cell.record) else {
            return false;
        };
        let removed = changes.remove(&cell.column).is_some();
        if changes.is_empty() {
            self.entries.remove(&cell.record);
        }
        removed
    }

    pub fn get(&self, cell: &CellKey) -> Option<&str> {
        self.entries
            .get(&cell.record)
            .and_then(|changes| changes.get(&cell.column))
            .map(String::as_str)
    }

    pub fn record(&self, id: &RecordId) -> Option<&RecordChanges> {
        self.entries.get(id)
    }

    pub fn remove_record(&mut self, id: &RecordId) -> Option<RecordChanges> {
        self.entries.remove(id)
    }

    /// Clear entries that still hold exactly the values in `sent`.
    ///
    /// Cells edited again after `sent` was captured keep their newer value.
    pub fn clear_sent(&mut self, id: &RecordId, sent: &RecordChanges) {
        let Some(changes) = self.entries.get_mut(id) else {
            return;
        };
        changes.retain(|column, value| sent.get(column) != Some(value));
        if changes.is_empty() {
            self.entries.remove(id);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RecordId, &RecordChanges)> {
        self.entries.iter()
    }

    /// Number of records with pending changes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Number of pending cells across all records.
    pub fn cell_count(&self) -> usize {
        self.entries.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_revert_leaves_no_entry() {
        let mut pending = PendingChanges::new();
        let cell = CellKey::new("1", "title");

        assert!(pending.set(&cell, "New", "Old"));
        assert_eq!(pending.get(&cell), Some("New"));
        assert_eq!(pending.len(), 1);

        assert!(pending.set(&cell, "Old", "Old"));
        assert!(pending.is_empty());
        assert!(pending.record(&"1".into()).is_none());
    }

    #[test]
    fn test_same_value_twice_is_not_a_change() {
        let mut pending = PendingChanges::new();
        let cell = CellKey::new("1", "title");

        assert!(pending.set(&cell, "New", "Old"));
        assert!(!pending.set(&cell, "New", "Old"));
        assert!(!pending.set(&CellKey::new("2", "title"), "Same", "Same"));
    }

    #[test]
    fn test_counts() {
        let mut pending = PendingChanges::new();
        pending.set(&CellKey::new("1", "title"), "a", "");
        pending.set(&CellKey::new("1", "steps"), "b", "");
        pending.set(&CellKey::new("2", "title"), "c", "");

        assert_eq!(pending.len(), 2);
        assert_eq!(pending.cell_count(), 3);
    }

    #[test]
    fn test_clear_sent_keeps_newer_edits() {
        let mut pending = PendingChanges::new();
        pending.set(&CellKey::new("1", "title"), "a", "");
        pending.set(&CellKey::new("1", "steps"), "b", "");
        let sent = pending.record(&"1".into()).unwrap().clone();

        // Edited again while the save was in flight
        pending.set(&CellKey::new("1", "steps"), "b2", "");
        pending.clear_sent(&"1".into(), &sent);

        assert_eq!(pending.get(&CellKey::new("1", "title")), None);
        assert_eq!(pending.get(&CellKey::new("1", "steps")), Some("b2"));

        let sent = pending.record(&"1".into()).unwrap().clone();
        pending.clear_sent(&"1".into(), &sent);
        assert!(pending.is_empty());
    }
}
