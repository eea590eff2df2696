//! Bulk-edit grid: the single owner of records, pending edits, selection,
//! clipboard, undo history and the save guard.
//!
//! The visible value of a cell is its pending text when there is one,
//! otherwise the text of the last-known server snapshot.

use std::time::Duration;

use casegrid_core::{CellKey, ColumnKey, RecordId};
use serde_json::{Map, Value};

use crate::cache::{RecordCache, DEFAULT_TTL};
use crate::clipboard::{check_value, Clipboard};
use crate::dataset::{value_text, Dataset, Record};
use crate::error::{EditError, SaveError};
use crate::history::{CellChange, History};
use crate::notice::Notice;
use crate::pending::{PendingChanges, RecordChanges};
use crate::save::{RecordOutcome, RecordStore, SaveBatch, SaveEntry, SaveReport};
use crate::schema::Schema;
use crate::selection::Selection;

/// Tunables of a grid instance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridOptions {
    pub undo_limit: usize,
    pub cache_ttl: Duration,
}

impl Default for GridOptions {
    fn default() -> Self {
        Self {
            undo_limit: 100,
            cache_ttl: DEFAULT_TTL,
        }
    }
}

#[derive(Debug)]
pub struct BulkEditGrid {
    schema: Schema,
    data: Dataset,
    pending: PendingChanges,
    selection: Selection,
    clipboard: Option<Clipboard>,
    history: History,
    cache: RecordCache,
    notices: Vec<Notice>,
    saving: bool,
}

impl BulkEditGrid {
    pub fn new(schema: Schema) -> Self {
        Self::with_options(schema, GridOptions::default())
    }

    pub fn with_options(schema: Schema, options: GridOptions) -> Self {
        Self {
            schema,
            data: Dataset::default(),
            pending: PendingChanges::new(),
            selection: Selection::new(),
            clipboard: None,
            history: History::with_limit(options.undo_limit),
            cache: RecordCache::new(options.cache_ttl),
            notices: Vec::new(),
            saving: false,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn dataset(&self) -> &Dataset {
        &self.data
    }

    pub fn pending(&self) -> &PendingChanges {
        &self.pending
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn clipboard(&self) -> Option<&Clipboard> {
        self.clipboard.as_ref()
    }

    pub fn cache(&mut self) -> &mut RecordCache {
        &mut self.cache
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn is_saving(&self) -> bool {
        self.saving
    }

    /// Drain queued notices, oldest first.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    // =========================================================================
    // Loading
    // =========================================================================

    /// Full reload from server JSON. Objects without a usable id are skipped.
    ///
    /// Pending changes, selection, drag and history are reset. The clipboard
    /// and an in-flight save guard survive.
    pub fn load_records(&mut self, records: Vec<Value>) -> usize {
        let total = records.len();
        let parsed: Vec<Record> = records
            .into_iter()
            .filter_map(|value| Record::from_json(value, &self.schema.id_field))
            .collect();
        if parsed.len() < total {
            log::warn!(
                "skipped {} record(s) without a '{}' field",
                total - parsed.len(),
                self.schema.id_field
            );
        }

        self.data = Dataset::new(parsed);
        self.pending.clear();
        self.selection.clear();
        self.history.clear();

        for record in self.data.records() {
            if let Some(key) = display_key_of(&self.schema, &record.fields) {
                self.cache.insert(key, record.fields.clone());
            }
        }

        log::debug!("loaded {} record(s)", self.data.len());
        self.data.len()
    }

    /// Replace the rendered row order (filter or sort). Allowed mid-drag.
    pub fn set_view_order(&mut self, order: Vec<RecordId>) {
        self.data.set_view_order(order);
    }

    /// Visible text of a cell, `None` for unknown records.
    pub fn cell_text(&self, cell: &CellKey) -> Option<String> {
        if let Some(pending) = self.pending.get(cell) {
            return Some(pending.to_string());
        }
        self.data.get(&cell.record).map(|r| r.text(&cell.column))
    }

    pub fn is_dirty(&self, cell: &CellKey) -> bool {
        self.pending.get(cell).is_some()
    }

    // =========================================================================
    // Selection
    // =========================================================================

    pub fn click(&mut self, cell: &CellKey) -> bool {
        self.selection.click(&self.schema, &self.data, cell)
    }

    pub fn shift_click(&mut self, cell: &CellKey) -> bool {
        self.selection.shift_click(&self.schema, &self.data, cell)
    }

    pub fn ctrl_click(&mut self, cell: &CellKey) -> bool {
        self.selection.ctrl_click(&self.schema, &self.data, cell)
    }

    pub fn select_column(&mut self, column: &ColumnKey) -> bool {
        self.selection.select_column(&self.schema, &self.data, column)
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn begin_drag(&mut self, cell: &CellKey) -> bool {
        self.selection.begin_drag(&self.schema, &self.data, cell)
    }

    pub fn update_drag(&mut self, pointer: &CellKey) -> bool {
        self.selection.update_drag(&self.schema, &self.data, pointer)
    }

    pub fn end_drag(&mut self) -> bool {
        self.selection.end_drag()
    }

    pub fn is_selected(&self, cell: &CellKey) -> bool {
        self.selection.is_selected(cell)
    }

    pub fn is_selecting(&self, cell: &CellKey) -> bool {
        self.selection.is_selecting(cell)
    }

    /// Selected rendered cells, top to bottom, left to right.
    pub fn selected_cells(&self) -> Vec<CellKey> {
        self.selection.ordered_cells(&self.schema, &self.data)
    }

    // =========================================================================
    // Change Tracking
    // =========================================================================

    /// Stage `value` for a cell without validation or history.
    ///
    /// The entry is dropped when `value` equals the server snapshot.
    /// Returns whether the pending state changed.
    pub fn record_change(&mut self, cell: &CellKey, value: &str) -> Result<bool, EditError> {
        let record = self
            .data
            .get(&cell.record)
            .ok_or_else(|| EditError::UnknownRecord(cell.record.clone()))?;
        if !self.schema.is_editable(&cell.column) {
            return Err(match self.schema.field(&cell.column) {
                Some(_) => EditError::NotEditable(cell.column.clone()),
                None => EditError::UnknownColumn(cell.column.clone()),
            });
        }
        let baseline = record.text(&cell.column);
        Ok(self.pending.set(cell, value, &baseline))
    }

    /// Validated single-cell edit, one undo group.
    pub fn set_cell(&mut self, cell: &CellKey, value: &str) -> Result<bool, EditError> {
        let checked = self
            .ensure_record(cell)
            .and_then(|_| check_value(&self.schema, cell, value));
        let value = match checked {
            Ok(value) => value,
            Err(e) => return Err(self.reject(e)),
        };
        let changed = self.apply(format!("Edit {cell}"), vec![(cell.clone(), value)]);
        Ok(changed > 0)
    }

    /// Write one value to every selected cell. Atomic, one undo group.
    pub fn batch_assign(&mut self, value: &str) -> Result<usize, EditError> {
        let targets = self.selected_cells();
        if targets.is_empty() {
            return Err(self.reject(EditError::NothingSelected));
        }
        let checked: Result<Vec<(CellKey, String)>, EditError> = targets
            .into_iter()
            .map(|cell| {
                let value = check_value(&self.schema, &cell, value)?;
                Ok((cell, value))
            })
            .collect();
        let assignments = match checked {
            Ok(assignments) => assignments,
            Err(e) => return Err(self.reject(e)),
        };

        let changed = self.apply("Fill", assignments);
        self.notices.push(Notice::success(format!("Updated {changed} cell(s)")));
        Ok(changed)
    }

    /// JSON body for a record's update request.
    ///
    /// Columns that are not serializable are dropped; values are converted
    /// by their column kind.
    pub fn build_update_payload(&self, id: &RecordId) -> Map<String, Value> {
        let mut payload = Map::new();
        let Some(changes) = self.pending.record(id) else {
            return payload;
        };
        for (column, text) in changes {
            match self.schema.field(column) {
                Some(field) if field.serializable => match field.kind.to_json(text) {
                    Some(value) => {
                        payload.insert(column.as_str().to_string(), value);
                    }
                    None => log::warn!(
                        "dropping '{}' from payload for {}: {:?} is not a valid {:?} value",
                        column,
                        id,
                        text,
                        field.kind
                    ),
                },
                _ => log::debug!("dropping non-serializable field '{}' from payload", column),
            }
        }
        payload
    }

    /// Payload of every record with pending changes, in save order.
    pub fn pending_payloads(&self) -> Vec<(RecordId, Map<String, Value>)> {
        self.pending
            .iter()
            .map(|(id, _)| (id.clone(), self.build_update_payload(id)))
            .collect()
    }

    // =========================================================================
    // Clipboard
    // =========================================================================

    /// Copy the selection. Returns the number of copied cells.
    pub fn copy(&mut self) -> Result<usize, EditError> {
        let cells = self.selected_cells();
        let copied = Clipboard::copy_cells(&cells, |cell| {
            self.cell_text(cell).unwrap_or_default()
        });
        match copied {
            Ok(clipboard) => {
                let count = clipboard.len();
                self.clipboard = Some(clipboard);
                self.notices.push(Notice::info(format!("Copied {count} cell(s)")));
                Ok(count)
            }
            Err(e) => Err(self.reject(e)),
        }
    }

    /// Paste into the selection. Nothing is written unless every target is valid.
    pub fn paste(&mut self) -> Result<usize, EditError> {
        let targets = self.selected_cells();
        let planned = match &self.clipboard {
            Some(clipboard) => clipboard.plan_paste(&self.schema, &targets),
            None => Err(EditError::ClipboardEmpty),
        };
        match planned {
            Ok(assignments) => {
                let changed = self.apply("Paste", assignments);
                self.notices.push(Notice::success(format!("Pasted into {changed} cell(s)")));
                Ok(changed)
            }
            Err(e) => Err(self.reject(e)),
        }
    }

    // =========================================================================
    // Undo / Redo
    // =========================================================================

    pub fn undo(&mut self) -> bool {
        let Some(entry) = self.history.undo() else {
            return false;
        };
        log::debug!("undo: {}", entry.description);
        for change in entry.changes.iter().rev() {
            self.write(&change.cell, &change.old_value);
        }
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(entry) = self.history.redo() else {
            return false;
        };
        log::debug!("redo: {}", entry.description);
        for change in &entry.changes {
            self.write(&change.cell, &change.new_value);
        }
        true
    }

    // =========================================================================
    // Save
    // =========================================================================

    /// Start a save: take the in-flight guard and snapshot the payloads.
    pub fn begin_save(&mut self) -> Result<SaveBatch, SaveError> {
        if self.saving {
            self.notices.push(Notice::info(SaveError::InProgress.to_string()));
            return Err(SaveError::InProgress);
        }
        if self.pending.is_empty() {
            self.notices.push(Notice::warning("No changes to save"));
            return Err(SaveError::NothingToSave);
        }

        let entries: Vec<SaveEntry> = self
            .pending
            .iter()
            .map(|(id, changes)| SaveEntry {
                id: id.clone(),
                payload: self.build_update_payload(id),
                sent: changes.clone(),
            })
            .collect();

        self.saving = true;
        log::debug!("save started for {} record(s)", entries.len());
        Ok(SaveBatch { entries })
    }

    /// Release the guard and reconcile each record's outcome.
    pub fn finish_save(&mut self, outcomes: Vec<RecordOutcome>) -> SaveReport {
        self.saving = false;
        let mut report = SaveReport::default();

        for outcome in outcomes {
            match outcome.result {
                Ok(server) => {
                    self.reconcile(&outcome.id, server, &outcome.sent);
                    report.succeeded.push(outcome.id);
                }
                Err(message) => {
                    report.failed.insert(outcome.id, message);
                }
            }
        }

        if !report.succeeded.is_empty() {
            self.history.clear();
        }

        log::info!(
            "save finished: {} succeeded, {} failed",
            report.success_count(),
            report.failure_count()
        );
        let notice = if report.all_succeeded() {
            Notice::success(report.to_string())
        } else if report.is_partial() {
            Notice::warning(report.to_string())
        } else {
            Notice::error(report.to_string())
        };
        self.notices.push(notice);
        report
    }

    /// Release the guard without reconciling (the executing task was abandoned).
    pub fn abort_save(&mut self) {
        if self.saving {
            log::warn!("save aborted, pending changes kept");
        }
        self.saving = false;
    }

    /// Run a whole save against `store` on the current thread.
    pub fn save<S: RecordStore>(&mut self, store: &S) -> Result<SaveReport, SaveError> {
        let batch = self.begin_save()?;
        let outcomes = batch.execute(store);
        Ok(self.finish_save(outcomes))
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn ensure_record(&self, cell: &CellKey) -> Result<(), EditError> {
        if self.data.contains(&cell.record) {
            Ok(())
        } else {
            Err(EditError::UnknownRecord(cell.record.clone()))
        }
    }

    fn reject(&mut self, error: EditError) -> EditError {
        self.notices.push(Notice::error(error.to_string()));
        error
    }

    /// Write assignments and record one undo group. Returns changed cell count.
    fn apply(&mut self, description: impl Into<String>, assignments: Vec<(CellKey, String)>) -> usize {
        let mut changes = Vec::with_capacity(assignments.len());
        for (cell, value) in assignments {
            let old_value = self.cell_text(&cell).unwrap_or_default();
            if old_value == value {
                continue;
            }
            self.write(&cell, &value);
            changes.push(CellChange {
                cell,
                old_value,
                new_value: value,
            });
        }
        let count = changes.len();
        self.history.record_batch(description, changes);
        count
    }

    /// Stage a value against the snapshot, ignoring cells of unloaded records.
    fn write(&mut self, cell: &CellKey, value: &str) {
        if let Some(record) = self.data.get(&cell.record) {
            let baseline = record.text(&cell.column);
            self.pending.set(cell, value, &baseline);
        }
    }

    fn reconcile(&mut self, id: &RecordId, server: Map<String, Value>, sent: &RecordChanges) {
        if let Some(key) = display_key_of(&self.schema, &server) {
            self.cache.update_if_present(&key, server.clone());
        }
        if !self.data.replace_fields(id, server) {
            log::debug!("saved record {} is no longer loaded", id);
            return;
        }

        self.pending.clear_sent(id, sent);

        // Edits made while the request was in flight stay pending unless the
        // new snapshot already holds them.
        let remaining: Vec<(ColumnKey, String)> = self
            .pending
            .record(id)
            .map(|changes| changes.iter().map(|(c, v)| (c.clone(), v.clone())).collect())
            .unwrap_or_default();
        for (column, value) in remaining {
            self.write(&CellKey::new(id.clone(), column), &value);
        }
    }
}

fn display_key_of(schema: &Schema, fields: &Map<String, Value>) -> Option<String> {
    let key = schema.display_key.as_deref()?;
    let text = value_text(fields.get(key)?);
    (!text.is_empty()).then_some(text)
}
