//! Edit scripts: grid interactions replayed headlessly.
//!
//! A script is a JSON array of ops, or JSONL with one op per line:
//!
//! ```text
//! {"op": "drag", "from": {"record": 1, "column": "priority"}, "to": {"record": 3, "column": "priority"}}
//! {"op": "fill", "value": "Low"}
//! ```
//!
//! Selection ops that hit a read-only or hidden cell are ignored the same
//! way the grid ignores such clicks. Edit ops that the grid rejects stop the
//! replay.

use std::fmt;

use casegrid_core::{CellKey, RecordId};
use casegrid_engine::{BulkEditGrid, EditError};
use serde::Deserialize;

/// Record id as written in a script: number or string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RecordRef {
    Number(i64),
    Text(String),
}

impl From<&RecordRef> for RecordId {
    fn from(r: &RecordRef) -> Self {
        match r {
            RecordRef::Number(n) => RecordId::from(*n),
            RecordRef::Text(s) => RecordId::from(s.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CellRef {
    pub record: RecordRef,
    pub column: String,
}

impl CellRef {
    fn key(&self) -> CellKey {
        CellKey::new(RecordId::from(&self.record), self.column.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ScriptOp {
    Click { record: RecordRef, column: String },
    ShiftClick { record: RecordRef, column: String },
    CtrlClick { record: RecordRef, column: String },
    SelectColumn { column: String },
    ClearSelection,
    /// Mouse down on `from`, move over each `through` cell, release on `to`.
    Drag {
        from: CellRef,
        #[serde(default)]
        through: Vec<CellRef>,
        to: CellRef,
    },
    /// Re-render rows in a new order (filter or sort).
    ViewOrder { records: Vec<RecordRef> },
    Set { record: RecordRef, column: String, value: String },
    Fill { value: String },
    Copy,
    Paste,
    Undo,
    Redo,
}

impl ScriptOp {
    pub fn name(&self) -> &'static str {
        match self {
            ScriptOp::Click { .. } => "click",
            ScriptOp::ShiftClick { .. } => "shift_click",
            ScriptOp::CtrlClick { .. } => "ctrl_click",
            ScriptOp::SelectColumn { .. } => "select_column",
            ScriptOp::ClearSelection => "clear_selection",
            ScriptOp::Drag { .. } => "drag",
            ScriptOp::ViewOrder { .. } => "view_order",
            ScriptOp::Set { .. } => "set",
            ScriptOp::Fill { .. } => "fill",
            ScriptOp::Copy => "copy",
            ScriptOp::Paste => "paste",
            ScriptOp::Undo => "undo",
            ScriptOp::Redo => "redo",
        }
    }
}

/// Parse a script: JSON array or JSONL.
pub fn parse_script(text: &str) -> Result<Vec<ScriptOp>, String> {
    if text.trim_start().starts_with('[') {
        return serde_json::from_str(text).map_err(|e| format!("invalid script: {}", e));
    }
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line).map_err(|e| format!("line {}: {}", i + 1, e))
        })
        .collect()
}

/// An op the grid rejected.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptError {
    /// 1-based position in the script.
    pub index: usize,
    pub op: &'static str,
    pub error: EditError,
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "op {} ({}): {}", self.index, self.op, self.error)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub applied: usize,
    /// Ops that had no effect (read-only target, nothing to undo, ...).
    pub ignored: usize,
}

/// Replay `ops` against `grid`, stopping at the first rejected edit.
pub fn replay(grid: &mut BulkEditGrid, ops: &[ScriptOp]) -> Result<ReplaySummary, ScriptError> {
    let mut summary = ReplaySummary::default();

    for (i, op) in ops.iter().enumerate() {
        let effective = apply_op(grid, op).map_err(|error| ScriptError {
            index: i + 1,
            op: op.name(),
            error,
        })?;
        if effective {
            summary.applied += 1;
        } else {
            log::warn!("op {} ({}) had no effect", i + 1, op.name());
            summary.ignored += 1;
        }
    }

    Ok(summary)
}

fn apply_op(grid: &mut BulkEditGrid, op: &ScriptOp) -> Result<bool, EditError> {
    let cell = |record: &RecordRef, column: &str| CellKey::new(RecordId::from(record), column);

    let effective = match op {
        ScriptOp::Click { record, column } => grid.click(&cell(record, column)),
        ScriptOp::ShiftClick { record, column } => grid.shift_click(&cell(record, column)),
        ScriptOp::CtrlClick { record, column } => grid.ctrl_click(&cell(record, column)),
        ScriptOp::SelectColumn { column } => grid.select_column(&column.as_str().into()),
        ScriptOp::ClearSelection => {
            grid.clear_selection();
            true
        }
        ScriptOp::Drag { from, through, to } => {
            if !grid.begin_drag(&from.key()) {
                return Ok(false);
            }
            for pointer in through.iter().chain(std::iter::once(to)) {
                grid.update_drag(&pointer.key());
            }
            grid.end_drag()
        }
        ScriptOp::ViewOrder { records } => {
            grid.set_view_order(records.iter().map(RecordId::from).collect());
            true
        }
        ScriptOp::Set { record, column, value } => grid.set_cell(&cell(record, column), value)?,
        ScriptOp::Fill { value } => grid.batch_assign(value)? > 0,
        ScriptOp::Copy => grid.copy()? > 0,
        ScriptOp::Paste => grid.paste()? > 0,
        ScriptOp::Undo => grid.undo(),
        ScriptOp::Redo => grid.redo(),
    };
    Ok(effective)
}
