use std::fmt;

use casegrid_core::{ColumnKey, RecordId};

/// Rejected edit, copy or paste. Nothing was written when one of these is returned.
#[derive(Debug, Clone, PartialEq)]
pub enum EditError {
    /// Record is not part of the loaded dataset.
    UnknownRecord(RecordId),
    /// Column is not part of the schema.
    UnknownColumn(ColumnKey),
    /// Column is read-only in bulk edit.
    NotEditable(ColumnKey),
    /// Value failed the column's validation rule.
    Invalid { column: ColumnKey, reason: String },
    /// Operation needs a selection.
    NothingSelected,
    /// Paste with nothing copied.
    ClipboardEmpty,
    /// Multi-cell copy spanning more than one column.
    MixedColumns,
    /// Paste target column does not accept values from the copied column.
    ColumnMismatch { from: ColumnKey, to: ColumnKey },
    /// Multi-value paste into a selection of a different size.
    ShapeMismatch { expected: usize, actual: usize },
}

impl fmt::Display for EditError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownRecord(id) => write!(f, "unknown record: {id}"),
            Self::UnknownColumn(col) => write!(f, "unknown column: {col}"),
            Self::NotEditable(col) => write!(f, "column '{col}' cannot be bulk edited"),
            Self::Invalid { column, reason } => write!(f, "invalid value for '{column}': {reason}"),
            Self::NothingSelected => write!(f, "no cells selected"),
            Self::ClipboardEmpty => write!(f, "nothing to paste"),
            Self::MixedColumns => write!(f, "copy a single column at a time"),
            Self::ColumnMismatch { from, to } => {
                write!(f, "cannot paste values copied from '{from}' into '{to}'")
            }
            Self::ShapeMismatch { expected, actual } => {
                write!(f, "copied {expected} cell(s) but {actual} cell(s) are selected")
            }
        }
    }
}

impl std::error::Error for EditError {}

/// Save could not start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveError {
    /// A save batch is already in flight.
    InProgress,
    /// No pending changes.
    NothingToSave,
}

impl fmt::Display for SaveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InProgress => write!(f, "a save is already in progress"),
            Self::NothingToSave => write!(f, "no changes to save"),
        }
    }
}

impl std::error::Error for SaveError {}

/// Field schema could not be loaded.
#[derive(Debug)]
pub enum SchemaError {
    /// TOML parse / deserialization error.
    Parse(String),
    /// Schema validation error (duplicate key, empty list, etc.).
    Validation(String),
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(msg) => write!(f, "schema parse error: {msg}"),
            Self::Validation(msg) => write!(f, "schema validation error: {msg}"),
        }
    }
}

impl std::error::Error for SchemaError {}
