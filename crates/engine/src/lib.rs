pub mod cache;
pub mod clipboard;
pub mod dataset;
pub mod error;
pub mod grid;
pub mod history;
pub mod notice;
pub mod pending;
pub mod save;
pub mod schema;
pub mod selection;
pub mod validation;

pub use error::{EditError, SaveError, SchemaError};
pub use grid::{BulkEditGrid, GridOptions};
pub use save::{RecordOutcome, RecordStore, SaveBatch, SaveReport};
pub use schema::{FieldKind, FieldSpec, Schema};
