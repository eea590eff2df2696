pub mod cell_key;
pub mod range;

pub use cell_key::{CellKey, ColumnKey, RecordId};
pub use range::CellRange;
