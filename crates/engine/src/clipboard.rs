//! Internal clipboard: one slot, overwritten by every copy.
//!
//! Pasting never writes directly. `Clipboard::plan_paste` resolves and
//! validates every target first and returns the full assignment list, so a
//! rejected paste leaves the grid untouched.

use casegrid_core::{CellKey, ColumnKey};

use crate::error::EditError;
use crate::schema::Schema;
use crate::validation::ValidationResult;

#[derive(Debug, Clone, PartialEq)]
pub enum Clipboard {
    /// One copied cell. Broadcast to every target on paste.
    Single { column: ColumnKey, content: String },
    /// Several cells of one column, in rendered row order.
    Column { column: ColumnKey, values: Vec<String> },
}

impl Clipboard {
    /// Build clipboard contents from `cells` (already in view order).
    pub fn copy_cells<F>(cells: &[CellKey], text: F) -> Result<Self, EditError>
    where
        F: Fn(&CellKey) -> String,
    {
        let Some(first) = cells.first() else {
            return Err(EditError::NothingSelected);
        };

        if cells.len() == 1 {
            return Ok(Clipboard::Single {
                column: first.column.clone(),
                content: text(first),
            });
        }

        if cells.iter().any(|cell| cell.column != first.column) {
            return Err(EditError::MixedColumns);
        }

        Ok(Clipboard::Column {
            column: first.column.clone(),
            values: cells.iter().map(&text).collect(),
        })
    }

    pub fn column(&self) -> &ColumnKey {
        match self {
            Clipboard::Single { column, .. } | Clipboard::Column { column, .. } => column,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Clipboard::Single { .. } => 1,
            Clipboard::Column { values, .. } => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolve the value each target receives, validating all of them.
    ///
    /// `targets` must be in view order. Fails on the first rejected target.
    pub fn plan_paste(
        &self,
        schema: &Schema,
        targets: &[CellKey],
    ) -> Result<Vec<(CellKey, String)>, EditError> {
        if targets.is_empty() {
            return Err(EditError::NothingSelected);
        }

        let assignments: Vec<(CellKey, String)> = match self {
            Clipboard::Single { column, content } => {
                for target in targets {
                    let field = schema
                        .field(&target.column)
                        .ok_or_else(|| EditError::UnknownColumn(target.column.clone()))?;
                    if &target.column != column && !field.accepts_broadcast {
                        return Err(EditError::ColumnMismatch {
                            from: column.clone(),
                            to: target.column.clone(),
                        });
                    }
                }
                targets
                    .iter()
                    .map(|target| (target.clone(), content.clone()))
                    .collect()
            }
            Clipboard::Column { column, values } => {
                if let Some(other) = targets.iter().find(|t| &t.column != column) {
                    return Err(EditError::ColumnMismatch {
                        from: column.clone(),
                        to: other.column.clone(),
                    });
                }
                if targets.len() != values.len() {
                    return Err(EditError::ShapeMismatch {
                        expected: values.len(),
                        actual: targets.len(),
                    });
                }
                targets.iter().cloned().zip(values.iter().cloned()).collect()
            }
        };

        assignments
            .into_iter()
            .map(|(cell, value)| {
                let value = check_value(schema, &cell, &value)?;
                Ok((cell, value))
            })
            .collect()
    }
}

/// Editable and valid for its column. Returns the value to stage.
pub(crate) fn check_value(schema: &Schema, cell: &CellKey, value: &str) -> Result<String, EditError> {
    let field = schema
        .field(&cell.column)
        .ok_or_else(|| EditError::UnknownColumn(cell.column.clone()))?;
    if !field.editable {
        return Err(EditError::NotEditable(cell.column.clone()));
    }
    match field.validate(value) {
        ValidationResult::Valid => Ok(field.normalize(value)),
        ValidationResult::Invalid { reason } => Err(EditError::Invalid {
            column: cell.column.clone(),
            reason,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(record: &str, column: &str) -> CellKey {
        CellKey::new(record, column)
    }

    fn text_of(cell: &CellKey) -> String {
        format!("{}-{}", cell.column, cell.record)
    }

    #[test]
    fn test_copy_single_and_column() {
        let single = Clipboard::copy_cells(&[cell("1", "title")], text_of).unwrap();
        assert_eq!(
            single,
            Clipboard::Single { column: "title".into(), content: "title-1".into() }
        );

        let column =
            Clipboard::copy_cells(&[cell("2", "steps"), cell("1", "steps")], text_of).unwrap();
        assert_eq!(
            column,
            Clipboard::Column {
                column: "steps".into(),
                values: vec!["steps-2".into(), "steps-1".into()],
            }
        );
        assert_eq!(column.len(), 2);
    }

    #[test]
    fn test_copy_rejects_empty_and_mixed() {
        assert_eq!(Clipboard::copy_cells(&[], text_of), Err(EditError::NothingSelected));
        assert_eq!(
            Clipboard::copy_cells(&[cell("1", "title"), cell("1", "steps")], text_of),
            Err(EditError::MixedColumns)
        );
    }

    #[test]
    fn test_single_broadcast_across_columns() {
        let schema = Schema::test_cases();
        let clip = Clipboard::Single { column: "title".into(), content: "Shared".into() };

        let plan = clip
            .plan_paste(&schema, &[cell("1", "steps"), cell("2", "precondition")])
            .unwrap();
        assert_eq!(plan.len(), 2);
        assert!(plan.iter().all(|(_, v)| v == "Shared"));
    }

    #[test]
    fn test_single_into_enum_from_other_column_is_rejected() {
        let schema = Schema::test_cases();
        let clip = Clipboard::Single { column: "title".into(), content: "High".into() };

        let err = clip.plan_paste(&schema, &[cell("1", "priority")]).unwrap_err();
        assert_eq!(
            err,
            EditError::ColumnMismatch { from: "title".into(), to: "priority".into() }
        );
    }

    #[test]
    fn test_single_into_same_enum_column_is_validated() {
        let schema = Schema::test_cases();
        let ok = Clipboard::Single { column: "priority".into(), content: "Low".into() };
        assert!(ok.plan_paste(&schema, &[cell("1", "priority"), cell("2", "priority")]).is_ok());

        let bad = Clipboard::Single { column: "priority".into(), content: "Urgent".into() };
        assert!(matches!(
            bad.plan_paste(&schema, &[cell("1", "priority")]),
            Err(EditError::Invalid { .. })
        ));
    }

    #[test]
    fn test_column_paste_requires_same_column_and_count() {
        let schema = Schema::test_cases();
        let clip = Clipboard::Column {
            column: "steps".into(),
            values: vec!["a".into(), "b".into()],
        };

        let plan = clip.plan_paste(&schema, &[cell("5", "steps"), cell("6", "steps")]).unwrap();
        assert_eq!(plan[0], (cell("5", "steps"), "a".to_string()));
        assert_eq!(plan[1], (cell("6", "steps"), "b".to_string()));

        assert_eq!(
            clip.plan_paste(&schema, &[cell("5", "steps")]),
            Err(EditError::ShapeMismatch { expected: 2, actual: 1 })
        );
        assert!(matches!(
            clip.plan_paste(&schema, &[cell("5", "title"), cell("6", "title")]),
            Err(EditError::ColumnMismatch { .. })
        ));
    }

    #[test]
    fn test_paste_into_read_only_is_rejected() {
        let schema = Schema::test_cases();
        let clip = Clipboard::Single { column: "tcg".into(), content: "x".into() };
        assert_eq!(
            clip.plan_paste(&schema, &[cell("1", "tcg")]),
            Err(EditError::NotEditable("tcg".into()))
        );
    }
}
