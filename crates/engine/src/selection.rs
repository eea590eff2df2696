//! Cell selection: click, shift-click range, ctrl-click toggle, and
//! click-and-drag rectangles.
//!
//! Drag selection is an explicit state machine:
//!
//! ```text
//! Idle --begin_drag--> Dragging { moved: false }
//! Dragging --update_drag (different editable cell)--> Dragging { moved: true }
//! Dragging --end_drag--> Idle
//! ```
//!
//! Row and column positions are resolved against the live view on every
//! call. Nothing is cached between pointer moves, so a re-render in the
//! middle of a drag (filter, sort, reload of the view) cannot leave stale
//! indices behind.

use std::collections::HashSet;

use casegrid_core::{CellKey, CellRange, ColumnKey};

use crate::dataset::Dataset;
use crate::schema::Schema;

#[derive(Debug, Clone, Default, PartialEq)]
pub enum DragState {
    #[default]
    Idle,
    Dragging {
        anchor: CellKey,
        /// Pointer has reached a different editable cell at least once.
        moved: bool,
        /// Transient highlight, promoted to the selection on release.
        selecting: HashSet<CellKey>,
    },
}

#[derive(Debug, Clone, Default)]
pub struct Selection {
    selected: HashSet<CellKey>,
    /// Last clicked cell, origin of shift-click ranges.
    anchor: Option<CellKey>,
    drag: DragState,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> &HashSet<CellKey> {
        &self.selected
    }

    pub fn is_selected(&self, cell: &CellKey) -> bool {
        self.selected.contains(cell)
    }

    pub fn is_selecting(&self, cell: &CellKey) -> bool {
        match &self.drag {
            DragState::Dragging { selecting, .. } => selecting.contains(cell),
            DragState::Idle => false,
        }
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.drag, DragState::Dragging { .. })
    }

    pub fn drag_state(&self) -> &DragState {
        &self.drag
    }

    pub fn anchor(&self) -> Option<&CellKey> {
        self.anchor.as_ref()
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    // =========================================================================
    // Click Selection
    // =========================================================================

    /// Select exactly `cell`. Ignored for cells that are not editable or not rendered.
    pub fn click(&mut self, schema: &Schema, data: &Dataset, cell: &CellKey) -> bool {
        if !is_editable_cell(schema, data, cell) {
            return false;
        }
        self.selected.clear();
        self.selected.insert(cell.clone());
        self.anchor = Some(cell.clone());
        true
    }

    /// Replace the selection with the rectangle from the anchor to `cell`.
    pub fn shift_click(&mut self, schema: &Schema, data: &Dataset, cell: &CellKey) -> bool {
        if !is_editable_cell(schema, data, cell) {
            return false;
        }
        let Some(anchor) = self.anchor.clone() else {
            return self.click(schema, data, cell);
        };
        match rectangle(schema, data, &anchor, cell) {
            Some(cells) => {
                self.selected = cells;
                true
            }
            // Anchor scrolled out of the view: start over from this cell
            None => self.click(schema, data, cell),
        }
    }

    /// Toggle one cell in or out of the selection.
    pub fn ctrl_click(&mut self, schema: &Schema, data: &Dataset, cell: &CellKey) -> bool {
        if !is_editable_cell(schema, data, cell) {
            return false;
        }
        if !self.selected.remove(cell) {
            self.selected.insert(cell.clone());
        }
        self.anchor = Some(cell.clone());
        true
    }

    /// Select every rendered cell of an editable column.
    pub fn select_column(&mut self, schema: &Schema, data: &Dataset, column: &ColumnKey) -> bool {
        if !schema.is_editable(column) {
            return false;
        }
        self.selected = data
            .view_order()
            .iter()
            .map(|record| CellKey::new(record.clone(), column.clone()))
            .collect();
        self.anchor = data
            .view_order()
            .first()
            .map(|record| CellKey::new(record.clone(), column.clone()));
        true
    }

    pub fn clear(&mut self) {
        self.selected.clear();
        self.anchor = None;
        self.drag = DragState::Idle;
    }

    // =========================================================================
    // Drag Selection
    // =========================================================================

    /// Mouse down over an editable cell. No visible change yet.
    pub fn begin_drag(&mut self, schema: &Schema, data: &Dataset, cell: &CellKey) -> bool {
        if !is_editable_cell(schema, data, cell) {
            return false;
        }
        log::debug!("drag start at {}", cell);
        self.drag = DragState::Dragging {
            anchor: cell.clone(),
            moved: false,
            selecting: HashSet::new(),
        };
        true
    }

    /// Pointer moved over `pointer`. Returns true if the highlight changed.
    pub fn update_drag(&mut self, schema: &Schema, data: &Dataset, pointer: &CellKey) -> bool {
        let DragState::Dragging { anchor, moved, selecting } = &mut self.drag else {
            return false;
        };
        if !is_editable_cell(schema, data, pointer) {
            return false;
        }
        if !*moved && pointer == anchor {
            return false;
        }

        let Some(cells) = rectangle(schema, data, anchor, pointer) else {
            log::debug!("drag anchor {} no longer rendered, ignoring move", anchor);
            return false;
        };

        if !*moved {
            *moved = true;
            self.selected.clear();
        }

        if *selecting == cells {
            return false;
        }
        *selecting = cells;
        true
    }

    /// Mouse up. Promotes the highlight if a real drag happened and
    /// returns whether it did.
    pub fn end_drag(&mut self) -> bool {
        match std::mem::take(&mut self.drag) {
            DragState::Dragging { anchor, moved: true, selecting } => {
                log::debug!("drag end, {} cell(s) selected", selecting.len());
                self.selected = selecting;
                self.anchor = Some(anchor);
                true
            }
            _ => false,
        }
    }

    // =========================================================================
    // Selection Helpers
    // =========================================================================

    /// Selected, rendered cells ordered top to bottom, then left to right.
    pub fn ordered_cells(&self, schema: &Schema, data: &Dataset) -> Vec<CellKey> {
        let mut positioned: Vec<((usize, usize), CellKey)> = self
            .selected
            .iter()
            .filter_map(|cell| {
                let row = data.row_position(&cell.record)?;
                let col = schema.column_index(&cell.column)?;
                Some(((row, col), cell.clone()))
            })
            .collect();
        positioned.sort_by(|a, b| a.0.cmp(&b.0));
        positioned.into_iter().map(|(_, cell)| cell).collect()
    }
}

/// Editable column and currently rendered row.
pub fn is_editable_cell(schema: &Schema, data: &Dataset, cell: &CellKey) -> bool {
    schema.is_editable(&cell.column) && data.row_position(&cell.record).is_some()
}

/// Resolve a cell to view coordinates against the live view.
fn position(schema: &Schema, data: &Dataset, cell: &CellKey) -> Option<(usize, usize)> {
    Some((data.row_position(&cell.record)?, schema.column_index(&cell.column)?))
}

/// Every editable cell in the rectangle spanned by `a` and `b`.
///
/// `None` if either corner is not rendered. Non-editable columns inside the
/// rectangle are skipped.
pub fn rectangle(
    schema: &Schema,
    data: &Dataset,
    a: &CellKey,
    b: &CellKey,
) -> Option<HashSet<CellKey>> {
    let (row_a, col_a) = position(schema, data, a)?;
    let (row_b, col_b) = position(schema, data, b)?;
    let range = CellRange::new(row_a, col_a, row_b, col_b);

    let mut cells = HashSet::with_capacity(range.cell_count());
    for row in range.rows() {
        let Some(record) = data.row_at(row) else { continue };
        for col in range.cols() {
            let field = &schema.fields[col];
            if field.editable {
                cells.insert(CellKey::new(record.clone(), field.key.clone()));
            }
        }
    }
    Some(cells)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Record;
    use crate::schema::FieldSpec;
    use casegrid_core::RecordId;
    use serde_json::json;

    /// Columns: number (read-only), a, b, tag (read-only), c
    fn fixture() -> (Schema, Dataset) {
        let schema = Schema::new(vec![
            FieldSpec::read_only("number", "#"),
            FieldSpec::text("a", "A"),
            FieldSpec::text("b", "B"),
            FieldSpec::read_only("tag", "Tag"),
            FieldSpec::text("c", "C"),
        ]);
        let records = (1..=5)
            .map(|i| Record::from_json(json!({ "id": i }), "id").unwrap())
            .collect();
        (schema, Dataset::new(records))
    }

    fn cell(record: &str, column: &str) -> CellKey {
        CellKey::new(record, column)
    }

    fn set(cells: &[(&str, &str)]) -> HashSet<CellKey> {
        cells.iter().map(|(r, c)| cell(r, c)).collect()
    }

    #[test]
    fn test_click_selects_one() {
        let (schema, data) = fixture();
        let mut sel = Selection::new();

        assert!(sel.click(&schema, &data, &cell("1", "a")));
        assert!(sel.click(&schema, &data, &cell("2", "b")));
        assert_eq!(sel.selected(), &set(&[("2", "b")]));

        // Read-only cells are ignored
        assert!(!sel.click(&schema, &data, &cell("2", "tag")));
        assert_eq!(sel.len(), 1);
    }

    #[test]
    fn test_shift_click_extends_from_anchor_skipping_read_only() {
        let (schema, data) = fixture();
        let mut sel = Selection::new();

        sel.click(&schema, &data, &cell("1", "b"));
        sel.shift_click(&schema, &data, &cell("2", "c"));

        assert_eq!(
            sel.selected(),
            &set(&[("1", "b"), ("1", "c"), ("2", "b"), ("2", "c")])
        );
        assert_eq!(sel.anchor(), Some(&cell("1", "b")));
    }

    #[test]
    fn test_ctrl_click_toggles() {
        let (schema, data) = fixture();
        let mut sel = Selection::new();

        sel.click(&schema, &data, &cell("1", "a"));
        sel.ctrl_click(&schema, &data, &cell("3", "c"));
        assert_eq!(sel.len(), 2);
        sel.ctrl_click(&schema, &data, &cell("1", "a"));
        assert_eq!(sel.selected(), &set(&[("3", "c")]));
    }

    #[test]
    fn test_drag_selects_rectangle() {
        let (schema, data) = fixture();
        let mut sel = Selection::new();
        sel.click(&schema, &data, &cell("5", "a"));

        assert!(sel.begin_drag(&schema, &data, &cell("1", "a")));
        // Anchor itself: no-op
        assert!(!sel.update_drag(&schema, &data, &cell("1", "a")));
        assert_eq!(sel.len(), 1);

        assert!(sel.update_drag(&schema, &data, &cell("2", "c")));
        // Previous selection is cleared on the first real move
        assert!(sel.is_empty());
        assert!(sel.is_selecting(&cell("2", "b")));
        assert!(!sel.is_selecting(&cell("2", "tag")));

        assert!(sel.end_drag());
        assert_eq!(
            sel.selected(),
            &set(&[("1", "a"), ("1", "b"), ("1", "c"), ("2", "a"), ("2", "b"), ("2", "c")])
        );
        assert!(!sel.is_dragging());
    }

    #[test]
    fn test_drag_result_is_independent_of_path() {
        let (schema, data) = fixture();

        let paths: Vec<Vec<CellKey>> = vec![
            vec![cell("3", "b")],
            vec![cell("5", "c"), cell("4", "a"), cell("1", "c"), cell("3", "b")],
            vec![cell("2", "a"), cell("2", "tag"), cell("3", "a"), cell("3", "b")],
        ];

        let mut results = Vec::new();
        for path in paths {
            let mut sel = Selection::new();
            sel.begin_drag(&schema, &data, &cell("1", "a"));
            for pointer in &path {
                sel.update_drag(&schema, &data, pointer);
            }
            sel.end_drag();
            results.push(sel.selected().clone());
        }

        let expected = set(&[
            ("1", "a"), ("1", "b"),
            ("2", "a"), ("2", "b"),
            ("3", "a"), ("3", "b"),
        ]);
        for result in results {
            assert_eq!(result, expected);
        }
    }

    #[test]
    fn test_click_without_movement_keeps_click_selection() {
        let (schema, data) = fixture();
        let mut sel = Selection::new();

        sel.begin_drag(&schema, &data, &cell("2", "a"));
        sel.click(&schema, &data, &cell("2", "a"));
        assert!(!sel.end_drag());
        assert_eq!(sel.selected(), &set(&[("2", "a")]));
    }

    #[test]
    fn test_begin_drag_on_read_only_is_ignored() {
        let (schema, data) = fixture();
        let mut sel = Selection::new();

        assert!(!sel.begin_drag(&schema, &data, &cell("1", "tag")));
        assert!(!sel.is_dragging());
        assert!(!sel.update_drag(&schema, &data, &cell("2", "a")));
    }

    #[test]
    fn test_rerender_mid_drag_uses_live_positions() {
        let (schema, mut data) = fixture();
        let mut sel = Selection::new();

        sel.begin_drag(&schema, &data, &cell("2", "a"));
        sel.update_drag(&schema, &data, &cell("3", "a"));
        assert_eq!(
            sel.drag_state(),
            &DragState::Dragging {
                anchor: cell("2", "a"),
                moved: true,
                selecting: set(&[("2", "a"), ("3", "a")]),
            }
        );

        // Filter re-renders rows in a new order while the mouse is down
        data.set_view_order(vec![
            RecordId::from("5"),
            RecordId::from("2"),
            RecordId::from("4"),
            RecordId::from("3"),
        ]);
        sel.update_drag(&schema, &data, &cell("3", "a"));
        sel.end_drag();
        assert_eq!(sel.selected(), &set(&[("2", "a"), ("4", "a"), ("3", "a")]));
    }

    #[test]
    fn test_anchor_filtered_out_mid_drag_does_not_panic() {
        let (schema, mut data) = fixture();
        let mut sel = Selection::new();

        sel.begin_drag(&schema, &data, &cell("1", "a"));
        sel.update_drag(&schema, &data, &cell("2", "a"));

        data.set_view_order(vec![RecordId::from("2"), RecordId::from("3")]);
        assert!(!sel.update_drag(&schema, &data, &cell("3", "a")));

        // Highlight from before the re-render is what gets promoted
        assert!(sel.end_drag());
        assert_eq!(sel.selected(), &set(&[("1", "a"), ("2", "a")]));
    }

    #[test]
    fn test_select_column_and_ordering() {
        let (schema, mut data) = fixture();
        data.set_view_order(vec![RecordId::from("3"), RecordId::from("1")]);
        let mut sel = Selection::new();

        assert!(sel.select_column(&schema, &data, &"b".into()));
        assert_eq!(sel.ordered_cells(&schema, &data), vec![cell("3", "b"), cell("1", "b")]);
        assert!(!sel.select_column(&schema, &data, &"tag".into()));
    }
}
