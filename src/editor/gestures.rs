//! Pointer gestures: rectangle selection, header clicks and drag reorder.
//!
//! Geometry comes from the synthetic layout of the table at the editor's
//! container width; hosts with measured geometry can drive
//! `SelectionEngine` and `DragSession` directly.

use super::TableEditor;
use crate::delta::Delta;
use crate::document::DocumentHost;
use crate::drag::{Axis, DragRejection, DragSession};
use crate::error::Result;
use crate::layout::TableLayout;
use crate::selection::SelectionEngine;
use crate::types::{CellRef, Point, Selection, TableId};

impl<H: DocumentHost> TableEditor<H> {
    /// Synthetic geometry of one table.
    pub fn layout(&self, id: &TableId) -> Result<TableLayout> {
        let table = self.table(id)?;
        Ok(TableLayout::new(&table, &self.config, self.container_width))
    }

    fn selection_engine(&self, id: &TableId) -> Result<SelectionEngine> {
        let layout = self.layout(id)?;
        Ok(SelectionEngine::from_layout(
            id.clone(),
            &layout,
            self.config.selection_tolerance_px,
        ))
    }

    fn store_selection(&mut self, selection: Selection) -> &Selection {
        self.selection.insert(selection)
    }

    /// Select by dragging from `start` to `end`, in table coordinates.
    pub fn select(&mut self, id: &TableId, start: Point, end: Point) -> Result<&Selection> {
        let selection = self.selection_engine(id)?.compute_selected_cells(start, end);
        Ok(self.store_selection(selection))
    }

    /// Row header click. With `extend`, a shift-click from the previous
    /// row header anchor.
    pub fn select_rows(&mut self, id: &TableId, row: usize, extend: bool) -> Result<&Selection> {
        let anchor = self.header_anchor(id, extend).unwrap_or(row);
        let selection = self.selection_engine(id)?.select_rows(anchor, row);
        Ok(self.store_selection(selection))
    }

    /// Column header click, with optional shift-extend.
    pub fn select_cols(&mut self, id: &TableId, col: usize, extend: bool) -> Result<&Selection> {
        let anchor = self.header_anchor(id, extend).unwrap_or(col);
        let selection = self.selection_engine(id)?.select_cols(anchor, col);
        Ok(self.store_selection(selection))
    }

    /// Corner click.
    pub fn select_all(&mut self, id: &TableId) -> Result<&Selection> {
        let selection = self.selection_engine(id)?.select_all();
        Ok(self.store_selection(selection))
    }

    fn header_anchor(&self, id: &TableId, extend: bool) -> Option<usize> {
        if !extend {
            return None;
        }
        self.selection
            .as_ref()
            .filter(|s| s.table == *id)
            .and_then(|s| s.anchor)
    }

    // ========================================================================
    // Drag reorder
    // ========================================================================

    pub fn drag_session(&self) -> Option<&DragSession> {
        self.drag.as_ref()
    }

    /// Start dragging the rows or columns under `selected`.
    ///
    /// Returns the rejection when the band cannot move; the editor then
    /// holds no session.
    pub fn begin_drag(
        &mut self,
        axis: Axis,
        selected: &[CellRef],
    ) -> Result<std::result::Result<(), DragRejection>> {
        self.drag = None;
        let Some((id, keys)) = Self::single_table(selected)? else {
            return Ok(Err(DragRejection::Empty));
        };
        let table = self.table(&id)?;
        let layout = TableLayout::new(&table, &self.config, self.container_width);
        let tracks = match axis {
            Axis::Rows => layout.row_tracks(),
            Axis::Cols => layout.col_tracks(),
        };
        Ok(DragSession::begin(&table, axis, &keys, tracks).map(|session| {
            self.drag = Some(session);
        }))
    }

    /// Track the pointer along the drag axis. Returns the insertion index
    /// the band would land at, if valid.
    pub fn drag_to(&mut self, pointer: f32) -> Result<Option<usize>> {
        let Some(id) = self.drag.as_ref().map(|s| s.table.clone()) else {
            return Ok(None);
        };
        let table = self.table(&id)?;
        Ok(self
            .drag
            .as_mut()
            .and_then(|session| session.update(&table, pointer)))
    }

    /// Drop at the current target. The session ends either way.
    pub fn end_drag(&mut self) -> Result<Option<Delta>> {
        let Some(session) = self.drag.take() else {
            return Ok(None);
        };
        let located = self.locate(&session.table)?;
        let Some((splices, _moved)) = session.drop_splices(&located)? else {
            log::debug!("drag in table {} ended without a valid target", session.table);
            return Ok(None);
        };
        self.commit(splices)
    }

    pub fn cancel_drag(&mut self) {
        self.drag = None;
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp
)]
mod tests {
    use crate::config::TableConfig;
    use crate::document::MemoryDocument;
    use crate::drag::Axis;
    use crate::editor::TableEditor;
    use crate::types::Point;

    #[test]
    fn test_select_and_drag_row_down() {
        let mut ed = TableEditor::new(MemoryDocument::new(), TableConfig::default()).unwrap();
        let id = ed.insert_table(0, 3, 2, false).unwrap();
        let first = ed.table(&id).unwrap().rows[0].id.clone();

        // Default row height is 32px: y=10 is inside the first row.
        let refs = ed.select(&id, Point::new(10.0, 10.0), Point::new(10.0, 10.0)).unwrap().refs();
        assert_eq!(refs.len(), 1);
        let refs = ed.select_rows(&id, 0, false).unwrap().refs();
        assert_eq!(refs.len(), 2);

        ed.begin_drag(Axis::Rows, &refs).unwrap().unwrap();
        // Past the midpoint of the last row: drop at the end.
        assert_eq!(ed.drag_to(90.0).unwrap(), Some(3));
        ed.end_drag().unwrap().unwrap();
        assert!(ed.drag_session().is_none());
        assert_eq!(ed.table(&id).unwrap().rows[2].id, first);
    }

    #[test]
    fn test_drag_onto_itself_does_nothing() {
        let mut ed = TableEditor::new(MemoryDocument::new(), TableConfig::default()).unwrap();
        let id = ed.insert_table(0, 3, 2, false).unwrap();
        let refs = ed.select_rows(&id, 1, false).unwrap().refs();
        ed.begin_drag(Axis::Rows, &refs).unwrap().unwrap();
        assert_eq!(ed.drag_to(40.0).unwrap(), None);
        assert_eq!(ed.end_drag().unwrap(), None);
        assert!(!ed.host().can_redo());
    }

    #[test]
    fn test_shift_click_extends_columns() {
        let mut ed = TableEditor::new(MemoryDocument::new(), TableConfig::default()).unwrap();
        let id = ed.insert_table(0, 2, 4, false).unwrap();
        ed.select_cols(&id, 1, false).unwrap();
        let selection = ed.select_cols(&id, 3, true).unwrap();
        assert_eq!(selection.anchor, Some(1));
        assert_eq!(selection.cells.len(), 6);
    }

    #[test]
    fn test_drag_whole_axis_rejected() {
        let mut ed = TableEditor::new(MemoryDocument::new(), TableConfig::default()).unwrap();
        let id = ed.insert_table(0, 2, 2, false).unwrap();
        let refs = ed.select_all(&id).unwrap().refs();
        assert!(ed.begin_drag(Axis::Cols, &refs).unwrap().is_err());
        assert!(ed.drag_session().is_none());
    }
}
