//! `TableEditor`: the engines bound to a document host.
//!
//! Every operation reads the affected table out of the host's current
//! contents, mutates a copy of the grid tree, repairs it and hands the host
//! exactly one patch. Nothing is cached between calls except the id
//! generator, the current selection and an in-progress drag, so external
//! edits to the document are always picked up.

mod clipboard;
mod gestures;

pub use clipboard::Clipboard;

use crate::colors::{KeyValueStore, MemoryStore, RecentColors};
use crate::config::TableConfig;
use crate::delta::{compose_splices, Delta, Op, Splice};
use crate::document::DocumentHost;
use crate::drag::DragSession;
use crate::error::{Result, TableError};
use crate::structure::{self, repair};
use crate::sync::{
    collect_ids, delete_table_splice, find_table, is_line_start, scan_tables, table_at,
    table_ops, table_splices, LocatedTable,
};
use crate::types::{
    Align, CaptionSide, CellKey, CellRef, CellStyle, ColId, IdGenerator, RowId, Selection, Table,
    TableId,
};

/// Width percent tables are laid out in when the host has not said.
pub const DEFAULT_CONTAINER_WIDTH: f32 = 800.0;

/// Editing facade over one document.
pub struct TableEditor<H: DocumentHost> {
    host: H,
    config: TableConfig,
    ids: IdGenerator,
    recent_colors: RecentColors<Box<dyn KeyValueStore>>,
    container_width: f32,
    selection: Option<Selection>,
    drag: Option<DragSession>,
    last_patch: Option<Delta>,
}

impl<H: DocumentHost> TableEditor<H> {
    /// Bind to `host`. Recent colors are kept in memory.
    pub fn new(host: H, config: TableConfig) -> Result<Self> {
        Self::with_store(host, config, Box::new(MemoryStore::new()))
    }

    /// Bind to `host`, persisting recent colors in `store`.
    pub fn with_store(host: H, config: TableConfig, store: Box<dyn KeyValueStore>) -> Result<Self> {
        let mut ids = IdGenerator::new();
        for id in collect_ids(host.contents())? {
            ids.observe(&id);
        }
        let recent_colors = RecentColors::new(store, &config);
        Ok(Self {
            host,
            config,
            ids,
            recent_colors,
            container_width: DEFAULT_CONTAINER_WIDTH,
            selection: None,
            drag: None,
            last_patch: None,
        })
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Direct access to the host. Call `on_external_change` after editing
    /// table lines through it.
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn into_host(self) -> H {
        self.host
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    /// The patch most recently applied through the editor.
    pub fn last_patch(&self) -> Option<&Delta> {
        self.last_patch.as_ref()
    }

    pub fn recent_colors(&self) -> Vec<String> {
        self.recent_colors.list()
    }

    pub fn set_container_width(&mut self, width: f32) {
        self.container_width = width.max(0.0);
    }

    /// Every table in the document, in document order.
    pub fn tables(&self) -> Result<Vec<Table>> {
        Ok(scan_tables(self.host.contents())?
            .into_iter()
            .map(|located| located.table)
            .collect())
    }

    pub fn table(&self, id: &TableId) -> Result<Table> {
        self.locate(id).map(|located| located.table)
    }

    fn locate(&self, id: &TableId) -> Result<LocatedTable> {
        find_table(self.host.contents(), id)?.ok_or_else(|| TableError::TableNotFound(id.clone()))
    }

    /// Compose `splices` into one patch and hand it to the host.
    fn commit(&mut self, splices: Vec<Splice>) -> Result<Option<Delta>> {
        let patch = compose_splices(splices)?;
        if patch.is_empty() {
            log::debug!("edit produced an empty patch");
            return Ok(None);
        }
        self.host.apply(&patch)?;
        self.prune_selection();
        self.last_patch = Some(patch.clone());
        Ok(Some(patch))
    }

    /// Run `edit` on a copy of the table and commit the difference.
    ///
    /// `edit` returns `false` for a no-op; the document is left alone.
    fn edit_table<F>(&mut self, id: &TableId, edit: F) -> Result<Option<Delta>>
    where
        F: FnOnce(&mut Table, &mut IdGenerator, &TableConfig) -> Result<bool>,
    {
        let located = self.locate(id)?;
        let mut table = located.table.clone();
        if !edit(&mut table, &mut self.ids, &self.config)? {
            return Ok(None);
        }
        repair(&mut table);
        let splices = if table.is_degenerate() {
            log::debug!("table {id} has no cells left; deleting it");
            vec![delete_table_splice(&located)]
        } else {
            table_splices(&located, Some(&table))?
        };
        self.commit(splices)
    }

    /// Split cell references into their table and keys. Empty input is
    /// `None`; references into two tables are refused.
    fn single_table(cells: &[CellRef]) -> Result<Option<(TableId, Vec<CellKey>)>> {
        let Some(first) = cells.first() else {
            return Ok(None);
        };
        if let Some(other) = cells.iter().find(|c| c.table != first.table) {
            log::warn!(
                "operation refused: selection spans tables {} and {}",
                first.table,
                other.table
            );
            return Err(TableError::CrossTable(first.table.clone(), other.table.clone()));
        }
        let keys = cells.iter().map(|c| c.cell.clone()).collect();
        Ok(Some((first.table.clone(), keys)))
    }

    /// Run `edit` against the table the selection lives in.
    fn edit_cells<F>(&mut self, cells: &[CellRef], edit: F) -> Result<Option<Delta>>
    where
        F: FnOnce(&mut Table, &[CellKey], &mut IdGenerator, &TableConfig) -> Result<bool>,
    {
        let Some((id, keys)) = Self::single_table(cells)? else {
            log::debug!("operation on an empty selection ignored");
            return Ok(None);
        };
        self.edit_table(&id, |table, ids, config| edit(table, &keys, ids, config))
    }

    // ========================================================================
    // Table lifecycle
    // ========================================================================

    /// Insert a new `rows` x `cols` table at `at`.
    ///
    /// A table cannot start inside another table. When `at` is in the
    /// middle of a line the line is broken first.
    pub fn insert_table(&mut self, at: usize, rows: usize, cols: usize, full: bool) -> Result<TableId> {
        let doc = self.host.contents();
        let length = doc.length();
        if length > 0 && at >= length {
            return Err(TableError::InvalidInsertionTarget(format!(
                "offset {at} is past the end of the document ({length})"
            )));
        }
        if let Some(located) = table_at(doc, at)? {
            return Err(TableError::InvalidInsertionTarget(format!(
                "offset {at} is inside table {}",
                located.table.id
            )));
        }
        let mut ops = Vec::new();
        if !is_line_start(doc, at) {
            ops.push(Op::text("\n", Default::default()));
        }

        let table = structure::new_table(&mut self.ids, rows, cols, full, &self.config)?;
        ops.extend(table_ops(&table)?);
        log::debug!("inserting {rows}x{cols} table {} at {at}", table.id);
        self.commit(vec![Splice::insert(at, ops)])?;
        Ok(table.id)
    }

    /// Remove the whole table.
    pub fn delete_table(&mut self, id: &TableId) -> Result<Option<Delta>> {
        let located = self.locate(id)?;
        if self
            .selection
            .as_ref()
            .is_some_and(|selection| selection.table == *id)
        {
            self.selection = None;
        }
        self.commit(vec![delete_table_splice(&located)])
    }

    /// Repair every table after the host changed table lines directly.
    /// Damaged attributes are rewritten in canonical form. All fixes go
    /// out as one patch.
    pub fn on_external_change(&mut self) -> Result<Option<Delta>> {
        let doc = self.host.contents();
        for id in collect_ids(doc)? {
            self.ids.observe(&id);
        }
        let mut splices = Vec::new();
        for located in scan_tables(doc)? {
            let mut table = located.table.clone();
            let repaired = repair(&mut table);
            if repaired && table.is_degenerate() {
                log::debug!("table {} degenerate after an external change", table.id);
                splices.push(delete_table_splice(&located));
                continue;
            }
            let fixes = table_splices(&located, Some(&table))?;
            if !fixes.is_empty() {
                log::debug!("repaired table {} after an external change", table.id);
            }
            splices.extend(fixes);
        }
        self.commit(splices)
    }

    // ========================================================================
    // Rows and columns
    // ========================================================================

    /// Insert a row above (or below, with `after`) the pivot cells.
    pub fn append_row(&mut self, pivots: &[CellRef], after: bool) -> Result<Option<Delta>> {
        self.edit_cells(pivots, |table, keys, ids, _| {
            Ok(structure::append_row(table, ids, keys, after)?.is_some())
        })
    }

    /// Insert a column left of (or right of, with `after`) the pivot cells.
    pub fn append_col(&mut self, pivots: &[CellRef], after: bool) -> Result<Option<Delta>> {
        self.edit_cells(pivots, |table, keys, ids, config| {
            Ok(structure::append_col(table, ids, keys, after, config)?.is_some())
        })
    }

    pub fn remove_row(&mut self, selected: &[CellRef]) -> Result<Option<Delta>> {
        self.edit_cells(selected, |table, keys, _, _| structure::remove_row(table, keys))
    }

    pub fn remove_col(&mut self, selected: &[CellRef]) -> Result<Option<Delta>> {
        self.edit_cells(selected, |table, keys, _, _| structure::remove_col(table, keys))
    }

    // ========================================================================
    // Merge and split
    // ========================================================================

    pub fn merge_cells(&mut self, selected: &[CellRef]) -> Result<Option<Delta>> {
        self.edit_cells(selected, |table, keys, _, _| {
            Ok(structure::merge_cells(table, keys)?.is_some())
        })
    }

    pub fn split_cell(&mut self, cell: &CellRef) -> Result<Option<Delta>> {
        self.edit_table(&cell.table, |table, _, _| structure::split_cell(table, &cell.cell))
    }

    // ========================================================================
    // Sizing, styling and captions
    // ========================================================================

    pub fn set_column_width(&mut self, id: &TableId, col: &ColId, width: f32) -> Result<Option<Delta>> {
        self.edit_table(id, |table, _, config| {
            structure::set_column_width(table, col, width, config)
        })
    }

    pub fn set_row_height(
        &mut self,
        id: &TableId,
        row: &RowId,
        height: Option<f32>,
    ) -> Result<Option<Delta>> {
        self.edit_table(id, |table, _, config| {
            structure::set_row_height(table, row, height, config)
        })
    }

    /// Style the selected cells. Colors used are remembered as recent.
    pub fn set_cell_style(&mut self, selected: &[CellRef], style: &CellStyle) -> Result<Option<Delta>> {
        let patch = self.edit_cells(selected, |table, keys, _, _| {
            structure::set_cell_style(table, keys, style)
        })?;
        if patch.is_some() {
            for color in [&style.background_color, &style.border_color]
                .into_iter()
                .flatten()
                .filter(|c| !c.is_empty())
            {
                self.recent_colors.push(color)?;
            }
        }
        Ok(patch)
    }

    pub fn set_alignment(&mut self, id: &TableId, align: Align) -> Result<Option<Delta>> {
        self.edit_table(id, |table, _, _| Ok(structure::set_alignment(table, align)))
    }

    /// Switch between percent and pixel column widths. Pixel widths are
    /// taken from the current container width.
    pub fn set_full(&mut self, id: &TableId, full: bool) -> Result<Option<Delta>> {
        let width = self.container_width;
        self.edit_table(id, |table, _, _| Ok(structure::set_full(table, full, width)))
    }

    pub fn set_caption(
        &mut self,
        id: &TableId,
        caption: Option<(&str, CaptionSide)>,
    ) -> Result<Option<Delta>> {
        self.edit_table(id, |table, _, _| Ok(structure::set_caption(table, caption)))
    }

    // ========================================================================
    // Selection state
    // ========================================================================

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    /// The current selection as document-wide references.
    pub fn selected_refs(&self) -> Vec<CellRef> {
        self.selection
            .as_ref()
            .map(Selection::refs)
            .unwrap_or_default()
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    /// Drop selected cells that no longer exist after an edit.
    fn prune_selection(&mut self) {
        let Some(selection) = self.selection.take() else {
            return;
        };
        let Ok(Some(located)) = find_table(self.host.contents(), &selection.table) else {
            return;
        };
        let mut selection = selection;
        selection
            .cells
            .retain(|key| located.table.cell(key).is_some());
        if !selection.is_empty() {
            self.selection = Some(selection);
        }
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
    use super::*;
    use crate::delta::Attributes;
    use crate::document::MemoryDocument;

    fn editor() -> TableEditor<MemoryDocument> {
        let mut doc = Delta::new();
        doc.insert("Intro\n", Attributes::new());
        TableEditor::new(MemoryDocument::from_delta(doc), TableConfig::default()).unwrap()
    }

    fn refs(table: &Table, cells: &[(usize, usize)]) -> Vec<CellRef> {
        cells
            .iter()
            .map(|&(r, c)| {
                CellRef::new(
                    table.id.clone(),
                    CellKey {
                        row: table.rows[r].id.clone(),
                        col: table.columns[c].id.clone(),
                    },
                )
            })
            .collect()
    }

    #[test]
    fn test_insert_table_breaks_line() {
        let mut ed = editor();
        let id = ed.insert_table(2, 2, 3, false).unwrap();
        let table = ed.table(&id).unwrap();
        assert_eq!((table.row_count(), table.col_count()), (2, 3));
        assert!(ed.host().text().starts_with("In\n"));
    }

    #[test]
    fn test_insert_table_inside_table_is_refused() {
        let mut ed = editor();
        ed.insert_table(0, 2, 2, false).unwrap();
        let err = ed.insert_table(4, 2, 2, false).unwrap_err();
        assert!(matches!(err, TableError::InvalidInsertionTarget(_)));
        assert_eq!(ed.tables().unwrap().len(), 1);
    }

    #[test]
    fn test_insert_table_size_limits() {
        let mut ed = editor();
        assert!(matches!(
            ed.insert_table(0, 0, 2, false),
            Err(TableError::InvalidSize { .. })
        ));
        assert!(matches!(
            ed.insert_table(0, 2, 30, false),
            Err(TableError::InvalidSize { .. })
        ));
        assert!(!ed.host().can_undo());
    }

    #[test]
    fn test_cross_table_selection_refused() {
        let mut ed = editor();
        let a = ed.insert_table(0, 2, 2, false).unwrap();
        let end = ed.host().length() - 1;
        let b = ed.insert_table(end, 2, 2, false).unwrap();
        let (ta, tb) = (ed.table(&a).unwrap(), ed.table(&b).unwrap());
        let mut cells = refs(&ta, &[(0, 0)]);
        cells.extend(refs(&tb, &[(0, 0)]));
        let before = ed.host().contents().clone();
        assert!(matches!(ed.merge_cells(&cells), Err(TableError::CrossTable(..))));
        assert_eq!(ed.host().contents(), &before);
    }

    #[test]
    fn test_empty_selection_is_noop() {
        let mut ed = editor();
        ed.insert_table(0, 2, 2, false).unwrap();
        assert_eq!(ed.remove_row(&[]).unwrap(), None);
    }

    #[test]
    fn test_remove_every_row_deletes_table() {
        let mut ed = editor();
        let id = ed.insert_table(0, 2, 2, false).unwrap();
        let table = ed.table(&id).unwrap();
        ed.remove_row(&refs(&table, &[(0, 0), (1, 0)])).unwrap().unwrap();
        assert!(ed.tables().unwrap().is_empty());
        assert_eq!(ed.host().text(), "Intro\n");
    }

    #[test]
    fn test_style_records_recent_colors() {
        let mut ed = editor();
        let id = ed.insert_table(0, 1, 2, false).unwrap();
        let table = ed.table(&id).unwrap();
        let style = CellStyle {
            background_color: Some("#F00".into()),
            ..CellStyle::default()
        };
        ed.set_cell_style(&refs(&table, &[(0, 1)]), &style)
            .unwrap()
            .unwrap();
        assert_eq!(ed.recent_colors(), vec!["#ff0000"]);
        let table = ed.table(&id).unwrap();
        assert_eq!(
            table.rows[0].cells[1].style.background_color.as_deref(),
            Some("#F00")
        );
    }

    #[test]
    fn test_each_operation_is_one_undo_step() {
        let mut ed = editor();
        let id = ed.insert_table(0, 2, 2, false).unwrap();
        let original = ed.host().contents().clone();
        let table = ed.table(&id).unwrap();
        ed.append_col(&refs(&table, &[(0, 1)]), true).unwrap().unwrap();
        assert_eq!(ed.table(&id).unwrap().col_count(), 3);
        ed.host_mut().undo().unwrap();
        assert_eq!(ed.host().contents(), &original);
    }
}
