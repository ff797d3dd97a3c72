//! Copy and structural paste.

use super::TableEditor;
use crate::delta::Delta;
use crate::document::DocumentHost;
use crate::error::Result;
use crate::html::{export_html, import_table};
use crate::paste::{self, extract, TableFragment};
use crate::sync::table_delta;
use crate::types::CellRef;

/// What a copy puts on the clipboard: the cells as document runs, the same
/// cells as HTML, and the detached fragment a paste consumes.
#[derive(Debug, Clone, PartialEq)]
pub struct Clipboard {
    pub delta: Delta,
    pub html: String,
    pub fragment: TableFragment,
}

impl<H: DocumentHost> TableEditor<H> {
    /// Copy the selected cells, clipped to their bounding block.
    pub fn copy(&self, selected: &[CellRef]) -> Result<Option<Clipboard>> {
        let Some((id, keys)) = Self::single_table(selected)? else {
            return Ok(None);
        };
        let table = self.table(&id)?;
        let Some(subset) = extract(&table, &keys) else {
            return Ok(None);
        };
        Ok(Some(Clipboard {
            delta: table_delta(&subset)?,
            html: export_html(&subset),
            fragment: TableFragment::from_table(&subset),
        }))
    }

    /// Paste `fragment` over the destination cells.
    pub fn paste(&mut self, dest: &[CellRef], fragment: &TableFragment) -> Result<Option<Delta>> {
        if fragment.is_empty() {
            return Ok(None);
        }
        self.edit_cells(dest, |table, keys, _, _| paste::paste(table, keys, fragment))
    }

    /// Paste the first table found in clipboard runs.
    pub fn paste_delta(&mut self, dest: &[CellRef], clipboard: &Delta) -> Result<Option<Delta>> {
        match TableFragment::from_delta(clipboard)? {
            Some(fragment) => self.paste(dest, &fragment),
            None => Ok(None),
        }
    }

    /// Paste an HTML `<table>` from the system clipboard.
    pub fn paste_html(&mut self, dest: &[CellRef], html: &str) -> Result<Option<Delta>> {
        let Some(table) = import_table(html, &mut self.ids, &self.config)? else {
            log::debug!("clipboard HTML has no table; nothing to paste");
            return Ok(None);
        };
        self.paste(dest, &TableFragment::from_table(&table))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::config::TableConfig;
    use crate::document::MemoryDocument;
    use crate::types::{CellContent, CellKey, Table};

    fn cell(table: &Table, r: usize, c: usize) -> CellRef {
        CellRef::new(
            table.id.clone(),
            CellKey {
                row: table.rows[r].id.clone(),
                col: table.columns[c].id.clone(),
            },
        )
    }

    #[test]
    fn test_copy_then_paste_into_other_block() {
        let mut ed = TableEditor::new(MemoryDocument::new(), TableConfig::default()).unwrap();
        let id = ed.insert_table(0, 3, 3, false).unwrap();
        let mut fragment_source = ed.table(&id).unwrap();
        fragment_source.rows[0].cells[0].content = CellContent::from_text("x");
        let fragment = TableFragment::from_table(&Table {
            rows: vec![fragment_source.rows[0].clone()],
            ..fragment_source.clone()
        });
        let table = ed.table(&id).unwrap();
        let dest = vec![cell(&table, 2, 0), cell(&table, 2, 1), cell(&table, 2, 2)];
        ed.paste(&dest, &fragment).unwrap().unwrap();

        let table = ed.table(&id).unwrap();
        assert_eq!(table.rows[2].cells[0].content.text(), "x");

        let copied = ed.copy(&dest).unwrap().unwrap();
        assert_eq!(copied.fragment.rows.len(), 1);
        assert!(copied.html.contains(">x<"));
    }

    #[test]
    fn test_paste_html_without_table_is_noop() {
        let mut ed = TableEditor::new(MemoryDocument::new(), TableConfig::default()).unwrap();
        let id = ed.insert_table(0, 2, 2, false).unwrap();
        let table = ed.table(&id).unwrap();
        let dest = vec![cell(&table, 0, 0)];
        assert_eq!(ed.paste_html(&dest, "<p>plain</p>").unwrap(), None);
    }

    #[test]
    fn test_paste_html_table() {
        let mut ed = TableEditor::new(MemoryDocument::new(), TableConfig::default()).unwrap();
        let id = ed.insert_table(0, 2, 2, false).unwrap();
        let table = ed.table(&id).unwrap();
        let dest = vec![cell(&table, 0, 0), cell(&table, 0, 1)];
        ed.paste_html(&dest, "<table><tr><td>a</td><td>b</td></tr></table>")
            .unwrap()
            .unwrap();
        let table = ed.table(&id).unwrap();
        assert_eq!(table.rows[0].cells[1].content.text(), "b");
    }
}
