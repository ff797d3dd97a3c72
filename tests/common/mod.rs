//! Common test utilities and assertion helpers.
//!
//! Builders for documents with tables in them, cell addressing by grid
//! position, and the grid invariants every operation must preserve.
#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]

use std::collections::HashSet;

use rtgrid::delta::{Attributes, Delta};
use rtgrid::sync::{find_table, table_ops};
use rtgrid::{
    CellContent, CellKey, CellRef, IdGenerator, MemoryDocument, Table, TableConfig, TableEditor,
    TableId,
};

// ============================================================================
// Document Builders
// ============================================================================

/// A document with `tables` between two paragraphs.
pub fn document_with(tables: &[&Table]) -> Delta {
    let mut doc = Delta::new();
    doc.insert("Intro\n", Attributes::new());
    for table in tables {
        for op in table_ops(table).unwrap() {
            doc.push(op);
        }
        doc.insert("Between\n", Attributes::new());
    }
    doc
}

/// An editor over a document holding `table`.
pub fn editor_with(table: &Table) -> TableEditor<MemoryDocument> {
    let doc = MemoryDocument::from_delta(document_with(&[table]));
    TableEditor::new(doc, TableConfig::default()).unwrap()
}

/// A fresh `rows` x `cols` table whose cells hold their own coordinates
/// (`"r,c"`).
pub fn labelled(ids: &mut IdGenerator, rows: usize, cols: usize, full: bool) -> Table {
    let mut table = Table::balanced(ids, rows, cols, full, 100.0);
    for (r, row) in table.rows.iter_mut().enumerate() {
        for (c, cell) in row.cells.iter_mut().enumerate() {
            cell.content = CellContent::from_text(&format!("{r},{c}"));
        }
    }
    table
}

// ============================================================================
// Addressing
// ============================================================================

pub fn key(table: &Table, r: usize, c: usize) -> CellKey {
    CellKey {
        row: table.rows[r].id.clone(),
        col: table.columns[c].id.clone(),
    }
}

pub fn cell_ref(table: &Table, r: usize, c: usize) -> CellRef {
    CellRef::new(table.id.clone(), key(table, r, c))
}

/// References to every cell anchored inside rows `rows` x columns `cols`.
pub fn block(table: &Table, rows: std::ops::Range<usize>, cols: std::ops::Range<usize>) -> Vec<CellRef> {
    let grid = table.grid();
    grid.placements()
        .iter()
        .filter(|p| rows.contains(&p.row) && cols.contains(&p.col))
        .map(|p| CellRef::new(table.id.clone(), p.key.clone()))
        .collect()
}

pub fn all_cells(table: &Table) -> Vec<CellRef> {
    table
        .cell_keys()
        .into_iter()
        .map(|k| CellRef::new(table.id.clone(), k))
        .collect()
}

// ============================================================================
// Inspection
// ============================================================================

/// Cell texts row by row.
pub fn texts(table: &Table) -> Vec<Vec<String>> {
    table
        .rows
        .iter()
        .map(|row| row.cells.iter().map(|c| c.content.text()).collect())
        .collect()
}

/// `(rowspan, colspan)` of every cell, row by row.
pub fn spans(table: &Table) -> Vec<Vec<(u32, u32)>> {
    table
        .rows
        .iter()
        .map(|row| row.cells.iter().map(|c| (c.rowspan, c.colspan)).collect())
        .collect()
}

// ============================================================================
// Assertions
// ============================================================================

/// The four grid invariants.
pub fn assert_invariants(table: &Table) {
    let grid = table.grid();
    assert!(grid.is_rectangular(), "grid is not rectangular: {:?}", spans(table));

    let declared: HashSet<&str> = table.columns.iter().map(|c| c.id.as_str()).collect();
    let referenced: HashSet<&str> = table
        .rows
        .iter()
        .flat_map(|r| r.cells.iter().map(|c| c.col.as_str()))
        .collect();
    assert_eq!(declared, referenced, "column ids do not match cell references");

    if table.full {
        let total: f32 = table.columns.iter().map(|c| c.width).sum();
        assert!((total - 100.0).abs() < 0.01, "percent widths sum to {total}");
    }

    for row in &table.rows {
        for cell in &row.cells {
            assert!(!cell.content.lines.is_empty(), "cell without a line");
            assert!(cell.rowspan >= 1 && cell.colspan >= 1);
        }
    }
}

/// The document's copy of the table is exactly what serializing the parsed
/// table produces, i.e. applying the patch equals re-serializing.
pub fn assert_document_canonical(editor: &TableEditor<MemoryDocument>, id: &TableId) {
    let doc = rtgrid::DocumentHost::contents(editor.host());
    let located = find_table(doc, id).unwrap().expect("table in document");
    let expected = Delta::from_ops(table_ops(&located.table).unwrap());
    let actual = doc.slice(located.offset, located.end());
    assert_eq!(actual, expected, "document lines differ from re-serialization");
    assert_invariants(&located.table);
}

/// Undo the last patch and check the document is back to `before`.
pub fn assert_undo_restores(editor: &mut TableEditor<MemoryDocument>, before: &Delta) {
    editor.host_mut().undo().expect("an undo entry");
    assert_eq!(rtgrid::DocumentHost::contents(editor.host()), before);
}
