//! Structural paste through `TableEditor`: exact replacement when the copied
//! block matches the destination extent, content tiling otherwise.
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]

mod common;

use common::{
    all_cells, assert_document_canonical, assert_undo_restores, block, document_with, labelled,
    spans, texts,
};
use rtgrid::paste::TableFragment;
use rtgrid::{
    CellContent, DocumentHost, IdGenerator, MemoryDocument, Table, TableConfig, TableEditor,
    TableError,
};

/// A 2x2 source holding `a b / c d`.
fn abcd(ids: &mut IdGenerator) -> Table {
    let mut source = Table::balanced(ids, 2, 2, false, 100.0);
    for (cell, text) in source
        .rows
        .iter_mut()
        .flat_map(|r| r.cells.iter_mut())
        .zip(["a", "b", "c", "d"])
    {
        cell.content = CellContent::from_text(text);
    }
    source
}

// ============================================================================
// SCENARIO C: exact versus loop-fill
// ============================================================================

#[test]
fn test_scenario_c_exact_replace() {
    let mut ids = IdGenerator::new();
    let source = abcd(&mut ids);
    let table = labelled(&mut ids, 3, 5, false);
    let mut editor = common::editor_with(&table);
    let before = editor.host().contents().clone();

    let dest = block(&table, 1..3, 2..4);
    editor
        .paste(&dest, &TableFragment::from_table(&source))
        .unwrap()
        .unwrap();

    let after = editor.table(&table.id).unwrap();
    assert_eq!(texts(&after)[1], vec!["1,0", "1,1", "a", "b", "1,4"]);
    assert_eq!(texts(&after)[2], vec!["2,0", "2,1", "c", "d", "2,4"]);
    assert_eq!(texts(&after)[0], texts(&table)[0]);
    assert_eq!(spans(&after), spans(&table));
    assert_document_canonical(&editor, &table.id);
    assert_undo_restores(&mut editor, &before);
}

#[test]
fn test_scenario_c_loop_fill() {
    let mut ids = IdGenerator::new();
    let source = abcd(&mut ids);
    let table = labelled(&mut ids, 3, 5, false);
    let mut editor = common::editor_with(&table);

    editor
        .paste(&all_cells(&table), &TableFragment::from_table(&source))
        .unwrap()
        .unwrap();

    let after = editor.table(&table.id).unwrap();
    assert_eq!(
        texts(&after),
        vec![
            vec!["a", "b", "a", "b", "a"],
            vec!["c", "d", "c", "d", "c"],
            vec!["a", "b", "a", "b", "a"],
        ]
    );
    assert_eq!(texts(&after)[2][4], "a", "(2,4) takes source (0,0)");
    assert_eq!(spans(&after), spans(&table), "loop-fill never changes structure");
    assert_document_canonical(&editor, &table.id);
}

// ============================================================================
// EXACT PASTE WITH SPANS
// ============================================================================

#[test]
fn test_exact_paste_brings_rowspan_along() {
    let mut ids = IdGenerator::new();
    let mut source = abcd(&mut ids);
    source.rows[0].cells[0].rowspan = 2;
    source.rows[1].cells.remove(0);
    let table = labelled(&mut ids, 3, 3, false);
    let mut editor = common::editor_with(&table);

    editor
        .paste(&block(&table, 0..2, 0..2), &TableFragment::from_table(&source))
        .unwrap()
        .unwrap();

    let after = editor.table(&table.id).unwrap();
    assert_eq!(
        spans(&after),
        vec![
            vec![(2, 1), (1, 1), (1, 1)],
            vec![(1, 1), (1, 1)],
            vec![(1, 1), (1, 1), (1, 1)],
        ]
    );
    assert_eq!(texts(&after)[0], vec!["a", "b", "0,2"]);
    assert_eq!(texts(&after)[1], vec!["d", "1,2"]);
    assert_document_canonical(&editor, &table.id);
}

#[test]
fn test_exact_paste_drops_rows_left_without_cells() {
    let mut ids = IdGenerator::new();
    let mut source = abcd(&mut ids);
    for cell in &mut source.rows[0].cells {
        cell.rowspan = 2;
    }
    source.rows[1].cells.clear();
    let table = labelled(&mut ids, 3, 2, false);
    let mut editor = common::editor_with(&table);

    editor
        .paste(&block(&table, 0..2, 0..2), &TableFragment::from_table(&source))
        .unwrap()
        .unwrap();

    let after = editor.table(&table.id).unwrap();
    assert_eq!(after.row_count(), 2);
    assert_eq!(spans(&after), vec![vec![(1, 1), (1, 1)], vec![(1, 1), (1, 1)]]);
    assert_eq!(texts(&after), vec![vec!["a", "b"], vec!["2,0", "2,1"]]);
    assert_document_canonical(&editor, &table.id);
}

#[test]
fn test_scattered_destination_is_tiled_not_replaced() {
    let mut ids = IdGenerator::new();
    let mut single = Table::balanced(&mut ids, 1, 1, false, 100.0);
    single.rows[0].cells[0].content = CellContent::from_text("x");
    let table = labelled(&mut ids, 2, 2, false);
    let mut editor = common::editor_with(&table);

    // Same 1x1 extent as the fragment, but (0,0) and (1,1) are not a block.
    let dest = vec![common::cell_ref(&table, 0, 0), common::cell_ref(&table, 1, 1)];
    editor
        .paste(&dest, &TableFragment::from_table(&single))
        .unwrap()
        .unwrap();

    let after = editor.table(&table.id).unwrap();
    assert_eq!(texts(&after), vec![vec!["x", "0,1"], vec!["1,0", "x"]]);
    assert_eq!(spans(&after), spans(&table));
    assert_document_canonical(&editor, &table.id);
}

// ============================================================================
// CLIPBOARD ROUND TRIPS
// ============================================================================

#[test]
fn test_copy_then_paste_delta_into_other_block() {
    let mut ids = IdGenerator::new();
    let table = labelled(&mut ids, 3, 3, false);
    let mut editor = common::editor_with(&table);

    let clipboard = editor.copy(&block(&table, 0..2, 0..2)).unwrap().unwrap();
    assert!(clipboard.html.starts_with("<table"));
    editor
        .paste_delta(&block(&table, 1..3, 1..3), &clipboard.delta)
        .unwrap()
        .unwrap();

    let after = editor.table(&table.id).unwrap();
    assert_eq!(texts(&after)[1], vec!["1,0", "0,0", "0,1"]);
    assert_eq!(texts(&after)[2], vec!["2,0", "1,0", "1,1"]);
    assert_document_canonical(&editor, &table.id);
}

#[test]
fn test_paste_html_with_colspan() {
    let mut ids = IdGenerator::new();
    let table = labelled(&mut ids, 2, 3, false);
    let mut editor = common::editor_with(&table);

    editor
        .paste_html(
            &block(&table, 0..2, 1..3),
            r#"<meta charset="utf-8"><table><tr><td colspan="2"><b>wide</b></td></tr>
            <tr><td>l</td><td>r</td></tr></table>"#,
        )
        .unwrap()
        .unwrap();

    let after = editor.table(&table.id).unwrap();
    assert_eq!(spans(&after)[0], vec![(1, 1), (1, 2)]);
    assert_eq!(texts(&after)[0], vec!["0,0", "wide"]);
    assert_eq!(texts(&after)[1], vec!["1,0", "l", "r"]);
    assert_document_canonical(&editor, &table.id);
}

#[test]
fn test_paste_delta_without_table_is_noop() {
    let mut ids = IdGenerator::new();
    let table = labelled(&mut ids, 2, 2, false);
    let mut editor = common::editor_with(&table);
    let mut plain = rtgrid::Delta::new();
    plain.insert("just text\n", rtgrid::delta::Attributes::new());
    assert_eq!(editor.paste_delta(&all_cells(&table), &plain).unwrap(), None);
}

#[test]
fn test_paste_across_tables_is_refused() {
    let mut ids = IdGenerator::new();
    let first = labelled(&mut ids, 2, 2, false);
    let second = labelled(&mut ids, 2, 2, false);
    let doc = MemoryDocument::from_delta(document_with(&[&first, &second]));
    let mut editor = TableEditor::new(doc, TableConfig::default()).unwrap();
    let before = editor.host().contents().clone();

    let mut dest = block(&first, 0..1, 0..1);
    dest.extend(block(&second, 0..1, 0..1));
    let err = editor
        .paste(&dest, &TableFragment::from_table(&abcd(&mut ids)))
        .unwrap_err();
    assert!(matches!(err, TableError::CrossTable(_, _)));
    assert_eq!(editor.host().contents(), &before);
}

#[test]
fn test_paste_onto_empty_selection_is_noop() {
    let mut ids = IdGenerator::new();
    let table = labelled(&mut ids, 2, 2, false);
    let mut editor = common::editor_with(&table);
    let fragment = TableFragment::from_table(&abcd(&mut ids));
    assert_eq!(editor.paste(&[], &fragment).unwrap(), None);
}
