//! Row and column drag reorder through `TableEditor`.
//!
//! Tables use 100px columns and 32px rows, so track midpoints sit at
//! x = 50 + 100i and y = 16 + 32i.
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]

mod common;

use common::{
    assert_document_canonical, assert_undo_restores, block, cell_ref, document_with, editor_with,
    labelled, spans, texts,
};
use rtgrid::drag::{move_cols, move_rows, Axis, DragRejection};
use rtgrid::{
    ColId, DocumentHost, IdGenerator, MemoryDocument, RowId, Table, TableConfig, TableEditor,
    TableError,
};

fn row_ids(table: &Table) -> Vec<RowId> {
    table.rows.iter().map(|r| r.id.clone()).collect()
}

fn col_ids(table: &Table) -> Vec<ColId> {
    table.columns.iter().map(|c| c.id.clone()).collect()
}

// ============================================================================
// ROWS
// ============================================================================

#[test]
fn test_drag_first_row_below_third() {
    let mut ids = IdGenerator::new();
    let table = labelled(&mut ids, 4, 2, false);
    let mut editor = editor_with(&table);
    let before = editor.host().contents().clone();

    editor
        .begin_drag(Axis::Rows, &block(&table, 0..1, 0..2))
        .unwrap()
        .unwrap();
    assert_eq!(editor.drag_to(80.0).unwrap(), Some(3));
    editor.end_drag().unwrap().unwrap();

    let after = editor.table(&table.id).unwrap();
    let order: Vec<String> = texts(&after).iter().map(|r| r[0].clone()).collect();
    assert_eq!(order, vec!["1,0", "2,0", "0,0", "3,0"]);

    let mut expected = table.clone();
    move_rows(&mut expected, 0..1, 3);
    assert_eq!(row_ids(&after), row_ids(&expected));
    assert_document_canonical(&editor, &table.id);
    assert_undo_restores(&mut editor, &before);
}

#[test]
fn test_drag_band_closed_under_rowspan() {
    let mut ids = IdGenerator::new();
    let mut table = labelled(&mut ids, 4, 2, false);
    table.rows[1].cells[0].rowspan = 2;
    table.rows[2].cells.remove(0);
    let mut editor = editor_with(&table);

    // Only (1,1) is selected; the 2-row cell pulls row 2 into the band.
    editor
        .begin_drag(Axis::Rows, &[cell_ref(&table, 1, 1)])
        .unwrap()
        .unwrap();
    assert_eq!(editor.drag_session().unwrap().band, 1..3);
    assert_eq!(editor.drag_to(5.0).unwrap(), Some(0));
    editor.end_drag().unwrap().unwrap();

    let after = editor.table(&table.id).unwrap();
    assert_eq!(
        spans(&after),
        vec![vec![(2, 1), (1, 1)], vec![(1, 1)], vec![(1, 1), (1, 1)], vec![(1, 1), (1, 1)]]
    );
    assert_eq!(texts(&after)[0], vec!["1,0", "1,1"]);
    assert_eq!(texts(&after)[2], vec!["0,0", "0,1"]);
    assert_document_canonical(&editor, &table.id);
}

#[test]
fn test_row_target_cutting_a_span_is_invalid() {
    let mut ids = IdGenerator::new();
    let mut table = labelled(&mut ids, 4, 2, false);
    table.rows[2].cells[0].rowspan = 2;
    table.rows[3].cells.remove(0);
    let mut editor = editor_with(&table);

    editor
        .begin_drag(Axis::Rows, &[cell_ref(&table, 0, 0)])
        .unwrap()
        .unwrap();
    // Boundary 3 sits inside the 2-row cell.
    assert_eq!(editor.drag_to(90.0).unwrap(), None);
    assert_eq!(editor.drag_to(70.0).unwrap(), Some(2));
    editor.end_drag().unwrap().unwrap();
    assert_document_canonical(&editor, &table.id);
}

// ============================================================================
// COLUMNS
// ============================================================================

#[test]
fn test_drag_last_column_to_front() {
    let mut ids = IdGenerator::new();
    let table = labelled(&mut ids, 3, 3, false);
    let mut editor = editor_with(&table);
    let before = editor.host().contents().clone();

    editor
        .begin_drag(Axis::Cols, &block(&table, 0..3, 2..3))
        .unwrap()
        .unwrap();
    assert_eq!(editor.drag_to(20.0).unwrap(), Some(0));
    editor.end_drag().unwrap().unwrap();

    let after = editor.table(&table.id).unwrap();
    for r in 0..3 {
        assert_eq!(
            texts(&after)[r],
            vec![format!("{r},2"), format!("{r},0"), format!("{r},1")]
        );
    }
    let mut expected = table.clone();
    move_cols(&mut expected, 2..3, 0);
    assert_eq!(col_ids(&after), col_ids(&expected));
    assert_document_canonical(&editor, &table.id);
    assert_undo_restores(&mut editor, &before);
}

#[test]
fn test_drag_column_past_colspan() {
    let mut ids = IdGenerator::new();
    let mut table = labelled(&mut ids, 2, 4, false);
    table.rows[0].cells[0].colspan = 2;
    table.rows[0].cells.remove(1);
    let mut editor = editor_with(&table);

    editor
        .begin_drag(Axis::Cols, &[cell_ref(&table, 1, 3)])
        .unwrap()
        .unwrap();
    // Boundary 1 is inside the 2-column cell.
    assert_eq!(editor.drag_to(120.0).unwrap(), None);
    assert_eq!(editor.drag_to(10.0).unwrap(), Some(0));
    editor.end_drag().unwrap().unwrap();

    let after = editor.table(&table.id).unwrap();
    assert_eq!(texts(&after)[0], vec!["0,3", "0,0", "0,2"]);
    assert_eq!(spans(&after)[0], vec![(1, 1), (1, 2), (1, 1)]);
    assert_eq!(texts(&after)[1], vec!["1,3", "1,0", "1,1", "1,2"]);
    assert_document_canonical(&editor, &table.id);
}

#[test]
fn test_column_widths_travel_with_columns() {
    let mut ids = IdGenerator::new();
    let mut table = labelled(&mut ids, 2, 3, false);
    table.columns[0].width = 180.0;
    let mut editor = editor_with(&table);

    editor
        .begin_drag(Axis::Cols, &[cell_ref(&table, 0, 0)])
        .unwrap()
        .unwrap();
    // Midpoints are now 90, 230, 330.
    assert_eq!(editor.drag_to(400.0).unwrap(), Some(3));
    editor.end_drag().unwrap().unwrap();

    let after = editor.table(&table.id).unwrap();
    assert_eq!(after.columns[2].id, table.columns[0].id);
    assert_eq!(after.columns[2].width, 180.0);
    assert_document_canonical(&editor, &table.id);
}

// ============================================================================
// REJECTIONS
// ============================================================================

#[test]
fn test_band_spanning_all_rows_is_rejected() {
    let mut ids = IdGenerator::new();
    let mut table = labelled(&mut ids, 2, 2, false);
    table.rows[0].cells[0].rowspan = 2;
    table.rows[1].cells.remove(0);
    let mut editor = editor_with(&table);

    let outcome = editor
        .begin_drag(Axis::Rows, &[cell_ref(&table, 1, 1)])
        .unwrap();
    assert_eq!(outcome, Err(DragRejection::SpanningAll));
    assert!(editor.drag_session().is_none());
    assert_eq!(editor.drag_to(10.0).unwrap(), None);
    assert_eq!(editor.end_drag().unwrap(), None);
}

#[test]
fn test_empty_selection_cannot_drag() {
    let mut ids = IdGenerator::new();
    let table = labelled(&mut ids, 2, 2, false);
    let mut editor = editor_with(&table);
    assert_eq!(
        editor.begin_drag(Axis::Cols, &[]).unwrap(),
        Err(DragRejection::Empty)
    );
}

#[test]
fn test_drag_across_tables_is_refused() {
    let mut ids = IdGenerator::new();
    let first = labelled(&mut ids, 3, 2, false);
    let second = labelled(&mut ids, 3, 2, false);
    let doc = MemoryDocument::from_delta(document_with(&[&first, &second]));
    let mut editor = TableEditor::new(doc, TableConfig::default()).unwrap();

    let refs = vec![cell_ref(&first, 0, 0), cell_ref(&second, 0, 0)];
    let err = editor.begin_drag(Axis::Rows, &refs).unwrap_err();
    assert!(matches!(err, TableError::CrossTable(_, _)));
}

#[test]
fn test_cancel_leaves_document_alone() {
    let mut ids = IdGenerator::new();
    let table = labelled(&mut ids, 3, 2, false);
    let mut editor = editor_with(&table);
    let before = editor.host().contents().clone();

    editor
        .begin_drag(Axis::Rows, &block(&table, 0..1, 0..2))
        .unwrap()
        .unwrap();
    assert_eq!(editor.drag_to(100.0).unwrap(), Some(3));
    editor.cancel_drag();
    assert_eq!(editor.end_drag().unwrap(), None);
    assert_eq!(editor.host().contents(), &before);
}
