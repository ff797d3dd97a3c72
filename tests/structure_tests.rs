//! Structural editing through `TableEditor`.
//!
//! Every operation is checked three ways: the resulting grid, the grid
//! invariants, and that the document holds exactly the re-serialized table
//! (the patch did not drift from the tree). Undo must restore the original.
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]

mod common;

use common::{
    assert_document_canonical, assert_invariants, assert_undo_restores, block, cell_ref,
    editor_with, key, labelled, spans, texts,
};
use rtgrid::delta::{Attributes, Delta};
use rtgrid::sync::{find_table, SegKey, Segment};
use rtgrid::{
    Align, CaptionSide, CellStyle, DocumentHost, IdGenerator, MemoryDocument, TableConfig,
    TableEditor, TableError,
};
use test_case::test_case;

// ============================================================================
// INSERT TABLE
// ============================================================================

#[test_case(0, 3 ; "zero rows")]
#[test_case(3, 0 ; "zero cols")]
#[test_case(30, 3 ; "too many rows")]
#[test_case(3, 30 ; "too many cols")]
fn test_insert_table_rejects_size(rows: usize, cols: usize) {
    let mut editor = TableEditor::new(MemoryDocument::new(), TableConfig::default()).unwrap();
    let err = editor.insert_table(0, rows, cols, false).unwrap_err();
    assert!(matches!(err, TableError::InvalidSize { .. }));
    assert!(editor.tables().unwrap().is_empty());
}

#[test_case(1, 1 ; "single cell")]
#[test_case(3, 3 ; "square")]
#[test_case(29, 29 ; "largest allowed")]
fn test_insert_table_balanced(rows: usize, cols: usize) {
    let mut editor = TableEditor::new(MemoryDocument::new(), TableConfig::default()).unwrap();
    let id = editor.insert_table(0, rows, cols, true).unwrap();
    let table = editor.table(&id).unwrap();
    assert_eq!((table.row_count(), table.col_count()), (rows, cols));
    assert_eq!(table.cell_count(), rows * cols);
    assert_document_canonical(&editor, &id);
}

#[test]
fn test_insert_fixed_width_table_uses_default_width() {
    let mut editor = TableEditor::new(MemoryDocument::new(), TableConfig::default()).unwrap();
    let id = editor.insert_table(0, 2, 4, false).unwrap();
    let table = editor.table(&id).unwrap();
    assert!(table.columns.iter().all(|c| c.width == 100.0));
}

#[test]
fn test_insert_table_inside_cell_rejected() {
    let mut ids = IdGenerator::new();
    let table = labelled(&mut ids, 2, 2, false);
    let mut editor = editor_with(&table);
    let located = editor.tables().unwrap();
    assert_eq!(located.len(), 1);
    // "Intro\n" is 6 long; offset 9 is inside the first cell's text.
    let err = editor.insert_table(9, 2, 2, false).unwrap_err();
    assert!(matches!(err, TableError::InvalidInsertionTarget(_)));
}

#[test]
fn test_ids_do_not_collide_with_existing_tables() {
    let mut ids = IdGenerator::new();
    let table = labelled(&mut ids, 2, 2, false);
    let mut editor = editor_with(&table);
    let id = editor.insert_table(0, 2, 2, false).unwrap();
    assert_ne!(id, table.id);
    let fresh = editor.table(&id).unwrap();
    for col in &fresh.columns {
        assert!(table.col_index(&col.id).is_none());
    }
}

// ============================================================================
// SCENARIO A: append row above
// ============================================================================

#[test]
fn test_scenario_a_append_row_above() {
    let mut editor = TableEditor::new(MemoryDocument::new(), TableConfig::default()).unwrap();
    let id = editor.insert_table(0, 3, 3, false).unwrap();
    let table = editor.table(&id).unwrap();
    let original_rows: Vec<_> = table.rows.iter().map(|r| r.id.clone()).collect();
    let before = editor.host().contents().clone();

    let pivots = block(&table, 0..1, 0..3);
    editor.append_row(&pivots, false).unwrap().unwrap();

    let table = editor.table(&id).unwrap();
    assert_eq!((table.row_count(), table.col_count()), (4, 3));
    assert!(table.rows[0].cells.iter().all(|c| c.content.is_blank()));
    let after: Vec<_> = table.rows[1..].iter().map(|r| r.id.clone()).collect();
    assert_eq!(after, original_rows);
    assert_document_canonical(&editor, &id);
    assert_undo_restores(&mut editor, &before);
}

#[test]
fn test_append_row_grows_straddling_cell() {
    let mut ids = IdGenerator::new();
    let mut table = labelled(&mut ids, 3, 2, false);
    table.rows[0].cells[0].rowspan = 2;
    table.rows[1].cells.remove(0);
    let mut editor = editor_with(&table);

    // Below row 0 cuts through the 2-row cell.
    editor
        .append_row(&[cell_ref(&table, 0, 1)], true)
        .unwrap()
        .unwrap();
    let table = editor.table(&table.id).unwrap();
    assert_eq!(table.row_count(), 4);
    assert_eq!(table.rows[0].cells[0].rowspan, 3);
    assert_eq!(table.rows[1].cells.len(), 1);
    assert_document_canonical(&editor, &table.id);
}

#[test]
fn test_append_col_after_with_colspan() {
    let mut ids = IdGenerator::new();
    let mut table = labelled(&mut ids, 2, 3, false);
    table.rows[0].cells[0].colspan = 2;
    table.rows[0].cells.remove(1);
    let mut editor = editor_with(&table);

    editor
        .append_col(&[cell_ref(&table, 1, 0)], true)
        .unwrap()
        .unwrap();
    let table = editor.table(&table.id).unwrap();
    assert_eq!(table.col_count(), 4);
    assert_eq!(spans(&table)[0], vec![(1, 3), (1, 1)]);
    assert_eq!(table.rows[1].cells.len(), 4);
    assert_document_canonical(&editor, &table.id);
}

// ============================================================================
// SCENARIO B: merge then split
// ============================================================================

#[test]
fn test_scenario_b_merge_split_roundtrip() {
    let mut ids = IdGenerator::new();
    let table = labelled(&mut ids, 4, 4, false);
    let mut editor = editor_with(&table);

    let selected = block(&table, 0..3, 0..3);
    assert_eq!(selected.len(), 9);
    editor.merge_cells(&selected).unwrap().unwrap();

    let merged = editor.table(&table.id).unwrap();
    assert_eq!(merged.cell_count(), 16 - 8);
    assert_eq!(merged.rows[0].cells[0].rowspan, 3);
    assert_eq!(merged.rows[0].cells[0].colspan, 3);
    assert_eq!(
        merged.rows[0].cells[0].content.lines.len(),
        9,
        "content of every merged cell is kept"
    );
    assert_document_canonical(&editor, &table.id);

    editor.split_cell(&cell_ref(&table, 0, 0)).unwrap().unwrap();
    let split = editor.table(&table.id).unwrap();
    assert_eq!(split.cell_count(), 16);
    assert_eq!(spans(&split), spans(&table));
    // Row 4 and column 4 are untouched.
    assert_eq!(texts(&split)[3], texts(&table)[3]);
    for r in 0..3 {
        assert_eq!(texts(&split)[r][3], texts(&table)[r][3]);
    }
    assert_document_canonical(&editor, &table.id);
}

#[test]
fn test_merge_requires_closed_rectangle() {
    let mut ids = IdGenerator::new();
    let mut table = labelled(&mut ids, 3, 3, false);
    table.rows[0].cells[1].rowspan = 2;
    table.rows[1].cells.remove(1);
    let mut editor = editor_with(&table);
    let before = editor.host().contents().clone();

    // (0,0) and (0,1) form a block the 2-row cell sticks out of.
    let selected = vec![cell_ref(&table, 0, 0), cell_ref(&table, 0, 1)];
    assert_eq!(editor.merge_cells(&selected).unwrap(), None);
    assert_eq!(editor.host().contents(), &before);
}

#[test]
fn test_merge_single_cell_is_noop() {
    let mut ids = IdGenerator::new();
    let table = labelled(&mut ids, 2, 2, false);
    let mut editor = editor_with(&table);
    assert_eq!(editor.merge_cells(&[cell_ref(&table, 0, 0)]).unwrap(), None);
}

#[test]
fn test_split_unspanned_cell_is_noop() {
    let mut ids = IdGenerator::new();
    let table = labelled(&mut ids, 2, 2, false);
    let mut editor = editor_with(&table);
    assert_eq!(editor.split_cell(&cell_ref(&table, 1, 1)).unwrap(), None);
}

#[test]
fn test_merge_whole_row_collapses_columns_only_in_that_row() {
    let mut ids = IdGenerator::new();
    let table = labelled(&mut ids, 2, 3, false);
    let mut editor = editor_with(&table);
    editor.merge_cells(&block(&table, 0..1, 0..3)).unwrap().unwrap();
    let merged = editor.table(&table.id).unwrap();
    assert_eq!(merged.col_count(), 3);
    assert_eq!(spans(&merged)[0], vec![(1, 3)]);
    assert_invariants(&merged);
}

#[test]
fn test_merge_full_width_block_collapses_covered_row() {
    let mut ids = IdGenerator::new();
    let table = labelled(&mut ids, 3, 2, false);
    let mut editor = editor_with(&table);
    let before = editor.host().contents().clone();

    editor.merge_cells(&block(&table, 0..2, 0..2)).unwrap().unwrap();
    let merged = editor.table(&table.id).unwrap();
    assert_eq!(merged.row_count(), 2);
    assert_eq!(spans(&merged), vec![vec![(1, 2)], vec![(1, 1), (1, 1)]]);
    assert_eq!(texts(&merged)[1], vec!["2,0", "2,1"]);
    assert_invariants(&merged);
    assert_document_canonical(&editor, &table.id);
    assert_undo_restores(&mut editor, &before);
}

#[test]
fn test_merging_whole_table_in_two_steps_leaves_one_cell() {
    let mut ids = IdGenerator::new();
    let table = labelled(&mut ids, 2, 3, false);
    let width = table.total_width();
    let mut editor = editor_with(&table);

    editor.merge_cells(&block(&table, 0..2, 0..2)).unwrap().unwrap();
    let step = editor.table(&table.id).unwrap();
    // Column 1 no longer starts a cell and folds into column 0.
    assert_eq!(step.col_count(), 2);
    assert_eq!(spans(&step), vec![vec![(2, 1), (1, 1)], vec![(1, 1)]]);

    let rest = vec![cell_ref(&step, 0, 0), cell_ref(&step, 0, 1), cell_ref(&step, 1, 1)];
    editor.merge_cells(&rest).unwrap().unwrap();
    let merged = editor.table(&table.id).unwrap();
    assert_eq!((merged.row_count(), merged.col_count()), (1, 1));
    assert_eq!(spans(&merged), vec![vec![(1, 1)]]);
    assert_eq!(merged.total_width(), width);
    let text = merged.rows[0].cells[0].content.text();
    assert!(text.contains("0,0") && text.contains("1,2"));
    assert_document_canonical(&editor, &table.id);
}

// ============================================================================
// SCENARIO D: remove column keeps width
// ============================================================================

#[test]
fn test_scenario_d_remove_col_conserves_width() {
    let mut ids = IdGenerator::new();
    let table = labelled(&mut ids, 3, 3, false);
    let width = table.total_width();
    let mut editor = editor_with(&table);
    let before = editor.host().contents().clone();

    editor.remove_col(&block(&table, 0..3, 1..2)).unwrap().unwrap();
    let after = editor.table(&table.id).unwrap();
    assert_eq!((after.row_count(), after.col_count()), (3, 2));
    assert_eq!(after.total_width(), width);
    assert_eq!(texts(&after)[1], vec!["1,0", "1,2"]);
    assert_document_canonical(&editor, &table.id);
    assert_undo_restores(&mut editor, &before);
}

#[test_case(0 ; "first column")]
#[test_case(1 ; "middle column")]
#[test_case(3 ; "last column")]
fn test_remove_col_in_percent_table(col: usize) {
    let mut ids = IdGenerator::new();
    let table = labelled(&mut ids, 2, 4, true);
    let mut editor = editor_with(&table);
    editor
        .remove_col(&[cell_ref(&table, 0, col)])
        .unwrap()
        .unwrap();
    let after = editor.table(&table.id).unwrap();
    assert_eq!(after.col_count(), 3);
    assert_invariants(&after);
}

#[test]
fn test_remove_col_shrinks_spanning_cell() {
    let mut ids = IdGenerator::new();
    let mut table = labelled(&mut ids, 2, 3, false);
    table.rows[0].cells[0].colspan = 3;
    table.rows[0].cells.truncate(1);
    let mut editor = editor_with(&table);
    editor
        .remove_col(&[cell_ref(&table, 1, 1)])
        .unwrap()
        .unwrap();
    let after = editor.table(&table.id).unwrap();
    assert_eq!(spans(&after), vec![vec![(1, 2)], vec![(1, 1), (1, 1)]]);
    assert_document_canonical(&editor, &table.id);
}

// ============================================================================
// REMOVE ROW
// ============================================================================

#[test]
fn test_remove_row_carries_spanning_cell_down() {
    let mut ids = IdGenerator::new();
    let mut table = labelled(&mut ids, 3, 2, false);
    table.rows[0].cells[0].rowspan = 3;
    table.rows[1].cells.remove(0);
    table.rows[2].cells.remove(0);
    let mut editor = editor_with(&table);

    editor
        .remove_row(&[cell_ref(&table, 0, 1)])
        .unwrap()
        .unwrap();
    let after = editor.table(&table.id).unwrap();
    assert_eq!(after.row_count(), 2);
    assert_eq!(spans(&after)[0], vec![(2, 1), (1, 1)]);
    assert_eq!(texts(&after)[0][0], "0,0");
    assert_document_canonical(&editor, &table.id);
}

#[test]
fn test_remove_row_shrinks_cell_from_above() {
    let mut ids = IdGenerator::new();
    let mut table = labelled(&mut ids, 3, 2, false);
    table.rows[0].cells[0].rowspan = 2;
    table.rows[1].cells.remove(0);
    let mut editor = editor_with(&table);
    editor
        .remove_row(&[cell_ref(&table, 1, 1)])
        .unwrap()
        .unwrap();
    let after = editor.table(&table.id).unwrap();
    assert_eq!(spans(&after), vec![vec![(1, 1), (1, 1)], vec![(1, 1), (1, 1)]]);
    assert_document_canonical(&editor, &table.id);
}

#[test]
fn test_remove_all_rows_deletes_table() {
    let mut ids = IdGenerator::new();
    let table = labelled(&mut ids, 2, 2, false);
    let mut editor = editor_with(&table);
    editor.remove_row(&block(&table, 0..2, 0..1)).unwrap().unwrap();
    assert!(editor.tables().unwrap().is_empty());
    assert!(matches!(
        editor.table(&table.id),
        Err(TableError::TableNotFound(_))
    ));
}

// ============================================================================
// REPAIR OF EXTERNAL EDITS
// ============================================================================

#[test]
fn test_external_delete_of_cell_line_is_repaired() {
    let mut ids = IdGenerator::new();
    let table = labelled(&mut ids, 2, 2, false);
    let mut editor = editor_with(&table);

    // Delete the last cell's text and newline: "1,1\n".
    let located = rtgrid::sync::find_table(editor.host().contents(), &table.id)
        .unwrap()
        .unwrap();
    let mut patch = Delta::new();
    patch.retain(located.end() - 4, Attributes::new()).delete(4);
    editor.host_mut().apply(&patch).unwrap();

    let patch = editor.on_external_change().unwrap().unwrap();
    assert!(!patch.is_empty());
    let repaired = editor.table(&table.id).unwrap();
    assert_eq!(repaired.cell_count(), 4);
    assert!(repaired.rows[1].cells[1].content.is_blank());
    assert_document_canonical(&editor, &table.id);

    // Repair is idempotent.
    assert_eq!(editor.on_external_change().unwrap(), None);
}

/// Overwrite one field of a cell's `table-cell` attribute on its newline,
/// the way a foreign writer would.
fn write_cell_field(
    editor: &mut TableEditor<MemoryDocument>,
    table: &rtgrid::Table,
    r: usize,
    c: usize,
    field: &str,
    value: serde_json::Value,
) {
    let located = find_table(editor.host().contents(), &table.id)
        .unwrap()
        .unwrap();
    let group = located.group(&SegKey::Cell(key(table, r, c))).unwrap();
    let Segment::Line(line) = group.segments.last().unwrap() else {
        panic!("cell lines are text lines");
    };
    let mut attributes = line.attributes.clone();
    attributes.get_mut("table-cell").unwrap()[field] = value;
    let mut patch = Delta::new();
    patch.retain(group.end() - 1, Attributes::new()).retain(1, attributes);
    editor.host_mut().apply(&patch).unwrap();
}

#[test]
fn test_external_string_rowspan_is_repaired() {
    let mut ids = IdGenerator::new();
    let table = labelled(&mut ids, 3, 2, false);
    let mut editor = editor_with(&table);
    write_cell_field(&mut editor, &table, 0, 0, "rowspan", serde_json::json!("2"));

    // The damaged document still opens.
    let damaged = editor.host().contents().clone();
    let reopened = TableEditor::new(MemoryDocument::from_delta(damaged), TableConfig::default());
    assert!(reopened.is_ok());

    let patch = editor.on_external_change().unwrap().unwrap();
    assert!(!patch.is_empty());
    let repaired = editor.table(&table.id).unwrap();
    assert_eq!(
        spans(&repaired),
        vec![vec![(2, 1), (1, 1)], vec![(1, 1)], vec![(1, 1), (1, 1)]]
    );
    assert_eq!(texts(&repaired)[0][0], "0,0\n1,0");
    assert_document_canonical(&editor, &table.id);
    assert_eq!(editor.on_external_change().unwrap(), None);
}

#[test]
fn test_external_damage_without_structural_change_is_rewritten() {
    let mut ids = IdGenerator::new();
    let table = labelled(&mut ids, 2, 2, false);
    let mut editor = editor_with(&table);
    write_cell_field(&mut editor, &table, 1, 1, "colspan", serde_json::json!("1"));

    assert!(editor.on_external_change().unwrap().is_some());
    let repaired = editor.table(&table.id).unwrap();
    assert_eq!(spans(&repaired), spans(&table));
    assert_eq!(texts(&repaired), texts(&table));
    assert_document_canonical(&editor, &table.id);
}

#[test]
fn test_no_external_change_means_no_patch() {
    let mut ids = IdGenerator::new();
    let table = labelled(&mut ids, 3, 3, true);
    let mut editor = editor_with(&table);
    assert_eq!(editor.on_external_change().unwrap(), None);
}

// ============================================================================
// SIZING, STYLE, CAPTION
// ============================================================================

#[test]
fn test_set_column_width_clamps_and_compensates() {
    let mut ids = IdGenerator::new();
    let table = labelled(&mut ids, 1, 4, true);
    let mut editor = editor_with(&table);
    editor
        .set_column_width(&table.id, &table.columns[1].id, 1.0)
        .unwrap()
        .unwrap();
    let after = editor.table(&table.id).unwrap();
    assert_eq!(after.columns[1].width, TableConfig::default().min_col_width_percent);
    assert_invariants(&after);
    assert_document_canonical(&editor, &table.id);
}

#[test]
fn test_set_row_height_roundtrips_through_document() {
    let mut ids = IdGenerator::new();
    let table = labelled(&mut ids, 2, 2, false);
    let mut editor = editor_with(&table);
    editor
        .set_row_height(&table.id, &table.rows[1].id, Some(10.0))
        .unwrap()
        .unwrap();
    let after = editor.table(&table.id).unwrap();
    assert_eq!(after.rows[1].height, Some(TableConfig::default().min_row_height_px));
    editor
        .set_row_height(&table.id, &table.rows[1].id, None)
        .unwrap()
        .unwrap();
    assert_eq!(editor.table(&table.id).unwrap().rows[1].height, None);
}

#[test]
fn test_style_alignment_caption() {
    let mut ids = IdGenerator::new();
    let table = labelled(&mut ids, 2, 2, false);
    let mut editor = editor_with(&table);

    let style = CellStyle {
        background_color: Some("#336699".into()),
        border_color: Some("rgb(0, 0, 0)".into()),
        css: None,
    };
    editor
        .set_cell_style(&block(&table, 0..1, 0..2), &style)
        .unwrap()
        .unwrap();
    editor.set_alignment(&table.id, Align::Center).unwrap().unwrap();
    editor
        .set_caption(&table.id, Some(("Quarterly", CaptionSide::Bottom)))
        .unwrap()
        .unwrap();

    let after = editor.table(&table.id).unwrap();
    assert_eq!(after.rows[0].cells[1].style, style);
    assert!(after.rows[1].cells[0].style.is_empty());
    assert_eq!(after.align, Align::Center);
    let caption = after.caption.as_ref().unwrap();
    assert_eq!((caption.side, caption.line.plain_text().as_str()), (CaptionSide::Bottom, "Quarterly"));
    assert_eq!(editor.recent_colors(), vec!["#000000", "#336699"]);
    assert_document_canonical(&editor, &table.id);

    editor.set_caption(&table.id, None).unwrap().unwrap();
    assert!(editor.table(&table.id).unwrap().caption.is_none());
}

#[test]
fn test_set_full_converts_widths() {
    let mut ids = IdGenerator::new();
    let table = labelled(&mut ids, 1, 4, false);
    let mut editor = editor_with(&table);
    editor.set_full(&table.id, true).unwrap().unwrap();
    let after = editor.table(&table.id).unwrap();
    assert!(after.full);
    assert!(after.columns.iter().all(|c| (c.width - 25.0).abs() < 0.01));
    assert_invariants(&after);
}

#[test]
fn test_delete_table_restores_surrounding_text() {
    let mut ids = IdGenerator::new();
    let table = labelled(&mut ids, 2, 2, false);
    let mut editor = editor_with(&table);
    let before = editor.host().contents().clone();
    editor.delete_table(&table.id).unwrap().unwrap();
    assert_eq!(editor.host().text(), "Intro\nBetween\n");
    assert_undo_restores(&mut editor, &before);
}
