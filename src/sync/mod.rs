//! Op-stream sync: between the host's flat run sequence and the grid tree.
//!
//! A table occupies a contiguous stretch of the document: an optional top
//! caption line, one `table-col` block embed per column, the lines of every
//! cell row by row, and an optional bottom caption line. Each cell line's
//! newline repeats the cell's full structural attribute; reading collapses
//! that back to one record per cell.

mod diff;

pub use diff::{delete_table_splice, table_splices};

use std::collections::HashSet;

use crate::delta::{Attributes, Delta, Insert, Op};
use crate::error::Result;
use crate::types::{
    embed_structure, encode, line_structure, CaptionAttrs, Caption, Cell, CellAttrs, CellKey,
    CellContent, ColAttrs, ColId, Column, Line, Row, RowId, Run, Structural, Table, TableId,
    CAPTION_KEY, CELL_KEY, COL_KEY,
};

/// Width given to columns referenced by cells but missing a descriptor.
pub const FALLBACK_COL_WIDTH: f32 = 100.0;

/// One unit of the flat document.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// Inline runs terminated by a newline carrying `attributes`.
    Line(Line),
    /// A block embed (column descriptor).
    Embed {
        embed: Attributes,
        attributes: Attributes,
    },
    /// Runs after the final newline of a malformed document.
    Trailing(Vec<Run>),
}

impl Segment {
    pub fn len(&self) -> usize {
        match self {
            Self::Line(line) => line.len(),
            Self::Embed { .. } => 1,
            Self::Trailing(runs) => runs.iter().map(Run::len).sum(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn to_ops(&self) -> Vec<Op> {
        match self {
            Self::Line(line) => {
                let mut ops: Vec<Op> = line.runs.iter().map(Run::to_op).collect();
                ops.push(Op::text("\n", line.attributes.clone()));
                ops
            }
            Self::Embed { embed, attributes } => {
                vec![Op::embed(embed.clone(), attributes.clone())]
            }
            Self::Trailing(runs) => runs.iter().map(Run::to_op).collect(),
        }
    }

    /// Structural attribute carried by this segment, if any.
    pub fn structure(&self) -> Option<Structural> {
        match self {
            Self::Line(line) => line_structure(&line.attributes),
            Self::Embed { embed, .. } => embed_structure(embed),
            Self::Trailing(_) => None,
        }
    }
}

/// Split an insert-only delta into lines and block embeds, with offsets.
pub fn segments(doc: &Delta) -> Vec<(usize, Segment)> {
    let mut out = Vec::new();
    let mut line = Line::empty();
    let mut line_start = 0usize;
    let mut offset = 0usize;

    for op in &doc.ops {
        let Op::Insert { insert, attributes } = op else {
            continue;
        };
        match insert {
            Insert::Embed(embed) if embed.contains_key(COL_KEY) && line.runs.is_empty() => {
                out.push((
                    offset,
                    Segment::Embed {
                        embed: embed.clone(),
                        attributes: attributes.clone(),
                    },
                ));
                offset += 1;
                line_start = offset;
            }
            Insert::Embed(_) => {
                line.push_run(Run {
                    insert: insert.clone(),
                    attributes: attributes.clone(),
                });
                offset += 1;
            }
            Insert::Text(text) => {
                let mut pieces = text.split('\n').peekable();
                while let Some(piece) = pieces.next() {
                    if !piece.is_empty() {
                        line.push_run(Run {
                            insert: Insert::Text(piece.to_string()),
                            attributes: attributes.clone(),
                        });
                        offset += piece.chars().count();
                    }
                    if pieces.peek().is_some() {
                        line.attributes = attributes.clone();
                        offset += 1;
                        out.push((line_start, Segment::Line(std::mem::take(&mut line))));
                        line_start = offset;
                    }
                }
            }
        }
    }
    if !line.runs.is_empty() {
        out.push((line_start, Segment::Trailing(line.runs)));
    }
    out
}

/// Identity of a group of consecutive segments inside a table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SegKey {
    Caption,
    Col(ColId),
    Cell(CellKey),
}

/// Consecutive segments sharing one key, with their document offset.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyedGroup {
    pub key: SegKey,
    pub offset: usize,
    pub len: usize,
    pub segments: Vec<Segment>,
}

impl KeyedGroup {
    pub fn end(&self) -> usize {
        self.offset + self.len
    }

    pub fn ops(&self) -> Vec<Op> {
        self.segments.iter().flat_map(Segment::to_ops).collect()
    }
}

/// A table read out of a document, with where it lives.
#[derive(Debug, Clone)]
pub struct LocatedTable {
    pub offset: usize,
    pub length: usize,
    pub table: Table,
    /// The table's segments exactly as they are in the document.
    pub groups: Vec<KeyedGroup>,
}

impl LocatedTable {
    pub fn end(&self) -> usize {
        self.offset + self.length
    }

    pub fn contains(&self, offset: usize) -> bool {
        offset > self.offset && offset < self.end()
    }

    pub fn group(&self, key: &SegKey) -> Option<&KeyedGroup> {
        self.groups.iter().find(|g| g.key == *key)
    }
}

fn seg_key(structure: &Structural) -> SegKey {
    match structure {
        Structural::Caption(_) => SegKey::Caption,
        Structural::Col(a) => SegKey::Col(a.col_id.clone()),
        Structural::Cell(a) => SegKey::Cell(CellKey {
            row: a.row_id.clone(),
            col: a.col_id.clone(),
        }),
    }
}

/// Read every table in the document.
pub fn scan_tables(doc: &Delta) -> Result<Vec<LocatedTable>> {
    let mut tables = Vec::new();
    let mut current: Vec<(usize, Segment, Structural)> = Vec::new();

    for (offset, segment) in segments(doc) {
        let structure = segment.structure();
        let same_table = match (&structure, current.last()) {
            (Some(s), Some((_, _, prev))) => s.table_id() == prev.table_id(),
            _ => false,
        };
        if !same_table && !current.is_empty() {
            tables.push(build_located(std::mem::take(&mut current)));
        }
        if let Some(s) = structure {
            current.push((offset, segment, s));
        }
    }
    if !current.is_empty() {
        tables.push(build_located(current));
    }
    Ok(tables)
}

/// Read one table by id.
pub fn find_table(doc: &Delta, id: &TableId) -> Result<Option<LocatedTable>> {
    Ok(scan_tables(doc)?.into_iter().find(|t| t.table.id == *id))
}

/// The table whose interior contains `offset`, if any.
pub fn table_at(doc: &Delta, offset: usize) -> Result<Option<LocatedTable>> {
    Ok(scan_tables(doc)?.into_iter().find(|t| t.contains(offset)))
}

/// True when `offset` is the start of a line (or the end of the document).
pub fn is_line_start(doc: &Delta, offset: usize) -> bool {
    offset == 0
        || offset >= doc.length()
        || segments(doc).iter().any(|(start, _)| *start == offset)
}

fn build_located(segments: Vec<(usize, Segment, Structural)>) -> LocatedTable {
    let offset = segments.first().map_or(0, |(o, _, _)| *o);
    let mut groups: Vec<KeyedGroup> = Vec::new();
    for (seg_offset, segment, structure) in &segments {
        let key = seg_key(structure);
        match groups.last_mut() {
            Some(group) if group.key == key => {
                group.len += segment.len();
                group.segments.push(segment.clone());
            }
            _ => groups.push(KeyedGroup {
                key,
                offset: *seg_offset,
                len: segment.len(),
                segments: vec![segment.clone()],
            }),
        }
    }
    let length = groups.iter().map(|g| g.len).sum();
    let table = build_table(&segments);
    LocatedTable {
        offset,
        length,
        table,
        groups,
    }
}

fn strip_key(attributes: &Attributes, key: &str) -> Attributes {
    let mut attributes = attributes.clone();
    attributes.remove(key);
    attributes
}

/// Collapse a table's segments into the grid tree.
///
/// Reading heals what it can: columns referenced by cells but missing a
/// descriptor are appended, and lines of a cell that reappear after other
/// cells are folded back into it. Anything else is left to the repair pass.
fn build_table(segments: &[(usize, Segment, Structural)]) -> Table {
    let id = segments
        .first()
        .map_or_else(|| TableId::new(""), |(_, _, s)| s.table_id().clone());
    let mut table = Table::new(id, false);
    let mut seen_col_attrs = false;
    let mut empty_rows: Vec<(RowId, Vec<RowId>)> = Vec::new();
    let mut last_key: Option<CellKey> = None;

    for (_, segment, structure) in segments {
        match (structure, segment) {
            (Structural::Col(attrs), _) => {
                if !seen_col_attrs {
                    table.full = attrs.full;
                    table.align = attrs.align;
                    seen_col_attrs = true;
                }
                if table.col_index(&attrs.col_id).is_none() {
                    table.columns.push(Column {
                        id: attrs.col_id.clone(),
                        width: attrs.width,
                    });
                }
            }
            (Structural::Caption(attrs), Segment::Line(line)) => {
                table.caption = Some(Caption {
                    side: attrs.side,
                    line: Line {
                        runs: line.runs.clone(),
                        attributes: strip_key(&line.attributes, CAPTION_KEY),
                    },
                });
            }
            (Structural::Cell(attrs), Segment::Line(line)) => {
                let content_line = Line {
                    runs: line.runs.clone(),
                    attributes: strip_key(&line.attributes, CELL_KEY),
                };
                let key = CellKey {
                    row: attrs.row_id.clone(),
                    col: attrs.col_id.clone(),
                };
                add_cell_line(&mut table, attrs, content_line, last_key.as_ref() == Some(&key));
                if !attrs.empty_row.is_empty() {
                    empty_rows.push((attrs.row_id.clone(), attrs.empty_row.clone()));
                }
                last_key = Some(key);
            }
            _ => {}
        }
    }

    for (after, ids) in empty_rows {
        let Some(mut at) = table.row_index(&after) else {
            continue;
        };
        for id in ids {
            if table.row_index(&id).is_some() {
                continue;
            }
            at += 1;
            let mut row = Row::new(id);
            if let Some(prev) = table.rows.get(at - 1) {
                row.group = prev.group;
            }
            table.rows.insert(at.min(table.rows.len()), row);
        }
    }
    table
}

fn add_cell_line(table: &mut Table, attrs: &CellAttrs, line: Line, continues: bool) {
    if table.col_index(&attrs.col_id).is_none() {
        table.columns.push(Column {
            id: attrs.col_id.clone(),
            width: FALLBACK_COL_WIDTH,
        });
    }
    let row_idx = match table.row_index(&attrs.row_id) {
        Some(i) => i,
        None => {
            let mut row = Row::new(attrs.row_id.clone());
            row.group = attrs.row_group;
            row.height = attrs.row_height;
            table.rows.push(row);
            table.rows.len() - 1
        }
    };
    let Some(row) = table.rows.get_mut(row_idx) else {
        return;
    };
    if row.height.is_none() {
        row.height = attrs.row_height;
    }
    if let Some(cell) = row.cells.iter_mut().find(|c| c.col == attrs.col_id) {
        if !continues {
            log::debug!(
                "cell {}/{} of table {} is split across the document; folding",
                attrs.row_id,
                attrs.col_id,
                attrs.table_id
            );
        }
        cell.content.lines.push(line);
        return;
    }
    row.cells.push(Cell {
        col: attrs.col_id.clone(),
        rowspan: attrs.rowspan.max(1),
        colspan: attrs.colspan.max(1),
        style: attrs.style.clone(),
        content: CellContent { lines: vec![line] },
    });
}

/// For each row with cells, the ids of the cell-less rows directly after it.
fn empty_row_runs(table: &Table) -> Vec<Vec<RowId>> {
    let mut runs = vec![Vec::new(); table.rows.len()];
    let mut carrier: Option<usize> = None;
    for (i, row) in table.rows.iter().enumerate() {
        if row.cells.is_empty() {
            if let Some(run) = carrier.and_then(|c| runs.get_mut(c)) {
                run.push(row.id.clone());
            }
        } else {
            carrier = Some(i);
        }
    }
    runs
}

/// Serialize the tree into keyed groups of segments (offsets left at 0).
///
/// Every cell of a row directly followed by cell-less rows carries their
/// ids in `emptyRow`, so reordering cells within a row never moves the
/// marker.
pub fn serialize(table: &Table) -> Result<Vec<KeyedGroup>> {
    let mut groups = Vec::new();
    let mut push = |key: SegKey, segments: Vec<Segment>| {
        let len = segments.iter().map(Segment::len).sum();
        groups.push(KeyedGroup {
            key,
            offset: 0,
            len,
            segments,
        });
    };

    let caption_group = |caption: &Caption| -> Result<Vec<Segment>> {
        let mut attributes = caption.line.attributes.clone();
        attributes.extend(encode(
            CAPTION_KEY,
            &CaptionAttrs {
                table_id: table.id.clone(),
                side: caption.side,
            },
        )?);
        Ok(vec![Segment::Line(Line {
            runs: caption.line.runs.clone(),
            attributes,
        })])
    };

    let top_caption = table
        .caption
        .as_ref()
        .filter(|c| c.side == crate::types::CaptionSide::Top);
    if let Some(caption) = top_caption {
        push(SegKey::Caption, caption_group(caption)?);
    }

    for col in &table.columns {
        let embed = encode(
            COL_KEY,
            &ColAttrs {
                table_id: table.id.clone(),
                col_id: col.id.clone(),
                width: col.width,
                full: table.full,
                align: table.align,
            },
        )?;
        push(
            SegKey::Col(col.id.clone()),
            vec![Segment::Embed {
                embed,
                attributes: Attributes::new(),
            }],
        );
    }

    let runs = empty_row_runs(table);
    for (i, row) in table.rows.iter().enumerate() {
        let empty_row = runs.get(i).cloned().unwrap_or_default();
        for cell in &row.cells {
            let attrs = encode(
                CELL_KEY,
                &CellAttrs {
                    table_id: table.id.clone(),
                    row_id: row.id.clone(),
                    col_id: cell.col.clone(),
                    rowspan: cell.rowspan,
                    colspan: cell.colspan,
                    style: cell.style.clone(),
                    empty_row: empty_row.clone(),
                    row_group: row.group,
                    row_height: row.height,
                },
            )?;
            let segments = cell
                .content
                .lines
                .iter()
                .map(|line| {
                    let mut attributes = line.attributes.clone();
                    attributes.extend(attrs.clone());
                    Segment::Line(Line {
                        runs: line.runs.clone(),
                        attributes,
                    })
                })
                .collect();
            push(
                SegKey::Cell(CellKey {
                    row: row.id.clone(),
                    col: cell.col.clone(),
                }),
                segments,
            );
        }
    }

    let bottom_caption = table
        .caption
        .as_ref()
        .filter(|c| c.side == crate::types::CaptionSide::Bottom);
    if let Some(caption) = bottom_caption {
        push(SegKey::Caption, caption_group(caption)?);
    }
    Ok(groups)
}

/// Insert-only ops for a whole table.
pub fn table_ops(table: &Table) -> Result<Vec<Op>> {
    Ok(serialize(table)?
        .iter()
        .flat_map(KeyedGroup::ops)
        .collect())
}

/// The table as a standalone document fragment.
pub fn table_delta(table: &Table) -> Result<Delta> {
    Ok(Delta::from_ops(table_ops(table)?))
}

/// Every id used by the document's tables, for seeding an id generator.
pub fn collect_ids(doc: &Delta) -> Result<HashSet<String>> {
    let mut ids = HashSet::new();
    for located in scan_tables(doc)? {
        let table = located.table;
        ids.insert(table.id.0);
        for col in table.columns {
            ids.insert(col.id.0);
        }
        for row in table.rows {
            ids.insert(row.id.0);
        }
    }
    Ok(ids)
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;
    use crate::types::IdGenerator;

    fn doc_with(table: &Table) -> Delta {
        let mut doc = Delta::new();
        doc.insert("before\n", Attributes::new());
        for op in table_ops(table).unwrap() {
            doc.push(op);
        }
        doc.insert("after\n", Attributes::new());
        doc
    }

    #[test]
    fn test_segments_split_lines_and_embeds() {
        let mut ids = IdGenerator::new();
        let table = Table::balanced(&mut ids, 1, 2, false, 100.0);
        let doc = doc_with(&table);
        let segs = segments(&doc);
        // before, 2 col embeds, 2 cell lines, after
        assert_eq!(segs.len(), 6);
        assert_eq!(segs[1].0, 7);
        assert!(matches!(segs[1].1, Segment::Embed { .. }));
    }

    #[test]
    fn test_roundtrip_through_document() {
        let mut ids = IdGenerator::new();
        let mut table = Table::balanced(&mut ids, 3, 3, true, 100.0);
        table.rows[0].cells[0].content = CellContent::from_text("a\nb");
        table.rows[0].cells[0].rowspan = 2;
        table.rows[1].cells.remove(0);
        let doc = doc_with(&table);
        let tables = scan_tables(&doc).unwrap();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].offset, 7);
        assert_eq!(tables[0].table, table);
        assert_eq!(
            tables[0].length,
            serialize(&table).unwrap().iter().map(|g| g.len).sum::<usize>()
        );
    }

    #[test]
    fn test_empty_rows_survive_roundtrip() {
        let mut ids = IdGenerator::new();
        let mut table = Table::balanced(&mut ids, 3, 2, false, 100.0);
        table.rows[0].cells[0].rowspan = 2;
        table.rows[0].cells[1].rowspan = 2;
        table.rows[1].cells.clear();
        let doc = doc_with(&table);
        let read = scan_tables(&doc).unwrap().remove(0).table;
        assert_eq!(read.rows.len(), 3);
        assert!(read.rows[1].cells.is_empty());
        assert_eq!(read, table);
    }

    #[test]
    fn test_missing_col_descriptor_is_healed() {
        let mut ids = IdGenerator::new();
        let table = Table::balanced(&mut ids, 1, 2, false, 100.0);
        let groups = serialize(&table).unwrap();
        let mut doc = Delta::new();
        for group in groups.iter().filter(|g| !matches!(g.key, SegKey::Col(_))) {
            for op in group.ops() {
                doc.push(op);
            }
        }
        let read = scan_tables(&doc).unwrap().remove(0).table;
        assert_eq!(read.columns.len(), 2);
        assert_eq!(read.columns[0].id, table.columns[0].id);
    }

    #[test]
    fn test_table_at_interior_offset() {
        let mut ids = IdGenerator::new();
        let table = Table::balanced(&mut ids, 1, 1, false, 100.0);
        let doc = doc_with(&table);
        assert!(table_at(&doc, 7).unwrap().is_none());
        assert!(table_at(&doc, 8).unwrap().is_some());
        assert!(is_line_start(&doc, 7));
        assert!(!is_line_start(&doc, 3));
    }
}
