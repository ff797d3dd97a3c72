//! Keyed line diff between a table as it sits in the document and the
//! serialization of its edited tree.
//!
//! Groups that keep their key are compared line by line, so an edit that
//! only touches span metadata becomes a format retain on the affected
//! newlines and cell content elsewhere is left alone. When the relative
//! order of surviving groups changes the whole table range is replaced.

use std::collections::HashSet;

use super::{serialize, KeyedGroup, LocatedTable, SegKey, Segment};
use crate::delta::{diff_attributes, Attributes, Op, Splice};
use crate::error::Result;
use crate::types::Table;

/// Splices turning `located` into `table`. A `None` table deletes it.
pub fn table_splices(located: &LocatedTable, table: Option<&Table>) -> Result<Vec<Splice>> {
    let Some(table) = table else {
        return Ok(vec![delete_table_splice(located)]);
    };
    let new_groups = serialize(table)?;
    Ok(diff_groups(located, &new_groups))
}

/// Remove every segment of the table.
pub fn delete_table_splice(located: &LocatedTable) -> Splice {
    Splice::delete(located.offset, located.length)
}

fn whole_replace(located: &LocatedTable, new_groups: &[KeyedGroup]) -> Vec<Splice> {
    let ops: Vec<Op> = new_groups.iter().flat_map(KeyedGroup::ops).collect();
    vec![Splice::replace(located.offset, located.length, ops)]
}

fn has_duplicates(groups: &[KeyedGroup]) -> bool {
    let mut seen = HashSet::new();
    groups.iter().any(|g| !seen.insert(&g.key))
}

fn diff_groups(located: &LocatedTable, new_groups: &[KeyedGroup]) -> Vec<Splice> {
    let old = &located.groups;
    if has_duplicates(old) || has_duplicates(new_groups) {
        log::debug!("table {} has split groups; replacing whole", located.table.id);
        return whole_replace(located, new_groups);
    }
    let old_keys: HashSet<&SegKey> = old.iter().map(|g| &g.key).collect();
    let new_keys: HashSet<&SegKey> = new_groups.iter().map(|g| &g.key).collect();
    let common_old: Vec<&SegKey> = old
        .iter()
        .map(|g| &g.key)
        .filter(|k| new_keys.contains(k))
        .collect();
    let common_new: Vec<&SegKey> = new_groups
        .iter()
        .map(|g| &g.key)
        .filter(|k| old_keys.contains(k))
        .collect();
    if common_old != common_new {
        return whole_replace(located, new_groups);
    }

    let mut splices = Vec::new();
    let (mut oi, mut ni) = (0usize, 0usize);
    loop {
        let at = old.get(oi).map_or(located.end(), |g| g.offset);
        let mut removed = 0usize;
        while let Some(group) = old.get(oi).filter(|g| !new_keys.contains(&g.key)) {
            removed += group.len;
            oi += 1;
        }
        let mut inserted = Vec::new();
        while let Some(group) = new_groups.get(ni).filter(|g| !old_keys.contains(&g.key)) {
            inserted.extend(group.ops());
            ni += 1;
        }
        if removed > 0 || !inserted.is_empty() {
            splices.push(Splice::replace(at, removed, inserted));
        }
        match (old.get(oi), new_groups.get(ni)) {
            (Some(before), Some(after)) => {
                splices.extend(diff_segments(before.offset, &before.segments, &after.segments));
                oi += 1;
                ni += 1;
            }
            (None, None) => break,
            _ => return whole_replace(located, new_groups),
        }
    }
    splices
}

/// Pair the lines of one group index-wise.
fn diff_segments(offset: usize, old: &[Segment], new: &[Segment]) -> Vec<Splice> {
    let mut splices = Vec::new();
    let mut at = offset;
    for i in 0..old.len().max(new.len()) {
        match (old.get(i), new.get(i)) {
            (Some(before), Some(after)) if before == after => at += before.len(),
            (Some(before), Some(after)) => {
                splices.push(
                    restyle(at, before, after)
                        .unwrap_or_else(|| Splice::replace(at, before.len(), after.to_ops())),
                );
                at += before.len();
            }
            (Some(before), None) => {
                splices.push(Splice::delete(at, before.len()));
                at += before.len();
            }
            (None, Some(after)) => splices.push(Splice::insert(at, after.to_ops())),
            (None, None) => {}
        }
    }
    splices
}

/// A format-only edit when content is unchanged and only the newline or
/// embed attributes differ.
fn restyle(at: usize, before: &Segment, after: &Segment) -> Option<Splice> {
    match (before, after) {
        (Segment::Line(a), Segment::Line(b)) if a.runs == b.runs => {
            let inline = a.len() - 1;
            let mut ops = Vec::with_capacity(2);
            if inline > 0 {
                ops.push(Op::Retain {
                    retain: inline,
                    attributes: Attributes::new(),
                });
            }
            ops.push(Op::Retain {
                retain: 1,
                attributes: diff_attributes(&a.attributes, &b.attributes),
            });
            Some(Splice {
                at,
                span: a.len(),
                ops,
            })
        }
        (
            Segment::Embed {
                embed: ea,
                attributes: aa,
            },
            Segment::Embed {
                embed: eb,
                attributes: ab,
            },
        ) if ea == eb => Some(Splice::format(at, 1, diff_attributes(aa, ab))),
        _ => None,
    }
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
    use crate::delta::{compose_splices, Delta};
    use crate::sync::{scan_tables, table_delta, table_ops};
    use crate::types::{CellContent, IdGenerator};

    fn doc_with(table: &Table) -> Delta {
        let mut doc = Delta::new();
        doc.insert("intro\n", Attributes::new());
        for op in table_ops(table).unwrap() {
            doc.push(op);
        }
        doc.insert("outro\n", Attributes::new());
        doc
    }

    fn apply_edit(doc: &Delta, edited: Option<&Table>) -> (Delta, Delta) {
        let located = scan_tables(doc).unwrap().remove(0);
        let patch = compose_splices(table_splices(&located, edited).unwrap()).unwrap();
        (doc.compose(&patch), patch)
    }

    fn expected(table: &Table) -> Delta {
        let mut doc = Delta::new();
        doc.insert("intro\n", Attributes::new());
        doc.concat(&table_delta(table).unwrap())
            .concat(&Delta::from_ops([Op::text("outro\n", Attributes::new())]))
    }

    #[test]
    fn test_content_edit_touches_one_cell() {
        let mut ids = IdGenerator::new();
        let table = Table::balanced(&mut ids, 2, 2, false, 100.0);
        let doc = doc_with(&table);
        let mut edited = table.clone();
        edited.rows[1].cells[1].content = CellContent::from_text("x");
        let (result, patch) = apply_edit(&doc, Some(&edited));
        assert_eq!(result, expected(&edited));
        assert!(patch.ops.iter().any(|op| matches!(op, Op::Delete { delete: 1 })));
    }

    #[test]
    fn test_span_change_is_a_format_retain() {
        let mut ids = IdGenerator::new();
        let table = Table::balanced(&mut ids, 2, 2, false, 100.0);
        let doc = doc_with(&table);
        let mut edited = table.clone();
        edited.rows[0].cells[0].rowspan = 2;
        edited.rows[1].cells.remove(0);
        let (result, patch) = apply_edit(&doc, Some(&edited));
        assert_eq!(result, expected(&edited));
        assert!(!patch
            .ops
            .iter()
            .any(|op| matches!(op, Op::Insert { .. })));
    }

    #[test]
    fn test_reordered_columns_replace_whole_table() {
        let mut ids = IdGenerator::new();
        let table = Table::balanced(&mut ids, 1, 2, false, 100.0);
        let doc = doc_with(&table);
        let mut edited = table.clone();
        edited.columns.swap(0, 1);
        edited.rows[0].cells.swap(0, 1);
        let (result, _) = apply_edit(&doc, Some(&edited));
        assert_eq!(result, expected(&edited));
    }

    #[test]
    fn test_delete_table_leaves_surroundings() {
        let mut ids = IdGenerator::new();
        let table = Table::balanced(&mut ids, 2, 2, false, 100.0);
        let doc = doc_with(&table);
        let (result, _) = apply_edit(&doc, None);
        let mut plain = Delta::new();
        plain.insert("intro\noutro\n", Attributes::new());
        assert_eq!(result, plain);
    }
}
