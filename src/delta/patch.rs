//! Composition of independent edits into a single patch.
//!
//! Structural operations describe their effect as a list of splices, each
//! addressed by an offset into the *original* document. `compose_splices`
//! sorts them and threads an offset accumulator through the list so the
//! result is one delta, and therefore one undo entry.

use super::{Attributes, Delta, Op};
use crate::error::{Result, TableError};

/// An edit at `at` that consumes `span` characters of the original document.
///
/// `ops` may contain retains, deletes and inserts; its retains and deletes
/// must add up to `span`.
#[derive(Debug, Clone, PartialEq)]
pub struct Splice {
    pub at: usize,
    pub span: usize,
    pub ops: Vec<Op>,
}

impl Splice {
    /// Replace `delete` characters at `at` with `insert`.
    pub fn replace(at: usize, delete: usize, insert: Vec<Op>) -> Self {
        let mut ops = insert;
        if delete > 0 {
            ops.push(Op::Delete { delete });
        }
        Self {
            at,
            span: delete,
            ops,
        }
    }

    pub fn insert(at: usize, insert: Vec<Op>) -> Self {
        Self::replace(at, 0, insert)
    }

    pub fn delete(at: usize, len: usize) -> Self {
        Self::replace(at, len, Vec::new())
    }

    /// Change formatting of `len` characters at `at`.
    pub fn format(at: usize, len: usize, attributes: Attributes) -> Self {
        Self {
            at,
            span: len,
            ops: vec![Op::Retain {
                retain: len,
                attributes,
            }],
        }
    }

    pub fn is_noop(&self) -> bool {
        self.ops.iter().all(|op| match op {
            Op::Retain { attributes, .. } => attributes.is_empty(),
            _ => op.is_empty(),
        })
    }
}

/// Compose splices addressed against the same base into one delta.
///
/// Splices are applied in offset order; zero-length inserts sort ahead of
/// edits at the same offset. Overlapping splices are rejected.
pub fn compose_splices(mut splices: Vec<Splice>) -> Result<Delta> {
    splices.retain(|s| !s.is_noop());
    splices.sort_by_key(|s| (s.at, s.span));

    let mut delta = Delta::new();
    let mut cursor = 0usize;
    for splice in splices {
        if splice.at < cursor {
            return Err(TableError::Patch(format!(
                "overlapping edits at offset {} (previous edit ends at {cursor})",
                splice.at
            )));
        }
        delta.retain(splice.at - cursor, Attributes::new());
        for op in splice.ops {
            delta.push(op);
        }
        cursor = splice.at + splice.span;
    }
    Ok(delta.chop())
}
