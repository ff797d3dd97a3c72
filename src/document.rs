//! Host document interface.
//!
//! The engine never edits text directly: it reads the host's current
//! contents and hands back one patch per operation. `MemoryDocument` is a
//! minimal in-memory host with a linear undo/redo history, used by the CLI,
//! the WASM bindings and the tests.

use crate::delta::Delta;
use crate::error::{Result, TableError};

/// What the engine needs from the document that embeds its tables.
pub trait DocumentHost {
    /// Current contents as an insert-only delta.
    fn contents(&self) -> &Delta;

    /// Apply a patch as one history entry.
    fn apply(&mut self, patch: &Delta) -> Result<()>;
}

/// In-memory document with undo/redo.
#[derive(Debug, Clone)]
pub struct MemoryDocument {
    contents: Delta,
    undo_stack: Vec<Delta>,
    redo_stack: Vec<Delta>,
}

impl Default for MemoryDocument {
    fn default() -> Self {
        let mut contents = Delta::new();
        contents.insert("\n", crate::delta::Attributes::new());
        Self::from_delta(contents)
    }
}

impl MemoryDocument {
    /// An empty document (a single empty line).
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_delta(contents: Delta) -> Self {
        Self {
            contents,
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
        }
    }

    pub fn length(&self) -> usize {
        self.contents.length()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Revert the most recent patch. Returns the patch that was applied.
    pub fn undo(&mut self) -> Option<Delta> {
        let inverse = self.undo_stack.pop()?;
        let redo = inverse.invert(&self.contents);
        self.contents = self.contents.compose(&inverse);
        self.redo_stack.push(redo);
        Some(inverse)
    }

    /// Re-apply the most recently undone patch.
    pub fn redo(&mut self) -> Option<Delta> {
        let patch = self.redo_stack.pop()?;
        let inverse = patch.invert(&self.contents);
        self.contents = self.contents.compose(&patch);
        self.undo_stack.push(inverse);
        Some(patch)
    }

    /// Plain text of the document; embeds are skipped.
    pub fn text(&self) -> String {
        self.contents
            .ops
            .iter()
            .filter_map(|op| match op {
                crate::delta::Op::Insert { insert, .. } => insert.as_text(),
                _ => None,
            })
            .collect()
    }
}

impl DocumentHost for MemoryDocument {
    fn contents(&self) -> &Delta {
        &self.contents
    }

    fn apply(&mut self, patch: &Delta) -> Result<()> {
        let length = self.contents.length();
        if patch.base_length() > length {
            return Err(TableError::Patch(format!(
                "patch expects {} characters, document has {length}",
                patch.base_length()
            )));
        }
        let inverse = patch.invert(&self.contents);
        self.contents = self.contents.compose(patch);
        self.undo_stack.push(inverse);
        self.redo_stack.clear();
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::delta::Attributes;

    #[test]
    fn test_apply_then_undo_redo() {
        let mut doc = MemoryDocument::new();
        let mut patch = Delta::new();
        patch.insert("hi", Attributes::new());
        doc.apply(&patch).unwrap();
        assert_eq!(doc.text(), "hi\n");
        doc.undo().unwrap();
        assert_eq!(doc.text(), "\n");
        doc.redo().unwrap();
        assert_eq!(doc.text(), "hi\n");
        assert!(doc.can_undo());
        assert!(!doc.can_redo());
    }

    #[test]
    fn test_patch_longer_than_document_is_rejected() {
        let mut doc = MemoryDocument::new();
        let mut patch = Delta::new();
        patch.retain(5, Attributes::new()).delete(1);
        assert!(doc.apply(&patch).is_err());
    }
}
