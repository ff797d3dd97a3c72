use serde::{Deserialize, Serialize};

use crate::delta::{Attributes, Insert, Op};

/// One inline run: text or an inline embed, with inline formatting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub insert: Insert,
    #[serde(default, skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
}

impl Run {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            insert: Insert::Text(text.into()),
            attributes: Attributes::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.insert.len()
    }

    pub fn is_empty(&self) -> bool {
        self.insert.is_empty()
    }

    pub fn to_op(&self) -> Op {
        Op::Insert {
            insert: self.insert.clone(),
            attributes: self.attributes.clone(),
        }
    }
}

/// A block line: inline runs terminated by a newline that carries the
/// block formatting (lists, headers, alignment). Table structure is not
/// stored here; it is added when the line is serialized.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub runs: Vec<Run>,
    #[serde(default, skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
}

impl Line {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn text(text: &str) -> Self {
        let runs = if text.is_empty() {
            Vec::new()
        } else {
            vec![Run::text(text)]
        };
        Self {
            runs,
            attributes: Attributes::new(),
        }
    }

    /// Length including the terminating newline.
    pub fn len(&self) -> usize {
        self.runs.iter().map(Run::len).sum::<usize>() + 1
    }

    /// Lines always hold at least their newline.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// True for a line with no content and no block formatting.
    pub fn is_blank(&self) -> bool {
        self.attributes.is_empty() && self.runs.iter().all(Run::is_empty)
    }

    pub fn plain_text(&self) -> String {
        self.runs
            .iter()
            .filter_map(|run| run.insert.as_text())
            .collect()
    }

    /// Push a run, merging it into the previous one when formatting matches.
    pub fn push_run(&mut self, run: Run) {
        if run.is_empty() {
            return;
        }
        if let Some(last) = self.runs.last_mut() {
            if last.attributes == run.attributes {
                if let (Insert::Text(a), Insert::Text(b)) = (&mut last.insert, &run.insert) {
                    a.push_str(b);
                    return;
                }
            }
        }
        self.runs.push(run);
    }
}

/// Block-level rich content owned by exactly one cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellContent {
    pub lines: Vec<Line>,
}

impl Default for CellContent {
    fn default() -> Self {
        Self::empty()
    }
}

impl CellContent {
    /// Content holding one empty line.
    pub fn empty() -> Self {
        Self {
            lines: vec![Line::empty()],
        }
    }

    /// One line per `\n`-separated chunk of `text`.
    pub fn from_text(text: &str) -> Self {
        Self {
            lines: text.split('\n').map(Line::text).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.lines.iter().map(Line::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// True when every line is blank.
    pub fn is_blank(&self) -> bool {
        self.lines.iter().all(Line::is_blank)
    }

    pub fn text(&self) -> String {
        self.lines
            .iter()
            .map(Line::plain_text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Restore the at-least-one-line invariant.
    pub fn ensure_line(&mut self) -> bool {
        if self.lines.is_empty() {
            self.lines.push(Line::empty());
            return true;
        }
        false
    }

    /// Append another cell's content, preserving block order.
    ///
    /// Blank content contributes nothing; blank content on the receiving
    /// side is replaced instead of extended.
    pub fn append(&mut self, other: CellContent) {
        if other.is_blank() {
            return;
        }
        if self.is_blank() {
            *self = other;
            return;
        }
        self.lines.extend(other.lines);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_from_text_and_len() {
        let content = CellContent::from_text("ab\ncd");
        assert_eq!(content.lines.len(), 2);
        assert_eq!(content.len(), 6);
        assert_eq!(content.text(), "ab\ncd");
    }

    #[test]
    fn test_append_skips_blank_content() {
        let mut content = CellContent::empty();
        content.append(CellContent::from_text("x"));
        assert_eq!(content.text(), "x");
        content.append(CellContent::empty());
        assert_eq!(content.lines.len(), 1);
        content.append(CellContent::from_text("y"));
        assert_eq!(content.text(), "x\ny");
    }
}
