//! The host's retain/insert/delete patch primitive.
//!
//! A document is a `Delta` made only of inserts; a patch is any `Delta`.
//! Lengths are counted in Unicode scalar values, embeds count as one.
//! Composition and inversion follow the usual rich-text delta rules so a
//! patch's inverse, applied after it, restores the original document.

mod patch;

pub use patch::{compose_splices, Splice};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Formatting attributes attached to an op.
pub type Attributes = serde_json::Map<String, Value>;

/// Inserted content: a text string or a single embed object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Insert {
    Text(String),
    Embed(Attributes),
}

impl Insert {
    pub fn len(&self) -> usize {
        match self {
            Self::Text(s) => s.chars().count(),
            Self::Embed(_) => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Embed(_) => None,
        }
    }

    pub fn as_embed(&self) -> Option<&Attributes> {
        match self {
            Self::Text(_) => None,
            Self::Embed(e) => Some(e),
        }
    }
}

/// A single delta operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Op {
    Insert {
        insert: Insert,
        #[serde(default, skip_serializing_if = "Attributes::is_empty")]
        attributes: Attributes,
    },
    Retain {
        retain: usize,
        #[serde(default, skip_serializing_if = "Attributes::is_empty")]
        attributes: Attributes,
    },
    Delete {
        delete: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OpKind {
    Insert,
    Retain,
    Delete,
}

impl Op {
    pub fn text(text: impl Into<String>, attributes: Attributes) -> Self {
        Self::Insert {
            insert: Insert::Text(text.into()),
            attributes,
        }
    }

    pub fn embed(embed: Attributes, attributes: Attributes) -> Self {
        Self::Insert {
            insert: Insert::Embed(embed),
            attributes,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Insert { insert, .. } => insert.len(),
            Self::Retain { retain, .. } => *retain,
            Self::Delete { delete } => *delete,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn attributes(&self) -> Option<&Attributes> {
        match self {
            Self::Insert { attributes, .. } | Self::Retain { attributes, .. } => Some(attributes),
            Self::Delete { .. } => None,
        }
    }

    fn kind(&self) -> OpKind {
        match self {
            Self::Insert { .. } => OpKind::Insert,
            Self::Retain { .. } => OpKind::Retain,
            Self::Delete { .. } => OpKind::Delete,
        }
    }
}

/// An ordered list of ops: a document (inserts only) or a patch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Delta {
    pub ops: Vec<Op>,
}

impl Delta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_ops(ops: impl IntoIterator<Item = Op>) -> Self {
        let mut delta = Self::new();
        for op in ops {
            delta.push(op);
        }
        delta
    }

    pub fn insert(&mut self, text: impl Into<String>, attributes: Attributes) -> &mut Self {
        self.push(Op::text(text, attributes))
    }

    pub fn insert_embed(&mut self, embed: Attributes, attributes: Attributes) -> &mut Self {
        self.push(Op::embed(embed, attributes))
    }

    pub fn retain(&mut self, length: usize, attributes: Attributes) -> &mut Self {
        self.push(Op::Retain {
            retain: length,
            attributes,
        })
    }

    pub fn delete(&mut self, length: usize) -> &mut Self {
        self.push(Op::Delete { delete: length })
    }

    /// Append an op, merging it with its neighbour where possible.
    ///
    /// Inserts are kept ahead of an adjacent delete so equal patches have
    /// equal op lists.
    pub fn push(&mut self, op: Op) -> &mut Self {
        if op.is_empty() {
            return self;
        }
        if let Op::Delete { delete: n } = &op {
            if let Some(Op::Delete { delete }) = self.ops.last_mut() {
                *delete += *n;
                return self;
            }
        }
        let mut index = self.ops.len();
        if op.kind() == OpKind::Insert && matches!(self.ops.last(), Some(Op::Delete { .. })) {
            index -= 1;
        }
        if index > 0 {
            if let Some(prev) = self.ops.get_mut(index - 1) {
                if merge_into(prev, &op) {
                    return self;
                }
            }
        }
        self.ops.insert(index, op);
        self
    }

    /// Drop a trailing attribute-less retain.
    #[must_use]
    pub fn chop(mut self) -> Self {
        if let Some(Op::Retain { attributes, .. }) = self.ops.last() {
            if attributes.is_empty() {
                self.ops.pop();
            }
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Total length of all ops.
    pub fn length(&self) -> usize {
        self.ops.iter().map(Op::len).sum()
    }

    /// Length of the document this patch expects to be applied to.
    pub fn base_length(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| op.kind() != OpKind::Insert)
            .map(Op::len)
            .sum()
    }

    /// True when the delta contains only inserts.
    pub fn is_document(&self) -> bool {
        self.ops.iter().all(|op| op.kind() == OpKind::Insert)
    }

    /// Concatenate two deltas.
    #[must_use]
    pub fn concat(&self, other: &Delta) -> Delta {
        let mut delta = self.clone();
        for op in &other.ops {
            delta.push(op.clone());
        }
        delta
    }

    /// Ops covering `[start, end)` of this delta.
    #[must_use]
    pub fn slice(&self, start: usize, end: usize) -> Delta {
        let mut delta = Delta::new();
        let mut iter = OpIter::new(&self.ops);
        let mut index = 0;
        while index < end && iter.has_next() {
            let op = if index < start {
                iter.next(start - index)
            } else {
                let op = iter.next(end - index);
                delta.push(op.clone());
                op
            };
            index += op.len();
        }
        delta
    }

    /// Return the delta equivalent to applying `self` then `other`.
    #[must_use]
    pub fn compose(&self, other: &Delta) -> Delta {
        let mut this_iter = OpIter::new(&self.ops);
        let mut other_iter = OpIter::new(&other.ops);
        let mut delta = Delta::new();

        while this_iter.has_next() || other_iter.has_next() {
            if other_iter.peek_kind() == OpKind::Insert {
                delta.push(other_iter.next(usize::MAX));
            } else if this_iter.peek_kind() == OpKind::Delete {
                delta.push(this_iter.next(usize::MAX));
            } else {
                let length = this_iter.peek_length().min(other_iter.peek_length());
                let this_op = this_iter.next(length);
                let other_op = other_iter.next(length);
                match (this_op, other_op) {
                    (
                        Op::Retain {
                            attributes: this_attrs,
                            ..
                        },
                        Op::Retain { attributes, .. },
                    ) => {
                        delta.push(Op::Retain {
                            retain: length,
                            attributes: compose_attributes(&this_attrs, &attributes, true),
                        });
                    }
                    (
                        Op::Insert {
                            insert,
                            attributes: this_attrs,
                        },
                        Op::Retain { attributes, .. },
                    ) => {
                        delta.push(Op::Insert {
                            insert,
                            attributes: compose_attributes(&this_attrs, &attributes, false),
                        });
                    }
                    (Op::Retain { .. }, Op::Delete { delete }) => {
                        delta.push(Op::Delete { delete });
                    }
                    // Insert followed by delete cancels out.
                    _ => {}
                }
            }
        }
        delta.chop()
    }

    /// Return the patch that undoes `self` when applied to `base`.
    #[must_use]
    pub fn invert(&self, base: &Delta) -> Delta {
        let mut inverted = Delta::new();
        let mut base_index = 0;
        for op in &self.ops {
            match op {
                Op::Insert { insert, .. } => {
                    inverted.delete(insert.len());
                }
                Op::Retain {
                    retain,
                    attributes,
                } if attributes.is_empty() => {
                    inverted.retain(*retain, Attributes::new());
                    base_index += retain;
                }
                Op::Retain {
                    retain,
                    attributes,
                } => {
                    let slice = base.slice(base_index, base_index + retain);
                    for base_op in slice.ops {
                        let base_attrs = base_op.attributes().cloned().unwrap_or_default();
                        inverted.retain(base_op.len(), invert_attributes(attributes, &base_attrs));
                    }
                    base_index += retain;
                }
                Op::Delete { delete } => {
                    let slice = base.slice(base_index, base_index + delete);
                    for base_op in slice.ops {
                        inverted.push(base_op);
                    }
                    base_index += delete;
                }
            }
        }
        inverted.chop()
    }
}

fn merge_into(prev: &mut Op, op: &Op) -> bool {
    match (prev, op) {
        (
            Op::Insert {
                insert: Insert::Text(text),
                attributes,
            },
            Op::Insert {
                insert: Insert::Text(more),
                attributes: more_attrs,
            },
        ) if *attributes == *more_attrs => {
            text.push_str(more);
            true
        }
        (
            Op::Retain { retain, attributes },
            Op::Retain {
                retain: more,
                attributes: more_attrs,
            },
        ) if *attributes == *more_attrs => {
            *retain += *more;
            true
        }
        _ => false,
    }
}

/// Overlay `b` on `a`. Null values in `b` remove keys unless `keep_null`.
pub fn compose_attributes(a: &Attributes, b: &Attributes, keep_null: bool) -> Attributes {
    let mut attributes = b.clone();
    if !keep_null {
        attributes.retain(|_, v| !v.is_null());
    }
    for (key, value) in a {
        if !b.contains_key(key) {
            attributes.insert(key.clone(), value.clone());
        }
    }
    attributes
}

/// Attributes that undo applying `attr` on top of `base`.
pub fn invert_attributes(attr: &Attributes, base: &Attributes) -> Attributes {
    let mut inverted = Attributes::new();
    for (key, value) in base {
        if let Some(applied) = attr.get(key) {
            if applied != value {
                inverted.insert(key.clone(), value.clone());
            }
        }
    }
    for key in attr.keys() {
        if !base.contains_key(key) {
            inverted.insert(key.clone(), Value::Null);
        }
    }
    inverted
}

/// Attributes that turn `a` into `b` when applied as a format retain.
pub fn diff_attributes(a: &Attributes, b: &Attributes) -> Attributes {
    let mut diff = Attributes::new();
    for (key, value) in b {
        if a.get(key) != Some(value) {
            diff.insert(key.clone(), value.clone());
        }
    }
    for key in a.keys() {
        if !b.contains_key(key) {
            diff.insert(key.clone(), Value::Null);
        }
    }
    diff
}

fn char_slice(text: &str, start: usize, len: usize) -> String {
    text.chars().skip(start).take(len).collect()
}

/// Cursor over a list of ops that can split ops at arbitrary lengths.
struct OpIter<'a> {
    ops: &'a [Op],
    index: usize,
    offset: usize,
}

impl<'a> OpIter<'a> {
    fn new(ops: &'a [Op]) -> Self {
        Self {
            ops,
            index: 0,
            offset: 0,
        }
    }

    fn has_next(&self) -> bool {
        self.peek_length() < usize::MAX
    }

    fn peek_length(&self) -> usize {
        self.ops
            .get(self.index)
            .map_or(usize::MAX, |op| op.len() - self.offset)
    }

    fn peek_kind(&self) -> OpKind {
        self.ops.get(self.index).map_or(OpKind::Retain, Op::kind)
    }

    fn next(&mut self, length: usize) -> Op {
        let Some(op) = self.ops.get(self.index) else {
            return Op::Retain {
                retain: usize::MAX,
                attributes: Attributes::new(),
            };
        };
        let offset = self.offset;
        let remaining = op.len() - offset;
        let length = if length >= remaining {
            self.index += 1;
            self.offset = 0;
            remaining
        } else {
            self.offset += length;
            length
        };
        match op {
            Op::Delete { .. } => Op::Delete { delete: length },
            Op::Retain { attributes, .. } => Op::Retain {
                retain: length,
                attributes: attributes.clone(),
            },
            Op::Insert {
                insert: Insert::Text(text),
                attributes,
            } => Op::text(char_slice(text, offset, length), attributes.clone()),
            Op::Insert {
                insert: Insert::Embed(embed),
                attributes,
            } => Op::embed(embed.clone(), attributes.clone()),
        }
    }
}
