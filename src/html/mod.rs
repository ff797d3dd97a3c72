//! HTML boundary: clipboard and file interchange.
//!
//! Only the table vocabulary and a small set of inline and block tags map
//! onto document attributes; everything else is read as plain text.

mod attrs;
mod export;
mod import;

pub use attrs::{parse_length, Length};
pub use export::{export_cells, export_html};
pub use import::import_table;

use serde_json::Value;

use crate::delta::Attributes;

/// Inline tags and the run attribute each one sets.
const INLINE_TAGS: &[(&str, &str)] = &[
    ("b", "bold"),
    ("strong", "bold"),
    ("i", "italic"),
    ("em", "italic"),
    ("u", "underline"),
    ("s", "strike"),
    ("strike", "strike"),
    ("del", "strike"),
    ("code", "code"),
];

/// Run attributes for an inline element, if it carries formatting.
fn inline_attribute(tag: &str, href: Option<String>) -> Option<Attributes> {
    let mut attrs = Attributes::new();
    if tag == "a" {
        attrs.insert("link".into(), Value::String(href?));
        return Some(attrs);
    }
    let (_, key) = INLINE_TAGS.iter().find(|(t, _)| *t == tag)?;
    attrs.insert((*key).into(), Value::Bool(true));
    Some(attrs)
}

/// Line attributes for a block element (`p`, `div`, headings).
fn block_attribute(tag: &str) -> Option<Attributes> {
    let mut attrs = Attributes::new();
    match tag {
        "p" | "div" => {}
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
            let level: u8 = tag.get(1..)?.parse().ok()?;
            attrs.insert("header".into(), Value::from(level));
        }
        "blockquote" => {
            attrs.insert("blockquote".into(), Value::Bool(true));
        }
        _ => return None,
    }
    Some(attrs)
}
