//! Writes a table out as an HTML `<table>` for the clipboard.
//!
//! The output is plain markup that the importer reads back: widths go on
//! `<col>` elements, spans and cell decoration on `<td>`, and every content
//! line becomes its own block element.

use std::fmt::Write as _;

use serde_json::Value;

use super::attrs::escape;
use crate::delta::{Attributes, Insert};
use crate::paste::extract;
use crate::types::{Align, CaptionSide, CellKey, Line, Run, Table};

/// Inline attributes and the tags they open, outermost first.
const INLINE_MARKUP: &[(&str, &str)] = &[
    ("bold", "strong"),
    ("italic", "em"),
    ("underline", "u"),
    ("strike", "s"),
    ("code", "code"),
];

/// Serialize the whole table.
pub fn export_html(table: &Table) -> String {
    let mut out = String::with_capacity(256 + table.cell_count() * 64);

    let mut style = String::from("border-collapse: collapse");
    if table.full {
        style.push_str("; width: 100%");
    } else {
        let _ = write!(style, "; width: {}px", number(table.total_width()));
    }
    match table.align {
        Align::Left => {}
        Align::Center => style.push_str("; margin-left: auto; margin-right: auto"),
        Align::Right => style.push_str("; margin-left: auto"),
    }
    let _ = write!(out, "<table style=\"{}\">", escape(&style));

    if let Some(caption) = &table.caption {
        match caption.side {
            CaptionSide::Top => out.push_str("<caption>"),
            CaptionSide::Bottom => out.push_str("<caption style=\"caption-side: bottom\">"),
        }
        write_runs(&mut out, &caption.line.runs);
        out.push_str("</caption>");
    }

    // <colgroup>
    out.push_str("<colgroup>");
    for column in &table.columns {
        if table.full {
            let _ = write!(out, "<col width=\"{}%\">", number(column.width));
        } else {
            let _ = write!(out, "<col width=\"{}\">", number(column.width));
        }
    }
    out.push_str("</colgroup>");

    // Row groups are written as contiguous runs of the same group.
    let mut open_group = None;
    for row in &table.rows {
        if open_group != Some(row.group) {
            if let Some(group) = open_group {
                let _ = write!(out, "</{}>", group.tag());
            }
            let _ = write!(out, "<{}>", row.group.tag());
            open_group = Some(row.group);
        }
        match row.height {
            Some(height) => {
                let _ = write!(out, "<tr style=\"height: {}px\">", number(height));
            }
            None => out.push_str("<tr>"),
        }
        for cell in &row.cells {
            out.push_str("<td");
            if cell.rowspan > 1 {
                let _ = write!(out, " rowspan=\"{}\"", cell.rowspan);
            }
            if cell.colspan > 1 {
                let _ = write!(out, " colspan=\"{}\"", cell.colspan);
            }
            let css = cell.style.to_css();
            if !css.is_empty() {
                let _ = write!(out, " style=\"{}\"", escape(&css));
            }
            out.push('>');
            write_lines(&mut out, &cell.content.lines);
            out.push_str("</td>");
        }
        out.push_str("</tr>");
    }
    if let Some(group) = open_group {
        let _ = write!(out, "</{}>", group.tag());
    }

    out.push_str("</table>");
    out
}

/// Serialize only the selected cells, clipped to their bounding block.
pub fn export_cells(table: &Table, selected: &[CellKey]) -> Option<String> {
    extract(table, selected).map(|subset| export_html(&subset))
}

fn write_lines(out: &mut String, lines: &[Line]) {
    let mut open_list: Option<&str> = None;
    for line in lines {
        let list = match line.attributes.get("list").and_then(Value::as_str) {
            Some("ordered") => Some("ol"),
            Some(_) => Some("ul"),
            None => None,
        };
        if open_list != list {
            if let Some(tag) = open_list {
                let _ = write!(out, "</{tag}>");
            }
            if let Some(tag) = list {
                let _ = write!(out, "<{tag}>");
            }
            open_list = list;
        }
        let tag = block_tag(line);
        let _ = write!(out, "<{tag}>");
        if line.runs.iter().all(Run::is_empty) {
            out.push_str("<br>");
        } else {
            write_runs(out, &line.runs);
        }
        let _ = write!(out, "</{tag}>");
    }
    if let Some(tag) = open_list {
        let _ = write!(out, "</{tag}>");
    }
}

fn block_tag(line: &Line) -> String {
    if line.attributes.contains_key("list") {
        return "li".to_string();
    }
    if line.attributes.get("blockquote").and_then(Value::as_bool) == Some(true) {
        return "blockquote".to_string();
    }
    match line.attributes.get("header").and_then(Value::as_u64) {
        Some(level @ 1..=6) => format!("h{level}"),
        _ => "p".to_string(),
    }
}

fn write_runs(out: &mut String, runs: &[Run]) {
    for run in runs {
        match &run.insert {
            Insert::Text(text) => {
                let (open, close) = inline_tags(&run.attributes);
                out.push_str(&open);
                for (i, part) in text.split('\n').enumerate() {
                    if i > 0 {
                        out.push_str("<br>");
                    }
                    out.push_str(&escape(part));
                }
                out.push_str(&close);
            }
            Insert::Embed(embed) => {
                if let Some(src) = embed.get("image").and_then(Value::as_str) {
                    let _ = write!(out, "<img src=\"{}\">", escape(src));
                }
            }
        }
    }
}

fn inline_tags(attributes: &Attributes) -> (String, String) {
    let mut open = String::new();
    let mut close = Vec::new();
    if let Some(href) = attributes.get("link").and_then(Value::as_str) {
        let _ = write!(open, "<a href=\"{}\">", escape(href));
        close.push("</a>".to_string());
    }
    for (key, tag) in INLINE_MARKUP {
        if attributes.get(*key).and_then(Value::as_bool) == Some(true) {
            let _ = write!(open, "<{tag}>");
            close.push(format!("</{tag}>"));
        }
    }
    close.reverse();
    (open, close.concat())
}

/// Format a width without a trailing `.0`.
fn number(value: f32) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    if rounded.fract().abs() < f32::EPSILON {
        format!("{rounded:.0}")
    } else {
        format!("{rounded}")
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp
)]
mod tests {
    use super::*;
    use crate::config::TableConfig;
    use crate::html::import_table;
    use crate::types::{Caption, CellContent, CellStyle, IdGenerator, RowGroup};

    #[test]
    fn test_export_spans_and_widths() {
        let mut ids = IdGenerator::new();
        let mut table = Table::balanced(&mut ids, 2, 2, false, 120.0);
        table.rows[0].cells[0].colspan = 2;
        table.rows[0].cells.remove(1);
        table.rows[1].height = Some(40.0);
        let html = export_html(&table);
        assert!(html.contains("<col width=\"120\">"));
        assert!(html.contains("<td colspan=\"2\">"));
        assert!(html.contains("<tr style=\"height: 40px\">"));
        assert!(html.contains("<p><br></p>"));
    }

    #[test]
    fn test_export_escapes_and_formats() {
        let mut ids = IdGenerator::new();
        let mut table = Table::balanced(&mut ids, 1, 1, true, 100.0);
        let mut run = Run::text("a < b");
        run.attributes.insert("bold".into(), Value::Bool(true));
        run.attributes.insert("link".into(), Value::String("https://x.test".into()));
        let mut line = Line::empty();
        line.push_run(run);
        line.attributes.insert("header".into(), Value::from(2));
        table.rows[0].cells[0].content = CellContent { lines: vec![line] };
        let html = export_html(&table);
        assert!(html.contains("<col width=\"100%\">"));
        assert!(html.contains("<h2><a href=\"https://x.test\"><strong>a &lt; b</strong></a></h2>"));
    }

    #[test]
    fn test_export_then_import_keeps_structure() {
        let mut ids = IdGenerator::new();
        let mut table = Table::balanced(&mut ids, 3, 3, false, 90.0);
        table.rows[0].group = RowGroup::Head;
        table.rows[1].cells[0].rowspan = 2;
        table.rows[2].cells.remove(0);
        table.rows[1].cells[1].content = CellContent::from_text("middle");
        table.rows[1].cells[1].style = CellStyle {
            background_color: Some("#ff0000".into()),
            ..CellStyle::default()
        };
        table.caption = Some(Caption {
            side: CaptionSide::Bottom,
            line: Line::text("Totals"),
        });

        let html = export_html(&table);
        let back = import_table(&html, &mut ids, &TableConfig::default())
            .unwrap()
            .unwrap();
        assert_eq!(back.row_count(), 3);
        assert_eq!(back.col_count(), 3);
        assert!(back.columns.iter().all(|c| c.width == 90.0));
        assert_eq!(back.rows[0].group, RowGroup::Head);
        assert_eq!(back.rows[1].cells[0].rowspan, 2);
        assert_eq!(back.rows[2].cells.len(), 2);
        assert_eq!(back.rows[1].cells[1].content.text(), "middle");
        assert_eq!(
            back.rows[1].cells[1].style.background_color.as_deref(),
            Some("#ff0000")
        );
        assert_eq!(back.caption.unwrap().side, CaptionSide::Bottom);
    }

    #[test]
    fn test_export_cells_clips_to_selection() {
        let mut ids = IdGenerator::new();
        let table = Table::balanced(&mut ids, 3, 3, false, 100.0);
        let selected = vec![CellKey {
            row: table.rows[1].id.clone(),
            col: table.columns[1].id.clone(),
        }];
        let html = export_cells(&table, &selected).unwrap();
        assert_eq!(html.matches("<td").count(), 1);
        assert_eq!(html.matches("<col ").count(), 1);
    }
}
