//! HTML `<table>` to grid tree.
//!
//! Clipboard HTML is rarely well-formed XML, so the reader runs with end
//! name checks off and only the table vocabulary is interpreted. The first
//! top-level `<table>` is imported; tables nested inside cells are read as
//! plain cell text.

use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::Reader;
use serde_json::Value;

use super::attrs::{attr_f32, attr_length, attr_string, attr_u32, parse_length, style_of, tag_name, Length};
use super::{block_attribute, inline_attribute};
use crate::config::TableConfig;
use crate::delta::{Attributes, Insert};
use crate::error::Result;
use crate::grid::flow_layout;
use crate::structure::repair;
use crate::types::{
    count_f32, Align, Caption, CaptionSide, Cell, CellContent, CellStyle, Column, IdGenerator,
    Line, Row, RowGroup, Run, Table,
};

/// Largest spans a browser honours; anything above is clamped.
const MAX_COLSPAN: u32 = 1000;
const MAX_ROWSPAN: u32 = 65534;

#[derive(Debug, Default)]
struct CellBuilder {
    rowspan: u32,
    colspan: u32,
    style: CellStyle,
    width: Option<Length>,
    lines: Vec<Line>,
    current: Line,
    just_broke: bool,
}

impl CellBuilder {
    fn push_text(&mut self, text: &str, attributes: &Attributes) {
        let mut collapsed = String::with_capacity(text.len());
        let mut last_space = self.current.runs.is_empty();
        for c in text.chars() {
            if c.is_whitespace() && c != '\u{a0}' {
                if !last_space {
                    collapsed.push(' ');
                }
                last_space = true;
            } else {
                collapsed.push(c);
                last_space = false;
            }
        }
        if collapsed.is_empty() {
            return;
        }
        self.just_broke = false;
        self.current.push_run(Run {
            insert: Insert::Text(collapsed),
            attributes: attributes.clone(),
        });
    }

    fn push_embed(&mut self, embed: Attributes) {
        self.just_broke = false;
        self.current.push_run(Run {
            insert: Insert::Embed(embed),
            attributes: Attributes::new(),
        });
    }

    fn line_break(&mut self) {
        trim_trailing_space(&mut self.current);
        self.lines.push(std::mem::take(&mut self.current));
        self.just_broke = true;
    }

    fn start_block(&mut self, attributes: Attributes) {
        if !self.current.runs.is_empty() {
            self.line_break();
        }
        self.current.attributes = attributes;
    }

    fn end_block(&mut self) {
        if !self.current.runs.is_empty() || !self.just_broke {
            self.line_break();
        }
    }

    fn finish(mut self) -> (CellStyle, u32, u32, Option<Length>, CellContent) {
        if !self.current.runs.is_empty() || self.lines.is_empty() {
            trim_trailing_space(&mut self.current);
            self.lines.push(self.current);
        }
        (
            self.style,
            self.rowspan.max(1),
            self.colspan.max(1),
            self.width,
            CellContent { lines: self.lines },
        )
    }
}

fn trim_trailing_space(line: &mut Line) {
    if let Some(Run {
        insert: Insert::Text(text),
        ..
    }) = line.runs.last_mut()
    {
        let trimmed = text.trim_end_matches(' ').len();
        text.truncate(trimmed);
    }
    line.runs.retain(|r| !r.is_empty());
}

#[derive(Debug, Default)]
struct RowBuilder {
    group: RowGroup,
    height: Option<f32>,
    cells: Vec<(CellStyle, u32, u32, Option<Length>, CellContent)>,
}

#[derive(Debug, Default)]
struct TableBuilder {
    full: bool,
    align: Align,
    cols: Vec<Option<Length>>,
    rows: Vec<RowBuilder>,
    caption: Option<(CaptionSide, CellBuilder)>,
    group: RowGroup,
}

/// Resolve a column's width: `width` attribute, then inline style width,
/// then the rendered width hint.
fn element_width(e: &BytesStart) -> Option<Length> {
    attr_length(e, "width")
        .or_else(|| style_of(e, "width").and_then(|w| parse_length(&w)))
        .or_else(|| attr_f32(e, "data-rendered-width").map(Length::Px))
}

fn cell_style(e: &BytesStart) -> CellStyle {
    CellStyle {
        background_color: style_of(e, "background-color")
            .or_else(|| style_of(e, "background"))
            .or_else(|| attr_string(e, "bgcolor")),
        border_color: style_of(e, "border-color"),
        css: None,
    }
}

fn text_of(e: &BytesText) -> String {
    let raw = String::from_utf8_lossy(e).into_owned();
    quick_xml::escape::unescape_with(&raw, |entity| match entity {
        "nbsp" => Some("\u{a0}"),
        "ensp" | "emsp" | "thinsp" => Some(" "),
        "ndash" => Some("\u{2013}"),
        "mdash" => Some("\u{2014}"),
        "hellip" => Some("\u{2026}"),
        "copy" => Some("\u{a9}"),
        _ => None,
    })
    .map(|s| s.into_owned())
    .unwrap_or(raw)
}

/// Import the first `<table>` in `html`. `Ok(None)` when there is none.
pub fn import_table(
    html: &str,
    ids: &mut IdGenerator,
    config: &TableConfig,
) -> Result<Option<Table>> {
    let mut reader = Reader::from_str(html);
    reader.trim_text(false);
    reader.check_end_names(false);

    let mut table: Option<TableBuilder> = None;
    let mut row: Option<RowBuilder> = None;
    let mut cell: Option<CellBuilder> = None;
    let mut in_caption = false;
    let mut nested = 0usize;
    let mut inline: Vec<(String, Attributes)> = Vec::new();
    let mut list_kind: Vec<&'static str> = Vec::new();
    let mut done = false;

    while !done {
        let event = reader.read_event()?;
        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let empty = matches!(event, Event::Empty(_));
                let name = tag_name(e);
                if table.is_none() {
                    if name == "table" {
                        table = Some(TableBuilder {
                            full: matches!(
                                element_width(e),
                                Some(Length::Percent(p)) if p >= 99.0
                            ),
                            align: match attr_string(e, "align").as_deref() {
                                Some("center") => Align::Center,
                                Some("right") => Align::Right,
                                _ => Align::Left,
                            },
                            ..TableBuilder::default()
                        });
                    }
                    continue;
                }
                let Some(t) = table.as_mut() else {
                    continue;
                };
                let structural = matches!(
                    name.as_str(),
                    "td" | "th" | "tr" | "thead" | "tbody" | "tfoot" | "colgroup" | "col"
                );
                if structural && nested == 0 {
                    in_caption = false;
                }
                let target = if structural && nested == 0 {
                    None
                } else if in_caption {
                    t.caption.as_mut().map(|(_, c)| c)
                } else {
                    cell.as_mut()
                };
                if let Some(target) = target {
                    if name == "table" && !empty {
                        nested += 1;
                    }
                    if nested > 0 && matches!(name.as_str(), "tr" | "td" | "th") {
                        target.line_break();
                        continue;
                    }
                    match name.as_str() {
                        "br" => target.line_break(),
                        "img" => {
                            if let Some(src) = attr_string(e, "src") {
                                let mut embed = Attributes::new();
                                embed.insert("image".into(), Value::String(src));
                                target.push_embed(embed);
                            }
                        }
                        "ol" | "ul" if !empty => {
                            list_kind.push(if name == "ol" { "ordered" } else { "bullet" })
                        }
                        "li" => {
                            let mut attrs = Attributes::new();
                            let kind = list_kind.last().copied().unwrap_or("bullet");
                            attrs.insert("list".into(), Value::String(kind.into()));
                            target.start_block(attrs);
                        }
                        _ => {
                            if let Some(attrs) = block_attribute(&name) {
                                target.start_block(attrs);
                            } else if !empty {
                                let href = attr_string(e, "href");
                                if let Some(attrs) = inline_attribute(&name, href) {
                                    inline.push((name, attrs));
                                }
                            }
                        }
                    }
                    continue;
                }
                match name.as_str() {
                    "col" => {
                        let span = attr_u32(e, "span").unwrap_or(1).clamp(1, MAX_COLSPAN);
                        let width = element_width(e);
                        for _ in 0..span {
                            t.cols.push(width);
                        }
                    }
                    "thead" => t.group = RowGroup::Head,
                    "tbody" => t.group = RowGroup::Body,
                    "tfoot" => t.group = RowGroup::Foot,
                    "caption" => {
                        let side = match style_of(e, "caption-side").as_deref() {
                            Some("bottom") => CaptionSide::Bottom,
                            _ => CaptionSide::Top,
                        };
                        t.caption = Some((side, CellBuilder::default()));
                        in_caption = !empty;
                    }
                    "tr" => {
                        if let (Some(open), Some(r)) = (cell.take(), row.as_mut()) {
                            r.cells.push(open.finish());
                        }
                        if let Some(done_row) = row.take() {
                            t.rows.push(done_row);
                        }
                        let height = attr_f32(e, "height").or_else(|| {
                            style_of(e, "height").and_then(|h| match parse_length(&h) {
                                Some(Length::Px(px)) => Some(px),
                                _ => None,
                            })
                        });
                        row = Some(RowBuilder {
                            group: t.group,
                            height,
                            cells: Vec::new(),
                        });
                    }
                    "td" | "th" => {
                        let r = row.get_or_insert_with(|| RowBuilder {
                            group: t.group,
                            ..RowBuilder::default()
                        });
                        if let Some(open) = cell.take() {
                            r.cells.push(open.finish());
                        }
                        inline.clear();
                        let builder = CellBuilder {
                            rowspan: attr_u32(e, "rowspan").unwrap_or(1).min(MAX_ROWSPAN),
                            colspan: attr_u32(e, "colspan").unwrap_or(1).min(MAX_COLSPAN),
                            style: cell_style(e),
                            width: element_width(e),
                            ..CellBuilder::default()
                        };
                        if empty {
                            r.cells.push(builder.finish());
                        } else {
                            cell = Some(builder);
                        }
                    }
                    _ => {}
                }
            }
            Event::Text(ref e) => {
                let target = if in_caption {
                    table.as_mut().and_then(|t| t.caption.as_mut()).map(|(_, c)| c)
                } else {
                    cell.as_mut()
                };
                if let Some(target) = target {
                    let mut attrs = Attributes::new();
                    for (_, a) in &inline {
                        attrs.extend(a.clone());
                    }
                    target.push_text(&text_of(e), &attrs);
                }
            }
            Event::CData(ref e) => {
                if let Some(target) = cell.as_mut() {
                    target.push_text(&String::from_utf8_lossy(e), &Attributes::new());
                }
            }
            Event::End(ref e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_ascii_lowercase();
                let Some(t) = table.as_mut() else {
                    continue;
                };
                if nested > 0 {
                    if name == "table" {
                        nested -= 1;
                    }
                    continue;
                }
                if let Some(pos) = inline.iter().rposition(|(n, _)| *n == name) {
                    inline.truncate(pos);
                    continue;
                }
                match name.as_str() {
                    "ol" | "ul" => {
                        list_kind.pop();
                    }
                    "caption" => in_caption = false,
                    "td" | "th" => {
                        if let (Some(open), Some(r)) = (cell.take(), row.as_mut()) {
                            r.cells.push(open.finish());
                        }
                    }
                    "tr" => {
                        if let Some(open) = cell.take() {
                            if let Some(r) = row.as_mut() {
                                r.cells.push(open.finish());
                            }
                        }
                        if let Some(done_row) = row.take() {
                            t.rows.push(done_row);
                        }
                    }
                    "thead" | "tfoot" | "tbody" => t.group = RowGroup::Body,
                    "table" => done = true,
                    _ => {
                        let target = if in_caption {
                            t.caption.as_mut().map(|(_, c)| c)
                        } else {
                            cell.as_mut()
                        };
                        if let Some(target) = target {
                            if block_attribute(&name).is_some() || name == "li" {
                                target.end_block();
                            }
                        }
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    let Some(mut t) = table else {
        return Ok(None);
    };
    if let Some(open) = cell.take() {
        if let Some(r) = row.as_mut() {
            r.cells.push(open.finish());
        }
    }
    if let Some(done_row) = row.take() {
        t.rows.push(done_row);
    }
    Ok(Some(build(t, ids, config)))
}

fn build(t: TableBuilder, ids: &mut IdGenerator, config: &TableConfig) -> Table {
    // Rowspans stop at the last row, so layout never reserves rows that
    // will not exist.
    let row_count = t.rows.len();
    let spans: Vec<Vec<(usize, usize)>> = t
        .rows
        .iter()
        .enumerate()
        .map(|(r, row)| {
            row.cells
                .iter()
                .map(|(_, rs, cs, _, _)| {
                    (
                        crate::grid::span(*rs).min(row_count - r),
                        crate::grid::span(*cs),
                    )
                })
                .collect()
        })
        .collect();
    let positions = flow_layout(&spans);
    let col_count = positions
        .iter()
        .zip(&spans)
        .flat_map(|(pos, span)| pos.iter().zip(span).map(|((_, c), (_, cs))| c + cs))
        .max()
        .unwrap_or(0)
        .max(t.cols.len());

    // Without a colgroup, widths come from single-column cells.
    let mut widths: Vec<Option<Length>> = t.cols.clone();
    widths.resize(col_count, None);
    for (row, pos) in t.rows.iter().zip(&positions) {
        for ((_, _, colspan, width, _), (_, c)) in row.cells.iter().zip(pos) {
            if let (1, Some(w), Some(slot)) = (*colspan, width, widths.get_mut(*c)) {
                if slot.is_none() {
                    *slot = Some(*w);
                }
            }
        }
    }
    let full = t.full || widths.iter().any(|w| matches!(w, Some(Length::Percent(_))));

    let mut table = Table::new(ids.table(), full);
    table.align = t.align;
    table.columns = widths
        .iter()
        .map(|w| Column {
            id: ids.col(),
            width: match (full, w) {
                (true, Some(Length::Percent(p))) => *p,
                (true, _) => 0.0,
                (false, Some(Length::Px(px))) => *px,
                (false, _) => config.default_col_width_px,
            },
        })
        .collect();
    if full {
        fill_missing_percent(&mut table.columns, &widths);
    }

    for (r, (row, pos)) in t.rows.into_iter().zip(positions).enumerate() {
        let mut out = Row::new(ids.row());
        out.group = row.group;
        out.height = row.height;
        for ((style, rowspan, colspan, _, content), (_, c)) in row.cells.into_iter().zip(pos) {
            let Some(col) = table.columns.get(c) else {
                continue;
            };
            out.cells.push(Cell {
                col: col.id.clone(),
                rowspan,
                colspan,
                style,
                content,
            });
        }
        log::trace!("imported row {r} with {} cells", out.cells.len());
        table.rows.push(out);
    }
    if let Some((side, caption)) = t.caption {
        let (_, _, _, _, content) = caption.finish();
        let line = content.lines.into_iter().next().unwrap_or_default();
        if !line.runs.is_empty() {
            table.caption = Some(Caption { side, line });
        }
    }
    repair(&mut table);
    table
}

/// Percent columns with no declared width share what is left of 100.
fn fill_missing_percent(columns: &mut [Column], declared: &[Option<Length>]) {
    let used: f32 = columns.iter().map(|c| c.width).sum();
    let missing = declared
        .iter()
        .filter(|w| !matches!(w, Some(Length::Percent(_))))
        .count();
    if missing == 0 {
        return;
    }
    let share = ((100.0 - used).max(0.0) / count_f32(missing)).max(1.0);
    for (col, w) in columns.iter_mut().zip(declared) {
        if !matches!(w, Some(Length::Percent(_))) {
            col.width = share;
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]
mod tests {
    use super::*;

    fn import(html: &str) -> Table {
        let mut ids = IdGenerator::new();
        import_table(html, &mut ids, &TableConfig::default())
            .unwrap()
            .unwrap()
    }

    #[test]
    fn test_simple_table() {
        let table = import("<table><tr><td>a</td><td>b</td></tr><tr><td>c</td><td>d</td></tr></table>");
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.col_count(), 2);
        assert_eq!(table.rows[1].cells[1].content.text(), "d");
        assert!(!table.full);
        assert_eq!(table.columns[0].width, 100.0);
    }

    #[test]
    fn test_width_priority() {
        let table = import(
            r#"<table><colgroup>
                <col width="120" style="width: 50px" data-rendered-width="10">
                <col style="width: 60px" data-rendered-width="10">
                <col data-rendered-width="70">
                <col>
            </colgroup><tr><td>1</td><td>2</td><td>3</td><td>4</td></tr></table>"#,
        );
        let widths: Vec<f32> = table.columns.iter().map(|c| c.width).collect();
        assert_eq!(widths, vec![120.0, 60.0, 70.0, 100.0]);
    }

    #[test]
    fn test_col_span_expands() {
        let table = import(
            r#"<table><colgroup><col span="3" width="25%"><col width="25%"></colgroup>
            <tr><td colspan="4">x</td></tr><tr><td>1</td><td>2</td><td>3</td><td>4</td></tr></table>"#,
        );
        assert!(table.full);
        assert_eq!(table.col_count(), 4);
        assert!((table.total_width() - 100.0).abs() < 0.01);
        assert_eq!(table.rows[0].cells[0].colspan, 4);
    }

    #[test]
    fn test_groups_caption_and_spans() {
        let table = import(
            r#"<table><caption style="caption-side: bottom">Totals</caption>
            <thead><tr><th>h1</th><th>h2</th></tr></thead>
            <tbody><tr><td rowspan=2>a</td><td>b</td></tr><tr><td>c</td></tr></tbody></table>"#,
        );
        assert_eq!(table.rows[0].group, RowGroup::Head);
        assert_eq!(table.rows[1].group, RowGroup::Body);
        assert_eq!(table.rows[1].cells[0].rowspan, 2);
        assert_eq!(table.rows[2].cells[0].col, table.columns[1].id);
        let caption = table.caption.unwrap();
        assert_eq!(caption.side, CaptionSide::Bottom);
        assert_eq!(caption.line.plain_text(), "Totals");
    }

    #[test]
    fn test_cell_blocks_and_inline_formatting() {
        let table = import(
            "<table><tr><td><p>one <b>bold</b></p><p><br></p><h2>title</h2>line&nbsp;x<br>y</td></tr></table>",
        );
        let lines = &table.rows[0].cells[0].content.lines;
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0].plain_text(), "one bold");
        assert_eq!(lines[0].runs[1].attributes.get("bold"), Some(&Value::Bool(true)));
        assert!(lines[1].runs.is_empty());
        assert_eq!(lines[2].attributes.get("header"), Some(&Value::from(2)));
        assert_eq!(lines[3].plain_text(), "line\u{a0}x");
        assert_eq!(lines[4].plain_text(), "y");
    }

    #[test]
    fn test_no_table_is_none() {
        let mut ids = IdGenerator::new();
        let out = import_table("<p>hello</p>", &mut ids, &TableConfig::default()).unwrap();
        assert!(out.is_none());
    }
}
