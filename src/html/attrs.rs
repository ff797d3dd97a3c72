//! Attribute and inline-style helpers for HTML elements.
//!
//! HTML attributes may be unquoted or valueless, so everything here goes
//! through `html_attributes()`. Names compare case-insensitively.

use quick_xml::events::BytesStart;

/// A CSS length: pixels or a percentage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Length {
    Px(f32),
    Percent(f32),
}

/// Extract a string attribute value by key.
///
/// Returns `None` if the attribute is missing or not valid UTF-8.
pub fn attr_string(e: &BytesStart, key: &str) -> Option<String> {
    for attr in e.html_attributes().flatten() {
        if attr.key.as_ref().eq_ignore_ascii_case(key.as_bytes()) {
            return match attr.unescape_value() {
                Ok(value) => Some(value.into_owned()),
                Err(_) => std::str::from_utf8(&attr.value).ok().map(str::to_string),
            };
        }
    }
    None
}

/// Extract a `u32` attribute value by key.
pub fn attr_u32(e: &BytesStart, key: &str) -> Option<u32> {
    attr_string(e, key).and_then(|s| s.trim().parse().ok())
}

/// Extract an `f32` attribute value by key.
pub fn attr_f32(e: &BytesStart, key: &str) -> Option<f32> {
    attr_string(e, key).and_then(|s| s.trim().trim_end_matches("px").parse().ok())
}

/// Extract a length attribute (`width="120"`, `width="25%"`).
pub fn attr_length(e: &BytesStart, key: &str) -> Option<Length> {
    attr_string(e, key).and_then(|s| parse_length(&s))
}

/// Get the lowercase element name.
pub fn tag_name(e: &BytesStart) -> String {
    String::from_utf8_lossy(e.name().as_ref()).to_ascii_lowercase()
}

/// Look up one declaration of an inline `style` value.
pub fn style_property(style: &str, name: &str) -> Option<String> {
    style.split(';').find_map(|decl| {
        let (key, value) = decl.split_once(':')?;
        key.trim()
            .eq_ignore_ascii_case(name)
            .then(|| value.trim().to_string())
    })
}

/// The element's `style` declaration for `name`.
pub fn style_of(e: &BytesStart, name: &str) -> Option<String> {
    attr_string(e, "style").and_then(|style| style_property(&style, name))
}

/// Parse `120`, `120px` or `25%`. Other units are not lengths we can use.
pub fn parse_length(value: &str) -> Option<Length> {
    let value = value.trim();
    if let Some(pct) = value.strip_suffix('%') {
        return pct.trim().parse().ok().map(Length::Percent);
    }
    let px = value.strip_suffix("px").unwrap_or(value);
    px.trim().parse().ok().filter(|w: &f32| *w >= 0.0).map(Length::Px)
}

/// Escape text for HTML output.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
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

    fn make_start(tag: &str) -> BytesStart<'_> {
        let len = tag.find(' ').unwrap_or(tag.len());
        BytesStart::from_content(tag, len)
    }

    #[test]
    fn test_attr_string_case_insensitive() {
        let e = make_start(r#"td ROWSPAN="2" class=x"#);
        assert_eq!(attr_string(&e, "rowspan"), Some("2".to_string()));
        assert_eq!(attr_string(&e, "class"), Some("x".to_string()));
        assert_eq!(attr_u32(&e, "rowspan"), Some(2));
        assert_eq!(attr_string(&e, "missing"), None);
    }

    #[test]
    fn test_style_property_lookup() {
        let style = "color: red; WIDTH : 120px;";
        assert_eq!(style_property(style, "width"), Some("120px".to_string()));
        assert_eq!(style_property(style, "height"), None);
    }

    #[test]
    fn test_parse_length() {
        assert_eq!(parse_length("120"), Some(Length::Px(120.0)));
        assert_eq!(parse_length(" 80px "), Some(Length::Px(80.0)));
        assert_eq!(parse_length("25%"), Some(Length::Percent(25.0)));
        assert_eq!(parse_length("3em"), None);
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape(r#"<a & "b">"#), "&lt;a &amp; &quot;b&quot;&gt;");
    }
}
