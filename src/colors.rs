//! Color normalization and the recently used color list.
//!
//! Cell background and border colors arrive as `#RGB`, `#RRGGBB`,
//! `#AARRGGBB` or `rgb(r, g, b)`; they are stored as lowercase `#rrggbb`.

use std::collections::HashMap;

use crate::config::TableConfig;
use crate::error::Result;

/// Store key the recent color list is persisted under.
pub const RECENT_COLORS_KEY: &str = "rtgrid.recentColors";

/// Normalize a CSS color to `#rrggbb`. Named colors and other notations
/// are passed through trimmed and lowercased.
pub fn normalize_color(color: &str) -> Option<String> {
    let color = color.trim().to_ascii_lowercase();
    if color.is_empty() {
        return None;
    }
    if let Some(hex) = color.strip_prefix('#') {
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        return match hex.len() {
            3 => Some(hex.chars().fold(String::from("#"), |mut out, c| {
                out.push(c);
                out.push(c);
                out
            })),
            6 => Some(format!("#{hex}")),
            // ARGB, alpha first
            8 => hex.get(2..).map(|rgb| format!("#{rgb}")),
            _ => None,
        };
    }
    if let Some(args) = color
        .strip_prefix("rgb(")
        .or_else(|| color.strip_prefix("rgba("))
        .and_then(|rest| rest.strip_suffix(')'))
    {
        let channels: Vec<u8> = args
            .split(',')
            .take(3)
            .filter_map(|c| c.trim().parse().ok())
            .collect();
        return match channels.as_slice() {
            [r, g, b] => Some(format!("#{r:02x}{g:02x}{b:02x}")),
            _ => None,
        };
    }
    Some(color)
}

/// Persistent string storage supplied by the host.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String);
}

/// Store that lives only as long as the editor.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) {
        self.values.insert(key.to_string(), value);
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Box<S> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: String) {
        (**self).set(key, value);
    }
}

/// Most recently used colors, newest first, without duplicates.
pub struct RecentColors<S: KeyValueStore> {
    store: S,
    limit: usize,
}

impl<S: KeyValueStore> RecentColors<S> {
    pub fn new(store: S, config: &TableConfig) -> Self {
        Self {
            store,
            limit: config.recent_colors_limit,
        }
    }

    /// The stored list. A corrupt entry reads as empty.
    pub fn list(&self) -> Vec<String> {
        let Some(raw) = self.store.get(RECENT_COLORS_KEY) else {
            return Vec::new();
        };
        match serde_json::from_str(&raw) {
            Ok(colors) => colors,
            Err(e) => {
                log::debug!("ignoring unreadable recent colors: {e}");
                Vec::new()
            }
        }
    }

    /// Move `color` to the front. Returns the normalized color, or `None`
    /// when it is not a color.
    pub fn push(&mut self, color: &str) -> Result<Option<String>> {
        let Some(color) = normalize_color(color) else {
            return Ok(None);
        };
        let mut colors = self.list();
        colors.retain(|c| *c != color);
        colors.insert(0, color.clone());
        colors.truncate(self.limit);
        self.store.set(RECENT_COLORS_KEY, serde_json::to_string(&colors)?);
        Ok(Some(color))
    }

    pub fn clear(&mut self) {
        self.store.set(RECENT_COLORS_KEY, "[]".to_string());
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_hex_forms() {
        assert_eq!(normalize_color("#ABC"), Some("#aabbcc".to_string()));
        assert_eq!(normalize_color(" #FF0000 "), Some("#ff0000".to_string()));
        assert_eq!(normalize_color("#80FF0000"), Some("#ff0000".to_string()));
        assert_eq!(normalize_color("#12345"), None);
        assert_eq!(normalize_color("#zzzzzz"), None);
    }

    #[test]
    fn test_normalize_rgb_function() {
        assert_eq!(normalize_color("rgb(255, 0, 16)"), Some("#ff0010".to_string()));
        assert_eq!(normalize_color("rgba(0,0,0,0.5)"), Some("#000000".to_string()));
        assert_eq!(normalize_color("rgb(300, 0, 0)"), None);
        assert_eq!(normalize_color("Red"), Some("red".to_string()));
        assert_eq!(normalize_color(""), None);
    }

    #[test]
    fn test_recent_colors_dedup_and_limit() {
        let config = TableConfig {
            recent_colors_limit: 3,
            ..TableConfig::default()
        };
        let mut recent = RecentColors::new(MemoryStore::new(), &config);
        for color in ["#111111", "#222222", "#333333", "#111111", "#444444"] {
            recent.push(color).unwrap();
        }
        assert_eq!(recent.list(), vec!["#444444", "#111111", "#333333"]);
    }

    #[test]
    fn test_recent_colors_corrupt_store() {
        let mut store = MemoryStore::new();
        store.set(RECENT_COLORS_KEY, "not json".to_string());
        let mut recent = RecentColors::new(store, &TableConfig::default());
        assert!(recent.list().is_empty());
        assert_eq!(recent.push("#ABC").unwrap(), Some("#aabbcc".to_string()));
        assert_eq!(recent.list(), vec!["#aabbcc"]);
        recent.clear();
        assert!(recent.list().is_empty());
    }
}
