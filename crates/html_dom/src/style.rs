//! Inline CSS declarations
//!
//! Elements carry two declaration blocks: the persisted `style` attribute and
//! a runtime block that only exists while editing and is never serialized.

use serde::{Deserialize, Serialize};

/// An ordered list of `property: value` pairs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleDeclarations {
    entries: Vec<(String, String)>,
}

impl StyleDeclarations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the text of a `style` attribute. Malformed declarations are skipped.
    pub fn parse(css: &str) -> Self {
        let mut style = Self::new();
        for declaration in css.split(';') {
            if let Some((name, value)) = declaration.split_once(':') {
                let name = name.trim();
                let value = value.trim();
                if !name.is_empty() && !value.is_empty() {
                    style.set(name, value);
                }
            }
        }
        style
    }

    pub fn get(&self, property: &str) -> Option<&str> {
        let property = property.to_ascii_lowercase();
        self.entries
            .iter()
            .find(|(name, _)| *name == property)
            .map(|(_, value)| value.as_str())
    }

    /// Set a property. An empty value removes it.
    pub fn set(&mut self, property: &str, value: &str) {
        let property = property.to_ascii_lowercase();
        if value.is_empty() {
            self.remove(&property);
            return;
        }
        match self.entries.iter_mut().find(|(name, _)| *name == property) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.entries.push((property, value.to_string())),
        }
    }

    pub fn remove(&mut self, property: &str) -> bool {
        let property = property.to_ascii_lowercase();
        let before = self.entries.len();
        self.entries.retain(|(name, _)| *name != property);
        self.entries.len() != before
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Render back to attribute text
    pub fn to_css(&self) -> String {
        self.entries
            .iter()
            .map(|(name, value)| format!("{}: {}", name, value))
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Border width in pixels from `border-width` or the `border` shorthand
    pub fn border_width_px(&self) -> Option<i32> {
        if let Some(width) = self.get("border-width").and_then(css_length_px) {
            return Some(width);
        }
        self.get("border")?
            .split_whitespace()
            .find_map(css_length_px)
    }

    /// Border style keyword from `border-style` or the `border` shorthand
    pub fn border_style(&self) -> Option<&str> {
        if let Some(style) = self.get("border-style") {
            return Some(style);
        }
        self.get("border")?
            .split_whitespace()
            .find(|token| BORDER_STYLES.contains(&token.to_ascii_lowercase().as_str()))
    }
}

const BORDER_STYLES: &[&str] = &[
    "none", "hidden", "dotted", "dashed", "solid", "double", "groove", "ridge", "inset", "outset",
];

/// Largest length, in pixels, taken from markup. Lengths beyond it are
/// clamped so that geometry sums stay within `i32`.
pub const MAX_LENGTH_PX: i32 = 100_000;

/// Clamp a length read from markup to `-MAX_LENGTH_PX..=MAX_LENGTH_PX`
pub fn clamp_length_px(value: i32) -> i32 {
    value.clamp(-MAX_LENGTH_PX, MAX_LENGTH_PX)
}

/// Convert a CSS length (`3px`, `3`, `thin`, ...) to whole pixels
pub fn css_length_px(value: &str) -> Option<i32> {
    let value = value.trim().to_ascii_lowercase();
    match value.as_str() {
        "thin" => return Some(1),
        "medium" => return Some(3),
        "thick" => return Some(5),
        _ => {}
    }
    let number = value.strip_suffix("px").unwrap_or(&value);
    number
        .parse::<i32>()
        .ok()
        .or_else(|| number.parse::<f32>().ok().map(|n| n.round() as i32))
        .map(clamp_length_px)
}
