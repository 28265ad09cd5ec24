//! Property value objects exchanged with the command layer

use crate::{PixelPercent, PixelPercentUnits, Result, TableEditError};
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

// =============================================================================
// Mixable
// =============================================================================

/// A property read across several cells: either the value they all share,
/// or `Mixed` when they disagree. As a write value, `Mixed` leaves each cell
/// as it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mixable<T> {
    Value(T),
    Mixed,
}

impl<T: PartialEq> Mixable<T> {
    pub fn is_mixed(&self) -> bool {
        matches!(self, Mixable::Mixed)
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Mixable::Value(value) => Some(value),
            Mixable::Mixed => None,
        }
    }

    /// Fold a sequence of cell values; an empty sequence yields `default`
    pub fn reduce(values: impl IntoIterator<Item = T>, default: T) -> Self {
        let mut values = values.into_iter();
        let Some(first) = values.next() else {
            return Mixable::Value(default);
        };
        for value in values {
            if value != first {
                return Mixable::Mixed;
            }
        }
        Mixable::Value(first)
    }
}

impl<T> From<T> for Mixable<T> {
    fn from(value: T) -> Self {
        Mixable::Value(value)
    }
}

// =============================================================================
// Alignment
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HorizontalAlignment {
    #[default]
    Left,
    Center,
    Right,
}

impl HorizontalAlignment {
    /// Read an `align` attribute; missing or unknown values mean Left
    pub fn from_html(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("center") => HorizontalAlignment::Center,
            Some("right") => HorizontalAlignment::Right,
            _ => HorizontalAlignment::Left,
        }
    }

    pub fn as_html(&self) -> &'static str {
        match self {
            HorizontalAlignment::Left => "left",
            HorizontalAlignment::Center => "center",
            HorizontalAlignment::Right => "right",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerticalAlignment {
    Top,
    #[default]
    Middle,
    Bottom,
}

impl VerticalAlignment {
    /// Read a `valign` attribute; missing or unknown values mean Middle
    pub fn from_html(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("top") => VerticalAlignment::Top,
            Some("bottom") => VerticalAlignment::Bottom,
            _ => VerticalAlignment::Middle,
        }
    }

    pub fn as_html(&self) -> &'static str {
        match self {
            VerticalAlignment::Top => "top",
            VerticalAlignment::Middle => "middle",
            VerticalAlignment::Bottom => "bottom",
        }
    }
}

// =============================================================================
// Color
// =============================================================================

/// An RGB color as written in `bgcolor`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

const NAMED_COLORS: &[(&str, (u8, u8, u8))] = &[
    ("black", (0x00, 0x00, 0x00)),
    ("white", (0xFF, 0xFF, 0xFF)),
    ("red", (0xFF, 0x00, 0x00)),
    ("lime", (0x00, 0xFF, 0x00)),
    ("blue", (0x00, 0x00, 0xFF)),
    ("yellow", (0xFF, 0xFF, 0x00)),
    ("aqua", (0x00, 0xFF, 0xFF)),
    ("fuchsia", (0xFF, 0x00, 0xFF)),
    ("silver", (0xC0, 0xC0, 0xC0)),
    ("gray", (0x80, 0x80, 0x80)),
    ("grey", (0x80, 0x80, 0x80)),
    ("maroon", (0x80, 0x00, 0x00)),
    ("olive", (0x80, 0x80, 0x00)),
    ("green", (0x00, 0x80, 0x00)),
    ("purple", (0x80, 0x00, 0x80)),
    ("teal", (0x00, 0x80, 0x80)),
    ("navy", (0x00, 0x00, 0x80)),
];

impl Color {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#RRGGBB`, `#RGB` (with or without `#`) or a basic color name
    pub fn parse(text: &str) -> Option<Self> {
        static HEX: OnceLock<Option<Regex>> = OnceLock::new();
        let text = text.trim();
        if let Some((_, (r, g, b))) = NAMED_COLORS
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(text))
        {
            return Some(Self::new(*r, *g, *b));
        }

        let pattern = HEX
            .get_or_init(|| Regex::new(r"^#?([0-9a-fA-F]{6}|[0-9a-fA-F]{3})$").ok())
            .as_ref()?;
        let digits = pattern.captures(text)?.get(1)?.as_str();
        let channel = |hex: &str| u8::from_str_radix(hex, 16).ok();
        if digits.len() == 6 {
            Some(Self::new(
                channel(&digits[0..2])?,
                channel(&digits[2..4])?,
                channel(&digits[4..6])?,
            ))
        } else {
            let doubled: String = digits.chars().flat_map(|c| [c, c]).collect();
            Self::parse(&doubled)
        }
    }

    /// `#RRGGBB` in upper case
    pub fn to_html(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

/// Background color of cells: a color, `Value(None)` for "no color", or Mixed
pub type CellColor = Mixable<Option<Color>>;

// =============================================================================
// Property objects
// =============================================================================

/// Per-cell formatting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellProperties {
    pub background_color: CellColor,
    pub horizontal_alignment: Mixable<HorizontalAlignment>,
    pub vertical_alignment: Mixable<VerticalAlignment>,
}

impl Default for CellProperties {
    fn default() -> Self {
        Self {
            background_color: Mixable::Value(None),
            horizontal_alignment: Mixable::Value(HorizontalAlignment::Left),
            vertical_alignment: Mixable::Value(VerticalAlignment::Middle),
        }
    }
}

impl CellProperties {
    /// Properties that leave every cell untouched when applied
    pub fn hands_off() -> Self {
        Self {
            background_color: Mixable::Mixed,
            horizontal_alignment: Mixable::Mixed,
            vertical_alignment: Mixable::Mixed,
        }
    }
}

/// Row formatting: height (0 sizes to content) plus the row's cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RowProperties {
    pub height: i32,
    pub cell_properties: CellProperties,
}

/// Column formatting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnProperties {
    pub width: Mixable<PixelPercent>,
    pub cell_properties: CellProperties,
}

impl Default for ColumnProperties {
    fn default() -> Self {
        Self {
            width: Mixable::Value(PixelPercent::UNDEFINED),
            cell_properties: CellProperties::default(),
        }
    }
}

/// Table-level attributes. Empty strings mean "attribute absent".
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TableProperties {
    pub cell_padding: String,
    pub cell_spacing: String,
    pub border_size: String,
    pub width: PixelPercent,
}

/// Bounds applied when validating new-table parameters. Each limit is
/// exclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableLimits {
    pub max_rows: usize,
    pub max_columns: usize,
    pub max_width_pixels: i32,
    pub max_border: i32,
    pub max_cell_padding: i32,
    pub max_cell_spacing: i32,
}

impl Default for TableLimits {
    fn default() -> Self {
        Self {
            max_rows: 750,
            max_columns: 100,
            max_width_pixels: 1000,
            max_border: 100,
            max_cell_padding: 100,
            max_cell_spacing: 100,
        }
    }
}

/// Everything needed to create a table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableCreationParameters {
    pub rows: usize,
    pub columns: usize,
    pub properties: TableProperties,
}

impl TableCreationParameters {
    pub fn new(rows: usize, columns: usize, properties: TableProperties) -> Self {
        Self {
            rows,
            columns,
            properties,
        }
    }

    /// Check the parameters against `limits`
    pub fn validate(&self, limits: &TableLimits) -> Result<()> {
        check_count("rows", self.rows, limits.max_rows)?;
        check_count("columns", self.columns, limits.max_columns)?;
        check_attribute("border", &self.properties.border_size, limits.max_border)?;
        check_attribute("cell padding", &self.properties.cell_padding, limits.max_cell_padding)?;
        check_attribute("cell spacing", &self.properties.cell_spacing, limits.max_cell_spacing)?;

        let width = self.properties.width;
        if width.units() == PixelPercentUnits::Pixels && width.value() >= limits.max_width_pixels {
            return Err(invalid(
                "width",
                format!("must be less than {}", limits.max_width_pixels),
            ));
        }
        if width.is_percentage() && width.value() > 100 {
            return Err(invalid("width", "percentage must not exceed 100".into()));
        }
        Ok(())
    }
}

fn invalid(field: &str, reason: String) -> TableEditError {
    TableEditError::InvalidParameter {
        field: field.to_string(),
        reason,
    }
}

fn check_count(field: &str, value: usize, max: usize) -> Result<()> {
    if value == 0 {
        return Err(invalid(field, "must be a positive number".into()));
    }
    if value >= max {
        return Err(invalid(field, format!("must be less than {}", max)));
    }
    Ok(())
}

fn check_attribute(field: &str, value: &str, max: i32) -> Result<()> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(());
    }
    match value.parse::<i32>() {
        Ok(number) if number < 0 => Err(invalid(field, "must not be negative".into())),
        Ok(number) if number >= max => Err(invalid(field, format!("must be less than {}", max))),
        Ok(_) => Ok(()),
        Err(_) => Err(invalid(field, format!("'{}' is not a whole number", value))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mixable_reduce() {
        assert_eq!(Mixable::reduce(vec![1, 1, 1], 0), Mixable::Value(1));
        assert_eq!(Mixable::reduce(vec![1, 2, 1], 0), Mixable::Mixed);
        assert_eq!(Mixable::reduce(Vec::<i32>::new(), 7), Mixable::Value(7));
    }

    #[test]
    fn test_alignment_defaults() {
        assert_eq!(HorizontalAlignment::from_html(None), HorizontalAlignment::Left);
        assert_eq!(HorizontalAlignment::from_html(Some("justify")), HorizontalAlignment::Left);
        assert_eq!(HorizontalAlignment::from_html(Some("CENTER")), HorizontalAlignment::Center);
        assert_eq!(VerticalAlignment::from_html(None), VerticalAlignment::Middle);
        assert_eq!(VerticalAlignment::from_html(Some("baseline")), VerticalAlignment::Middle);
        assert_eq!(VerticalAlignment::from_html(Some("top")).as_html(), "top");
    }

    #[test]
    fn test_color_parsing() {
        assert_eq!(Color::parse("#ff8000"), Some(Color::new(0xFF, 0x80, 0x00)));
        assert_eq!(Color::parse("f80"), Some(Color::new(0xFF, 0x88, 0x00)));
        assert_eq!(Color::parse("Navy").map(|c| c.to_html()), Some("#000080".to_string()));
        assert_eq!(Color::parse("not-a-color"), None);
        assert_eq!(Color::new(0xAB, 0x01, 0xCD).to_html(), "#AB01CD");
    }

    #[test]
    fn test_creation_parameters_validation() {
        let limits = TableLimits::default();
        let ok = TableCreationParameters::new(3, 3, TableProperties::default());
        assert!(ok.validate(&limits).is_ok());

        let too_many_rows = TableCreationParameters::new(750, 3, TableProperties::default());
        assert!(too_many_rows.validate(&limits).is_err());

        let no_columns = TableCreationParameters::new(3, 0, TableProperties::default());
        assert!(no_columns.validate(&limits).is_err());

        let mut properties = TableProperties::default();
        properties.border_size = "abc".into();
        assert!(TableCreationParameters::new(2, 2, properties).validate(&limits).is_err());

        let wide = TableProperties {
            width: PixelPercent::pixels(1200),
            ..TableProperties::default()
        };
        assert!(TableCreationParameters::new(2, 2, wide).validate(&limits).is_err());
    }

    #[test]
    fn test_mixable_serde_shape() {
        let json = serde_json::to_string(&Mixable::Value(HorizontalAlignment::Center)).unwrap();
        assert_eq!(json, r#"{"value":"center"}"#);
        let mixed: Mixable<HorizontalAlignment> = serde_json::from_str(r#""mixed""#).unwrap();
        assert!(mixed.is_mixed());
    }
}
