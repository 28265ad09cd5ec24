//! Dimension values: absolute pixels or a percentage
//!
//! Widths in table markup are either a plain integer (`width="120"`), a
//! percentage (`width="50%"`) or absent. Parsing never fails; anything that
//! does not read as a non-negative integer is treated as "no width".

use crate::{Result, TableEditError};
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Units of a [`PixelPercent`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelPercentUnits {
    #[default]
    Undefined,
    Pixels,
    Percentage,
}

/// A width or height in pixels or percent. `Undefined` always carries 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PixelPercent {
    value: i32,
    units: PixelPercentUnits,
}

impl PixelPercent {
    pub const UNDEFINED: PixelPercent = PixelPercent {
        value: 0,
        units: PixelPercentUnits::Undefined,
    };

    /// Checked constructor: rejects negative values and percentages over 100
    pub fn new(value: i32, units: PixelPercentUnits) -> Result<Self> {
        if value < 0 {
            return Err(TableEditError::InvalidPixelPercent {
                value,
                reason: "value must not be negative".into(),
            });
        }
        match units {
            PixelPercentUnits::Percentage if value > 100 => Err(TableEditError::InvalidPixelPercent {
                value,
                reason: "percentage must not exceed 100".into(),
            }),
            PixelPercentUnits::Undefined => Ok(Self::UNDEFINED),
            _ => Ok(Self { value, units }),
        }
    }

    /// Pixel width; negative input is clamped to 0
    pub fn pixels(value: i32) -> Self {
        Self {
            value: value.max(0),
            units: PixelPercentUnits::Pixels,
        }
    }

    /// Parse attribute text. A trailing `%` always selects percentage units;
    /// otherwise `default_units` apply. Empty or unreadable text is Undefined.
    /// The 100% bound is not enforced here, so foreign markup such as
    /// `width="150%"` is preserved as written.
    pub fn parse(text: &str, default_units: PixelPercentUnits) -> Self {
        let text = text.trim();
        let (number, units) = match text.strip_suffix('%') {
            Some(number) => (number.trim(), PixelPercentUnits::Percentage),
            None => (text, default_units),
        };
        match number.parse::<i32>() {
            Ok(value) if value >= 0 && units != PixelPercentUnits::Undefined => {
                Self { value, units }
            }
            _ => Self::UNDEFINED,
        }
    }

    /// Whether a width typed by a user is acceptable: empty, or an integer
    /// with an optional trailing `%`
    pub fn is_acceptable_width(text: &str) -> bool {
        static WIDTH: OnceLock<Option<Regex>> = OnceLock::new();
        if text.trim().is_empty() {
            return true;
        }
        let Some(pattern) = WIDTH
            .get_or_init(|| Regex::new(r"^\s*([+-]?\d+)\s*%?\s*$").ok())
            .as_ref()
        else {
            return false;
        };
        pattern
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|number| number.as_str().parse::<i32>().is_ok())
            .unwrap_or(false)
    }

    pub fn value(&self) -> i32 {
        self.value
    }

    pub fn units(&self) -> PixelPercentUnits {
        self.units
    }

    pub fn is_defined(&self) -> bool {
        self.units != PixelPercentUnits::Undefined
    }

    pub fn is_pixels(&self) -> bool {
        self.units == PixelPercentUnits::Pixels
    }

    pub fn is_percentage(&self) -> bool {
        self.units == PixelPercentUnits::Percentage
    }

    /// Split into `divisor` equal parts (integer division, same units)
    pub fn checked_div(self, divisor: i32) -> Result<Self> {
        if divisor <= 0 {
            return Err(TableEditError::DivideByZero);
        }
        if !self.is_defined() {
            return Err(TableEditError::InvalidOperation(
                "cannot divide an undefined width".into(),
            ));
        }
        Ok(Self {
            value: self.value / divisor,
            units: self.units,
        })
    }
}

impl std::fmt::Display for PixelPercent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.units {
            PixelPercentUnits::Percentage => write!(f, "{}%", self.value),
            PixelPercentUnits::Pixels => write!(f, "{}", self.value),
            PixelPercentUnits::Undefined => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_suffix_wins_over_default_units() {
        let width = PixelPercent::parse("50%", PixelPercentUnits::Pixels);
        assert_eq!(width.units(), PixelPercentUnits::Percentage);
        assert_eq!(width.value(), 50);
    }

    #[test]
    fn test_unparseable_is_undefined() {
        assert_eq!(PixelPercent::parse("", PixelPercentUnits::Pixels).units(), PixelPercentUnits::Undefined);
        assert_eq!(PixelPercent::parse("abc", PixelPercentUnits::Pixels).units(), PixelPercentUnits::Undefined);
        assert_eq!(PixelPercent::parse("-4", PixelPercentUnits::Pixels), PixelPercent::UNDEFINED);
        assert_eq!(PixelPercent::parse("12px", PixelPercentUnits::Pixels), PixelPercent::UNDEFINED);
    }

    #[test]
    fn test_parse_does_not_bound_percentages() {
        let width = PixelPercent::parse("150%", PixelPercentUnits::Pixels);
        assert_eq!(width.to_string(), "150%");
        assert!(PixelPercent::new(150, PixelPercentUnits::Percentage).is_err());
    }

    #[test]
    fn test_constructor_rejects_negative() {
        assert!(PixelPercent::new(-1, PixelPercentUnits::Pixels).is_err());
        assert_eq!(
            PixelPercent::new(7, PixelPercentUnits::Undefined).unwrap(),
            PixelPercent::UNDEFINED
        );
    }

    #[test]
    fn test_acceptable_width() {
        assert!(PixelPercent::is_acceptable_width("12%"));
        assert!(PixelPercent::is_acceptable_width(""));
        assert!(PixelPercent::is_acceptable_width(" 300 "));
        assert!(!PixelPercent::is_acceptable_width("abc"));
        assert!(!PixelPercent::is_acceptable_width("12%%"));
    }

    #[test]
    fn test_formatting() {
        assert_eq!(PixelPercent::pixels(200).to_string(), "200");
        assert_eq!(
            PixelPercent::new(25, PixelPercentUnits::Percentage).unwrap().to_string(),
            "25%"
        );
        assert_eq!(PixelPercent::UNDEFINED.to_string(), "");
    }

    #[test]
    fn test_division() {
        assert_eq!(PixelPercent::pixels(200).checked_div(3).unwrap(), PixelPercent::pixels(66));
        assert!(matches!(
            PixelPercent::pixels(200).checked_div(0),
            Err(TableEditError::DivideByZero)
        ));
        assert!(matches!(
            PixelPercent::UNDEFINED.checked_div(2),
            Err(TableEditError::InvalidOperation(_))
        ));
    }

    proptest! {
        #[test]
        fn prop_pixels_format_then_parse(value in 0i32..100_000) {
            let width = PixelPercent::pixels(value);
            prop_assert_eq!(PixelPercent::parse(&width.to_string(), PixelPercentUnits::Pixels), width);
        }

        #[test]
        fn prop_percent_suffix_always_percentage(value in 0i32..1000, default in prop_oneof![
            Just(PixelPercentUnits::Pixels),
            Just(PixelPercentUnits::Percentage),
            Just(PixelPercentUnits::Undefined),
        ]) {
            let parsed = PixelPercent::parse(&format!("{}%", value), default);
            prop_assert_eq!(parsed.units(), PixelPercentUnits::Percentage);
            prop_assert_eq!(parsed.value(), value);
        }

        #[test]
        fn prop_parse_never_panics(text in ".{0,12}") {
            let parsed = PixelPercent::parse(&text, PixelPercentUnits::Pixels);
            prop_assert!(parsed.value() >= 0);
            if PixelPercent::is_acceptable_width(&text) && !text.trim().is_empty() {
                prop_assert!(parsed.is_defined() || text.trim().starts_with('-'));
            }
        }
    }
}
