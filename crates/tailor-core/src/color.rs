//! 24-bit colors and the swatch palette offered by the customizer panel

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ColorParseError {
    #[error("Color must start with '#': {0}")]
    MissingHash(String),
    #[error("Color must have 3 or 6 hex digits: {0}")]
    BadLength(String),
    #[error("Invalid hex digit in color: {0}")]
    BadDigit(String),
}

/// An sRGB color with 8 bits per channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb::new(0xFF, 0xFF, 0xFF);
    pub const BLACK: Rgb = Rgb::new(0x00, 0x00, 0x00);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const fn from_u32(packed: u32) -> Self {
        Self {
            r: ((packed >> 16) & 0xFF) as u8,
            g: ((packed >> 8) & 0xFF) as u8,
            b: (packed & 0xFF) as u8,
        }
    }

    pub const fn to_u32(self) -> u32 {
        ((self.r as u32) << 16) | ((self.g as u32) << 8) | self.b as u32
    }

    /// Parse `#RRGGBB` or the `#RGB` shorthand
    pub fn from_hex(hex: &str) -> Result<Self, ColorParseError> {
        let trimmed = hex.trim();
        let digits = trimmed
            .strip_prefix('#')
            .ok_or_else(|| ColorParseError::MissingHash(hex.to_string()))?;

        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ColorParseError::BadDigit(hex.to_string()));
        }

        let expanded: String = match digits.len() {
            3 => digits.chars().flat_map(|c| [c, c]).collect(),
            6 => digits.to_string(),
            _ => return Err(ColorParseError::BadLength(hex.to_string())),
        };

        let packed = u32::from_str_radix(&expanded, 16)
            .map_err(|_| ColorParseError::BadDigit(hex.to_string()))?;
        Ok(Self::from_u32(packed))
    }

    /// Uppercase `#RRGGBB`
    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    /// Channels as 0.0-1.0 in sRGB space
    pub fn to_srgb_f32(self) -> [f32; 3] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
        ]
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Rgb {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for Rgb {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Rgb {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Rgb::from_hex(&raw).map_err(serde::de::Error::custom)
    }
}

/// A named palette entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Swatch {
    pub name: &'static str,
    pub color: Rgb,
}

/// Colors offered by the panel for every zone
pub const SWATCHES: [Swatch; 8] = [
    Swatch { name: "White", color: Rgb::from_u32(0xFFFFFF) },
    Swatch { name: "Black", color: Rgb::from_u32(0x1A1A1A) },
    Swatch { name: "Navy", color: Rgb::from_u32(0x001F3F) },
    Swatch { name: "Red", color: Rgb::from_u32(0xDC3545) },
    Swatch { name: "Royal Blue", color: Rgb::from_u32(0x0066CC) },
    Swatch { name: "Green", color: Rgb::from_u32(0x28A745) },
    Swatch { name: "Yellow", color: Rgb::from_u32(0xFFC107) },
    Swatch { name: "Orange", color: Rgb::from_u32(0xFD7E14) },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_long_and_short_hex() {
        assert_eq!(Rgb::from_hex("#FF0000").unwrap(), Rgb::new(255, 0, 0));
        assert_eq!(Rgb::from_hex("#0f0").unwrap(), Rgb::new(0, 255, 0));
        assert_eq!(Rgb::from_hex(" #ffff00 ").unwrap(), Rgb::new(255, 255, 0));
    }

    #[test]
    fn test_reject_malformed_hex() {
        assert!(matches!(Rgb::from_hex("FF0000"), Err(ColorParseError::MissingHash(_))));
        assert!(matches!(Rgb::from_hex("#FF00"), Err(ColorParseError::BadLength(_))));
        assert!(matches!(Rgb::from_hex("#GG0000"), Err(ColorParseError::BadDigit(_))));
    }

    #[test]
    fn test_hex_serialization() {
        let color = Rgb::from_u32(0xDC3545);
        assert_eq!(color.to_hex(), "#DC3545");

        let json = serde_json::to_string(&color).unwrap();
        assert_eq!(json, "\"#DC3545\"");
        let back: Rgb = serde_json::from_str("\"#dc3545\"").unwrap();
        assert_eq!(back, color);
    }

    #[test]
    fn test_swatches_are_distinct() {
        let mut colors: Vec<u32> = SWATCHES.iter().map(|s| s.color.to_u32()).collect();
        colors.sort();
        colors.dedup();
        assert_eq!(colors.len(), SWATCHES.len());
    }
}
