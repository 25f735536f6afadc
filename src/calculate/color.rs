//! Percentile to color gradient.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ColorError {
    #[error("Invalid hex color: {0}")]
    InvalidHex(String),
}

/// An 8-bit RGB color, serialized as `#rrggbb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rrggbb` (leading `#` optional).
    pub fn from_hex(hex: &str) -> Result<Self, ColorError> {
        let digits = hex.trim().trim_start_matches('#');
        if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ColorError::InvalidHex(hex.to_string()));
        }

        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&digits[range], 16).map_err(|_| ColorError::InvalidHex(hex.to_string()))
        };

        Ok(Self {
            r: channel(0..2)?,
            g: channel(2..4)?,
            b: channel(4..6)?,
        })
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl std::fmt::Display for Rgb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl TryFrom<String> for Rgb {
    type Error = ColorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Rgb::from_hex(&value)
    }
}

impl From<Rgb> for String {
    fn from(color: Rgb) -> Self {
        color.to_hex()
    }
}

/// Three-stop gradient: low at 0, mid at 50, high at 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gradient {
    pub low: Rgb,
    pub mid: Rgb,
    pub high: Rgb,
}

impl Gradient {
    /// Red-orange, yellow, green.
    pub const DEFAULT: Gradient = Gradient {
        low: Rgb::new(0xff, 0x5b, 0x38),
        mid: Rgb::new(0xfb, 0xf8, 0x41),
        high: Rgb::new(0x27, 0xa6, 0x2b),
    };

    /// Color for a percentile. Input is clamped to [0, 100] and NaN maps to
    /// the low stop. 50 lands exactly on the mid stop.
    pub fn color_at(&self, percentile: f64) -> Rgb {
        let t = if percentile.is_nan() {
            0.0
        } else {
            percentile.clamp(0.0, 100.0) / 100.0
        };

        if t <= 0.5 {
            lerp(self.low, self.mid, t * 2.0)
        } else {
            lerp(self.mid, self.high, (t - 0.5) * 2.0)
        }
    }
}

impl Default for Gradient {
    fn default() -> Self {
        Gradient::DEFAULT
    }
}

/// Color for a percentile on the default gradient.
pub fn percentile_to_color(percentile: f64) -> Rgb {
    Gradient::DEFAULT.color_at(percentile)
}

fn lerp(from: Rgb, to: Rgb, s: f64) -> Rgb {
    let channel = |a: u8, b: u8| {
        let a = a as f64;
        let b = b as f64;
        (a + (b - a) * s).round().clamp(0.0, 255.0) as u8
    };
    Rgb::new(
        channel(from.r, to.r),
        channel(from.g, to.g),
        channel(from.b, to.b),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints_are_exact() {
        assert_eq!(percentile_to_color(0.0), Gradient::DEFAULT.low);
        assert_eq!(percentile_to_color(100.0), Gradient::DEFAULT.high);
        assert_eq!(percentile_to_color(50.0), Gradient::DEFAULT.mid);
    }

    #[test]
    fn test_out_of_range_saturates() {
        assert_eq!(percentile_to_color(-10.0), percentile_to_color(0.0));
        assert_eq!(percentile_to_color(150.0), percentile_to_color(100.0));
        assert_eq!(percentile_to_color(f64::NAN), percentile_to_color(0.0));
    }

    #[test]
    fn test_quarter_points_interpolate() {
        // Halfway between #ff5b38 and #fbf841
        assert_eq!(percentile_to_color(25.0), Rgb::new(253, 170, 61));
        // Halfway between #fbf841 and #27a62b
        assert_eq!(percentile_to_color(75.0), Rgb::new(145, 207, 54));
    }

    #[test]
    fn test_deterministic() {
        for p in [0.0, 12.5, 33.3, 50.0, 66.6, 99.9] {
            assert_eq!(percentile_to_color(p), percentile_to_color(p));
        }
    }

    #[test]
    fn test_hex_round_trip() {
        let color = Rgb::from_hex("#27a62b").unwrap();
        assert_eq!(color, Rgb::new(0x27, 0xa6, 0x2b));
        assert_eq!(color.to_hex(), "#27a62b");
        assert_eq!(Rgb::from_hex("FF5B38").unwrap(), Gradient::DEFAULT.low);
    }

    #[test]
    fn test_invalid_hex() {
        assert!(Rgb::from_hex("#fff").is_err());
        assert!(Rgb::from_hex("#gggggg").is_err());
        assert!(Rgb::from_hex("").is_err());
    }

    #[test]
    fn test_serializes_as_hex() {
        let json = serde_json::to_string(&Rgb::new(0xfb, 0xf8, 0x41)).unwrap();
        assert_eq!(json, "\"#fbf841\"");
        let parsed: Rgb = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, Rgb::new(0xfb, 0xf8, 0x41));
    }
}
