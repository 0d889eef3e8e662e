use serde::{Deserialize, Serialize};
use std::fmt;

/// An opaque 8-bit RGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Color {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseColorError {
    pub input: String,
}

impl fmt::Display for ParseColorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' is not a #RRGGBB colour code", self.input)
    }
}

impl std::error::Error for ParseColorError {}

impl Color {
    pub const fn rgb(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    /// Canonical `#RRGGBB` form, uppercase.
    pub fn hex_code(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.red, self.green, self.blue)
    }

    /// Parses `#RRGGBB` or `RRGGBB`, case-insensitive.
    pub fn from_hex(input: &str) -> Result<Self, ParseColorError> {
        let err = || ParseColorError {
            input: input.to_string(),
        };
        let trimmed = input.trim();
        let digits = trimmed.strip_prefix('#').unwrap_or(trimmed);
        if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(err());
        }
        let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&digits[range], 16);
        Ok(Self {
            red: channel(0..2).map_err(|_| err())?,
            green: channel(2..4).map_err(|_| err())?,
            blue: channel(4..6).map_err(|_| err())?,
        })
    }

    /// Relative luminance below one half; used to pick a contrasting swatch
    /// outline.
    pub fn is_dark(self) -> bool {
        fn linear(channel: u8) -> f32 {
            let c = channel as f32 / 255.0;
            if c <= 0.04045 {
                c / 12.92
            } else {
                ((c + 0.055) / 1.055).powf(2.4)
            }
        }
        let luminance = 0.2126 * linear(self.red)
            + 0.7152 * linear(self.green)
            + 0.0722 * linear(self.blue);
        luminance < 0.5
    }

    pub fn from_array(rgb: [u8; 3]) -> Self {
        Self::rgb(rgb[0], rgb[1], rgb[2])
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hex_code())
    }
}
