// Color tokens: hex colors and palette references
use super::error::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const WARNING_COLOR: &str = "#ffd000";
pub const CRITICAL_COLOR: &str = "#ff3232";
pub const SCALAR_COLOR: &str = "#808080";
pub const CONSTANT_COLOR: &str = "#7f7f7f";

/// Palette slots as (key, light shade, dark shade).
const PALETTE: &[(&str, &str, &str)] = &[
    ("11", "#cc00ff", "#8a00ad"),
    ("12", "#ff00cc", "#ad008a"),
    ("13", "#ff0080", "#ad0057"),
    ("14", "#ff3232", "#b21f1f"),
    ("15", "#ff6600", "#ad4500"),
    ("16", "#ff9900", "#ad6800"),
    ("21", "#ffcc00", "#ad8a00"),
    ("22", "#ffff00", "#adad00"),
    ("23", "#ccff00", "#8aad00"),
    ("24", "#80ff00", "#57ad00"),
    ("25", "#37fa37", "#1faa1f"),
    ("26", "#00ff80", "#00ad57"),
    ("31", "#00ffcc", "#00ad8a"),
    ("32", "#00ffff", "#00adad"),
    ("33", "#00ccff", "#008aad"),
    ("34", "#1e90ff", "#1460ad"),
    ("35", "#3366ff", "#2245ad"),
    ("36", "#1e1ec8", "#141487"),
    ("41", "#6600ff", "#4500ad"),
    ("42", "#9933ff", "#6822ad"),
    ("43", "#c080ff", "#8257ad"),
    ("44", "#ff80ff", "#ad57ad"),
    ("45", "#ff80c0", "#ad5782"),
    ("46", "#ffb080", "#ad7857"),
    ("51", "#bfbfbf", "#808080"),
    ("52", "#7f7f7f", "#4d4d4d"),
    ("53", "#404040", "#262626"),
];

/// A normalized `#rrggbb` color.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color(String);

impl Color {
    /// Accepts `#rrggbb` or a palette reference such as `34/a` or `36`.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let text = text.trim();
        if let Some(hex) = text.strip_prefix('#') {
            if hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()) {
                return Ok(Self(format!("#{}", hex.to_ascii_lowercase())));
            }
            return Err(ParseError::InvalidColor(text.to_string()));
        }

        let (key, shade) = text.split_once('/').unwrap_or((text, "a"));
        PALETTE
            .iter()
            .find(|(k, _, _)| *k == key)
            .and_then(|(_, light, dark)| match shade {
                "a" => Some(*light),
                "b" => Some(*dark),
                _ => None,
            })
            .map(|hex| Self(hex.to_string()))
            .ok_or_else(|| ParseError::InvalidColor(text.to_string()))
    }

    /// Color for the n-th metric without a configured color.
    pub fn from_palette_index(index: usize) -> Self {
        let (_, light, _) = PALETTE[index % PALETTE.len()];
        Self(light.to_string())
    }

    pub(crate) fn fixed(hex: &str) -> Self {
        Self(hex.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Color {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.0
    }
}
