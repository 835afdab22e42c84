use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Color of a style property.
///
/// Serialized into the style as a CSS `rgba(r, g, b, a)` string, which is the format the native style expects for
/// color properties.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    r: u8,
    g: u8,
    b: u8,
    a: u8,
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_from_css(&value)
            .or_else(|| Self::try_from_hex(&value))
            .ok_or_else(|| format!("invalid color: {value}"))
    }
}

impl From<Color> for String {
    fn from(val: Color) -> Self {
        val.to_css()
    }
}

impl From<Color> for Value {
    fn from(val: Color) -> Self {
        Value::String(val.to_css())
    }
}

impl Color {
    /// Transparent color.
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);
    /// Red color.
    pub const RED: Color = Color::rgba(255, 0, 0, 255);
    /// Blue color.
    pub const BLUE: Color = Color::rgba(0, 0, 255, 255);
    /// White color.
    pub const WHITE: Color = Color::rgba(255, 255, 255, 255);
    /// Black color.
    pub const BLACK: Color = Color::rgba(0, 0, 0, 255);

    /// Constructs color from its RGBA channels.
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Converts the color into u8 array (RGBA).
    pub fn to_u8_array(&self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Converts the color into a CSS string: `rgba(255, 0, 0, 1)`.
    pub fn to_css(&self) -> String {
        let alpha = self.a as f64 / 255.0;
        format!("rgba({}, {}, {}, {})", self.r, self.g, self.b, round_alpha(alpha))
    }

    /// Parses a color from `rgba(r, g, b, a)` or `rgb(r, g, b)` notation.
    pub fn try_from_css(css: &str) -> Option<Self> {
        let css = css.trim();
        let (body, has_alpha) = if let Some(body) = css.strip_prefix("rgba(") {
            (body, true)
        } else {
            (css.strip_prefix("rgb(")?, false)
        };
        let body = body.strip_suffix(')')?;

        let parts: Vec<&str> = body.split(',').map(str::trim).collect();
        if parts.len() != if has_alpha { 4 } else { 3 } {
            return None;
        }

        let r = parts[0].parse().ok()?;
        let g = parts[1].parse().ok()?;
        let b = parts[2].parse().ok()?;
        let a = if has_alpha {
            let alpha: f64 = parts[3].parse().ok()?;
            if !(0.0..=1.0).contains(&alpha) {
                return None;
            }
            (alpha * 255.0).round() as u8
        } else {
            255
        };

        Some(Self { r, g, b, a })
    }

    /// Parses a color from the hex string. Hex string can be either HEX6 (`#RRGGBB`) or HEX8 (`#RRGGBBAA`).
    pub fn try_from_hex(hex_string: &str) -> Option<Self> {
        if hex_string.len() != 7 && hex_string.len() != 9 || !hex_string.starts_with('#') {
            return None;
        }

        let r = u8::from_str_radix(hex_string.get(1..3)?, 16).ok()?;
        let g = u8::from_str_radix(hex_string.get(3..5)?, 16).ok()?;
        let b = u8::from_str_radix(hex_string.get(5..7)?, 16).ok()?;
        let a = if hex_string.len() == 9 {
            u8::from_str_radix(hex_string.get(7..9)?, 16).ok()?
        } else {
            255
        };

        Some(Self { r, g, b, a })
    }

    /// Returns a new color instance, copied from the base one but with the given alpha channel.
    pub fn with_alpha(&self, a: u8) -> Self {
        Self { a, ..*self }
    }
}

fn round_alpha(alpha: f64) -> f64 {
    (alpha * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn css_serialization() {
        assert_eq!(Color::BLACK.to_css(), "rgba(0, 0, 0, 1)");
        assert_eq!(Color::RED.with_alpha(128).to_css(), "rgba(255, 0, 0, 0.5)");

        let parsed = Color::try_from_css("rgba(10, 20, 30, 1)").expect("valid css");
        assert_eq!(parsed, Color::rgba(10, 20, 30, 255));
        assert_eq!(
            Color::try_from_css("rgb(1, 2, 3)"),
            Some(Color::rgba(1, 2, 3, 255))
        );
        assert_eq!(Color::try_from_css("rgba(1, 2, 3)"), None);
    }

    #[test]
    fn serde_uses_css_strings() {
        let value = serde_json::to_value(Color::WHITE).expect("serializable");
        assert_eq!(value, Value::String("rgba(255, 255, 255, 1)".into()));

        let color: Color = serde_json::from_value(Value::String("#FF1000AA".into())).expect("hex color");
        assert_eq!(color, Color::rgba(255, 16, 0, 170));
    }
}
