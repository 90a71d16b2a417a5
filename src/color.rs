//! Hex ink colors as stored on overlay items.

#[cfg(test)]
#[path = "color_test.rs"]
mod color_test;

/// An opaque 8-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Self = Self { r: 0, g: 0, b: 0 };

    /// Parse `#rrggbb` or `#rgb` (leading `#` optional, case-insensitive).
    #[must_use]
    pub fn parse_hex(raw: &str) -> Option<Self> {
        let hex = raw.trim().trim_start_matches('#');
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        match hex.len() {
            6 => Some(Self { r: hex_byte(&hex[0..2])?, g: hex_byte(&hex[2..4])?, b: hex_byte(&hex[4..6])? }),
            3 => {
                let nibble = |i: usize| hex_byte(&hex[i..=i]).map(|v| v * 17);
                Some(Self { r: nibble(0)?, g: nibble(1)?, b: nibble(2)? })
            }
            _ => None,
        }
    }

    /// Parse a hex color, falling back to black for anything unreadable.
    #[must_use]
    pub fn from_hex_or_black(raw: &str) -> Self {
        Self::parse_hex(raw).unwrap_or(Self::BLACK)
    }

    /// Components scaled to `0.0..=1.0`, as PDF color operators expect.
    #[must_use]
    pub fn unit(self) -> (f64, f64, f64) {
        (f64::from(self.r) / 255.0, f64::from(self.g) / 255.0, f64::from(self.b) / 255.0)
    }

    #[must_use]
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

fn hex_byte(digits: &str) -> Option<u8> {
    match u8::from_str_radix(digits, 16) {
        Ok(v) => Some(v),
        Err(_) => None,
    }
}
