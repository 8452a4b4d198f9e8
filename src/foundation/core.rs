use crate::foundation::error::{BadgeError, BadgeResult};

pub use kurbo::{Affine, BezPath, Point, Rect, Size, Vec2};

/// Straight-alpha RGBA8 color as written in templates (`#rrggbb`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rgba8 {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel.
    pub a: u8,
}

impl Rgba8 {
    /// Opaque white.
    pub const WHITE: Self = Self::rgb(255, 255, 255);
    /// Opaque black.
    pub const BLACK: Self = Self::rgb(0, 0, 0);

    /// Build an opaque color.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Parse a CSS-style color string.
    ///
    /// Accepts `#rgb`, `#rrggbb`, `#rrggbbaa` (prefix optional, case-insensitive) and the
    /// keywords `white`, `black` and `transparent`.
    pub fn parse(s: &str) -> BadgeResult<Self> {
        let s = s.trim();
        match s.to_ascii_lowercase().as_str() {
            "white" => return Ok(Self::WHITE),
            "black" => return Ok(Self::BLACK),
            "transparent" => return Ok(Self { r: 0, g: 0, b: 0, a: 0 }),
            _ => {}
        }
        let hex = s.strip_prefix('#').unwrap_or(s);
        if !hex.is_ascii() {
            return Err(BadgeError::validation(format!("invalid color \"{s}\"")));
        }

        fn hex_byte(pair: &str) -> BadgeResult<u8> {
            u8::from_str_radix(pair, 16)
                .map_err(|_| BadgeError::validation(format!("invalid hex byte \"{pair}\"")))
        }

        match hex.len() {
            3 => {
                let mut c = [0u8; 3];
                for (i, ch) in hex.chars().enumerate() {
                    let v = hex_byte(&ch.to_string())?;
                    c[i] = v * 17;
                }
                Ok(Self::rgb(c[0], c[1], c[2]))
            }
            6 => Ok(Self::rgb(
                hex_byte(&hex[0..2])?,
                hex_byte(&hex[2..4])?,
                hex_byte(&hex[4..6])?,
            )),
            8 => Ok(Self {
                r: hex_byte(&hex[0..2])?,
                g: hex_byte(&hex[2..4])?,
                b: hex_byte(&hex[4..6])?,
                a: hex_byte(&hex[6..8])?,
            }),
            _ => Err(BadgeError::validation(format!(
                "color \"{s}\" must be #RGB, #RRGGBB or #RRGGBBAA"
            ))),
        }
    }

    /// Parse `s`, falling back to `fallback` when it is not a valid color.
    pub fn parse_or(s: &str, fallback: Self) -> Self {
        Self::parse(s).unwrap_or(fallback)
    }

    /// Format as lowercase `#rrggbb` (or `#rrggbbaa` when not opaque).
    pub fn to_hex(self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

/// A rendered card as RGBA8 bytes.
///
/// Backends produce **premultiplied alpha**; the flag makes this explicit at API boundaries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRGBA {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// RGBA8 bytes, tightly packed, row-major.
    pub data: Vec<u8>,
    /// Whether the `data` is premultiplied alpha.
    pub premultiplied: bool,
}

impl FrameRGBA {
    /// Read the pixel at `(x, y)`, or `None` when out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        let px = self.data.get(i..i + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }

    /// Return straight-alpha RGBA8 bytes suitable for encoders.
    pub fn to_straight_rgba(&self) -> Vec<u8> {
        let mut out = self.data.clone();
        if self.premultiplied {
            for px in out.chunks_exact_mut(4) {
                let a = u16::from(px[3]);
                if a == 0 || a == 255 {
                    continue;
                }
                for c in &mut px[..3] {
                    *c = ((u16::from(*c) * 255 + a / 2) / a).min(255) as u8;
                }
            }
        }
        out
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
