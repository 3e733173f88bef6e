//! Hex color parsing and packed-ARGB helpers.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// The spell color used whenever nothing better is available (`#fb923c`).
pub const DEFAULT_SPELL_COLOR: &str = "#fb923c";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ColorError {
    #[error("invalid hex color {0:?}: expected #rgb or #rrggbb")]
    InvalidHex(String),
}

/// An opaque 8-bit RGB color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };
    pub const WHITE: Rgb = Rgb { r: 0xFF, g: 0xFF, b: 0xFF };
    /// `#fb923c`
    pub const SPELL_ORANGE: Rgb = Rgb { r: 0xFB, g: 0x92, b: 0x3C };

    pub const fn new(r: u8, g: u8, b: u8) -> Self { Rgb { r, g, b } }

    /// Parse `#rgb` / `#rrggbb` (the `#` is optional, case-insensitive).
    pub fn parse(s: &str) -> Result<Rgb, ColorError> {
        let err = || ColorError::InvalidHex(s.to_string());
        let hex = s.trim();
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if !hex.is_ascii() {
            return Err(err());
        }
        let nibble = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).map_err(|_| err());
        let byte   = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| err());
        match hex.len() {
            3 => Ok(Rgb::new(nibble(0)? * 17, nibble(1)? * 17, nibble(2)? * 17)),
            6 => Ok(Rgb::new(byte(0)?, byte(2)?, byte(4)?)),
            _ => Err(err()),
        }
    }

    /// Parse, falling back to [`Rgb::SPELL_ORANGE`] for anything malformed.
    pub fn parse_or_default(s: &str) -> Rgb {
        Rgb::parse(s).unwrap_or(Rgb::SPELL_ORANGE)
    }

    /// Packed `0xFFRRGGBB`, the layout `minifb` presents.
    pub fn to_argb(self) -> u32 {
        0xFF00_0000 | (self.r as u32) << 16 | (self.g as u32) << 8 | self.b as u32
    }

    pub fn from_argb(c: u32) -> Rgb {
        Rgb::new((c >> 16) as u8, (c >> 8) as u8, c as u8)
    }
}

impl FromStr for Rgb {
    type Err = ColorError;
    fn from_str(s: &str) -> Result<Self, Self::Err> { Rgb::parse(s) }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Alpha-blend two ARGB colors. `t` = 0.0 → all `a`, `t` = 1.0 → all `b`.
pub fn blend(a: u32, b: u32, t: f32) -> u32 {
    let t = t.clamp(0.0, 1.0);
    let lerp = |ca: u32, cb: u32| (ca as f32 * (1.0 - t) + cb as f32 * t).round() as u32;
    let ar = (a >> 16) & 0xFF; let br = (b >> 16) & 0xFF;
    let ag = (a >>  8) & 0xFF; let bg = (b >>  8) & 0xFF;
    let ab =  a        & 0xFF; let bb =  b        & 0xFF;
    0xFF00_0000 | (lerp(ar, br) << 16) | (lerp(ag, bg) << 8) | lerp(ab, bb)
}

/// Additive blend: each channel of `b·t` is added to `a` and saturated.
pub fn add(a: u32, b: u32, t: f32) -> u32 {
    let t = t.clamp(0.0, 1.0);
    let sum = |ca: u32, cb: u32| (ca as f32 + cb as f32 * t).round().min(255.0) as u32;
    let ar = (a >> 16) & 0xFF; let br = (b >> 16) & 0xFF;
    let ag = (a >>  8) & 0xFF; let bg = (b >>  8) & 0xFF;
    let ab =  a        & 0xFF; let bb =  b        & 0xFF;
    0xFF00_0000 | (sum(ar, br) << 16) | (sum(ag, bg) << 8) | sum(ab, bb)
}
