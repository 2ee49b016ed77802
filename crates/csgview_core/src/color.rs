//! Colors and default color scheme
//!
//! Each solid is filled either with its own explicit color or with one of the
//! fixed defaults selected by [`ColorMode`]. Every default is a pair: the lit
//! face color and the unlit color used for highlighted edges.

use serde::{Serialize, Deserialize};

use crate::mode::{ChainKind, ColorMode, CsgOp};

/// Linear RGBA color with components in `[0, 1]`
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Color4(pub [f32; 4]);

impl Color4 {
    pub const WHITE: Self = Self([1.0, 1.0, 1.0, 1.0]);
    pub const BLACK: Self = Self([0.0, 0.0, 0.0, 1.0]);

    /// Create a color from components
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self([r, g, b, a])
    }

    /// Create a color from 8-bit components
    pub fn from_rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self([r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0, a as f32 / 255.0])
    }

    /// Interpret a raw color that uses negative components as the "no color" sentinel
    ///
    /// Any negative component means the color is absent.
    pub fn from_sentinel(raw: [f32; 4]) -> Option<Self> {
        if raw.iter().any(|c| *c < 0.0) {
            None
        } else {
            Some(Self(raw))
        }
    }

    /// The sentinel value used by producers for "no color"
    pub const fn sentinel() -> [f32; 4] {
        [-1.0; 4]
    }

    #[inline]
    pub fn r(&self) -> f32 {
        self.0[0]
    }

    #[inline]
    pub fn g(&self) -> f32 {
        self.0[1]
    }

    #[inline]
    pub fn b(&self) -> f32 {
        self.0[2]
    }

    #[inline]
    pub fn a(&self) -> f32 {
        self.0[3]
    }

    /// Halfway towards white, fully opaque; edge color for explicit colors
    pub fn lightened(&self) -> Self {
        Self([(self.r() + 1.0) / 2.0, (self.g() + 1.0) / 2.0, (self.b() + 1.0) / 2.0, 1.0])
    }

    /// Quantize to 8-bit RGBA
    pub fn to_rgba8(&self) -> [u8; 4] {
        self.0.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8)
    }
}

impl From<[f32; 4]> for Color4 {
    fn from(c: [f32; 4]) -> Self {
        Self(c)
    }
}

/// Face and edge color used together for one draw
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColorPair {
    /// Lit surface color
    pub face: Color4,
    /// Unlit edge highlight color
    pub edge: Color4,
}

impl ColorPair {
    pub const fn new(face: Color4, edge: Color4) -> Self {
        Self { face, edge }
    }

    /// Pair for an explicit per-entry color
    pub fn explicit(color: Color4) -> Self {
        Self::new(color, color.lightened())
    }
}

/// Default color pairs per [`ColorMode`]
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColorScheme {
    pub material: ColorPair,
    pub cutout: ColorPair,
    pub highlight: ColorPair,
    pub background: ColorPair,
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self {
            material: ColorPair::new(
                Color4::from_rgba8(0xf9, 0xd7, 0x2c, 0xff),
                Color4::from_rgba8(0xff, 0xec, 0x5e, 0xff),
            ),
            cutout: ColorPair::new(
                Color4::from_rgba8(0x9d, 0xcb, 0x51, 0xff),
                Color4::from_rgba8(0xab, 0xd8, 0x56, 0xff),
            ),
            highlight: ColorPair::new(
                Color4::from_rgba8(255, 81, 81, 128),
                Color4::from_rgba8(255, 171, 86, 128),
            ),
            background: ColorPair::new(
                Color4::from_rgba8(180, 180, 180, 128),
                Color4::from_rgba8(150, 150, 150, 128),
            ),
        }
    }
}

impl ColorScheme {
    /// Fixed default pair for a mode
    pub fn pair(&self, mode: ColorMode) -> ColorPair {
        match mode {
            ColorMode::Material => self.material,
            ColorMode::Cutout => self.cutout,
            ColorMode::Highlight => self.highlight,
            ColorMode::Background => self.background,
        }
    }

    /// Resolve the fill colors for one entry
    ///
    /// Precedence: explicit entry color, then the highlight/background/cutout
    /// default, then the material default.
    pub fn resolve(&self, explicit: Option<Color4>, kind: ChainKind, op: CsgOp) -> ColorPair {
        match explicit {
            Some(color) => ColorPair::explicit(color),
            None => self.pair(ColorMode::for_entry(kind, op)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_all_negative_is_absent() {
        assert_eq!(Color4::from_sentinel(Color4::sentinel()), None);
    }

    #[test]
    fn test_sentinel_any_negative_is_absent() {
        assert_eq!(Color4::from_sentinel([0.5, 0.5, -1.0, 1.0]), None);
        assert_eq!(Color4::from_sentinel([-0.1, 0.0, 0.0, 0.0]), None);
    }

    #[test]
    fn test_sentinel_valid_color_is_kept() {
        let c = Color4::from_sentinel([0.0, 0.25, 0.5, 1.0]);
        assert_eq!(c, Some(Color4::new(0.0, 0.25, 0.5, 1.0)));
    }

    #[test]
    fn test_explicit_color_wins_over_every_default() {
        let scheme = ColorScheme::default();
        let red = Color4::new(1.0, 0.0, 0.0, 1.0);
        for kind in [ChainKind::Normal, ChainKind::Highlight, ChainKind::Background] {
            for op in [CsgOp::Union, CsgOp::Intersection, CsgOp::Difference] {
                assert_eq!(scheme.resolve(Some(red), kind, op).face, red);
            }
        }
    }

    #[test]
    fn test_defaults_by_mode() {
        let scheme = ColorScheme::default();
        assert_eq!(scheme.resolve(None, ChainKind::Normal, CsgOp::Union), scheme.material);
        assert_eq!(scheme.resolve(None, ChainKind::Normal, CsgOp::Difference), scheme.cutout);
        assert_eq!(scheme.resolve(None, ChainKind::Highlight, CsgOp::Union), scheme.highlight);
        assert_eq!(scheme.resolve(None, ChainKind::Background, CsgOp::Difference), scheme.background);
    }

    #[test]
    fn test_default_pairs_are_distinct() {
        let s = ColorScheme::default();
        let faces = [s.material.face, s.cutout.face, s.highlight.face, s.background.face];
        for i in 0..faces.len() {
            for j in (i + 1)..faces.len() {
                assert_ne!(faces[i], faces[j]);
            }
        }
    }

    #[test]
    fn test_explicit_edge_is_lightened_and_opaque() {
        let pair = ColorPair::explicit(Color4::new(0.0, 0.5, 1.0, 0.3));
        assert_eq!(pair.edge, Color4::new(0.5, 0.75, 1.0, 1.0));
    }

    #[test]
    fn test_rgba8_round_trip() {
        let c = Color4::from_rgba8(0xf9, 0xd7, 0x2c, 0xff);
        assert_eq!(c.to_rgba8(), [0xf9, 0xd7, 0x2c, 0xff]);
    }

    #[test]
    fn test_color_reads_plain_tuple() {
        let c: Color4 = ron::from_str("(1.0, 0.5, 0.0, 1.0)").unwrap();
        assert_eq!(c, Color4::new(1.0, 0.5, 0.0, 1.0));
    }
}
