//! Render mode tags
//!
//! A flattened sequence is drawn up to three times per frame (primary,
//! highlighted, background) without being modified. The pass it is drawn in
//! and the operation of each entry are carried as explicit tags instead of
//! numeric offsets added to a mode number.

use serde::{Serialize, Deserialize};

/// Boolean operation attached to a flattened entry
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CsgOp {
    /// Starts a new independent contribution (opens a new run)
    Union,
    /// Keeps only the volume shared with the run so far
    Intersection,
    /// Removes this solid's volume from the run so far
    Difference,
}

impl CsgOp {
    /// Whether this entry opens a new run
    #[inline]
    pub fn starts_run(self) -> bool {
        self == CsgOp::Union
    }

    /// Surface orientation used when this entry is rasterized
    #[inline]
    pub fn csg_mode(self) -> CsgMode {
        match self {
            CsgOp::Difference => CsgMode::Difference,
            CsgOp::Union | CsgOp::Intersection => CsgMode::Normal,
        }
    }

    /// Whether this solid is subtracted inside its run
    #[inline]
    pub fn is_subtraction(self) -> bool {
        self == CsgOp::Difference
    }
}

/// Which of the three per-frame passes a sequence is drawn in
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ChainKind {
    /// Primary objects
    #[default]
    Normal,
    /// Highlighted-object overlay
    Highlight,
    /// Background/context objects
    Background,
}

/// Orientation of a rasterized surface
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CsgMode {
    /// Outward-facing surface of a positive solid
    #[default]
    Normal,
    /// Surface of a subtracted solid; winding and normals are inverted
    Difference,
}

/// Full mode handed to the surface rasterizer
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct SurfaceMode {
    pub kind: ChainKind,
    pub base: CsgMode,
}

impl SurfaceMode {
    /// Create a surface mode
    pub const fn new(kind: ChainKind, base: CsgMode) -> Self {
        Self { kind, base }
    }

    /// Mode for an entry with the given operation drawn in the given pass
    pub fn for_entry(kind: ChainKind, op: CsgOp) -> Self {
        Self::new(kind, op.csg_mode())
    }

    /// Sign applied to surface normals
    #[inline]
    pub fn normal_sign(self) -> f32 {
        match self.base {
            CsgMode::Normal => 1.0,
            CsgMode::Difference => -1.0,
        }
    }
}

/// Selects one of the fixed default color pairs
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ColorMode {
    Material,
    Cutout,
    Highlight,
    Background,
}

impl ColorMode {
    /// Default color mode for an entry without an explicit color
    pub fn for_entry(kind: ChainKind, op: CsgOp) -> Self {
        match kind {
            ChainKind::Highlight => ColorMode::Highlight,
            ChainKind::Background => ColorMode::Background,
            ChainKind::Normal if op.is_subtraction() => ColorMode::Cutout,
            ChainKind::Normal => ColorMode::Material,
        }
    }
}
