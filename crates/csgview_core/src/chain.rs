//! Flattened CSG sequences
//!
//! A normalized CSG expression reaches the renderer as an ordered list of
//! solids, each tagged with the boolean operation that combines it with what
//! came before. The list is built once per scene change and only borrowed while
//! drawing.

use std::sync::Arc;

use csgview_math::Mat4;

use crate::color::Color4;
use crate::mesh::{BoundingBox, TriangleMesh};
use crate::mode::CsgOp;

/// One solid in a flattened sequence
#[derive(Clone, Debug)]
pub struct FlattenedEntry {
    /// Mesh shared with the owner of the expression
    pub solid: Arc<TriangleMesh>,
    /// Placement in world space (column-major)
    pub transform: Mat4,
    /// How this solid combines with the run so far
    pub operation: CsgOp,
    /// Explicit fill color, if any
    pub color: Option<Color4>,
    convexity: u32,
}

impl FlattenedEntry {
    /// Create an entry with no explicit color and convexity 1
    pub fn new(solid: Arc<TriangleMesh>, transform: Mat4, operation: CsgOp) -> Self {
        Self {
            solid,
            transform,
            operation,
            color: None,
            convexity: 1,
        }
    }

    /// Set the explicit color
    pub fn with_color(mut self, color: Color4) -> Self {
        self.color = Some(color);
        self
    }

    /// Set the explicit color from a raw value that may carry the "no color" sentinel
    pub fn with_raw_color(mut self, raw: [f32; 4]) -> Self {
        self.color = Color4::from_sentinel(raw);
        self
    }

    /// Set the convexity hint (clamped to at least 1)
    pub fn with_convexity(mut self, convexity: u32) -> Self {
        self.convexity = convexity.max(1);
        self
    }

    /// Maximum number of front faces a ray can cross; always >= 1
    #[inline]
    pub fn convexity(&self) -> u32 {
        self.convexity
    }

    /// World-space bounds of this entry, or `None` for an empty mesh
    pub fn world_bounds(&self) -> Option<BoundingBox> {
        self.solid.bounds().map(|b| b.transformed(self.transform))
    }
}

/// An ordered flattened CSG sequence
#[derive(Clone, Debug, Default)]
pub struct CsgChain {
    entries: Vec<FlattenedEntry>,
}

impl CsgChain {
    /// Create an empty sequence
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry
    pub fn push(&mut self, entry: FlattenedEntry) {
        self.entries.push(entry);
    }

    /// Builder-style append
    pub fn add(mut self, entry: FlattenedEntry) -> Self {
        self.entries.push(entry);
        self
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the sequence is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in order
    pub fn entries(&self) -> &[FlattenedEntry] {
        &self.entries
    }

    /// World-space bounds of every entry, or `None` if nothing has geometry
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        self.entries
            .iter()
            .filter_map(FlattenedEntry::world_bounds)
            .reduce(BoundingBox::union)
    }
}

impl FromIterator<FlattenedEntry> for CsgChain {
    fn from_iter<I: IntoIterator<Item = FlattenedEntry>>(iter: I) -> Self {
        Self { entries: iter.into_iter().collect() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes;
    use csgview_math::{mat4, Vec3};

    fn cube_at(offset: Vec3, op: CsgOp) -> FlattenedEntry {
        FlattenedEntry::new(Arc::new(shapes::cube(Vec3::ONE)), mat4::translation(offset), op)
    }

    #[test]
    fn test_convexity_zero_clamped() {
        let entry = cube_at(Vec3::ZERO, CsgOp::Union).with_convexity(0);
        assert_eq!(entry.convexity(), 1);
        let entry = entry.with_convexity(4);
        assert_eq!(entry.convexity(), 4);
    }

    #[test]
    fn test_raw_color_sentinel() {
        let entry = cube_at(Vec3::ZERO, CsgOp::Union).with_raw_color([-1.0; 4]);
        assert!(entry.color.is_none());
        let entry = entry.with_raw_color([1.0, 0.0, 0.0, 1.0]);
        assert_eq!(entry.color, Some(Color4::new(1.0, 0.0, 0.0, 1.0)));
    }

    #[test]
    fn test_bounding_box_unions_entries() {
        let chain = CsgChain::new()
            .add(cube_at(Vec3::ZERO, CsgOp::Union))
            .add(cube_at(Vec3::new(2.0, 0.0, 0.0), CsgOp::Difference));
        let bbox = chain.bounding_box().unwrap();
        assert_eq!(bbox.min, Vec3::new(-0.5, -0.5, -0.5));
        assert_eq!(bbox.max, Vec3::new(2.5, 0.5, 0.5));
    }

    #[test]
    fn test_empty_chain_has_no_bounds() {
        assert!(CsgChain::new().bounding_box().is_none());
        assert!(CsgChain::new().is_empty());
    }

    #[test]
    fn test_shared_mesh() {
        let mesh = Arc::new(shapes::cube(Vec3::ONE));
        let chain: CsgChain = (0..3)
            .map(|_| FlattenedEntry::new(Arc::clone(&mesh), mat4::IDENTITY, CsgOp::Union))
            .collect();
        assert_eq!(chain.len(), 3);
        assert_eq!(Arc::strong_count(&mesh), 4);
    }
}
