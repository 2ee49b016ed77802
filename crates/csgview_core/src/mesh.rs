//! Triangulated meshes
//!
//! Solids reach the renderer as triangle meshes. Every triangle remembers
//! which of its edges belong to the original polygon outline so that only real
//! edges are highlighted, not the diagonals introduced by triangulation.

use csgview_math::{mat4, Mat4, Vec3};

/// A triangle as indices into the mesh's position list
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Triangle {
    /// Vertex indices in counter-clockwise order (seen from outside)
    pub indices: [u32; 3],
    /// `edges[k]` is true when the edge opposite vertex `k` is a polygon edge
    pub edges: [bool; 3],
}

impl Triangle {
    /// Triangle whose three edges are all polygon edges
    pub fn new(indices: [u32; 3]) -> Self {
        Self { indices, edges: [true; 3] }
    }

    /// Triangle with explicit edge flags
    pub fn with_edges(indices: [u32; 3], edges: [bool; 3]) -> Self {
        Self { indices, edges }
    }
}

/// Axis-aligned bounding box
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl BoundingBox {
    /// Box containing a single point
    pub fn from_point(p: Vec3) -> Self {
        Self { min: p, max: p }
    }

    /// Grow to include a point
    pub fn include(&mut self, p: Vec3) {
        self.min = self.min.min_components(p);
        self.max = self.max.max_components(p);
    }

    /// Union with another box
    pub fn union(self, other: Self) -> Self {
        Self {
            min: self.min.min_components(other.min),
            max: self.max.max_components(other.max),
        }
    }

    /// Center point
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Half of the diagonal length
    pub fn radius(&self) -> f32 {
        (self.max - self.min).length() / 2.0
    }

    /// The eight corners
    pub fn corners(&self) -> [Vec3; 8] {
        let (a, b) = (self.min, self.max);
        [
            Vec3::new(a.x, a.y, a.z),
            Vec3::new(b.x, a.y, a.z),
            Vec3::new(a.x, b.y, a.z),
            Vec3::new(b.x, b.y, a.z),
            Vec3::new(a.x, a.y, b.z),
            Vec3::new(b.x, a.y, b.z),
            Vec3::new(a.x, b.y, b.z),
            Vec3::new(b.x, b.y, b.z),
        ]
    }

    /// Bounds of this box after an affine transform
    pub fn transformed(&self, m: Mat4) -> Self {
        let corners = self.corners();
        let mut result = Self::from_point(mat4::transform_point(m, corners[0]));
        for c in &corners[1..] {
            result.include(mat4::transform_point(m, *c));
        }
        result
    }
}

/// An immutable triangulated surface
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TriangleMesh {
    pub positions: Vec<Vec3>,
    pub triangles: Vec<Triangle>,
}

impl TriangleMesh {
    /// Create a mesh from positions and triangles
    pub fn new(positions: Vec<Vec3>, triangles: Vec<Triangle>) -> Self {
        Self { positions, triangles }
    }

    /// Build a mesh from convex polygons by fan triangulation
    ///
    /// Polygons with fewer than three vertices are skipped. Fan diagonals are
    /// flagged as non-edges.
    pub fn from_polygons(positions: Vec<Vec3>, polygons: &[Vec<u32>]) -> Self {
        let mut triangles = Vec::new();
        for poly in polygons {
            let n = poly.len();
            if n < 3 {
                continue;
            }
            for i in 1..n - 1 {
                // Fan triangle (v0, vi, vi+1): edge opposite v0 is always an
                // outline edge; the other two are outline edges only at the ends.
                let first = i == 1;
                let last = i == n - 2;
                triangles.push(Triangle::with_edges(
                    [poly[0], poly[i], poly[i + 1]],
                    [true, last, first],
                ));
            }
        }
        Self { positions, triangles }
    }

    /// Number of triangles
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Whether the mesh has no triangles
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// The three corner positions of a triangle
    pub fn corners(&self, tri: &Triangle) -> [Vec3; 3] {
        tri.indices.map(|i| self.positions[i as usize])
    }

    /// Unit face normal (zero for degenerate triangles)
    pub fn face_normal(&self, tri: &Triangle) -> Vec3 {
        let [p0, p1, p2] = self.corners(tri);
        (p1 - p0).cross(p2 - p0).normalized()
    }

    /// Local-space bounds, or `None` for an empty mesh
    pub fn bounds(&self) -> Option<BoundingBox> {
        let mut iter = self.positions.iter();
        let mut bbox = BoundingBox::from_point(*iter.next()?);
        for p in iter {
            bbox.include(*p);
        }
        Some(bbox)
    }

    /// Check that every index is in range
    pub fn is_valid(&self) -> bool {
        let n = self.positions.len() as u32;
        self.triangles.iter().all(|t| t.indices.iter().all(|i| *i < n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> TriangleMesh {
        TriangleMesh::from_polygons(
            vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(1.0, 1.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
            ],
            &[vec![0, 1, 2, 3]],
        )
    }

    #[test]
    fn test_fan_triangulation_flags_diagonal() {
        let mesh = quad();
        assert_eq!(mesh.triangle_count(), 2);
        // (0,1,2): edge 1-2 outline, edge 2-0 diagonal, edge 0-1 outline
        assert_eq!(mesh.triangles[0].edges, [true, false, true]);
        // (0,2,3): edge 2-3 outline, edge 3-0 outline, edge 0-2 diagonal
        assert_eq!(mesh.triangles[1].edges, [true, true, false]);
    }

    #[test]
    fn test_triangle_polygon_keeps_all_edges() {
        let mesh = TriangleMesh::from_polygons(
            vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            &[vec![0, 1, 2]],
        );
        assert_eq!(mesh.triangles[0].edges, [true, true, true]);
    }

    #[test]
    fn test_degenerate_polygons_skipped() {
        let mesh = TriangleMesh::from_polygons(vec![Vec3::ZERO, Vec3::X], &[vec![0, 1]]);
        assert!(mesh.is_empty());
        assert!(mesh.is_valid());
    }

    #[test]
    fn test_face_normal_ccw_points_up() {
        let mesh = quad();
        let n = mesh.face_normal(&mesh.triangles[0]);
        assert_eq!(n, Vec3::Z);
    }

    #[test]
    fn test_face_normal_collinear_is_zero() {
        let mesh = TriangleMesh::new(
            vec![Vec3::ZERO, Vec3::X, Vec3::new(2.0, 0.0, 0.0)],
            vec![Triangle::new([0, 1, 2])],
        );
        assert_eq!(mesh.face_normal(&mesh.triangles[0]), Vec3::ZERO);
    }

    #[test]
    fn test_bounds() {
        let bbox = quad().bounds().unwrap();
        assert_eq!(bbox.min, Vec3::ZERO);
        assert_eq!(bbox.max, Vec3::new(1.0, 1.0, 0.0));
        assert!(TriangleMesh::default().bounds().is_none());
    }

    #[test]
    fn test_bounds_transformed() {
        let bbox = BoundingBox { min: Vec3::ZERO, max: Vec3::ONE };
        let moved = bbox.transformed(mat4::translation(Vec3::new(1.0, 0.0, -1.0)));
        assert_eq!(moved.min, Vec3::new(1.0, 0.0, -1.0));
        assert_eq!(moved.max, Vec3::new(2.0, 1.0, 0.0));
    }

    #[test]
    fn test_center_and_radius() {
        let bbox = BoundingBox { min: Vec3::new(-1.0, -1.0, -1.0), max: Vec3::ONE };
        assert_eq!(bbox.center(), Vec3::ZERO);
        assert!((bbox.radius() - 3.0f32.sqrt()).abs() < 1e-5);
    }

    #[test]
    fn test_invalid_index_detected() {
        let mesh = TriangleMesh::new(vec![Vec3::ZERO], vec![Triangle::new([0, 1, 2])]);
        assert!(!mesh.is_valid());
    }
}
