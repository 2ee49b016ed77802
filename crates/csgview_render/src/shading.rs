//! Edge-highlight shading model
//!
//! CPU mirror of `shaders/edge.wgsl` and `shaders/flat.wgsl`, plus the
//! expansion of a [`TriangleMesh`] into the per-corner vertices both shaders
//! consume.
//!
//! For a fragment inside a triangle, component `k` of the interpolated `tp`
//! is its screen distance to the edge opposite corner `k`. Comparing against
//! `tr` (the edge width for real polygon edges, -1 for triangulation
//! diagonals) decides whether the fragment belongs to an outline.

use csgview_core::{Color4, TriangleMesh, Vec3};

use crate::pipeline::types::SurfaceVertex;

/// Default outline width in pixels
pub const DEFAULT_EDGE_WIDTH: f32 = 2.0;
/// Smallest |w| used in the perspective divide
pub const MIN_W: f32 = 1e-6;
/// Sides shorter than this have no height
pub const MIN_SIDE: f32 = 1e-6;

/// Ambient term of lit flat shading
pub const AMBIENT: f32 = 0.3;
/// Diffuse term of lit flat shading
pub const DIFFUSE: f32 = 0.7;

fn safe_w(w: f32) -> f32 {
    if w.abs() < MIN_W {
        if w < 0.0 {
            -MIN_W
        } else {
            MIN_W
        }
    } else {
        w
    }
}

/// Screen-space position of a clip-space point
pub fn screen_position(clip: [f32; 4], xscale: f32, yscale: f32) -> [f32; 2] {
    let w = safe_w(clip[3]);
    [xscale * clip[0] / w, yscale * clip[1] / w]
}

fn distance2(a: [f32; 2], b: [f32; 2]) -> f32 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    (dx * dx + dy * dy).sqrt()
}

/// Height from `s0` to the side `s1`-`s2`
///
/// Zero when that side is degenerate; collinear corners give zero area.
pub fn corner_height(s0: [f32; 2], s1: [f32; 2], s2: [f32; 2]) -> f32 {
    let a = distance2(s1, s2);
    let b = distance2(s0, s1);
    let c = distance2(s0, s2);
    let s = (a + b + c) / 2.0;
    let area = (s * (s - a) * (s - b) * (s - c)).max(0.0).sqrt();
    if a > MIN_SIDE {
        2.0 * area / a
    } else {
        0.0
    }
}

/// Height of every corner to its opposite side
pub fn triangle_heights(screen: [[f32; 2]; 3]) -> [f32; 3] {
    let [s0, s1, s2] = screen;
    [
        corner_height(s0, s1, s2),
        corner_height(s1, s2, s0),
        corner_height(s2, s0, s1),
    ]
}

/// Edge thresholds of a triangle: `width` for real edges, -1 otherwise
pub fn edge_thresholds(trig: [f32; 3], width: f32) -> [f32; 3] {
    trig.map(|t| if t > 0.5 { width } else { -1.0 })
}

/// Terms one vertex hands to the rasterizer
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EdgeTerms {
    /// Interpolated (screen-linearly) to per-edge distances
    pub tp: [f32; 3],
    /// Constant over the triangle
    pub tr: [f32; 3],
}

/// Vertex stage of the edge program for one corner
///
/// `mask` is the corner's one-hot selector and `height` its distance to the
/// opposite side.
pub fn vertex_edge_terms(mask: [f32; 3], height: f32, trig: [f32; 3], width: f32) -> EdgeTerms {
    EdgeTerms {
        tp: mask.map(|m| m * height),
        tr: edge_thresholds(trig, width),
    }
}

/// Linear interpolation of the three corners' `tp` at barycentric `weights`
pub fn interpolate_tp(corners: [EdgeTerms; 3], weights: [f32; 3]) -> [f32; 3] {
    let mut tp = [0.0; 3];
    for (corner, w) in corners.iter().zip(weights) {
        for (out, v) in tp.iter_mut().zip(corner.tp) {
            *out += w * v;
        }
    }
    tp
}

/// Two-sided Lambert term `clamp(|n . l|, 0, 1)`
pub fn lambert(normal: Vec3, light: Vec3) -> f32 {
    let l = if light.length_squared() < 1e-24 {
        Vec3::Z
    } else {
        light.normalized()
    };
    normal.normalized().dot(l).abs().clamp(0.0, 1.0)
}

/// Fragment stage of the edge program
pub fn shade_fragment(tp: [f32; 3], tr: [f32; 3], face: Color4, edge: Color4, shading: f32) -> Color4 {
    if tp.iter().zip(tr).any(|(p, r)| *p < r) {
        return edge;
    }
    Color4::new(face.r() * shading, face.g() * shading, face.b() * shading, face.a())
}

/// One-sided lit shading of the flat program
///
/// `sign` flips the normal of subtracted solids.
pub fn lit_shade(face: Color4, normal: Vec3, light: Vec3, sign: f32) -> Color4 {
    let l = if light.length_squared() < 1e-24 {
        Vec3::Z
    } else {
        light.normalized()
    };
    let diffuse = (normal.normalized() * sign).dot(l).max(0.0);
    let shade = AMBIENT + DIFFUSE * diffuse;
    Color4::new(face.r() * shade, face.g() * shade, face.b() * shade, face.a())
}

/// Expand a mesh into three vertices per triangle
///
/// Corner `k` carries the next two corners in winding order, so each corner
/// measures its height to the side opposite it. `trig` is the same for all
/// three and follows the triangle's edge flags. A mesh with out-of-range
/// indices expands to nothing.
pub fn surface_vertices(mesh: &TriangleMesh) -> Vec<SurfaceVertex> {
    const MASKS: [[f32; 3]; 3] = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];

    if !mesh.is_valid() {
        log::warn!(
            "Mesh with {} positions has out-of-range triangle indices; drawing nothing",
            mesh.positions.len()
        );
        return Vec::new();
    }

    let mut vertices = Vec::with_capacity(mesh.triangle_count() * 3);
    for tri in &mesh.triangles {
        let corners = mesh.corners(tri);
        let normal = mesh.face_normal(tri).to_array();
        let trig = tri.edges.map(|e| if e { 1.0 } else { 0.0 });
        for (k, mask) in MASKS.iter().enumerate() {
            vertices.push(SurfaceVertex {
                position: corners[k].to_array(),
                normal,
                pos_b: corners[(k + 1) % 3].to_array(),
                pos_c: corners[(k + 2) % 3].to_array(),
                trig,
                mask: *mask,
            });
        }
    }
    vertices
}
