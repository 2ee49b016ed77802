//! Primitive shape builders
//!
//! All shapes are created in local space with counter-clockwise outward
//! winding. Cubes and spheres are centered at the origin; cylinders stand on
//! the XY plane and extend along +Z.

use std::f32::consts::{PI, TAU};

use csgview_math::Vec3;
use serde::{Serialize, Deserialize};

use crate::mesh::TriangleMesh;

/// Minimum number of segments around a round shape
pub const MIN_SEGMENTS: u32 = 3;

/// Axis-aligned box centered at the origin
pub fn cube(size: Vec3) -> TriangleMesh {
    let h = size * 0.5;
    let positions = (0..8)
        .map(|i| {
            Vec3::new(
                if i & 1 == 0 { -h.x } else { h.x },
                if i & 2 == 0 { -h.y } else { h.y },
                if i & 4 == 0 { -h.z } else { h.z },
            )
        })
        .collect();
    let faces = [
        vec![0, 2, 3, 1],
        vec![4, 5, 7, 6],
        vec![0, 1, 5, 4],
        vec![2, 6, 7, 3],
        vec![0, 4, 6, 2],
        vec![1, 3, 7, 5],
    ];
    TriangleMesh::from_polygons(positions, &faces)
}

/// Truncated cone from radius `r1` at z=0 to radius `r2` at z=`height`
///
/// A radius of zero collapses that end to an apex. Both radii zero yields an
/// empty mesh.
pub fn cylinder(r1: f32, r2: f32, height: f32, segments: u32) -> TriangleMesh {
    let n = segments.max(MIN_SEGMENTS);
    let mut positions = Vec::new();

    let ring = |radius: f32, z: f32, positions: &mut Vec<Vec3>| -> Vec<u32> {
        if radius <= 0.0 {
            positions.push(Vec3::new(0.0, 0.0, z));
            return vec![positions.len() as u32 - 1];
        }
        let base = positions.len() as u32;
        for i in 0..n {
            let theta = TAU * i as f32 / n as f32;
            positions.push(Vec3::new(radius * theta.cos(), radius * theta.sin(), z));
        }
        (base..base + n).collect()
    };

    if r1 <= 0.0 && r2 <= 0.0 {
        return TriangleMesh::default();
    }

    let bottom = ring(r1, 0.0, &mut positions);
    let top = ring(r2, height, &mut positions);
    let at = |ring: &[u32], i: u32| ring[(i % n) as usize % ring.len()];

    let mut polygons = Vec::new();
    for i in 0..n {
        let mut side = vec![at(&bottom, i)];
        if bottom.len() > 1 {
            side.push(at(&bottom, i + 1));
        }
        side.push(at(&top, i + 1));
        if top.len() > 1 {
            side.push(at(&top, i));
        }
        polygons.push(side);
    }
    if bottom.len() > 1 {
        polygons.push(bottom.iter().rev().copied().collect());
    }
    if top.len() > 1 {
        polygons.push(top);
    }

    TriangleMesh::from_polygons(positions, &polygons)
}

/// Cone with its apex at z=`height`
pub fn cone(radius: f32, height: f32, segments: u32) -> TriangleMesh {
    cylinder(radius, 0.0, height, segments)
}

/// UV sphere centered at the origin with poles on the Z axis
pub fn sphere(radius: f32, segments: u32, rings: u32) -> TriangleMesh {
    let n = segments.max(MIN_SEGMENTS);
    let rings = rings.max(2);

    let mut positions = vec![Vec3::new(0.0, 0.0, radius), Vec3::new(0.0, 0.0, -radius)];
    for k in 1..rings {
        let phi = PI * k as f32 / rings as f32;
        let (rho, z) = (radius * phi.sin(), radius * phi.cos());
        for j in 0..n {
            let theta = TAU * j as f32 / n as f32;
            positions.push(Vec3::new(rho * theta.cos(), rho * theta.sin(), z));
        }
    }

    let vertex = |k: u32, j: u32| 2 + (k - 1) * n + (j % n);
    let mut polygons = Vec::new();
    for j in 0..n {
        polygons.push(vec![0, vertex(1, j), vertex(1, j + 1)]);
    }
    for k in 1..rings - 1 {
        for j in 0..n {
            polygons.push(vec![vertex(k, j), vertex(k + 1, j), vertex(k + 1, j + 1), vertex(k, j + 1)]);
        }
    }
    for j in 0..n {
        polygons.push(vec![1, vertex(rings - 1, j + 1), vertex(rings - 1, j)]);
    }

    TriangleMesh::from_polygons(positions, &polygons)
}

/// Serializable shape description
///
/// Each variant stores the parameters needed to build the mesh.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ShapeTemplate {
    /// Box centered at the origin
    Cube {
        size: [f32; 3],
    },
    /// Truncated cone standing on the XY plane
    Cylinder {
        r1: f32,
        r2: f32,
        height: f32,
        #[serde(default = "default_segments")]
        segments: u32,
    },
    /// UV sphere centered at the origin
    Sphere {
        radius: f32,
        #[serde(default = "default_segments")]
        segments: u32,
        #[serde(default = "default_rings")]
        rings: u32,
    },
}

fn default_segments() -> u32 {
    32
}

fn default_rings() -> u32 {
    16
}

impl ShapeTemplate {
    /// Create a cube template
    pub fn cube(x: f32, y: f32, z: f32) -> Self {
        ShapeTemplate::Cube { size: [x, y, z] }
    }

    /// Create a cylinder template
    pub fn cylinder(r1: f32, r2: f32, height: f32) -> Self {
        ShapeTemplate::Cylinder { r1, r2, height, segments: default_segments() }
    }

    /// Create a sphere template
    pub fn sphere(radius: f32) -> Self {
        ShapeTemplate::Sphere { radius, segments: default_segments(), rings: default_rings() }
    }

    /// Check the parameters, returning a description of the first problem
    pub fn validate(&self) -> Result<(), String> {
        let positive = |name: &str, v: f32| {
            if v.is_finite() && v > 0.0 {
                Ok(())
            } else {
                Err(format!("{} must be positive, got {}", name, v))
            }
        };
        match self {
            ShapeTemplate::Cube { size } => {
                positive("size.x", size[0])?;
                positive("size.y", size[1])?;
                positive("size.z", size[2])
            }
            ShapeTemplate::Cylinder { r1, r2, height, .. } => {
                positive("height", *height)?;
                if *r1 < 0.0 || *r2 < 0.0 || (*r1 == 0.0 && *r2 == 0.0) {
                    return Err(format!("radii must be non-negative and not both zero, got {} and {}", r1, r2));
                }
                Ok(())
            }
            ShapeTemplate::Sphere { radius, .. } => positive("radius", *radius),
        }
    }

    /// Build the mesh for this template
    pub fn create_mesh(&self) -> TriangleMesh {
        match self {
            ShapeTemplate::Cube { size } => cube(Vec3::from_array(*size)),
            ShapeTemplate::Cylinder { r1, r2, height, segments } => cylinder(*r1, *r2, *height, *segments),
            ShapeTemplate::Sphere { radius, segments, rings } => sphere(*radius, *segments, *rings),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Signed volume via the divergence theorem; positive for outward winding
    fn signed_volume(mesh: &TriangleMesh) -> f32 {
        mesh.triangles
            .iter()
            .map(|t| {
                let [a, b, c] = mesh.corners(t);
                a.dot(b.cross(c)) / 6.0
            })
            .sum()
    }

    #[test]
    fn test_cube_volume_and_outward_winding() {
        let mesh = cube(Vec3::new(2.0, 3.0, 4.0));
        assert_eq!(mesh.triangle_count(), 12);
        assert!((signed_volume(&mesh) - 24.0).abs() < 1e-4);
    }

    #[test]
    fn test_cube_hides_face_diagonals() {
        let mesh = cube(Vec3::ONE);
        let edge_flags: usize = mesh.triangles.iter().map(|t| t.edges.iter().filter(|e| **e).count()).sum();
        // 6 faces * 4 outline edges
        assert_eq!(edge_flags, 24);
    }

    #[test]
    fn test_cylinder_outward_winding() {
        let mesh = cylinder(1.0, 1.0, 2.0, 64);
        let v = signed_volume(&mesh);
        assert!(v > 0.0);
        // Close to pi * r^2 * h
        assert!((v - 2.0 * PI).abs() < 0.05, "volume {}", v);
    }

    #[test]
    fn test_cone_has_apex() {
        let mesh = cone(1.0, 1.0, 16);
        // 16 ring vertices + apex
        assert_eq!(mesh.positions.len(), 17);
        assert!(signed_volume(&mesh) > 0.0);
        assert!(mesh.is_valid());
    }

    #[test]
    fn test_inverted_cone_outward_winding() {
        let mesh = cylinder(0.0, 1.0, 1.0, 16);
        assert!(signed_volume(&mesh) > 0.0);
    }

    #[test]
    fn test_sphere_outward_winding() {
        let mesh = sphere(1.0, 48, 24);
        let v = signed_volume(&mesh);
        assert!((v - 4.0 / 3.0 * PI).abs() < 0.1, "volume {}", v);
        assert!(mesh.is_valid());
    }

    #[test]
    fn test_segments_clamped() {
        let mesh = cylinder(1.0, 1.0, 1.0, 0);
        assert_eq!(mesh.positions.len(), 6);
    }

    #[test]
    fn test_template_validation() {
        assert!(ShapeTemplate::cube(1.0, 1.0, 1.0).validate().is_ok());
        assert!(ShapeTemplate::cube(1.0, 0.0, 1.0).validate().is_err());
        assert!(ShapeTemplate::cylinder(0.0, 0.0, 1.0).validate().is_err());
        assert!(ShapeTemplate::cylinder(1.0, 0.0, 1.0).validate().is_ok());
        assert!(ShapeTemplate::sphere(-1.0).validate().is_err());
    }

    #[test]
    fn test_template_serialization() {
        let template = ShapeTemplate::sphere(2.0);
        let serialized = ron::to_string(&template).unwrap();
        let parsed: ShapeTemplate = ron::from_str(&serialized).unwrap();
        assert_eq!(parsed, template);
    }
}
