//! GPU-compatible data types for the surface and compositing pipelines
//!
//! These types are designed to match the shader layouts exactly.
//! All types derive Pod and Zeroable for safe GPU buffer operations.

use bytemuck::{Pod, Zeroable};
use csgview_math::{mat4, Mat4};

/// Texture format of the color target that is read back
pub const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
/// Depth buffer of the frame (no stencil; written by merge passes and surfaces)
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
/// Scratch depth/stencil used while compositing a run
pub const SCRATCH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24PlusStencil8;
/// Per-pixel candidate depth of the current layer, sampled by later passes
pub const CANDIDATE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
/// Coverage mask written where the candidate survived every parity test
pub const MASK_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::R8Unorm;

/// Stencil bit toggled by each surface of the tested solid in front of the candidate
pub const PARITY_BIT: u32 = 0x01;
/// Stencil bit marking a candidate fragment as rejected
pub const INVALID_BIT: u32 = 0x80;

/// One corner of a triangle, carrying the whole triangle for edge detection
///
/// Layout: 72 bytes, six `vec3<f32>` attributes at locations 0-5.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct SurfaceVertex {
    /// Position of this corner (model space)
    pub position: [f32; 3],
    /// Face normal (model space)
    pub normal: [f32; 3],
    /// Next corner of the triangle
    pub pos_b: [f32; 3],
    /// Corner after that
    pub pos_c: [f32; 3],
    /// 1.0 where the edge opposite the corresponding corner is a real polygon edge
    pub trig: [f32; 3],
    /// One-hot selector for this corner
    pub mask: [f32; 3],
}

/// Vertex attribute locations
pub mod location {
    pub const POSITION: u32 = 0;
    pub const NORMAL: u32 = 1;
    pub const POS_B: u32 = 2;
    pub const POS_C: u32 = 3;
    pub const TRIG: u32 = 4;
    pub const MASK: u32 = 5;
}

impl SurfaceVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 6] = wgpu::vertex_attr_array![
        0 => Float32x3,
        1 => Float32x3,
        2 => Float32x3,
        3 => Float32x3,
        4 => Float32x3,
        5 => Float32x3,
    ];

    /// Vertex buffer layout shared by every surface pipeline
    pub const fn buffer_layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<SurfaceVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Per-frame uniforms (group 0)
/// Layout: 160 bytes total (must match common.wgsl FrameUniforms)
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct FrameUniforms {
    /// View matrix (64 bytes)
    pub view_matrix: [[f32; 4]; 4],
    /// Projection matrix (64 bytes)
    pub projection_matrix: [[f32; 4]; 4],
    /// Light direction (world space) + padding (16 bytes)
    pub light_dir: [f32; 4],
    /// x: horizontal scale, y: vertical scale, z: edge width, w: unused
    pub viewport: [f32; 4],
}

impl Default for FrameUniforms {
    fn default() -> Self {
        Self {
            view_matrix: mat4::IDENTITY,
            projection_matrix: mat4::IDENTITY,
            light_dir: [0.0, 0.0, 1.0, 0.0],
            viewport: [1.0, 1.0, 2.0, 0.0],
        }
    }
}

/// Per-solid uniforms (group 1)
/// Layout: 176 bytes total (must match common.wgsl PrimitiveUniforms)
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct PrimitiveUniforms {
    /// Model matrix (64 bytes)
    pub model_matrix: [[f32; 4]; 4],
    /// Inverse-transpose of the model matrix (64 bytes)
    pub normal_matrix: [[f32; 4]; 4],
    /// Lit face color
    pub face_color: [f32; 4],
    /// Unlit edge color
    pub edge_color: [f32; 4],
    /// x: normal sign, y: 1 for lit flat shading, zw: unused
    pub params: [f32; 4],
}

impl PrimitiveUniforms {
    /// Uniforms for a solid placed by `model`
    pub fn new(model: Mat4) -> Self {
        Self {
            model_matrix: model,
            normal_matrix: mat4::normal_matrix(model),
            face_color: [1.0; 4],
            edge_color: [1.0; 4],
            params: [1.0, 1.0, 0.0, 0.0],
        }
    }
}

impl Default for PrimitiveUniforms {
    fn default() -> Self {
        Self::new(mat4::IDENTITY)
    }
}

/// Byte offsets of uniform fields, reported as shader handles
pub mod offset {
    pub const FACE_COLOR: u32 = 128;
    pub const EDGE_COLOR: u32 = 144;
    pub const XSCALE: u32 = 144;
    pub const YSCALE: u32 = 148;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_surface_vertex_size() {
        assert_eq!(std::mem::size_of::<SurfaceVertex>(), 72);
        assert_eq!(SurfaceVertex::buffer_layout().array_stride, 72);
    }

    #[test]
    fn test_uniform_sizes() {
        assert_eq!(std::mem::size_of::<FrameUniforms>(), 160);
        assert_eq!(std::mem::size_of::<PrimitiveUniforms>(), 176);
    }

    #[test]
    fn test_attribute_offsets() {
        let offsets: Vec<u64> = SurfaceVertex::ATTRIBUTES.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, vec![0, 12, 24, 36, 48, 60]);
        assert_eq!(SurfaceVertex::ATTRIBUTES[location::MASK as usize].shader_location, location::MASK);
    }

    #[test]
    fn test_field_offsets() {
        let u = PrimitiveUniforms::default();
        let base = &u as *const _ as usize;
        assert_eq!(&u.face_color as *const _ as usize - base, offset::FACE_COLOR as usize);
        assert_eq!(&u.edge_color as *const _ as usize - base, offset::EDGE_COLOR as usize);
        let f = FrameUniforms::default();
        let base = &f as *const _ as usize;
        assert_eq!(&f.viewport as *const _ as usize - base, offset::XSCALE as usize);
    }

    #[test]
    fn test_candidate_depth_matches_frame_depth() {
        // Merged candidate depths are compared with Equal against surfaces
        // rasterized into the frame depth, so both use the same format
        assert!(CANDIDATE_FORMAT.has_depth_aspect());
        assert!(!CANDIDATE_FORMAT.has_color_aspect());
        assert_eq!(CANDIDATE_FORMAT, DEPTH_FORMAT);
    }

    #[test]
    fn test_stencil_bits_disjoint() {
        assert_eq!(PARITY_BIT & INVALID_BIT, 0);
    }
}
