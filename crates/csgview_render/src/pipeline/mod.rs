//! Rendering pipeline components
//!
//! This module contains the surface (color) pipelines and the stencil/depth
//! pipelines used to composite CSG runs.

pub mod types;
pub mod surface_pipeline;
pub mod composite_pipeline;

// Re-export types
pub use types::{
    FrameUniforms, PrimitiveUniforms, SurfaceVertex, CANDIDATE_FORMAT, COLOR_FORMAT,
    DEPTH_FORMAT, INVALID_BIT, MASK_FORMAT, PARITY_BIT, SCRATCH_FORMAT,
};

// Re-export pipelines
pub use surface_pipeline::SurfacePipelines;
pub use composite_pipeline::CompositePipelines;

const COMMON_WGSL: &str = include_str!("../shaders/common.wgsl");
const EDGE_WGSL: &str = include_str!("../shaders/edge.wgsl");
const FLAT_WGSL: &str = include_str!("../shaders/flat.wgsl");
const COMPOSITE_WGSL: &str = include_str!("../shaders/composite.wgsl");
const FULLSCREEN_WGSL: &str = include_str!("../shaders/fullscreen.wgsl");

/// Full source of the edge-highlight program
pub fn edge_shader_source() -> String {
    format!("{}\n{}", COMMON_WGSL, EDGE_WGSL)
}

/// Full source of the flat (lit/unlit) program
pub fn flat_shader_source() -> String {
    format!("{}\n{}", COMMON_WGSL, FLAT_WGSL)
}

/// Full source of the candidate/parity program
pub fn composite_shader_source() -> String {
    format!("{}\n{}", COMMON_WGSL, COMPOSITE_WGSL)
}

/// Source of the fullscreen passes (no shared uniforms)
pub fn fullscreen_shader_source() -> &'static str {
    FULLSCREEN_WGSL
}

/// Vertex buffers of every pipeline that rasterizes solids
pub(crate) const SURFACE_BUFFERS: [wgpu::VertexBufferLayout<'static>; 1] = [SurfaceVertex::buffer_layout()];

pub(crate) fn create_shader(device: &wgpu::Device, label: &str, source: String) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    })
}

pub(crate) fn uniform_layout(device: &wgpu::Device, label: &str) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
    })
}

fn texture_entry(binding: u32, sample_type: wgpu::TextureSampleType) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type,
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

/// `texture_depth_2d`, read with `textureLoad`
pub(crate) fn depth_texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    texture_entry(binding, wgpu::TextureSampleType::Depth)
}

/// `texture_2d<f32>`, read with `textureLoad`
pub(crate) fn float_texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    texture_entry(binding, wgpu::TextureSampleType::Float { filterable: false })
}

fn no_multisample() -> wgpu::MultisampleState {
    wgpu::MultisampleState {
        count: 1,
        mask: !0,
        alpha_to_coverage_enabled: false,
    }
}

fn triangles(cull_mode: Option<wgpu::Face>) -> wgpu::PrimitiveState {
    wgpu::PrimitiveState {
        topology: wgpu::PrimitiveTopology::TriangleList,
        strip_index_format: None,
        front_face: wgpu::FrontFace::Ccw,
        cull_mode,
        unclipped_depth: false,
        polygon_mode: wgpu::PolygonMode::Fill,
        conservative: false,
    }
}
