//! Surface pipelines for the color passes
//!
//! One pipeline per shading program and depth function. Every variant draws
//! both faces: subtracted solids are seen from the inside, and the depth test
//! alone decides which fragments land.

use super::types::{COLOR_FORMAT, DEPTH_FORMAT};
use super::{
    create_shader, edge_shader_source, flat_shader_source, no_multisample, triangles, uniform_layout, SURFACE_BUFFERS,
};
use crate::compositor::{DepthFunc, ShadingProgram};

/// Color pipelines and the uniform layouts they share with the compositor
pub struct SurfacePipelines {
    /// Layout of group 0 (frame uniforms)
    pub frame_layout: wgpu::BindGroupLayout,
    /// Layout of group 1 (per-solid uniforms)
    pub primitive_layout: wgpu::BindGroupLayout,
    /// `[LessEqual, Equal]`, absent when the edge program is unavailable
    edge: Option<[wgpu::RenderPipeline; 2]>,
    /// `[LessEqual, Equal]`
    flat: [wgpu::RenderPipeline; 2],
}

impl SurfacePipelines {
    /// Create the pipelines; the edge variants only when `with_edges` is set
    pub fn new(device: &wgpu::Device, with_edges: bool) -> Self {
        let frame_layout = uniform_layout(device, "Frame Bind Group Layout");
        let primitive_layout = uniform_layout(device, "Primitive Bind Group Layout");

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Surface Pipeline Layout"),
            bind_group_layouts: &[&frame_layout, &primitive_layout],
            push_constant_ranges: &[],
        });

        let flat_shader = create_shader(device, "Flat Shader", flat_shader_source());
        let flat = [DepthFunc::LessEqual, DepthFunc::Equal].map(|func| {
            Self::create_pipeline(device, &pipeline_layout, &flat_shader, "vs_flat", "fs_flat", func)
        });

        let edge = with_edges.then(|| {
            let edge_shader = create_shader(device, "Edge Shader", edge_shader_source());
            [DepthFunc::LessEqual, DepthFunc::Equal].map(|func| {
                Self::create_pipeline(device, &pipeline_layout, &edge_shader, "vs_edge", "fs_edge", func)
            })
        });

        Self {
            frame_layout,
            primitive_layout,
            edge,
            flat,
        }
    }

    fn create_pipeline(
        device: &wgpu::Device,
        layout: &wgpu::PipelineLayout,
        shader: &wgpu::ShaderModule,
        vs_entry: &str,
        fs_entry: &str,
        func: DepthFunc,
    ) -> wgpu::RenderPipeline {
        let label = format!("Surface Pipeline ({}, {:?})", vs_entry, func);
        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(&label),
            layout: Some(layout),
            vertex: wgpu::VertexState {
                module: shader,
                entry_point: Some(vs_entry),
                buffers: &SURFACE_BUFFERS,
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: shader,
                entry_point: Some(fs_entry),
                targets: &[Some(wgpu::ColorTargetState {
                    format: COLOR_FORMAT,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: triangles(None),
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: func == DepthFunc::LessEqual,
                depth_compare: compare_function(func),
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: no_multisample(),
            multiview: None,
            cache: None,
        })
    }

    /// Whether the edge program is available
    pub fn has_edges(&self) -> bool {
        self.edge.is_some()
    }

    /// Pipeline for a program and depth function
    ///
    /// The edge program falls back to lit flat shading when it was not built.
    pub fn get(&self, program: ShadingProgram, func: DepthFunc) -> &wgpu::RenderPipeline {
        let index = depth_index(func);
        match (program, &self.edge) {
            (ShadingProgram::Edge, Some(edge)) => &edge[index],
            _ => &self.flat[index],
        }
    }
}

fn depth_index(func: DepthFunc) -> usize {
    match func {
        DepthFunc::LessEqual => 0,
        DepthFunc::Equal => 1,
    }
}

/// wgpu comparison for a depth function
pub fn compare_function(func: DepthFunc) -> wgpu::CompareFunction {
    match func {
        DepthFunc::LessEqual => wgpu::CompareFunction::LessEqual,
        DepthFunc::Equal => wgpu::CompareFunction::Equal,
    }
}

/// Whether a program shades with the lighting term (`params.y`)
pub fn is_lit(program: Option<ShadingProgram>) -> bool {
    !matches!(program, Some(ShadingProgram::Unlit))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compare_functions() {
        assert_eq!(compare_function(DepthFunc::LessEqual), wgpu::CompareFunction::LessEqual);
        assert_eq!(compare_function(DepthFunc::Equal), wgpu::CompareFunction::Equal);
    }

    #[test]
    fn test_unlit_only_for_unlit_program() {
        assert!(is_lit(Some(ShadingProgram::Edge)));
        assert!(is_lit(Some(ShadingProgram::Lit)));
        assert!(is_lit(None));
        assert!(!is_lit(Some(ShadingProgram::Unlit)));
    }
}
