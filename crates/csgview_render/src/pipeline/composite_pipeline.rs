//! Stencil/depth pipelines for depth-layer compositing
//!
//! Per candidate layer the compositor runs:
//! - candidate: nearest unpeeled face of the candidate solid into the candidate depth
//! - load: candidate depth into the scratch depth/stencil, clearing the stencil
//! - parity: every surface of another solid in front of the candidate toggles the parity bit
//! - mark / clear: reject by parity, then reset the parity bit
//! - mask: coverage where no rejection happened
//! - merge: candidate depth into the frame depth where covered

use super::types::{CANDIDATE_FORMAT, DEPTH_FORMAT, INVALID_BIT, MASK_FORMAT, PARITY_BIT, SCRATCH_FORMAT};
use super::{
    composite_shader_source, create_shader, depth_texture_entry, float_texture_entry, fullscreen_shader_source,
    no_multisample, triangles, SURFACE_BUFFERS,
};

/// Every pipeline used to composite a run
pub struct CompositePipelines {
    /// One depth texture: the previous layer in the candidate pass (group 2),
    /// the candidate depth in the load pass (group 0)
    pub depth_layout: wgpu::BindGroupLayout,
    /// Group 0 of the merge pass (candidate depth, coverage)
    pub merge_layout: wgpu::BindGroupLayout,
    /// Candidate pass drawing front faces
    pub candidate_front: wgpu::RenderPipeline,
    /// Candidate pass drawing back faces
    pub candidate_back: wgpu::RenderPipeline,
    /// Candidate depth into the scratch target
    pub load: wgpu::RenderPipeline,
    pub parity: wgpu::RenderPipeline,
    pub mark_invalid: wgpu::RenderPipeline,
    pub clear_parity: wgpu::RenderPipeline,
    pub mask: wgpu::RenderPipeline,
    pub merge: wgpu::RenderPipeline,
}

impl CompositePipelines {
    /// Create the pipelines against the shared uniform layouts
    pub fn new(
        device: &wgpu::Device,
        frame_layout: &wgpu::BindGroupLayout,
        primitive_layout: &wgpu::BindGroupLayout,
    ) -> Self {
        let depth_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Depth Bind Group Layout"),
            entries: &[depth_texture_entry(0)],
        });
        let merge_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Merge Bind Group Layout"),
            entries: &[depth_texture_entry(0), float_texture_entry(1)],
        });

        let candidate_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Candidate Pipeline Layout"),
            bind_group_layouts: &[frame_layout, primitive_layout, &depth_layout],
            push_constant_ranges: &[],
        });
        let parity_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Parity Pipeline Layout"),
            bind_group_layouts: &[frame_layout, primitive_layout],
            push_constant_ranges: &[],
        });
        let load_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Load Pipeline Layout"),
            bind_group_layouts: &[&depth_layout],
            push_constant_ranges: &[],
        });
        let empty_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Stencil Pipeline Layout"),
            bind_group_layouts: &[],
            push_constant_ranges: &[],
        });
        let merge_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Merge Pipeline Layout"),
            bind_group_layouts: &[&merge_layout],
            push_constant_ranges: &[],
        });

        let composite_shader = create_shader(device, "Composite Shader", composite_shader_source());
        let fullscreen_shader = create_shader(device, "Fullscreen Shader", fullscreen_shader_source().to_string());

        let candidate = |face: wgpu::Face, label: &str| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&candidate_layout),
                vertex: surface_vertex_state(&composite_shader),
                fragment: Some(wgpu::FragmentState {
                    module: &composite_shader,
                    entry_point: Some("fs_candidate"),
                    targets: &[],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                primitive: triangles(Some(face)),
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: CANDIDATE_FORMAT,
                    depth_write_enabled: true,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: no_multisample(),
                multiview: None,
                cache: None,
            })
        };
        // Culling back faces keeps the front faces and vice versa
        let candidate_front = candidate(wgpu::Face::Back, "Candidate Pipeline (front faces)");
        let candidate_back = candidate(wgpu::Face::Front, "Candidate Pipeline (back faces)");

        let load = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Load Pipeline"),
            layout: Some(&load_layout),
            vertex: fullscreen_vertex_state(&fullscreen_shader),
            fragment: Some(wgpu::FragmentState {
                module: &fullscreen_shader,
                entry_point: Some("fs_load"),
                targets: &[],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: triangles(None),
            depth_stencil: Some(wgpu::DepthStencilState {
                format: SCRATCH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Always,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: no_multisample(),
            multiview: None,
            cache: None,
        });

        let parity = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Parity Pipeline"),
            layout: Some(&parity_layout),
            vertex: surface_vertex_state(&composite_shader),
            fragment: None,
            primitive: triangles(None),
            depth_stencil: Some(scratch_state(
                wgpu::CompareFunction::Less,
                wgpu::CompareFunction::Always,
                wgpu::StencilOperation::Invert,
                0xff,
                PARITY_BIT,
            )),
            multisample: no_multisample(),
            multiview: None,
            cache: None,
        });

        let stencil_only = |label: &str, compare, pass_op, read_mask, write_mask| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&empty_layout),
                vertex: fullscreen_vertex_state(&fullscreen_shader),
                fragment: None,
                primitive: triangles(None),
                depth_stencil: Some(scratch_state(
                    wgpu::CompareFunction::Always,
                    compare,
                    pass_op,
                    read_mask,
                    write_mask,
                )),
                multisample: no_multisample(),
                multiview: None,
                cache: None,
            })
        };
        // Reference 0x80 rejects even parity, 0x81 odd parity
        let mark_invalid = stencil_only(
            "Mark Invalid Pipeline",
            wgpu::CompareFunction::Equal,
            wgpu::StencilOperation::Replace,
            PARITY_BIT,
            INVALID_BIT,
        );
        let clear_parity = stencil_only(
            "Clear Parity Pipeline",
            wgpu::CompareFunction::Always,
            wgpu::StencilOperation::Zero,
            0xff,
            PARITY_BIT,
        );

        let mask = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Mask Pipeline"),
            layout: Some(&empty_layout),
            vertex: fullscreen_vertex_state(&fullscreen_shader),
            fragment: Some(wgpu::FragmentState {
                module: &fullscreen_shader,
                entry_point: Some("fs_mask"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: MASK_FORMAT,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: triangles(None),
            depth_stencil: Some(scratch_state(
                wgpu::CompareFunction::Always,
                wgpu::CompareFunction::Equal,
                wgpu::StencilOperation::Keep,
                INVALID_BIT,
                0,
            )),
            multisample: no_multisample(),
            multiview: None,
            cache: None,
        });

        let merge = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Merge Pipeline"),
            layout: Some(&merge_pipeline_layout),
            vertex: fullscreen_vertex_state(&fullscreen_shader),
            fragment: Some(wgpu::FragmentState {
                module: &fullscreen_shader,
                entry_point: Some("fs_merge"),
                targets: &[],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: triangles(None),
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: no_multisample(),
            multiview: None,
            cache: None,
        });

        Self {
            depth_layout,
            merge_layout,
            candidate_front,
            candidate_back,
            load,
            parity,
            mark_invalid,
            clear_parity,
            mask,
            merge,
        }
    }

    /// Candidate pipeline for a solid
    ///
    /// Subtracted solids contribute their back faces. A mirroring transform
    /// reverses the winding, which swaps the culled face.
    pub fn candidate(&self, subtracted: bool, mirrored: bool) -> &wgpu::RenderPipeline {
        if candidate_uses_front_faces(subtracted, mirrored) {
            &self.candidate_front
        } else {
            &self.candidate_back
        }
    }
}

/// Whether the candidate pass keeps faces that are front-facing by winding
pub fn candidate_uses_front_faces(subtracted: bool, mirrored: bool) -> bool {
    subtracted == mirrored
}

/// Stencil reference for the mark pass of a tested solid
///
/// Intersected solids must contain the candidate (odd parity), subtracted
/// solids must not (even parity); the other parity is marked invalid.
pub fn mark_reference(subtracted: bool) -> u32 {
    if subtracted {
        INVALID_BIT | PARITY_BIT
    } else {
        INVALID_BIT
    }
}

fn surface_vertex_state(module: &wgpu::ShaderModule) -> wgpu::VertexState<'_> {
    wgpu::VertexState {
        module,
        entry_point: Some("vs_position"),
        buffers: &SURFACE_BUFFERS,
        compilation_options: wgpu::PipelineCompilationOptions::default(),
    }
}

fn fullscreen_vertex_state(module: &wgpu::ShaderModule) -> wgpu::VertexState<'_> {
    wgpu::VertexState {
        module,
        entry_point: Some("vs_fullscreen"),
        buffers: &[],
        compilation_options: wgpu::PipelineCompilationOptions::default(),
    }
}

fn scratch_state(
    depth_compare: wgpu::CompareFunction,
    stencil_compare: wgpu::CompareFunction,
    pass_op: wgpu::StencilOperation,
    read_mask: u32,
    write_mask: u32,
) -> wgpu::DepthStencilState {
    let face = wgpu::StencilFaceState {
        compare: stencil_compare,
        fail_op: wgpu::StencilOperation::Keep,
        depth_fail_op: wgpu::StencilOperation::Keep,
        pass_op,
    };
    wgpu::DepthStencilState {
        format: SCRATCH_FORMAT,
        depth_write_enabled: false,
        depth_compare,
        stencil: wgpu::StencilState {
            front: face,
            back: face,
            read_mask,
            write_mask,
        },
        bias: wgpu::DepthBiasState::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Stencil Equal test as the GPU evaluates it
    fn passes(reference: u32, stencil: u32, read_mask: u32) -> bool {
        reference & read_mask == stencil & read_mask
    }

    #[test]
    fn test_intersected_solid_rejects_even_parity() {
        let r = mark_reference(false);
        assert!(passes(r, 0x00, PARITY_BIT));
        assert!(!passes(r, 0x01, PARITY_BIT));
        // Replace writes only the invalid bit
        assert_eq!(r & INVALID_BIT, INVALID_BIT);
    }

    #[test]
    fn test_subtracted_solid_rejects_odd_parity() {
        let r = mark_reference(true);
        assert!(passes(r, 0x01, PARITY_BIT));
        assert!(passes(r, 0x81, PARITY_BIT));
        assert!(!passes(r, 0x80, PARITY_BIT));
        assert_eq!(r & INVALID_BIT, INVALID_BIT);
    }

    #[test]
    fn test_candidate_faces() {
        assert!(candidate_uses_front_faces(false, false));
        assert!(!candidate_uses_front_faces(true, false));
        assert!(!candidate_uses_front_faces(false, true));
        assert!(candidate_uses_front_faces(true, true));
    }
}
