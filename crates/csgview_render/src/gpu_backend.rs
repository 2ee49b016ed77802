//! wgpu implementation of [`CsgBackend`]
//!
//! Each run records into its own command encoder inside a validation error
//! scope. Compositing passes are recorded as soon as `composite` is called;
//! surface draws are queued and flushed into a single color pass when the run
//! ends. The run is submitted before the next one starts, so per-solid
//! uniform slots can be rewritten freely between runs.

use std::sync::Arc;

use csgview_core::{
    mat4, ChainKind, Color4, ColorPair, CsgOp, FlattenedEntry, Mat4, SlotPool, SurfaceMode, TriangleMesh, Vec3,
};
use wgpu::util::DeviceExt;

use crate::capability::CapabilityRecord;
use crate::compositor::{CompositeError, CsgBackend, DepthFunc, ShadingProgram};
use crate::context::ContextError;
use crate::mesh_cache::MeshCache;
use crate::pipeline::composite_pipeline::mark_reference;
use crate::pipeline::surface_pipeline::is_lit;
use crate::pipeline::{
    CompositePipelines, FrameUniforms, PrimitiveUniforms, SurfacePipelines, CANDIDATE_FORMAT, COLOR_FORMAT,
    DEPTH_FORMAT, MASK_FORMAT, SCRATCH_FORMAT,
};
use crate::shading::{surface_vertices, DEFAULT_EDGE_WIDTH};

/// Vertex buffer of one solid
pub struct GpuMesh {
    vertex_buffer: Option<wgpu::Buffer>,
    vertex_count: u32,
}

impl GpuMesh {
    pub fn new(device: &wgpu::Device, mesh: &TriangleMesh) -> Self {
        let vertices = surface_vertices(mesh);
        let vertex_buffer = (!vertices.is_empty()).then(|| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Surface Vertex Buffer"),
                contents: bytemuck::cast_slice(&vertices),
                usage: wgpu::BufferUsages::VERTEX,
            })
        });
        Self {
            vertex_buffer,
            vertex_count: vertices.len() as u32,
        }
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        if let Some(buffer) = &self.vertex_buffer {
            pass.set_vertex_buffer(0, buffer.slice(..));
            pass.draw(0..self.vertex_count, 0..1);
        }
    }
}

/// Uniform buffer and bind group for one solid of the current run
struct PrimitiveSlot {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl PrimitiveSlot {
    fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, index: usize) -> Self {
        let label = format!("Primitive Slot {}", index);
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&label),
            size: std::mem::size_of::<PrimitiveUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&label),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });
        Self { buffer, bind_group }
    }
}

fn render_texture(
    device: &wgpu::Device,
    label: &str,
    format: wgpu::TextureFormat,
    usage: wgpu::TextureUsages,
    size: wgpu::Extent3d,
) -> (wgpu::Texture, wgpu::TextureView) {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    (texture, view)
}

/// Offscreen attachments of a frame
struct FrameTargets {
    size: wgpu::Extent3d,
    color: wgpu::Texture,
    color_view: wgpu::TextureView,
    depth_view: wgpu::TextureView,
    scratch_view: wgpu::TextureView,
    candidate: wgpu::Texture,
    candidate_view: wgpu::TextureView,
    peel: wgpu::Texture,
    peel_view: wgpu::TextureView,
    mask_view: wgpu::TextureView,
    peel_bind_group: wgpu::BindGroup,
    load_bind_group: wgpu::BindGroup,
    merge_bind_group: wgpu::BindGroup,
}

impl FrameTargets {
    fn new(device: &wgpu::Device, pipelines: &CompositePipelines, width: u32, height: u32) -> Self {
        use wgpu::TextureUsages as U;

        let size = wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        };
        let (color, color_view) =
            render_texture(device, "Color Target", COLOR_FORMAT, U::RENDER_ATTACHMENT | U::COPY_SRC, size);
        let (_, depth_view) = render_texture(device, "Depth Target", DEPTH_FORMAT, U::RENDER_ATTACHMENT, size);
        let (_, scratch_view) =
            render_texture(device, "Scratch Depth/Stencil", SCRATCH_FORMAT, U::RENDER_ATTACHMENT, size);
        let (candidate, candidate_view) = render_texture(
            device,
            "Candidate Depth",
            CANDIDATE_FORMAT,
            U::RENDER_ATTACHMENT | U::TEXTURE_BINDING | U::COPY_SRC,
            size,
        );
        // Written by clears and depth-to-depth copies only
        let (peel, peel_view) = render_texture(
            device,
            "Peel Depth",
            CANDIDATE_FORMAT,
            U::RENDER_ATTACHMENT | U::TEXTURE_BINDING | U::COPY_DST,
            size,
        );
        let (_, mask_view) =
            render_texture(device, "Coverage Mask", MASK_FORMAT, U::RENDER_ATTACHMENT | U::TEXTURE_BINDING, size);

        let depth_bind_group = |label: &str, view: &wgpu::TextureView| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout: &pipelines.depth_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(view),
                }],
            })
        };
        let peel_bind_group = depth_bind_group("Peel Bind Group", &peel_view);
        let load_bind_group = depth_bind_group("Load Bind Group", &candidate_view);
        let merge_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Merge Bind Group"),
            layout: &pipelines.merge_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&candidate_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&mask_view),
                },
            ],
        });

        Self {
            size,
            color,
            color_view,
            depth_view,
            scratch_view,
            candidate,
            candidate_view,
            peel,
            peel_view,
            mask_view,
            peel_bind_group,
            load_bind_group,
            merge_bind_group,
        }
    }
}

/// Per-frame view parameters
#[derive(Clone, Copy, Debug)]
pub struct FrameSettings {
    pub view: Mat4,
    pub projection: Mat4,
    /// World-space direction towards the light
    pub light_dir: Vec3,
    /// Outline width in pixels
    pub edge_width: f32,
    pub background: Color4,
}

impl Default for FrameSettings {
    fn default() -> Self {
        Self {
            view: mat4::IDENTITY,
            projection: mat4::IDENTITY,
            light_dir: Vec3::new(-1.0, -1.0, 1.0),
            edge_width: DEFAULT_EDGE_WIDTH,
            background: Color4::WHITE,
        }
    }
}

/// Surface draw waiting for the run's color pass
struct PendingDraw {
    mesh: Arc<GpuMesh>,
    slot: usize,
    program: Option<ShadingProgram>,
    depth: DepthFunc,
}

/// Offscreen wgpu renderer driven by the compositor
pub struct GpuBackend {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    surface: SurfacePipelines,
    composite: CompositePipelines,
    frame_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    targets: FrameTargets,
    meshes: MeshCache<GpuMesh>,
    slots: SlotPool<PrimitiveSlot>,

    // Current run
    encoder: Option<wgpu::CommandEncoder>,
    cursor: usize,
    depth_func: DepthFunc,
    program: Option<ShadingProgram>,
    colors: ColorPair,
    pending: Vec<PendingDraw>,
}

impl GpuBackend {
    /// Create the backend for a probed context
    ///
    /// The edge pipelines exist only when the probe built the edge program.
    pub fn new(
        device: Arc<wgpu::Device>,
        queue: Arc<wgpu::Queue>,
        capabilities: &CapabilityRecord,
        width: u32,
        height: u32,
    ) -> Self {
        let surface = SurfacePipelines::new(&device, capabilities.is_shading_capable());
        let composite = CompositePipelines::new(&device, &surface.frame_layout, &surface.primitive_layout);

        let frame_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Frame Uniform Buffer"),
            size: std::mem::size_of::<FrameUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Frame Bind Group"),
            layout: &surface.frame_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: frame_buffer.as_entire_binding(),
            }],
        });
        let targets = FrameTargets::new(&device, &composite, width, height);

        Self {
            device,
            queue,
            surface,
            composite,
            frame_buffer,
            frame_bind_group,
            targets,
            meshes: MeshCache::new(),
            slots: SlotPool::new(),
            encoder: None,
            cursor: 0,
            depth_func: DepthFunc::LessEqual,
            program: None,
            colors: ColorPair::explicit(Color4::WHITE),
            pending: Vec::new(),
        }
    }

    /// Target size in pixels
    pub fn size(&self) -> (u32, u32) {
        (self.targets.size.width, self.targets.size.height)
    }

    /// Whether the edge pipelines were built
    pub fn has_edge_program(&self) -> bool {
        self.surface.has_edges()
    }

    /// Largest run composited so far
    pub fn slot_high_water(&self) -> usize {
        self.slots.high_water()
    }

    /// Upload view parameters and clear color and depth
    pub fn begin_frame(&mut self, settings: &FrameSettings) {
        let (width, height) = self.size();
        let uniforms = FrameUniforms {
            view_matrix: settings.view,
            projection_matrix: settings.projection,
            light_dir: [settings.light_dir.x, settings.light_dir.y, settings.light_dir.z, 0.0],
            viewport: [width as f32 / 2.0, height as f32 / 2.0, settings.edge_width, 0.0],
        };
        self.queue.write_buffer(&self.frame_buffer, 0, bytemuck::bytes_of(&uniforms));

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Clear Encoder"),
        });
        {
            let [r, g, b, a] = settings.background.0;
            let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Clear Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.targets.color_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: r as f64,
                            g: g as f64,
                            b: b as f64,
                            a: a as f64,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.targets.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
        }
        self.queue.submit(std::iter::once(encoder.finish()));

        let dropped = self.meshes.prune();
        if dropped > 0 {
            log::debug!("Released {} unused meshes", dropped);
        }
    }

    /// Read the color target back as tightly packed RGBA8 rows
    pub fn read_pixels(&self) -> Result<Vec<u8>, ContextError> {
        let (width, height) = self.size();
        let unpadded = width * 4;
        let padded = padded_bytes_per_row(width);

        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Readback Buffer"),
            size: padded as u64 * height as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Readback Encoder"),
        });
        encoder.copy_texture_to_buffer(
            self.targets.color.as_image_copy(),
            wgpu::TexelCopyBufferInfo {
                buffer: &buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded),
                    rows_per_image: Some(height),
                },
            },
            self.targets.size,
        );
        self.queue.submit(std::iter::once(encoder.finish()));

        let slice = buffer.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        let _ = self.device.poll(wgpu::Maintain::Wait);
        rx.recv()
            .map_err(|e| ContextError::Readback(e.to_string()))?
            .map_err(|e| ContextError::Readback(e.to_string()))?;

        let mut pixels = Vec::with_capacity((unpadded * height) as usize);
        {
            let data = slice.get_mapped_range();
            for row in data.chunks(padded as usize) {
                pixels.extend_from_slice(&row[..unpadded as usize]);
            }
        }
        buffer.unmap();
        Ok(pixels)
    }

    fn ensure_slots(&mut self, count: usize) {
        if self.slots.in_use() >= count {
            return;
        }
        let device = &self.device;
        let layout = &self.surface.primitive_layout;
        self.slots.reserve(count, |index| PrimitiveSlot::new(device, layout, index));
    }

    fn write_slot(&self, index: usize, uniforms: &PrimitiveUniforms) {
        if let Some(slot) = self.slots.get(index) {
            self.queue.write_buffer(&slot.buffer, 0, bytemuck::bytes_of(uniforms));
        }
    }

    fn gpu_mesh(&mut self, mesh: &Arc<TriangleMesh>) -> Arc<GpuMesh> {
        let device = &self.device;
        self.meshes.get_or_insert_with(mesh, |m| GpuMesh::new(device, m))
    }

    fn flush_pending(&mut self) {
        let Some(encoder) = self.encoder.as_mut() else {
            return;
        };
        if self.pending.is_empty() {
            return;
        }

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Surface Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &self.targets.color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.targets.depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        pass.set_bind_group(0, &self.frame_bind_group, &[]);
        for draw in &self.pending {
            let Some(slot) = self.slots.get(draw.slot) else {
                continue;
            };
            let program = draw.program.unwrap_or(ShadingProgram::Lit);
            pass.set_pipeline(self.surface.get(program, draw.depth));
            pass.set_bind_group(1, &slot.bind_group, &[]);
            draw.mesh.draw(&mut pass);
        }
    }
}

/// Row pitch of a readback buffer for `width` RGBA8 pixels
pub fn padded_bytes_per_row(width: u32) -> u32 {
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    (width * 4).div_ceil(align) * align
}

/// Whether a run entry is subtracted from the run's first solid
fn is_subtracted(index: usize, op: CsgOp) -> bool {
    index > 0 && op == CsgOp::Difference
}

/// Everything the compositing passes read
struct CompositeInputs<'a> {
    targets: &'a FrameTargets,
    pipelines: &'a CompositePipelines,
    frame: &'a wgpu::BindGroup,
    slots: &'a [PrimitiveSlot],
    meshes: &'a [Arc<GpuMesh>],
    subtracted: &'a [bool],
    mirrored: &'a [bool],
}

impl CompositeInputs<'_> {
    /// Reset the previous layer to the near plane so the first layer peels nothing
    fn clear_peel(&self, encoder: &mut wgpu::CommandEncoder) {
        let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Peel Clear Pass"),
            color_attachments: &[],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.targets.peel_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(0.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });
    }

    fn scratch_attachment(&self, load: bool) -> wgpu::RenderPassDepthStencilAttachment<'_> {
        let (depth_load, stencil_load) = if load {
            (wgpu::LoadOp::Load, wgpu::LoadOp::Load)
        } else {
            (wgpu::LoadOp::Clear(1.0), wgpu::LoadOp::Clear(0))
        };
        wgpu::RenderPassDepthStencilAttachment {
            view: &self.targets.scratch_view,
            depth_ops: Some(wgpu::Operations {
                load: depth_load,
                store: wgpu::StoreOp::Store,
            }),
            stencil_ops: Some(wgpu::Operations {
                load: stencil_load,
                store: wgpu::StoreOp::Store,
            }),
        }
    }

    /// Nearest unpeeled candidate face of solid `p`
    fn candidate_pass(&self, encoder: &mut wgpu::CommandEncoder, p: usize) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Candidate Pass"),
            color_attachments: &[],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.targets.candidate_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_pipeline(self.pipelines.candidate(self.subtracted[p], self.mirrored[p]));
        pass.set_bind_group(0, self.frame, &[]);
        pass.set_bind_group(1, &self.slots[p].bind_group, &[]);
        pass.set_bind_group(2, &self.targets.peel_bind_group, &[]);
        self.meshes[p].draw(&mut pass);
    }

    /// Candidate depth into a cleared scratch depth/stencil target
    fn load_pass(&self, encoder: &mut wgpu::CommandEncoder) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Load Pass"),
            color_attachments: &[],
            depth_stencil_attachment: Some(self.scratch_attachment(false)),
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_pipeline(&self.pipelines.load);
        pass.set_bind_group(0, &self.targets.load_bind_group, &[]);
        pass.draw(0..3, 0..1);
    }

    /// Reject candidate pixels of `p` that fall on the wrong side of any other solid
    fn parity_pass(&self, encoder: &mut wgpu::CommandEncoder, p: usize) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Parity Pass"),
            color_attachments: &[],
            depth_stencil_attachment: Some(self.scratch_attachment(true)),
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_bind_group(0, self.frame, &[]);
        for q in (0..self.meshes.len()).filter(|&q| q != p) {
            pass.set_pipeline(&self.pipelines.parity);
            pass.set_bind_group(1, &self.slots[q].bind_group, &[]);
            self.meshes[q].draw(&mut pass);

            pass.set_pipeline(&self.pipelines.mark_invalid);
            pass.set_stencil_reference(mark_reference(self.subtracted[q]));
            pass.draw(0..3, 0..1);

            pass.set_pipeline(&self.pipelines.clear_parity);
            pass.draw(0..3, 0..1);
        }
    }

    fn mask_pass(&self, encoder: &mut wgpu::CommandEncoder) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Mask Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &self.targets.mask_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(self.scratch_attachment(true)),
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_pipeline(&self.pipelines.mask);
        pass.set_stencil_reference(0);
        pass.draw(0..3, 0..1);
    }

    fn merge_pass(&self, encoder: &mut wgpu::CommandEncoder) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Merge Pass"),
            color_attachments: &[],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.targets.depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_pipeline(&self.pipelines.merge);
        pass.set_bind_group(0, &self.targets.merge_bind_group, &[]);
        pass.draw(0..3, 0..1);
    }

    fn record(&self, encoder: &mut wgpu::CommandEncoder, convexity: &[u32]) {
        for p in 0..self.meshes.len() {
            self.clear_peel(encoder);
            let layers = convexity[p].max(1);
            for layer in 0..layers {
                self.candidate_pass(encoder, p);
                self.load_pass(encoder);
                self.parity_pass(encoder, p);
                self.mask_pass(encoder);
                self.merge_pass(encoder);
                if layer + 1 < layers {
                    encoder.copy_texture_to_texture(
                        self.targets.candidate.as_image_copy(),
                        self.targets.peel.as_image_copy(),
                        self.targets.size,
                    );
                }
            }
        }
    }
}

impl CsgBackend for GpuBackend {
    fn begin_run(&mut self, len: usize) {
        if self.encoder.is_some() {
            log::warn!("Run started before the previous one ended");
            self.end_run();
        }
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        self.encoder = Some(self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Run Encoder"),
        }));
        self.ensure_slots(len);
        self.cursor = 0;
    }

    fn composite(&mut self, run: &[FlattenedEntry], _kind: ChainKind) -> Result<(), CompositeError> {
        if self.encoder.is_none() {
            return Err(CompositeError::NoActiveRun);
        }
        if run.len() > self.slots.in_use() {
            return Err(CompositeError::SlotsExhausted {
                needed: run.len(),
                reserved: self.slots.in_use(),
            });
        }

        for (index, entry) in run.iter().enumerate() {
            self.write_slot(index, &PrimitiveUniforms::new(entry.transform));
        }
        let meshes: Vec<Arc<GpuMesh>> = run.iter().map(|entry| self.gpu_mesh(&entry.solid)).collect();
        let subtracted: Vec<bool> = run
            .iter()
            .enumerate()
            .map(|(index, entry)| is_subtracted(index, entry.operation))
            .collect();
        let mirrored: Vec<bool> = run.iter().map(|entry| mat4::determinant3(entry.transform) < 0.0).collect();
        let convexity: Vec<u32> = run.iter().map(|entry| entry.convexity()).collect();

        let inputs = CompositeInputs {
            targets: &self.targets,
            pipelines: &self.composite,
            frame: &self.frame_bind_group,
            slots: &self.slots.reserved()[..run.len()],
            meshes: &meshes,
            subtracted: &subtracted,
            mirrored: &mirrored,
        };
        let Some(encoder) = self.encoder.as_mut() else {
            return Err(CompositeError::NoActiveRun);
        };
        inputs.record(encoder, &convexity);
        Ok(())
    }

    fn set_depth_func(&mut self, func: DepthFunc) {
        self.depth_func = func;
    }

    fn use_program(&mut self, program: Option<ShadingProgram>) {
        self.program = program;
    }

    fn set_color(&mut self, colors: ColorPair) {
        self.colors = colors;
    }

    fn render_surface(&mut self, mesh: &Arc<TriangleMesh>, transform: &Mat4, mode: SurfaceMode) {
        if self.encoder.is_none() {
            log::warn!("Surface drawn outside a run; ignored");
            return;
        }
        let slot = self.cursor;
        self.ensure_slots(slot + 1);

        let uniforms = PrimitiveUniforms {
            model_matrix: *transform,
            normal_matrix: mat4::normal_matrix(*transform),
            face_color: self.colors.face.0,
            edge_color: self.colors.edge.0,
            params: [mode.normal_sign(), if is_lit(self.program) { 1.0 } else { 0.0 }, 0.0, 0.0],
        };
        self.write_slot(slot, &uniforms);

        let mesh = self.gpu_mesh(mesh);
        self.pending.push(PendingDraw {
            mesh,
            slot,
            program: self.program,
            depth: self.depth_func,
        });
        self.cursor += 1;
    }

    fn end_run(&mut self) {
        self.flush_pending();
        if let Some(encoder) = self.encoder.take() {
            self.queue.submit(std::iter::once(encoder.finish()));
            if let Some(error) = pollster::block_on(self.device.pop_error_scope()) {
                log::error!("GPU validation failed during run: {}", error);
            }
        }
        self.pending.clear();
        self.slots.release();
        self.cursor = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_padding() {
        assert_eq!(padded_bytes_per_row(64), 256);
        assert_eq!(padded_bytes_per_row(65), 512);
        assert_eq!(padded_bytes_per_row(1), 256);
    }

    #[test]
    fn test_only_later_differences_are_subtracted() {
        assert!(!is_subtracted(0, CsgOp::Difference));
        assert!(is_subtracted(1, CsgOp::Difference));
        assert!(!is_subtracted(1, CsgOp::Intersection));
        assert!(!is_subtracted(0, CsgOp::Union));
    }
}
