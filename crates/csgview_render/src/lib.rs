//! CSG preview rendering
//!
//! This crate draws flattened CSG sequences with wgpu, making independently
//! rasterized solids look like their boolean result.
//!
//! ## Key Components
//!
//! - [`capability`] - probes a context for compositing and edge-shading support
//! - [`compositor`] - run-by-run algorithm behind the [`CsgBackend`] seam
//! - [`gpu_backend::GpuBackend`] - stencil/depth compositing on wgpu
//! - [`shading`] - edge-highlight shading model (CPU mirror of the shaders)
//! - [`context::RenderContext`] - headless adapter, device and queue
//! - [`camera::Camera`] - look-at camera with auto-framing
//! - [`renderer::CsgRenderer`] - draws primary, background and highlight sequences

pub mod camera;
pub mod capability;
pub mod compositor;
pub mod context;
pub mod gpu_backend;
pub mod mesh_cache;
pub mod pipeline;
pub mod renderer;
pub mod shading;

pub use camera::Camera;
pub use capability::{
    probe, CapabilityRecord, ContextFeatures, ContextInfo, ProbeSettings, ProbeTarget, ProgramBuild,
    ShaderHandles, ShaderSlot, SHADER_HANDLE_COUNT,
};
pub use compositor::{render_chain, ChainStats, CompositeError, CsgBackend, DepthFunc, RunScope, ShadingProgram};
pub use context::{ContextError, RenderContext};
pub use gpu_backend::{FrameSettings, GpuBackend};
pub use renderer::{CsgRenderer, DrawStats};

// Re-export core types for convenience
pub use csgview_core::{
    ChainKind, Color4, ColorPair, ColorScheme, ContextCounter, CsgChain, CsgOp, FlattenedEntry, SurfaceMode,
    TriangleMesh,
};
