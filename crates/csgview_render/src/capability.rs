//! Rendering context capability probe
//!
//! Decides once per context whether stencil/depth compositing and the edge
//! program can be used. Missing features are recorded as flags and
//! diagnostic text; nothing here fails.

use std::fmt::Write as _;
use std::sync::atomic::{AtomicU32, Ordering};

use bitflags::bitflags;
use csgview_core::ContextCounter;

use crate::pipeline::edge_shader_source;
use crate::pipeline::types::{
    location, offset, CANDIDATE_FORMAT, COLOR_FORMAT, DEPTH_FORMAT, SCRATCH_FORMAT,
};

bitflags! {
    /// Context features the compositor and the edge program depend on
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ContextFeatures: u8 {
        /// Offscreen color targets that can be read back
        const FRAMEBUFFER_OBJECT = 1 << 0;
        /// Combined depth/stencil attachments
        const PACKED_DEPTH_STENCIL = 1 << 1;
        /// Programmable vertex and fragment stages
        const PROGRAMMABLE_SHADING = 1 << 2;
        /// Depth targets that later passes can read (candidate depth)
        const SAMPLED_DEPTH = 1 << 3;
    }
}

impl ContextFeatures {
    /// Features required before any run is composited
    pub const COMPOSITING: Self = Self::FRAMEBUFFER_OBJECT
        .union(Self::PACKED_DEPTH_STENCIL)
        .union(Self::SAMPLED_DEPTH);

    /// Detect features from an adapter's format support and shader model
    pub fn from_adapter(adapter: &wgpu::Adapter) -> Self {
        let usages = |format| adapter.get_texture_format_features(format).allowed_usages;
        let shader_model = adapter.get_downlevel_capabilities().shader_model;

        let mut features = Self::empty();
        features.set(
            Self::FRAMEBUFFER_OBJECT,
            usages(COLOR_FORMAT)
                .contains(wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC),
        );
        features.set(
            Self::PACKED_DEPTH_STENCIL,
            usages(SCRATCH_FORMAT).contains(wgpu::TextureUsages::RENDER_ATTACHMENT),
        );
        features.set(
            Self::PROGRAMMABLE_SHADING,
            matches!(shader_model, wgpu::ShaderModel::Sm4 | wgpu::ShaderModel::Sm5),
        );
        features.set(
            Self::SAMPLED_DEPTH,
            usages(CANDIDATE_FORMAT)
                .contains(wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING),
        );
        features
    }

    /// Space separated flag names, or "none"
    pub fn names(&self) -> String {
        let names: Vec<&str> = self.iter_names().map(|(name, _)| name).collect();
        if names.is_empty() {
            "none".to_string()
        } else {
            names.join(" ")
        }
    }
}

/// Description of the context, for diagnostics
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ContextInfo {
    pub name: String,
    pub vendor: String,
    pub backend: String,
    pub driver: String,
    /// Bits per channel of the color target (R, G, B, A)
    pub color_bits: [u8; 4],
    pub depth_bits: u8,
    pub stencil_bits: u8,
}

impl ContextInfo {
    fn write_to(&self, text: &mut String) {
        let [r, g, b, a] = self.color_bits;
        let _ = writeln!(text, "Renderer: {}", self.name);
        let _ = writeln!(text, "Vendor: {}", self.vendor);
        let _ = writeln!(text, "Backend: {}", self.backend);
        let _ = writeln!(text, "Driver: {}", self.driver);
        let _ = writeln!(
            text,
            "Context: RGBA({}{}{}{}) depth({}) stencil({})",
            r, g, b, a, self.depth_bits, self.stencil_bits
        );
    }
}

/// Outcome of building the edge program
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProgramBuild {
    pub compiled: bool,
    /// Compiler messages, possibly empty
    pub log: String,
}

/// A context that can be probed
pub trait ProbeTarget {
    fn features(&self) -> ContextFeatures;
    fn describe(&self) -> ContextInfo;
    /// Compile and link the edge program
    fn build_edge_program(&self) -> ProgramBuild;
}

/// Probe options
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProbeSettings {
    /// Never build the edge program, even when shading is supported
    pub disable_shaders: bool,
}

/// Number of entries in [`ShaderHandles`]
pub const SHADER_HANDLE_COUNT: usize = 11;

/// Index into [`ShaderHandles`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShaderSlot {
    Program,
    FaceColor,
    EdgeColor,
    Trig,
    PosB,
    PosC,
    Mask,
    XScale,
    YScale,
    Width,
    Height,
}

impl ShaderSlot {
    pub const ALL: [ShaderSlot; SHADER_HANDLE_COUNT] = [
        ShaderSlot::Program,
        ShaderSlot::FaceColor,
        ShaderSlot::EdgeColor,
        ShaderSlot::Trig,
        ShaderSlot::PosB,
        ShaderSlot::PosC,
        ShaderSlot::Mask,
        ShaderSlot::XScale,
        ShaderSlot::YScale,
        ShaderSlot::Width,
        ShaderSlot::Height,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Handles of the built edge program
///
/// Slot [`ShaderSlot::Program`] is a nonzero program id. Uniform slots hold
/// byte offsets into the uniform blocks and attribute slots hold vertex
/// locations. Viewport width and height are pushed per frame and have no
/// handle of their own.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ShaderHandles([u32; SHADER_HANDLE_COUNT]);

static PROGRAM_IDS: AtomicU32 = AtomicU32::new(1);

impl ShaderHandles {
    fn for_new_program() -> Self {
        let mut handles = [0; SHADER_HANDLE_COUNT];
        handles[ShaderSlot::Program.index()] = PROGRAM_IDS.fetch_add(1, Ordering::Relaxed);
        handles[ShaderSlot::FaceColor.index()] = offset::FACE_COLOR;
        handles[ShaderSlot::EdgeColor.index()] = offset::EDGE_COLOR;
        handles[ShaderSlot::Trig.index()] = location::TRIG;
        handles[ShaderSlot::PosB.index()] = location::POS_B;
        handles[ShaderSlot::PosC.index()] = location::POS_C;
        handles[ShaderSlot::Mask.index()] = location::MASK;
        handles[ShaderSlot::XScale.index()] = offset::XSCALE;
        handles[ShaderSlot::YScale.index()] = offset::YSCALE;
        Self(handles)
    }

    pub fn get(&self, slot: ShaderSlot) -> u32 {
        self.0[slot.index()]
    }

    pub fn as_array(&self) -> &[u32; SHADER_HANDLE_COUNT] {
        &self.0
    }

    /// True when no program was built
    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|&h| h == 0)
    }
}

/// Result of probing one context
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CapabilityRecord {
    features: ContextFeatures,
    compositing_capable: bool,
    shading_capable: bool,
    context_id: Option<u32>,
    diagnostic_text: String,
    shader_handles: ShaderHandles,
}

impl CapabilityRecord {
    pub fn features(&self) -> ContextFeatures {
        self.features
    }

    pub fn is_compositing_capable(&self) -> bool {
        self.compositing_capable
    }

    /// True when the edge program was built
    pub fn is_shading_capable(&self) -> bool {
        self.shading_capable
    }

    /// Id from the context counter; only capable contexts have one
    pub fn context_id(&self) -> Option<u32> {
        self.context_id
    }

    pub fn diagnostic_text(&self) -> &str {
        &self.diagnostic_text
    }

    pub fn shader_handles(&self) -> &ShaderHandles {
        &self.shader_handles
    }
}

/// Probe a context
pub fn probe<T: ProbeTarget + ?Sized>(
    target: &T,
    counter: &ContextCounter,
    settings: ProbeSettings,
) -> CapabilityRecord {
    let features = target.features();
    let compositing_capable = features.contains(ContextFeatures::COMPOSITING);
    let context_id = compositing_capable.then(|| counter.next_id());

    let mut text = String::new();
    target.describe().write_to(&mut text);
    let _ = writeln!(text, "Features: {}", features.names());
    let _ = writeln!(text, "Compositing: {}", if compositing_capable { "yes" } else { "no" });

    let mut shading_capable = false;
    let mut shader_handles = ShaderHandles::default();

    if !compositing_capable {
        log::warn!(
            "Context lacks {}; CSG compositing disabled",
            (ContextFeatures::COMPOSITING - features).names()
        );
    } else if !features.contains(ContextFeatures::PROGRAMMABLE_SHADING) {
        let _ = writeln!(text, "Edge program: unsupported");
    } else if settings.disable_shaders {
        let _ = writeln!(text, "Edge program: disabled");
    } else {
        let build = target.build_edge_program();
        let _ = writeln!(text, "Edge program: {}", if build.compiled { "built" } else { "failed" });
        if !build.log.is_empty() {
            text.push_str(&build.log);
            if !build.log.ends_with('\n') {
                text.push('\n');
            }
        }
        if build.compiled {
            shading_capable = true;
            shader_handles = ShaderHandles::for_new_program();
        } else {
            log::warn!("Edge program failed to build; falling back to unlit shading");
        }
    }

    log::info!(
        "Probed context {:?}: compositing {}, edge shading {}",
        context_id,
        compositing_capable,
        shading_capable
    );

    CapabilityRecord {
        features,
        compositing_capable,
        shading_capable,
        context_id,
        diagnostic_text: text,
        shader_handles,
    }
}

/// Probe target over a wgpu adapter and device
pub struct AdapterProbe<'a> {
    pub adapter: &'a wgpu::Adapter,
    pub device: &'a wgpu::Device,
}

impl ProbeTarget for AdapterProbe<'_> {
    fn features(&self) -> ContextFeatures {
        ContextFeatures::from_adapter(self.adapter)
    }

    fn describe(&self) -> ContextInfo {
        let info = self.adapter.get_info();
        let driver = if info.driver_info.is_empty() {
            info.driver.clone()
        } else {
            format!("{} {}", info.driver, info.driver_info)
        };
        ContextInfo {
            name: info.name,
            vendor: format!("{:#06x}", info.vendor),
            backend: format!("{:?} ({:?})", info.backend, info.device_type),
            driver,
            color_bits: channel_bits(COLOR_FORMAT),
            depth_bits: aspect_bits(DEPTH_FORMAT, wgpu::TextureAspect::DepthOnly),
            stencil_bits: aspect_bits(SCRATCH_FORMAT, wgpu::TextureAspect::StencilOnly),
        }
    }

    fn build_edge_program(&self) -> ProgramBuild {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Edge Shader (probe)"),
            source: wgpu::ShaderSource::Wgsl(edge_shader_source().into()),
        });
        let info = pollster::block_on(module.get_compilation_info());
        let scope_error = pollster::block_on(self.device.pop_error_scope());

        let mut log = String::new();
        let mut compiled = true;
        for message in &info.messages {
            if matches!(message.message_type, wgpu::CompilationMessageType::Error) {
                compiled = false;
            }
            let _ = writeln!(log, "{:?}: {}", message.message_type, message.message);
        }
        if let Some(error) = scope_error {
            compiled = false;
            let _ = writeln!(log, "{}", error);
        }
        ProgramBuild { compiled, log }
    }
}

/// Bits per texel of one aspect, 0 when the aspect is missing or has no fixed size
fn aspect_bits(format: wgpu::TextureFormat, aspect: wgpu::TextureAspect) -> u8 {
    format
        .block_copy_size(Some(aspect))
        .map(|bytes| (bytes * 8) as u8)
        .unwrap_or(0)
}

/// Bits per R, G, B, A channel of an uncompressed color format
fn channel_bits(format: wgpu::TextureFormat) -> [u8; 4] {
    let components = format.components() as u32;
    let per_channel = match format.block_copy_size(None) {
        Some(bytes) if components > 0 => (bytes * 8 / components) as u8,
        _ => 0,
    };
    let mut bits = [0; 4];
    for channel in bits.iter_mut().take(components as usize) {
        *channel = per_channel;
    }
    bits
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeTarget {
        features: ContextFeatures,
        compiles: bool,
    }

    impl ProbeTarget for FakeTarget {
        fn features(&self) -> ContextFeatures {
            self.features
        }

        fn describe(&self) -> ContextInfo {
            ContextInfo {
                name: "fake".into(),
                color_bits: [8; 4],
                depth_bits: 32,
                stencil_bits: 8,
                ..Default::default()
            }
        }

        fn build_edge_program(&self) -> ProgramBuild {
            ProgramBuild {
                compiled: self.compiles,
                log: if self.compiles { String::new() } else { "error: bad".into() },
            }
        }
    }

    #[test]
    fn test_capable_context_builds_program() {
        let counter = ContextCounter::new();
        let target = FakeTarget { features: ContextFeatures::all(), compiles: true };
        let record = probe(&target, &counter, ProbeSettings::default());
        assert!(record.is_compositing_capable());
        assert!(record.is_shading_capable());
        assert_eq!(record.context_id(), Some(0));
        assert_ne!(record.shader_handles().get(ShaderSlot::Program), 0);
        assert_eq!(record.shader_handles().get(ShaderSlot::Width), 0);
        assert!(record.diagnostic_text().contains("RGBA(8888) depth(32) stencil(8)"));
    }

    #[test]
    fn test_failed_build_degrades() {
        let counter = ContextCounter::new();
        let target = FakeTarget { features: ContextFeatures::all(), compiles: false };
        let record = probe(&target, &counter, ProbeSettings::default());
        assert!(record.is_compositing_capable());
        assert!(!record.is_shading_capable());
        assert!(record.shader_handles().is_empty());
        assert!(record.diagnostic_text().contains("error: bad"));
    }

    #[test]
    fn test_disabled_shaders_skip_build() {
        let counter = ContextCounter::new();
        let target = FakeTarget { features: ContextFeatures::all(), compiles: true };
        let record = probe(&target, &counter, ProbeSettings { disable_shaders: true });
        assert!(record.is_compositing_capable());
        assert!(!record.is_shading_capable());
        assert!(record.shader_handles().is_empty());
    }

    #[test]
    fn test_missing_sampled_depth_blocks_compositing() {
        let counter = ContextCounter::new();
        let features = ContextFeatures::all() - ContextFeatures::SAMPLED_DEPTH;
        let record = probe(&FakeTarget { features, compiles: true }, &counter, ProbeSettings::default());
        assert!(!record.is_compositing_capable());
        assert_eq!(record.context_id(), None);
        assert_eq!(counter.issued(), 0);
    }

    #[test]
    fn test_gl_class_context_can_composite() {
        // Offscreen targets, packed depth/stencil and readable depth are enough;
        // no float color target is involved
        let counter = ContextCounter::new();
        let features = ContextFeatures::FRAMEBUFFER_OBJECT
            | ContextFeatures::PACKED_DEPTH_STENCIL
            | ContextFeatures::SAMPLED_DEPTH;
        let record = probe(&FakeTarget { features, compiles: true }, &counter, ProbeSettings::default());
        assert!(record.is_compositing_capable());
        assert!(!record.is_shading_capable());
        assert_eq!(record.context_id(), Some(0));
    }

    #[test]
    fn test_bit_counts_follow_target_formats() {
        assert_eq!(channel_bits(COLOR_FORMAT), [8, 8, 8, 8]);
        assert_eq!(channel_bits(wgpu::TextureFormat::Rgba16Float), [16, 16, 16, 16]);
        assert_eq!(channel_bits(wgpu::TextureFormat::R8Unorm), [8, 0, 0, 0]);
        assert_eq!(aspect_bits(DEPTH_FORMAT, wgpu::TextureAspect::DepthOnly), 32);
        assert_eq!(aspect_bits(SCRATCH_FORMAT, wgpu::TextureAspect::StencilOnly), 8);
    }

    #[test]
    fn test_feature_names() {
        assert_eq!(ContextFeatures::empty().names(), "none");
        let names = ContextFeatures::COMPOSITING.names();
        assert!(names.contains("FRAMEBUFFER_OBJECT"));
        assert!(!names.contains("PROGRAMMABLE_SHADING"));
    }

    #[test]
    fn test_slot_indices() {
        for (i, slot) in ShaderSlot::ALL.iter().enumerate() {
            assert_eq!(slot.index(), i);
        }
    }
}
