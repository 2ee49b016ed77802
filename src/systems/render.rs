//! Offscreen render system
//!
//! Owns the headless context, the capability record and the wgpu backend.
//! Paints one frame of a scene and exports it as a PNG.

use std::path::Path;

use csgview_core::{BoundingBox, ContextCounter};
use csgview_render::{
    Camera, CapabilityRecord, ContextError, CsgRenderer, DrawStats, FrameSettings, GpuBackend, RenderContext,
};

use crate::config::{CameraConfig, RenderingConfig};

/// Render error types
#[derive(Debug)]
pub enum RenderError {
    /// Creating or reading back from the GPU context failed
    Context(ContextError),
    /// Encoding or writing the image failed
    Image(image::ImageError),
    /// Pixel buffer did not match the target size
    Other(String),
}

impl std::fmt::Display for RenderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderError::Context(e) => write!(f, "{}", e),
            RenderError::Image(e) => write!(f, "Image export failed: {}", e),
            RenderError::Other(msg) => write!(f, "Render error: {}", msg),
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::Context(e) => Some(e),
            RenderError::Image(e) => Some(e),
            RenderError::Other(_) => None,
        }
    }
}

impl From<ContextError> for RenderError {
    fn from(e: ContextError) -> Self {
        RenderError::Context(e)
    }
}

impl From<image::ImageError> for RenderError {
    fn from(e: image::ImageError) -> Self {
        RenderError::Image(e)
    }
}

/// Headless view rendering into an offscreen image
pub struct OffscreenView {
    // Keeps the adapter, device and queue alive for the backend
    _context: RenderContext,
    capabilities: CapabilityRecord,
    backend: GpuBackend,
    camera: Camera,
    frame: FrameSettings,
    distance_factor: f32,
}

impl OffscreenView {
    /// Create the context, probe it and set up the backend
    pub fn new(
        width: u32,
        height: u32,
        render_config: &RenderingConfig,
        camera_config: &CameraConfig,
    ) -> Result<Self, RenderError> {
        let context = RenderContext::new(render_config.force_fallback_adapter)?;
        let capabilities = context.probe(ContextCounter::global(), render_config.probe_settings());
        log::debug!("Context diagnostics:\n{}", capabilities.diagnostic_text());

        let backend = GpuBackend::new(
            context.device.clone(),
            context.queue.clone(),
            &capabilities,
            width,
            height,
        );

        let camera = Camera {
            fov_y: camera_config.fov,
            near: camera_config.near,
            far: camera_config.far,
            ..Camera::default()
        };

        Ok(Self {
            _context: context,
            capabilities,
            backend,
            camera,
            frame: render_config.frame_settings(),
            distance_factor: camera_config.distance_factor,
        })
    }

    pub fn capabilities(&self) -> &CapabilityRecord {
        &self.capabilities
    }

    pub fn is_compositing_capable(&self) -> bool {
        self.capabilities.is_compositing_capable()
    }

    pub fn is_shading_capable(&self) -> bool {
        self.capabilities.is_shading_capable()
    }

    pub fn diagnostic_text(&self) -> &str {
        self.capabilities.diagnostic_text()
    }

    pub fn size(&self) -> (u32, u32) {
        self.backend.size()
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Place the camera explicitly (keeps the configured lens)
    pub fn set_camera(&mut self, eye: csgview_core::Vec3, center: csgview_core::Vec3, up: csgview_core::Vec3) {
        self.camera.eye = eye;
        self.camera.center = center;
        self.camera.up = up;
    }

    /// Point the camera at a bounding box
    pub fn frame_bounds(&mut self, bounds: &BoundingBox) {
        self.camera.frame(bounds, self.distance_factor);
    }

    /// Clear and draw one frame
    pub fn paint(&mut self, renderer: &CsgRenderer, show_faces: bool, show_edges: bool) -> DrawStats {
        let (width, height) = self.size();
        let aspect = width as f32 / height.max(1) as f32;
        let settings = FrameSettings {
            view: self.camera.view_matrix(),
            projection: self.camera.projection_matrix(aspect),
            ..self.frame
        };
        self.backend.begin_frame(&settings);
        renderer.draw(&mut self.backend, show_faces, show_edges)
    }

    /// RGBA8 pixels of the last frame, top row first
    pub fn read_pixels(&self) -> Result<Vec<u8>, RenderError> {
        Ok(self.backend.read_pixels()?)
    }

    /// Write the last frame as a PNG
    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> Result<(), RenderError> {
        let (width, height) = self.size();
        let pixels = self.read_pixels()?;
        let image = image::RgbaImage::from_raw(width, height, pixels)
            .ok_or_else(|| RenderError::Other(format!("pixel buffer does not match {}x{}", width, height)))?;
        image.save(path.as_ref())?;
        log::info!("Wrote {}x{} image to {}", width, height, path.as_ref().display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_error_display() {
        assert_eq!(
            format!("{}", RenderError::Context(ContextError::AdapterNotFound)),
            "No suitable GPU adapter found"
        );
        assert_eq!(
            format!("{}", RenderError::Other("test".to_string())),
            "Render error: test"
        );
    }

    #[test]
    #[ignore = "requires a GPU adapter"]
    fn test_offscreen_view_probes_on_creation() {
        let view = OffscreenView::new(64, 48, &RenderingConfig::default(), &CameraConfig::default()).unwrap();
        assert_eq!(view.size(), (64, 48));
        assert!(!view.diagnostic_text().is_empty());
    }
}
