//! Headless wgpu context
//!
//! No window or surface: every frame renders into offscreen textures that
//! are read back by the caller.

use std::sync::Arc;

use csgview_core::ContextCounter;

use crate::capability::{self, AdapterProbe, CapabilityRecord, ProbeSettings};

/// Error creating or using the headless context
#[derive(Debug)]
pub enum ContextError {
    /// No adapter matched the request
    AdapterNotFound,
    /// The adapter refused to open a device
    DeviceRequest(wgpu::RequestDeviceError),
    /// Reading pixels back failed
    Readback(String),
}

impl std::fmt::Display for ContextError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContextError::AdapterNotFound => write!(f, "No suitable GPU adapter found"),
            ContextError::DeviceRequest(e) => write!(f, "Failed to create device: {}", e),
            ContextError::Readback(msg) => write!(f, "Readback failed: {}", msg),
        }
    }
}

impl std::error::Error for ContextError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ContextError::DeviceRequest(e) => Some(e),
            _ => None,
        }
    }
}

impl From<wgpu::RequestDeviceError> for ContextError {
    fn from(e: wgpu::RequestDeviceError) -> Self {
        ContextError::DeviceRequest(e)
    }
}

/// Adapter, device and queue of a headless context
pub struct RenderContext {
    pub adapter: wgpu::Adapter,
    pub device: Arc<wgpu::Device>,
    pub queue: Arc<wgpu::Queue>,
}

impl RenderContext {
    /// Open a headless context on the best available adapter
    ///
    /// `force_fallback` requests a software adapter.
    pub fn new(force_fallback: bool) -> Result<Self, ContextError> {
        pollster::block_on(Self::new_async(force_fallback))
    }

    async fn new_async(force_fallback: bool) -> Result<Self, ContextError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: force_fallback,
            })
            .await
            .ok_or(ContextError::AdapterNotFound)?;

        let info = adapter.get_info();
        log::info!("Using adapter {} ({:?})", info.name, info.backend);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("csgview Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::downlevel_defaults().using_resolution(adapter.limits()),
                    memory_hints: wgpu::MemoryHints::MemoryUsage,
                },
                None,
            )
            .await?;

        Ok(Self {
            adapter,
            device: Arc::new(device),
            queue: Arc::new(queue),
        })
    }

    /// Probe this context's capabilities
    pub fn probe(&self, counter: &ContextCounter, settings: ProbeSettings) -> CapabilityRecord {
        let target = AdapterProbe {
            adapter: &self.adapter,
            device: &self.device,
        };
        capability::probe(&target, counter, settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_error_display() {
        assert_eq!(ContextError::AdapterNotFound.to_string(), "No suitable GPU adapter found");
        assert_eq!(
            ContextError::Readback("map failed".into()).to_string(),
            "Readback failed: map failed"
        );
    }

    #[test]
    #[ignore = "requires a GPU adapter"]
    fn test_headless_context_probes() {
        let context = RenderContext::new(false).expect("context");
        let counter = ContextCounter::new();
        let record = context.probe(&counter, ProbeSettings::default());
        assert!(!record.diagnostic_text().is_empty());
        assert_eq!(record.context_id().is_some(), record.is_compositing_capable());
    }
}
