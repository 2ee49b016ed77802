//! Application configuration
//!
//! Configuration is loaded from multiple sources with the following priority (lowest to highest):
//! 1. `config/default.toml` (version controlled)
//! 2. `config/user.toml` (gitignored, user overrides)
//! 3. Environment variables (`CSGV_SECTION__KEY`)

use csgview_core::{Color4, ColorScheme, Vec3};
use csgview_render::{FrameSettings, ProbeSettings};
use figment::{Figment, providers::{Format, Toml, Env}};
use serde::{Serialize, Deserialize};
use std::path::{Path, PathBuf};

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Output image configuration
    #[serde(default)]
    pub output: OutputConfig,
    /// Camera configuration
    #[serde(default)]
    pub camera: CameraConfig,
    /// Rendering configuration
    #[serde(default)]
    pub rendering: RenderingConfig,
    /// Default colors per render mode
    #[serde(default)]
    pub colors: ColorScheme,
    /// Debug configuration
    #[serde(default)]
    pub debug: DebugConfig,
}

impl AppConfig {
    /// Load configuration from default locations
    ///
    /// Priority (lowest to highest):
    /// 1. `config/default.toml`
    /// 2. `config/user.toml`
    /// 3. Environment variables (`CSGV_*`)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific config directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();
        let default_path = config_dir.join("default.toml");
        let user_path = config_dir.join("user.toml");

        let mut figment = Figment::new();

        if default_path.exists() {
            figment = figment.merge(Toml::file(&default_path));
        }

        // Load user config (optional)
        if user_path.exists() {
            figment = figment.merge(Toml::file(&user_path));
        }

        // Environment variables override everything
        // CSGV_OUTPUT__WIDTH=1024 -> output.width = 1024
        figment = figment.merge(Env::prefixed("CSGV_").split("__"));

        figment.extract().map_err(ConfigError::from)
    }
}

/// Output image configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// PNG written when no path is given on the command line
    pub path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            width: 512,
            height: 512,
            path: PathBuf::from("out.png"),
        }
    }
}

/// Camera configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraConfig {
    /// Field of view in degrees
    pub fov: f32,
    /// Near clipping plane
    pub near: f32,
    /// Far clipping plane (grown when framing large scenes)
    pub far: f32,
    /// Eye distance in scene radii when auto-framing
    pub distance_factor: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov: 45.0,
            near: 0.1,
            far: 1000.0,
            distance_factor: 1.8,
        }
    }
}

/// Rendering configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderingConfig {
    /// Background color [r, g, b, a]
    pub background_color: [f32; 4],
    /// Direction towards the light [x, y, z]
    pub light_dir: [f32; 3],
    /// Outline width in pixels
    pub edge_width: f32,
    /// Highlight polygon edges
    pub show_edges: bool,
    /// Draw faces (always on; kept for symmetry with edges)
    pub show_faces: bool,
    /// Never build the edge program
    pub disable_shaders: bool,
    /// Request a software adapter
    pub force_fallback_adapter: bool,
}

impl Default for RenderingConfig {
    fn default() -> Self {
        Self {
            background_color: [1.0, 1.0, 1.0, 1.0],
            light_dir: [-1.0, -1.0, 1.0],
            edge_width: 2.0,
            show_edges: true,
            show_faces: true,
            disable_shaders: false,
            force_fallback_adapter: false,
        }
    }
}

impl RenderingConfig {
    pub fn probe_settings(&self) -> ProbeSettings {
        ProbeSettings {
            disable_shaders: self.disable_shaders,
        }
    }

    /// Frame parameters without view and projection
    pub fn frame_settings(&self) -> FrameSettings {
        FrameSettings {
            light_dir: Vec3::from_array(self.light_dir),
            edge_width: self.edge_width,
            background: Color4(self.background_color),
            ..FrameSettings::default()
        }
    }
}

/// Debug configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugConfig {
    /// Log level (error, warn, info, debug, trace)
    pub log_level: String,
    /// Print the context diagnostics after probing
    pub print_diagnostics: bool,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            print_diagnostics: false,
        }
    }
}

/// Configuration error
#[derive(Debug)]
pub struct ConfigError {
    message: String,
}

impl From<figment::Error> for ConfigError {
    fn from(e: figment::Error) -> Self {
        ConfigError {
            message: e.to_string(),
        }
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Configuration error: {}", self.message)
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.output.width, 512);
        assert_eq!(config.camera.distance_factor, 1.8);
        assert!(config.rendering.show_edges);
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let toml = toml::to_string(&config).unwrap();
        assert!(toml.contains("edge_width"));
        assert!(toml.contains("[colors.material]"));
    }

    #[test]
    fn test_frame_settings_carry_rendering_values() {
        let rendering = RenderingConfig {
            edge_width: 3.5,
            background_color: [0.0, 0.0, 0.0, 1.0],
            ..RenderingConfig::default()
        };
        let frame = rendering.frame_settings();
        assert_eq!(frame.edge_width, 3.5);
        assert_eq!(frame.background, Color4::BLACK);
        assert!(!rendering.probe_settings().disable_shaders);
    }

    #[test]
    fn test_missing_directory_uses_defaults() {
        let config = AppConfig::load_from("does/not/exist").unwrap();
        assert_eq!(config.output.height, 512);
        assert_eq!(config.colors, ColorScheme::default());
    }
}
