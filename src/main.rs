//! csgview - render a CSG scene file to a PNG
//!
//! Usage: `csgview <scene.ron> [-o out.png] [--width W] [--height H] [--no-edges]`

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use csgview::config::AppConfig;
use csgview::systems::OffscreenView;
use csgview_core::{Scene, Vec3};
use csgview_render::CsgRenderer;

/// Command line arguments
#[derive(Debug, Parser)]
#[command(name = "csgview", version, about = "Offscreen CSG preview renderer")]
struct Args {
    /// Scene file (RON)
    scene: PathBuf,
    /// Output PNG (defaults to output.path from the config)
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Image width in pixels
    #[arg(long)]
    width: Option<u32>,
    /// Image height in pixels
    #[arg(long)]
    height: Option<u32>,
    /// Draw faces without edge highlighting
    #[arg(long)]
    no_edges: bool,
    /// Directory holding default.toml and user.toml
    #[arg(long, default_value = "config")]
    config_dir: PathBuf,
    /// Print the context diagnostics
    #[arg(long)]
    diagnostics: bool,
}

fn run(args: Args, config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let scene = Scene::load(&args.scene)?;
    let chains = scene.chains()?;
    log::info!(
        "Loaded scene '{}' ({} primary, {} highlighted, {} background)",
        scene.name,
        chains.primary.len(),
        chains.highlights.len(),
        chains.background.len()
    );

    let width = args.width.unwrap_or(config.output.width);
    let height = args.height.unwrap_or(config.output.height);
    let mut view = OffscreenView::new(width, height, &config.rendering, &config.camera)?;

    if args.diagnostics || config.debug.print_diagnostics {
        println!("{}", view.diagnostic_text());
    }

    match (&scene.camera, chains.primary.bounding_box()) {
        (Some(camera), _) => view.set_camera(
            Vec3::from_array(camera.eye),
            Vec3::from_array(camera.center),
            Vec3::from_array(camera.up),
        ),
        (None, Some(bounds)) => view.frame_bounds(&bounds),
        (None, None) => log::warn!("Scene has no primary objects; using the default camera"),
    }

    let renderer = CsgRenderer::new(chains.primary, view.capabilities().clone())
        .with_background(chains.background)
        .with_highlights(chains.highlights)
        .with_scheme(config.colors);

    let show_edges = config.rendering.show_edges && !args.no_edges;
    let stats = view.paint(&renderer, config.rendering.show_faces, show_edges);
    if stats.skipped {
        log::warn!("Context cannot composite CSG; the image only shows the background");
    }

    let output = args.output.unwrap_or(config.output.path);
    view.save_png(&output)?;
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Load configuration before logging so the configured level applies
    let (config, config_error) = match AppConfig::load_from(&args.config_dir) {
        Ok(config) => (config, None),
        Err(e) => (AppConfig::default(), Some(e)),
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(config.debug.log_level.as_str()))
        .init();
    log::info!("Starting csgview");
    if let Some(e) = config_error {
        log::warn!("Failed to load config: {}. Using defaults.", e);
    }

    match run(args, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            eprintln!("csgview: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_flags() {
        let args = Args::parse_from(["csgview", "scene.ron", "-o", "x.png", "--width", "64", "--no-edges"]);
        assert_eq!(args.scene, PathBuf::from("scene.ron"));
        assert_eq!(args.output, Some(PathBuf::from("x.png")));
        assert_eq!(args.width, Some(64));
        assert_eq!(args.height, None);
        assert!(args.no_edges);
        assert_eq!(args.config_dir, PathBuf::from("config"));
    }
}
