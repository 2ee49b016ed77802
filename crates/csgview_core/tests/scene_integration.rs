//! Integration tests for scene files and run segmentation
//!
//! These tests verify the path from a scene description to the runs the
//! renderer composites:
//! 1. RON scenes load into flattened sequences
//! 2. Segmentation of loaded sequences follows the union boundaries
//! 3. Scenes survive a save/load cycle on disk
//! 4. The process-wide context counter hands out increasing ids

use csgview_core::{
    segment, ChainKind, Color4, ColorScheme, ContextCounter, CsgOp, EntryTemplate, Run, Scene,
    SceneError, ShapeTemplate, TransformTemplate,
};
use serial_test::serial;

const DIFFERENCE_SCENE: &str = r#"(
    name: "drilled block",
    primary: [
        (shape: (type: "Cube", size: (2.0, 2.0, 2.0))),
        (
            shape: (type: "Cylinder", r1: 0.5, r2: 0.5, height: 4.0),
            transform: (translate: (0.0, 0.0, -2.0)),
            op: Difference,
        ),
        (
            shape: (type: "Sphere", radius: 0.8),
            transform: (translate: (3.0, 0.0, 0.0)),
            color: Some((0.2, 0.4, 1.0, 1.0)),
        ),
    ],
    background: [
        (shape: (type: "Cube", size: (6.0, 6.0, 0.1)), transform: (translate: (0.0, 0.0, -1.1))),
    ],
    camera: Some((eye: (8.0, 8.0, 4.0), center: (0.0, 0.0, 0.0))),
)"#;

// ==================== Scene Loading Tests ====================

#[test]
fn test_scene_loads_into_runs() {
    let scene = Scene::from_ron(DIFFERENCE_SCENE).expect("scene should parse");
    let chains = scene.chains().expect("scene should build");

    let runs = segment::segment(chains.primary.entries());
    assert_eq!(runs, vec![Run::new(0, 2), Run::new(2, 3)]);
    assert!(!runs[0].is_single());
    assert!(runs[1].is_single());

    assert_eq!(chains.background.len(), 1);
    assert!(chains.highlights.is_empty());

    let camera = scene.camera.expect("camera should be present");
    assert_eq!(camera.up, [0.0, 0.0, 1.0]);
}

#[test]
fn test_scene_colors_resolve_by_precedence() {
    let scene = Scene::from_ron(DIFFERENCE_SCENE).unwrap();
    let chains = scene.chains().unwrap();
    let scheme = ColorScheme::default();
    let entries = chains.primary.entries();

    let colors: Vec<_> = entries
        .iter()
        .map(|e| scheme.resolve(e.color, ChainKind::Normal, e.operation).face)
        .collect();
    assert_eq!(colors[0], scheme.material.face);
    assert_eq!(colors[1], scheme.cutout.face);
    assert_eq!(colors[2], Color4::new(0.2, 0.4, 1.0, 1.0));
}

#[test]
fn test_scene_bounding_box_covers_all_entries() {
    let chains = Scene::from_ron(DIFFERENCE_SCENE).unwrap().chains().unwrap();
    let bbox = chains.primary.bounding_box().unwrap();
    assert!(bbox.min.x <= -1.0 && bbox.max.x >= 3.7);
    assert!(bbox.min.z <= -2.0 && bbox.max.z >= 2.0);
}

#[test]
fn test_scene_save_load_cycle() {
    let mut scene = Scene::new("round trip");
    scene.add_primary(EntryTemplate::new(ShapeTemplate::cube(1.0, 2.0, 3.0)));
    scene.add_primary(
        EntryTemplate::new(ShapeTemplate::sphere(1.0))
            .with_op(CsgOp::Intersection)
            .with_transform(TransformTemplate::at(0.5, 0.0, 0.0))
            .with_convexity(2),
    );

    let path = std::env::temp_dir().join(format!("csgview_scene_{}.ron", std::process::id()));
    scene.save(&path).expect("save should succeed");
    let loaded = Scene::load(&path).expect("load should succeed");
    let _ = std::fs::remove_file(&path);

    assert_eq!(loaded, scene);
}

#[test]
fn test_missing_file_is_io_error() {
    let result = Scene::load("/nonexistent/csgview/scene.ron");
    assert!(matches!(result, Err(SceneError::Io(_))));
}

// ==================== Context Counter Tests ====================

#[test]
#[serial]
fn test_global_counter_is_monotonic() {
    let counter = ContextCounter::global();
    let a = counter.next_id();
    let b = counter.next_id();
    assert_eq!(b, a + 1);
    assert!(counter.issued() > b);
}
