//! Scene serialization
//!
//! A scene file describes the three flattened sequences drawn each frame
//! (primary, highlighted, background) plus an optional camera. Scenes are
//! stored as RON and turned into [`CsgChain`]s with shared meshes.

use serde::{Serialize, Deserialize};
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;

use csgview_math::{mat4, Mat4, Vec3};

use crate::chain::{CsgChain, FlattenedEntry};
use crate::color::Color4;
use crate::mesh::TriangleMesh;
use crate::mode::CsgOp;
use crate::shapes::ShapeTemplate;

/// Placement of a solid: scale, then rotate (degrees, X then Y then Z), then translate
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformTemplate {
    pub translate: [f32; 3],
    pub rotate: [f32; 3],
    pub scale: [f32; 3],
}

impl Default for TransformTemplate {
    fn default() -> Self {
        Self {
            translate: [0.0; 3],
            rotate: [0.0; 3],
            scale: [1.0; 3],
        }
    }
}

impl TransformTemplate {
    /// Pure translation
    pub fn at(x: f32, y: f32, z: f32) -> Self {
        Self { translate: [x, y, z], ..Self::default() }
    }

    /// The column-major matrix for this placement
    pub fn to_matrix(&self) -> Mat4 {
        mat4::compose(
            Vec3::from_array(self.translate),
            Vec3::from_array(self.rotate),
            Vec3::from_array(self.scale),
        )
    }
}

fn default_op() -> CsgOp {
    CsgOp::Union
}

fn default_convexity() -> u32 {
    1
}

/// Serializable flattened entry
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntryTemplate {
    pub shape: ShapeTemplate,
    #[serde(default)]
    pub transform: TransformTemplate,
    #[serde(default = "default_op")]
    pub op: CsgOp,
    #[serde(default)]
    pub color: Option<Color4>,
    #[serde(default = "default_convexity")]
    pub convexity: u32,
}

impl EntryTemplate {
    /// Union entry with the default placement
    pub fn new(shape: ShapeTemplate) -> Self {
        Self {
            shape,
            transform: TransformTemplate::default(),
            op: CsgOp::Union,
            color: None,
            convexity: 1,
        }
    }

    pub fn with_op(mut self, op: CsgOp) -> Self {
        self.op = op;
        self
    }

    pub fn with_transform(mut self, transform: TransformTemplate) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_color(mut self, color: Color4) -> Self {
        self.color = Some(color);
        self
    }

    pub fn with_convexity(mut self, convexity: u32) -> Self {
        self.convexity = convexity;
        self
    }
}

/// Fixed camera placement
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraTemplate {
    pub eye: [f32; 3],
    pub center: [f32; 3],
    #[serde(default = "default_up")]
    pub up: [f32; 3],
}

fn default_up() -> [f32; 3] {
    [0.0, 0.0, 1.0]
}

/// A serializable scene
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    /// Scene name (for display/debugging)
    pub name: String,
    #[serde(default)]
    pub primary: Vec<EntryTemplate>,
    #[serde(default)]
    pub highlights: Vec<EntryTemplate>,
    #[serde(default)]
    pub background: Vec<EntryTemplate>,
    /// Camera override; the renderer frames the primary objects otherwise
    #[serde(default)]
    pub camera: Option<CameraTemplate>,
}

/// The three sequences built from a scene
#[derive(Clone, Debug, Default)]
pub struct SceneChains {
    pub primary: CsgChain,
    pub highlights: CsgChain,
    pub background: CsgChain,
}

impl Scene {
    /// Create a new empty scene
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Load a scene from a RON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SceneError> {
        let contents = fs::read_to_string(path)?;
        Self::from_ron(&contents)
    }

    /// Parse a scene from RON text
    pub fn from_ron(contents: &str) -> Result<Self, SceneError> {
        Ok(ron::from_str(contents)?)
    }

    /// Save a scene to a RON file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), SceneError> {
        let pretty = ron::ser::PrettyConfig::new()
            .struct_names(true)
            .enumerate_arrays(false);
        let contents = ron::ser::to_string_pretty(self, pretty)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Add a primary entry
    pub fn add_primary(&mut self, entry: EntryTemplate) {
        self.primary.push(entry);
    }

    /// Add a highlighted entry
    pub fn add_highlight(&mut self, entry: EntryTemplate) {
        self.highlights.push(entry);
    }

    /// Add a background entry
    pub fn add_background(&mut self, entry: EntryTemplate) {
        self.background.push(entry);
    }

    /// Build the flattened sequences
    ///
    /// Entries with identical shape templates share one mesh.
    pub fn chains(&self) -> Result<SceneChains, SceneError> {
        let mut meshes: Vec<(ShapeTemplate, Arc<TriangleMesh>)> = Vec::new();
        let mut build = |list: &'static str, entries: &[EntryTemplate]| -> Result<CsgChain, SceneError> {
            let mut chain = CsgChain::new();
            for (index, entry) in entries.iter().enumerate() {
                entry.shape.validate().map_err(|reason| SceneError::InvalidShape {
                    list,
                    index,
                    reason,
                })?;
                let mesh = match meshes.iter().find(|(shape, _)| *shape == entry.shape) {
                    Some((_, mesh)) => Arc::clone(mesh),
                    None => {
                        let mesh = Arc::new(entry.shape.create_mesh());
                        meshes.push((entry.shape.clone(), Arc::clone(&mesh)));
                        mesh
                    }
                };
                let mut flat = FlattenedEntry::new(mesh, entry.transform.to_matrix(), entry.op)
                    .with_convexity(entry.convexity);
                flat.color = entry.color;
                chain.push(flat);
            }
            Ok(chain)
        };

        let primary = build("primary", &self.primary)?;
        let highlights = build("highlights", &self.highlights)?;
        let background = build("background", &self.background)?;
        log::debug!(
            "Scene '{}': {} primary, {} highlighted, {} background entries, {} distinct meshes",
            self.name,
            primary.len(),
            highlights.len(),
            background.len(),
            meshes.len()
        );
        Ok(SceneChains { primary, highlights, background })
    }
}

/// Error loading, saving or building a scene
#[derive(Debug)]
pub enum SceneError {
    /// IO error (file not found, permission denied, etc.)
    Io(io::Error),
    /// Parse error (invalid RON syntax)
    Parse(ron::error::SpannedError),
    /// Serialization error
    Serialize(ron::Error),
    /// A shape template has unusable parameters
    InvalidShape {
        list: &'static str,
        index: usize,
        reason: String,
    },
}

impl From<io::Error> for SceneError {
    fn from(e: io::Error) -> Self {
        SceneError::Io(e)
    }
}

impl From<ron::error::SpannedError> for SceneError {
    fn from(e: ron::error::SpannedError) -> Self {
        SceneError::Parse(e)
    }
}

impl From<ron::Error> for SceneError {
    fn from(e: ron::Error) -> Self {
        SceneError::Serialize(e)
    }
}

impl std::fmt::Display for SceneError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SceneError::Io(e) => write!(f, "IO error: {}", e),
            SceneError::Parse(e) => write!(f, "Parse error: {}", e),
            SceneError::Serialize(e) => write!(f, "Serialize error: {}", e),
            SceneError::InvalidShape { list, index, reason } => {
                write!(f, "Invalid shape in {}[{}]: {}", list, index, reason)
            }
        }
    }
}

impl std::error::Error for SceneError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Scene {
        let mut scene = Scene::new("sample");
        scene.add_primary(EntryTemplate::new(ShapeTemplate::cube(2.0, 2.0, 2.0)));
        scene.add_primary(
            EntryTemplate::new(ShapeTemplate::sphere(1.2))
                .with_op(CsgOp::Intersection)
                .with_convexity(2),
        );
        scene.add_primary(
            EntryTemplate::new(ShapeTemplate::cylinder(0.5, 0.5, 3.0))
                .with_op(CsgOp::Difference)
                .with_transform(TransformTemplate::at(0.0, 0.0, -1.5)),
        );
        scene.add_highlight(EntryTemplate::new(ShapeTemplate::cube(2.0, 2.0, 2.0)));
        scene
    }

    #[test]
    fn test_chains_preserve_order_and_ops() {
        let chains = sample().chains().unwrap();
        let ops: Vec<CsgOp> = chains.primary.entries().iter().map(|e| e.operation).collect();
        assert_eq!(ops, vec![CsgOp::Union, CsgOp::Intersection, CsgOp::Difference]);
        assert_eq!(chains.primary.entries()[1].convexity(), 2);
        assert_eq!(chains.highlights.len(), 1);
        assert!(chains.background.is_empty());
    }

    #[test]
    fn test_identical_shapes_share_mesh() {
        let chains = sample().chains().unwrap();
        let a = &chains.primary.entries()[0].solid;
        let b = &chains.highlights.entries()[0].solid;
        assert!(Arc::ptr_eq(a, b));
        assert!(!Arc::ptr_eq(a, &chains.primary.entries()[1].solid));
    }

    #[test]
    fn test_invalid_shape_reported_with_location() {
        let mut scene = Scene::new("bad");
        scene.add_background(EntryTemplate::new(ShapeTemplate::sphere(1.0)));
        scene.add_background(EntryTemplate::new(ShapeTemplate::sphere(0.0)));
        match scene.chains() {
            Err(SceneError::InvalidShape { list, index, .. }) => {
                assert_eq!(list, "background");
                assert_eq!(index, 1);
            }
            other => panic!("expected InvalidShape, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_minimal_ron_uses_defaults() {
        let scene = Scene::from_ron(
            r#"(
                name: "minimal",
                primary: [
                    (shape: (type: "Cube", size: (1.0, 1.0, 1.0))),
                ],
            )"#,
        )
        .unwrap();
        let entry = &scene.primary[0];
        assert_eq!(entry.op, CsgOp::Union);
        assert_eq!(entry.convexity, 1);
        assert_eq!(entry.transform, TransformTemplate::default());
        assert!(scene.camera.is_none());
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(Scene::from_ron("(name: "), Err(SceneError::Parse(_))));
    }

    #[test]
    fn test_transform_matrix() {
        let t = TransformTemplate {
            translate: [1.0, 2.0, 3.0],
            rotate: [0.0; 3],
            scale: [2.0; 3],
        };
        let p = mat4::transform_point(t.to_matrix(), Vec3::ONE);
        assert_eq!(p, Vec3::new(3.0, 4.0, 5.0));
    }
}
