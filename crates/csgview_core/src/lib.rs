//! Core types for the csgview renderer
//!
//! This crate holds everything about a CSG scene that does not touch the GPU:
//!
//! - [`FlattenedEntry`] / [`CsgChain`] - flattened CSG sequence handed to the renderer
//! - [`CsgOp`], [`ChainKind`], [`SurfaceMode`], [`ColorMode`] - render mode tags
//! - [`segment`] - splits a sequence into independently composited runs
//! - [`ColorScheme`] - default colors and explicit-color precedence
//! - [`TriangleMesh`] and [`shapes`] - triangulated solids
//! - [`ContextCounter`] - ids for capable rendering contexts
//! - [`SlotPool`] - transient per-run resources
//! - [`Scene`] - loadable/saveable scene description

mod chain;
mod color;
mod counter;
mod mesh;
mod mode;
mod pool;
mod scene;
pub mod segment;
pub mod shapes;

pub use chain::{CsgChain, FlattenedEntry};
pub use color::{Color4, ColorPair, ColorScheme};
pub use counter::ContextCounter;
pub use mesh::{BoundingBox, Triangle, TriangleMesh};
pub use mode::{ChainKind, ColorMode, CsgMode, CsgOp, SurfaceMode};
pub use pool::{Lease, SlotPool};
pub use scene::{CameraTemplate, EntryTemplate, Scene, SceneChains, SceneError, TransformTemplate};
pub use segment::{runs, Run};
pub use shapes::ShapeTemplate;

// Re-export math types for convenience
pub use csgview_math::{mat4, Mat4, Vec3};
