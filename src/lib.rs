//! csgview - offscreen CSG preview renderer
//!
//! Loads a scene file, draws its CSG sequences with stencil/depth compositing
//! and writes the result as a PNG.

pub mod config;
pub mod systems;
