//! Application systems
//!
//! Offscreen rendering and export, kept out of main.rs for testability.

mod render;

pub use render::{OffscreenView, RenderError};
