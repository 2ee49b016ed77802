//! Math Library
//!
//! This crate provides the small set of vector and matrix types the csgview
//! renderer needs to place solids and build cameras.
//!
//! ## Core Types
//!
//! - [`Vec3`] - 3D vector with x, y, z components
//! - [`Mat4`] - column-major 4x4 matrix for affine transforms and projections

mod vec3;
pub mod mat4;

pub use vec3::Vec3;
pub use mat4::Mat4;
