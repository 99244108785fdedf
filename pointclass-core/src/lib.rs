//! Core data structures and traits for pointclass
//!
//! This crate provides the fundamental types for LiDAR point cloud
//! classification: point sets with surface/base index mapping, the semantic
//! label table with ASPRS code translation, and the trait seams the
//! classification algorithms consume.

pub mod error;
pub mod labels;
pub mod point;
pub mod point_set;
pub mod traits;

pub use error::*;
pub use labels::*;
pub use point::*;
pub use point_set::*;
pub use traits::*;

/// Re-export commonly used types from nalgebra
pub use nalgebra::{Point3, Vector3};
