//! # pointclass
//!
//! LiDAR point cloud semantic classification for Rust.
//!
//! This is the umbrella crate that provides convenient access to the
//! pointclass functionality: core data structures (point sets, labels,
//! trait seams) and the classification algorithms (training sampler,
//! inference engine, spatial regularization).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pointclass::prelude::*;
//!
//! let mut cloud = PointSet::new(vec![
//!     Point3d::new(0.0, 0.0, 0.0),
//!     Point3d::new(1.0, 0.0, 0.0),
//!     Point3d::new(0.0, 1.0, 0.0),
//! ]);
//!
//! let labels = training_labels();
//! let features: Vec<Box<dyn Feature>> = Vec::new();
//! let options = ClassifyOptions::default();
//! classify_data(
//!     &mut cloud,
//!     |_ft, probs| probs[0] = 1.0,
//!     &features,
//!     &labels,
//!     &options,
//! )
//! .unwrap();
//! ```
//!
//! ## Feature Flags
//!
//! - `default`: Enables core and algorithms
//! - `algorithms`: Training, inference and regularization

// Re-export core functionality
pub use pointclass_core::*;

// Re-export sub-crates
#[cfg(feature = "algorithms")]
pub use pointclass_algorithms as algorithms;

/// Convenient imports for common use cases
pub mod prelude {
    pub use pointclass_core::*;

    #[cfg(feature = "algorithms")]
    pub use pointclass_algorithms::*;
}
