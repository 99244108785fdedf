//! # pointclass-algorithms
//!
//! The point-cloud semantic classification core: balanced training-set
//! assembly, parallel per-point inference over a multi-scale feature bank,
//! and spatial label regularization (local probability smoothing or
//! α-expansion graph cut).

pub mod classify;
pub mod features;
pub mod graphcut;
pub mod nearest_neighbor;
pub mod scales;
pub mod statistics;
pub mod training;

// Re-export commonly used items
pub use classify::*;
pub use features::*;
pub use graphcut::*;
pub use nearest_neighbor::*;
pub use scales::*;
pub use statistics::*;
pub use training::*;
