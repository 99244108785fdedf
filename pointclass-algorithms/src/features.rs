//! Per-point feature accessors
//!
//! Feature extraction itself lives outside this crate; the classification
//! core only pulls scalar values through these seams. A provider turns a
//! scale ladder into the feature bank both training and inference iterate.

use crate::scales::Scale;

/// A per-point scalar descriptor evaluated on demand.
///
/// `index` addresses the working (base) set. Implementations must be cheap
/// to call and safe to share across rayon workers.
pub trait Feature: Send + Sync {
    fn name(&self) -> &str;
    fn value(&self, index: usize) -> f32;
}

/// Produces the feature bank for a scale ladder.
pub trait FeatureProvider {
    fn features(&self, scales: &[Scale]) -> Vec<Box<dyn Feature>>;
}
