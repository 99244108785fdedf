//! Core traits for pointclass

use crate::error::Result;
use crate::point::Point3d;
use crate::point_set::PointSet;
use std::path::Path;

/// Trait for nearest neighbor search functionality
pub trait NearestNeighborSearch {
    /// Find the k nearest neighbors to a query point, closest first.
    fn find_k_nearest(&self, query: &Point3d, k: usize) -> Vec<(usize, f64)>;

    /// Find all neighbors within a given radius
    fn find_radius_neighbors(&self, query: &Point3d, radius: f64) -> Vec<(usize, f64)>;
}

/// Trait for loading point sets from files
///
/// Raw point-file parsing lives outside this crate; implementations hand the
/// classification core a ready [`PointSet`]. Readers are expected to deliver
/// surface labels already translated from ASPRS codes to training codes (see
/// [`asprs_to_train_codes`](crate::labels::asprs_to_train_codes)).
pub trait PointSetReader {
    /// Read a point set from the given path
    fn read_point_set(&self, path: &Path) -> Result<PointSet>;
}
