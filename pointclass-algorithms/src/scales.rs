//! Multi-scale ladder construction and point spacing estimation

use crate::nearest_neighbor::KdTree;
use pointclass_core::{voxel_decimate, BaseSet, NearestNeighborSearch, Point3d, Result};

/// A downsampled view of the working set at one resolution.
///
/// Scales form an ordered ladder: scale `k` holds a voxel-decimated copy at
/// resolution `start_resolution * 2^k` and maps every base point to its
/// representative. Feature providers evaluate neighborhood descriptors
/// against these copies.
#[derive(Debug, Clone)]
pub struct Scale {
    pub resolution: f64,
    pub radius: f64,
    pub points: Vec<Point3d>,
    pub point_map: Vec<usize>,
}

impl Scale {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Index of the scale point representing a base point.
    pub fn representative(&self, base_index: usize) -> usize {
        self.point_map[base_index]
    }
}

/// Estimate the mean nearest-neighbour distance of a cloud.
///
/// Samples up to ~10k points; used to seed the scale ladder resolution when
/// the caller passes the "derive from first file" sentinel.
pub fn estimate_spacing(points: &[Point3d]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    let tree = KdTree::new(points);
    let step = (points.len() / 10_000).max(1);

    let mut total = 0.0;
    let mut samples = 0usize;
    for i in (0..points.len()).step_by(step) {
        let neighbors = tree.find_k_nearest(&points[i], 2);
        if let Some(&(_, distance)) = neighbors.get(1) {
            total += distance;
            samples += 1;
        }
    }
    if samples == 0 {
        0.0
    } else {
        total / samples as f64
    }
}

/// Build the scale ladder over a working set.
///
/// # Arguments
/// * `num_scales` - Length of the ladder
/// * `base` - The working set to downsample
/// * `start_resolution` - Resolution of scale 0; doubles per rung
/// * `radius` - Neighborhood radius at scale 0; doubles per rung
pub fn compute_scales(
    num_scales: usize,
    base: &BaseSet,
    start_resolution: f64,
    radius: f64,
) -> Result<Vec<Scale>> {
    let mut scales = Vec::with_capacity(num_scales);
    for k in 0..num_scales {
        let factor = 2f64.powi(k as i32);
        let resolution = start_resolution * factor;
        let (points, point_map) = voxel_decimate(&base.points, resolution)?;
        scales.push(Scale {
            resolution,
            radius: radius * factor,
            points,
            point_map,
        });
    }
    Ok(scales)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn grid(spacing: f64, side: usize) -> Vec<Point3d> {
        let mut points = Vec::new();
        for i in 0..side {
            for j in 0..side {
                points.push(Point3d::new(i as f64 * spacing, j as f64 * spacing, 0.0));
            }
        }
        points
    }

    #[test]
    fn test_estimate_spacing_regular_grid() {
        let points = grid(1.0, 20);
        assert_relative_eq!(estimate_spacing(&points), 1.0, epsilon = 1e-9);

        let points = grid(2.5, 10);
        assert_relative_eq!(estimate_spacing(&points), 2.5, epsilon = 1e-9);
    }

    #[test]
    fn test_estimate_spacing_degenerate() {
        assert_eq!(estimate_spacing(&[]), 0.0);
        assert_eq!(estimate_spacing(&[Point3d::origin()]), 0.0);
    }

    #[test]
    fn test_scale_ladder_resolutions_double() {
        let base = BaseSet {
            points: grid(0.5, 30),
            labels: Vec::new(),
        };
        let scales = compute_scales(4, &base, 0.5, 1.0).unwrap();
        assert_eq!(scales.len(), 4);
        for (k, scale) in scales.iter().enumerate() {
            assert_relative_eq!(scale.resolution, 0.5 * 2f64.powi(k as i32));
            assert_relative_eq!(scale.radius, 1.0 * 2f64.powi(k as i32));
            assert_eq!(scale.point_map.len(), base.len());
            for i in 0..base.len() {
                assert!(scale.representative(i) < scale.len());
            }
        }
        // coarser rungs never gain points
        for pair in scales.windows(2) {
            assert!(pair[1].len() <= pair[0].len());
        }
    }

    #[test]
    fn test_compute_scales_invalid_resolution() {
        let base = BaseSet {
            points: grid(1.0, 3),
            labels: Vec::new(),
        };
        assert!(compute_scales(2, &base, 0.0, 1.0).is_err());
    }
}
