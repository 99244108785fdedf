//! Point set data structures
//!
//! A [`PointSet`] carries the *surface* cloud (every point of the input file)
//! together with a *base* working set the classifier actually runs on. The
//! base is either an identical copy or a voxel-decimated subset; `point_map`
//! takes a surface index to its representative in the base.

use crate::error::{Error, Result};
use crate::point::Point3d;
use std::collections::HashMap;

/// Axis-aligned bounding box with closed bounds on all sides.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bbox3 {
    pub min: Point3d,
    pub max: Point3d,
}

impl Bbox3 {
    pub fn new(min: Point3d, max: Point3d) -> Self {
        Self { min, max }
    }

    /// Compute the bounding box of a point slice.
    ///
    /// An empty slice yields a degenerate box at the origin.
    pub fn from_points(points: &[Point3d]) -> Self {
        if points.is_empty() {
            return Self::new(Point3d::origin(), Point3d::origin());
        }
        let mut min = points[0];
        let mut max = points[0];
        for p in points {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            min.z = min.z.min(p.z);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
            max.z = max.z.max(p.z);
        }
        Self::new(min, max)
    }

    pub fn contains(&self, p: &Point3d) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }

    pub fn extent_x(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn extent_y(&self) -> f64 {
        self.max.y - self.min.y
    }
}

/// Voxel-grid decimation keeping the first point per cell.
///
/// Returns the kept points and, for every input point, the index of its
/// representative among them.
pub fn voxel_decimate(points: &[Point3d], resolution: f64) -> Result<(Vec<Point3d>, Vec<usize>)> {
    if resolution <= 0.0 {
        return Err(Error::InvalidData(
            "decimation resolution must be positive".to_string(),
        ));
    }

    let mut cells: HashMap<(i64, i64, i64), usize> = HashMap::new();
    let mut kept = Vec::new();
    let mut map = vec![0usize; points.len()];

    for (i, p) in points.iter().enumerate() {
        let key = (
            (p.x / resolution).floor() as i64,
            (p.y / resolution).floor() as i64,
            (p.z / resolution).floor() as i64,
        );
        let representative = *cells.entry(key).or_insert_with(|| {
            kept.push(*p);
            kept.len() - 1
        });
        map[i] = representative;
    }

    Ok((kept, map))
}

/// The working set inference runs on.
///
/// `labels` holds training codes and is sized by the inference engine.
#[derive(Debug, Clone, Default)]
pub struct BaseSet {
    pub points: Vec<Point3d>,
    pub labels: Vec<u8>,
}

impl BaseSet {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// A point cloud with classification attributes.
///
/// `labels` holds one byte per surface point: ASPRS codes as stored in the
/// input file, or training codes while a classification pass is underway.
/// Empty `labels`/`colors` mean the attribute is absent.
#[derive(Debug, Clone)]
pub struct PointSet {
    pub points: Vec<Point3d>,
    pub labels: Vec<u8>,
    pub colors: Vec<[u8; 3]>,
    pub point_map: Vec<usize>,
    pub base: BaseSet,
}

impl PointSet {
    /// Create a point set without labels or colors.
    pub fn new(points: Vec<Point3d>) -> Self {
        Self::with_attributes(points, Vec::new(), Vec::new())
    }

    /// Create a point set with the given per-point attributes.
    ///
    /// `labels` and `colors` must be empty or match `points` in length. The
    /// base starts as an identity copy of the surface; call
    /// [`decimate_base`](Self::decimate_base) to shrink the working set.
    pub fn with_attributes(points: Vec<Point3d>, labels: Vec<u8>, colors: Vec<[u8; 3]>) -> Self {
        let base = BaseSet {
            points: points.clone(),
            labels: Vec::new(),
        };
        let point_map = (0..points.len()).collect();
        Self {
            points,
            labels,
            colors,
            point_map,
            base,
        }
    }

    /// Number of surface points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn has_labels(&self) -> bool {
        !self.labels.is_empty()
    }

    pub fn has_colors(&self) -> bool {
        !self.colors.is_empty()
    }

    /// Bounding box of the surface points.
    pub fn bbox(&self) -> Bbox3 {
        Bbox3::from_points(&self.points)
    }

    /// Rebuild the base as a voxel-decimated working set at `resolution`.
    pub fn decimate_base(&mut self, resolution: f64) -> Result<()> {
        let (kept, map) = voxel_decimate(&self.points, resolution)?;
        self.base = BaseSet {
            points: kept,
            labels: Vec::new(),
        };
        self.point_map = map;
        Ok(())
    }
}
