//! Nearest neighbor search implementations

use pointclass_core::{NearestNeighborSearch, Point3d};
use std::cmp::Ordering;

const NO_CHILD: u32 = u32::MAX;

#[derive(Debug, Clone, Copy)]
struct KdNode {
    point: usize,
    axis: usize,
    left: u32,
    right: u32,
}

/// KD-Tree for nearest neighbor search
///
/// Built once over a point slice (median split, cycling axis); queries are
/// read-only and safe to run concurrently from rayon workers.
pub struct KdTree {
    points: Vec<Point3d>,
    nodes: Vec<KdNode>,
    root: u32,
}

impl KdTree {
    pub fn new(points: &[Point3d]) -> Self {
        let mut indices: Vec<usize> = (0..points.len()).collect();
        let mut nodes = Vec::with_capacity(points.len());
        let root = Self::build(points, &mut indices, 0, &mut nodes);
        Self {
            points: points.to_vec(),
            nodes,
            root,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    fn build(points: &[Point3d], indices: &mut [usize], depth: usize, nodes: &mut Vec<KdNode>) -> u32 {
        if indices.is_empty() {
            return NO_CHILD;
        }
        let axis = depth % 3;
        let median = indices.len() / 2;
        indices.select_nth_unstable_by(median, |&a, &b| {
            points[a][axis]
                .partial_cmp(&points[b][axis])
                .unwrap_or(Ordering::Equal)
        });

        let node_id = nodes.len() as u32;
        nodes.push(KdNode {
            point: indices[median],
            axis,
            left: NO_CHILD,
            right: NO_CHILD,
        });

        let (lower, rest) = indices.split_at_mut(median);
        let upper = &mut rest[1..];
        let left = Self::build(points, lower, depth + 1, nodes);
        let right = Self::build(points, upper, depth + 1, nodes);
        nodes[node_id as usize].left = left;
        nodes[node_id as usize].right = right;
        node_id
    }

    // best holds (squared distance, index) sorted ascending, at most k entries
    fn knn_recurse(&self, node: u32, query: &Point3d, k: usize, best: &mut Vec<(f64, usize)>) {
        if node == NO_CHILD {
            return;
        }
        let n = self.nodes[node as usize];
        let p = &self.points[n.point];
        let d2 = (p - query).norm_squared();

        if best.len() < k || d2 < best[best.len() - 1].0 {
            let pos = best.partition_point(|&(d, _)| d <= d2);
            best.insert(pos, (d2, n.point));
            if best.len() > k {
                best.pop();
            }
        }

        let delta = query[n.axis] - p[n.axis];
        let (near, far) = if delta < 0.0 {
            (n.left, n.right)
        } else {
            (n.right, n.left)
        };
        self.knn_recurse(near, query, k, best);
        if best.len() < k || delta * delta < best[best.len() - 1].0 {
            self.knn_recurse(far, query, k, best);
        }
    }

    fn radius_recurse(&self, node: u32, query: &Point3d, r2: f64, out: &mut Vec<(usize, f64)>) {
        if node == NO_CHILD {
            return;
        }
        let n = self.nodes[node as usize];
        let p = &self.points[n.point];
        let d2 = (p - query).norm_squared();
        if d2 <= r2 {
            out.push((n.point, d2.sqrt()));
        }

        let delta = query[n.axis] - p[n.axis];
        let (near, far) = if delta < 0.0 {
            (n.left, n.right)
        } else {
            (n.right, n.left)
        };
        self.radius_recurse(near, query, r2, out);
        if delta * delta <= r2 {
            self.radius_recurse(far, query, r2, out);
        }
    }
}

impl NearestNeighborSearch for KdTree {
    fn find_k_nearest(&self, query: &Point3d, k: usize) -> Vec<(usize, f64)> {
        if k == 0 {
            return Vec::new();
        }
        let mut best = Vec::with_capacity(k + 1);
        self.knn_recurse(self.root, query, k, &mut best);
        best.into_iter().map(|(d2, idx)| (idx, d2.sqrt())).collect()
    }

    fn find_radius_neighbors(&self, query: &Point3d, radius: f64) -> Vec<(usize, f64)> {
        let mut out = Vec::new();
        if radius >= 0.0 {
            self.radius_recurse(self.root, query, radius * radius, &mut out);
        }
        out
    }
}

/// Simple brute force nearest neighbor search for small datasets
pub struct BruteForceSearch {
    points: Vec<Point3d>,
}

impl BruteForceSearch {
    pub fn new(points: &[Point3d]) -> Self {
        Self {
            points: points.to_vec(),
        }
    }
}

impl NearestNeighborSearch for BruteForceSearch {
    fn find_k_nearest(&self, query: &Point3d, k: usize) -> Vec<(usize, f64)> {
        let mut distances: Vec<(usize, f64)> = self
            .points
            .iter()
            .enumerate()
            .map(|(idx, point)| (idx, (point - query).norm()))
            .collect();

        distances.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));
        distances.truncate(k);
        distances
    }

    fn find_radius_neighbors(&self, query: &Point3d, radius: f64) -> Vec<(usize, f64)> {
        let radius_squared = radius * radius;
        self.points
            .iter()
            .enumerate()
            .filter_map(|(idx, point)| {
                let distance_squared = (point - query).norm_squared();
                if distance_squared <= radius_squared {
                    Some((idx, distance_squared.sqrt()))
                } else {
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::prelude::*;
    use rand::rngs::StdRng;

    fn random_cloud(count: usize, seed: u64) -> Vec<Point3d> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..count)
            .map(|_| {
                Point3d::new(
                    rng.gen_range(-10.0..10.0),
                    rng.gen_range(-10.0..10.0),
                    rng.gen_range(-10.0..10.0),
                )
            })
            .collect()
    }

    #[test]
    fn test_knn_matches_brute_force() {
        let points = random_cloud(500, 7);
        let tree = KdTree::new(&points);
        let brute = BruteForceSearch::new(&points);

        for query in random_cloud(20, 8) {
            let a = tree.find_k_nearest(&query, 10);
            let b = brute.find_k_nearest(&query, 10);
            assert_eq!(a.len(), 10);
            for (&(_, da), &(_, db)) in a.iter().zip(b.iter()) {
                assert_relative_eq!(da, db, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_knn_sorted_and_self_first() {
        let points = random_cloud(100, 3);
        let tree = KdTree::new(&points);
        let result = tree.find_k_nearest(&points[42], 5);
        assert_eq!(result[0].0, 42);
        assert_relative_eq!(result[0].1, 0.0);
        for pair in result.windows(2) {
            assert!(pair[0].1 <= pair[1].1);
        }
    }

    #[test]
    fn test_radius_matches_brute_force() {
        let points = random_cloud(300, 11);
        let tree = KdTree::new(&points);
        let brute = BruteForceSearch::new(&points);

        for query in random_cloud(20, 12) {
            let mut a: Vec<usize> = tree
                .find_radius_neighbors(&query, 3.0)
                .into_iter()
                .map(|(i, _)| i)
                .collect();
            let mut b: Vec<usize> = brute
                .find_radius_neighbors(&query, 3.0)
                .into_iter()
                .map(|(i, _)| i)
                .collect();
            a.sort_unstable();
            b.sort_unstable();
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_empty_tree() {
        let tree = KdTree::new(&[]);
        assert!(tree.is_empty());
        assert!(tree.find_k_nearest(&Point3d::origin(), 4).is_empty());
        assert!(tree
            .find_radius_neighbors(&Point3d::origin(), 1.0)
            .is_empty());
    }

    #[test]
    fn test_more_neighbors_requested_than_points() {
        let points = random_cloud(3, 5);
        let tree = KdTree::new(&points);
        let result = tree.find_k_nearest(&Point3d::origin(), 10);
        assert_eq!(result.len(), 3);
    }
}
