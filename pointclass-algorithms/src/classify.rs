//! Per-point inference and label writeback

use crate::features::Feature;
use crate::graphcut::alpha_expansion;
use crate::nearest_neighbor::KdTree;
use crate::statistics::ConfusionMatrix;
use log::info;
use pointclass_core::{
    train_to_asprs_codes, BaseSet, Bbox3, Error, Label, NearestNeighborSearch, Point3d, PointSet,
    Result, LABEL_UNASSIGNED, LABEL_UNCLASSIFIED,
};
use rayon::prelude::*;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Spatial label regularization strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Regularization {
    None,
    LocalSmooth,
    GraphCut,
}

/// Parse a regularization name from the command line.
pub fn parse_regularization(name: &str) -> Result<Regularization> {
    match name.to_ascii_lowercase().as_str() {
        "none" => Ok(Regularization::None),
        "local_smooth" | "localsmooth" => Ok(Regularization::LocalSmooth),
        "graph_cut" | "graphcut" => Ok(Regularization::GraphCut),
        other => Err(Error::Config(format!(
            "unknown regularization '{}'",
            other
        ))),
    }
}

/// Supported classifier model families
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifierType {
    RandomForest,
    GradientBoostedTrees,
}

/// Sniff a model file's header to select the evaluator.
///
/// Random forest models are gzip streams; gradient-boosted models start
/// with a plain-text `tree` section. Anything else is rejected.
pub fn fingerprint(path: &Path) -> Result<ClassifierType> {
    let mut header = Vec::with_capacity(8);
    File::open(path)?.take(8).read_to_end(&mut header)?;

    if header.len() >= 2 && header[0] == 0x1f && header[1] == 0x8b {
        return Ok(ClassifierType::RandomForest);
    }
    if header.starts_with(b"tree") {
        return Ok(ClassifierType::GradientBoostedTrees);
    }
    Err(Error::Config(format!(
        "unrecognized model file: {}",
        path.display()
    )))
}

// Graph-cut regularization constants
const MIN_SUBDIVISIONS: usize = 4;
const EDGE_STRENGTH: f32 = 0.2;
const NEIGHBORS: usize = 12;
// floor for probabilities entering -ln; a zero probability can never win the
// argmax, so only the unary cost needs the clamp
const PROB_EPSILON: f64 = 1e-30;

/// Options controlling inference and label writeback
#[derive(Debug, Clone)]
pub struct ClassifyOptions {
    pub regularization: Regularization,
    /// Neighbor-averaging radius for [`Regularization::LocalSmooth`]
    pub reg_radius: f64,
    /// Write label colors instead of ASPRS codes
    pub use_colors: bool,
    /// Only overwrite points whose existing label is "unclassified"
    pub unclassified_only: bool,
    /// Accumulate a confusion matrix against the existing labels
    pub evaluate: bool,
    /// ASPRS codes never written back
    pub skip: Vec<u8>,
    /// Where to write the JSON statistics report (with `evaluate`)
    pub stats_path: Option<PathBuf>,
}

impl Default for ClassifyOptions {
    fn default() -> Self {
        Self {
            regularization: Regularization::None,
            reg_radius: 2.5,
            use_colors: false,
            unclassified_only: false,
            evaluate: false,
            skip: Vec::new(),
            stats_path: None,
        }
    }
}

// Highest probability wins; ties break to the smallest class index.
fn best_class(probs: &[f32]) -> u8 {
    let mut best = 0usize;
    let mut best_val = 0.0f32;
    for (j, &p) in probs.iter().enumerate() {
        if p > best_val {
            best = j;
            best_val = p;
        }
    }
    best as u8
}

/// Classify every point of a set and write the results back.
///
/// Runs the fitted evaluator over the working set, optionally regularizes
/// the labelling spatially, then translates the winning training codes to
/// ASPRS codes (or label colors) on the surface points, honoring the skip
/// and unclassified-only masks.
///
/// # Arguments
/// * `point_set` - The cloud to classify; `base.labels` receives training codes
/// * `evaluate_fn` - Maps a feature vector to per-class probabilities
/// * `features` - The feature bank, evaluated per working-set point
/// * `labels` - The label set the evaluator was trained against
/// * `options` - Regularization mode and writeback rules
pub fn classify_data<E>(
    point_set: &mut PointSet,
    evaluate_fn: E,
    features: &[Box<dyn Feature>],
    labels: &[Label],
    options: &ClassifyOptions,
) -> Result<()>
where
    E: Fn(&[f32], &mut [f32]) + Sync,
{
    if labels.is_empty() {
        return Err(Error::InvalidData("label set is empty".to_string()));
    }
    if labels.len() >= LABEL_UNASSIGNED as usize {
        return Err(Error::InvalidData(
            "label set does not fit the training-code space".to_string(),
        ));
    }
    if options.regularization == Regularization::LocalSmooth && options.reg_radius <= 0.0 {
        return Err(Error::InvalidData(
            "regularization radius must be positive".to_string(),
        ));
    }

    let num_features = features.len();
    let num_labels = labels.len();
    let num_base = point_set.base.len();

    info!("Classifying {} points", num_base);
    point_set.base.labels.resize(num_base, 0);

    {
        let BaseSet {
            points,
            labels: base_labels,
        } = &mut point_set.base;
        let points: &[Point3d] = points;

        match options.regularization {
            Regularization::None => {
                base_labels.par_iter_mut().enumerate().for_each_init(
                    || (vec![0.0f32; num_labels], vec![0.0f32; num_features]),
                    |(probs, ft), (i, out)| {
                        for (slot, feature) in ft.iter_mut().zip(features.iter()) {
                            *slot = feature.value(i);
                        }
                        probs.fill(0.0);
                        evaluate_fn(ft.as_slice(), probs.as_mut_slice());
                        *out = best_class(probs);
                    },
                );
            }

            Regularization::LocalSmooth => {
                // pass 1: full probability row per point
                let mut values = vec![0.0f32; num_base * num_labels];
                values
                    .par_chunks_mut(num_labels)
                    .enumerate()
                    .for_each_init(
                        || vec![0.0f32; num_features],
                        |ft, (i, row)| {
                            for (slot, feature) in ft.iter_mut().zip(features.iter()) {
                                *slot = feature.value(i);
                            }
                            evaluate_fn(ft.as_slice(), row);
                        },
                    );

                info!("Local smoothing...");
                let index = KdTree::new(points);
                let values = &values;

                // pass 2: average the rows of each radius neighborhood
                base_labels.par_iter_mut().enumerate().for_each_init(
                    || vec![0.0f32; num_labels],
                    |mean, (i, out)| {
                        let matches = index.find_radius_neighbors(&points[i], options.reg_radius);
                        mean.fill(0.0);
                        for &(neighbor, _) in &matches {
                            let row = &values[neighbor * num_labels..(neighbor + 1) * num_labels];
                            for (m, &v) in mean.iter_mut().zip(row) {
                                *m += v;
                            }
                        }
                        let inv = 1.0 / matches.len() as f32;
                        for m in mean.iter_mut() {
                            *m *= inv;
                        }
                        *out = best_class(mean);
                    },
                );
            }

            Regularization::GraphCut => {
                info!("Using graph cut...");
                let index = KdTree::new(points);
                let bbox = Bbox3::from_points(points);

                let dx = bbox.extent_x();
                let dy = bbox.extent_y();
                let area = dx * dy;
                let (nb_x, nb_y) = if area > 0.0 {
                    let cell = area / MIN_SUBDIVISIONS as f64;
                    let side = cell.sqrt();
                    let nb_x = (dx / side) as usize + 1;
                    let nb_y = (area / nb_x as f64 / cell) as usize + 1;
                    (nb_x, nb_y)
                } else {
                    (1, 1)
                };

                let mut tile_boxes = Vec::with_capacity(nb_x * nb_y);
                for x in 0..nb_x {
                    for y in 0..nb_y {
                        let x0 = bbox.min.x + dx * (x as f64 / nb_x as f64);
                        let y0 = bbox.min.y + dy * (y as f64 / nb_y as f64);
                        let x1 = if x == nb_x - 1 {
                            bbox.max.x
                        } else {
                            bbox.min.x + dx * ((x + 1) as f64 / nb_x as f64)
                        };
                        let y1 = if y == nb_y - 1 {
                            bbox.max.y
                        } else {
                            bbox.min.y + dy * ((y + 1) as f64 / nb_y as f64)
                        };
                        tile_boxes.push(Bbox3::new(
                            Point3d::new(x0, y0, bbox.min.z),
                            Point3d::new(x1, y1, bbox.max.z),
                        ));
                    }
                }
                info!(
                    "Using {} subdivisions of size {:.2} x {:.2}",
                    tile_boxes.len(),
                    dx / nb_x as f64,
                    dy / nb_y as f64
                );

                // first containing tile wins; stray points fall into tile 0
                let mut tiles: Vec<Vec<usize>> = vec![Vec::new(); tile_boxes.len()];
                let mut tile_of = vec![(0usize, 0usize); num_base];
                for (i, p) in points.iter().enumerate() {
                    let t = tile_boxes
                        .iter()
                        .position(|b| b.contains(p))
                        .unwrap_or(0);
                    tile_of[i] = (t, tiles[t].len());
                    tiles[t].push(i);
                }

                let mut ft = vec![0.0f32; num_features];
                let mut probs = vec![0.0f32; num_labels];

                for (t, tile) in tiles.iter().enumerate() {
                    if tile.is_empty() {
                        continue;
                    }

                    let mut edges: Vec<(usize, usize)> = Vec::new();
                    let mut edge_weights: Vec<f32> = Vec::new();
                    let mut unary = vec![vec![0.0f64; tile.len()]; num_labels];
                    let mut assigned = vec![0usize; tile.len()];

                    for (j, &s) in tile.iter().enumerate() {
                        // edges stay strictly within the tile, in tile-local
                        // coordinates
                        for (neighbor, _) in index.find_k_nearest(&points[s], NEIGHBORS) {
                            let (neighbor_tile, neighbor_pos) = tile_of[neighbor];
                            if neighbor_tile == t && neighbor_pos != j {
                                edges.push((j, neighbor_pos));
                                edge_weights.push(EDGE_STRENGTH);
                            }
                        }

                        for (slot, feature) in ft.iter_mut().zip(features.iter()) {
                            *slot = feature.value(s);
                        }
                        probs.fill(0.0);
                        evaluate_fn(ft.as_slice(), probs.as_mut_slice());

                        let mut best = 0usize;
                        let mut best_val = 0.0f32;
                        for (k, &p) in probs.iter().enumerate() {
                            unary[k][j] = -((p as f64).max(PROB_EPSILON)).ln();
                            if p > best_val {
                                best_val = p;
                                best = k;
                            }
                        }
                        assigned[j] = best;
                    }

                    alpha_expansion(&edges, &edge_weights, &unary, &mut assigned);

                    for (j, &s) in tile.iter().enumerate() {
                        base_labels[s] = assigned[j] as u8;
                    }
                }
            }
        }
    }

    write_labels(point_set, labels, options)
}

// Translate the training codes in base.labels back onto the surface,
// honoring the skip set and the unclassified-only mask.
fn write_labels(point_set: &mut PointSet, labels: &[Label], options: &ClassifyOptions) -> Result<()> {
    let count = point_set.len();
    let had_labels = point_set.has_labels();

    if !options.use_colors && !had_labels {
        point_set.labels.resize(count, 0);
    }
    if options.use_colors && !point_set.has_colors() {
        point_set.colors.resize(count, [255, 255, 255]);
    }

    let mut skip_map = [false; 256];
    for &code in &options.skip {
        skip_map[code as usize] = true;
    }

    // confusion pass runs before writeback mutates the surface labels
    let stats = if options.evaluate && had_labels {
        let point_map = &point_set.point_map;
        let base_labels = &point_set.base.labels;
        let surface = &point_set.labels;
        let matrix = (0..count)
            .into_par_iter()
            .fold(
                || ConfusionMatrix::new(labels),
                |mut matrix, i| {
                    matrix.record(base_labels[point_map[i]], surface[i]);
                    matrix
                },
            )
            .reduce(|| ConfusionMatrix::new(labels), |a, b| a.merged(b));
        Some(matrix)
    } else {
        None
    };

    let train_to_asprs = train_to_asprs_codes();
    let PointSet {
        labels: surface_labels,
        colors,
        point_map,
        base,
        ..
    } = point_set;
    let base_labels: &[u8] = &base.labels;
    let point_map: &[usize] = point_map;

    if options.use_colors {
        if had_labels {
            colors
                .par_iter_mut()
                .zip(surface_labels.par_iter_mut())
                .enumerate()
                .for_each(|(i, (color, surface_label))| {
                    let label = &labels[base_labels[point_map[i]] as usize];
                    let mut update = true;
                    if options.unclassified_only && *surface_label != LABEL_UNCLASSIFIED {
                        update = false;
                    }
                    if skip_map[label.asprs_code as usize] {
                        update = false;
                    }
                    if update {
                        *color = label.color;
                    } else {
                        *surface_label = train_to_asprs[*surface_label as usize];
                    }
                });
        } else {
            colors.par_iter_mut().enumerate().for_each(|(i, color)| {
                let label = &labels[base_labels[point_map[i]] as usize];
                if !skip_map[label.asprs_code as usize] {
                    *color = label.color;
                }
            });
        }
    } else {
        surface_labels
            .par_iter_mut()
            .enumerate()
            .for_each(|(i, surface_label)| {
                let label = &labels[base_labels[point_map[i]] as usize];
                let mut update = true;
                if options.unclassified_only && had_labels && *surface_label != LABEL_UNCLASSIFIED
                {
                    update = false;
                }
                if skip_map[label.asprs_code as usize] {
                    update = false;
                }
                if update {
                    *surface_label = label.asprs_code;
                } else if had_labels {
                    *surface_label = train_to_asprs[*surface_label as usize];
                }
            });
    }

    if let Some(stats) = stats {
        stats.log_summary();
        if let Some(path) = &options.stats_path {
            stats.write_json(path)?;
        }
    }
    Ok(())
}
