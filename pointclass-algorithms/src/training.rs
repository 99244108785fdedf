//! Balanced training-set assembly

use crate::features::{Feature, FeatureProvider};
use crate::scales::{compute_scales, estimate_spacing};
use log::{info, warn};
use pointclass_core::{
    asprs_to_train_codes, training_labels, PointSetReader, Result, LABEL_UNASSIGNED,
};
use rand::prelude::*;
use std::path::Path;

/// Sample a per-class-balanced training set across labelled point files.
///
/// For every file the scale ladder and feature bank are rebuilt, labelled
/// working-set points are collected (each at most once, via the surface→base
/// map), and a shuffled walk emits up to `samples_per_label` points per
/// class through the `store` hook, where `samples_per_label` is the size of
/// the rarest non-empty class capped by `max_samples`. Balancing keeps
/// abundant classes (ground) from dominating the classifier; shuffling
/// removes the spatial bias of ordered LiDAR scans.
///
/// # Arguments
/// * `reader` - Loads point sets; files without labels are skipped with a log
/// * `provider` - Builds the feature bank for each file's scale ladder
/// * `files` - Labelled input files
/// * `start_resolution` - Scale-0 resolution; ≤ 0 means "derive from the
///   first labelled file" and the derived value is written back and reused
/// * `num_scales` - Length of the scale ladder
/// * `radius` - Scale-0 neighborhood radius for feature providers
/// * `max_samples` - Upper bound on samples emitted per class per file
/// * `asprs_classes` - When non-empty, restrict training to these ASPRS codes
/// * `init` - Called once, before the first sample, with
///   `(num_features, num_labels)`
/// * `store` - Called per sample with the feature bank, the working-set
///   index and the training class code
pub fn get_training_data<P, I, S>(
    reader: &dyn PointSetReader,
    provider: &dyn FeatureProvider,
    files: &[P],
    start_resolution: &mut f64,
    num_scales: usize,
    radius: f64,
    max_samples: usize,
    asprs_classes: &[u8],
    mut init: I,
    mut store: S,
) -> Result<()>
where
    P: AsRef<Path>,
    I: FnMut(usize, usize),
    S: FnMut(&[Box<dyn Feature>], usize, u8),
{
    let labels = training_labels();

    let train_subset = !asprs_classes.is_empty();
    let mut train_class = [false; 256];
    if train_subset {
        let asprs_to_train = asprs_to_train_codes();
        for &code in asprs_classes {
            train_class[asprs_to_train[code as usize] as usize] = true;
        }
    }

    let mut initialized = false;
    for file in files {
        let path = file.as_ref();
        info!("Processing {}", path.display());
        let point_set = reader.read_point_set(path)?;
        if !point_set.has_labels() {
            warn!("{} has no labels, skipping", path.display());
            continue;
        }

        if *start_resolution <= 0.0 {
            *start_resolution = estimate_spacing(&point_set.base.points);
            info!("Starting resolution: {}", *start_resolution);
        }

        let scales = compute_scales(num_scales, &point_set.base, *start_resolution, radius)?;
        let features = provider.features(&scales);
        info!("Features: {}", features.len());

        if !initialized {
            init(features.len(), labels.len());
            initialized = true;
        }

        // each working-set point contributes once, with the class of its
        // first surface occurrence
        let mut count = vec![0usize; labels.len()];
        let mut sampled = vec![false; point_set.base.len()];
        let mut candidates: Vec<(usize, u8)> = Vec::new();

        for (i, &class) in point_set.labels.iter().enumerate() {
            if class == LABEL_UNASSIGNED || class as usize >= labels.len() {
                continue;
            }
            if train_subset && !train_class[class as usize] {
                continue;
            }
            let idx = point_set.point_map[i];
            if !sampled[idx] {
                candidates.push((idx, class));
                count[class as usize] += 1;
                sampled[idx] = true;
            }
        }

        let mut samples_per_label = usize::MAX;
        for &c in &count {
            if c > 0 {
                samples_per_label = samples_per_label.min(c);
            }
        }
        samples_per_label = samples_per_label.min(max_samples);
        info!("Samples per label: {}", samples_per_label);

        let mut rng = thread_rng();
        candidates.shuffle(&mut rng);

        let mut added = vec![0usize; labels.len()];
        for &(idx, class) in &candidates {
            if added[class as usize] < samples_per_label {
                store(&features, idx, class);
                added[class as usize] += 1;
            }
        }

        for (label, (&emitted, &available)) in labels.iter().zip(added.iter().zip(count.iter())) {
            info!(" * {}: {} / {}", label.name, emitted, available);
        }

        // scales, features and the point set drop here, before the next file
    }

    Ok(())
}
