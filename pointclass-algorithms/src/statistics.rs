//! Classification accuracy statistics

use log::info;
use pointclass_core::{Label, Result, LABEL_UNASSIGNED};
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Confusion-matrix accumulator in training-code space.
///
/// Predictions against ground truth [`LABEL_UNASSIGNED`] are ignored, as are
/// codes outside the label set. Accumulators are mergeable so rayon workers
/// can each fill their own and reduce.
#[derive(Debug, Clone)]
pub struct ConfusionMatrix {
    names: Vec<String>,
    counts: Vec<u64>,
}

impl ConfusionMatrix {
    pub fn new(labels: &[Label]) -> Self {
        Self {
            names: labels.iter().map(|l| l.name.clone()).collect(),
            counts: vec![0; labels.len() * labels.len()],
        }
    }

    pub fn num_labels(&self) -> usize {
        self.names.len()
    }

    pub fn record(&mut self, predicted: u8, truth: u8) {
        if truth == LABEL_UNASSIGNED {
            return;
        }
        let size = self.names.len();
        let (p, t) = (predicted as usize, truth as usize);
        if p >= size || t >= size {
            return;
        }
        self.counts[t * size + p] += 1;
    }

    pub fn merged(mut self, other: ConfusionMatrix) -> ConfusionMatrix {
        for (a, b) in self.counts.iter_mut().zip(other.counts) {
            *a += b;
        }
        self
    }

    /// Recorded samples for a ground-truth class.
    pub fn support(&self, class: usize) -> u64 {
        let size = self.names.len();
        self.counts[class * size..(class + 1) * size].iter().sum()
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Overall fraction of correctly classified samples.
    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        let size = self.names.len();
        let correct: u64 = (0..size).map(|c| self.counts[c * size + c]).sum();
        correct as f64 / total as f64
    }

    pub fn recall(&self, class: usize) -> f64 {
        let size = self.names.len();
        let truth_total = self.support(class);
        if truth_total == 0 {
            return 0.0;
        }
        self.counts[class * size + class] as f64 / truth_total as f64
    }

    pub fn precision(&self, class: usize) -> f64 {
        let size = self.names.len();
        let predicted_total: u64 = (0..size).map(|t| self.counts[t * size + class]).sum();
        if predicted_total == 0 {
            return 0.0;
        }
        self.counts[class * size + class] as f64 / predicted_total as f64
    }

    pub fn f1(&self, class: usize) -> f64 {
        let p = self.precision(class);
        let r = self.recall(class);
        if p + r == 0.0 {
            return 0.0;
        }
        2.0 * p * r / (p + r)
    }

    pub fn log_summary(&self) {
        info!("Accuracy: {:.4} ({} samples)", self.accuracy(), self.total());
        for (class, name) in self.names.iter().enumerate() {
            if self.support(class) == 0 {
                continue;
            }
            info!(
                " * {}: precision {:.4}, recall {:.4}, f1 {:.4}",
                name,
                self.precision(class),
                self.recall(class),
                self.f1(class)
            );
        }
    }

    /// Write the report as JSON.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        #[derive(Serialize)]
        struct ClassReport<'a> {
            name: &'a str,
            precision: f64,
            recall: f64,
            f1: f64,
            support: u64,
        }

        #[derive(Serialize)]
        struct Report<'a> {
            accuracy: f64,
            total: u64,
            classes: Vec<ClassReport<'a>>,
        }

        let report = Report {
            accuracy: self.accuracy(),
            total: self.total(),
            classes: self
                .names
                .iter()
                .enumerate()
                .map(|(class, name)| ClassReport {
                    name,
                    precision: self.precision(class),
                    recall: self.recall(class),
                    f1: self.f1(class),
                    support: self.support(class),
                })
                .collect(),
        };

        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, &report)
            .map_err(|e| pointclass_core::Error::Io(std::io::Error::other(e)))?;
        Ok(())
    }
}
