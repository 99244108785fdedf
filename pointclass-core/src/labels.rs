//! Semantic label definitions and ASPRS code translation
//!
//! Two code spaces coexist: the compact training codes `0..L-1` used while
//! classifying, and the ASPRS classification bytes stored in point files.
//! The two lookup arrays returned here translate between them.

use serde::{Deserialize, Serialize};

/// Training-code sentinel for points with no ground truth.
pub const LABEL_UNASSIGNED: u8 = 255;

/// Training code of the "unclassified" label (ASPRS code 1).
pub const LABEL_UNCLASSIFIED: u8 = 0;

/// A semantic class: display name, ASPRS output code and display color.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    pub asprs_code: u8,
    pub color: [u8; 3],
}

impl Label {
    pub fn new(name: &str, asprs_code: u8, color: [u8; 3]) -> Self {
        Self {
            name: name.to_string(),
            asprs_code,
            color,
        }
    }
}

/// The label set classifiers are trained against, indexed by training code.
pub fn training_labels() -> Vec<Label> {
    vec![
        Label::new("unclassified", 1, [192, 192, 192]),
        Label::new("ground", 2, [165, 105, 60]),
        Label::new("low_vegetation", 3, [130, 190, 90]),
        Label::new("medium_vegetation", 4, [70, 160, 60]),
        Label::new("high_vegetation", 5, [25, 110, 35]),
        Label::new("building", 6, [210, 50, 45]),
        Label::new("low_point", 7, [90, 90, 90]),
        Label::new("water", 9, [45, 115, 200]),
        Label::new("road_surface", 11, [140, 140, 145]),
    ]
}

/// Lookup from ASPRS code to training code.
///
/// Codes outside the training table map to [`LABEL_UNASSIGNED`].
pub fn asprs_to_train_codes() -> [u8; 256] {
    let mut codes = [LABEL_UNASSIGNED; 256];
    for (i, label) in training_labels().iter().enumerate() {
        codes[label.asprs_code as usize] = i as u8;
    }
    codes
}

/// Lookup from training code back to ASPRS code.
///
/// Codes outside the training table (including [`LABEL_UNASSIGNED`]) map to
/// ASPRS 1, "unclassified".
pub fn train_to_asprs_codes() -> [u8; 256] {
    let mut codes = [1u8; 256];
    for (i, label) in training_labels().iter().enumerate() {
        codes[i] = label.asprs_code;
    }
    codes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_training_labels_are_distinct() {
        let labels = training_labels();
        assert!(labels.len() > 1);
        for (i, a) in labels.iter().enumerate() {
            for b in labels.iter().skip(i + 1) {
                assert_ne!(a.asprs_code, b.asprs_code);
                assert_ne!(a.name, b.name);
            }
        }
    }

    #[test]
    fn test_unclassified_is_training_code_zero() {
        let labels = training_labels();
        assert_eq!(labels[LABEL_UNCLASSIFIED as usize].name, "unclassified");
        assert_eq!(labels[LABEL_UNCLASSIFIED as usize].asprs_code, 1);
    }

    #[test]
    fn test_code_translation_round_trip() {
        let labels = training_labels();
        let a2t = asprs_to_train_codes();
        let t2a = train_to_asprs_codes();
        for (train, label) in labels.iter().enumerate() {
            assert_eq!(a2t[label.asprs_code as usize] as usize, train);
            assert_eq!(t2a[train], label.asprs_code);
        }
    }

    #[test]
    fn test_unmapped_codes() {
        let a2t = asprs_to_train_codes();
        // ASPRS 0 ("never classified") carries no ground truth
        assert_eq!(a2t[0], LABEL_UNASSIGNED);
        let t2a = train_to_asprs_codes();
        assert_eq!(t2a[LABEL_UNASSIGNED as usize], 1);
    }
}
