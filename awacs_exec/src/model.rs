//! # Model Management
//!
//! A model is the ordered list of detector descriptors applied to each
//! frame. It is trained externally and consumed here as an opaque artifact:
//! the file is read once per run and its entries are handed to the detector
//! factory untouched.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// One detector descriptor.
///
/// Each class carries its own fixed set of detection parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ModelEntry {
    /// Cone detector: HSV colour mask plus radius bounds.
    Cone {
        cls: i32,
        hue_min: i32,
        hue_max: i32,
        sat_min: i32,
        sat_max: i32,
        val_min: i32,
        val_max: i32,
        r_min: i32,
        r_max: i32,
    },

    /// Donut detector: grayscale band plus radius bounds.
    Donut {
        cls: i32,
        gray_min: i32,
        gray_max: i32,
        r_min: i32,
        r_max: i32,
    },

    /// Skate deck detector: edge thresholds plus radius bounds.
    Sk8 {
        cls: i32,
        canny_lo: i32,
        canny_hi: i32,
        r_min: i32,
        r_max: i32,
    },
}

/// Errors which can occur loading a model file.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Could not load the model file: {0}")]
    FileError(std::io::Error),

    #[error("Could not parse the model file: {0}")]
    ParseError(serde_json::Error),
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// An ordered set of detector descriptors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    pub entries: Vec<ModelEntry>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ModelEntry {
    /// The label class this entry detects.
    pub fn cls(&self) -> i32 {
        match self {
            ModelEntry::Cone { cls, .. } => *cls,
            ModelEntry::Donut { cls, .. } => *cls,
            ModelEntry::Sk8 { cls, .. } => *cls,
        }
    }

    /// The accepted marker radius bounds, inclusive.
    pub fn radius_bounds(&self) -> (i32, i32) {
        match self {
            ModelEntry::Cone { r_min, r_max, .. } => (*r_min, *r_max),
            ModelEntry::Donut { r_min, r_max, .. } => (*r_min, *r_max),
            ModelEntry::Sk8 { r_min, r_max, .. } => (*r_min, *r_max),
        }
    }

    /// Human readable name of the entry kind.
    pub fn name(&self) -> &'static str {
        match self {
            ModelEntry::Cone { .. } => "cone",
            ModelEntry::Donut { .. } => "donut",
            ModelEntry::Sk8 { .. } => "sk8",
        }
    }
}

impl Model {
    /// Read a model file. The entry order in the file is the order detectors
    /// run in.
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let contents = fs::read_to_string(path).map_err(ModelError::FileError)?;

        let entries: Vec<ModelEntry> =
            serde_json::from_str(&contents).map_err(ModelError::ParseError)?;

        Ok(Self { entries })
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    const MODEL_JSON: &str = r#"[
        {"kind": "cone", "cls": 1, "hue_min": 0, "hue_max": 127,
         "sat_min": 107, "sat_max": 255, "val_min": 89, "val_max": 255,
         "r_min": 1, "r_max": 90},
        {"kind": "donut", "cls": 2, "gray_min": 82, "gray_max": 127,
         "r_min": 4, "r_max": 20}
    ]"#;

    #[test]
    fn test_load_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        std::fs::write(&path, MODEL_JSON).unwrap();

        let model = Model::load(&path).unwrap();

        assert_eq!(model.entries.len(), 2);
        assert_eq!(model.entries[0].name(), "cone");
        assert_eq!(model.entries[0].cls(), 1);
        assert_eq!(model.entries[1].name(), "donut");
        assert_eq!(model.entries[1].radius_bounds(), (4, 20));
    }

    #[test]
    fn test_load_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        std::fs::write(&path, "{not json").unwrap();

        assert!(matches!(
            Model::load(&path),
            Err(ModelError::ParseError(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Model::load(&dir.path().join("nowhere.json")),
            Err(ModelError::FileError(_))
        ));
    }
}
