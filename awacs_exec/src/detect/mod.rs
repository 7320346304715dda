//! # Detection Pipeline
//!
//! Turns a frame into label records by running one detector per model entry
//! and concatenating their outputs in model order. The pipeline does not
//! interpret or validate label content; whatever each detector reports is
//! passed through in its original order.
//!
//! Detectors are external collaborators behind the [`Detector`] trait. The
//! detector shipped here is annotation backed: it reads the frame's truth
//! file from disk, which is how sim runs replay a recorded session. CV or
//! neural detectors plug in behind the same trait without touching the
//! pipeline.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use log::debug;
use serde::Serialize;
use std::path::{Path, PathBuf};

// Internal
use crate::frame_store::Frame;
use crate::label::{self, Label};
use crate::model::{Model, ModelEntry};
use util::{module::State, session::Session};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Detection pipeline module state.
#[derive(Default)]
pub struct DetectionPipeline {
    detectors: Vec<Box<dyn Detector>>,
}

/// Status report for one pipeline pass: how many labels each detector
/// produced, in model order.
#[derive(Clone, Default, Serialize, Debug)]
pub struct StatusReport {
    pub labels_per_detector: Vec<usize>,
}

/// Annotation-backed detector reading per-frame truth files.
pub struct TruthDetector {
    cls: i32,
    r_min: i32,
    r_max: i32,
    truth_dir: PathBuf,
}

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// An external detector for a single object class.
pub trait Detector {
    /// Detect objects in the frame.
    ///
    /// A detector that finds nothing, or cannot see its data source this
    /// cycle, returns an empty list; it never fails the pipeline.
    fn detect(&self, frame: &Frame) -> Vec<Label>;
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Possible errors that can occur in the detection pipeline.
#[derive(Debug, thiserror::Error)]
pub enum DetectError {
    #[error("The model contains no entries")]
    EmptyModel,

    #[error("The pipeline has not been initialised")]
    NotInitialised,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl State for DetectionPipeline {
    type InitData = (Model, PathBuf);
    type InitError = DetectError;

    type InputData = Frame;
    type OutputData = Vec<Label>;
    type StatusReport = StatusReport;
    type ProcError = DetectError;

    /// Initialise the pipeline by building one detector per model entry.
    ///
    /// Expected init data is the model and the truth annotation directory.
    fn init(
        &mut self,
        init_data: Self::InitData,
        _session: &Session,
    ) -> Result<(), Self::InitError> {
        let (model, truth_dir) = init_data;

        if model.entries.is_empty() {
            return Err(DetectError::EmptyModel);
        }

        self.detectors = model
            .entries
            .iter()
            .map(|entry| detector_from_entry(entry, &truth_dir))
            .collect();

        Ok(())
    }

    /// Run every detector against the frame, concatenating outputs in model
    /// order.
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        if self.detectors.is_empty() {
            return Err(DetectError::NotInitialised);
        }

        let mut labels = Vec::new();
        let mut report = StatusReport::default();

        for detector in &self.detectors {
            let mut found = detector.detect(input_data);
            report.labels_per_detector.push(found.len());
            labels.append(&mut found);
        }

        Ok((labels, report))
    }
}

impl TruthDetector {
    pub fn new(entry: &ModelEntry, truth_dir: &Path) -> Self {
        let (r_min, r_max) = entry.radius_bounds();

        Self {
            cls: entry.cls(),
            r_min,
            r_max,
            truth_dir: truth_dir.to_path_buf(),
        }
    }
}

impl Detector for TruthDetector {
    fn detect(&self, frame: &Frame) -> Vec<Label> {
        let path = self.truth_dir.join(format!("{}_truth.csv", frame.fnum));

        // A missing or empty truth file is no data this cycle, not a fault
        let rows = match label::read_annotations(&path) {
            Ok(r) => r,
            Err(_) => {
                debug!("No truth file for frame {}", frame.fnum);
                return Vec::new();
            }
        };

        rows.into_iter()
            .filter(|l| l.cls == self.cls && l.r >= self.r_min && l.r <= self.r_max)
            .collect()
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Build the detector collaborator for a model entry.
fn detector_from_entry(entry: &ModelEntry, truth_dir: &Path) -> Box<dyn Detector> {
    // All classes are currently served by the annotation-backed detector;
    // the match is the plug point for real CV backends per kind
    match entry {
        ModelEntry::Cone { .. } | ModelEntry::Donut { .. } | ModelEntry::Sk8 { .. } => {
            Box::new(TruthDetector::new(entry, truth_dir))
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::label::{CLS_CONE, CLS_DONUT};
    use image::DynamicImage;

    struct StubDetector {
        labels: Vec<Label>,
    }

    impl Detector for StubDetector {
        fn detect(&self, _frame: &Frame) -> Vec<Label> {
            self.labels.clone()
        }
    }

    fn dummy_frame() -> Frame {
        Frame {
            fnum: String::from("00001"),
            image: DynamicImage::new_rgb8(1, 1),
        }
    }

    #[test]
    fn test_model_order_concatenation() {
        // Two detectors, each with a fixed internal ordering
        let cones = vec![
            Label::from_bbox(CLS_CONE, 50, 50, 10, 10),
            Label::from_bbox(CLS_CONE, 10, 10, 10, 10),
        ];
        let donuts = vec![Label::from_bbox(CLS_DONUT, 30, 30, 8, 8)];

        let mut pipeline = DetectionPipeline::default();
        pipeline.detectors = vec![
            Box::new(StubDetector {
                labels: cones.clone(),
            }),
            Box::new(StubDetector {
                labels: donuts.clone(),
            }),
        ];

        let (labels, report) = pipeline.proc(&dummy_frame()).unwrap();

        // Model-order concatenation, each detector's ordering preserved
        assert_eq!(labels.len(), 3);
        assert_eq!(labels[0], cones[0]);
        assert_eq!(labels[1], cones[1]);
        assert_eq!(labels[2], donuts[0]);

        assert_eq!(report.labels_per_detector, vec![2, 1]);
    }

    #[test]
    fn test_proc_uninitialised() {
        let mut pipeline = DetectionPipeline::default();
        assert!(matches!(
            pipeline.proc(&dummy_frame()),
            Err(DetectError::NotInitialised)
        ));
    }

    #[test]
    fn test_truth_detector_filters_class_and_radius() {
        let dir = tempfile::tempdir().unwrap();
        let truth_dir = dir.path().to_path_buf();

        let rows = vec![
            Label::from_bbox(CLS_CONE, 10, 10, 20, 20),  // r = 10, kept
            Label::from_bbox(CLS_CONE, 30, 30, 400, 400), // r = 200, too big
            Label::from_bbox(CLS_DONUT, 50, 50, 20, 20), // wrong class
        ];
        label::write_annotations(&rows, &truth_dir.join("00001_truth.csv")).unwrap();

        let entry = ModelEntry::Cone {
            cls: CLS_CONE,
            hue_min: 0,
            hue_max: 127,
            sat_min: 107,
            sat_max: 255,
            val_min: 89,
            val_max: 255,
            r_min: 1,
            r_max: 90,
        };
        let detector = TruthDetector::new(&entry, &truth_dir);

        let found = detector.detect(&dummy_frame());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].r, 10);
    }

    #[test]
    fn test_truth_detector_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();

        let entry = ModelEntry::Donut {
            cls: CLS_DONUT,
            gray_min: 82,
            gray_max: 127,
            r_min: 1,
            r_max: 90,
        };
        let detector = TruthDetector::new(&entry, &dir.path().to_path_buf());

        assert!(detector.detect(&dummy_frame()).is_empty());
    }
}
