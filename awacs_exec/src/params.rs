//! # Awacs Executable Parameters

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Deserialize, Default)]
pub struct AwacsExecParams {
    /// Directory holding the frame files, relative to the software root
    pub frame_dir: String,

    /// Directory holding the per-frame truth annotation files, relative to
    /// the software root
    pub truth_dir: String,

    /// Skip the reserved sentinel frame when walking the frame list
    pub exclude_zero_frame: bool,

    /// Restart from the first frame once the list is exhausted
    pub loop_frames: bool,

    /// Model file, relative to the software root
    pub model_file: String,

    /// Target period of one capture/detect/publish cycle in seconds
    pub cycle_period_s: f64,

    /// Write each frame's labels into the session directory
    pub save_labels: bool,
}
