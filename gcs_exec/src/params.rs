//! # Ground Control Executable Parameters

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Deserialize, Default)]
pub struct GcsExecParams {
    /// Period of the telemetry poll loop in seconds
    pub poll_period_s: f64,

    /// Spawn the awacs and skate processes. Disable to run them by hand
    /// against the bus file printed at startup.
    pub spawn_children: bool,

    /// Command used to launch the awacs process
    pub awacs_cmd: String,

    /// Command used to launch the skate process
    pub skate_cmd: String,

    /// Name of the bus file created inside the session directory
    pub bus_file_name: String,
}
