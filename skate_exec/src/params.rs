//! # Skate Executable Parameters

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Deserialize, Default)]
pub struct SkateExecParams {
    /// Serial device of the actuator dongle, e.g. `/dev/ttyACM0`
    pub serial_device: String,

    /// Baud rate of the actuator serial link
    pub serial_baud: u32,

    /// Read timeout on the serial link in milliseconds
    pub serial_timeout_ms: u64,

    /// Log helm angles instead of driving the serial link
    pub dry_run: bool,
}
