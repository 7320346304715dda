//! # Actuator Driver
//!
//! Driver for the helm servo, reached through a serial dongle speaking the
//! line protocol in [`comms_if::eqpt::actuator`]. The microcontroller may
//! echo each line back; the echo is read when present but never required.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use log::{debug, trace};
use serialport::SerialPort;

use comms_if::eqpt::actuator::ActuatorLine;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Handle on the serial actuator link.
pub struct Actuator {
    port: Box<dyn SerialPort>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors which can occur driving the actuator.
#[derive(Debug, thiserror::Error)]
pub enum ActuatorError {
    #[error("Could not open the serial port: {0}")]
    OpenError(serialport::Error),

    #[error("Could not write to the serial port: {0}")]
    WriteError(std::io::Error),

    #[error("Could not read from the serial port: {0}")]
    ReadError(std::io::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Actuator {
    /// Open the serial link to the actuator.
    pub fn open(device: &str, baud: u32, timeout_ms: u64) -> Result<Self, ActuatorError> {
        let port = serialport::new(device, baud)
            .timeout(Duration::from_millis(timeout_ms))
            .open()
            .map_err(ActuatorError::OpenError)?;

        Ok(Self { port })
    }

    /// Send one line to the actuator, returning the echoed line if the
    /// controller produced one within the timeout.
    pub fn send(&mut self, line: &ActuatorLine) -> Result<Option<ActuatorLine>, ActuatorError> {
        self.port
            .write_all(line.encode().as_bytes())
            .map_err(ActuatorError::WriteError)?;

        trace!("Actuator line sent: {:?}", line);

        // Collect the optional echo up to a newline or the timeout
        let mut echo = String::new();
        let mut buf = [0u8; 32];
        loop {
            match self.port.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    echo.push_str(&String::from_utf8_lossy(&buf[..n]));
                    if echo.contains('\n') {
                        break;
                    }
                }
                Err(e) if e.kind() == ErrorKind::TimedOut => break,
                Err(e) => return Err(ActuatorError::ReadError(e)),
            }
        }

        match ActuatorLine::parse(&echo) {
            Ok(l) => {
                if l != *line {
                    debug!("Actuator echoed {:?} for {:?}", l, line);
                }
                Ok(Some(l))
            }
            // No echo, or line noise: the protocol doesn't promise one
            Err(_) => Ok(None),
        }
    }
}
