//! # Actuator Serial Protocol
//!
//! The helm servo is driven by an external microcontroller speaking a plain
//! ASCII line protocol: each line carries a single integer angle in
//! [0, 180], and a lone `q` requests termination. The controller may echo a
//! line back but there is no other framing or acknowledgement.

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Maximum servo angle accepted by the actuator.
pub const ANGLE_MAX: i64 = 180;

/// Angle commanding the helm amidships.
pub const ANGLE_AMIDSHIPS: i64 = 90;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// One line of the actuator protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorLine {
    /// Drive the servo to the given angle in degrees, [0, 180].
    Angle(i64),

    /// Request the actuator to terminate.
    Quit,
}

/// Errors which can occur parsing or building an actuator line.
#[derive(Debug, thiserror::Error)]
pub enum ActuatorLineError {
    #[error("Empty actuator line")]
    EmptyLine,

    #[error("Actuator line is not an integer: {0}")]
    NotAnInteger(std::num::ParseIntError),

    #[error("Angle {0} is outside [0, {max}]", max = ANGLE_MAX)]
    AngleOutOfRange(i64),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ActuatorLine {
    /// Build an angle line, validating the range.
    pub fn angle(angle: i64) -> Result<Self, ActuatorLineError> {
        if angle < 0 || angle > ANGLE_MAX {
            return Err(ActuatorLineError::AngleOutOfRange(angle));
        }

        Ok(ActuatorLine::Angle(angle))
    }

    /// Encode the line for the wire, including the terminating newline.
    pub fn encode(&self) -> String {
        match self {
            ActuatorLine::Angle(a) => format!("{}\n", a),
            ActuatorLine::Quit => String::from("q\n"),
        }
    }

    /// Parse a line as received from the wire (used for echoes).
    pub fn parse(line: &str) -> Result<Self, ActuatorLineError> {
        let line = line.trim();

        if line.is_empty() {
            return Err(ActuatorLineError::EmptyLine);
        }
        if line == "q" {
            return Ok(ActuatorLine::Quit);
        }

        let angle = line
            .parse::<i64>()
            .map_err(ActuatorLineError::NotAnInteger)?;

        Self::angle(angle)
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_encode() {
        assert_eq!(ActuatorLine::angle(90).unwrap().encode(), "90\n");
        assert_eq!(ActuatorLine::angle(0).unwrap().encode(), "0\n");
        assert_eq!(ActuatorLine::Quit.encode(), "q\n");
    }

    #[test]
    fn test_angle_range() {
        assert!(ActuatorLine::angle(0).is_ok());
        assert!(ActuatorLine::angle(180).is_ok());
        assert!(matches!(
            ActuatorLine::angle(181),
            Err(ActuatorLineError::AngleOutOfRange(181))
        ));
        assert!(matches!(
            ActuatorLine::angle(-1),
            Err(ActuatorLineError::AngleOutOfRange(-1))
        ));
    }

    #[test]
    fn test_parse() {
        assert_eq!(ActuatorLine::parse("45\n").unwrap(), ActuatorLine::Angle(45));
        assert_eq!(ActuatorLine::parse("q").unwrap(), ActuatorLine::Quit);
        assert!(matches!(
            ActuatorLine::parse(""),
            Err(ActuatorLineError::EmptyLine)
        ));
        assert!(matches!(
            ActuatorLine::parse("ahoy"),
            Err(ActuatorLineError::NotAnInteger(_))
        ));
        assert!(matches!(
            ActuatorLine::parse("200"),
            Err(ActuatorLineError::AngleOutOfRange(200))
        ));
    }
}
