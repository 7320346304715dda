//! # Skate Steering Commands
//!
//! Demand/response definitions for the gcs to skate steering path.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Limit of a single RC channel. Channels are in
/// [-RC_CHANNEL_LIMIT, +RC_CHANNEL_LIMIT].
pub const RC_CHANNEL_LIMIT: f64 = 100.0;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A steering demand sent from the gcs to the skate.
///
/// Four RC channels. The skate currently actuates helm from `roll` and
/// treats `throttle` as the drive demand; `pitch` and `yaw` are carried for
/// the planned throttle-on-roll adjustment.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct RcCommand {
    /// Lateral channel, positive starboard.
    pub roll: f64,

    /// Longitudinal channel, positive ahead.
    pub pitch: f64,

    /// Heading correction channel, positive clockwise.
    pub yaw: f64,

    /// Drive channel, non-negative.
    pub throttle: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Response from the skate based on the demand sent by the gcs.
#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub enum RcResponse {
    /// Demand was valid and has been passed to the actuator
    DemsOk,

    /// Demand was invalid and has been rejected
    DemsInvalid,

    /// The skate has observed the kill flag and will not actuate
    Killed,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl RcCommand {
    /// A demand is valid if every channel is finite and within the RC limit.
    pub fn is_valid(&self) -> bool {
        [self.roll, self.pitch, self.yaw, self.throttle]
            .iter()
            .all(|c| c.is_finite() && c.abs() <= RC_CHANNEL_LIMIT)
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_is_valid() {
        assert!(RcCommand::default().is_valid());
        assert!(RcCommand {
            roll: 100.0,
            pitch: -100.0,
            yaw: 45.0,
            throttle: 23.0
        }
        .is_valid());

        assert!(!RcCommand {
            roll: 101.0,
            ..Default::default()
        }
        .is_valid());
        assert!(!RcCommand {
            yaw: std::f64::NAN,
            ..Default::default()
        }
        .is_valid());
    }
}
