//! # Equipment commands and responses

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Serial line protocol of the helm actuator
pub mod actuator;

/// Steering demands for the skate
pub mod skate;
