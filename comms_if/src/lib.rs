//! # Communications interface crate.
//!
//! Provides the contracts shared between the three processes: the telemetry
//! bus layout, equipment command definitions, and the network plumbing.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Command and response definitions for equipment (the skate and its
/// actuator)
pub mod eqpt;

/// Network module
pub mod net;

/// Shared memory telemetry bus
pub mod telem;
