//! # Odometry library.
//!
//! Dead-reckoning localisation for wheeled robots, plus the target dispatch
//! used to hand navigation goals to a motion controller.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Equipment interfaces - the encoders and gyroscope read by the odometry
pub mod eqpt;

/// Localisation module - integrates sensor readings into the robot's pose
pub mod loc;

/// Navigation module - publishes targets to the motion controller
pub mod nav;

/// Simulated chassis - provides sensor data without hardware
#[cfg(feature = "sim")]
pub mod sim;
