//! # Odometry Executable Parameters
//!
//! This module provides parameters for the demonstration executable, which
//! runs the odometry on the simulated chassis.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ExecParams {
    /// Present the simulated drive sensors as motor encoders
    pub motor_encoders: bool,

    /// Fit a lateral tracking encoder
    pub lateral_encoder: bool,

    /// Fit a gyroscope
    pub gyro: bool,

    /// Targets to visit in order, as `[x, y]`
    pub waypoints: Vec<[f64; 2]>,

    /// Heading to hold at the final waypoint, degrees. If not set the final
    /// waypoint is a point-only target.
    pub final_heading_deg: Option<f64>,

    /// Speed cap for each target, units/second
    pub max_speed: f64,

    /// Turn rate gain of the demonstration controller, 1/second
    pub turn_gain: f64,

    /// Distance within which a target counts as reached, units
    pub settle_distance: f64,

    /// Heading error within which a heading target counts as reached, degrees
    pub settle_angle_deg: f64,

    /// Longest time to wait for each target, seconds
    pub settle_timeout_s: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq)]
pub enum ExecParamsError {
    #[error("{name} must be finite and not negative, found {value}")]
    InvalidValue { name: &'static str, value: f64 },
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ExecParams {
    /// Check every gain, tolerance and timeout is usable.
    pub fn validate(&self) -> Result<(), ExecParamsError> {
        check_non_negative("max_speed", self.max_speed)?;
        check_non_negative("turn_gain", self.turn_gain)?;
        check_non_negative("settle_distance", self.settle_distance)?;
        check_non_negative("settle_angle_deg", self.settle_angle_deg)?;
        check_non_negative("settle_timeout_s", self.settle_timeout_s)
    }

    /// Longest time to wait for each target.
    ///
    /// Only call on validated parameters.
    pub fn settle_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.settle_timeout_s)
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn check_non_negative(name: &'static str, value: f64) -> Result<(), ExecParamsError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ExecParamsError::InvalidValue { name, value })
    }
}
