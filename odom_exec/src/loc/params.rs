//! Parameters structure for the odometry

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::time::Duration;

use log::info;
use serde::{Deserialize, Serialize};

use super::OdomError;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the odometry.
///
/// Linear quantities share whatever unit the tick factors convert into
/// (inches on most robots), referred to here as "units".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OdomParams {
    /// Emit one `x, y, heading_deg` line per cycle.
    #[serde(default)]
    pub debug: bool,

    // ---- GEOMETRY ----

    /// Distance from the rotation centre to each of the left and right
    /// tracking lines. Differential travel is divided by twice this value to
    /// get the heading change.
    ///
    /// Units: units
    pub track_width: f64,

    /// Distance of the lateral tracking encoder from the rotation centre.
    ///
    /// Units: units
    #[serde(default)]
    pub lateral_offset: f64,

    // ---- SENSOR SCALING ----

    /// Raw counts per unit of travel for the left and right sensors.
    pub linear_ticks_per_unit: f64,

    /// Raw counts per unit of travel for the lateral encoder.
    pub lateral_ticks_per_unit: f64,

    // ---- TIMING ----

    /// Period of the odometry cycle.
    ///
    /// Units: milliseconds
    #[serde(default = "default_cycle_period_ms")]
    pub cycle_period_ms: u64,

    /// Delay before the first cycle, letting the sensors settle after
    /// power-on.
    ///
    /// Units: milliseconds
    #[serde(default = "default_hw_settle_delay_ms")]
    pub hw_settle_delay_ms: u64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl OdomParams {
    /// Load the parameters from a file relative to the parameters directory
    /// and check them.
    pub fn load(param_file_path: &str) -> Result<Self, OdomError> {
        let params: Self = util::params::load(param_file_path)?;
        params.validate()?;
        Ok(params)
    }

    /// Check the parameters describe a usable configuration.
    pub fn validate(&self) -> Result<(), OdomError> {
        check_ticks("linear_ticks_per_unit", self.linear_ticks_per_unit)?;
        check_ticks("lateral_ticks_per_unit", self.lateral_ticks_per_unit)?;

        if self.track_width.is_nan() || self.track_width <= 0.0 {
            return Err(OdomError::InvalidTrackWidth(self.track_width));
        }

        if self.cycle_period_ms == 0 {
            return Err(OdomError::InvalidCyclePeriod);
        }

        Ok(())
    }

    /// The odometry cycle period.
    pub fn cycle_period(&self) -> Duration {
        Duration::from_millis(self.cycle_period_ms)
    }

    /// The hardware settling delay.
    pub fn hw_settle_delay(&self) -> Duration {
        Duration::from_millis(self.hw_settle_delay_ms)
    }

    /// Write the parameters to the log.
    pub fn log(&self) {
        info!("Odometry parameters:");
        info!("    track width: {}", self.track_width);
        info!("    lateral offset: {}", self.lateral_offset);
        info!("    linear ticks/unit: {}", self.linear_ticks_per_unit);
        info!("    lateral ticks/unit: {}", self.lateral_ticks_per_unit);
        info!("    cycle period: {} ms", self.cycle_period_ms);
        info!("    debug output: {}", self.debug);
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

fn check_ticks(name: &'static str, value: f64) -> Result<(), OdomError> {
    // Written so that NaN is rejected too
    if value > 0.0 {
        Ok(())
    } else {
        Err(OdomError::InvalidTicksPerUnit { name, value })
    }
}

fn default_cycle_period_ms() -> u64 {
    10
}

fn default_hw_settle_delay_ms() -> u64 {
    1500
}
