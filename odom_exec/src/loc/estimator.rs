//! # Delta and heading estimator
//!
//! Turns raw sensor counts into per-cycle travel in units and finds the
//! heading change over the cycle.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;

use super::OdomParams;
use crate::eqpt::{HeadingSource, SensorSnapshot};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Raw readings and heading from the previous cycle.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize)]
pub struct PriorSample {
    pub left: f64,
    pub right: f64,
    pub lateral: f64,

    /// Heading at the end of the previous cycle.
    ///
    /// Units: radians
    pub heading: f64,
}

/// Travel and rotation over one cycle.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize)]
pub struct Deltas {
    /// Units: units
    pub left: f64,
    /// Units: units
    pub right: f64,
    /// Zero when no lateral encoder is fitted.
    ///
    /// Units: units
    pub lateral: f64,
    /// Heading change, clockwise positive.
    ///
    /// Units: radians
    pub angle: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PriorSample {
    /// Build the prior for the next cycle from this cycle's readings.
    pub fn from_snapshot(snapshot: &SensorSnapshot, heading: f64) -> Self {
        Self {
            left: snapshot.left,
            right: snapshot.right,
            lateral: snapshot.lateral.unwrap_or(0.0),
            heading,
        }
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Compute the cycle's deltas and the heading at the end of the cycle.
///
/// With a gyroscope the heading is its absolute reading (plus `gyro_offset`,
/// which is zero until the pose is re-seeded) and wheel travel plays no part
/// in rotation. Without one the heading change is the differential travel
/// over twice the track width, accumulated onto the prior heading.
pub fn estimate(
    params: &OdomParams,
    source: HeadingSource,
    snapshot: &SensorSnapshot,
    prior: &PriorSample,
    gyro_offset: f64,
) -> (Deltas, f64) {
    let left = (snapshot.left - prior.left) / params.linear_ticks_per_unit;
    let right = (snapshot.right - prior.right) / params.linear_ticks_per_unit;
    let lateral = match snapshot.lateral {
        Some(l) => (l - prior.lateral) / params.lateral_ticks_per_unit,
        None => 0.0,
    };

    let (angle, heading) = match (source, snapshot.heading_deg) {
        (HeadingSource::Gyro, Some(deg)) => {
            let heading = deg.to_radians() + gyro_offset;
            (heading - prior.heading, heading)
        }
        _ => {
            let angle = differential_angle(left, right, params.track_width);
            (angle, prior.heading + angle)
        }
    };

    (
        Deltas {
            left,
            right,
            lateral,
            angle,
        },
        heading,
    )
}

/// Heading change from differential travel of the left and right sensors.
pub fn differential_angle(delta_left: f64, delta_right: f64, track_width: f64) -> f64 {
    (delta_left - delta_right) / (2.0 * track_width)
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    fn params() -> OdomParams {
        OdomParams {
            track_width: 12.0,
            lateral_offset: 0.0,
            linear_ticks_per_unit: 360.0,
            lateral_ticks_per_unit: 100.0,
            cycle_period_ms: 10,
            ..Default::default()
        }
    }

    #[test]
    fn test_straight_travel() {
        let snapshot = SensorSnapshot {
            left: 36.0 * 360.0,
            right: 36.0 * 360.0,
            lateral: None,
            heading_deg: None,
        };

        let (deltas, heading) = estimate(
            &params(),
            HeadingSource::Differential,
            &snapshot,
            &PriorSample::default(),
            0.0,
        );

        assert_relative_eq!(deltas.left, 36.0);
        assert_relative_eq!(deltas.right, 36.0);
        assert_eq!(deltas.lateral, 0.0);
        assert_eq!(deltas.angle, 0.0);
        assert_eq!(heading, 0.0);
    }

    #[test]
    fn test_differential_heading_accumulates() {
        let prior = PriorSample {
            left: 360.0,
            right: 360.0,
            lateral: 50.0,
            heading: 10.0,
        };
        let snapshot = SensorSnapshot {
            left: 360.0 + 36.0 * 360.0,
            right: 360.0,
            lateral: Some(250.0),
            heading_deg: None,
        };

        let (deltas, heading) = estimate(
            &params(),
            HeadingSource::Differential,
            &snapshot,
            &prior,
            0.0,
        );

        assert_relative_eq!(deltas.angle, 1.5);
        assert_relative_eq!(deltas.lateral, 2.0);
        // Heading is not wrapped
        assert_relative_eq!(heading, 11.5);
    }

    #[test]
    fn test_gyro_overrides_wheels() {
        let prior = PriorSample {
            heading: 90f64.to_radians(),
            ..Default::default()
        };
        let snapshot = SensorSnapshot {
            left: 3600.0,
            right: 0.0,
            lateral: None,
            heading_deg: Some(450.0),
        };

        let (deltas, heading) =
            estimate(&params(), HeadingSource::Gyro, &snapshot, &prior, 0.0);

        assert_relative_eq!(heading, 450f64.to_radians());
        assert_relative_eq!(deltas.angle, 360f64.to_radians(), epsilon = 1e-12);
    }

    #[test]
    fn test_gyro_offset() {
        let snapshot = SensorSnapshot {
            heading_deg: Some(45.0),
            ..Default::default()
        };

        let (_, heading) = estimate(
            &params(),
            HeadingSource::Gyro,
            &snapshot,
            &PriorSample::default(),
            1.0,
        );

        assert_relative_eq!(heading, 45f64.to_radians() + 1.0);
    }
}
