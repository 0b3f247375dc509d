//! # Pose and global integration
//!
//! Holds the accumulated pose, the integration of each cycle's robot frame
//! displacement into it, and the pose-relative error queries used by the
//! motion controller.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::sync::RwLock;

use nalgebra::{Point2, Rotation2, Vector2};
use serde::{Deserialize, Serialize};
use util::maths::wrap_pi;

use super::{LocalDisplacement, OdomError};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The robot's pose in the global frame.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// Units: units
    pub x: f64,

    /// Units: units
    pub y: f64,

    /// Heading from global +Y, clockwise positive. Accumulates without
    /// wrapping, so a robot which has spun twice reads roughly `4 * pi`.
    ///
    /// Units: radians
    pub heading: f64,

    /// Mirror of `heading`.
    ///
    /// Units: degrees
    pub heading_deg: f64,
}

/// A pose shared between the odometry worker and its readers.
///
/// Every read and write moves the whole pose under the lock, so a reader
/// never observes a half-applied update.
#[derive(Debug, Default)]
pub struct SharedPose {
    pose: RwLock<Pose>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Pose {
    /// Create a new pose, heading given in radians.
    pub fn new(x: f64, y: f64, heading: f64) -> Self {
        Self {
            x,
            y,
            heading,
            heading_deg: heading.to_degrees(),
        }
    }

    /// The position as a point.
    pub fn position(&self) -> Point2<f64> {
        Point2::new(self.x, self.y)
    }

    /// Set the heading, keeping the degrees mirror in step.
    pub fn set_heading(&mut self, heading: f64) {
        self.heading = heading;
        self.heading_deg = heading.to_degrees();
    }

    /// Integrate one cycle's displacement.
    ///
    /// `self.heading` must already hold the heading at the end of the cycle.
    /// The displacement is rotated into the global frame using the heading at
    /// the middle of the cycle, `heading - delta_angle / 2`.
    pub fn integrate(&mut self, disp: &LocalDisplacement, delta_angle: f64) {
        let mid_heading = self.heading - delta_angle / 2.0;

        // Heading is clockwise from +Y, which is a rotation by -heading from
        // a robot frame of (lateral, forward) onto (x, y).
        let global = Rotation2::new(-mid_heading) * Vector2::new(disp.lateral, disp.forward);

        self.x += global.x;
        self.y += global.y;
    }

    /// Signed heading correction needed to face `target`, wrapped into
    /// (-pi, pi].
    ///
    /// Positive when the robot must turn anticlockwise. If the target sits
    /// exactly on the robot the bearing is taken as zero, so the result is the
    /// wrapped heading.
    pub fn angle_error(&self, target: &Point2<f64>) -> f64 {
        let offset = target - self.position();

        let bearing = if offset.x == 0.0 && offset.y == 0.0 {
            0.0
        } else {
            offset.x.atan2(offset.y)
        };

        wrap_pi(self.heading - bearing)
    }

    /// Straight line distance to `target`.
    pub fn distance_error(&self, target: &Point2<f64>) -> f64 {
        nalgebra::distance(&self.position(), target)
    }
}

impl SharedPose {
    pub fn new(pose: Pose) -> Self {
        Self {
            pose: RwLock::new(pose),
        }
    }

    /// Take a consistent copy of the pose.
    pub fn snapshot(&self) -> Result<Pose, OdomError> {
        Ok(*self.pose.read()?)
    }

    /// Replace the pose with a new one.
    pub fn apply(&self, pose: Pose) -> Result<(), OdomError> {
        *self.pose.write()? = pose;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

    fn disp(forward: f64, lateral: f64) -> LocalDisplacement {
        LocalDisplacement {
            forward,
            lateral,
            arc_corrected: false,
        }
    }

    #[test]
    fn test_integrate_straight_along_heading() {
        let mut pose = Pose::new(0.0, 0.0, 0.0);
        pose.integrate(&disp(36.0, 0.0), 0.0);
        assert_relative_eq!(pose.x, 0.0);
        assert_relative_eq!(pose.y, 36.0);

        // Facing +X
        let mut pose = Pose::new(1.0, 1.0, FRAC_PI_2);
        pose.integrate(&disp(2.0, 0.0), 0.0);
        assert_relative_eq!(pose.x, 3.0);
        assert_relative_eq!(pose.y, 1.0, epsilon = 1e-12);

        // Lateral travel is to the robot's right
        let mut pose = Pose::new(0.0, 0.0, 0.0);
        pose.integrate(&disp(0.0, 1.0), 0.0);
        assert_relative_eq!(pose.x, 1.0);
        assert_relative_eq!(pose.y, 0.0);
    }

    #[test]
    fn test_integrate_uses_mid_heading() {
        let mut pose = Pose::new(0.0, 0.0, 1.5);
        pose.integrate(&disp(10.0, 0.0), 1.5);

        assert_relative_eq!(pose.x, 10.0 * 0.75f64.sin());
        assert_relative_eq!(pose.y, 10.0 * 0.75f64.cos());
    }

    #[test]
    fn test_angle_error() {
        let pose = Pose::new(0.0, 0.0, 0.0);

        // Straight ahead
        assert_relative_eq!(pose.angle_error(&Point2::new(0.0, 5.0)), 0.0);
        // To the right, must turn clockwise
        assert_relative_eq!(pose.angle_error(&Point2::new(5.0, 5.0)), -FRAC_PI_4);
        // To the left, must turn anticlockwise
        assert_relative_eq!(pose.angle_error(&Point2::new(-5.0, 5.0)), FRAC_PI_4);
        // Directly behind
        assert_relative_eq!(pose.angle_error(&Point2::new(0.0, -5.0)), PI);
    }

    #[test]
    fn test_angle_error_unbounded_heading() {
        // Several turns plus a quarter, facing +X
        let pose = Pose::new(0.0, 0.0, 6.0 * PI + FRAC_PI_2);
        assert_relative_eq!(
            pose.angle_error(&Point2::new(10.0, 0.0)),
            0.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_angle_error_range() {
        for i in 0..50 {
            let heading = -30.0 + 1.3 * i as f64;
            let pose = Pose::new(1.0, -2.0, heading);

            for j in 0..16 {
                let a = j as f64 * PI / 8.0;
                let target = Point2::new(1.0 + 3.0 * a.sin(), -2.0 + 3.0 * a.cos());
                let err = pose.angle_error(&target);

                assert!(err > -PI && err <= PI, "error {} out of range", err);
            }
        }
    }

    #[test]
    fn test_coincident_target() {
        let pose = Pose::new(4.0, 4.0, 2.0 * PI + 0.5);
        let target = Point2::new(4.0, 4.0);

        assert_eq!(pose.distance_error(&target), 0.0);

        let err = pose.angle_error(&target);
        assert!(!err.is_nan());
        assert_relative_eq!(err, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_distance_error_ignores_heading() {
        let target = Point2::new(3.0, 7.0);
        let mut pose = Pose::new(0.0, 3.0, 0.0);

        let before = pose.distance_error(&target);
        assert_relative_eq!(before, 5.0);

        // Spin in place
        pose.set_heading(2.4);
        assert_eq!(pose.distance_error(&target), before);
    }

    #[test]
    fn test_queries_idempotent() {
        let pose = Pose::new(2.0, -1.0, 0.3);
        let target = Point2::new(-4.0, 9.0);

        assert_eq!(pose.angle_error(&target), pose.angle_error(&target));
        assert_eq!(pose.distance_error(&target), pose.distance_error(&target));
    }

    #[test]
    fn test_shared_pose() {
        let shared = SharedPose::default();
        assert_eq!(shared.snapshot().unwrap(), Pose::default());

        let pose = Pose::new(1.0, 2.0, 0.5);
        shared.apply(pose).unwrap();
        assert_eq!(shared.snapshot().unwrap(), pose);
    }
}
