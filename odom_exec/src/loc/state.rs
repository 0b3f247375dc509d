//! Odometry module state

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use serde::Serialize;

// Internal
use super::{
    arc::local_displacement, estimator::estimate, Deltas, LocalDisplacement, OdomError,
    OdomParams, Pose, PriorSample,
};
use crate::eqpt::{HeadingSource, SensorSnapshot};
use util::module::State;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Odometry module state.
///
/// One call to `proc` is one odometry cycle: the snapshot's deltas against the
/// prior sample are estimated, turned into a robot frame displacement and
/// integrated into the pose, then the prior is replaced by the snapshot.
#[derive(Debug, Default)]
pub struct Odometry {
    params: OdomParams,
    source: HeadingSource,
    initialised: bool,

    /// `None` until the first snapshot, which only seeds the prior.
    prior: Option<PriorSample>,

    /// Added to the gyroscope reading so the pose can be re-seeded.
    ///
    /// Units: radians
    gyro_offset: f64,

    /// Set when `reset_pose` fixed the heading before the first snapshot, so
    /// the gyroscope is rebased onto it rather than read as absolute.
    heading_reseeded: bool,

    pose: Pose,
    report: StatusReport,
}

/// Status report for one odometry cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct StatusReport {
    /// Travel and rotation measured this cycle.
    pub deltas: Deltas,

    /// Displacement of the rotation centre this cycle, robot frame.
    pub displacement: LocalDisplacement,

    /// True if this cycle only seeded the prior sample.
    pub seeded: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl State for Odometry {
    type InitData = (OdomParams, HeadingSource);
    type InitError = OdomError;

    type InputData = SensorSnapshot;
    type OutputData = Pose;
    type StatusReport = StatusReport;
    type ProcError = OdomError;

    /// Initialise the odometry.
    ///
    /// Expected init data is the parameters and the heading policy of the
    /// fitted sensors.
    fn init(&mut self, init_data: Self::InitData) -> Result<(), Self::InitError> {
        let (params, source) = init_data;

        params.validate()?;

        self.params = params;
        self.source = source;
        self.prior = None;
        self.gyro_offset = 0.0;
        self.heading_reseeded = false;
        self.report = StatusReport::default();
        self.initialised = true;

        Ok(())
    }

    /// Perform one odometry cycle.
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        if !self.initialised {
            return Err(OdomError::NotInitialised);
        }

        self.report = StatusReport::default();

        let prior = match self.prior {
            Some(p) => p,
            None => {
                self.seed(input_data);
                return Ok((self.pose, self.report));
            }
        };

        let (deltas, heading) = estimate(
            &self.params,
            self.source,
            input_data,
            &prior,
            self.gyro_offset,
        );

        let displacement = local_displacement(&deltas, &self.params);

        self.pose.set_heading(heading);
        self.pose.integrate(&displacement, deltas.angle);

        // Only once every delta has been taken from the old prior
        self.prior = Some(PriorSample::from_snapshot(input_data, heading));

        self.report.deltas = deltas;
        self.report.displacement = displacement;

        trace!(
            "Odometry: deltas {:?}, displacement {:?}, pose {:?}",
            deltas,
            displacement,
            self.pose
        );

        Ok((self.pose, self.report))
    }
}

impl Odometry {
    /// Create and initialise a new odometry instance.
    pub fn new(params: OdomParams, source: HeadingSource) -> Result<Self, OdomError> {
        let mut odom = Self::default();
        odom.init((params, source))?;
        Ok(odom)
    }

    /// The current pose.
    pub fn pose(&self) -> Pose {
        self.pose
    }

    /// The parameters in use.
    pub fn params(&self) -> &OdomParams {
        &self.params
    }

    /// Re-seed the pose, for example at a known start position.
    ///
    /// Later cycles integrate from the new pose. With a gyroscope the heading
    /// offset is adjusted so its next reading continues from the new heading.
    pub fn reset_pose(&mut self, mut pose: Pose) {
        pose.set_heading(pose.heading);

        match self.prior {
            Some(ref mut prior) => {
                self.gyro_offset += pose.heading - prior.heading;
                prior.heading = pose.heading;
            }
            None => self.heading_reseeded = true,
        }

        self.pose = pose;
    }

    /// Take the first snapshot as the prior without moving the pose.
    fn seed(&mut self, snapshot: &SensorSnapshot) {
        if let (HeadingSource::Gyro, Some(deg)) = (self.source, snapshot.heading_deg) {
            if self.heading_reseeded {
                self.gyro_offset = self.pose.heading - deg.to_radians();
            } else {
                self.gyro_offset = 0.0;
                self.pose.set_heading(deg.to_radians());
            }
        }
        let heading = self.pose.heading;

        self.prior = Some(PriorSample::from_snapshot(snapshot, heading));
        self.report.seeded = true;
    }
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
            lateral_ticks_per_unit: 360.0,
            cycle_period_ms: 10,
            ..Default::default()
        }
    }

    fn ticks(left: f64, right: f64) -> SensorSnapshot {
        SensorSnapshot {
            left: left * 360.0,
            right: right * 360.0,
            lateral: None,
            heading_deg: None,
        }
    }

    fn seeded(source: HeadingSource) -> Odometry {
        let mut odom = Odometry::new(params(), source).unwrap();
        let (_, report) = odom.proc(&SensorSnapshot::default()).unwrap();
        assert!(report.seeded);
        odom
    }

    #[test]
    fn test_proc_before_init() {
        let mut odom = Odometry::default();
        assert!(matches!(
            odom.proc(&SensorSnapshot::default()),
            Err(OdomError::NotInitialised)
        ));
    }

    #[test]
    fn test_init_rejects_bad_params() {
        let mut bad = params();
        bad.lateral_ticks_per_unit = 0.0;
        assert!(Odometry::new(bad, HeadingSource::Differential).is_err());
    }

    #[test]
    fn test_seed_does_not_move() {
        let mut odom = Odometry::new(params(), HeadingSource::Differential).unwrap();
        let (pose, report) = odom.proc(&ticks(100.0, 250.0)).unwrap();

        assert!(report.seeded);
        assert_eq!(pose, Pose::default());
    }

    #[test]
    fn test_straight_cycle() {
        let mut odom = seeded(HeadingSource::Differential);
        let (pose, report) = odom.proc(&ticks(36.0, 36.0)).unwrap();

        assert!(!report.displacement.arc_corrected);
        assert_eq!(report.deltas.angle, 0.0);
        assert_relative_eq!(pose.x, 0.0);
        assert_relative_eq!(pose.y, 36.0);
        assert_eq!(pose.heading, 0.0);
    }

    #[test]
    fn test_straight_cycle_keeps_heading() {
        let mut odom = seeded(HeadingSource::Differential);
        odom.reset_pose(Pose::new(0.0, 0.0, 0.3));

        let (pose, _) = odom.proc(&ticks(36.0, 36.0)).unwrap();

        assert_relative_eq!(pose.heading, 0.3);
        assert_relative_eq!(pose.x, 36.0 * 0.3f64.sin());
        assert_relative_eq!(pose.y, 36.0 * 0.3f64.cos());
    }

    #[test]
    fn test_arc_cycle_closed_form() {
        let mut odom = seeded(HeadingSource::Differential);
        let (pose, report) = odom.proc(&ticks(36.0, 0.0)).unwrap();

        let delta_angle = 1.5;
        let forward = (0.0 / delta_angle + 12.0) * 2.0 * (delta_angle / 2.0f64).sin();
        let mid = delta_angle / 2.0;

        assert!(report.displacement.arc_corrected);
        assert_relative_eq!(report.deltas.angle, delta_angle);
        assert_relative_eq!(pose.heading, delta_angle);
        assert_relative_eq!(pose.heading_deg, delta_angle.to_degrees());
        assert_relative_eq!(pose.x, mid.sin() * forward, epsilon = 1e-12);
        assert_relative_eq!(pose.y, mid.cos() * forward, epsilon = 1e-12);
    }

    #[test]
    fn test_full_circle_returns_home() {
        // Drive a full circle of radius 24 about a point to the robot's right
        // in small steps; the chord model is exact for constant curvature.
        let mut odom = seeded(HeadingSource::Differential);
        let steps = 100;
        let angle_step = std::f64::consts::TAU / steps as f64;
        let (mut left, mut right) = (0.0, 0.0);
        let mut pose = Pose::default();

        for _ in 0..steps {
            left += (24.0 + 12.0) * angle_step;
            right += (24.0 - 12.0) * angle_step;
            pose = odom.proc(&ticks(left, right)).unwrap().0;
        }

        assert_relative_eq!(pose.heading, std::f64::consts::TAU, epsilon = 1e-9);
        assert_relative_eq!(pose.x, 0.0, epsilon = 1e-9);
        assert_relative_eq!(pose.y, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_gyro_cycle() {
        let mut odom = Odometry::new(params(), HeadingSource::Gyro).unwrap();
        odom.proc(&SensorSnapshot {
            heading_deg: Some(0.0),
            ..Default::default()
        })
        .unwrap();

        // Wheels disagree with the gyro, the gyro wins
        let (pose, report) = odom
            .proc(&SensorSnapshot {
                left: 10.0 * 360.0,
                right: 10.0 * 360.0,
                lateral: None,
                heading_deg: Some(90.0),
            })
            .unwrap();

        let delta_angle = std::f64::consts::FRAC_PI_2;
        let forward = (10.0 / delta_angle + 12.0) * 2.0 * (delta_angle / 2.0).sin();

        assert_relative_eq!(report.deltas.angle, delta_angle, epsilon = 1e-12);
        assert_relative_eq!(pose.heading_deg, 90.0, epsilon = 1e-9);
        assert_relative_eq!(pose.x, (delta_angle / 2.0).sin() * forward, epsilon = 1e-12);
        assert_relative_eq!(pose.y, (delta_angle / 2.0).cos() * forward, epsilon = 1e-12);
    }

    #[test]
    fn test_reset_pose_with_gyro() {
        let mut odom = Odometry::new(params(), HeadingSource::Gyro).unwrap();
        let gyro = |deg: f64| SensorSnapshot {
            heading_deg: Some(deg),
            ..Default::default()
        };

        odom.proc(&gyro(30.0)).unwrap();
        odom.reset_pose(Pose::new(5.0, 5.0, 0.0));

        // No rotation since the reset: heading stays at the re-seeded value
        let (pose, report) = odom.proc(&gyro(30.0)).unwrap();
        assert_relative_eq!(pose.heading, 0.0, epsilon = 1e-12);
        assert_relative_eq!(report.deltas.angle, 0.0, epsilon = 1e-12);

        // Further rotation is relative to the new heading
        let (pose, _) = odom.proc(&gyro(40.0)).unwrap();
        assert_relative_eq!(pose.heading_deg, 10.0, epsilon = 1e-9);
    }

    #[test]
    fn test_lateral_only_translation() {
        let mut odom = seeded(HeadingSource::Differential);
        let (pose, _) = odom
            .proc(&SensorSnapshot {
                left: 0.0,
                right: 0.0,
                lateral: Some(3.0 * 360.0),
                heading_deg: None,
            })
            .unwrap();

        assert_relative_eq!(pose.x, 3.0);
        assert_relative_eq!(pose.y, 0.0);
    }

    #[test]
    fn test_arc_cycle_with_lateral() {
        let params = OdomParams {
            lateral_offset: 3.0,
            ..params()
        };
        let mut odom = Odometry::new(params, HeadingSource::Differential).unwrap();
        odom.proc(&SensorSnapshot {
            lateral: Some(0.0),
            ..Default::default()
        })
        .unwrap();

        let (pose, report) = odom
            .proc(&SensorSnapshot {
                left: 36.0 * 360.0,
                right: 0.0,
                lateral: Some(360.0),
                heading_deg: None,
            })
            .unwrap();

        let scale = 2.0 * 0.75f64.sin();
        let forward = 12.0 * scale;
        let lateral = (1.0 / 1.5 + 3.0) * scale;
        let mid = 0.75f64;

        assert_relative_eq!(report.displacement.lateral, lateral, epsilon = 1e-12);
        assert_relative_eq!(pose.heading, 1.5);
        assert_relative_eq!(
            pose.x,
            mid.sin() * forward + mid.cos() * lateral,
            epsilon = 1e-12
        );
        assert_relative_eq!(
            pose.y,
            mid.cos() * forward - mid.sin() * lateral,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_gyro_heading_is_absolute() {
        let mut odom = Odometry::new(params(), HeadingSource::Gyro).unwrap();
        let gyro = |deg: f64| SensorSnapshot {
            heading_deg: Some(deg),
            ..Default::default()
        };

        let (pose, report) = odom.proc(&gyro(30.0)).unwrap();
        assert!(report.seeded);
        assert_relative_eq!(pose.heading_deg, 30.0, epsilon = 1e-9);
        assert_eq!(pose.position(), Pose::default().position());

        // Same reading, no rotation and no jump
        let (pose, report) = odom.proc(&gyro(30.0)).unwrap();
        assert_relative_eq!(pose.heading_deg, 30.0, epsilon = 1e-9);
        assert_relative_eq!(report.deltas.angle, 0.0, epsilon = 1e-12);

        let (pose, _) = odom.proc(&gyro(45.0)).unwrap();
        assert_relative_eq!(pose.heading, 45f64.to_radians(), epsilon = 1e-12);
    }

    #[test]
    fn test_gyro_relative_to_reseeded_heading() {
        let mut odom = Odometry::new(params(), HeadingSource::Gyro).unwrap();
        let gyro = |deg: f64| SensorSnapshot {
            heading_deg: Some(deg),
            ..Default::default()
        };

        odom.reset_pose(Pose::new(0.0, 0.0, std::f64::consts::FRAC_PI_2));

        let (pose, _) = odom.proc(&gyro(30.0)).unwrap();
        assert_relative_eq!(pose.heading_deg, 90.0, epsilon = 1e-9);

        let (pose, _) = odom.proc(&gyro(40.0)).unwrap();
        assert_relative_eq!(pose.heading_deg, 100.0, epsilon = 1e-9);
    }
}
