//! # Simulated chassis
//!
//! A kinematic differential-drive chassis which provides [`Encoder`] and
//! [`Gyro`] implementations for development and testing without hardware.
//! Motion is commanded as per-step wheel travel and accumulated into raw
//! tick counts using the same scaling as the odometry parameters.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::sync::{Arc, Mutex, PoisonError};

use crate::{
    eqpt::{Encoder, Gyro, Sensors},
    loc::{estimator::differential_angle, OdomParams},
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Handle to a simulated chassis. Clones share the same chassis.
#[derive(Debug, Clone)]
pub struct SimChassis {
    params: OdomParams,
    state: Arc<Mutex<SimState>>,
}

/// Raw sensor state of the chassis.
#[derive(Debug, Default, Clone, Copy)]
struct SimState {
    left_ticks: f64,
    right_ticks: f64,
    lateral_ticks: f64,
    rotation_deg: f64,
}

/// One of the chassis' encoders.
struct SimEncoder {
    state: Arc<Mutex<SimState>>,
    channel: Channel,
}

struct SimGyro {
    state: Arc<Mutex<SimState>>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
enum Channel {
    Left,
    Right,
    Lateral,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SimChassis {
    /// Create a chassis with the geometry and scaling in `params`.
    pub fn new(params: &OdomParams) -> Self {
        Self {
            params: params.clone(),
            state: Arc::new(Mutex::new(SimState::default())),
        }
    }

    /// Build a sensor set reading from this chassis.
    ///
    /// With `motor_encoders` the drive readings are presented as motor
    /// encoders rather than tracking encoders; the values are the same.
    pub fn sensors(&self, motor_encoders: bool, lateral: bool, gyro: bool) -> Sensors {
        let left = Box::new(self.encoder(Channel::Left));
        let right = Box::new(self.encoder(Channel::Right));

        let mut sensors = if motor_encoders {
            Sensors::motor(left, right)
        } else {
            Sensors::tracking(left, right)
        };

        if lateral {
            sensors = sensors.with_lateral(Box::new(self.encoder(Channel::Lateral)));
        }

        if gyro {
            sensors = sensors.with_gyro(Box::new(SimGyro {
                state: self.state.clone(),
            }));
        }

        sensors
    }

    /// Move the wheels by the given travel (units).
    ///
    /// The gyroscope turns by the rotation implied by the differential
    /// travel, and the lateral wheel, mounted `lateral_offset` from the
    /// rotation centre, rolls by `-lateral_offset` per radian of it on top of
    /// `delta_lateral`.
    pub fn drive(&self, delta_left: f64, delta_right: f64, delta_lateral: f64) {
        let rotation = differential_angle(delta_left, delta_right, self.params.track_width);

        let lateral = delta_lateral - rotation * self.params.lateral_offset;

        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.left_ticks += delta_left * self.params.linear_ticks_per_unit;
        state.right_ticks += delta_right * self.params.linear_ticks_per_unit;
        state.lateral_ticks += lateral * self.params.lateral_ticks_per_unit;
        state.rotation_deg += rotation.to_degrees();
    }

    /// Move the rotation centre forward by `forward` while turning by
    /// `rotation` radians (clockwise positive).
    pub fn drive_twist(&self, forward: f64, rotation: f64) {
        let differential = rotation * self.params.track_width;
        self.drive(forward + differential, forward - differential, 0.0);
    }

    /// Current gyroscope reading in degrees.
    pub fn rotation_deg(&self) -> f64 {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .rotation_deg
    }

    fn encoder(&self, channel: Channel) -> SimEncoder {
        SimEncoder {
            state: self.state.clone(),
            channel,
        }
    }
}

impl Encoder for SimEncoder {
    fn position(&self) -> f64 {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        match self.channel {
            Channel::Left => state.left_ticks,
            Channel::Right => state.right_ticks,
            Channel::Lateral => state.lateral_ticks,
        }
    }
}

impl Gyro for SimGyro {
    fn rotation_deg(&self) -> f64 {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .rotation_deg
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    fn params() -> OdomParams {
        OdomParams {
            track_width: 6.0,
            linear_ticks_per_unit: 100.0,
            lateral_ticks_per_unit: 50.0,
            cycle_period_ms: 10,
            ..Default::default()
        }
    }

    #[test]
    fn test_drive_accumulates_ticks() {
        let sim = SimChassis::new(&params());
        let sensors = sim.sensors(false, true, true);

        sim.drive(1.0, 2.0, 3.0);
        sim.drive(1.0, 0.0, -1.0);

        let snapshot = sensors.read();
        assert_relative_eq!(snapshot.left, 200.0);
        assert_relative_eq!(snapshot.right, 200.0);
        assert_relative_eq!(snapshot.lateral.unwrap(), 100.0);
        // (1 - 2) / 12 + (1 - 0) / 12 = 0
        assert_relative_eq!(snapshot.heading_deg.unwrap(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_drive_twist() {
        let sim = SimChassis::new(&params());
        let sensors = sim.sensors(true, false, false);

        sim.drive_twist(2.0, 0.5);

        let snapshot = sensors.read();
        assert_relative_eq!(snapshot.left, (2.0 + 3.0) * 100.0);
        assert_relative_eq!(snapshot.right, (2.0 - 3.0) * 100.0);
        assert_relative_eq!(sim.rotation_deg(), 0.5f64.to_degrees());
        assert_eq!(snapshot.lateral, None);
        assert_eq!(snapshot.heading_deg, None);
    }

    #[test]
    fn test_point_turn_rolls_lateral_wheel() {
        let params = OdomParams {
            lateral_offset: 4.5,
            ..params()
        };
        let sim = SimChassis::new(&params);
        let sensors = sim.sensors(false, true, false);

        sim.drive_twist(0.0, 0.1);

        assert_relative_eq!(
            sensors.read().lateral.unwrap(),
            -0.1 * 4.5 * 50.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_point_turn_with_lateral_encoder_stays_put() {
        use crate::loc::Odometry;
        use util::module::State;

        let params = OdomParams {
            lateral_offset: 4.5,
            ..params()
        };

        for &gyro in &[false, true] {
            let sim = SimChassis::new(&params);
            let sensors = sim.sensors(false, true, gyro);
            let mut odom = Odometry::new(params.clone(), sensors.heading_source()).unwrap();
            odom.proc(&sensors.read()).unwrap();

            for _ in 0..10 {
                sim.drive_twist(0.0, 0.1);
                odom.proc(&sensors.read()).unwrap();
            }

            let pose = odom.pose();
            assert_relative_eq!(pose.heading, 1.0, epsilon = 1e-9);
            assert_relative_eq!(pose.x, 0.0, epsilon = 1e-9);
            assert_relative_eq!(pose.y, 0.0, epsilon = 1e-9);
        }
    }
}
