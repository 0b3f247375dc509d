//! # Equipment interfaces
//!
//! Abstracts over the hardware feeding the odometry. The drive sensors are
//! either dedicated tracking encoders or, when none are wired, the encoders
//! built into the drive motors. A lateral tracking encoder and a gyroscope
//! are both optional. Which sensors are present is fixed when [`Sensors`] is
//! built; a missing optional sensor is a valid configuration, not a fault.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A rotary position sensor, either a tracking wheel encoder or the encoder
/// integrated into a drive motor.
pub trait Encoder: Send {
    /// Raw accumulated position in ticks (or degrees for motor encoders).
    fn position(&self) -> f64;
}

/// A gyroscope reporting absolute accumulated rotation.
pub trait Gyro: Send {
    /// Accumulated rotation in degrees, clockwise positive and not wrapped.
    fn rotation_deg(&self) -> f64;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Raw readings taken from all configured sensors in one cycle.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize)]
pub struct SensorSnapshot {
    /// Left drive position, raw counts.
    pub left: f64,

    /// Right drive position, raw counts.
    pub right: f64,

    /// Lateral encoder position, raw counts. `None` if no lateral encoder is
    /// fitted.
    pub lateral: Option<f64>,

    /// Gyroscope rotation in degrees. `None` if no gyroscope is fitted.
    pub heading_deg: Option<f64>,
}

/// The complete set of sensors used by the odometry.
pub struct Sensors {
    drive: DriveSensors,
    lateral: Option<Box<dyn Encoder>>,
    gyro: Option<Box<dyn Gyro>>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The sensors measuring left and right travel.
pub enum DriveSensors {
    /// Dedicated, unpowered tracking wheels. Preferred when fitted.
    Tracking {
        left: Box<dyn Encoder>,
        right: Box<dyn Encoder>,
    },

    /// Encoders integrated into the drive motors.
    Motor {
        left: Box<dyn Encoder>,
        right: Box<dyn Encoder>,
    },
}

/// How the heading change is found each cycle.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum HeadingSource {
    /// Heading is read directly from the gyroscope.
    Gyro,

    /// Heading is derived from differential left/right travel.
    Differential,
}

impl Default for HeadingSource {
    fn default() -> Self {
        HeadingSource::Differential
    }
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Sensors {
    /// Build a sensor set from dedicated tracking encoders.
    pub fn tracking(left: Box<dyn Encoder>, right: Box<dyn Encoder>) -> Self {
        Self::from_drive(DriveSensors::Tracking { left, right })
    }

    /// Build a sensor set from the drive motors' integrated encoders.
    pub fn motor(left: Box<dyn Encoder>, right: Box<dyn Encoder>) -> Self {
        Self::from_drive(DriveSensors::Motor { left, right })
    }

    /// Build a sensor set from the given drive sensors with no optional
    /// sensors fitted.
    pub fn from_drive(drive: DriveSensors) -> Self {
        Self {
            drive,
            lateral: None,
            gyro: None,
        }
    }

    /// Add a lateral tracking encoder.
    pub fn with_lateral(mut self, lateral: Box<dyn Encoder>) -> Self {
        self.lateral = Some(lateral);
        self
    }

    /// Add a gyroscope.
    pub fn with_gyro(mut self, gyro: Box<dyn Gyro>) -> Self {
        self.gyro = Some(gyro);
        self
    }

    /// The heading policy implied by this configuration.
    pub fn heading_source(&self) -> HeadingSource {
        match self.gyro {
            Some(_) => HeadingSource::Gyro,
            None => HeadingSource::Differential,
        }
    }

    /// True if a lateral encoder is fitted.
    pub fn has_lateral(&self) -> bool {
        self.lateral.is_some()
    }

    /// Short name of the drive sensor configuration, used in logs.
    pub fn drive_kind(&self) -> &'static str {
        match self.drive {
            DriveSensors::Tracking { .. } => "tracking encoders",
            DriveSensors::Motor { .. } => "motor encoders",
        }
    }

    /// Read every configured sensor.
    pub fn read(&self) -> SensorSnapshot {
        let (left, right) = match self.drive {
            DriveSensors::Tracking {
                ref left,
                ref right,
            }
            | DriveSensors::Motor {
                ref left,
                ref right,
            } => (left.position(), right.position()),
        };

        SensorSnapshot {
            left,
            right,
            lateral: self.lateral.as_ref().map(|e| e.position()),
            heading_deg: self.gyro.as_ref().map(|g| g.rotation_deg()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    struct Fixed(f64);

    impl Encoder for Fixed {
        fn position(&self) -> f64 {
            self.0
        }
    }

    impl Gyro for Fixed {
        fn rotation_deg(&self) -> f64 {
            self.0
        }
    }

    #[test]
    fn test_minimal_config() {
        let sensors = Sensors::tracking(Box::new(Fixed(10.0)), Box::new(Fixed(-4.0)));

        assert_eq!(sensors.heading_source(), HeadingSource::Differential);
        assert!(!sensors.has_lateral());
        assert_eq!(
            sensors.read(),
            SensorSnapshot {
                left: 10.0,
                right: -4.0,
                lateral: None,
                heading_deg: None
            }
        );
    }

    #[test]
    fn test_full_motor_config() {
        let sensors = Sensors::motor(Box::new(Fixed(1.0)), Box::new(Fixed(2.0)))
            .with_lateral(Box::new(Fixed(3.0)))
            .with_gyro(Box::new(Fixed(90.0)));

        assert_eq!(sensors.heading_source(), HeadingSource::Gyro);
        assert!(sensors.has_lateral());
        assert_eq!(sensors.drive_kind(), "motor encoders");
        assert_eq!(
            sensors.read(),
            SensorSnapshot {
                left: 1.0,
                right: 2.0,
                lateral: Some(3.0),
                heading_deg: Some(90.0)
            }
        );
    }
}
