//! # Navigation target dispatch
//!
//! Publishes navigation targets to the motion controller. The controller
//! itself is external: this module only sets its speed cap and target, and
//! optionally waits for it to report that the robot has settled.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod dispatcher;
mod target_cell;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::{sync::PoisonError, time::Duration};

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

pub use dispatcher::TargetDispatcher;
pub use target_cell::TargetCell;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Time a blocking move waits after dispatch before polling for settled, so
/// the controller has started moving and is not still reporting the previous
/// target as settled.
pub const SETTLE_GRACE_PERIOD: Duration = Duration::from_millis(450);

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A target for the motion controller.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavTarget {
    /// Target position in the global frame.
    pub point: Point2<f64>,

    /// Heading to hold, only for `NavMode::PointHeading`.
    ///
    /// Units: radians
    pub angle: Option<f64>,

    /// Speed cap while driving to this target.
    pub max_speed: f64,

    pub mode: NavMode,
}

// ---------------------------------------------------------------------------
// ENUMS
// ---------------------------------------------------------------------------

/// How the motion controller drives to the target.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NavMode {
    /// Drive to the point, arriving at whatever heading results.
    Point,

    /// Drive to the point and hold the given heading (holonomic drives).
    PointHeading,
}

/// Possible errors that can occur during target dispatch.
#[derive(Debug, thiserror::Error)]
pub enum NavError {
    #[error("Motion controller did not settle within {0:?}")]
    SettleTimeout(Duration),

    #[error("Sync primitive is poisoned")]
    PoisonError,
}

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// The surface of the motion controller used by the dispatcher.
pub trait MotionCtrl: Send + Sync {
    /// Reset the controller's internal state ready for a new target.
    fn reset(&self) -> Result<(), NavError>;

    /// Set the controller's speed cap.
    fn set_max_speed(&self, max_speed: f64) -> Result<(), NavError>;

    /// Publish a new target.
    fn set_target(&self, target: NavTarget) -> Result<(), NavError>;

    /// Block until the controller reports the robot has settled on its
    /// target, or `timeout` elapses.
    fn wait_until_settled(&self, timeout: Duration) -> Result<(), NavError>;
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl NavTarget {
    /// A point-only target.
    pub fn point(point: Point2<f64>, max_speed: f64) -> Self {
        Self {
            point,
            angle: None,
            max_speed,
            mode: NavMode::Point,
        }
    }

    /// A point and heading target.
    pub fn point_heading(point: Point2<f64>, angle: f64, max_speed: f64) -> Self {
        Self {
            point,
            angle: Some(angle),
            max_speed,
            mode: NavMode::PointHeading,
        }
    }
}

impl<G> From<PoisonError<G>> for NavError {
    fn from(_: PoisonError<G>) -> Self {
        Self::PoisonError
    }
}
