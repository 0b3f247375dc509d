//! Target dispatcher.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::{sync::Arc, thread, time::Duration};

use log::info;
use nalgebra::Point2;

use super::{MotionCtrl, NavError, NavTarget, SETTLE_GRACE_PERIOD};

// ---------------------------------------------------------------------------
// STRUCTS
// ---------------------------------------------------------------------------

/// Publishes targets to a motion controller.
///
/// The `_async` calls return as soon as the target is published. `move_to`
/// and `holo` additionally wait out [`SETTLE_GRACE_PERIOD`] and then block
/// until the controller settles or `settle_timeout` elapses.
#[derive(Debug)]
pub struct TargetDispatcher<C: MotionCtrl> {
    ctrl: Arc<C>,
    settle_timeout: Duration,
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl<C: MotionCtrl> TargetDispatcher<C> {
    pub fn new(ctrl: Arc<C>, settle_timeout: Duration) -> Self {
        Self {
            ctrl,
            settle_timeout,
        }
    }

    /// The controller targets are published to.
    pub fn ctrl(&self) -> &Arc<C> {
        &self.ctrl
    }

    /// Drive to `point` at up to `max_speed`, returning immediately.
    pub fn move_async(&self, point: Point2<f64>, max_speed: f64) -> Result<(), NavError> {
        self.dispatch(NavTarget::point(point, max_speed))
    }

    /// Drive to `point` holding heading `angle` (radians) at up to
    /// `max_speed`, returning immediately.
    pub fn holo_async(
        &self,
        point: Point2<f64>,
        angle: f64,
        max_speed: f64,
    ) -> Result<(), NavError> {
        self.dispatch(NavTarget::point_heading(point, angle, max_speed))
    }

    /// Drive to `point` and wait until settled.
    pub fn move_to(&self, point: Point2<f64>, max_speed: f64) -> Result<(), NavError> {
        self.move_async(point, max_speed)?;
        self.wait_settled()
    }

    /// Drive to `point` holding heading `angle` and wait until settled.
    pub fn holo(&self, point: Point2<f64>, angle: f64, max_speed: f64) -> Result<(), NavError> {
        self.holo_async(point, angle, max_speed)?;
        self.wait_settled()
    }

    fn dispatch(&self, target: NavTarget) -> Result<(), NavError> {
        self.ctrl.reset()?;
        self.ctrl.set_max_speed(target.max_speed)?;
        self.ctrl.set_target(target)?;

        info!(
            "Dispatched {:?} target ({:.2}, {:.2}), max speed {}",
            target.mode, target.point.x, target.point.y, target.max_speed
        );

        Ok(())
    }

    fn wait_settled(&self) -> Result<(), NavError> {
        thread::sleep(SETTLE_GRACE_PERIOD);
        self.ctrl.wait_until_settled(self.settle_timeout)
    }
}
