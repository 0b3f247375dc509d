//! Shared motion controller state.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::{
    sync::{Condvar, Mutex},
    time::Duration,
};

use log::debug;

use super::{MotionCtrl, NavError, NavTarget};

// ---------------------------------------------------------------------------
// STRUCTS
// ---------------------------------------------------------------------------

/// Target, speed cap and settled flag shared between the dispatcher and the
/// motion controller.
///
/// The dispatcher writes through [`MotionCtrl`], the controller polls
/// [`TargetCell::target`] and reports arrival with
/// [`TargetCell::mark_settled`], which wakes any blocked waiter.
#[derive(Debug, Default)]
pub struct TargetCell {
    state: Mutex<CtrlState>,
    settled_cv: Condvar,
}

#[derive(Debug, Default)]
struct CtrlState {
    max_speed: f64,
    target: Option<NavTarget>,
    settled: bool,
    num_resets: u64,
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl TargetCell {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current target, if any.
    pub fn target(&self) -> Result<Option<NavTarget>, NavError> {
        Ok(self.state.lock()?.target)
    }

    /// The current speed cap.
    pub fn max_speed(&self) -> Result<f64, NavError> {
        Ok(self.state.lock()?.max_speed)
    }

    /// True if the controller has reported the current target as reached.
    pub fn is_settled(&self) -> Result<bool, NavError> {
        Ok(self.state.lock()?.settled)
    }

    /// Number of times the controller has been reset.
    pub fn num_resets(&self) -> Result<u64, NavError> {
        Ok(self.state.lock()?.num_resets)
    }

    /// Report that the robot has settled on the current target.
    pub fn mark_settled(&self) -> Result<(), NavError> {
        self.state.lock()?.settled = true;
        self.settled_cv.notify_all();
        Ok(())
    }
}

impl MotionCtrl for TargetCell {
    fn reset(&self) -> Result<(), NavError> {
        let mut state = self.state.lock()?;
        state.target = None;
        state.settled = false;
        state.num_resets += 1;
        Ok(())
    }

    fn set_max_speed(&self, max_speed: f64) -> Result<(), NavError> {
        self.state.lock()?.max_speed = max_speed;
        Ok(())
    }

    fn set_target(&self, target: NavTarget) -> Result<(), NavError> {
        let mut state = self.state.lock()?;
        state.target = Some(target);
        state.settled = false;
        Ok(())
    }

    fn wait_until_settled(&self, timeout: Duration) -> Result<(), NavError> {
        let state = self.state.lock()?;
        let (state, _) = self
            .settled_cv
            .wait_timeout_while(state, timeout, |s| !s.settled)?;

        if state.settled {
            debug!("Motion controller settled on {:?}", state.target);
            Ok(())
        } else {
            Err(NavError::SettleTimeout(timeout))
        }
    }
}
