//! Point-seeking controller for the simulated chassis.
//!
//! Stands in for the real motion controller in the demonstration executable:
//! it polls the [`TargetCell`], steers the simulated chassis towards the
//! target using the odometry's error queries, and marks the target settled on
//! arrival.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use log::{debug, error, warn};
use odom_lib::{
    loc::SharedPose,
    nav::{NavMode, NavTarget, TargetCell},
    sim::SimChassis,
};
use util::maths::{clamp, wrap_pi};

use crate::params::ExecParams;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct SimCtrl {
    bg_run: Arc<AtomicBool>,
    bg_jh: Option<JoinHandle<()>>,
}

struct Gains {
    period: Duration,
    turn_gain: f64,
    settle_distance: f64,
    settle_angle: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SimCtrl {
    /// Start the controller on a background thread.
    pub fn start(
        chassis: SimChassis,
        pose: Arc<SharedPose>,
        cell: Arc<TargetCell>,
        params: &ExecParams,
        period: Duration,
    ) -> Self {
        let gains = Gains {
            period,
            turn_gain: params.turn_gain,
            settle_distance: params.settle_distance,
            settle_angle: params.settle_angle_deg.to_radians(),
        };

        let bg_run = Arc::new(AtomicBool::new(true));
        let bg_run_clone = bg_run.clone();

        let bg_jh = Some(thread::spawn(move || {
            bg_thread(bg_run_clone, chassis, pose, cell, gains)
        }));

        Self { bg_run, bg_jh }
    }

    /// Stop the controller and wait for its thread to exit.
    pub fn stop(mut self) {
        self.bg_run.store(false, Ordering::Relaxed);

        if let Some(jh) = self.bg_jh.take() {
            if jh.join().is_err() {
                warn!("SimCtrl thread panicked");
            }
        }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn bg_thread(
    run: Arc<AtomicBool>,
    chassis: SimChassis,
    pose: Arc<SharedPose>,
    cell: Arc<TargetCell>,
    gains: Gains,
) {
    let dt = gains.period.as_secs_f64();
    let turn_step = clamp(gains.turn_gain * dt, 0.0, 1.0);

    while run.load(Ordering::Relaxed) {
        thread::sleep(gains.period);

        let target = match (cell.target(), cell.is_settled()) {
            (Ok(Some(t)), Ok(false)) => t,
            (Ok(_), Ok(_)) => continue,
            (Err(e), _) | (_, Err(e)) => {
                error!("SimCtrl couldn't read the target: {}", e);
                break;
            }
        };

        let pose = match pose.snapshot() {
            Ok(p) => p,
            Err(e) => {
                error!("SimCtrl couldn't read the pose: {}", e);
                break;
            }
        };

        let distance = pose.distance_error(&target.point);

        if distance > gains.settle_distance {
            // Turn towards the target, only driving forward while roughly
            // facing it
            let angle = pose.angle_error(&target.point);
            let forward = clamp(target.max_speed * dt, 0.0, distance) * angle.cos().max(0.0);

            chassis.drive_twist(forward, -angle * turn_step);
            continue;
        }

        if let Some(heading_err) = heading_error(&target, pose.heading) {
            if heading_err.abs() > gains.settle_angle {
                chassis.drive_twist(0.0, -heading_err * turn_step);
                continue;
            }
        }

        debug!("SimCtrl reached {:?} at {:?}", target, pose);

        if let Err(e) = cell.mark_settled() {
            error!("SimCtrl couldn't mark the target settled: {}", e);
            break;
        }
    }
}

/// Heading error for targets which hold a heading.
fn heading_error(target: &NavTarget, heading: f64) -> Option<f64> {
    match (target.mode, target.angle) {
        (NavMode::PointHeading, Some(angle)) => Some(wrap_pi(heading - angle)),
        _ => None,
    }
}
