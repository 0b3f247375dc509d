//! Odometry executable entry point.
//!
//! # Architecture
//!
//! The executable demonstrates the odometry end to end on the simulated
//! chassis:
//!
//!     - Initialise the session and logging
//!     - Load the odometry and executable parameters
//!     - Start odometry tracking on the simulated sensors
//!     - Start the simulated motion controller
//!     - Dispatch each waypoint in turn, waiting for it to settle
//!     - Stop the controller and the odometry

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod sim_ctrl;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Report};
use log::{info, warn};
use nalgebra::Point2;
use std::sync::Arc;

// Internal
use odom_lib::{
    loc::{OdomParams, OdomTracker},
    nav::{TargetCell, TargetDispatcher},
    sim::SimChassis,
};
use params::ExecParams;
use sim_ctrl::SimCtrl;
use util::{
    logger::{logger_init, LevelFilter},
    session::Session,
};

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    // ---- EARLY INITIALISATION ----

    let session =
        Session::new("odom_exec", "sessions").wrap_err("Failed to create the session")?;

    logger_init(LevelFilter::Debug, &session).wrap_err("Failed to initialise logging")?;

    info!("Odometry Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let odom_params =
        OdomParams::load("odom.toml").wrap_err("Could not load odometry params")?;
    let exec_params: ExecParams =
        util::params::load("odom_exec.toml").wrap_err("Could not load exec params")?;
    exec_params
        .validate()
        .wrap_err("Invalid exec params")?;

    info!("Parameters loaded");

    // ---- INITIALISE MODULES ----

    let chassis = SimChassis::new(&odom_params);
    let sensors = chassis.sensors(
        exec_params.motor_encoders,
        exec_params.lateral_encoder,
        exec_params.gyro,
    );
    let period = odom_params.cycle_period();

    let tracker = OdomTracker::init(odom_params, sensors).wrap_err("Failed to start odometry")?;

    let cell = Arc::new(TargetCell::new());
    let sim_ctrl = SimCtrl::start(
        chassis,
        tracker.shared_pose(),
        cell.clone(),
        &exec_params,
        period,
    );
    let dispatcher = TargetDispatcher::new(cell, exec_params.settle_timeout());

    info!("Module initialisation complete\n");

    // ---- WAYPOINTS ----

    let last = exec_params.waypoints.len().saturating_sub(1);

    for (i, wp) in exec_params.waypoints.iter().enumerate() {
        let point = Point2::new(wp[0], wp[1]);

        let result = match exec_params.final_heading_deg {
            Some(h) if i == last => dispatcher.holo(point, h.to_radians(), exec_params.max_speed),
            _ => dispatcher.move_to(point, exec_params.max_speed),
        };

        match result {
            Ok(_) => {
                let pose = tracker.pose()?;
                info!(
                    "Waypoint {} reached, pose ({:.2}, {:.2}, {:.2} deg), distance error {:.3}",
                    i,
                    pose.x,
                    pose.y,
                    pose.heading_deg,
                    pose.distance_error(&point)
                );
            }
            Err(e) => warn!("Waypoint {} not reached: {}", i, e),
        }
    }

    // ---- SHUTDOWN ----

    sim_ctrl.stop();

    let pose = tracker.pose()?;
    info!(
        "Final pose ({:.2}, {:.2}, {:.2} deg) after {} cycles",
        pose.x,
        pose.y,
        pose.heading_deg,
        tracker.num_cycles()
    );

    tracker.stop().wrap_err("Odometry worker failed")?;

    info!("End of execution");

    Ok(())
}
