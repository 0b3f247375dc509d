//! # Odometry tracker
//!
//! Runs the odometry cycle on a background worker thread at a fixed period
//! and publishes the pose through a [`SharedPose`]. The worker lives until
//! [`OdomTracker::stop`] is called or the tracker is dropped.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        mpsc::{channel, Receiver, Sender, TryRecvError},
        Arc,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use log::{info, trace, warn};
use nalgebra::Point2;
use util::{logger::POSE_TRACE_TARGET, module::State, time::std_duration_to_millis};

use super::{OdomError, OdomParams, Odometry, Pose, SharedPose};
use crate::eqpt::Sensors;

// ---------------------------------------------------------------------------
// STRUCTS
// ---------------------------------------------------------------------------

/// Handle to the running odometry.
#[derive(Debug)]
pub struct OdomTracker {
    pose: Arc<SharedPose>,
    stats: Arc<CycleStats>,

    worker_sender: Sender<TrackerSignal>,
    worker_jh: Option<JoinHandle<Result<(), OdomError>>>,
}

/// Counters maintained by the worker.
#[derive(Debug, Default)]
struct CycleStats {
    num_cycles: AtomicU64,
    num_overruns: AtomicU64,
}

/// Everything the worker thread owns.
struct Worker {
    odom: Odometry,
    sensors: Sensors,
    period: Duration,
    debug: bool,
    pose: Arc<SharedPose>,
    stats: Arc<CycleStats>,
    receiver: Receiver<TrackerSignal>,
}

// ---------------------------------------------------------------------------
// ENUMS
// ---------------------------------------------------------------------------

/// Signals sent from the tracker handle to the worker.
#[derive(Debug, Clone, Copy)]
pub enum TrackerSignal {
    /// The worker should stop its operations
    Stop,

    /// Replace the pose from the next cycle on
    ResetPose(Pose),
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl OdomTracker {
    /// Configure the odometry and start tracking.
    ///
    /// Blocks for the hardware settling delay before spawning the worker. The
    /// pose starts at the origin facing +Y, or facing the gyroscope's
    /// heading when one is fitted.
    pub fn init(params: OdomParams, sensors: Sensors) -> Result<Self, OdomError> {
        Self::start(params, sensors, None)
    }

    /// As `init`, starting from a known pose. With a gyroscope its readings
    /// are taken relative to `start.heading`.
    pub fn init_at(params: OdomParams, sensors: Sensors, start: Pose) -> Result<Self, OdomError> {
        Self::start(params, sensors, Some(start))
    }

    fn start(params: OdomParams, sensors: Sensors, start: Option<Pose>) -> Result<Self, OdomError> {
        let mut odom = Odometry::new(params.clone(), sensors.heading_source())?;
        if let Some(start) = start {
            odom.reset_pose(start);
        }

        params.log();
        info!(
            "Odometry sensors: {}, lateral encoder: {}, heading from {:?}",
            sensors.drive_kind(),
            sensors.has_lateral(),
            sensors.heading_source()
        );

        thread::sleep(params.hw_settle_delay());

        let pose = Arc::new(SharedPose::new(odom.pose()));
        let stats = Arc::new(CycleStats::default());
        let (worker_sender, receiver) = channel();

        let worker = Worker {
            odom,
            sensors,
            period: params.cycle_period(),
            debug: params.debug,
            pose: pose.clone(),
            stats: stats.clone(),
            receiver,
        };

        let worker_jh = thread::Builder::new()
            .name("odom".into())
            .spawn(move || worker.run())
            .map_err(OdomError::SpawnError)?;

        info!("Odometry tracking started");

        Ok(Self {
            pose,
            stats,
            worker_sender,
            worker_jh: Some(worker_jh),
        })
    }

    /// A consistent snapshot of the current pose.
    pub fn pose(&self) -> Result<Pose, OdomError> {
        self.pose.snapshot()
    }

    /// The shared pose, for readers living on other threads.
    pub fn shared_pose(&self) -> Arc<SharedPose> {
        self.pose.clone()
    }

    /// Heading error to `target`, see [`Pose::angle_error`].
    pub fn angle_error(&self, target: &Point2<f64>) -> Result<f64, OdomError> {
        Ok(self.pose()?.angle_error(target))
    }

    /// Distance to `target`, see [`Pose::distance_error`].
    pub fn distance_error(&self, target: &Point2<f64>) -> Result<f64, OdomError> {
        Ok(self.pose()?.distance_error(target))
    }

    /// Re-seed the pose. Takes effect at the start of the next cycle.
    pub fn reset_pose(&self, pose: Pose) -> Result<(), OdomError> {
        self.worker_sender
            .send(TrackerSignal::ResetPose(pose))
            .map_err(|_| OdomError::WorkerStopped)
    }

    /// Number of cycles completed so far.
    pub fn num_cycles(&self) -> u64 {
        self.stats.num_cycles.load(Ordering::Relaxed)
    }

    /// Number of cycles which took longer than the cycle period.
    pub fn num_overruns(&self) -> u64 {
        self.stats.num_overruns.load(Ordering::Relaxed)
    }

    /// Stop the worker and wait for it to exit, returning any error it hit.
    pub fn stop(mut self) -> Result<(), OdomError> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<(), OdomError> {
        let jh = match self.worker_jh.take() {
            Some(jh) => jh,
            None => return Ok(()),
        };

        // The worker may already have exited on an error, in which case the
        // send fails and the join reports why
        self.worker_sender.send(TrackerSignal::Stop).ok();

        let result = jh.join().map_err(|_| OdomError::WorkerPanicked)?;

        info!(
            "Odometry tracking stopped after {} cycles ({} overruns)",
            self.num_cycles(),
            self.num_overruns()
        );

        result
    }
}

impl Drop for OdomTracker {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            warn!("Odometry worker exited with an error: {}", e);
        }
    }
}

impl Worker {
    fn run(mut self) -> Result<(), OdomError> {
        loop {
            let cycle_start = Instant::now();

            // Handle pending signals
            loop {
                match self.receiver.try_recv() {
                    Ok(TrackerSignal::Stop) | Err(TryRecvError::Disconnected) => return Ok(()),
                    Ok(TrackerSignal::ResetPose(pose)) => {
                        info!("Odometry pose reset to {:?}", pose);
                        self.odom.reset_pose(pose);
                    }
                    Err(TryRecvError::Empty) => break,
                }
            }

            let snapshot = self.sensors.read();
            let (pose, _report) = self.odom.proc(&snapshot)?;
            self.pose.apply(pose)?;

            self.stats.num_cycles.fetch_add(1, Ordering::Relaxed);

            if self.debug {
                info!(target: POSE_TRACE_TARGET, "{}", trace_line(&pose));
            }

            let elapsed = cycle_start.elapsed();
            match self.period.checked_sub(elapsed) {
                Some(remaining) => thread::sleep(remaining),
                None => {
                    self.stats.num_overruns.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        "Odometry cycle overran: {:.3} ms (period {:.3} ms)",
                        std_duration_to_millis(elapsed),
                        std_duration_to_millis(self.period)
                    );
                }
            }

            trace!("Odometry cycle took {:?}", elapsed);
        }
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// The per-cycle debug line, `x, y, heading_deg` with a trailing space.
fn trace_line(pose: &Pose) -> String {
    format!("{:.2}, {:.2}, {:.2} ", pose.x, pose.y, pose.heading_deg)
}
