//! # Localisation module
//!
//! Dead-reckoning odometry. Every cycle the raw encoder (and optional
//! gyroscope) readings are turned into per-cycle travel, the travel into a
//! displacement in the robot frame using an arc (chord) correction, and the
//! displacement is rotated into the global frame using the heading at the
//! middle of the cycle before being accumulated into the pose.
//!
//! Frame convention: heading 0 faces global +Y and heading increases
//! clockwise, towards global +X. Heading is accumulated without wrapping.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod arc;
pub mod estimator;
mod params;
pub mod pose;
mod state;
mod tracker;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::sync::PoisonError;

use util::params::LoadError;

pub use arc::LocalDisplacement;
pub use estimator::{Deltas, PriorSample};
pub use params::OdomParams;
pub use pose::{Pose, SharedPose};
pub use state::{Odometry, StatusReport};
pub use tracker::{OdomTracker, TrackerSignal};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during odometry operation.
#[derive(Debug, thiserror::Error)]
pub enum OdomError {
    #[error("Ticks per unit must be strictly positive, found {name} = {value}")]
    InvalidTicksPerUnit { name: &'static str, value: f64 },

    #[error("Track width must be strictly positive, found {0}")]
    InvalidTrackWidth(f64),

    #[error("The cycle period must be non-zero")]
    InvalidCyclePeriod,

    #[error("Couldn't load parameters: {0}")]
    ParamLoadError(LoadError),

    #[error("Odometry has not been initialised")]
    NotInitialised,

    #[error("Sync primitive is poisoned")]
    PoisonError,

    #[error("Couldn't spawn the odometry worker thread: {0}")]
    SpawnError(std::io::Error),

    #[error("The odometry worker is not running")]
    WorkerStopped,

    #[error("Odometry worker thread panicked")]
    WorkerPanicked,
}

impl From<LoadError> for OdomError {
    fn from(e: LoadError) -> Self {
        Self::ParamLoadError(e)
    }
}

impl<G> From<PoisonError<G>> for OdomError {
    fn from(_: PoisonError<G>) -> Self {
        Self::PoisonError
    }
}
