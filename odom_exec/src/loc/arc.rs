//! # Arc displacement model
//!
//! When the robot rotates during a cycle each sensor traces a circular arc,
//! not a straight line. The displacement of the rotation centre is the chord
//! of that arc, found by re-basing each sensor's travel onto the centre and
//! scaling by `2 * sin(angle / 2)`.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;

use super::{Deltas, OdomParams};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Displacement of the rotation centre over one cycle, in the robot frame.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize)]
pub struct LocalDisplacement {
    /// Units: units
    pub forward: f64,

    /// Units: units
    pub lateral: f64,

    /// True if the arc correction was applied, false if the robot did not
    /// rotate and travel was taken as a straight line.
    pub arc_corrected: bool,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Compute the robot frame displacement for the cycle's deltas.
pub fn local_displacement(deltas: &Deltas, params: &OdomParams) -> LocalDisplacement {
    // The arc form has a removable singularity at zero rotation, where both
    // forms agree.
    if deltas.angle != 0.0 {
        let scale = 2.0 * (deltas.angle / 2.0).sin();

        LocalDisplacement {
            forward: (deltas.right / deltas.angle + params.track_width) * scale,
            lateral: (deltas.lateral / deltas.angle + params.lateral_offset) * scale,
            arc_corrected: true,
        }
    } else {
        LocalDisplacement {
            forward: deltas.right,
            lateral: deltas.lateral,
            arc_corrected: false,
        }
    }
}
