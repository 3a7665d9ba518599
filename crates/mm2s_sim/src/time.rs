//! Simulation time measured in clock sub-steps.
//!
//! Every clock period is divided into [`STEPS_PER_CYCLE`] equal sub-steps.
//! The falling edge lands on sub-step [`NEGEDGE_STEP`] and the rising edge on
//! sub-step [`POSEDGE_STEP`], so within one period the negative edge always
//! precedes the positive edge. One sub-step is one unit of trace time.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of sub-steps in one clock period.
pub const STEPS_PER_CYCLE: u64 = 10;
/// Sub-step index (within a period) at which the clock falls.
pub const NEGEDGE_STEP: u64 = 4;
/// Sub-step index (within a period) at which the clock rises.
pub const POSEDGE_STEP: u64 = 9;

/// A point in simulated time, counted in sub-steps since the run began.
///
/// Ordering is plain numeric ordering; there is no delta-cycle component
/// because device evaluation happens immediately at each sub-step.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct SimTime {
    /// Sub-steps elapsed since time zero.
    pub steps: u64,
}

/// Where inside a clock period a time point falls.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClockPhase {
    /// Between the rising edge and the falling edge (clock high).
    High,
    /// Exactly on the falling edge.
    Falling,
    /// Between the falling edge and the rising edge (clock low).
    Low,
    /// Exactly on the rising edge.
    Rising,
}

impl SimTime {
    /// Time zero.
    pub fn zero() -> Self {
        Self { steps: 0 }
    }

    /// Creates a time from a raw sub-step count.
    pub fn from_steps(steps: u64) -> Self {
        Self { steps }
    }

    /// Creates the time at which `cycles` full clock periods have elapsed.
    pub fn from_cycles(cycles: u64) -> Self {
        Self {
            steps: cycles * STEPS_PER_CYCLE,
        }
    }

    /// Number of completed clock periods (truncated).
    pub fn cycles(&self) -> u64 {
        self.steps / STEPS_PER_CYCLE
    }

    /// Sub-step index within the current period, in `0..STEPS_PER_CYCLE`.
    pub fn substep(&self) -> u64 {
        self.steps % STEPS_PER_CYCLE
    }

    /// Returns the phase of the clock at this time point.
    ///
    /// A time point is "on" an edge when the sub-step that just completed is
    /// the edge sub-step, i.e. `substep() == EDGE_STEP + 1` (mod period).
    /// The clock starts low, so the first period is low until its rising edge.
    pub fn phase(&self) -> ClockPhase {
        let completed = (self.steps + STEPS_PER_CYCLE - 1) % STEPS_PER_CYCLE;
        if self.steps <= NEGEDGE_STEP {
            ClockPhase::Low
        } else if completed == NEGEDGE_STEP {
            ClockPhase::Falling
        } else if completed == POSEDGE_STEP {
            ClockPhase::Rising
        } else if completed < NEGEDGE_STEP {
            ClockPhase::High
        } else {
            ClockPhase::Low
        }
    }

    /// Returns the time one sub-step later.
    pub fn next_step(&self) -> Self {
        Self {
            steps: self.steps + 1,
        }
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.steps)
    }
}
