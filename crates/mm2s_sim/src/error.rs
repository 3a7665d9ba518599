//! Error types for the clock engine and trace sinks.
//!
//! Every failure the engine can raise is a variant of [`SimError`]. None of
//! them are retried: a time-budget breach or a trace I/O failure ends the run.

use std::io;

use crate::time::SimTime;

/// Errors raised while advancing the clock or writing the trace.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// The clock advanced past the configured time budget.
    #[error("time limit exceeded at {time} (budget {budget})")]
    TimeLimitExceeded {
        /// The time at which the breach was detected.
        time: SimTime,
        /// The configured budget in sub-steps.
        budget: u64,
    },

    /// An I/O error occurred while writing waveform data.
    #[error("waveform I/O error: {0}")]
    WaveformIo(#[from] io::Error),

    /// A value change referenced a signal that was never registered with the recorder.
    #[error("unregistered trace signal {index}")]
    UnknownTraceSignal {
        /// The recorder-side index of the signal.
        index: u32,
    },
}
