//! Error types for driver, monitor and scenario failures.

use mm2s_sim::{SimError, SimTime};

/// A write-channel rule the device broke.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolViolation {
    /// The write response carried a different id than the request.
    #[error("response id {observed} does not match request id {expected}")]
    ResponseIdMismatch {
        /// Id issued on the address phase.
        expected: u8,
        /// Id returned on the response phase.
        observed: u8,
    },

    /// Fewer data beats were accepted than the burst announced.
    #[error("{accepted} of {requested} beats accepted within {bound} cycles")]
    IncompleteBurst {
        /// Beats announced on the address phase.
        requested: u32,
        /// Beats the device accepted.
        accepted: u32,
        /// Data-phase cycle bound.
        bound: u32,
    },
}

/// Errors raised while driving or checking a scenario.
///
/// Every variant is fatal: the harness stops at the first deviation.
#[derive(Debug, thiserror::Error)]
pub enum BfmError {
    /// The clock engine failed (time budget exhausted or trace I/O).
    #[error(transparent)]
    Sim(#[from] SimError),

    /// The device broke the handshake protocol.
    #[error("protocol violation at {time}: {violation}")]
    ProtocolViolation {
        /// Simulated time at which the violation was detected.
        time: SimTime,
        /// What went wrong.
        violation: ProtocolViolation,
    },

    /// Observed stream totals differ from the expected ones at a checkpoint.
    #[error(
        "{suite}: checkpoint '{checkpoint}' expected {field} = {expected}, observed {observed}"
    )]
    ScenarioAssertion {
        /// Suite being run.
        suite: String,
        /// Checkpoint label.
        checkpoint: String,
        /// Counter that mismatched (`beats` or `terminators`).
        field: &'static str,
        /// Expected value.
        expected: u64,
        /// Observed value.
        observed: u64,
    },

    /// A burst length outside what the address phase can encode.
    #[error("invalid burst of {beats} beats (must be 1..=256)")]
    InvalidBurst {
        /// Requested beat count.
        beats: u32,
    },
}

impl BfmError {
    /// Whether this error is the clock engine's time budget running out.
    pub fn is_timeout(&self) -> bool {
        matches!(self, BfmError::Sim(SimError::TimeLimitExceeded { .. }))
    }
}
