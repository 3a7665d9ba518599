//! Bus-functional verification of the mm2s write channel and stream output.
//!
//! The [`driver`] issues AXI write bursts with optional consumer stalls, the
//! [`monitor`] counts accepted stream beats and packet terminators at each
//! rising edge, and [`scenario`] strings them together into the protocol and
//! traffic suites with checkpointed totals.
//!
//! # Usage
//!
//! ```ignore
//! use mm2s_bfm::{protocol_suite, run_suite};
//! use mm2s_config::HarnessConfig;
//! use mm2s_model::Mm2sBridge;
//!
//! let config = HarnessConfig::default();
//! let report = run_suite(&protocol_suite(), Mm2sBridge::new(config.device.reset), &config)?;
//! ```

#![warn(missing_docs)]

pub mod driver;
pub mod error;
pub mod monitor;
pub mod scenario;

pub use driver::{
    AcceptedBeat, BurstOutcome, BurstTransaction, StallSchedule, ValueCursor, WriteChannelDriver,
    CONTROL_ACK_ADDR, CONTROL_ACK_DATA, CONTROL_ACK_ID, MAX_BURST_BEATS,
};
pub use error::{BfmError, ProtocolViolation};
pub use monitor::{drain, StreamCounters, StreamMonitor};
pub use scenario::{
    protocol_suite, run_suite, traffic_suite, CheckpointReport, ScenarioOrchestrator, Step, Suite,
    SuiteKind, SuiteReport,
};
