//! Cycle-stepped simulation core for the mm2s bus-functional harness.
//!
//! This crate provides the pieces every scenario run is built on: the
//! pin-level signal set at the device boundary, the [`Device`] trait the
//! device under verification implements, a [`ClockEngine`] that walks clock
//! periods in fixed sub-steps and fires edge callbacks, and value-change
//! trace recording.
//!
//! # Usage
//!
//! ```ignore
//! use mm2s_sim::{ClockEngine, open_vcd};
//!
//! let mut engine = ClockEngine::new("unit_tests", device, monitor, 10_000);
//! engine.attach_recorder(open_vcd(Path::new("out/unit_tests.vcd"), false)?)?;
//! engine.input_mut().reset = false;
//! engine.tick()?;
//! engine.finish()?;
//! ```
//!
//! # Modules
//!
//! - `error`: Simulation error types
//! - `time`: Sub-step time and clock phase
//! - `signals`: Device boundary signals and reset conventions
//! - `device`: The device trait
//! - `waveform`: Trace sinks (VCD, gzip VCD, null)
//! - `clock`: The clock engine

#![warn(missing_docs)]

pub mod clock;
pub mod device;
pub mod error;
pub mod signals;
pub mod time;
pub mod waveform;

pub use clock::{ClockEngine, EdgeHook};
pub use device::Device;
pub use error::SimError;
pub use signals::{
    DeviceInputs, DeviceOutputs, DeviceSignals, ResetConvention, SignalInfo, AXI_BURST_INCR,
    AXI_SIZE_4_BYTES, BEAT_BYTES, TRACE_SIGNALS,
};
pub use time::{ClockPhase, SimTime, STEPS_PER_CYCLE};
pub use waveform::{open_vcd, NullRecorder, TraceId, TraceOutput, VcdRecorder, WaveformRecorder};
