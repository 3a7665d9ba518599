//! Reference model of the memory-mapped to stream bridge.
//!
//! [`Mm2sBridge`] implements [`mm2s_sim::Device`], so the harness can run its
//! scenarios against it exactly as it would against a generated model of
//! the hardware.

#![warn(missing_docs)]

pub mod bridge;

pub use bridge::{BridgeStats, Mm2sBridge, StreamBeat, CONTROL_BASE, DEFAULT_FIFO_DEPTH};
