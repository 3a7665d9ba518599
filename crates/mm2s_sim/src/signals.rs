//! The pin-level signal set shared between the harness and the device.
//!
//! [`DeviceSignals`] mirrors one AXI write channel (address, data, response)
//! on the slave side and one AXI-Stream channel on the master side, plus
//! clock, reset and an optional run-enable line. The harness owns
//! [`DeviceInputs`]; the device writes [`DeviceOutputs`] during evaluation.

use serde::{Deserialize, Serialize};

/// `AxSIZE` encoding for 4-byte beats.
pub const AXI_SIZE_4_BYTES: u8 = 0b010;
/// `AxBURST` encoding for incrementing bursts.
pub const AXI_BURST_INCR: u8 = 0b01;
/// Bytes carried by one data beat.
pub const BEAT_BYTES: u16 = 4;

/// How a device leaves reset.
///
/// Some device variants start operating as soon as reset is released; others
/// additionally wait for an explicit run-enable one cycle later.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResetConvention {
    /// Releasing reset is sufficient.
    #[default]
    OneShot,
    /// Reset is released, then `run_enable` is asserted one cycle later.
    ReleaseThenRun,
}

impl ResetConvention {
    /// Whether the device is allowed to operate given the current inputs.
    pub fn is_running(self, input: &DeviceInputs) -> bool {
        match self {
            ResetConvention::OneShot => !input.reset,
            ResetConvention::ReleaseThenRun => !input.reset && input.run_enable,
        }
    }
}

/// Signals driven by the harness into the device.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeviceInputs {
    /// Clock.
    pub clk: bool,
    /// Synchronous active-high reset.
    pub reset: bool,
    /// Run enable for devices using [`ResetConvention::ReleaseThenRun`].
    pub run_enable: bool,

    /// Write address ID.
    pub s_axi_awid: u8,
    /// Write address (16-bit address space).
    pub s_axi_awaddr: u16,
    /// Burst length minus one.
    pub s_axi_awlen: u8,
    /// Beat size encoding.
    pub s_axi_awsize: u8,
    /// Burst type encoding.
    pub s_axi_awburst: u8,
    /// Write address valid.
    pub s_axi_awvalid: bool,

    /// Write data.
    pub s_axi_wdata: u32,
    /// Final beat of the burst.
    pub s_axi_wlast: bool,
    /// Write data valid.
    pub s_axi_wvalid: bool,

    /// Write response ready.
    pub s_axi_bready: bool,

    /// Stream consumer ready.
    pub m_axis_tready: bool,
}

/// Signals driven by the device back to the harness.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeviceOutputs {
    /// Write address ready.
    pub s_axi_awready: bool,
    /// Write data ready.
    pub s_axi_wready: bool,
    /// Write response ID.
    pub s_axi_bid: u8,
    /// Write response valid.
    pub s_axi_bvalid: bool,

    /// Stream data.
    pub m_axis_tdata: u32,
    /// Final beat of a packet.
    pub m_axis_tlast: bool,
    /// Stream data valid.
    pub m_axis_tvalid: bool,
}

/// The complete signal set at the device boundary.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeviceSignals {
    /// Harness-driven inputs.
    pub input: DeviceInputs,
    /// Device-driven outputs.
    pub output: DeviceOutputs,
}

/// Name and bit width of one traced signal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SignalInfo {
    /// Pin name as it appears in the trace.
    pub name: &'static str,
    /// Width in bits.
    pub width: u32,
}

const fn sig(name: &'static str, width: u32) -> SignalInfo {
    SignalInfo { name, width }
}

/// Number of signals in [`TRACE_SIGNALS`].
pub const TRACE_SIGNAL_COUNT: usize = 21;

/// Every signal recorded in the value-change trace, in snapshot order.
pub const TRACE_SIGNALS: [SignalInfo; TRACE_SIGNAL_COUNT] = [
    sig("clk", 1),
    sig("reset", 1),
    sig("run_enable", 1),
    sig("s_axi_awid", 8),
    sig("s_axi_awaddr", 16),
    sig("s_axi_awlen", 8),
    sig("s_axi_awsize", 3),
    sig("s_axi_awburst", 2),
    sig("s_axi_awvalid", 1),
    sig("s_axi_awready", 1),
    sig("s_axi_wdata", 32),
    sig("s_axi_wlast", 1),
    sig("s_axi_wvalid", 1),
    sig("s_axi_wready", 1),
    sig("s_axi_bid", 8),
    sig("s_axi_bvalid", 1),
    sig("s_axi_bready", 1),
    sig("m_axis_tdata", 32),
    sig("m_axis_tlast", 1),
    sig("m_axis_tvalid", 1),
    sig("m_axis_tready", 1),
];

impl DeviceSignals {
    /// Creates a signal set with reset asserted and every other line low.
    pub fn in_reset() -> Self {
        let mut signals = Self::default();
        signals.input.reset = true;
        signals
    }

    /// Captures every traced signal as a raw value, in [`TRACE_SIGNALS`] order.
    pub fn snapshot(&self) -> [u64; TRACE_SIGNAL_COUNT] {
        let i = &self.input;
        let o = &self.output;
        [
            i.clk as u64,
            i.reset as u64,
            i.run_enable as u64,
            i.s_axi_awid as u64,
            i.s_axi_awaddr as u64,
            i.s_axi_awlen as u64,
            i.s_axi_awsize as u64,
            i.s_axi_awburst as u64,
            i.s_axi_awvalid as u64,
            o.s_axi_awready as u64,
            i.s_axi_wdata as u64,
            i.s_axi_wlast as u64,
            i.s_axi_wvalid as u64,
            o.s_axi_wready as u64,
            o.s_axi_bid as u64,
            o.s_axi_bvalid as u64,
            i.s_axi_bready as u64,
            o.m_axis_tdata as u64,
            o.m_axis_tlast as u64,
            o.m_axis_tvalid as u64,
            i.m_axis_tready as u64,
        ]
    }

    /// Whether a write-data beat would commit at the next rising edge.
    pub fn write_data_handshake(&self) -> bool {
        self.input.s_axi_wvalid && self.output.s_axi_wready
    }

    /// Whether a stream beat would commit at the next rising edge.
    pub fn stream_handshake(&self) -> bool {
        self.output.m_axis_tvalid && self.input.m_axis_tready
    }
}
