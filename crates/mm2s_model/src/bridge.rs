//! Cycle model of an AXI write slave that repackages data bursts as a stream.
//!
//! The bridge accepts incrementing write bursts on its AXI slave port and
//! forwards each data word to an AXI-Stream master port through a small
//! FIFO. Packet boundaries are not visible on the write side, so the most
//! recent data word is held back in a pending register until the bridge
//! learns whether it ends a packet:
//!
//! - the next data beat pushes it out as an ordinary beat;
//! - a write to the control page (at or above [`CONTROL_BASE`]) pushes it out
//!   with `tlast` set;
//! - a data burst whose base address is not above the previous data burst's
//!   base (the buffer wrapped) also pushes it out with `tlast` set.
//!
//! The FIFO never holds more than its depth. Any handshake that would push a
//! beat into a full FIFO (a data beat, a closing control write, or a wrapping
//! address) is held off until the consumer frees a slot.
//!
//! State changes only on a rising clock edge. Outputs are recomputed from
//! state and inputs on every evaluation, including a combinational path from
//! `m_axis_tready` to the ready outputs when the FIFO is full.

use std::collections::VecDeque;

use log::{debug, warn};

use mm2s_sim::{
    Device, DeviceInputs, DeviceOutputs, ResetConvention, AXI_BURST_INCR, AXI_SIZE_4_BYTES,
};

/// First address of the control page.
pub const CONTROL_BASE: u16 = 0x1000;
/// Default output FIFO depth, in beats.
pub const DEFAULT_FIFO_DEPTH: usize = 8;

/// One beat waiting on the stream side.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreamBeat {
    /// The data word.
    pub data: u32,
    /// Whether this beat ends a packet.
    pub last: bool,
}

/// Running totals kept by the bridge, for inspection after a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BridgeStats {
    /// Address handshakes accepted.
    pub bursts: u64,
    /// Data beats accepted on the write channel (control writes excluded).
    pub data_beats: u64,
    /// Control-page writes accepted.
    pub control_writes: u64,
    /// Beats handed to the stream consumer.
    pub stream_beats: u64,
    /// Packets closed with `tlast`.
    pub packets: u64,
    /// Handshakes that broke the write-channel conventions.
    pub protocol_errors: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum WriteState {
    Idle,
    Data {
        id: u8,
        remaining: u16,
        control: bool,
    },
    Response {
        id: u8,
    },
}

/// The reference bridge model.
#[derive(Debug)]
pub struct Mm2sBridge {
    convention: ResetConvention,
    fifo_depth: usize,
    state: WriteState,
    fifo: VecDeque<StreamBeat>,
    pending: Option<u32>,
    last_data_base: Option<u16>,
    prev_clk: bool,
    stats: BridgeStats,
    finalized: bool,
}

impl Default for Mm2sBridge {
    fn default() -> Self {
        Self::new(ResetConvention::OneShot)
    }
}

impl Mm2sBridge {
    /// Creates a bridge with the default FIFO depth.
    pub fn new(convention: ResetConvention) -> Self {
        Self::with_fifo_depth(convention, DEFAULT_FIFO_DEPTH)
    }

    /// Creates a bridge with a custom FIFO depth (at least 1).
    pub fn with_fifo_depth(convention: ResetConvention, fifo_depth: usize) -> Self {
        Self {
            convention,
            fifo_depth: fifo_depth.max(1),
            state: WriteState::Idle,
            fifo: VecDeque::with_capacity(fifo_depth),
            pending: None,
            last_data_base: None,
            prev_clk: false,
            stats: BridgeStats::default(),
            finalized: false,
        }
    }

    /// Running totals.
    pub fn stats(&self) -> BridgeStats {
        self.stats
    }

    /// The data word held back awaiting a packet decision, if any.
    pub fn pending(&self) -> Option<u32> {
        self.pending
    }

    /// Beats queued for the stream consumer.
    pub fn fifo_len(&self) -> usize {
        self.fifo.len()
    }

    /// Configured FIFO depth.
    pub fn fifo_depth(&self) -> usize {
        self.fifo_depth
    }

    /// Whether [`Device::finalize`] has run.
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    fn clear(&mut self) {
        self.state = WriteState::Idle;
        self.fifo.clear();
        self.pending = None;
        self.last_data_base = None;
    }

    /// Whether one more beat fits, counting the slot a consumer pop frees on this edge.
    fn has_room(&self, input: &DeviceInputs) -> bool {
        let draining = input.m_axis_tready && !self.fifo.is_empty();
        self.fifo.len() < self.fifo_depth || draining
    }

    /// Whether a data burst at `addr` would close the pending packet.
    fn wraps(&self, addr: u16) -> bool {
        addr < CONTROL_BASE && self.last_data_base.is_some_and(|base| addr <= base)
    }

    fn aw_ready(&self, input: &DeviceInputs) -> bool {
        if self.state != WriteState::Idle {
            return false;
        }
        let closes = self.pending.is_some() && self.wraps(input.s_axi_awaddr);
        !closes || self.has_room(input)
    }

    fn w_ready(&self, input: &DeviceInputs) -> bool {
        match self.state {
            WriteState::Data { control: true, .. } => {
                self.pending.is_none() || self.has_room(input)
            }
            WriteState::Data { control: false, .. } => self.has_room(input),
            _ => false,
        }
    }

    /// Pushes the pending word out as the end of a packet.
    fn close_packet(&mut self) {
        if let Some(data) = self.pending.take() {
            self.fifo.push_back(StreamBeat { data, last: true });
            self.stats.packets += 1;
        }
    }

    fn accept_address(&mut self, input: &DeviceInputs) {
        let addr = input.s_axi_awaddr;
        if input.s_axi_awsize != AXI_SIZE_4_BYTES || input.s_axi_awburst != AXI_BURST_INCR {
            warn!(
                "unsupported burst at 0x{addr:04x}: size {} burst {}",
                input.s_axi_awsize, input.s_axi_awburst
            );
            self.stats.protocol_errors += 1;
        }
        let control = addr >= CONTROL_BASE;
        if !control {
            if self.wraps(addr) {
                debug!("address wrapped to 0x{addr:04x}, closing packet");
                self.close_packet();
            }
            self.last_data_base = Some(addr);
        }
        self.stats.bursts += 1;
        self.state = WriteState::Data {
            id: input.s_axi_awid,
            remaining: u16::from(input.s_axi_awlen) + 1,
            control,
        };
    }

    fn accept_data(&mut self, input: &DeviceInputs, id: u8, remaining: u16, control: bool) {
        let remaining = remaining - 1;
        let final_beat = remaining == 0;
        if input.s_axi_wlast != final_beat {
            warn!(
                "wlast={} with {remaining} beat(s) still expected",
                input.s_axi_wlast
            );
            self.stats.protocol_errors += 1;
        }

        if control {
            self.stats.control_writes += 1;
            self.close_packet();
        } else {
            self.stats.data_beats += 1;
            if let Some(previous) = self.pending.replace(input.s_axi_wdata) {
                self.fifo.push_back(StreamBeat {
                    data: previous,
                    last: false,
                });
            }
        }

        self.state = if final_beat {
            WriteState::Response { id }
        } else {
            WriteState::Data {
                id,
                remaining,
                control,
            }
        };
    }

    /// Applies one rising edge. Handshakes use the pre-edge view of the state.
    fn commit(&mut self, input: &DeviceInputs) {
        if input.reset {
            self.clear();
            return;
        }
        if !self.convention.is_running(input) {
            return;
        }

        let t_fire = input.m_axis_tready && !self.fifo.is_empty();
        let aw_fire = input.s_axi_awvalid && self.aw_ready(input);
        let w_fire = input.s_axi_wvalid && self.w_ready(input);

        if t_fire {
            self.fifo.pop_front();
            self.stats.stream_beats += 1;
        }

        match self.state {
            WriteState::Idle if aw_fire => self.accept_address(input),
            WriteState::Data {
                id,
                remaining,
                control,
            } if w_fire => self.accept_data(input, id, remaining, control),
            WriteState::Response { .. } if input.s_axi_bready => self.state = WriteState::Idle,
            _ => {}
        }
    }

    fn drive(&self, input: &DeviceInputs, output: &mut DeviceOutputs) {
        let running = self.convention.is_running(input);
        output.s_axi_awready = running && self.aw_ready(input);
        output.s_axi_wready = running && self.w_ready(input);
        match self.state {
            WriteState::Response { id } if running => {
                output.s_axi_bvalid = true;
                output.s_axi_bid = id;
            }
            _ => {
                output.s_axi_bvalid = false;
                output.s_axi_bid = 0;
            }
        }
        match self.fifo.front() {
            Some(beat) if running => {
                output.m_axis_tvalid = true;
                output.m_axis_tdata = beat.data;
                output.m_axis_tlast = beat.last;
            }
            _ => {
                output.m_axis_tvalid = false;
                output.m_axis_tdata = 0;
                output.m_axis_tlast = false;
            }
        }
    }
}

impl Device for Mm2sBridge {
    fn eval(&mut self, input: &DeviceInputs, output: &mut DeviceOutputs) {
        let rising = input.clk && !self.prev_clk;
        self.prev_clk = input.clk;
        if rising {
            self.commit(input);
        }
        self.drive(input, output);
    }

    fn finalize(&mut self) {
        self.finalized = true;
        debug!(
            "bridge finalized: {} bursts, {} data beats, {} stream beats, {} packets, {} queued",
            self.stats.bursts,
            self.stats.data_beats,
            self.stats.stream_beats,
            self.stats.packets,
            self.fifo.len()
        );
    }
}
