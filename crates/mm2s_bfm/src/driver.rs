//! The write-channel driver.
//!
//! [`WriteChannelDriver`] runs complete AXI write bursts against a
//! [`ClockEngine`]: address phase, a bounded data phase with optional stalls
//! of the stream consumer, and the response phase. A transfer on any phase
//! counts only when valid and ready are both high at the same rising edge.

use log::{debug, info};

use mm2s_sim::{ClockEngine, Device, EdgeHook, AXI_BURST_INCR, AXI_SIZE_4_BYTES};

use crate::error::{BfmError, ProtocolViolation};

/// Largest burst the 8-bit length field can announce.
pub const MAX_BURST_BEATS: u32 = 256;
/// Default bound on data-phase cycles per burst.
pub const DEFAULT_MAX_DATA_CYCLES: u32 = 100;
/// Default delay before asserting response-ready on a slow-consumer burst.
pub const DEFAULT_RESPONSE_DELAY_CYCLES: u32 = 5;

/// Address of the control page written by a completion acknowledgment.
pub const CONTROL_ACK_ADDR: u16 = 0x1000;
/// Id used by completion acknowledgments.
pub const CONTROL_ACK_ID: u8 = 1;
/// Data word written by completion acknowledgments.
pub const CONTROL_ACK_DATA: u32 = 1;

/// One write burst to issue.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BurstTransaction {
    /// Address-phase id; the response must echo it.
    pub id: u8,
    /// Base address.
    pub base: u16,
    /// Number of data beats, 1..=256.
    pub beats: u32,
}

impl BurstTransaction {
    /// Creates a burst description.
    pub fn new(id: u8, base: u16, beats: u32) -> Self {
        Self { id, base, beats }
    }

    /// The AXI length field (`beats - 1`), or an error if it does not fit.
    pub fn awlen(&self) -> Result<u8, BfmError> {
        match self.beats {
            1..=MAX_BURST_BEATS => Ok((self.beats - 1) as u8),
            beats => Err(BfmError::InvalidBurst { beats }),
        }
    }
}

/// When to hold the stream consumer's ready low during a burst's data phase.
///
/// Cycles count from the first data-phase cycle of the burst the schedule is
/// passed to; nothing carries over to the next burst.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StallSchedule {
    /// Whether the stall applies at all.
    pub enabled: bool,
    /// First data-phase cycle with ready held low.
    pub start: u32,
    /// Number of cycles ready is held low.
    pub duration: u32,
}

impl StallSchedule {
    /// No stall.
    pub const fn none() -> Self {
        Self {
            enabled: false,
            start: 0,
            duration: 0,
        }
    }

    /// Stall for `duration` cycles beginning at data-phase cycle `start`.
    pub const fn at(start: u32, duration: u32) -> Self {
        Self {
            enabled: true,
            start,
            duration,
        }
    }
}

/// Per-call stall bookkeeping.
struct StallState {
    schedule: StallSchedule,
    stalled: u32,
}

impl StallState {
    fn new(schedule: StallSchedule) -> Self {
        Self {
            schedule,
            stalled: 0,
        }
    }

    /// Stream-consumer ready for data-phase cycle `cycle`.
    fn consumer_ready(&mut self, cycle: u32) -> bool {
        if !self.schedule.enabled || cycle < self.schedule.start {
            return true;
        }
        if self.stalled < self.schedule.duration {
            self.stalled += 1;
            return false;
        }
        true
    }
}

/// Source of data words: returns the current value, then increments it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValueCursor {
    next: u32,
}

impl Default for ValueCursor {
    fn default() -> Self {
        Self::new(1)
    }
}

impl ValueCursor {
    /// A cursor whose first word is `start`.
    pub fn new(start: u32) -> Self {
        Self { next: start }
    }

    /// The word the next call to [`next_value`](Self::next_value) will return.
    pub fn peek(&self) -> u32 {
        self.next
    }

    /// Returns the current word and advances.
    pub fn next_value(&mut self) -> u32 {
        let value = self.next;
        self.next = self.next.wrapping_add(1);
        value
    }
}

/// A data beat accepted by the device.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AcceptedBeat {
    /// The data word.
    pub data: u32,
    /// Whether `wlast` was high.
    pub last: bool,
}

/// What one completed write burst observed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BurstOutcome {
    /// Accepted beats, in order.
    pub beats: Vec<AcceptedBeat>,
    /// Cycles spent in the data phase.
    pub data_cycles: u32,
    /// Id returned on the response phase.
    pub response_id: u8,
}

/// Drives complete write bursts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WriteChannelDriver {
    /// Hard bound on data-phase cycles per burst.
    pub max_data_cycles: u32,
    /// Cycles to wait before asserting response-ready when a delay is requested.
    pub response_delay_cycles: u32,
}

impl Default for WriteChannelDriver {
    fn default() -> Self {
        Self {
            max_data_cycles: DEFAULT_MAX_DATA_CYCLES,
            response_delay_cycles: DEFAULT_RESPONSE_DELAY_CYCLES,
        }
    }
}

impl WriteChannelDriver {
    /// Issues one data burst and waits for its response.
    ///
    /// The stream consumer is held ready except where `stall` says otherwise.
    /// Each presented beat takes the next word from `cursor`; `wlast` is set on
    /// the final beat only. With `delay_response`, response-ready is asserted
    /// only after [`response_delay_cycles`](Self::response_delay_cycles).
    pub fn write_burst<D: Device, H: EdgeHook>(
        &self,
        engine: &mut ClockEngine<D, H>,
        txn: &BurstTransaction,
        cursor: &mut ValueCursor,
        stall: StallSchedule,
        delay_response: bool,
    ) -> Result<BurstOutcome, BfmError> {
        let awlen = txn.awlen()?;
        info!(
            "{}: data burst at 0x{:04x}, {} beats, id {}",
            engine.now(),
            txn.base,
            txn.beats,
            txn.id
        );

        engine.input_mut().m_axis_tready = true;
        address_phase(engine, txn.id, txn.base, awlen)?;

        let mut stall = StallState::new(stall);
        let mut beats = Vec::with_capacity(txn.beats as usize);
        let mut presented = 0u32;
        let mut accepted = true;
        let mut data_cycles = 0u32;
        for cycle in 0..self.max_data_cycles {
            if accepted {
                if presented == txn.beats {
                    break;
                }
                presented += 1;
                let input = engine.input_mut();
                input.s_axi_wdata = cursor.next_value();
                input.s_axi_wlast = presented == txn.beats;
                input.s_axi_wvalid = true;
            }
            // Consumer ready feeds the device's write-ready, so re-evaluate.
            engine.input_mut().m_axis_tready = stall.consumer_ready(cycle);
            engine.eval();
            accepted = engine.signals().write_data_handshake();
            if accepted {
                let input = engine.input();
                beats.push(AcceptedBeat {
                    data: input.s_axi_wdata,
                    last: input.s_axi_wlast,
                });
            }
            engine.tick()?;
            data_cycles += 1;
        }

        clear_write_data(engine);

        let accepted_count = beats.len() as u32;
        if accepted_count != txn.beats {
            return Err(BfmError::ProtocolViolation {
                time: engine.now(),
                violation: ProtocolViolation::IncompleteBurst {
                    requested: txn.beats,
                    accepted: accepted_count,
                    bound: self.max_data_cycles,
                },
            });
        }
        info!("{}: data burst wlast accepted", engine.now());

        let delay = if delay_response {
            self.response_delay_cycles
        } else {
            0
        };
        let response_id = response_phase(engine, txn.id, delay)?;
        Ok(BurstOutcome {
            beats,
            data_cycles,
            response_id,
        })
    }

    /// Writes the completion acknowledgment to the control page.
    ///
    /// A single-beat burst at [`CONTROL_ACK_ADDR`] with id [`CONTROL_ACK_ID`]
    /// and data [`CONTROL_ACK_DATA`]. The data phase waits for write-ready
    /// without a cycle bound, and the stream consumer's ready is left as is.
    pub fn write_control_ack<D: Device, H: EdgeHook>(
        &self,
        engine: &mut ClockEngine<D, H>,
    ) -> Result<BurstOutcome, BfmError> {
        info!("{}: completion ack", engine.now());
        address_phase(engine, CONTROL_ACK_ID, CONTROL_ACK_ADDR, 0)?;

        let input = engine.input_mut();
        input.s_axi_wdata = CONTROL_ACK_DATA;
        input.s_axi_wlast = true;
        input.s_axi_wvalid = true;
        engine.eval();

        let mut data_cycles = 1;
        while !engine.output().s_axi_wready {
            engine.tick()?;
            data_cycles += 1;
        }
        engine.tick()?;
        clear_write_data(engine);
        info!("{}: completion ack accepted", engine.now());

        let response_id = response_phase(engine, CONTROL_ACK_ID, 0)?;
        Ok(BurstOutcome {
            beats: vec![AcceptedBeat {
                data: CONTROL_ACK_DATA,
                last: true,
            }],
            data_cycles,
            response_id,
        })
    }
}

/// Presents the address phase and holds it until the device has taken it.
fn address_phase<D: Device, H: EdgeHook>(
    engine: &mut ClockEngine<D, H>,
    id: u8,
    addr: u16,
    awlen: u8,
) -> Result<(), BfmError> {
    let input = engine.input_mut();
    input.s_axi_awid = id;
    input.s_axi_awaddr = addr;
    input.s_axi_awlen = awlen;
    input.s_axi_awsize = AXI_SIZE_4_BYTES;
    input.s_axi_awburst = AXI_BURST_INCR;
    input.s_axi_awvalid = true;
    engine.eval();

    while !engine.output().s_axi_awready {
        engine.tick()?;
    }
    engine.tick()?;
    engine.input_mut().s_axi_awvalid = false;
    debug!("{}: address 0x{addr:04x} accepted", engine.now());
    Ok(())
}

fn clear_write_data<D: Device, H: EdgeHook>(engine: &mut ClockEngine<D, H>) {
    let input = engine.input_mut();
    input.s_axi_wvalid = false;
    input.s_axi_wdata = 0;
    input.s_axi_wlast = false;
}

/// Waits `delay` cycles, then takes the write response and checks its id.
fn response_phase<D: Device, H: EdgeHook>(
    engine: &mut ClockEngine<D, H>,
    expected: u8,
    delay: u32,
) -> Result<u8, BfmError> {
    engine.run_cycles(delay)?;
    engine.input_mut().s_axi_bready = true;
    engine.eval();
    while !engine.output().s_axi_bvalid {
        engine.tick()?;
    }

    let observed = engine.output().s_axi_bid;
    if observed != expected {
        return Err(BfmError::ProtocolViolation {
            time: engine.now(),
            violation: ProtocolViolation::ResponseIdMismatch { expected, observed },
        });
    }
    engine.tick()?;
    engine.input_mut().s_axi_bready = false;
    debug!("{}: response id {observed} accepted", engine.now());
    Ok(observed)
}
