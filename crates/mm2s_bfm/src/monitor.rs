//! Stream-side observation.

use log::debug;
use serde::Serialize;

use mm2s_sim::{ClockEngine, Device, DeviceSignals, EdgeHook, SimError, SimTime};

/// Accepted-beat and packet-terminator totals.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StreamCounters {
    /// Beats accepted by the consumer.
    pub beats: u64,
    /// Accepted beats that carried `tlast`.
    pub terminators: u64,
}

/// Counts stream beats at each rising edge.
///
/// A beat counts when `tvalid` and `tready` are both high at the edge.
/// Counters change only in [`on_posedge`](EdgeHook::on_posedge) and are
/// cleared only on request.
#[derive(Debug, Default)]
pub struct StreamMonitor {
    counters: StreamCounters,
}

impl StreamMonitor {
    /// Creates a monitor with zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current totals.
    pub fn counters(&self) -> StreamCounters {
        self.counters
    }

    /// Clears the beat counter.
    pub fn reset_beats(&mut self) {
        self.counters.beats = 0;
    }

    /// Clears the terminator counter.
    pub fn reset_terminators(&mut self) {
        self.counters.terminators = 0;
    }

    /// Clears both counters.
    pub fn reset(&mut self) {
        self.counters = StreamCounters::default();
    }
}

impl EdgeHook for StreamMonitor {
    fn on_posedge(&mut self, now: SimTime, signals: &DeviceSignals) {
        if !signals.stream_handshake() {
            return;
        }
        let last = signals.output.m_axis_tlast;
        self.counters.beats += 1;
        if last {
            self.counters.terminators += 1;
        }
        debug!(
            "{now}: beat {} tdata 0x{:08x}{}",
            self.counters.beats,
            signals.output.m_axis_tdata,
            if last { " TLAST" } else { "" }
        );
    }
}

/// Holds the consumer ready for up to `max_cycles` ticks, stopping as soon as
/// the device has nothing valid to offer.
///
/// Best effort: returns the number of ticks taken, which may be fewer than
/// `max_cycles`.
pub fn drain<D: Device, H: EdgeHook>(
    engine: &mut ClockEngine<D, H>,
    max_cycles: u32,
) -> Result<u32, SimError> {
    engine.input_mut().m_axis_tready = true;
    engine.eval();
    let mut ticks = 0;
    while ticks < max_cycles && engine.output().m_axis_tvalid {
        engine.tick()?;
        ticks += 1;
    }
    Ok(ticks)
}

#[cfg(test)]
mod tests {
    use mm2s_model::Mm2sBridge;

    use super::*;
    use crate::driver::{BurstTransaction, StallSchedule, ValueCursor, WriteChannelDriver};

    type Engine = ClockEngine<Mm2sBridge, StreamMonitor>;

    fn engine() -> Engine {
        let mut engine = ClockEngine::new(
            "drain",
            Mm2sBridge::default(),
            StreamMonitor::new(),
            100_000,
        );
        engine.input_mut().reset = true;
        engine.run_cycles(2).unwrap();
        engine.input_mut().reset = false;
        engine.tick().unwrap();
        engine
    }

    /// Writes `beats` words with the consumer held off, leaving `beats - 1` queued.
    fn queued(beats: u32) -> Engine {
        let mut engine = engine();
        WriteChannelDriver::default()
            .write_burst(
                &mut engine,
                &BurstTransaction::new(0, 0x0000, beats),
                &mut ValueCursor::default(),
                StallSchedule::at(0, u32::MAX),
                false,
            )
            .unwrap();
        assert_eq!(engine.device().fifo_len(), beats as usize - 1);
        assert_eq!(engine.hook().counters().beats, 0);
        engine
    }

    #[test]
    fn drain_of_empty_fifo_takes_no_time() {
        let mut engine = engine();
        let before = engine.now();
        assert_eq!(drain(&mut engine, 10).unwrap(), 0);
        assert_eq!(engine.now(), before);
    }

    #[test]
    fn drain_stops_when_fifo_empties() {
        let mut engine = queued(5);
        assert_eq!(drain(&mut engine, 10).unwrap(), 4);
        assert_eq!(engine.hook().counters().beats, 4);
        assert_eq!(engine.device().fifo_len(), 0);
    }

    #[test]
    fn drain_stops_at_max_cycles() {
        let mut engine = queued(9);
        assert_eq!(drain(&mut engine, 3).unwrap(), 3);
        assert_eq!(engine.hook().counters().beats, 3);
        assert_eq!(engine.device().fifo_len(), 5);
    }

    fn signals(tvalid: bool, tready: bool, tlast: bool) -> DeviceSignals {
        let mut s = DeviceSignals::default();
        s.output.m_axis_tvalid = tvalid;
        s.output.m_axis_tlast = tlast;
        s.input.m_axis_tready = tready;
        s
    }

    #[test]
    fn counts_only_joint_handshakes() {
        let mut m = StreamMonitor::new();
        let t = SimTime::from_cycles(1);
        m.on_posedge(t, &signals(true, false, false));
        m.on_posedge(t, &signals(false, true, true));
        assert_eq!(m.counters(), StreamCounters::default());
        m.on_posedge(t, &signals(true, true, false));
        m.on_posedge(t, &signals(true, true, true));
        assert_eq!(
            m.counters(),
            StreamCounters {
                beats: 2,
                terminators: 1
            }
        );
    }

    #[test]
    fn negedge_never_counts() {
        let mut m = StreamMonitor::new();
        m.on_negedge(SimTime::zero(), &signals(true, true, true));
        assert_eq!(m.counters().beats, 0);
    }

    #[test]
    fn counters_reset_independently() {
        let mut m = StreamMonitor::new();
        m.on_posedge(SimTime::zero(), &signals(true, true, true));
        m.reset_beats();
        assert_eq!(m.counters().beats, 0);
        assert_eq!(m.counters().terminators, 1);
        m.on_posedge(SimTime::zero(), &signals(true, true, false));
        m.reset_terminators();
        assert_eq!(m.counters().beats, 1);
        assert_eq!(m.counters().terminators, 0);
        m.reset();
        assert_eq!(m.counters(), StreamCounters::default());
    }
}
