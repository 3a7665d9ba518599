//! The clock engine: sub-stepped time, edge callbacks, tracing and the time budget.
//!
//! [`ClockEngine`] owns the device, the signal set, one [`EdgeHook`] and an
//! optional trace sink. Each [`tick`](ClockEngine::tick) walks one clock
//! period in [`STEPS_PER_CYCLE`] sub-steps. The device is re-evaluated and
//! the trace sampled after every sub-step. The clock falls (and
//! [`EdgeHook::on_negedge`] runs) when time reaches a
//! [`ClockPhase::Falling`] point, and rises (and [`EdgeHook::on_posedge`]
//! runs) on a [`ClockPhase::Rising`] point.
//!
//! The positive-edge hook runs before the device sees the rising clock, so it
//! observes the values that the device commits on that edge.

use log::{debug, warn};

use crate::device::Device;
use crate::error::SimError;
use crate::signals::{DeviceInputs, DeviceOutputs, DeviceSignals, TRACE_SIGNALS, TRACE_SIGNAL_COUNT};
use crate::time::{ClockPhase, SimTime, STEPS_PER_CYCLE};
use crate::waveform::{TraceId, WaveformRecorder};

/// Callbacks fired on clock edges.
///
/// Both callbacks receive the time of the edge and a read-only view of the
/// signals. Commit-style sampling belongs in `on_posedge`.
pub trait EdgeHook {
    /// Called when the clock falls.
    fn on_negedge(&mut self, _now: SimTime, _signals: &DeviceSignals) {}

    /// Called when the clock rises, before the device evaluates the edge.
    fn on_posedge(&mut self, _now: SimTime, _signals: &DeviceSignals) {}
}

impl EdgeHook for () {}

/// Advances a device through simulated clock periods.
///
/// Construct with [`ClockEngine::new`], optionally attach a trace sink with
/// [`attach_recorder`](ClockEngine::attach_recorder), then drive inputs
/// through [`input_mut`](ClockEngine::input_mut) and call
/// [`tick`](ClockEngine::tick). Teardown (device finalization and trace
/// close) happens in [`finish`](ClockEngine::finish) or, failing that, on drop.
pub struct ClockEngine<D: Device, H: EdgeHook = ()> {
    name: String,
    device: D,
    hook: H,
    signals: DeviceSignals,
    now: SimTime,
    cycles: u64,
    time_budget: u64,
    recorder: Option<Box<dyn WaveformRecorder>>,
    last_snapshot: Option<[u64; TRACE_SIGNAL_COUNT]>,
    torn_down: bool,
}

impl<D: Device, H: EdgeHook> ClockEngine<D, H> {
    /// Creates an engine with reset asserted and all other inputs low.
    ///
    /// `time_budget` is the last sub-step a tick may end on without failing.
    pub fn new(name: impl Into<String>, device: D, hook: H, time_budget: u64) -> Self {
        let mut engine = Self {
            name: name.into(),
            device,
            hook,
            signals: DeviceSignals::in_reset(),
            now: SimTime::zero(),
            cycles: 0,
            time_budget,
            recorder: None,
            last_snapshot: None,
            torn_down: false,
        };
        engine.eval();
        engine
    }

    /// Attaches a trace sink, registers every signal and records the current values.
    ///
    /// Replaces any previously attached sink without finalizing it.
    pub fn attach_recorder(
        &mut self,
        mut recorder: Box<dyn WaveformRecorder>,
    ) -> Result<(), SimError> {
        recorder.begin_scope(&self.name)?;
        for (index, info) in TRACE_SIGNALS.iter().enumerate() {
            recorder.register_signal(TraceId::from_raw(index as u32), info.name, info.width)?;
        }
        recorder.end_scope()?;
        self.recorder = Some(recorder);
        self.last_snapshot = None;
        self.dump()
    }

    /// The trace identifier this engine was created with.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current simulated time.
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Number of completed ticks.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// The configured time budget in sub-steps.
    pub fn time_budget(&self) -> u64 {
        self.time_budget
    }

    /// The full signal set.
    pub fn signals(&self) -> &DeviceSignals {
        &self.signals
    }

    /// Harness-driven inputs.
    pub fn input(&self) -> &DeviceInputs {
        &self.signals.input
    }

    /// Mutable access to the harness-driven inputs.
    ///
    /// Changes take effect at the next [`eval`](Self::eval) or tick.
    pub fn input_mut(&mut self) -> &mut DeviceInputs {
        &mut self.signals.input
    }

    /// Device-driven outputs as of the last evaluation.
    pub fn output(&self) -> &DeviceOutputs {
        &self.signals.output
    }

    /// The device model.
    pub fn device(&self) -> &D {
        &self.device
    }

    /// Mutable access to the device model.
    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// The edge hook.
    pub fn hook(&self) -> &H {
        &self.hook
    }

    /// Mutable access to the edge hook.
    pub fn hook_mut(&mut self) -> &mut H {
        &mut self.hook
    }

    /// Recomputes device outputs from the current inputs without advancing time.
    pub fn eval(&mut self) {
        self.device
            .eval(&self.signals.input, &mut self.signals.output);
    }

    /// Advances one full clock period.
    ///
    /// Fails with [`SimError::TimeLimitExceeded`] once the time passes the
    /// budget; the trace is flushed before the error is returned.
    pub fn tick(&mut self) -> Result<(), SimError> {
        for _ in 0..STEPS_PER_CYCLE {
            self.eval();
            self.dump()?;

            self.now = self.now.next_step();
            match self.now.phase() {
                ClockPhase::Falling => {
                    self.signals.input.clk = false;
                    self.hook.on_negedge(self.now, &self.signals);
                }
                ClockPhase::Rising => {
                    self.signals.input.clk = true;
                    self.hook.on_posedge(self.now, &self.signals);
                }
                _ => {}
            }
            self.eval();
            self.dump()?;
        }
        self.cycles += 1;

        if let Some(recorder) = self.recorder.as_mut() {
            recorder.flush()?;
        }

        if self.now.steps > self.time_budget {
            return Err(SimError::TimeLimitExceeded {
                time: self.now,
                budget: self.time_budget,
            });
        }
        Ok(())
    }

    /// Ticks `n` times.
    pub fn run_cycles(&mut self, n: u32) -> Result<(), SimError> {
        for _ in 0..n {
            self.tick()?;
        }
        Ok(())
    }

    /// Finalizes the device and closes the trace sink.
    pub fn finish(mut self) -> Result<(), SimError> {
        self.teardown()
    }

    /// Appends the signals that changed since the last sample to the trace.
    fn dump(&mut self) -> Result<(), SimError> {
        let Some(recorder) = self.recorder.as_mut() else {
            return Ok(());
        };
        let snapshot = self.signals.snapshot();
        for (index, value) in snapshot.iter().enumerate() {
            let changed = self
                .last_snapshot
                .map_or(true, |previous| previous[index] != *value);
            if changed {
                recorder.record_change(self.now, TraceId::from_raw(index as u32), *value)?;
            }
        }
        self.last_snapshot = Some(snapshot);
        Ok(())
    }

    fn teardown(&mut self) -> Result<(), SimError> {
        if self.torn_down {
            return Ok(());
        }
        self.torn_down = true;
        self.device.finalize();
        debug!(
            "{}: finished at {} after {} cycles",
            self.name, self.now, self.cycles
        );
        match self.recorder.take() {
            Some(mut recorder) => recorder.finalize(),
            None => Ok(()),
        }
    }
}

impl<D: Device, H: EdgeHook> Drop for ClockEngine<D, H> {
    fn drop(&mut self) {
        if let Err(e) = self.teardown() {
            warn!("{}: trace teardown failed: {e}", self.name);
        }
    }
}
