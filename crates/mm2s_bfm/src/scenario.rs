//! Scripted scenarios and the two built-in suites.
//!
//! A [`Suite`] is a list of [`Step`]s. [`ScenarioOrchestrator`] owns one
//! clock engine with a [`StreamMonitor`] attached, runs the steps in order,
//! and checks the monitor's totals at every [`Step::Expect`] checkpoint.

use log::info;
use serde::Serialize;

use mm2s_config::{HarnessConfig, SuiteConfig, SuitesConfig};
use mm2s_sim::{
    open_vcd, ClockEngine, Device, NullRecorder, ResetConvention, SimTime, WaveformRecorder,
    BEAT_BYTES,
};

use crate::driver::{BurstTransaction, StallSchedule, ValueCursor, WriteChannelDriver};
use crate::error::BfmError;
use crate::monitor::{drain, StreamCounters, StreamMonitor};

/// Gap after each burst of the traffic suite.
const TRAFFIC_BURST_GAP: u32 = 4;
/// Traffic burst lengths: two address bursts, four payload bursts, three remainder beats.
const TRAFFIC_BURSTS: [u32; 9] = [3, 3, 4, 4, 4, 4, 1, 1, 1];

/// One action in a scenario script.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Step {
    /// A data burst at an explicit address.
    Write {
        /// Base address.
        base: u16,
        /// Beat count.
        beats: u32,
        /// Stream-consumer stall during the data phase.
        stall: StallSchedule,
        /// Hold off response-ready for the driver's response delay.
        delay_response: bool,
    },
    /// A data burst at the running address, which then advances past it.
    SequentialWrite {
        /// Beat count.
        beats: u32,
    },
    /// A completion acknowledgment to the control page.
    ControlAck,
    /// Idle clock cycles.
    Idle(u32),
    /// Drain the stream for at most this many cycles.
    Drain(u32),
    /// Clear both stream counters.
    ResetCounters,
    /// Check the stream counters.
    Expect {
        /// Checkpoint label used in reports and errors.
        checkpoint: &'static str,
        /// Expected accepted beats.
        beats: u64,
        /// Expected terminators.
        terminators: u64,
    },
}

impl Step {
    /// Shorthand for a data burst with id 0.
    pub fn write(base: u16, beats: u32) -> Self {
        Step::Write {
            base,
            beats,
            stall: StallSchedule::none(),
            delay_response: false,
        }
    }

    /// Shorthand for a stalled data burst with id 0.
    pub fn stalled_write(base: u16, beats: u32, stall: StallSchedule, delay_response: bool) -> Self {
        Step::Write {
            base,
            beats,
            stall,
            delay_response,
        }
    }

    /// Shorthand for a checkpoint.
    pub fn expect(checkpoint: &'static str, beats: u64, terminators: u64) -> Self {
        Step::Expect {
            checkpoint,
            beats,
            terminators,
        }
    }
}

/// Which built-in suite a script belongs to, for picking its settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SuiteKind {
    /// Protocol edge cases.
    Protocol,
    /// Multi-burst traffic.
    Traffic,
}

impl SuiteKind {
    /// This suite's settings in `suites`.
    pub fn settings(self, suites: &SuitesConfig) -> &SuiteConfig {
        match self {
            SuiteKind::Protocol => &suites.protocol,
            SuiteKind::Traffic => &suites.traffic,
        }
    }
}

/// A named scenario script.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Suite {
    /// Which suite this is.
    pub kind: SuiteKind,
    /// Steps, in order.
    pub steps: Vec<Step>,
}

impl Suite {
    /// The suite's name.
    pub fn name(&self) -> &'static str {
        match self.kind {
            SuiteKind::Protocol => "protocol",
            SuiteKind::Traffic => "traffic",
        }
    }
}

/// Protocol edge cases, run back to back on one device.
///
/// - A: four beats with no terminating event; three are visible.
/// - B: a wrapped 32-beat burst under a long consumer stall closes A's
///   packet; all but its own final beat come out.
/// - C: two acknowledgments close B's packet once.
/// - E: after clearing counters, a two-burst packet with stalls on both
///   bursts and slow responses.
pub fn protocol_suite() -> Suite {
    Suite {
        kind: SuiteKind::Protocol,
        steps: vec![
            Step::write(0x0000, 4),
            Step::Drain(2),
            Step::expect("A", 3, 0),
            Step::stalled_write(0x0000, 32, StallSchedule::at(2, 32), false),
            Step::Drain(8),
            Step::expect("B", 4 + 31, 1),
            Step::ControlAck,
            Step::ControlAck,
            Step::Idle(8),
            Step::Drain(1),
            Step::expect("C", 4 + 32, 2),
            Step::ResetCounters,
            Step::stalled_write(0x0000, 16, StallSchedule::at(6, 16), true),
            Step::stalled_write(0x0020, 16, StallSchedule::at(0, 16), true),
            Step::ControlAck,
            Step::ControlAck,
            Step::Drain(32),
            Step::expect("E", 32, 1),
        ],
    }
}

/// One packet built from bursts of mixed length at increasing addresses,
/// closed by a late acknowledgment.
pub fn traffic_suite() -> Suite {
    let mut steps = Vec::new();
    for beats in TRAFFIC_BURSTS {
        steps.push(Step::SequentialWrite { beats });
        steps.push(Step::Idle(TRAFFIC_BURST_GAP));
    }
    let total: u32 = TRAFFIC_BURSTS.iter().sum();
    steps.extend([
        Step::Idle(24),
        Step::ControlAck,
        Step::Idle(8),
        Step::Drain(32),
        Step::expect("D", u64::from(total), 1),
    ]);
    Suite {
        kind: SuiteKind::Traffic,
        steps,
    }
}

/// Totals observed at one checkpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CheckpointReport {
    /// Checkpoint label.
    pub name: String,
    /// Simulated time of the check.
    pub time: SimTime,
    /// Counters at the check.
    #[serde(flatten)]
    pub counters: StreamCounters,
}

/// Summary of a passing suite run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SuiteReport {
    /// Suite name.
    pub suite: String,
    /// Trace identifier.
    pub trace_name: String,
    /// Reset convention the device was run with.
    pub reset: ResetConvention,
    /// Write bursts issued, acknowledgments included.
    pub bursts: u64,
    /// Checkpoints, in order.
    pub checkpoints: Vec<CheckpointReport>,
    /// Clock cycles simulated.
    pub cycles: u64,
    /// Simulated time at the end of the run.
    pub final_time: SimTime,
}

/// Runs scripted scenarios against one device.
pub struct ScenarioOrchestrator<D: Device> {
    suite: String,
    engine: ClockEngine<D, StreamMonitor>,
    driver: WriteChannelDriver,
    convention: ResetConvention,
    cursor: ValueCursor,
    next_base: u16,
    bursts: u64,
    checkpoints: Vec<CheckpointReport>,
}

impl<D: Device> ScenarioOrchestrator<D> {
    /// Creates an orchestrator whose engine is named `trace_name`.
    pub fn new(
        suite: impl Into<String>,
        trace_name: &str,
        device: D,
        convention: ResetConvention,
        time_budget: u64,
    ) -> Self {
        Self {
            suite: suite.into(),
            engine: ClockEngine::new(trace_name, device, StreamMonitor::new(), time_budget),
            driver: WriteChannelDriver::default(),
            convention,
            cursor: ValueCursor::default(),
            next_base: 0,
            bursts: 0,
            checkpoints: Vec::new(),
        }
    }

    /// The clock engine.
    pub fn engine(&self) -> &ClockEngine<D, StreamMonitor> {
        &self.engine
    }

    /// Mutable access to the clock engine, e.g. to attach a trace sink.
    pub fn engine_mut(&mut self) -> &mut ClockEngine<D, StreamMonitor> {
        &mut self.engine
    }

    /// Current stream totals.
    pub fn counters(&self) -> StreamCounters {
        self.engine.hook().counters()
    }

    /// Puts the device through reset.
    ///
    /// Reset is held for two cycles with every harness-driven valid and ready
    /// low, then released for one cycle. Under
    /// [`ResetConvention::ReleaseThenRun`] run-enable is raised afterwards.
    pub fn reset(&mut self) -> Result<(), BfmError> {
        let input = self.engine.input_mut();
        input.reset = true;
        input.run_enable = false;
        input.s_axi_awvalid = false;
        input.s_axi_wvalid = false;
        input.s_axi_bready = false;
        self.engine.run_cycles(2)?;
        self.engine.input_mut().reset = false;
        self.engine.tick()?;
        if self.convention == ResetConvention::ReleaseThenRun {
            self.engine.input_mut().run_enable = true;
            self.engine.eval();
        }
        info!("{}: {} reset complete", self.engine.now(), self.suite);
        Ok(())
    }

    /// Executes one step.
    pub fn step(&mut self, step: &Step) -> Result<(), BfmError> {
        match *step {
            Step::Write {
                base,
                beats,
                stall,
                delay_response,
            } => {
                self.write(BurstTransaction::new(0, base, beats), stall, delay_response)?;
            }
            Step::SequentialWrite { beats } => {
                let base = self.next_base;
                self.write(
                    BurstTransaction::new(0, base, beats),
                    StallSchedule::none(),
                    false,
                )?;
                let span = (beats as u16).wrapping_mul(BEAT_BYTES);
                self.next_base = base.wrapping_add(span);
            }
            Step::ControlAck => {
                self.driver.write_control_ack(&mut self.engine)?;
                self.bursts += 1;
            }
            Step::Idle(cycles) => self.engine.run_cycles(cycles)?,
            Step::Drain(max) => {
                drain(&mut self.engine, max)?;
            }
            Step::ResetCounters => self.engine.hook_mut().reset(),
            Step::Expect {
                checkpoint,
                beats,
                terminators,
            } => self.expect(checkpoint, beats, terminators)?,
        }
        Ok(())
    }

    fn write(
        &mut self,
        txn: BurstTransaction,
        stall: StallSchedule,
        delay_response: bool,
    ) -> Result<(), BfmError> {
        self.driver.write_burst(
            &mut self.engine,
            &txn,
            &mut self.cursor,
            stall,
            delay_response,
        )?;
        self.bursts += 1;
        Ok(())
    }

    /// Checks the stream totals and records the checkpoint.
    pub fn expect(
        &mut self,
        checkpoint: &str,
        beats: u64,
        terminators: u64,
    ) -> Result<(), BfmError> {
        let observed = self.counters();
        for (field, expected, got) in [
            ("beats", beats, observed.beats),
            ("terminators", terminators, observed.terminators),
        ] {
            if expected != got {
                return Err(BfmError::ScenarioAssertion {
                    suite: self.suite.clone(),
                    checkpoint: checkpoint.to_string(),
                    field,
                    expected,
                    observed: got,
                });
            }
        }
        info!(
            "{}: checkpoint {checkpoint} passed ({} beats, {} terminators)",
            self.engine.now(),
            observed.beats,
            observed.terminators
        );
        self.checkpoints.push(CheckpointReport {
            name: checkpoint.to_string(),
            time: self.engine.now(),
            counters: observed,
        });
        Ok(())
    }

    /// Executes every step of a script.
    pub fn run_steps(&mut self, steps: &[Step]) -> Result<(), BfmError> {
        for step in steps {
            self.step(step)?;
        }
        Ok(())
    }

    /// Tears the engine down and summarizes the run.
    pub fn finish(self) -> Result<SuiteReport, BfmError> {
        let report = SuiteReport {
            suite: self.suite,
            trace_name: self.engine.name().to_string(),
            reset: self.convention,
            bursts: self.bursts,
            checkpoints: self.checkpoints,
            cycles: self.engine.cycles(),
            final_time: self.engine.now(),
        };
        self.engine.finish()?;
        Ok(report)
    }
}

/// Runs one suite on a fresh device with the settings in `config`.
///
/// Opens the suite's trace file (a null sink when tracing is disabled),
/// resets the device, executes the script and returns the report. On failure
/// the trace is closed before the error is returned.
pub fn run_suite<D: Device>(
    suite: &Suite,
    device: D,
    config: &HarnessConfig,
) -> Result<SuiteReport, BfmError> {
    let settings = suite.kind.settings(&config.suites);
    info!(
        "running {} suite (trace {}, budget {})",
        suite.name(),
        settings.trace_name,
        settings.time_budget
    );
    let mut orchestrator = ScenarioOrchestrator::new(
        suite.name(),
        &settings.trace_name,
        device,
        config.device.reset,
        settings.time_budget,
    );
    let recorder: Box<dyn WaveformRecorder> = if config.trace.enabled {
        let path = config.trace.path_for(&settings.trace_name);
        info!("tracing to {}", path.display());
        open_vcd(&path, config.trace.compress)?
    } else {
        Box::new(NullRecorder)
    };
    orchestrator.engine_mut().attach_recorder(recorder)?;
    orchestrator.reset()?;
    orchestrator.run_steps(&suite.steps)?;
    orchestrator.finish()
}
