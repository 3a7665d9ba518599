//! End-to-end scenario runs against the reference bridge.

use std::io::Read;

use flate2::read::GzDecoder;
use proptest::prelude::*;

use mm2s_bfm::{
    drain, protocol_suite, run_suite, traffic_suite, BfmError, BurstTransaction,
    ProtocolViolation, ScenarioOrchestrator, StallSchedule, Step, StreamCounters, Suite,
    SuiteKind, SuiteReport, ValueCursor, WriteChannelDriver,
};
use mm2s_config::HarnessConfig;
use mm2s_model::Mm2sBridge;
use mm2s_sim::{Device, DeviceInputs, DeviceOutputs, ResetConvention};

fn untraced(reset: ResetConvention) -> HarnessConfig {
    let mut config = HarnessConfig::default();
    config.trace.enabled = false;
    config.device.reset = reset;
    config
}

fn run(suite: &Suite, reset: ResetConvention) -> Result<SuiteReport, BfmError> {
    run_suite(suite, Mm2sBridge::new(reset), &untraced(reset))
}

fn totals(report: &SuiteReport) -> Vec<(String, StreamCounters)> {
    report
        .checkpoints
        .iter()
        .map(|c| (c.name.clone(), c.counters))
        .collect()
}

fn counters(beats: u64, terminators: u64) -> StreamCounters {
    StreamCounters { beats, terminators }
}

#[test]
fn protocol_suite_passes() {
    let report = run(&protocol_suite(), ResetConvention::OneShot).unwrap();
    assert_eq!(report.suite, "protocol");
    assert_eq!(report.trace_name, "unit_tests");
    assert_eq!(
        totals(&report),
        [
            ("A".to_string(), counters(3, 0)),
            ("B".to_string(), counters(35, 1)),
            ("C".to_string(), counters(36, 2)),
            ("E".to_string(), counters(32, 1)),
        ]
    );
    assert_eq!(report.bursts, 8);
    assert!(report.final_time.steps <= 10_000);
}

#[test]
fn traffic_suite_passes() {
    let report = run(&traffic_suite(), ResetConvention::OneShot).unwrap();
    assert_eq!(report.trace_name, "gem");
    assert_eq!(totals(&report), [("D".to_string(), counters(25, 1))]);
    assert_eq!(report.bursts, 10);
}

#[test]
fn reset_conventions_agree() {
    for suite in [protocol_suite(), traffic_suite()] {
        let one_shot = run(&suite, ResetConvention::OneShot).unwrap();
        let gated = run(&suite, ResetConvention::ReleaseThenRun).unwrap();
        assert_eq!(gated.reset, ResetConvention::ReleaseThenRun);
        assert_eq!(totals(&one_shot), totals(&gated));
        assert_eq!(one_shot.cycles, gated.cycles);
    }
}

#[test]
fn replay_is_deterministic() {
    let first = run(&protocol_suite(), ResetConvention::OneShot).unwrap();
    let second = run(&protocol_suite(), ResetConvention::OneShot).unwrap();
    assert_eq!(first, second);
}

#[test]
fn counters_reset_then_replay_matches() {
    let mut orchestrator = ScenarioOrchestrator::new(
        "replay",
        "replay",
        Mm2sBridge::default(),
        ResetConvention::OneShot,
        100_000,
    );
    orchestrator.reset().unwrap();
    let script = [
        Step::ResetCounters,
        Step::write(0x0000, 8),
        Step::ControlAck,
        Step::Drain(16),
    ];
    orchestrator.run_steps(&script).unwrap();
    let first = orchestrator.counters();
    orchestrator.run_steps(&script).unwrap();
    assert_eq!(orchestrator.counters(), first);
    assert_eq!(first, counters(8, 1));
}

#[test]
fn wrong_expectation_reports_checkpoint() {
    let suite = Suite {
        kind: SuiteKind::Protocol,
        steps: vec![Step::write(0x0000, 4), Step::Drain(8), Step::expect("A", 4, 0)],
    };
    let err = run(&suite, ResetConvention::OneShot).unwrap_err();
    match err {
        BfmError::ScenarioAssertion {
            checkpoint,
            field,
            expected,
            observed,
            ..
        } => {
            assert_eq!(checkpoint, "A");
            assert_eq!(field, "beats");
            assert_eq!(expected, 4);
            assert_eq!(observed, 3);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn report_serializes_to_json() {
    let report = run(&traffic_suite(), ResetConvention::ReleaseThenRun).unwrap();
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["suite"], "traffic");
    assert_eq!(json["reset"], "release-then-run");
    assert_eq!(json["checkpoints"][0]["name"], "D");
    assert_eq!(json["checkpoints"][0]["beats"], 25);
    assert_eq!(json["checkpoints"][0]["terminators"], 1);
}

#[test]
fn trace_file_is_written() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = HarnessConfig::default();
    config.trace.dir = dir.path().join("waves");
    run_suite(&traffic_suite(), Mm2sBridge::default(), &config).unwrap();

    let text = std::fs::read_to_string(dir.path().join("waves/gem.vcd")).unwrap();
    assert!(text.contains("$scope module gem $end"));
    assert!(text.contains("s_axi_awready"));
    assert!(text.contains("$enddefinitions $end"));
}

#[test]
fn compressed_trace_decodes() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = HarnessConfig::default();
    config.trace.dir = dir.path().to_path_buf();
    config.trace.compress = true;
    run_suite(&protocol_suite(), Mm2sBridge::default(), &config).unwrap();

    let file = std::fs::File::open(dir.path().join("unit_tests.vcd.gz")).unwrap();
    let mut text = String::new();
    GzDecoder::new(file).read_to_string(&mut text).unwrap();
    assert!(text.contains("$scope module unit_tests $end"));
    assert!(text.contains("m_axis_tlast"));
}

/// A bridge with one deliberately broken output.
struct Faulty {
    inner: Mm2sBridge,
    fault: Fault,
}

#[derive(Clone, Copy)]
enum Fault {
    WrongResponseId,
    NeverAddressReady,
    NeverWriteReady,
}

impl Faulty {
    fn new(fault: Fault) -> Self {
        Self {
            inner: Mm2sBridge::default(),
            fault,
        }
    }
}

impl Device for Faulty {
    fn eval(&mut self, input: &DeviceInputs, output: &mut DeviceOutputs) {
        self.inner.eval(input, output);
        match self.fault {
            Fault::WrongResponseId => output.s_axi_bid = output.s_axi_bid.wrapping_add(1),
            Fault::NeverAddressReady => output.s_axi_awready = false,
            Fault::NeverWriteReady => output.s_axi_wready = false,
        }
    }
}

fn single_write() -> Suite {
    Suite {
        kind: SuiteKind::Traffic,
        steps: vec![Step::write(0x0000, 4)],
    }
}

#[test]
fn response_id_mismatch_is_fatal() {
    let err = run_suite(
        &single_write(),
        Faulty::new(Fault::WrongResponseId),
        &untraced(ResetConvention::OneShot),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        BfmError::ProtocolViolation {
            violation: ProtocolViolation::ResponseIdMismatch {
                expected: 0,
                observed: 1
            },
            ..
        }
    ));
}

#[test]
fn stuck_address_phase_hits_time_budget() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = HarnessConfig::default();
    config.trace.dir = dir.path().to_path_buf();
    config.suites.traffic.time_budget = 500;
    let err = run_suite(&single_write(), Faulty::new(Fault::NeverAddressReady), &config)
        .unwrap_err();
    assert!(err.is_timeout());

    // The trace up to the failure is closed and readable.
    let text = std::fs::read_to_string(dir.path().join("gem.vcd")).unwrap();
    assert!(text.contains("#500"));
}

#[test]
fn refused_data_is_an_incomplete_burst() {
    let err = run_suite(
        &single_write(),
        Faulty::new(Fault::NeverWriteReady),
        &untraced(ResetConvention::OneShot),
    )
    .unwrap_err();
    match err {
        BfmError::ProtocolViolation {
            violation:
                ProtocolViolation::IncompleteBurst {
                    requested,
                    accepted,
                    bound,
                },
            ..
        } => {
            assert_eq!((requested, accepted, bound), (4, 0, 100));
        }
        other => panic!("unexpected error: {other}"),
    }
}

fn ready_orchestrator() -> ScenarioOrchestrator<Mm2sBridge> {
    let mut orchestrator = ScenarioOrchestrator::new(
        "property",
        "property",
        Mm2sBridge::default(),
        ResetConvention::OneShot,
        100_000,
    );
    orchestrator.reset().unwrap();
    orchestrator
}

proptest! {
    #[test]
    fn burst_presents_exactly_its_beats(
        beats in 1u32..=48,
        base in any::<u16>(),
        id in any::<u8>(),
    ) {
        let mut orchestrator = ready_orchestrator();
        let outcome = WriteChannelDriver::default()
            .write_burst(
                orchestrator.engine_mut(),
                &BurstTransaction::new(id, base, beats),
                &mut ValueCursor::default(),
                StallSchedule::none(),
                false,
            )
            .unwrap();
        prop_assert_eq!(outcome.beats.len() as u32, beats);
        for (index, beat) in outcome.beats.iter().enumerate() {
            prop_assert_eq!(beat.last, index as u32 + 1 == beats);
        }
        prop_assert_eq!(outcome.response_id, id);
    }

    #[test]
    fn stalled_burst_is_fully_delivered(
        beats in 1u32..=48,
        start in 0u32..8,
        duration in 0u32..=40,
        base in 0u16..0x1000,
    ) {
        let mut orchestrator = ready_orchestrator();
        let outcome = WriteChannelDriver::default()
            .write_burst(
                orchestrator.engine_mut(),
                &BurstTransaction::new(0, base, beats),
                &mut ValueCursor::default(),
                StallSchedule::at(start, duration),
                true,
            )
            .unwrap();
        prop_assert_eq!(outcome.beats.len() as u32, beats);

        // A stall that outlasts the burst can leave the FIFO full, and the
        // packet only closes once there is room for its last beat.
        drain(orchestrator.engine_mut(), 64).unwrap();
        orchestrator.step(&Step::ControlAck).unwrap();
        drain(orchestrator.engine_mut(), 64).unwrap();
        prop_assert_eq!(orchestrator.counters(), counters(u64::from(beats), 1));
    }
}
