//! Runs the built-in suites and reports the outcome.

use std::path::Path;

use log::info;
use serde::Serialize;

use mm2s_bfm::{protocol_suite, run_suite, traffic_suite, BfmError, SuiteReport};
use mm2s_config::{load_or_default, HarnessConfig};
use mm2s_model::Mm2sBridge;

use crate::{Cli, ReportFormat};

/// Everything printed by `--format json`.
#[derive(Debug, Serialize)]
struct RunReport {
    passed: bool,
    /// Suites that completed, in run order.
    suites: Vec<SuiteReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Loads the configuration, runs both suites in order and prints a summary.
///
/// Returns the process exit code. The first failing suite aborts the run
/// with its error; in JSON mode the partial report is printed first.
pub fn run(cli: &Cli) -> Result<i32, Box<dyn std::error::Error>> {
    let mut config = load_or_default(cli.config.as_deref(), Path::new("."))?;
    apply_overrides(&mut config, cli);
    info!("device reset convention: {:?}", config.device.reset);

    let print_text = cli.format == ReportFormat::Text && !cli.quiet;
    let (report, failure) = run_suites(&config, print_text);

    if cli.format == ReportFormat::Json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    if let Some(e) = failure {
        return Err(e.into());
    }
    if print_text {
        eprintln!();
        eprintln!("   Result: {} suite(s) passed", report.suites.len());
    }
    Ok(0)
}

/// Runs the built-in suites until one fails.
fn run_suites(config: &HarnessConfig, print_text: bool) -> (RunReport, Option<BfmError>) {
    let mut suites = Vec::new();
    for suite in [protocol_suite(), traffic_suite()] {
        let device = Mm2sBridge::new(config.device.reset);
        match run_suite(&suite, device, config) {
            Ok(report) => {
                if print_text {
                    print_suite(&report);
                }
                suites.push(report);
            }
            Err(e) => {
                let report = RunReport {
                    passed: false,
                    suites,
                    error: Some(e.to_string()),
                };
                return (report, Some(e));
            }
        }
    }
    let report = RunReport {
        passed: true,
        suites,
        error: None,
    };
    (report, None)
}

/// Command-line trace flags take precedence over the configuration file.
fn apply_overrides(config: &mut HarnessConfig, cli: &Cli) {
    if cli.no_trace {
        config.trace.enabled = false;
    }
    if let Some(dir) = &cli.trace_dir {
        config.trace.dir = dir.clone();
    }
    if cli.compress_trace {
        config.trace.compress = true;
    }
}

fn print_suite(report: &SuiteReport) {
    eprintln!(
        "   PASS  {suite} ({cycles} cycles, t={time})",
        suite = report.suite,
        cycles = report.cycles,
        time = report.final_time,
    );
    for checkpoint in &report.checkpoints {
        eprintln!(
            "         {name}: {beats} beats, {terminators} terminators",
            name = checkpoint.name,
            beats = checkpoint.counters.beats,
            terminators = checkpoint.counters.terminators,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::path::PathBuf;

    #[test]
    fn flags_override_file_settings() {
        let mut config = HarnessConfig::default();
        let cli = Cli::parse_from(["mm2s", "--no-trace", "--trace-dir", "w", "--compress-trace"]);
        apply_overrides(&mut config, &cli);
        assert!(!config.trace.enabled);
        assert_eq!(config.trace.dir, PathBuf::from("w"));
        assert!(config.trace.compress);
    }

    #[test]
    fn absent_flags_keep_file_settings() {
        let mut config = HarnessConfig::default();
        config.trace.compress = true;
        apply_overrides(&mut config, &Cli::parse_from(["mm2s"]));
        assert!(config.trace.enabled);
        assert!(config.trace.compress);
        assert_eq!(config.trace.dir, PathBuf::from("out"));
    }

    #[test]
    fn both_suites_pass_with_traces() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("mm2s.toml");
        let trace_dir = dir.path().join("traces");
        std::fs::write(
            &config_path,
            format!(
                "[trace]\ndir = {:?}\n\n[device]\nreset = \"release-then-run\"\n",
                trace_dir.display().to_string()
            ),
        )
        .unwrap();
        let cli = Cli::parse_from([
            "mm2s".to_string(),
            "--quiet".to_string(),
            "--config".to_string(),
            config_path.display().to_string(),
        ]);
        assert_eq!(run(&cli).unwrap(), 0);
        assert!(trace_dir.join("unit_tests.vcd").is_file());
        assert!(trace_dir.join("gem.vcd").is_file());
    }

    fn untraced() -> HarnessConfig {
        let mut config = HarnessConfig::default();
        config.trace.enabled = false;
        config
    }

    #[test]
    fn passing_run_reports_every_suite() {
        let (report, failure) = run_suites(&untraced(), false);
        assert!(failure.is_none());
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["passed"], true);
        assert_eq!(json["suites"].as_array().unwrap().len(), 2);
        assert!(json.get("error").is_none());
    }

    #[test]
    fn failed_run_reports_partial_results() {
        let mut config = untraced();
        config.suites.traffic.time_budget = 10;
        let (report, failure) = run_suites(&config, false);
        assert!(failure.unwrap().is_timeout());

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["passed"], false);
        assert_eq!(json["suites"].as_array().unwrap().len(), 1);
        assert_eq!(json["suites"][0]["suite"], "protocol");
        assert!(json["error"].as_str().unwrap().contains("time"));
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let cli = Cli::parse_from(["mm2s", "--config", "/nonexistent/mm2s.toml"]);
        assert!(run(&cli).is_err());
    }
}
