//! mm2s: bus-functional harness for a memory-mapped to stream DMA bridge.
//!
//! Runs the protocol edge-case suite and then the multi-burst traffic suite
//! against the reference bridge, writing one value-change trace per suite.
//! Exits non-zero on the first failed check or exhausted time budget.

#![warn(missing_docs)]

mod run;

use std::path::PathBuf;
use std::process;

use clap::{Parser, ValueEnum};
use log::LevelFilter;

/// mm2s: write-channel and stream-output verification harness.
#[derive(Parser, Debug)]
#[command(name = "mm2s", version, about = "mm2s bus-functional harness")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Enable verbose (debug-level) output, including every stream beat.
    #[arg(short, long)]
    pub verbose: bool,

    /// Path to a custom `mm2s.toml` configuration file.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Disable value-change trace recording.
    #[arg(long)]
    pub no_trace: bool,

    /// Directory for trace files.
    #[arg(long)]
    pub trace_dir: Option<PathBuf>,

    /// Write gzip-compressed traces (`.vcd.gz`).
    #[arg(long)]
    pub compress_trace: bool,

    /// Summary report format.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// Summary report format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable lines on stderr.
    Text,
    /// A JSON document on stdout.
    Json,
}

impl Cli {
    /// The log level implied by `--quiet` and `--verbose`.
    pub fn log_level(&self) -> LevelFilter {
        if self.quiet {
            LevelFilter::Error
        } else if self.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        }
    }
}

fn main() {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.log_level())
        .parse_default_env()
        .format_timestamp(None)
        .init();

    match run::run(&cli) {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_defaults() {
        let cli = Cli::parse_from(["mm2s"]);
        assert!(!cli.quiet);
        assert!(!cli.verbose);
        assert!(cli.config.is_none());
        assert!(!cli.no_trace);
        assert!(cli.trace_dir.is_none());
        assert!(!cli.compress_trace);
        assert_eq!(cli.format, ReportFormat::Text);
        assert_eq!(cli.log_level(), LevelFilter::Info);
    }

    #[test]
    fn parse_trace_flags() {
        let cli = Cli::parse_from([
            "mm2s",
            "--trace-dir",
            "waves",
            "--compress-trace",
            "--config",
            "ci/mm2s.toml",
        ]);
        assert_eq!(cli.trace_dir, Some(PathBuf::from("waves")));
        assert!(cli.compress_trace);
        assert_eq!(cli.config, Some(PathBuf::from("ci/mm2s.toml")));
    }

    #[test]
    fn parse_json_format() {
        let cli = Cli::parse_from(["mm2s", "--format", "json", "--no-trace"]);
        assert_eq!(cli.format, ReportFormat::Json);
        assert!(cli.no_trace);
    }

    #[test]
    fn verbosity_maps_to_levels() {
        assert_eq!(
            Cli::parse_from(["mm2s", "-q"]).log_level(),
            LevelFilter::Error
        );
        assert_eq!(
            Cli::parse_from(["mm2s", "-v"]).log_level(),
            LevelFilter::Debug
        );
    }

    #[test]
    fn quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["mm2s", "-q", "-v"]).is_err());
    }
}
