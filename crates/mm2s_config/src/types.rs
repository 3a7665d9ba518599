//! Configuration types deserialized from `mm2s.toml`.

use std::path::PathBuf;

use mm2s_sim::ResetConvention;
use serde::Deserialize;

/// Default time budget of a suite, in sub-steps.
pub const DEFAULT_TIME_BUDGET: u64 = 10_000;
/// Default trace identifier of the protocol suite.
pub const DEFAULT_PROTOCOL_TRACE: &str = "unit_tests";
/// Default trace identifier of the traffic suite.
pub const DEFAULT_TRAFFIC_TRACE: &str = "gem";

/// Top-level harness configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HarnessConfig {
    /// Value-change trace output.
    #[serde(default)]
    pub trace: TraceConfig,
    /// Device model settings.
    #[serde(default)]
    pub device: DeviceConfig,
    /// Per-suite settings.
    #[serde(default)]
    pub suites: SuitesConfig,
}

/// Where and how value-change traces are written.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TraceConfig {
    /// Whether traces are written at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Directory receiving `<trace_name>.vcd` files.
    #[serde(default = "default_trace_dir")]
    pub dir: PathBuf,
    /// Write gzip-compressed `.vcd.gz` files instead of plain VCD.
    #[serde(default)]
    pub compress: bool,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: default_trace_dir(),
            compress: false,
        }
    }
}

impl TraceConfig {
    /// The file a suite with trace identifier `trace_name` writes to.
    pub fn path_for(&self, trace_name: &str) -> PathBuf {
        let extension = if self.compress { "vcd.gz" } else { "vcd" };
        self.dir.join(format!("{trace_name}.{extension}"))
    }
}

/// Device model settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeviceConfig {
    /// How the device leaves reset.
    #[serde(default)]
    pub reset: ResetConvention,
}

/// Settings for the two built-in suites.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SuitesConfig {
    /// Protocol edge-case suite.
    #[serde(default = "SuiteConfig::protocol")]
    pub protocol: SuiteConfig,
    /// Multi-burst traffic suite.
    #[serde(default = "SuiteConfig::traffic")]
    pub traffic: SuiteConfig,
}

impl Default for SuitesConfig {
    fn default() -> Self {
        Self {
            protocol: SuiteConfig::protocol(),
            traffic: SuiteConfig::traffic(),
        }
    }
}

/// Settings for one suite run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SuiteConfig {
    /// Trace identifier; also names the trace file.
    pub trace_name: String,
    /// Time budget in sub-steps.
    #[serde(default = "default_time_budget")]
    pub time_budget: u64,
}

impl SuiteConfig {
    /// Defaults for the protocol suite.
    pub fn protocol() -> Self {
        Self {
            trace_name: DEFAULT_PROTOCOL_TRACE.to_string(),
            time_budget: DEFAULT_TIME_BUDGET,
        }
    }

    /// Defaults for the traffic suite.
    pub fn traffic() -> Self {
        Self {
            trace_name: DEFAULT_TRAFFIC_TRACE.to_string(),
            time_budget: DEFAULT_TIME_BUDGET,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_trace_dir() -> PathBuf {
    PathBuf::from("out")
}

fn default_time_budget() -> u64 {
    DEFAULT_TIME_BUDGET
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_builtin_suites() {
        let config = HarnessConfig::default();
        assert!(config.trace.enabled);
        assert_eq!(config.trace.dir, PathBuf::from("out"));
        assert_eq!(config.device.reset, ResetConvention::OneShot);
        assert_eq!(config.suites.protocol.trace_name, "unit_tests");
        assert_eq!(config.suites.traffic.trace_name, "gem");
        assert_eq!(config.suites.traffic.time_budget, 10_000);
    }

    #[test]
    fn trace_path_follows_compression() {
        let mut trace = TraceConfig::default();
        assert_eq!(trace.path_for("gem"), PathBuf::from("out/gem.vcd"));
        trace.compress = true;
        assert_eq!(trace.path_for("gem"), PathBuf::from("out/gem.vcd.gz"));
    }
}
