use std::fmt;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::clock::{ticks_to_duration, ClockReference};
use crate::error::{Result, TimingError};

/// Origin of an input time stamp attached to a packet by the ingest layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeSource {
    #[default]
    Undefined,
    /// Receiving hardware (NIC, demodulator)
    Hardware,
    /// Operating system kernel (socket time stamps)
    Kernel,
    /// Software steady clock of the ingest process
    Tsp,
    Rtp,
    Srt,
    M2ts,
    Pcap,
}

impl TimeSource {
    /// Default monotonic predicate: only the software steady clock is
    /// monotonic by construction, other sources may jump or restart.
    pub fn is_monotonic(self) -> bool {
        matches!(self, TimeSource::Tsp)
    }
}

/// Per-packet metadata supplied by the ingest layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PacketMetadata {
    input_timestamp: Option<u64>,
    time_source: TimeSource,
}

impl PacketMetadata {
    /// `timestamp` is in 27 MHz units.
    pub fn with_timestamp(timestamp: u64, source: TimeSource) -> Self {
        Self { input_timestamp: Some(timestamp), time_source: source }
    }

    pub fn set_input_timestamp(&mut self, timestamp: u64, source: TimeSource) {
        self.input_timestamp = Some(timestamp);
        self.time_source = source;
    }

    pub fn clear_input_timestamp(&mut self) {
        self.input_timestamp = None;
        self.time_source = TimeSource::Undefined;
    }

    pub fn has_input_timestamp(&self) -> bool {
        self.input_timestamp.is_some()
    }

    pub fn input_timestamp(&self) -> Option<u64> {
        self.input_timestamp
    }

    pub fn time_source(&self) -> TimeSource {
        self.time_source
    }
}

/// Snapshot of a `PcrAnalyzer` at one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PcrStatus {
    pub bitrate_valid: bool,
    /// Average bitrate in bits/s, 188-byte packets
    pub bitrate_188: u64,
    /// Average bitrate in bits/s, 204-byte packets
    pub bitrate_204: u64,
    pub instantaneous_bitrate_188: u64,
    pub instantaneous_bitrate_204: u64,
    pub packet_count: u64,
    /// Number of clock references processed
    pub clock_count: u64,
    /// Number of PIDs which carried clock references
    pub clock_pids: usize,
    pub discontinuities: u64,
    /// Playout duration in 27 MHz ticks
    pub duration: u64,
}

impl fmt::Display for PcrStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "valid: {}, bitrate: {} b/s (188) {} b/s (204), instantaneous: {} b/s (188) {} b/s (204), \
             packets: {}, clock refs: {}, clock PIDs: {}, discontinuities: {}, duration: {:.3} s",
            self.bitrate_valid,
            self.bitrate_188,
            self.bitrate_204,
            self.instantaneous_bitrate_188,
            self.instantaneous_bitrate_204,
            self.packet_count,
            self.clock_count,
            self.clock_pids,
            self.discontinuities,
            ticks_to_duration(self.duration).as_secs_f64(),
        )
    }
}

/// Analyzer settings, usually built from the command line or a JSON file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub min_pid_count: usize,
    pub min_samples_per_pid: usize,
    pub clock: ClockReference,
    pub ignore_errors: bool,
    pub prefer_input_timestamps: bool,
    /// Severity of time source switch messages: error, warn, info, debug, trace
    pub switch_log_level: String,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            min_pid_count: 1,
            min_samples_per_pid: 1,
            clock: ClockReference::Pcr,
            ignore_errors: false,
            prefer_input_timestamps: true,
            switch_log_level: "info".to_string(),
        }
    }
}

impl AnalyzerConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_pid_count == 0 {
            return Err(TimingError::InvalidConfig("min_pid_count must be at least 1".into()));
        }
        if self.min_samples_per_pid == 0 {
            return Err(TimingError::InvalidConfig("min_samples_per_pid must be at least 1".into()));
        }
        self.log_level()?;
        Ok(())
    }

    pub fn log_level(&self) -> Result<log::Level> {
        self.switch_log_level
            .parse()
            .map_err(|_| TimingError::InvalidConfig(format!("unknown log level {:?}", self.switch_log_level)))
    }
}

/// Where transport packets are read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    /// UDP unicast or multicast (IPv4)
    Udp(SocketAddr),
    File(PathBuf),
}

/// Configuration options for the inspector
#[derive(Debug, Clone)]
pub struct Options {
    pub input: InputSource,
    /// Interface for multicast membership
    pub iface: Ipv4Addr,
    pub refresh_secs: u64,
    pub config: AnalyzerConfig,
}
