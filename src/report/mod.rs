//! Report generation for timing analysis results

use serde::Serialize;

use crate::clock::ticks_to_duration;
use crate::duration::DurationAnalyzer;
use crate::pcr::PcrAnalyzer;
use crate::types::{PcrStatus, TimeSource};

/// One row per PID seen by the bitrate analyzer
#[derive(Debug, Clone, Serialize)]
pub struct PidReport {
    pub pid: u16,
    pub packets: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bitrate_188: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bitrate_204: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u128>,
}

/// Complete report for API consumers and the CLI
#[derive(Debug, Clone, Serialize)]
pub struct TimingReport {
    pub timestamp: String,
    pub status: PcrStatus,
    pub summary: String,
    pub playout_duration_ms: u128,
    pub time_source: TimeSource,
    pub using_timestamps: bool,
    pub pids: Vec<PidReport>,
}

pub struct Reporter;

impl Reporter {
    /// `bitrate` carries the configured validity thresholds, `clock` the
    /// playout duration.
    pub fn create_report(bitrate: &PcrAnalyzer, clock: &DurationAnalyzer) -> TimingReport {
        let status = bitrate.status();
        let pids = bitrate
            .pids()
            .into_iter()
            .map(|pid| {
                let br188 = bitrate.pid_bitrate_188(pid);
                let ticks = bitrate.pid_duration(pid);
                PidReport {
                    pid,
                    packets: bitrate.pid_packet_count(pid),
                    bitrate_188: (br188 > 0).then_some(br188),
                    bitrate_204: (br188 > 0).then(|| bitrate.pid_bitrate_204(pid)),
                    duration_ms: (ticks > 0).then(|| ticks_to_duration(ticks).as_millis()),
                }
            })
            .collect();

        TimingReport {
            timestamp: chrono::Utc::now().to_rfc3339(),
            summary: status.to_string(),
            status,
            playout_duration_ms: clock.duration_as_std().as_millis(),
            time_source: clock.time_source(),
            using_timestamps: clock.is_using_timestamps(),
            pids,
        }
    }

    /// Pretty-printed JSON string for CLI output
    pub fn generate_json_report(bitrate: &PcrAnalyzer, clock: &DurationAnalyzer) -> String {
        let report = Self::create_report(bitrate, clock);
        serde_json::to_string_pretty(&report)
            .unwrap_or_else(|_| "{\"error\": \"JSON serialization failed\"}".to_string())
    }
}
