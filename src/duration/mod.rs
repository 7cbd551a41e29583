//! Playout duration from input time stamps, with PCR as fallback.
//!
//! The exposed duration is cumulative and never decreases. Input time stamps
//! are accumulated packet to packet, modulo the PCR range. On PCR, the
//! duration at the switch and the PCR duration at that point are recorded and
//! later values are measured from that baseline.

use std::time::Duration;

use log::{log, warn, Level};

use crate::clock::{diff_pcr, ticks_to_duration, wraps_up_pcr};
use crate::packet::TsPacket;
use crate::pcr::PcrAnalyzer;
use crate::types::{PacketMetadata, TimeSource};

#[derive(Debug)]
pub struct DurationAnalyzer {
    level: Level,
    monotonic: fn(TimeSource) -> bool,
    pcr_analyzer: PcrAnalyzer,
    prefer_timestamps: bool,
    using_timestamps: bool,
    total_duration: u64,
    switch_duration: u64,
    switch_pcr: u64,
    last_timestamp: u64,
    last_time_source: TimeSource,
}

impl Default for DurationAnalyzer {
    fn default() -> Self {
        Self::new(Level::Info)
    }
}

impl DurationAnalyzer {
    /// `level` is the severity of source switch messages.
    pub fn new(level: Level) -> Self {
        Self {
            level,
            monotonic: TimeSource::is_monotonic,
            pcr_analyzer: PcrAnalyzer::new(1, 1),
            prefer_timestamps: false,
            using_timestamps: false,
            total_duration: 0,
            switch_duration: 0,
            switch_pcr: 0,
            last_timestamp: 0,
            last_time_source: TimeSource::Undefined,
        }
    }

    /// Clear all state. The time stamp preference is kept.
    pub fn reset(&mut self) {
        self.pcr_analyzer.reset(1, 1);
        self.using_timestamps = false;
        self.total_duration = 0;
        self.switch_duration = 0;
        self.switch_pcr = 0;
        self.last_timestamp = 0;
        self.last_time_source = TimeSource::Undefined;
    }

    /// Prefer input time stamps over PCR when available. When false, only
    /// PCR is used.
    pub fn use_input_timestamps(&mut self, prefer: bool) {
        if !prefer && self.using_timestamps {
            self.switch_to_pcr();
        }
        self.prefer_timestamps = prefer;
    }

    /// Replace the rule telling which time sources never go backwards.
    pub fn set_monotonic_predicate(&mut self, monotonic: fn(TimeSource) -> bool) {
        self.monotonic = monotonic;
    }

    pub fn feed_packet(&mut self, pkt: &TsPacket<'_>, mdata: &PacketMetadata) {
        self.pcr_analyzer.feed_packet(pkt);

        if !self.prefer_timestamps {
            self.follow_pcr();
            return;
        }

        let source = mdata.time_source();
        // A source which may go backwards is only trusted while it is
        // the one already in use.
        let usable = mdata.has_input_timestamp()
            && ((self.using_timestamps && source == self.last_time_source) || (self.monotonic)(source));
        match mdata.input_timestamp() {
            Some(timestamp) if usable => {
                if self.using_timestamps && source == self.last_time_source {
                    self.follow_timestamp(timestamp);
                } else {
                    log!(
                        self.level,
                        "using {source:?} input time stamps at duration {:?}",
                        ticks_to_duration(self.total_duration)
                    );
                    self.last_timestamp = timestamp;
                    self.last_time_source = source;
                    self.using_timestamps = true;
                }
            }
            _ if self.using_timestamps => {
                log!(
                    self.level,
                    "input time stamps lost ({source:?}), falling back to PCR at duration {:?}",
                    ticks_to_duration(self.total_duration)
                );
                self.switch_to_pcr();
            }
            _ => self.follow_pcr(),
        }
    }

    /// Add the step from the previous time stamp, wrapping at the PCR range.
    fn follow_timestamp(&mut self, timestamp: u64) {
        let last = self.last_timestamp;
        let step = if timestamp >= last {
            Some(timestamp - last)
        } else if wraps_up_pcr(last, timestamp) {
            diff_pcr(last, timestamp)
        } else {
            None
        };
        match step {
            Some(step) => {
                self.total_duration = self.total_duration.saturating_add(step);
                self.last_timestamp = timestamp;
            }
            None => {
                warn!(
                    "input time stamp went backwards at duration {:?}, falling back to PCR",
                    ticks_to_duration(self.total_duration)
                );
                self.switch_to_pcr();
            }
        }
    }

    fn follow_pcr(&mut self) {
        let current = self.pcr_analyzer.duration();
        if current >= self.switch_pcr {
            let total = self.switch_duration + (current - self.switch_pcr);
            self.total_duration = self.total_duration.max(total);
        } else {
            warn!(
                "PCR duration went backwards at duration {:?}, rebasing",
                ticks_to_duration(self.total_duration)
            );
            self.switch_to_pcr();
        }
    }

    fn switch_to_pcr(&mut self) {
        self.switch_duration = self.total_duration;
        self.switch_pcr = self.pcr_analyzer.duration();
        self.last_time_source = TimeSource::Undefined;
        self.using_timestamps = false;
    }

    /// Cumulative playout duration in 27 MHz ticks.
    pub fn duration(&self) -> u64 {
        self.total_duration
    }

    pub fn duration_as_std(&self) -> Duration {
        ticks_to_duration(self.total_duration)
    }

    pub fn is_using_timestamps(&self) -> bool {
        self.using_timestamps
    }

    /// Kind of the input time stamps in use, `Undefined` on PCR.
    pub fn time_source(&self) -> TimeSource {
        self.last_time_source
    }

    /// The embedded analyzer, for bitrate queries.
    pub fn pcr_analyzer(&self) -> &PcrAnalyzer {
        &self.pcr_analyzer
    }
}
