//! Bitrate and playout duration from PCR (or DTS) values.
//!
//! `PcrAnalyzer` is fed one packet at a time. It keeps one clock domain per
//! PID, estimates the transport bitrate from the number of packets between
//! two clock references of the same PID, and accumulates a playout duration
//! which never stalls and never decreases, even when a clock jumps.
//!
//! The average bitrate is reported as valid once `min_pid_count` PIDs have
//! each delivered `min_samples_per_pid` bitrate samples.

mod window;

use std::time::Duration;

use log::{debug, trace};

use crate::clock::{ticks_to_duration, ClockReference};
use crate::constants::*;
use crate::packet::TsPacket;
use crate::stats::{average, PidStats, StatsManager};
use crate::types::{AnalyzerConfig, PcrStatus};

pub use window::{interval_bitrate, packet_ticks, InstantWindow};

#[derive(Debug)]
pub struct PcrAnalyzer {
    min_pid_count: usize,
    min_samples_per_pid: usize,
    clock: ClockReference,
    ignore_errors: bool,
    bitrate_valid: bool,
    packet_count: u64,
    clock_count: u64,
    completed_pids: usize,
    discontinuities: u64,
    bitrate_188_sum: u64,
    bitrate_204_sum: u64,
    bitrate_samples: u64,
    duration: u64,
    instant_188: u64,
    instant_204: u64,
    window: InstantWindow,
    pids: StatsManager,
}

impl Default for PcrAnalyzer {
    fn default() -> Self {
        Self::new(1, 1)
    }
}

impl PcrAnalyzer {
    /// Analyzer on PCR values. Thresholds below 1 are raised to 1.
    pub fn new(min_pid_count: usize, min_samples_per_pid: usize) -> Self {
        let mut analyzer = Self {
            min_pid_count: 1,
            min_samples_per_pid: 1,
            clock: ClockReference::Pcr,
            ignore_errors: false,
            bitrate_valid: false,
            packet_count: 0,
            clock_count: 0,
            completed_pids: 0,
            discontinuities: 0,
            bitrate_188_sum: 0,
            bitrate_204_sum: 0,
            bitrate_samples: 0,
            duration: 0,
            instant_188: 0,
            instant_204: 0,
            window: InstantWindow::new(ClockReference::Pcr),
            pids: StatsManager::new(),
        };
        analyzer.reset(min_pid_count, min_samples_per_pid);
        analyzer
    }

    pub fn with_config(config: &AnalyzerConfig) -> Self {
        let mut analyzer = Self::new(config.min_pid_count, config.min_samples_per_pid);
        if config.clock == ClockReference::Dts {
            analyzer.reset_and_use_dts(config.min_pid_count, config.min_samples_per_pid);
        }
        analyzer.set_ignore_errors(config.ignore_errors);
        analyzer
    }

    /// Clear all state and follow PCR values.
    pub fn reset(&mut self, min_pid_count: usize, min_samples_per_pid: usize) {
        self.reset_with_clock(ClockReference::Pcr, min_pid_count, min_samples_per_pid);
    }

    /// Clear all state and follow DTS values instead of PCR.
    pub fn reset_and_use_dts(&mut self, min_pid_count: usize, min_samples_per_pid: usize) {
        self.reset_with_clock(ClockReference::Dts, min_pid_count, min_samples_per_pid);
    }

    fn reset_with_clock(&mut self, clock: ClockReference, min_pid_count: usize, min_samples_per_pid: usize) {
        self.min_pid_count = min_pid_count.max(1);
        self.min_samples_per_pid = min_samples_per_pid.max(1);
        self.clock = clock;
        self.bitrate_valid = false;
        self.packet_count = 0;
        self.clock_count = 0;
        self.completed_pids = 0;
        self.discontinuities = 0;
        self.bitrate_188_sum = 0;
        self.bitrate_204_sum = 0;
        self.bitrate_samples = 0;
        self.duration = 0;
        self.instant_188 = 0;
        self.instant_204 = 0;
        self.window = InstantWindow::new(clock);
        self.pids.clear();
    }

    /// Continuity errors no longer break the bitrate intervals when set.
    pub fn set_ignore_errors(&mut self, ignore: bool) {
        self.ignore_errors = ignore;
    }

    pub fn clock_reference(&self) -> ClockReference {
        self.clock
    }

    /// Process one packet. Returns true when the bitrate is valid.
    pub fn feed_packet(&mut self, pkt: &TsPacket<'_>) -> bool {
        self.packet_count += 1;

        if !pkt.has_valid_sync() {
            if !self.ignore_errors {
                self.process_discontinuity();
            }
            return self.bitrate_valid;
        }

        let pid = pkt.pid();
        let packet_index = self.packet_count;
        let (ps, created) = self.pids.entry(pid);
        ps.packet_count += 1;

        if pid == PID_NULL {
            return self.bitrate_valid;
        }

        // Counter is recorded even while errors are ignored.
        let cc = pkt.continuity_counter();
        let broken = !self.ignore_errors
            && (created
                || pkt.discontinuity_indicator()
                || (cc != ps.continuity && cc != (ps.continuity + 1) % CC_MAX));
        ps.continuity = cc;
        if broken {
            self.process_discontinuity();
        }

        let clock_value = match self.clock {
            ClockReference::Pcr => pkt.pcr(),
            ClockReference::Dts => pkt.dts(),
        };
        if let Some(value) = clock_value {
            self.process_clock(pid, value, packet_index);
        }

        self.bitrate_valid
    }

    fn process_discontinuity(&mut self) {
        self.discontinuities += 1;
        trace!("discontinuity #{} at packet {}", self.discontinuities, self.packet_count);
        self.pids.invalidate_all();
        self.window.clear();
    }

    fn process_clock(&mut self, pid: u16, value: u64, packet_index: u64) {
        let clock = self.clock;
        let fallback_bitrate = if self.instant_188 > 0 { self.instant_188 } else { self.bitrate_188() };
        let (ps, _) = self.pids.entry(pid);
        ps.clock_count += 1;
        self.clock_count += 1;

        // Time elapsed on this PID, trusted when below one second.
        let increment = match ps.last_clock {
            None => Some(0),
            Some(last) => clock.ticks_between(last, value),
        };
        match increment {
            Some(ticks) if ticks <= MAX_CLOCK_INCREMENT => ps.duration += ticks,
            _ => {
                let packets = packet_index - ps.last_clock_packet;
                let estimate = packet_ticks(packets, fallback_bitrate, PACKET_BITS_188);
                debug!(
                    "{} gap on PID 0x{pid:04X} ({increment:?} ticks), using {estimate} ticks over {packets} packets",
                    clock.name()
                );
                ps.duration = ps.duration.saturating_add(estimate);
            }
        }
        self.duration = (self.duration + 1).max(ps.duration);

        if ps.last_clock == Some(value) {
            return;
        }

        let mut completed = false;
        if ps.last_valid {
            if let Some(ticks) = increment.filter(|&t| t > 0) {
                let packets = packet_index - ps.last_clock_packet;
                let br188 = interval_bitrate(packets, ticks, PACKET_BITS_188);
                let br204 = interval_bitrate(packets, ticks, PACKET_BITS_204);
                ps.bitrate_188_sum = ps.bitrate_188_sum.saturating_add(br188);
                ps.bitrate_204_sum = ps.bitrate_204_sum.saturating_add(br204);
                ps.bitrate_samples += 1;
                completed = ps.bitrate_samples == self.min_samples_per_pid as u64;
                self.bitrate_188_sum = self.bitrate_188_sum.saturating_add(br188);
                self.bitrate_204_sum = self.bitrate_204_sum.saturating_add(br204);
                self.bitrate_samples += 1;
            }
        }

        ps.last_clock = Some(value);
        ps.last_clock_packet = packet_index;
        ps.last_valid = true;

        if completed {
            self.completed_pids += 1;
            if !self.bitrate_valid && self.completed_pids >= self.min_pid_count {
                debug!("bitrate valid after {} packets", self.packet_count);
                self.bitrate_valid = true;
            }
        }

        self.window.push(value, packet_index);
        self.instant_188 = self.window.bitrate(PACKET_BITS_188);
        self.instant_204 = self.window.bitrate(PACKET_BITS_204);
    }

    pub fn bitrate_is_valid(&self) -> bool {
        self.bitrate_valid
    }

    /// Average bitrate in bits/s, 188-byte packets. 0 without samples.
    pub fn bitrate_188(&self) -> u64 {
        average(self.bitrate_188_sum, self.bitrate_samples)
    }

    pub fn bitrate_204(&self) -> u64 {
        average(self.bitrate_204_sum, self.bitrate_samples)
    }

    pub fn pid_bitrate_188(&self, pid: u16) -> u64 {
        self.pids.get(pid).map_or(0, PidStats::bitrate_188)
    }

    pub fn pid_bitrate_204(&self, pid: u16) -> u64 {
        self.pids.get(pid).map_or(0, PidStats::bitrate_204)
    }

    /// Bitrate over the last second of clock time, 188-byte packets.
    pub fn instantaneous_bitrate_188(&self) -> u64 {
        self.instant_188
    }

    pub fn instantaneous_bitrate_204(&self) -> u64 {
        self.instant_204
    }

    pub fn packet_count(&self) -> u64 {
        self.packet_count
    }

    pub fn pid_packet_count(&self, pid: u16) -> u64 {
        self.pids.get(pid).map_or(0, |s| s.packet_count)
    }

    pub fn clock_count(&self) -> u64 {
        self.clock_count
    }

    pub fn discontinuity_count(&self) -> u64 {
        self.discontinuities
    }

    /// Playout duration in 27 MHz ticks.
    pub fn duration(&self) -> u64 {
        self.duration
    }

    pub fn pid_duration(&self, pid: u16) -> u64 {
        self.pids.get(pid).map_or(0, |s| s.duration)
    }

    pub fn duration_as_std(&self) -> Duration {
        ticks_to_duration(self.duration)
    }

    /// Every PID seen since the last reset, sorted.
    pub fn pids(&self) -> Vec<u16> {
        self.pids.pids()
    }

    /// Current number of samples in the instantaneous bitrate window.
    pub fn window_len(&self) -> usize {
        self.window.len()
    }

    pub fn status(&self) -> PcrStatus {
        PcrStatus {
            bitrate_valid: self.bitrate_valid,
            bitrate_188: self.bitrate_188(),
            bitrate_204: self.bitrate_204(),
            instantaneous_bitrate_188: self.instant_188,
            instantaneous_bitrate_204: self.instant_204,
            packet_count: self.packet_count,
            clock_count: self.clock_count,
            clock_pids: self.pids.clock_pid_count(),
            discontinuities: self.discontinuities,
            duration: self.duration,
        }
    }
}
