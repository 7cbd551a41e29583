//! Per-PID timing state of the PCR analyzer

use std::collections::HashMap;

/// Analysis state of one PID, created on first sight and kept until reset.
#[derive(Debug, Clone, Default)]
pub struct PidStats {
    pub packet_count: u64,
    /// Last continuity counter seen on this PID
    pub continuity: u8,
    /// Last PCR or DTS value, raw
    pub last_clock: Option<u64>,
    /// Global packet index of `last_clock`
    pub last_clock_packet: u64,
    /// Whether `last_clock` may be used as the start of a bitrate interval
    pub last_valid: bool,
    pub clock_count: u64,
    pub bitrate_188_sum: u64,
    pub bitrate_204_sum: u64,
    pub bitrate_samples: u64,
    /// Accumulated 27 MHz ticks on this PID
    pub duration: u64,
}

impl PidStats {
    pub fn bitrate_188(&self) -> u64 {
        average(self.bitrate_188_sum, self.bitrate_samples)
    }

    pub fn bitrate_204(&self) -> u64 {
        average(self.bitrate_204_sum, self.bitrate_samples)
    }
}

pub(crate) fn average(sum: u64, count: u64) -> u64 {
    if count == 0 { 0 } else { sum / count }
}

/// Owns the state of every PID seen by an analyzer
#[derive(Debug, Default)]
pub struct StatsManager {
    pids: HashMap<u16, PidStats>,
}

impl StatsManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// State of `pid`, created if needed. The flag is true on creation.
    pub fn entry(&mut self, pid: u16) -> (&mut PidStats, bool) {
        let mut created = false;
        let stats = self.pids.entry(pid).or_insert_with(|| {
            created = true;
            PidStats::default()
        });
        (stats, created)
    }

    pub fn get(&self, pid: u16) -> Option<&PidStats> {
        self.pids.get(&pid)
    }

    /// Forget the last clock sample of every PID as a bitrate reference.
    pub fn invalidate_all(&mut self) {
        for stats in self.pids.values_mut() {
            stats.last_valid = false;
        }
    }

    pub fn clock_pid_count(&self) -> usize {
        self.pids.values().filter(|s| s.clock_count > 0).count()
    }

    /// All tracked PIDs, sorted
    pub fn pids(&self) -> Vec<u16> {
        let mut pids: Vec<u16> = self.pids.keys().copied().collect();
        pids.sort_unstable();
        pids
    }

    pub fn len(&self) -> usize {
        self.pids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pids.is_empty()
    }

    pub fn clear(&mut self) {
        self.pids.clear();
    }
}
