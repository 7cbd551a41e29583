//! Clock domain arithmetic (PCR at 27 MHz, PTS/DTS at 90 kHz)

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::*;

/// Distance from `pcr1` forward to `pcr2`, wrapping at `PCR_SCALE`.
/// Returns `None` when one of the values is not a valid PCR.
pub fn diff_pcr(pcr1: u64, pcr2: u64) -> Option<u64> {
    if pcr1 > MAX_PCR || pcr2 > MAX_PCR {
        return None;
    }
    Some(if pcr2 >= pcr1 { pcr2 - pcr1 } else { PCR_SCALE - pcr1 + pcr2 })
}

/// Distance from `dts1` forward to `dts2` in 90 kHz units, wrapping at 2^33.
pub fn diff_dts(dts1: u64, dts2: u64) -> Option<u64> {
    if dts1 > PTS_DTS_MASK || dts2 > PTS_DTS_MASK {
        return None;
    }
    Some(dts2.wrapping_sub(dts1) & PTS_DTS_MASK)
}

/// True if `pcr2` probably follows `pcr1` after wrapping up: `pcr2` is
/// lower and the backward distance covers more than 80% of the range.
pub fn wraps_up_pcr(pcr1: u64, pcr2: u64) -> bool {
    pcr2 < pcr1 && (pcr1 - pcr2) > (4 * PCR_SCALE) / 5
}

/// Convert 27 MHz ticks into a wall-clock duration.
pub fn ticks_to_duration(ticks: u64) -> Duration {
    let secs = ticks / SYSTEM_CLOCK_FREQ;
    let rem = ticks % SYSTEM_CLOCK_FREQ;
    // rem < 27e6, so rem * 1000 / 27 fits easily
    Duration::new(secs, (rem * 1000 / 27) as u32)
}

/// Convert a wall-clock duration into 27 MHz ticks.
pub fn duration_to_ticks(d: Duration) -> u64 {
    d.as_secs() * SYSTEM_CLOCK_FREQ + d.subsec_nanos() as u64 * 27 / 1000
}

/// Which clock reference a `PcrAnalyzer` follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClockReference {
    #[default]
    Pcr,
    Dts,
}

impl ClockReference {
    /// Forward distance between two raw values of this clock, in PCR ticks.
    pub fn ticks_between(self, from: u64, to: u64) -> Option<u64> {
        match self {
            ClockReference::Pcr => diff_pcr(from, to),
            ClockReference::Dts => diff_dts(from, to).map(|d| d * SYSTEM_CLOCK_SUBFACTOR),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ClockReference::Pcr => "PCR",
            ClockReference::Dts => "DTS",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diff_pcr_without_wrap() {
        assert_eq!(diff_pcr(1_000, 28_001_000), Some(28_000_000));
        assert_eq!(diff_pcr(42, 42), Some(0));
    }

    #[test]
    fn diff_pcr_wraps_around_scale() {
        // 10 ticks before the end, 5 ticks after wrap
        assert_eq!(diff_pcr(MAX_PCR - 9, 5), Some(15));
        for step in [1u64, 299, 27_000_000, PCR_SCALE / 2, PCR_SCALE - 1] {
            let start = MAX_PCR - step / 3;
            let end = (start + step) % PCR_SCALE;
            assert_eq!(diff_pcr(start, end), Some(step), "step {step}");
        }
    }

    #[test]
    fn diff_pcr_rejects_out_of_range() {
        assert_eq!(diff_pcr(PCR_SCALE, 0), None);
        assert_eq!(diff_pcr(0, u64::MAX), None);
    }

    #[test]
    fn diff_dts_wraps_at_33_bits() {
        assert_eq!(diff_dts(PTS_DTS_MASK, 0), Some(1));
        assert_eq!(diff_dts(100, 3_700), Some(3_600));
        assert_eq!(diff_dts(PTS_DTS_SCALE, 0), None);
    }

    #[test]
    fn dts_ticks_are_scaled_to_pcr_units() {
        assert_eq!(ClockReference::Dts.ticks_between(0, 90_000), Some(SYSTEM_CLOCK_FREQ));
        assert_eq!(ClockReference::Pcr.ticks_between(0, 90_000), Some(90_000));
    }

    #[test]
    fn wrap_detection() {
        assert!(wraps_up_pcr(MAX_PCR - 100, 50));
        assert!(!wraps_up_pcr(1_000_000, 999_000));
        assert!(!wraps_up_pcr(50, MAX_PCR));
    }

    #[test]
    fn tick_duration_conversion() {
        assert_eq!(ticks_to_duration(SYSTEM_CLOCK_FREQ), Duration::from_secs(1));
        assert_eq!(ticks_to_duration(27_000), Duration::from_millis(1));
        assert_eq!(duration_to_ticks(Duration::from_millis(1500)), 40_500_000);
    }
}
