//! Sliding window of recent clock samples for the instantaneous bitrate

use std::collections::VecDeque;

use crate::clock::ClockReference;
use crate::constants::*;

/// (clock value, packet index) pairs in arrival order, spanning at most
/// one second of clock time and never more than `INSTANT_WINDOW_LIMIT` entries.
///
/// Samples from all PIDs share one window, which assumes a single clock
/// domain. Programs with unrelated clock origins flush each other out and
/// the instantaneous bitrate stays at 0; callers then fall back to the
/// average bitrate.
#[derive(Debug)]
pub struct InstantWindow {
    clock: ClockReference,
    samples: VecDeque<(u64, u64)>,
}

impl InstantWindow {
    pub fn new(clock: ClockReference) -> Self {
        Self { clock, samples: VecDeque::new() }
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Record a sample and drop what falls out of the window.
    pub fn push(&mut self, clock_value: u64, packet_index: u64) {
        self.samples.push_back((clock_value, packet_index));
        while let Some(&(oldest, _)) = self.samples.front() {
            match self.clock.ticks_between(oldest, clock_value) {
                Some(span) if span <= INSTANT_WINDOW_TICKS => break,
                _ => {
                    self.samples.pop_front();
                }
            }
        }
        while self.samples.len() > INSTANT_WINDOW_LIMIT {
            self.samples.pop_front();
        }
    }

    /// Bitrate in bits/s from the oldest to the newest sample, 0 if unknown.
    pub fn bitrate(&self, bits_per_packet: u64) -> u64 {
        let (Some(&(first_clock, first_pkt)), Some(&(last_clock, last_pkt))) =
            (self.samples.front(), self.samples.back())
        else {
            return 0;
        };
        match self.clock.ticks_between(first_clock, last_clock) {
            Some(ticks) if ticks > 0 => interval_bitrate(last_pkt - first_pkt, ticks, bits_per_packet),
            _ => 0,
        }
    }
}

/// Bits per second carried by `packets` packets over `ticks` 27 MHz ticks.
pub fn interval_bitrate(packets: u64, ticks: u64, bits_per_packet: u64) -> u64 {
    if ticks == 0 {
        return 0;
    }
    let bits = packets as u128 * bits_per_packet as u128 * SYSTEM_CLOCK_FREQ as u128;
    u64::try_from(bits / ticks as u128).unwrap_or(u64::MAX)
}

/// Ticks needed to carry `packets` packets at `bitrate` bits/s, 0 if unknown.
pub fn packet_ticks(packets: u64, bitrate: u64, bits_per_packet: u64) -> u64 {
    if bitrate == 0 {
        return 0;
    }
    let ticks = packets as u128 * bits_per_packet as u128 * SYSTEM_CLOCK_FREQ as u128;
    u64::try_from(ticks / bitrate as u128).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_one_second() {
        let mut w = InstantWindow::new(ClockReference::Pcr);
        for i in 0..30u64 {
            // one sample every 100 ms, 10 packets apart
            w.push(i * 2_700_000, i * 10);
        }
        // samples at 1.9 s .. 2.9 s survive
        assert_eq!(w.len(), 11);
        assert_eq!(w.bitrate(PACKET_BITS_188), 100 * PACKET_BITS_188);
    }

    #[test]
    fn single_sample_has_no_bitrate() {
        let mut w = InstantWindow::new(ClockReference::Pcr);
        assert_eq!(w.bitrate(PACKET_BITS_188), 0);
        w.push(1_000, 0);
        assert_eq!(w.bitrate(PACKET_BITS_188), 0);
    }

    #[test]
    fn scattered_values_stay_bounded() {
        let mut w = InstantWindow::new(ClockReference::Pcr);
        let mut value = 12_345u64;
        for i in 0..10_000u64 {
            value = (value.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407)) % PCR_SCALE;
            w.push(value, i);
            assert!(w.len() <= INSTANT_WINDOW_LIMIT);
        }
    }

    #[test]
    fn dense_samples_hit_the_cap() {
        let mut w = InstantWindow::new(ClockReference::Pcr);
        for i in 0..5_000u64 {
            w.push(i, i);
        }
        assert_eq!(w.len(), INSTANT_WINDOW_LIMIT);
    }

    #[test]
    fn unrelated_clock_origins_flush_each_other() {
        let mut w = InstantWindow::new(ClockReference::Pcr);
        for i in 0..20u64 {
            // two programs, the second one a third of the range ahead
            w.push(i * 27_000, i * 20);
            w.push(PCR_SCALE / 3 + i * 27_000, i * 20 + 10);
        }
        assert_eq!(w.len(), 1);
        assert_eq!(w.bitrate(PACKET_BITS_188), 0);
    }

    #[test]
    fn interval_and_ticks_are_inverse() {
        let br = interval_bitrate(100, SYSTEM_CLOCK_FREQ / 10, PACKET_BITS_188);
        assert_eq!(br, 1000 * PACKET_BITS_188);
        assert_eq!(packet_ticks(100, br, PACKET_BITS_188), SYSTEM_CLOCK_FREQ / 10);
        assert_eq!(packet_ticks(100, 0, PACKET_BITS_188), 0);
        assert_eq!(interval_bitrate(100, 0, PACKET_BITS_188), 0);
    }
}
