//! Read-only view over one 188-byte transport packet.
//!
//! Only the fields used by the timing analyzers are decoded. Nothing is
//! validated at construction time except the length: a packet with a
//! corrupted sync byte is still a packet that must be counted.

use crate::constants::*;
use crate::error::{Result, TimingError};

#[derive(Debug, Clone, Copy)]
pub struct TsPacket<'a> {
    data: &'a [u8; TS_PACKET_SIZE],
}

impl<'a> TsPacket<'a> {
    pub fn new(data: &'a [u8; TS_PACKET_SIZE]) -> Self {
        Self { data }
    }

    /// View the first 188 bytes of `data`.
    pub fn from_slice(data: &'a [u8]) -> Result<Self> {
        data.get(..TS_PACKET_SIZE)
            .and_then(|d| d.try_into().ok())
            .map(Self::new)
            .ok_or(TimingError::PacketTooShort(data.len()))
    }

    pub fn as_bytes(&self) -> &'a [u8; TS_PACKET_SIZE] {
        self.data
    }

    pub fn has_valid_sync(&self) -> bool {
        self.data[0] == TS_SYNC_BYTE
    }

    pub fn pid(&self) -> u16 {
        (((self.data[1] & 0x1F) as u16) << 8) | self.data[2] as u16
    }

    pub fn is_null(&self) -> bool {
        self.pid() == PID_NULL
    }

    pub fn payload_unit_start(&self) -> bool {
        self.data[1] & 0x40 != 0
    }

    pub fn continuity_counter(&self) -> u8 {
        self.data[3] & 0x0F
    }

    fn adaptation_field_control(&self) -> u8 {
        (self.data[3] & 0x30) >> 4
    }

    fn has_adaptation_field(&self) -> bool {
        self.adaptation_field_control() & 0x02 != 0
    }

    /// Length of the adaptation field, not including its length byte.
    fn adaptation_field_len(&self) -> usize {
        if self.has_adaptation_field() { self.data[4] as usize } else { 0 }
    }

    fn payload_offset(&self) -> usize {
        if self.has_adaptation_field() { 5 + self.adaptation_field_len() } else { 4 }
    }

    pub fn has_payload(&self) -> bool {
        self.adaptation_field_control() & 0x01 != 0 && self.payload_offset() < TS_PACKET_SIZE
    }

    pub fn payload(&self) -> &'a [u8] {
        if self.has_payload() { &self.data[self.payload_offset()..] } else { &[] }
    }

    /// Adaptation field flags byte, if the field is long enough to carry one.
    fn adaptation_flags(&self) -> Option<u8> {
        if self.adaptation_field_len() >= 1 { Some(self.data[5]) } else { None }
    }

    pub fn discontinuity_indicator(&self) -> bool {
        self.adaptation_flags().is_some_and(|f| f & 0x80 != 0)
    }

    /// Program clock reference in 27 MHz ticks.
    pub fn pcr(&self) -> Option<u64> {
        let flags = self.adaptation_flags()?;
        if flags & 0x10 == 0 || self.adaptation_field_len() < 7 {
            return None;
        }
        let p = &self.data[6..12];
        let base = ((p[0] as u64) << 25)
            | ((p[1] as u64) << 17)
            | ((p[2] as u64) << 9)
            | ((p[3] as u64) << 1)
            | ((p[4] as u64) >> 7);
        let ext = (((p[4] & 0x01) as u64) << 8) | p[5] as u64;
        Some(base * SYSTEM_CLOCK_SUBFACTOR + ext)
    }

    pub fn has_pcr(&self) -> bool {
        self.pcr().is_some()
    }

    /// Decoding time stamp in 90 kHz units, from a PES header starting in
    /// this packet. PES headers with a PTS only carry no DTS.
    pub fn dts(&self) -> Option<u64> {
        if !self.payload_unit_start() {
            return None;
        }
        let pes = self.payload();
        if pes.len() < 19 || pes[..3] != PES_START_CODE || !has_pes_header(pes[3]) {
            return None;
        }
        // '10' marker bits, then PTS_DTS_flags == '11'
        if pes[6] & 0xC0 != 0x80 || pes[7] & 0xC0 != 0xC0 || (pes[8] as usize) < 10 {
            return None;
        }
        Some(read_timestamp(&pes[14..19]))
    }

    pub fn has_dts(&self) -> bool {
        self.dts().is_some()
    }
}

impl<'a> TryFrom<&'a [u8]> for TsPacket<'a> {
    type Error = TimingError;

    fn try_from(data: &'a [u8]) -> Result<Self> {
        Self::from_slice(data)
    }
}

/// Stream ids whose PES packets carry the optional header with time stamps.
fn has_pes_header(stream_id: u8) -> bool {
    !matches!(stream_id, 0xBC | 0xBE | 0xBF | 0xF0 | 0xF1 | 0xF2 | 0xF8 | 0xFF)
}

/// 33-bit time stamp spread over 5 bytes with marker bits.
fn read_timestamp(p: &[u8]) -> u64 {
    ((p[0] as u64 & 0x0E) << 29)
        | ((p[1] as u64) << 22)
        | (((p[2] as u64 & 0xFE) >> 1) << 15)
        | ((p[3] as u64) << 7)
        | ((p[4] as u64) >> 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;

    #[test]
    fn header_fields() {
        let buf = payload_packet(0x0100, 7);
        let pkt = TsPacket::new(&buf);
        assert!(pkt.has_valid_sync());
        assert_eq!(pkt.pid(), 0x0100);
        assert_eq!(pkt.continuity_counter(), 7);
        assert!(pkt.has_payload());
        assert!(!pkt.discontinuity_indicator());
        assert_eq!(pkt.pcr(), None);
        assert_eq!(pkt.dts(), None);
        assert!(!pkt.is_null());
    }

    #[test]
    fn pcr_is_decoded() {
        let value = 1_234_567_890_123 % PCR_SCALE;
        let buf = pcr_packet(0x0101, 3, value);
        let pkt = TsPacket::new(&buf);
        assert_eq!(pkt.pcr(), Some(value));
        assert!(pkt.has_payload());
    }

    #[test]
    fn max_pcr_is_decoded() {
        let buf = pcr_packet(0x0101, 0, MAX_PCR);
        assert_eq!(TsPacket::new(&buf).pcr(), Some(MAX_PCR));
    }

    #[test]
    fn discontinuity_flag() {
        let mut buf = pcr_packet(0x0101, 3, 0);
        set_discontinuity(&mut buf);
        assert!(TsPacket::new(&buf).discontinuity_indicator());
    }

    #[test]
    fn dts_is_decoded() {
        let buf = dts_packet(0x0044, 1, 0x1_2345_6789);
        let pkt = TsPacket::new(&buf);
        assert_eq!(pkt.dts(), Some(0x1_2345_6789));
        assert!(!pkt.has_pcr());
    }

    #[test]
    fn pts_only_header_has_no_dts() {
        let mut buf = dts_packet(0x0044, 1, 90_000);
        buf[11] = 0x80;
        assert_eq!(TsPacket::new(&buf).dts(), None);
    }

    #[test]
    fn padding_stream_has_no_dts() {
        let mut buf = dts_packet(0x0044, 1, 90_000);
        buf[7] = 0xBE;
        assert_eq!(TsPacket::new(&buf).dts(), None);
    }

    #[test]
    fn null_and_bad_sync() {
        let buf = null_packet();
        assert!(TsPacket::new(&buf).is_null());
        let mut bad = payload_packet(0x0100, 0);
        bad[0] = 0x00;
        assert!(!TsPacket::new(&bad).has_valid_sync());
    }

    #[test]
    fn adaptation_only_packet_has_no_payload() {
        let mut buf = pcr_packet(0x0101, 0, 0);
        buf[3] = (buf[3] & 0xCF) | 0x20;
        buf[4] = 183;
        let pkt = TsPacket::new(&buf);
        assert!(!pkt.has_payload());
        assert!(pkt.payload().is_empty());
        assert_eq!(pkt.pcr(), Some(0));
    }

    #[test]
    fn short_slice_is_rejected() {
        let data = [0x47u8; 100];
        assert!(matches!(TsPacket::from_slice(&data), Err(TimingError::PacketTooShort(100))));
        let long = [0x47u8; 204];
        assert!(TsPacket::try_from(&long[..]).is_ok());
    }
}
