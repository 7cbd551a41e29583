//! Synthetic packets for unit tests.

use crate::constants::*;

fn header(pid: u16, cc: u8, afc: u8) -> [u8; TS_PACKET_SIZE] {
    let mut buf = [0xFFu8; TS_PACKET_SIZE];
    buf[0] = TS_SYNC_BYTE;
    buf[1] = ((pid >> 8) & 0x1F) as u8;
    buf[2] = (pid & 0xFF) as u8;
    buf[3] = (afc << 4) | (cc & 0x0F);
    buf
}

/// Payload-only packet.
pub fn payload_packet(pid: u16, cc: u8) -> [u8; TS_PACKET_SIZE] {
    header(pid, cc, 0b01)
}

pub fn null_packet() -> [u8; TS_PACKET_SIZE] {
    header(PID_NULL, 0, 0b01)
}

/// Packet with a 7-byte adaptation field carrying `pcr` (27 MHz ticks), then payload.
pub fn pcr_packet(pid: u16, cc: u8, pcr: u64) -> [u8; TS_PACKET_SIZE] {
    let mut buf = header(pid, cc, 0b11);
    let base = pcr / SYSTEM_CLOCK_SUBFACTOR;
    let ext = pcr % SYSTEM_CLOCK_SUBFACTOR;
    buf[4] = 7;
    buf[5] = 0x10;
    buf[6] = (base >> 25) as u8;
    buf[7] = (base >> 17) as u8;
    buf[8] = (base >> 9) as u8;
    buf[9] = (base >> 1) as u8;
    buf[10] = (((base & 1) as u8) << 7) | 0x7E | ((ext >> 8) as u8 & 0x01);
    buf[11] = (ext & 0xFF) as u8;
    buf
}

/// PUSI packet starting a video PES with PTS == DTS == `dts` (90 kHz).
pub fn dts_packet(pid: u16, cc: u8, dts: u64) -> [u8; TS_PACKET_SIZE] {
    let mut buf = header(pid, cc, 0b01);
    buf[1] |= 0x40;
    buf[4..8].copy_from_slice(&[0x00, 0x00, 0x01, 0xE0]);
    buf[8] = 0;
    buf[9] = 0;
    buf[10] = 0x80;
    buf[11] = 0xC0;
    buf[12] = 10;
    write_timestamp(&mut buf[13..18], 0x3, dts);
    write_timestamp(&mut buf[18..23], 0x1, dts);
    buf
}

pub fn set_discontinuity(buf: &mut [u8; TS_PACKET_SIZE]) {
    buf[5] |= 0x80;
}

fn write_timestamp(out: &mut [u8], prefix: u8, ts: u64) {
    out[0] = (prefix << 4) | (((ts >> 29) & 0x0E) as u8) | 0x01;
    out[1] = (ts >> 22) as u8;
    out[2] = (((ts >> 14) & 0xFE) as u8) | 0x01;
    out[3] = (ts >> 7) as u8;
    out[4] = (((ts << 1) & 0xFE) as u8) | 0x01;
}
