//! Constants for MPEG-TS packets and clock domains

/// MPEG-TS packet constants
pub const TS_PACKET_SIZE: usize = 188;
pub const TS_SYNC_BYTE: u8 = 0x47;
/// Packet size with a trailing 16-byte Reed-Solomon code
pub const RS_PACKET_SIZE: usize = 204;
pub const PACKET_BITS_188: u64 = TS_PACKET_SIZE as u64 * 8;
pub const PACKET_BITS_204: u64 = RS_PACKET_SIZE as u64 * 8;

/// Null (stuffing) PID
pub const PID_NULL: u16 = 0x1FFF;

/// Continuity counter is 4 bits
pub const CC_MAX: u8 = 16;

/// PES packet constants
pub const PES_START_CODE: [u8; 3] = [0x00, 0x00, 0x01];

/// System clock: 27 000 000 ticks / second
pub const SYSTEM_CLOCK_FREQ: u64 = 27_000_000;
/// PTS/DTS run at 90 kHz, i.e. SYSTEM_CLOCK_FREQ / 300
pub const SYSTEM_CLOCK_SUBFACTOR: u64 = 300;
pub const SYSTEM_CLOCK_SUBFREQ: u64 = SYSTEM_CLOCK_FREQ / SYSTEM_CLOCK_SUBFACTOR;

/// PTS/DTS are 33-bit counters
pub const PTS_DTS_BIT_SIZE: u32 = 33;
pub const PTS_DTS_SCALE: u64 = 1u64 << PTS_DTS_BIT_SIZE;
pub const PTS_DTS_MASK: u64 = PTS_DTS_SCALE - 1;

/// PCR = base (33 bits, 90 kHz) * 300 + extension (mod 300)
pub const PCR_SCALE: u64 = PTS_DTS_SCALE * SYSTEM_CLOCK_SUBFACTOR;
pub const MAX_PCR: u64 = PCR_SCALE - 1;

/// Clock gaps above one second are not trusted as elapsed time
pub const MAX_CLOCK_INCREMENT: u64 = SYSTEM_CLOCK_FREQ;
/// Time span kept in the instantaneous bitrate window
pub const INSTANT_WINDOW_TICKS: u64 = SYSTEM_CLOCK_FREQ;
/// Hard limit of samples in the instantaneous bitrate window
pub const INSTANT_WINDOW_LIMIT: usize = 1000;
