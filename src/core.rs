use std::time::{Duration, Instant};

use anyhow::Context;
use bytes::BytesMut;
use log::{debug, info, warn};
use tokio::{fs::File, io::AsyncReadExt, net::UdpSocket};

use crate::clock::duration_to_ticks;
use crate::constants::{PCR_SCALE, TS_PACKET_SIZE};
use crate::duration::DurationAnalyzer;
use crate::network::create_udp_socket;
use crate::packet::TsPacket;
use crate::pcr::PcrAnalyzer;
use crate::report::Reporter;
use crate::types::{AnalyzerConfig, InputSource, Options, PacketMetadata, TimeSource};

/// Both analyzers of one run: `bitrate` applies the configured thresholds,
/// `clock` tracks playout time.
pub struct TimingSession {
    pub bitrate: PcrAnalyzer,
    pub clock: DurationAnalyzer,
}

impl TimingSession {
    pub fn new(config: &AnalyzerConfig) -> anyhow::Result<Self> {
        config.validate()?;
        let mut clock = DurationAnalyzer::new(config.log_level()?);
        clock.use_input_timestamps(config.prefer_input_timestamps);
        Ok(Self { bitrate: PcrAnalyzer::with_config(config), clock })
    }

    pub fn feed(&mut self, pkt: &TsPacket<'_>, mdata: &PacketMetadata) {
        let was_valid = self.bitrate.bitrate_is_valid();
        if self.bitrate.feed_packet(pkt) && !was_valid {
            info!("bitrate: {} b/s", self.bitrate.bitrate_188());
        }
        self.clock.feed_packet(pkt, mdata);
    }

    pub fn json_report(&self) -> String {
        Reporter::generate_json_report(&self.bitrate, &self.clock)
    }
}

/// Read packets until end of input or Ctrl-C, printing a JSON report every
/// `refresh_secs` and once at the end.
pub async fn run(opts: Options) -> anyhow::Result<()> {
    let mut session = TimingSession::new(&opts.config)?;
    let refresh = Duration::from_secs(opts.refresh_secs.max(1));

    match &opts.input {
        InputSource::Udp(addr) => {
            let socket = create_udp_socket(*addr, opts.iface)
                .with_context(|| format!("cannot listen on {addr}"))?;
            let sock = UdpSocket::from_std(socket.into())?;
            info!("listening on {addr}");
            tokio::select! {
                res = read_udp(&sock, &mut session, refresh) => res?,
                _ = tokio::signal::ctrl_c() => info!("interrupted"),
            }
        }
        InputSource::File(path) => {
            let file = File::open(path)
                .await
                .with_context(|| format!("cannot open {}", path.display()))?;
            info!("reading {}", path.display());
            tokio::select! {
                res = read_file(file, &mut session, refresh) => res?,
                _ = tokio::signal::ctrl_c() => info!("interrupted"),
            }
        }
    }

    println!("{}", session.json_report());
    Ok(())
}

async fn read_udp(sock: &UdpSocket, session: &mut TimingSession, refresh: Duration) -> anyhow::Result<()> {
    let mut buf = [0u8; 2048];
    let start = Instant::now();
    let mut last_print = Instant::now();

    loop {
        let n = sock.recv(&mut buf).await?;
        if n % TS_PACKET_SIZE != 0 {
            debug!("dropping {} trailing bytes of a {n}-byte datagram", n % TS_PACKET_SIZE);
        }

        // all packets of a datagram share its reception time
        let ticks = duration_to_ticks(start.elapsed()) % PCR_SCALE;
        let mdata = PacketMetadata::with_timestamp(ticks, TimeSource::Tsp);
        for chunk in buf[..n].chunks_exact(TS_PACKET_SIZE) {
            session.feed(&TsPacket::from_slice(chunk)?, &mdata);
        }

        if last_print.elapsed() >= refresh {
            println!("{}", session.json_report());
            last_print = Instant::now();
        }
    }
}

async fn read_file(mut file: File, session: &mut TimingSession, refresh: Duration) -> anyhow::Result<()> {
    let mut buf = BytesMut::with_capacity(TS_PACKET_SIZE * 512);
    let mdata = PacketMetadata::default();
    let mut last_print = Instant::now();

    loop {
        let n = file.read_buf(&mut buf).await?;
        while buf.len() >= TS_PACKET_SIZE {
            let chunk = buf.split_to(TS_PACKET_SIZE);
            session.feed(&TsPacket::from_slice(&chunk)?, &mdata);
        }
        if n == 0 {
            if !buf.is_empty() {
                warn!("ignoring {} trailing bytes", buf.len());
            }
            return Ok(());
        }
        buf.reserve(TS_PACKET_SIZE * 512);

        if last_print.elapsed() >= refresh {
            println!("{}", session.json_report());
            last_print = Instant::now();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;

    #[test]
    fn session_applies_config() {
        let config = AnalyzerConfig { min_pid_count: 2, ..Default::default() };
        let mut session = TimingSession::new(&config).unwrap();
        let mdata = PacketMetadata::default();
        for i in 0..10u64 {
            let buf = pcr_packet(0x100, i as u8, i * 27_000);
            session.feed(&TsPacket::new(&buf), &mdata);
        }
        // one PID is enough for the duration, not for the bitrate
        assert!(!session.bitrate.bitrate_is_valid());
        assert!(session.clock.pcr_analyzer().bitrate_is_valid());
        assert_eq!(session.clock.duration(), 9 * 27_000);
        assert!(session.json_report().contains("\"playout_duration_ms\": 9"));
    }

    #[test]
    fn session_rejects_bad_config() {
        let config = AnalyzerConfig { min_samples_per_pid: 0, ..Default::default() };
        assert!(TimingSession::new(&config).is_err());
    }

    #[tokio::test]
    async fn file_input_is_analyzed() {
        let path = std::env::temp_dir().join(format!("mpegts_timing_{}.ts", std::process::id()));
        let mut data = Vec::new();
        for i in 0..100u64 {
            data.extend_from_slice(&pcr_packet(0x100, (i % 16) as u8, i * 27_000));
        }
        data.extend_from_slice(&[0x47, 0x00]);
        tokio::fs::write(&path, &data).await.unwrap();

        let mut session = TimingSession::new(&AnalyzerConfig::default()).unwrap();
        let file = File::open(&path).await.unwrap();
        read_file(file, &mut session, Duration::from_secs(3600)).await.unwrap();
        tokio::fs::remove_file(&path).await.unwrap();

        assert_eq!(session.bitrate.packet_count(), 100);
        assert_eq!(session.bitrate.bitrate_188(), 1_504_000);
        assert_eq!(session.clock.duration(), 99 * 27_000);
    }
}
