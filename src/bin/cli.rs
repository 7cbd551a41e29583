use std::net::Ipv4Addr;
use std::path::PathBuf;

use clap::Parser;
use mpegts_timing::inspector::{run, InputSource, Options};
use mpegts_timing::{AnalyzerConfig, ClockReference};

#[derive(Parser)]
struct Opt {
    /// UDP socket to bind + listen (IPv4)
    #[clap(long, default_value = "239.1.1.2:1234", conflicts_with = "file")]
    addr: String,

    /// Read a TS file instead of listening on UDP
    #[clap(long)]
    file: Option<PathBuf>,

    /// Local interface for multicast membership
    #[clap(long, default_value = "0.0.0.0")]
    iface: Ipv4Addr,

    /// Refresh interval for the JSON snapshot
    #[clap(long, default_value_t = 2)]
    refresh: u64,

    /// JSON analyzer configuration, overridden by the flags below
    #[clap(long)]
    config: Option<PathBuf>,

    /// Use DTS instead of PCR for the bitrate
    #[clap(long, default_value_t = false)]
    dts: bool,

    /// Do not reset bitrate intervals on continuity errors
    #[clap(long, default_value_t = false)]
    ignore_errors: bool,

    /// Minimum number of PIDs with clock references for a valid bitrate
    #[clap(long)]
    min_pids: Option<usize>,

    /// Minimum number of bitrate samples per PID
    #[clap(long)]
    min_samples: Option<usize>,

    /// Playout duration from PCR only, ignoring reception time stamps
    #[clap(long, default_value_t = false)]
    pcr_only: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let opt = Opt::parse();

    let mut config = match &opt.config {
        Some(path) => AnalyzerConfig::from_json_file(path)?,
        None => AnalyzerConfig::default(),
    };
    if opt.dts {
        config.clock = ClockReference::Dts;
    }
    config.ignore_errors |= opt.ignore_errors;
    if let Some(n) = opt.min_pids {
        config.min_pid_count = n;
    }
    if let Some(n) = opt.min_samples {
        config.min_samples_per_pid = n;
    }
    if opt.pcr_only {
        config.prefer_input_timestamps = false;
    }

    let input = match opt.file {
        Some(path) => InputSource::File(path),
        None => InputSource::Udp(opt.addr.parse()?),
    };

    run(Options {
        input,
        iface: opt.iface,
        refresh_secs: opt.refresh,
        config,
    })
    .await
}
