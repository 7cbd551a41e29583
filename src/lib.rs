// src/lib.rs
pub mod inspector {
    pub use crate::types::{InputSource, Options};

    /// Async entry-point; returns at end of input, on Ctrl-C or socket error
    pub async fn run(opts: Options) -> anyhow::Result<()> {
        crate::core::run(opts).await
    }
}

pub mod clock;
pub mod constants;
pub mod duration;
pub mod error;
pub mod network;
pub mod packet;
pub mod pcr;
pub mod report;
pub mod stats;
pub mod types;
mod core;

#[cfg(test)]
mod test_support;

pub use crate::clock::ClockReference;
pub use crate::core::TimingSession;
pub use crate::duration::DurationAnalyzer;
pub use crate::error::TimingError;
pub use crate::packet::TsPacket;
pub use crate::pcr::PcrAnalyzer;
pub use crate::types::{AnalyzerConfig, PacketMetadata, PcrStatus, TimeSource};
