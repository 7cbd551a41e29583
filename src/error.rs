//! Error types for the library surface.
//!
//! The analyzers themselves never fail; these errors cover turning bytes
//! into packet views, loading configuration and opening inputs.

use std::net::IpAddr;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TimingError {
    /// Slice shorter than one transport packet.
    #[error("packet too short: {0} bytes (need 188)")]
    PacketTooShort(usize),

    #[error("unsupported address {0}: only IPv4 is supported")]
    UnsupportedAddress(IpAddr),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("malformed configuration file: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TimingError>;
