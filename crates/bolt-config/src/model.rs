//! Typed configuration model.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// Fully validated application configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// HTTP listener settings.
    pub http: HttpConfig,
    /// Local staging and object store locations.
    pub storage: StorageConfig,
    /// Transfer engine tuning.
    pub transfer: TransferConfig,
    /// Interval between `server_stats` broadcasts.
    pub stats_interval: Duration,
    /// Logging settings.
    pub logging: LoggingSettings,
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpConfig {
    /// Address to bind.
    pub bind_addr: IpAddr,
    /// Port to bind.
    pub port: u16,
}

impl HttpConfig {
    /// Socket address for the listener.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }
}

/// Where artifacts live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    /// Staging directory for fetched artifacts.
    pub download_dir: PathBuf,
    /// Root of the filesystem object store; `None` leaves the store unavailable.
    pub store_dir: Option<PathBuf>,
}

/// Transfer engine tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferConfig {
    /// Read size for the fetch stage.
    pub fetch_chunk_bytes: usize,
    /// Upload chunk size for the relay stage.
    pub relay_chunk_bytes: usize,
    /// Minimum spacing between progress snapshots.
    pub progress_interval: Duration,
    /// Connect timeout for outbound requests.
    pub connect_timeout: Duration,
    /// Read timeout for outbound requests.
    pub read_timeout: Duration,
    /// Overall timeout for metadata probes.
    pub probe_timeout: Duration,
    /// `User-Agent` sent to content sources.
    pub user_agent: String,
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// Requested output format; `None` lets the build decide.
    pub format: Option<LogFormatName>,
}

/// Log output format requested through configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormatName {
    /// Structured JSON lines.
    Json,
    /// Human readable output.
    Pretty,
}
