use crate::humanize::ByteSize;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
    #[serde(default)]
    pub api: ApiLimits,
}

/// Request limits enforced by the HTTP layer
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiLimits {
    /// Serials accepted by one batch-remaining call
    #[serde(default = "default_max_batch_serials")]
    pub max_batch_serials: usize,
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: ByteSize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            api: ApiLimits::default(),
        }
    }
}

impl Default for ApiLimits {
    fn default() -> Self {
        Self {
            max_batch_serials: default_max_batch_serials(),
            max_payload_bytes: default_max_payload_bytes(),
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_max_batch_serials() -> usize {
    500
}

fn default_max_payload_bytes() -> ByteSize {
    ByteSize::mib(1)
}

/// Embedded store location
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    #[serde(default = "default_fjall_path")]
    pub fjall_path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            fjall_path: default_fjall_path(),
        }
    }
}

fn default_fjall_path() -> PathBuf {
    PathBuf::from("data/spools")
}

/// Settings for the daily report
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ReportConfig {
    /// Offset of the crews' local day from UTC, in minutes (e.g. -240)
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelemetryConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    #[serde(default = "default_ansi")]
    pub ansi: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter(),
            ansi: default_ansi(),
        }
    }
}

fn default_log_filter() -> String {
    "info,spoolbox=debug".to_string()
}

fn default_ansi() -> bool {
    true
}
