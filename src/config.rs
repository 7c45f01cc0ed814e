use clap::{Args, Parser, ValueEnum};
use std::path::PathBuf;
use url::Url;

#[derive(Clone, Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Config {
    #[command(flatten)]
    pub gateway: GatewayConfig,

    #[command(flatten)]
    pub storage: StorageConfig,

    #[command(flatten)]
    pub telemetry: TelemetryConfig,
}

#[derive(Clone, Debug, Args)]
pub struct GatewayConfig {
    /// Base URL of the REST API gateway
    #[arg(long, env = "AURUM_API_BASE_URL")]
    pub base_url: Url,

    /// Request timeout in seconds
    #[arg(long, env = "AURUM_REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    pub request_timeout_secs: u64,
}

#[derive(Clone, Debug, Args)]
pub struct StorageConfig {
    /// Path of the persisted session document
    #[arg(long, env = "AURUM_SESSION_FILE", default_value = "aurum-session.json")]
    pub session_file: PathBuf,
}

#[derive(Clone, Debug, Args)]
pub struct TelemetryConfig {
    /// OTLP endpoint for traces and metrics (export disabled when unset)
    #[arg(long, env = "AURUM_OTLP_ENDPOINT")]
    pub otlp_endpoint: Option<String>,

    /// Log output format
    #[arg(long, env = "AURUM_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Text => "text",
            Self::Json => "json",
        })
    }
}

impl Config {
    pub fn load() -> Self {
        Self::parse()
    }
}
