use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::log::LogConfig;
use crate::rpc::transport::{
    DEFAULT_MAX_CONTENT_LENGTH, DEFAULT_MAX_HEADER_LINE_LENGTH, DEFAULT_MAX_HEADER_LINES, ReaderLimits,
};

/// Returns the path to the data directory for dedukt-lsp.
/// Uses $XDG_DATA_HOME/dedukt-lsp if XDG_DATA_HOME is set,
/// otherwise falls back to ~/.local/share/dedukt-lsp,
/// or ./dedukt-lsp if neither is available.
pub fn data_dir() -> PathBuf {
    data_dir_with_env(std::env::var("XDG_DATA_HOME").ok(), dirs::home_dir())
}

/// Returns the default path to the log file.
pub fn log_path() -> PathBuf {
    data_dir().join("dedukt-lsp.log")
}

fn data_dir_with_env(xdg_data_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    let data_dir = xdg_data_home
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));

    data_dir.join("dedukt-lsp")
}

/// Settings of the server loop
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerConfig {
    pub reader_limits: ReaderLimits,
    /// Maximum handler duration; `None` lets handlers run to completion
    pub request_timeout: Option<Duration>,
}

#[derive(Debug, Parser)]
#[command(name = "dedukt-lsp", version, about = "Language server for JSON, TOML and YAML syntax trees")]
pub struct Cli {
    /// Speak the protocol over stdin/stdout (the only transport)
    #[arg(long)]
    pub stdio: bool,

    /// Log file path [default: $XDG_DATA_HOME/dedukt-lsp/dedukt-lsp.log]
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Log level filter, overridden by RUST_LOG
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Maximum header lines accepted in one frame
    #[arg(long, default_value_t = DEFAULT_MAX_HEADER_LINES)]
    pub max_header_lines: usize,

    /// Maximum length of one header line in bytes
    #[arg(long, default_value_t = DEFAULT_MAX_HEADER_LINE_LENGTH)]
    pub max_header_line_length: usize,

    /// Maximum frame body size in bytes
    #[arg(long, default_value_t = DEFAULT_MAX_CONTENT_LENGTH)]
    pub max_content_length: usize,

    /// Cancel handlers running longer than this many milliseconds
    #[arg(long, value_name = "MS")]
    pub request_timeout_ms: Option<u64>,
}

impl Cli {
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            reader_limits: ReaderLimits {
                max_header_lines: self.max_header_lines,
                max_header_line_length: self.max_header_line_length,
                max_content_length: self.max_content_length,
            },
            request_timeout: self.request_timeout_ms.map(Duration::from_millis),
        }
    }

    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            path: self.log_file.clone().unwrap_or_else(log_path),
            level: self.log_level.clone(),
        }
    }
}
