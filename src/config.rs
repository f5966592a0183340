//! Gateway configuration loading from environment variables.
//!
//! All values come from `IR_*` environment variables with sensible
//! defaults. Invalid values fall back to defaults without crashing.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |---|---|---|
//! | `IR_HOME` | `~/.inference-runtime` | Base directory for manifests |
//! | `IR_HOST` | `127.0.0.1` | HTTP bind host |
//! | `IR_PORT` | 11434 | HTTP bind port |
//! | `IR_BACKEND` | `cpu` | Compute backend (`cpu`, `metal`) |
//! | `IR_LOG_FORMAT` | `pretty` | Log format (`json`, `pretty`) |
//! | `IR_LOG_LEVEL` | `info` | Log filter directive |
//! | `IR_LOG_FILE` | unset | Log to this file instead of stderr |
//! | `IR_STREAM_BUFFER` | 64 | Buffered units per streaming response |
//! | `IR_SHUTDOWN_TIMEOUT` | 30 | Graceful drain timeout (secs) |

use std::path::PathBuf;
use std::time::Duration;

use crate::ffi::Backend;
use crate::telemetry::{LogConfig, LogFormat};

/// All gateway configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct EnvConfig {
    pub base_dir: PathBuf,
    pub host: String,
    pub port: u16,
    pub backend: Backend,
    pub log: LogConfig,
    pub stream_buffer: usize,
    pub shutdown_timeout: Duration,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
            host: "127.0.0.1".to_string(),
            port: 11434,
            backend: Backend::Cpu,
            log: LogConfig::default(),
            stream_buffer: 64,
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

/// Effective configuration summary for display.
#[derive(Debug, Clone)]
pub struct EffectiveConfig {
    pub base_dir: String,
    pub addr: String,
    pub backend: String,
    pub log_format: String,
    pub log_level: String,
    pub stream_buffer: usize,
    pub shutdown_timeout_secs: u64,
}

/// `~/.inference-runtime`, or `./.inference-runtime` when no home is set.
pub fn default_base_dir() -> PathBuf {
    let home = std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    home.join(".inference-runtime")
}

/// Parse a `usize` env var, returning `default` on missing or invalid.
fn parse_usize(key: &str, default: usize) -> usize {
    match std::env::var(key) {
        Ok(val) => val.trim().parse::<usize>().unwrap_or(default),
        Err(_) => default,
    }
}

/// Parse a `u16` env var, returning `default` on missing or invalid.
fn parse_u16(key: &str, default: u16) -> u16 {
    match std::env::var(key) {
        Ok(val) => val.trim().parse::<u16>().unwrap_or(default),
        Err(_) => default,
    }
}

/// Parse a `u64` env var, returning `default` on missing or invalid.
fn parse_u64(key: &str, default: u64) -> u64 {
    match std::env::var(key) {
        Ok(val) => val.trim().parse::<u64>().unwrap_or(default),
        Err(_) => default,
    }
}

/// Non-empty string env var.
fn parse_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn load_log_config() -> LogConfig {
    let defaults = LogConfig::default();
    let format = parse_string("IR_LOG_FORMAT")
        .and_then(|v| v.parse::<LogFormat>().ok())
        .unwrap_or(defaults.format);
    let level = parse_string("IR_LOG_LEVEL").unwrap_or(defaults.level);
    let output_path = parse_string("IR_LOG_FILE").map(PathBuf::from);
    LogConfig {
        format,
        level,
        output_path,
    }
}

/// Load all configuration from environment variables.
///
/// Missing or invalid values fall back to safe defaults without panicking.
pub fn load() -> EnvConfig {
    let defaults = EnvConfig::default();
    let base_dir = parse_string("IR_HOME")
        .map(PathBuf::from)
        .unwrap_or(defaults.base_dir);
    let host = parse_string("IR_HOST").unwrap_or(defaults.host);
    let port = parse_u16("IR_PORT", defaults.port).max(1); // 0 would pick a random port
    let backend = parse_string("IR_BACKEND")
        .and_then(|v| v.parse::<Backend>().ok())
        .unwrap_or(defaults.backend);
    let stream_buffer = parse_usize("IR_STREAM_BUFFER", defaults.stream_buffer).max(1);
    let shutdown_secs = parse_u64("IR_SHUTDOWN_TIMEOUT", 30).max(1);

    EnvConfig {
        base_dir,
        host,
        port,
        backend,
        log: load_log_config(),
        stream_buffer,
        shutdown_timeout: Duration::from_secs(shutdown_secs),
    }
}

impl EnvConfig {
    /// `host:port` for binding.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Apply a `--addr` flag. Accepts `host:port` or `:port`.
    pub fn set_addr(&mut self, addr: &str) -> Result<(), String> {
        let (host, port) = addr
            .rsplit_once(':')
            .ok_or_else(|| format!("invalid address '{}', expected host:port", addr))?;
        let port = port
            .parse::<u16>()
            .map_err(|_| format!("invalid port in address '{}'", addr))?;
        if !host.is_empty() {
            self.host = host.to_string();
        } else {
            self.host = "0.0.0.0".to_string();
        }
        self.port = port;
        Ok(())
    }

    /// Summary of all effective values, for `ir config`.
    pub fn effective_config(&self) -> EffectiveConfig {
        EffectiveConfig {
            base_dir: self.base_dir.display().to_string(),
            addr: self.addr(),
            backend: self.backend.to_string(),
            log_format: format!("{:?}", self.log.format).to_lowercase(),
            log_level: self.log.level.clone(),
            stream_buffer: self.stream_buffer,
            shutdown_timeout_secs: self.shutdown_timeout.as_secs(),
        }
    }
}
