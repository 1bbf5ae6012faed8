//! Logging setup for the CLI.
//!
//! Structured logs are emitted through `tracing` with an `EnvFilter` in
//! front, so `RUST_LOG` overrides whatever the settings file asks for.
//! `log` macro callers are bridged into the same subscriber. Everything
//! goes to stderr; stdout is reserved for command output.

use serde::Deserialize;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoggerLevel {
    #[serde(alias = "debug", alias = "DEBUG")]
    Debug,
    #[serde(alias = "info", alias = "INFO")]
    Info,
    #[serde(alias = "warn", alias = "WARN")]
    Warn,
    #[serde(alias = "error", alias = "ERROR")]
    Error,
}

impl LoggerLevel {
    pub fn to_tracing_level(&self) -> LevelFilter {
        match self {
            LoggerLevel::Debug => LevelFilter::DEBUG,
            LoggerLevel::Info => LevelFilter::INFO,
            LoggerLevel::Warn => LevelFilter::WARN,
            LoggerLevel::Error => LevelFilter::ERROR,
        }
    }
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    #[serde(alias = "json", alias = "JSON")]
    Json,
    #[serde(alias = "text", alias = "TEXT")]
    Text,
}

#[derive(Deserialize, Debug, Clone)]
pub struct LoggerSettings {
    #[serde(default = "default_log_level")]
    pub level: LoggerLevel,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
}

fn default_log_level() -> LoggerLevel {
    LoggerLevel::Warn
}

fn default_log_format() -> LogFormat {
    LogFormat::Text
}

impl Default for LoggerSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

pub fn setup_logging(settings: &LoggerSettings) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.level.to_tracing_level().to_string()));

    let format_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true);

    if settings.format == LogFormat::Json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(format_layer.json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(format_layer.compact())
            .init();
    }
}
