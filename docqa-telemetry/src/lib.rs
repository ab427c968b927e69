//! # docqa-telemetry
//!
//! Logging for docqa, built on `tracing` and `tracing-subscriber`.
//!
//! [`init_telemetry`] installs the global subscriber once at startup: an
//! `EnvFilter` read from `RUST_LOG` (falling back to the configured default)
//! and a `fmt` layer in pretty or JSON form. [`capture`] records events in
//! memory so tests can assert on what was logged.
//!
//! ```rust,ignore
//! use docqa_telemetry::{LogFormat, TelemetryConfig, init_telemetry};
//!
//! init_telemetry(&TelemetryConfig::new("docqa-server").with_format(LogFormat::Json))?;
//! tracing::info!(collection = "documents", "ready");
//! ```

pub mod capture;

use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

pub use capture::{CaptureLayer, CapturedEvent, EventStorage, capture_events};

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("invalid log filter '{filter}': {message}")]
    Filter { filter: String, message: String },

    #[error("unknown log format '{0}', expected 'pretty' or 'json'")]
    UnknownFormat(String),

    #[error("failed to install subscriber: {0}")]
    Install(String),
}

pub type Result<T> = std::result::Result<T, TelemetryError>;

/// Output format of the `fmt` layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = TelemetryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(TelemetryError::UnknownFormat(other.to_string())),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pretty => "pretty",
            Self::Json => "json",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    pub service_name: String,
    pub format: LogFormat,
    /// Filter used when `RUST_LOG` is unset.
    pub default_filter: String,
}

impl TelemetryConfig {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self { service_name: service_name.into(), format: LogFormat::Pretty, default_filter: "info".to_string() }
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_default_filter(mut self, filter: impl Into<String>) -> Self {
        self.default_filter = filter.into();
        self
    }

    fn env_filter(&self) -> Result<EnvFilter> {
        if let Ok(filter) = EnvFilter::try_from_default_env() {
            return Ok(filter);
        }
        EnvFilter::try_new(&self.default_filter).map_err(|e| TelemetryError::Filter {
            filter: self.default_filter.clone(),
            message: e.to_string(),
        })
    }
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<()> {
    let filter = config.env_filter()?;
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match config.format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer().with_target(true)).try_init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .try_init(),
    };
    installed.map_err(|e| TelemetryError::Install(e.to_string()))?;

    tracing::info!(service = %config.service_name, format = %config.format, "telemetry initialized");
    Ok(())
}
