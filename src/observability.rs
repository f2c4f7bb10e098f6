//! Tracing setup and log hygiene.
//!
//! The library only emits `tracing` events (targets under `mindscape_ai::`);
//! binaries that have no subscriber of their own can call [`init_tracing`].

use serde::Deserialize;
use tracing::Level;
use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::GenerationError;

/// Subscriber settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TracingConfig {
    /// Level for `mindscape_ai` targets when `RUST_LOG` is unset
    pub level: String,
    /// Emit JSON lines instead of human-readable text
    pub json: bool,
    pub with_target: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            with_target: true,
        }
    }
}

impl TracingConfig {
    pub fn json() -> Self {
        Self {
            json: true,
            ..Default::default()
        }
    }

    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }
}

/// Parse log level string to tracing Level
pub fn parse_log_level(level: &str) -> Result<Level, GenerationError> {
    match level.trim().to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" | "warning" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        other => Err(GenerationError::ConfigurationError(format!(
            "Invalid log level: {other}. Use trace, debug, info, warn, or error"
        ))),
    }
}

/// Install a global `fmt` subscriber.
///
/// `RUST_LOG` wins over the configured level. Calling this when a subscriber
/// is already installed is not an error.
pub fn init_tracing(config: &TracingConfig) -> Result<(), GenerationError> {
    let level = parse_log_level(&config.level)?;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("mindscape_ai={}", level.as_str().to_lowercase())));

    let registry = Registry::default().with(filter);
    let installed = if config.json {
        registry
            .with(fmt::layer().json().with_target(config.with_target))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_target(config.with_target))
            .try_init()
    };

    if installed.is_err() {
        tracing::debug!(target: "mindscape_ai", "tracing subscriber already installed");
    }
    Ok(())
}

/// Reduce a secret to its first and last four characters.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len().max(4));
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}
