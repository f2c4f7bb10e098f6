//! Configuration and composition root.
//!
//! [`ResilienceConfig`] collects every tunable of the generation layer. It can
//! be deserialized from a settings file, built in code, or read from the
//! environment, and is validated before anything is constructed from it.
//! API keys are never read from settings files; they come from the
//! environment or from code.

use std::env;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;
use serde::Deserialize;
use validator::Validate;

use crate::dispatch::{DispatchPolicy, Dispatcher};
use crate::error::GenerationError;
use crate::extract::DEFAULT_MAX_DEPTH;
use crate::health::{DEFAULT_COOLDOWN, DEFAULT_FAILURE_RATIO, DEFAULT_MIN_SAMPLES, HealthMonitor, HealthPolicy};

#[cfg(feature = "gemini")]
use crate::providers::gemini;
#[cfg(feature = "openai-compatible")]
use crate::providers::openai_compatible;

/// Health thresholds.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(default)]
pub struct HealthSettings {
    #[validate(range(min = 1, message = "min_samples must be at least 1"))]
    pub min_samples: u64,
    #[validate(range(min = 0.0, max = 1.0, message = "failure_ratio must be within 0.0..=1.0"))]
    pub failure_ratio: f64,
    pub cooldown_secs: u64,
}

impl Default for HealthSettings {
    fn default() -> Self {
        Self {
            min_samples: DEFAULT_MIN_SAMPLES,
            failure_ratio: DEFAULT_FAILURE_RATIO,
            cooldown_secs: DEFAULT_COOLDOWN.as_secs(),
        }
    }
}

impl HealthSettings {
    pub fn policy(&self) -> HealthPolicy {
        HealthPolicy::default()
            .with_min_samples(self.min_samples)
            .with_failure_ratio(self.failure_ratio)
            .with_cooldown(Duration::from_secs(self.cooldown_secs))
    }
}

/// Hosted Gemini provider.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(default)]
pub struct GeminiSettings {
    #[serde(skip)]
    pub api_key: Option<SecretString>,
    #[validate(url(message = "gemini base_url must be a valid URL"))]
    pub base_url: String,
    #[validate(length(min = 1, message = "gemini model cannot be empty"))]
    pub model: String,
}

impl Default for GeminiSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-1.5-flash".to_string(),
        }
    }
}

/// Free OpenAI-compatible backup provider.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(default)]
pub struct BackupSettings {
    pub enabled: bool,
    #[serde(skip)]
    pub api_key: Option<SecretString>,
    #[validate(url(message = "backup base_url must be a valid URL"))]
    pub base_url: String,
    #[validate(length(min = 1, message = "backup model cannot be empty"))]
    pub model: String,
    pub max_tokens: Option<u32>,
}

impl Default for BackupSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: None,
            base_url: "https://gen.pollinations.ai/v1".to_string(),
            model: "openai".to_string(),
            max_tokens: None,
        }
    }
}

/// Every tunable of the generation layer.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(default)]
pub struct ResilienceConfig {
    #[validate(range(min = 1, max = 10, message = "attempts_per_candidate must be between 1 and 10"))]
    pub attempts_per_candidate: u32,
    #[validate(range(max = 60_000, message = "backoff_ms must not exceed one minute"))]
    pub backoff_ms: u64,
    #[validate(range(min = 0.0, max = 1.0, message = "jitter_factor must be within 0.0..=1.0"))]
    pub jitter_factor: f64,
    #[validate(range(min = 1, max = 600, message = "timeout_secs must be between 1 and 600"))]
    pub timeout_secs: u64,
    pub json_enforcement: bool,
    #[validate(range(min = 1, max = 128, message = "max_extraction_depth must be between 1 and 128"))]
    pub max_extraction_depth: usize,
    #[validate(nested)]
    pub health: HealthSettings,
    #[validate(nested)]
    pub gemini: GeminiSettings,
    #[validate(nested)]
    pub backup: BackupSettings,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            attempts_per_candidate: 2,
            backoff_ms: 1000,
            jitter_factor: 0.0,
            timeout_secs: 60,
            json_enforcement: true,
            max_extraction_depth: DEFAULT_MAX_DEPTH,
            health: HealthSettings::default(),
            gemini: GeminiSettings::default(),
            backup: BackupSettings::default(),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T: FromStr>(name: &str) -> Result<Option<T>, GenerationError>
where
    T::Err: std::fmt::Display,
{
    non_empty_var(name)
        .map(|raw| {
            raw.trim().parse::<T>().map_err(|e| {
                GenerationError::ConfigurationError(format!("{name}={raw:?} is invalid: {e}"))
            })
        })
        .transpose()
}

impl ResilienceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by environment variables.
    ///
    /// | variable | field |
    /// |---|---|
    /// | `GEMINI_API_KEY`, then `GOOGLE_GENAI_API_KEY` | `gemini.api_key` |
    /// | `GEMINI_BASE_URL` | `gemini.base_url` |
    /// | `GEMINI_MODEL` | `gemini.model` |
    /// | `POLLINATIONS_API_KEY` | `backup.api_key` |
    /// | `BACKUP_BASE_URL` | `backup.base_url` |
    /// | `BACKUP_MODEL` | `backup.model` |
    /// | `MINDSCAPE_ATTEMPTS_PER_CANDIDATE` | `attempts_per_candidate` |
    /// | `MINDSCAPE_BACKOFF_MS` | `backoff_ms` |
    pub fn from_env() -> Result<Self, GenerationError> {
        let mut config = Self::default();

        if let Some(key) = non_empty_var("GEMINI_API_KEY").or_else(|| non_empty_var("GOOGLE_GENAI_API_KEY")) {
            config.gemini.api_key = Some(SecretString::from(key));
        }
        if let Some(url) = non_empty_var("GEMINI_BASE_URL") {
            config.gemini.base_url = url;
        }
        if let Some(model) = non_empty_var("GEMINI_MODEL") {
            config.gemini.model = model;
        }
        if let Some(key) = non_empty_var("POLLINATIONS_API_KEY") {
            config.backup.api_key = Some(SecretString::from(key));
        }
        if let Some(url) = non_empty_var("BACKUP_BASE_URL") {
            config.backup.base_url = url;
        }
        if let Some(model) = non_empty_var("BACKUP_MODEL") {
            config.backup.model = model;
        }
        if let Some(attempts) = parse_var("MINDSCAPE_ATTEMPTS_PER_CANDIDATE")? {
            config.attempts_per_candidate = attempts;
        }
        if let Some(backoff) = parse_var("MINDSCAPE_BACKOFF_MS")? {
            config.backoff_ms = backoff;
        }

        config.validate_config()?;
        Ok(config)
    }

    pub fn with_gemini_api_key(mut self, api_key: impl Into<String>) -> Self {
        let key: String = api_key.into();
        self.gemini.api_key = (!key.trim().is_empty()).then(|| SecretString::from(key));
        self
    }

    pub fn with_backup_api_key(mut self, api_key: impl Into<String>) -> Self {
        let key: String = api_key.into();
        self.backup.api_key = (!key.trim().is_empty()).then(|| SecretString::from(key));
        self
    }

    pub const fn with_attempts_per_candidate(mut self, attempts: u32) -> Self {
        self.attempts_per_candidate = attempts;
        self
    }

    pub const fn with_backoff_ms(mut self, backoff_ms: u64) -> Self {
        self.backoff_ms = backoff_ms;
        self
    }

    pub fn validate_config(&self) -> Result<(), GenerationError> {
        self.validate()
            .map_err(|e| GenerationError::ConfigurationError(e.to_string()))
    }

    pub fn dispatch_policy(&self) -> DispatchPolicy {
        DispatchPolicy::new()
            .with_attempts_per_candidate(self.attempts_per_candidate)
            .with_backoff(Duration::from_millis(self.backoff_ms))
            .with_jitter_factor(self.jitter_factor)
            .with_json_enforcement(self.json_enforcement)
            .with_max_extraction_depth(self.max_extraction_depth)
    }

    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn health_monitor(&self) -> Arc<HealthMonitor> {
        Arc::new(HealthMonitor::with_policy(self.health.policy()))
    }

    /// Build a dispatcher with a fresh health monitor.
    pub fn build_dispatcher(&self) -> Result<Dispatcher, GenerationError> {
        self.build_dispatcher_with_monitor(self.health_monitor())
    }

    /// Build a dispatcher around a monitor owned by the caller.
    ///
    /// Registers the hosted Gemini adapter when a server key is configured,
    /// a Gemini adapter for caller-supplied keys, and the backup adapter
    /// unless it is disabled.
    pub fn build_dispatcher_with_monitor(&self, monitor: Arc<HealthMonitor>) -> Result<Dispatcher, GenerationError> {
        self.validate_config()?;

        #[allow(unused_mut)]
        let mut builder = Dispatcher::builder()
            .monitor(monitor)
            .policy(self.dispatch_policy());

        #[cfg(feature = "gemini")]
        {
            let base = gemini::GeminiConfig::default()
                .with_base_url(self.gemini.base_url.clone())
                .with_model(self.gemini.model.clone())
                .with_timeout(self.timeout());
            if let Some(key) = &self.gemini.api_key {
                let hosted = gemini::GeminiConfig {
                    api_key: Some(key.clone()),
                    ..base.clone()
                };
                builder = builder.adapter(gemini::GeminiAdapter::new(hosted)?);
            } else {
                tracing::warn!(
                    target: "mindscape_ai::dispatch",
                    "no Gemini API key configured, the hosted provider is disabled"
                );
            }
            builder = builder.adapter(
                gemini::GeminiAdapter::new(base)?.with_id(crate::types::ProviderId::CustomKey),
            );
        }

        #[cfg(feature = "openai-compatible")]
        {
            if self.backup.enabled {
                let config = openai_compatible::OpenAiCompatibleConfig {
                    api_key: self.backup.api_key.clone(),
                    base_url: self.backup.base_url.clone(),
                    model: self.backup.model.clone(),
                    timeout: self.timeout(),
                    max_tokens: self.backup.max_tokens,
                };
                builder = builder.adapter(openai_compatible::OpenAiCompatibleAdapter::new(config)?);
            }
        }

        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProviderId;

    #[test]
    fn defaults_are_valid() {
        let config = ResilienceConfig::default();
        assert!(config.validate_config().is_ok());
        let policy = config.dispatch_policy();
        assert_eq!(policy.attempts_per_candidate, 2);
        assert_eq!(policy.backoff, Duration::from_millis(1000));
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let config = ResilienceConfig::default().with_attempts_per_candidate(0);
        assert!(matches!(
            config.validate_config(),
            Err(GenerationError::ConfigurationError(_))
        ));

        let mut config = ResilienceConfig::default();
        config.health.failure_ratio = 1.5;
        assert!(config.validate_config().is_err());

        let mut config = ResilienceConfig::default();
        config.backup.base_url = "not a url".to_string();
        assert!(config.validate_config().is_err());
    }

    #[test]
    fn deserializes_partial_settings() {
        let config: ResilienceConfig = serde_json::from_value(serde_json::json!({
            "attempts_per_candidate": 3,
            "health": {"cooldown_secs": 60},
            "backup": {"model": "mistral"}
        }))
        .unwrap();
        assert_eq!(config.attempts_per_candidate, 3);
        assert_eq!(config.health.cooldown_secs, 60);
        assert_eq!(config.health.min_samples, 5);
        assert_eq!(config.backup.model, "mistral");
        assert!(config.gemini.api_key.is_none());
    }

    #[cfg(feature = "all-providers")]
    #[test]
    fn composition_root_registers_adapters() {
        let dispatcher = ResilienceConfig::default()
            .with_gemini_api_key("server-key")
            .build_dispatcher()
            .unwrap();
        assert_eq!(
            dispatcher.providers(),
            vec![ProviderId::Backup, ProviderId::CustomKey, ProviderId::Hosted]
        );

        let dispatcher = ResilienceConfig::default().build_dispatcher().unwrap();
        assert!(!dispatcher.providers().contains(&ProviderId::Hosted));
    }
}
