//! Engine configuration, read once from the environment.
//!
//! Parsing goes through a lookup function so tests never touch the process
//! environment. Blank values count as unset.

use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use implodesc_carbon::Decimal;
use implodesc_providers::ProviderConfig;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name}={value:?} is invalid: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    fn invalid(name: &'static str, value: impl Into<String>, reason: impl Display) -> Self {
        Self::Invalid {
            name,
            value: value.into(),
            reason: reason.to_string(),
        }
    }
}

/// What `SubmitClarifications` does when the session already left `Pending`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResubmissionPolicy {
    /// No mutation; report the current status.
    #[default]
    ReturnCurrent,
    /// Fail with `AlreadySubmitted`.
    Reject,
    /// Reopen a finished session and run the analysis again.
    Redo,
}

impl FromStr for ResubmissionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "return_current" => Ok(Self::ReturnCurrent),
            "reject" => Ok(Self::Reject),
            "redo" => Ok(Self::Redo),
            other => Err(format!("expected return_current, reject or redo, got {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub provider: ProviderConfig,
    /// Idle sessions older than this are removed by the sweep.
    pub session_ttl: Duration,
    /// Upper bound on stored sessions.
    pub max_sessions: usize,
    pub resubmission_policy: ResubmissionPolicy,
    /// Mass per unit: the shipment weight for transport estimates, and the
    /// mass split evenly across reported materials.
    pub unit_weight_tonnes: Decimal,
    /// Added to the creation time to give the estimated completion time.
    pub completion_horizon: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::default(),
            session_ttl: Duration::from_secs(3600),
            max_sessions: 1000,
            resubmission_policy: ResubmissionPolicy::default(),
            unit_weight_tonnes: Decimal::from_micros(1_000),
            completion_horizon: Duration::from_secs(30),
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let provider_defaults = defaults.provider.clone();

        let max_attempts: u32 = parse_or(&lookup, "EXTERNAL_API_RETRIES", provider_defaults.max_attempts)?;
        if max_attempts == 0 {
            return Err(ConfigError::invalid("EXTERNAL_API_RETRIES", "0", "must be at least 1"));
        }

        let temperature: f32 = parse_or(&lookup, "AI_TEMPERATURE", provider_defaults.temperature)?;
        if !(0.0..=2.0).contains(&temperature) {
            return Err(ConfigError::invalid(
                "AI_TEMPERATURE",
                temperature.to_string(),
                "must be within [0, 2]",
            ));
        }

        let provider = ProviderConfig {
            openai_api_key: var(&lookup, "OPENAI_API_KEY"),
            anthropic_api_key: var(&lookup, "ANTHROPIC_API_KEY"),
            openai_model: var(&lookup, "DEFAULT_AI_MODEL").unwrap_or(provider_defaults.openai_model),
            anthropic_model: var(&lookup, "ANTHROPIC_MODEL").unwrap_or(provider_defaults.anthropic_model),
            max_tokens: parse_or(&lookup, "AI_MAX_TOKENS", provider_defaults.max_tokens)?,
            temperature,
            timeout: Duration::from_secs(parse_or(
                &lookup,
                "EXTERNAL_API_TIMEOUT",
                provider_defaults.timeout.as_secs(),
            )?),
            max_attempts,
        };

        let max_sessions: usize = parse_or(&lookup, "MAX_SESSIONS", defaults.max_sessions)?;
        if max_sessions == 0 {
            return Err(ConfigError::invalid("MAX_SESSIONS", "0", "must be at least 1"));
        }

        let unit_weight_tonnes: Decimal =
            parse_or(&lookup, "UNIT_WEIGHT_TONNES", defaults.unit_weight_tonnes)?;
        if !unit_weight_tonnes.is_positive() {
            return Err(ConfigError::invalid(
                "UNIT_WEIGHT_TONNES",
                unit_weight_tonnes.to_string(),
                "must be positive",
            ));
        }

        Ok(Self {
            provider,
            session_ttl: Duration::from_secs(parse_or(
                &lookup,
                "SESSION_TTL_SECS",
                defaults.session_ttl.as_secs(),
            )?),
            max_sessions,
            resubmission_policy: parse_or(&lookup, "RESUBMISSION_POLICY", defaults.resubmission_policy)?,
            unit_weight_tonnes,
            completion_horizon: defaults.completion_horizon,
        })
    }
}

/// Trimmed, non-blank value of `name`.
pub fn var<F>(lookup: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse `name` if set, else return `default`.
pub fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    match var(lookup, name) {
        Some(raw) => raw
            .parse()
            .map_err(|err| ConfigError::invalid(name, raw.clone(), err)),
        None => Ok(default),
    }
}
