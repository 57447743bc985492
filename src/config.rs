//! Container options.
//!
//! Options can be set programmatically, read from the environment, or (with
//! the `config` feature) deserialized from JSON.

use std::env;
use std::str::FromStr;

/// Environment variable selecting the [`FailurePolicy`].
pub const FAILURE_POLICY_ENV: &str = "DITORY_FAILURE_POLICY";
/// Environment variable toggling dependents tracking (`true`/`false`, `1`/`0`).
pub const TRACK_DEPENDENTS_ENV: &str = "DITORY_TRACK_DEPENDENTS";

/// What happens to an item whose resolver failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "config", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "config", serde(rename_all = "lowercase"))]
pub enum FailurePolicy {
    /// The stack is unwound and the next access invokes the resolver again.
    #[default]
    Retry,
    /// The failed slot is poisoned: later accesses return the same error
    /// without invoking the resolver again.
    Memoize,
}

impl FromStr for FailurePolicy {
    type Err = OptionsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "retry" => Ok(FailurePolicy::Retry),
            "memoize" | "poison" => Ok(FailurePolicy::Memoize),
            other => Err(OptionsError::InvalidValue {
                key: FAILURE_POLICY_ENV,
                value: other.to_string(),
            }),
        }
    }
}

/// Errors raised while loading options.
#[derive(Debug, thiserror::Error)]
pub enum OptionsError {
    #[error("invalid value `{value}` for {key}")]
    InvalidValue { key: &'static str, value: String },
    #[cfg(feature = "config")]
    #[error("malformed options document: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Behavior switches for containers created by a builder.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct ModuleOptions {
    pub failure_policy: FailurePolicy,
    /// Record, for every resolved item, the items that were above it on the
    /// stack. Disable to skip the bookkeeping on hot paths.
    pub track_dependents: bool,
}

impl Default for ModuleOptions {
    fn default() -> Self {
        Self {
            failure_policy: FailurePolicy::Retry,
            track_dependents: true,
        }
    }
}

impl ModuleOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn track_dependents(mut self, enabled: bool) -> Self {
        self.track_dependents = enabled;
        self
    }

    /// Defaults overridden by `DITORY_*` environment variables, where set.
    pub fn from_env() -> Result<Self, OptionsError> {
        let mut options = Self::default();
        if let Ok(value) = env::var(FAILURE_POLICY_ENV) {
            options.failure_policy = value.parse()?;
        }
        if let Ok(value) = env::var(TRACK_DEPENDENTS_ENV) {
            options.track_dependents = parse_bool(TRACK_DEPENDENTS_ENV, &value)?;
        }
        Ok(options)
    }

    /// Parses options from a JSON document; missing fields keep defaults.
    #[cfg(feature = "config")]
    pub fn from_json(json: &str) -> Result<Self, OptionsError> {
        Ok(serde_json::from_str(json)?)
    }
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, OptionsError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(OptionsError::InvalidValue {
            key,
            value: other.to_string(),
        }),
    }
}
