//! Runtime configuration resolved from the environment.
//!
//! # Responsibility
//! - Resolve store path, log settings and reminder policy for hosts
//!   (FFI, CLI) in one place.
//!
//! # Invariants
//! - Unset or blank variables fall back to defaults.
//! - Set but invalid values are errors, never silently ignored.

use crate::logging::{default_log_level, normalize_level};
use crate::reminder::scheduler::PastTriggerPolicy;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const ENV_DB_PATH: &str = "DAILYTASKS_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "DAILYTASKS_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "DAILYTASKS_LOG_DIR";
pub const ENV_PAST_TRIGGER_POLICY: &str = "DAILYTASKS_PAST_TRIGGER_POLICY";

const DEFAULT_DB_FILE_NAME: &str = "dailytasks.sqlite3";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidLogLevel(String),
    InvalidPastTriggerPolicy(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidLogLevel(message) => write!(f, "{ENV_LOG_LEVEL}: {message}"),
            Self::InvalidPastTriggerPolicy(value) => write!(
                f,
                "{ENV_PAST_TRIGGER_POLICY}: unsupported policy `{value}`; expected fire_immediately|next_day|decline"
            ),
        }
    }
}

impl Error for ConfigError {}

/// Effective core settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub db_path: PathBuf,
    pub log_level: &'static str,
    /// `None` leaves logging uninitialized.
    pub log_dir: Option<PathBuf>,
    pub past_trigger_policy: PastTriggerPolicy,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: std::env::temp_dir().join(DEFAULT_DB_FILE_NAME),
            log_level: default_log_level(),
            log_dir: None,
            past_trigger_policy: PastTriggerPolicy::default(),
        }
    }
}

impl CoreConfig {
    /// Resolves settings from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves settings through `lookup`, which maps a variable name to its value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let mut config = Self::default();

        if let Some(path) = read(ENV_DB_PATH) {
            config.db_path = PathBuf::from(path);
        }
        if let Some(level) = read(ENV_LOG_LEVEL) {
            config.log_level = normalize_level(&level).map_err(ConfigError::InvalidLogLevel)?;
        }
        if let Some(dir) = read(ENV_LOG_DIR) {
            config.log_dir = Some(PathBuf::from(dir));
        }
        if let Some(policy) = read(ENV_PAST_TRIGGER_POLICY) {
            config.past_trigger_policy = PastTriggerPolicy::parse(&policy)
                .ok_or(ConfigError::InvalidPastTriggerPolicy(policy))?;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, CoreConfig, ENV_DB_PATH, ENV_LOG_LEVEL, ENV_PAST_TRIGGER_POLICY};
    use crate::reminder::scheduler::PastTriggerPolicy;
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect::<HashMap<_, _>>();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = CoreConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, CoreConfig::default());
        assert_eq!(config.past_trigger_policy, PastTriggerPolicy::NextDay);
    }

    #[test]
    fn explicit_values_override_defaults() {
        let config = CoreConfig::from_lookup(lookup(&[
            (ENV_DB_PATH, " /data/tasks.db "),
            (ENV_LOG_LEVEL, "WARNING"),
            (ENV_PAST_TRIGGER_POLICY, "decline"),
        ]))
        .unwrap();
        assert_eq!(config.db_path, PathBuf::from("/data/tasks.db"));
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.past_trigger_policy, PastTriggerPolicy::Decline);
    }

    #[test]
    fn invalid_policy_is_rejected() {
        let err = CoreConfig::from_lookup(lookup(&[(ENV_PAST_TRIGGER_POLICY, "someday")]))
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidPastTriggerPolicy("someday".to_string())
        );
    }
}
