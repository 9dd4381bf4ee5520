// THEORY:
// All tunables live in one `SentinelConfig`, read once at startup from the
// process environment (binaries call `dotenv` first, so a `.env` file works
// too). Defaults match the field deployment: a 15 second cooldown
// between analyses, ~20 fps playback pacing, and no request timeout.
//
// A variable that is present but unparsable is an error, never a silent
// fallback to the default.

use crate::error::ConfigError;
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_API_KEY: &str = "GOOGLE_API_KEY";
pub const ENV_MODEL: &str = "SENTINEL_MODEL";
pub const ENV_API_BASE: &str = "SENTINEL_API_BASE";
pub const ENV_RULES_DB: &str = "SENTINEL_RULES_DB";
pub const ENV_FEED: &str = "SENTINEL_FEED";
pub const ENV_COOLDOWN_SECS: &str = "SENTINEL_COOLDOWN_SECS";
pub const ENV_FRAME_DELAY_MS: &str = "SENTINEL_FRAME_DELAY_MS";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "SENTINEL_REQUEST_TIMEOUT_SECS";

pub const DEFAULT_MODEL: &str = "gemini-flash-latest";
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_RULES_DB: &str = "sentinel_rules.db";
pub const DEFAULT_FEED: &str = "assets/hazard_feed.mp4";
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(15);
pub const DEFAULT_FRAME_DELAY: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, PartialEq)]
pub struct SentinelConfig {
    /// Key for the vision backend. Only the gateway binaries require it.
    pub api_key: Option<String>,
    pub model: String,
    pub api_base: String,
    /// SQLite file holding the rule graph.
    pub rules_db: PathBuf,
    /// Default video feed when none is given on the command line.
    pub feed: PathBuf,
    /// Minimum time between two analysis calls.
    pub cooldown: Duration,
    /// Sleep after every frame, to pace playback.
    pub frame_delay: Duration,
    /// Per-request timeout for the gateway. `None` waits indefinitely.
    pub request_timeout: Option<Duration>,
}

impl Default for SentinelConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            rules_db: PathBuf::from(DEFAULT_RULES_DB),
            feed: PathBuf::from(DEFAULT_FEED),
            cooldown: DEFAULT_COOLDOWN,
            frame_delay: DEFAULT_FRAME_DELAY,
            request_timeout: None,
        }
    }
}

impl SentinelConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a config from any name -> value lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let cooldown = match get(ENV_COOLDOWN_SECS) {
            Some(raw) => parse_seconds(ENV_COOLDOWN_SECS, &raw)?,
            None => defaults.cooldown,
        };
        let frame_delay = match get(ENV_FRAME_DELAY_MS) {
            Some(raw) => Duration::from_millis(parse_u64(ENV_FRAME_DELAY_MS, &raw)?),
            None => defaults.frame_delay,
        };
        let request_timeout = match get(ENV_REQUEST_TIMEOUT_SECS) {
            Some(raw) => {
                let timeout = parse_seconds(ENV_REQUEST_TIMEOUT_SECS, &raw)?;
                if timeout.is_zero() {
                    return Err(invalid(ENV_REQUEST_TIMEOUT_SECS, &raw, "must be greater than zero"));
                }
                Some(timeout)
            }
            None => None,
        };

        Ok(Self {
            api_key: get(ENV_API_KEY),
            model: get(ENV_MODEL).unwrap_or(defaults.model),
            api_base: get(ENV_API_BASE).unwrap_or(defaults.api_base),
            rules_db: get(ENV_RULES_DB).map(PathBuf::from).unwrap_or(defaults.rules_db),
            feed: get(ENV_FEED).map(PathBuf::from).unwrap_or(defaults.feed),
            cooldown,
            frame_delay,
            request_timeout,
        })
    }

    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.api_key.as_deref().ok_or(ConfigError::MissingVar(ENV_API_KEY))
    }
}

fn parse_seconds(name: &'static str, raw: &str) -> Result<Duration, ConfigError> {
    let secs: f64 = raw.parse().map_err(|_| invalid(name, raw, "expected a number of seconds"))?;
    Duration::try_from_secs_f64(secs).map_err(|_| invalid(name, raw, "must be a finite, non-negative number"))
}

fn parse_u64(name: &'static str, raw: &str) -> Result<u64, ConfigError> {
    raw.parse()
        .map_err(|_| invalid(name, raw, "expected a non-negative integer"))
}

fn invalid(name: &'static str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidVar {
        name,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<SentinelConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        SentinelConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config, SentinelConfig::default());
        assert_eq!(config.cooldown, Duration::from_secs(15));
        assert!(config.request_timeout.is_none());
    }

    #[test]
    fn overrides_are_applied() {
        let config = config_from(&[
            (ENV_API_KEY, "abc"),
            (ENV_MODEL, "gemini-2.0-flash"),
            (ENV_RULES_DB, "/tmp/rules.db"),
            (ENV_COOLDOWN_SECS, "2.5"),
            (ENV_FRAME_DELAY_MS, "0"),
            (ENV_REQUEST_TIMEOUT_SECS, "30"),
        ])
        .unwrap();
        assert_eq!(config.require_api_key().unwrap(), "abc");
        assert_eq!(config.model, "gemini-2.0-flash");
        assert_eq!(config.rules_db, PathBuf::from("/tmp/rules.db"));
        assert_eq!(config.cooldown, Duration::from_millis(2500));
        assert_eq!(config.frame_delay, Duration::ZERO);
        assert_eq!(config.request_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn blank_values_count_as_unset() {
        let config = config_from(&[(ENV_API_KEY, "   "), (ENV_MODEL, "")]).unwrap();
        assert!(config.api_key.is_none());
        assert_eq!(config.model, DEFAULT_MODEL);
        assert!(matches!(config.require_api_key(), Err(ConfigError::MissingVar(ENV_API_KEY))));
    }

    #[test]
    fn garbage_numbers_are_rejected() {
        let err = config_from(&[(ENV_COOLDOWN_SECS, "soon")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidVar { name: ENV_COOLDOWN_SECS, .. }));

        let err = config_from(&[(ENV_COOLDOWN_SECS, "-1")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidVar { name: ENV_COOLDOWN_SECS, .. }));

        let err = config_from(&[(ENV_FRAME_DELAY_MS, "1.5")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidVar { name: ENV_FRAME_DELAY_MS, .. }));

        let err = config_from(&[(ENV_REQUEST_TIMEOUT_SECS, "0")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidVar { name: ENV_REQUEST_TIMEOUT_SECS, .. }));
    }
}
