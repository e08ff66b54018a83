use std::env;
use std::time::Duration;

use crate::error::OracleError;
use crate::oracle::ClaudeOracle;
use crate::orchestrator::DEFAULT_ORACLE_TIMEOUT;

pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
pub const DEFAULT_MAX_TOKENS: u32 = 4000;

/// Oracle configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub anthropic_api_key: Option<String>,
    pub model: String,
    pub base_url: Option<String>,
    pub max_tokens: u32,
    pub oracle_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            anthropic_api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: None,
            max_tokens: DEFAULT_MAX_TOKENS,
            oracle_timeout: DEFAULT_ORACLE_TIMEOUT,
        }
    }
}

impl Config {
    /// Read `ANTHROPIC_API_KEY` and the `DRAFTGUARD_*` overrides.
    /// Unset or unparseable values fall back to the defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            anthropic_api_key: lookup("ANTHROPIC_API_KEY").filter(|k| !k.is_empty()),
            model: lookup("DRAFTGUARD_MODEL").unwrap_or(defaults.model),
            base_url: lookup("DRAFTGUARD_BASE_URL"),
            max_tokens: lookup("DRAFTGUARD_MAX_TOKENS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_tokens),
            oracle_timeout: lookup("DRAFTGUARD_ORACLE_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.oracle_timeout),
        }
    }

    pub fn claude_oracle(&self) -> Result<ClaudeOracle, OracleError> {
        let api_key = self.anthropic_api_key.as_deref().ok_or_else(|| {
            OracleError::Config("ANTHROPIC_API_KEY environment variable not set".to_string())
        })?;
        let oracle = ClaudeOracle::new(api_key, &self.model).with_max_tokens(self.max_tokens);
        Ok(match &self.base_url {
            Some(url) => oracle.with_base_url(url),
            None => oracle,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = Config::from_lookup(lookup(&[]));
        assert_eq!(config, Config::default());
        assert!(matches!(config.claude_oracle(), Err(OracleError::Config(_))));
    }

    #[test]
    fn reads_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("ANTHROPIC_API_KEY", "sk-ant-test"),
            ("DRAFTGUARD_MODEL", "claude-test"),
            ("DRAFTGUARD_MAX_TOKENS", "1200"),
            ("DRAFTGUARD_ORACLE_TIMEOUT_SECS", "5"),
        ]));
        assert_eq!(config.model, "claude-test");
        assert_eq!(config.max_tokens, 1200);
        assert_eq!(config.oracle_timeout, Duration::from_secs(5));
        assert_eq!(config.claude_oracle().unwrap().model(), "claude-test");
    }

    #[test]
    fn ignores_unparseable_numbers() {
        let config = Config::from_lookup(lookup(&[("DRAFTGUARD_MAX_TOKENS", "lots")]));
        assert_eq!(config.max_tokens, DEFAULT_MAX_TOKENS);
    }
}
