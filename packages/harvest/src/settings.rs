//! Process settings from `HARVEST_*` environment variables, with `.env`
//! support.

use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{ConfigError, ConfigResult};

/// Process settings loaded from environment variables
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Default timeout for HTTP connectors
    pub http_timeout: Duration,
    pub user_agent: String,
    /// Cap on in-flight HTTP requests across the process
    pub max_concurrent_requests: usize,
    /// Optional per-host request quota
    pub requests_per_second: Option<u32>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            http_timeout: Duration::from_secs(30),
            user_agent: "harvest/0.1".to_string(),
            max_concurrent_requests: 16,
            requests_per_second: None,
        }
    }
}

impl Settings {
    /// Load settings from environment variables
    pub fn from_env() -> ConfigResult<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        let defaults = Self::default();
        Ok(Self {
            http_timeout: parse_var::<u64>("HARVEST_HTTP_TIMEOUT_SECS")?
                .map_or(defaults.http_timeout, Duration::from_secs),
            user_agent: env::var("HARVEST_USER_AGENT").unwrap_or(defaults.user_agent),
            max_concurrent_requests: match parse_var::<usize>("HARVEST_MAX_CONCURRENT_REQUESTS")? {
                Some(0) => {
                    return Err(ConfigError::InvalidSetting {
                        name: "HARVEST_MAX_CONCURRENT_REQUESTS".to_string(),
                        value: "0".to_string(),
                    })
                }
                Some(n) => n,
                None => defaults.max_concurrent_requests,
            },
            requests_per_second: parse_var::<u32>("HARVEST_REQUESTS_PER_SECOND")?
                .filter(|rps| *rps > 0),
        })
    }
}

fn parse_var<T: FromStr>(name: &str) -> ConfigResult<Option<T>> {
    match env::var(name) {
        Ok(value) if value.trim().is_empty() => Ok(None),
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidSetting {
                name: name.to_string(),
                value,
            }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_var() {
        env::set_var("HARVEST_SETTINGS_TEST_NUMBER", " 12 ");
        env::set_var("HARVEST_SETTINGS_TEST_BAD", "twelve");
        env::set_var("HARVEST_SETTINGS_TEST_BLANK", "");

        assert_eq!(parse_var::<u64>("HARVEST_SETTINGS_TEST_NUMBER").unwrap(), Some(12));
        assert_eq!(parse_var::<u64>("HARVEST_SETTINGS_TEST_BLANK").unwrap(), None);
        assert_eq!(parse_var::<u64>("HARVEST_SETTINGS_TEST_UNSET").unwrap(), None);
        assert!(matches!(
            parse_var::<u64>("HARVEST_SETTINGS_TEST_BAD"),
            Err(ConfigError::InvalidSetting { name, .. }) if name == "HARVEST_SETTINGS_TEST_BAD"
        ));
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.http_timeout, Duration::from_secs(30));
        assert_eq!(settings.max_concurrent_requests, 16);
        assert!(settings.requests_per_second.is_none());
    }
}
