//! Client configuration.
//!
//! Defaults point at the public World Bank endpoints. Every value can be
//! overridden in code or through `WBD_*` environment variables, which is how
//! the tests aim the client at a mock server.

use crate::error::{Result, WbdError};
use std::time::Duration;

pub const DEFAULT_INDICATOR_URL: &str = "https://api.worldbank.org/v2";
pub const DEFAULT_CLIMATE_URL: &str = "http://climatedataapi.worldbank.org/climateweb/rest";
pub const DEFAULT_COMMON_URL: &str = "https://data.worldbank.org/indicator?tab=all";
pub const DEFAULT_FEATURED_URL: &str = "https://data.worldbank.org/indicator?tab=featured";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base of the Indicators API (v2), without trailing slash.
    pub indicator_base_url: String,
    /// Base of the Climate Data API, without trailing slash.
    pub climate_base_url: String,
    /// Page listing every "common" indicator.
    pub common_indicators_url: String,
    /// Page listing the "featured" indicators.
    pub featured_indicators_url: String,
    pub timeout: Duration,
    pub connect_timeout: Duration,
    /// Page size asked of list endpoints.
    pub per_page: u32,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            indicator_base_url: DEFAULT_INDICATOR_URL.into(),
            climate_base_url: DEFAULT_CLIMATE_URL.into(),
            common_indicators_url: DEFAULT_COMMON_URL.into(),
            featured_indicators_url: DEFAULT_FEATURED_URL.into(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            per_page: 20_000,
            user_agent: concat!("simple_wbd/", env!("CARGO_PKG_VERSION")).into(),
        }
    }
}

impl ClientConfig {
    /// Defaults overlaid with `WBD_INDICATOR_URL`, `WBD_CLIMATE_URL`,
    /// `WBD_TIMEOUT_SECS` and `WBD_PER_PAGE` from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ClientConfig::from_env`] with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        if let Some(url) = non_empty(lookup("WBD_INDICATOR_URL")) {
            cfg.indicator_base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(url) = non_empty(lookup("WBD_CLIMATE_URL")) {
            cfg.climate_base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(secs) = non_empty(lookup("WBD_TIMEOUT_SECS")) {
            let secs: u64 = secs.parse().map_err(|_| {
                WbdError::InvalidArgument(format!("WBD_TIMEOUT_SECS is not a number: {secs}"))
            })?;
            cfg.timeout = Duration::from_secs(secs);
        }
        if let Some(n) = non_empty(lookup("WBD_PER_PAGE")) {
            cfg.per_page = match n.parse::<u32>() {
                Ok(v) if v > 0 => v,
                _ => {
                    return Err(WbdError::InvalidArgument(format!(
                        "WBD_PER_PAGE must be a positive number: {n}"
                    )));
                }
            };
        }
        Ok(cfg)
    }
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}
