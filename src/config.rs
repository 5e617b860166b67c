// =============================================================================
// Process configuration — environment-sourced, loaded once at startup
// =============================================================================
//
// Every tunable the binary needs lives here, loaded once from the process
// environment and handed around as `Arc<Config>`. Unlike the hot-reloadable
// runtime configs elsewhere in the corpus, nothing in this service calls for
// live mutation, so this is parsed eagerly at startup and treated as
// immutable for the process lifetime. Every field carries a default so tests
// can build a `Config` with no environment at all.
// =============================================================================

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

fn default_mongo_uri() -> String {
    "mongodb://localhost:27017".to_string()
}

fn default_mongo_db_name() -> String {
    "screening".to_string()
}

fn default_ticker_service_url() -> String {
    "http://ticker-service:3000".to_string()
}

fn default_data_service_url() -> String {
    "http://data-service:3001".to_string()
}

fn default_screening_service_url() -> String {
    "http://screening-service:3002".to_string()
}

fn default_analysis_service_url() -> String {
    "http://analysis-service:3003".to_string()
}

fn default_leadership_service_url() -> String {
    "http://leadership-service:3004".to_string()
}

fn default_yf_proxy_refresh_secs() -> u64 {
    1800
}

fn default_finnhub_rate_limit() -> u32 {
    59
}

fn default_watchlist_refresh_hour_utc() -> u32 {
    5
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

/// Process-wide configuration resolved once at startup from the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_mongo_uri")]
    pub mongo_uri: String,
    #[serde(default = "default_mongo_db_name")]
    pub mongo_db_name: String,

    #[serde(default = "default_ticker_service_url")]
    pub ticker_service_url: String,
    #[serde(default = "default_data_service_url")]
    pub data_service_url: String,
    #[serde(default = "default_screening_service_url")]
    pub screening_service_url: String,
    #[serde(default = "default_analysis_service_url")]
    pub analysis_service_url: String,
    #[serde(default = "default_leadership_service_url")]
    pub leadership_service_url: String,

    #[serde(default)]
    pub cache_redis_url: Option<String>,

    #[serde(default = "default_yf_proxy_refresh_secs")]
    pub yf_proxy_refresh_secs: u64,
    #[serde(default)]
    pub http_proxies: Vec<String>,

    #[serde(default = "default_finnhub_rate_limit")]
    pub finnhub_rate_limit_per_minute: u32,

    #[serde(default = "default_watchlist_refresh_hour_utc")]
    pub watchlist_refresh_cron_hour_utc: u32,

    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            mongo_uri: default_mongo_uri(),
            mongo_db_name: default_mongo_db_name(),
            ticker_service_url: default_ticker_service_url(),
            data_service_url: default_data_service_url(),
            screening_service_url: default_screening_service_url(),
            analysis_service_url: default_analysis_service_url(),
            leadership_service_url: default_leadership_service_url(),
            cache_redis_url: None,
            yf_proxy_refresh_secs: default_yf_proxy_refresh_secs(),
            http_proxies: Vec::new(),
            finnhub_rate_limit_per_minute: default_finnhub_rate_limit(),
            watchlist_refresh_cron_hour_utc: default_watchlist_refresh_hour_utc(),
            bind_addr: default_bind_addr(),
        }
    }
}

impl Config {
    /// Resolve configuration from the process environment, failing fast on a
    /// malformed numeric or address field rather than falling back silently.
    pub fn from_env() -> Result<Self> {
        let mut cfg = Config::default();

        if let Ok(v) = std::env::var("MONGO_URI") {
            cfg.mongo_uri = v;
        }
        if let Ok(v) = std::env::var("MONGO_DB_NAME") {
            cfg.mongo_db_name = v;
        }
        if let Ok(v) = std::env::var("TICKER_SERVICE_URL") {
            cfg.ticker_service_url = v;
        }
        if let Ok(v) = std::env::var("DATA_SERVICE_URL") {
            cfg.data_service_url = v;
        }
        if let Ok(v) = std::env::var("SCREENING_SERVICE_URL") {
            cfg.screening_service_url = v;
        }
        if let Ok(v) = std::env::var("ANALYSIS_SERVICE_URL") {
            cfg.analysis_service_url = v;
        }
        if let Ok(v) = std::env::var("LEADERSHIP_SERVICE_URL") {
            cfg.leadership_service_url = v;
        }
        if let Ok(v) = std::env::var("CACHE_REDIS_URL") {
            cfg.cache_redis_url = Some(v);
        }
        if let Ok(v) = std::env::var("YF_PROXY_REFRESH_SECONDS") {
            cfg.yf_proxy_refresh_secs = v
                .parse()
                .context("YF_PROXY_REFRESH_SECONDS must be an integer")?;
        }
        if let Ok(v) = std::env::var("HTTP_PROXIES") {
            cfg.http_proxies = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Ok(v) = std::env::var("FINNHUB_RATE_LIMIT_PER_MINUTE") {
            cfg.finnhub_rate_limit_per_minute = v
                .parse()
                .context("FINNHUB_RATE_LIMIT_PER_MINUTE must be an integer")?;
        }
        if let Ok(v) = std::env::var("WATCHLIST_REFRESH_CRON_HOUR_UTC") {
            cfg.watchlist_refresh_cron_hour_utc = v
                .parse()
                .context("WATCHLIST_REFRESH_CRON_HOUR_UTC must be 0-23")?;
        }
        if let Ok(v) = std::env::var("BIND_ADDR") {
            v.parse::<std::net::SocketAddr>()
                .context("BIND_ADDR must be a valid socket address")?;
            cfg.bind_addr = v;
        }

        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_internally_consistent() {
        let cfg = Config::default();
        assert_eq!(cfg.mongo_uri, "mongodb://localhost:27017");
        assert_eq!(cfg.finnhub_rate_limit_per_minute, 59);
        assert_eq!(cfg.watchlist_refresh_cron_hour_utc, 5);
        assert!(cfg.http_proxies.is_empty());
    }

    #[test]
    fn bind_addr_default_parses() {
        let cfg = Config::default();
        assert!(cfg.bind_addr.parse::<std::net::SocketAddr>().is_ok());
    }
}
