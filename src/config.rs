use std::env;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0}")]
    Message(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct Config {
    pub port: u16,
    pub catalog_limit: usize,
    pub supplementary_limit: usize,
    pub allow_insecure_transports: bool,
    pub upstream: UpstreamConfig,
    pub iheart: IHeartConfig,
    pub radio_browser: RadioBrowserConfig,
}

/// Settings shared by both upstream HTTP clients.
#[derive(Debug, Clone, Serialize)]
pub struct UpstreamConfig {
    pub user_agent: String,
    /// Zero leaves the reqwest default (no timeout).
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct IHeartConfig {
    pub base_url: String,
    pub search_path: String,
    pub live_stations_path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RadioBrowserConfig {
    pub default_base_url: String,
    pub search_path: String,
    pub by_name_path: String,
    pub by_uuid_path: String,
    pub top_vote_path: String,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let port = env_u16("PORT", 5000)?;
        let catalog_limit = env_usize("CATALOG_LIMIT", 50)?.max(1);
        let supplementary_limit = env_usize("SUPPLEMENTARY_LIMIT", 10)?.max(1);
        let allow_insecure_transports = env::var("ALLOW_INSECURE_TRANSPORT")
            .map(|value| value == "true")
            .unwrap_or(false);
        let upstream = UpstreamConfig::from_env()?;
        let iheart = IHeartConfig::from_env(allow_insecure_transports)?;
        let radio_browser = RadioBrowserConfig::from_env(allow_insecure_transports)?;

        Ok(Self {
            port,
            catalog_limit,
            supplementary_limit,
            allow_insecure_transports,
            upstream,
            iheart,
            radio_browser,
        })
    }
}

impl UpstreamConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let user_agent = env::var("USER_AGENT")
            .unwrap_or_else(|_| format!("heartio-service/{}", env!("CARGO_PKG_VERSION")));
        if user_agent.trim().is_empty() {
            return Err(ConfigError::Message(
                "USER_AGENT cannot be blank.".into(),
            ));
        }
        let timeout_ms = env_u64("UPSTREAM_TIMEOUT_MS", 0)?;
        Ok(Self {
            user_agent,
            timeout_ms,
        })
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("heartio-service/{}", env!("CARGO_PKG_VERSION")),
            timeout_ms: 0,
        }
    }
}

impl IHeartConfig {
    pub const DEFAULT_BASE_URL: &'static str = "https://us.api.iheart.com";
    const DEFAULT_SEARCH_PATH: &'static str = "/api/v2/search/all";
    const DEFAULT_LIVE_STATIONS_PATH: &'static str = "/api/v2/content/liveStations";

    fn from_env(allow_insecure_transports: bool) -> Result<Self, ConfigError> {
        let config = Self {
            base_url: env::var("IHEART_BASE_URL")
                .unwrap_or_else(|_| Self::DEFAULT_BASE_URL.to_string()),
            search_path: env::var("IHEART_SEARCH_PATH")
                .unwrap_or_else(|_| Self::DEFAULT_SEARCH_PATH.to_string()),
            live_stations_path: env::var("IHEART_LIVE_STATIONS_PATH")
                .unwrap_or_else(|_| Self::DEFAULT_LIVE_STATIONS_PATH.to_string()),
        };
        config.validate(allow_insecure_transports)?;
        Ok(config)
    }

    /// Defaults pointed at another host; used by tests and local mocks.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            search_path: Self::DEFAULT_SEARCH_PATH.to_string(),
            live_stations_path: Self::DEFAULT_LIVE_STATIONS_PATH.to_string(),
        }
    }

    pub fn validate(&self, allow_insecure_transports: bool) -> Result<(), ConfigError> {
        validate_endpoints(
            "iHeart",
            &self.base_url,
            &[&self.search_path, &self.live_stations_path],
            allow_insecure_transports,
        )
    }
}

impl RadioBrowserConfig {
    pub const DEFAULT_BASE_URL: &'static str = "https://de1.api.radio-browser.info";
    const DEFAULT_SEARCH_PATH: &'static str = "/json/stations/search";
    const DEFAULT_BY_NAME_PATH: &'static str = "/json/stations/byname";
    const DEFAULT_BY_UUID_PATH: &'static str = "/json/stations/byuuid";
    const DEFAULT_TOP_VOTE_PATH: &'static str = "/json/stations/topvote";

    fn from_env(allow_insecure_transports: bool) -> Result<Self, ConfigError> {
        let mut config = Self::with_base_url(
            env::var("RADIO_BROWSER_BASE_URL")
                .unwrap_or_else(|_| Self::DEFAULT_BASE_URL.to_string()),
        );
        if let Ok(path) = env::var("RADIO_BROWSER_SEARCH_PATH") {
            config.search_path = path;
        }
        config.validate(allow_insecure_transports)?;
        Ok(config)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            default_base_url: base_url.into(),
            search_path: Self::DEFAULT_SEARCH_PATH.to_string(),
            by_name_path: Self::DEFAULT_BY_NAME_PATH.to_string(),
            by_uuid_path: Self::DEFAULT_BY_UUID_PATH.to_string(),
            top_vote_path: Self::DEFAULT_TOP_VOTE_PATH.to_string(),
        }
    }

    pub fn validate(&self, allow_insecure_transports: bool) -> Result<(), ConfigError> {
        validate_endpoints(
            "Radio Browser",
            &self.default_base_url,
            &[
                &self.search_path,
                &self.by_name_path,
                &self.by_uuid_path,
                &self.top_vote_path,
            ],
            allow_insecure_transports,
        )
    }
}

fn validate_endpoints(
    label: &str,
    base_url: &str,
    paths: &[&String],
    allow_insecure_transports: bool,
) -> Result<(), ConfigError> {
    let base = Url::parse(base_url)
        .map_err(|err| ConfigError::Message(format!("Invalid {label} base URL: {err}")))?;
    for path in paths {
        let url = base
            .join(path)
            .map_err(|err| ConfigError::Message(format!("Invalid {label} path: {err}")))?;
        if url.scheme() != "https" && !allow_insecure_transports {
            return Err(ConfigError::Message(format!(
                "{label} endpoints must use HTTPS unless ALLOW_INSECURE_TRANSPORT=true"
            )));
        }
    }
    Ok(())
}

fn env_u16(key: &str, default: u16) -> Result<u16, ConfigError> {
    match env::var(key) {
        Ok(value) => value
            .parse()
            .map_err(|_| ConfigError::Message(format!("{key} must be a valid u16"))),
        Err(_) => Ok(default),
    }
}

fn env_u64(key: &str, default: u64) -> Result<u64, ConfigError> {
    match env::var(key) {
        Ok(value) => value
            .parse()
            .map_err(|_| ConfigError::Message(format!("{key} must be a valid u64"))),
        Err(_) => Ok(default),
    }
}

fn env_usize(key: &str, default: usize) -> Result<usize, ConfigError> {
    match env::var(key) {
        Ok(value) => value
            .parse()
            .map_err(|_| ConfigError::Message(format!("{key} must be a valid usize"))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_plain_http_upstreams_by_default() {
        let config = IHeartConfig::with_base_url("http://us.api.iheart.com");
        let error = config.validate(false).unwrap_err();
        assert!(error.to_string().contains("must use HTTPS"));
        assert!(config.validate(true).is_ok());
    }

    #[test]
    fn rejects_unparseable_base_url() {
        let config = RadioBrowserConfig::with_base_url("not a url");
        assert!(config
            .validate(true)
            .unwrap_err()
            .to_string()
            .starts_with("Invalid Radio Browser base URL"));
    }

    #[test]
    fn default_hosts_are_valid() {
        assert!(IHeartConfig::with_base_url(IHeartConfig::DEFAULT_BASE_URL)
            .validate(false)
            .is_ok());
        assert!(
            RadioBrowserConfig::with_base_url(RadioBrowserConfig::DEFAULT_BASE_URL)
                .validate(false)
                .is_ok()
        );
    }

    #[test]
    fn zero_timeout_means_client_default() {
        assert_eq!(UpstreamConfig::default().timeout(), None);
        let config = UpstreamConfig {
            timeout_ms: 1500,
            ..UpstreamConfig::default()
        };
        assert_eq!(config.timeout(), Some(Duration::from_millis(1500)));
    }
}
