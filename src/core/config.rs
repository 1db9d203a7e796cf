use anyhow::{anyhow, Result};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

pub const DEFAULT_API_URL: &str = "https://api.edinet-fsa.go.jp/api/v2/";

#[derive(Clone, Debug)]
pub struct RegisterConfig {
    /// Only needed when filings are fetched from EDINET.
    pub api_key: Option<String>,
    pub api_url: Url,
    pub data_dir: PathBuf,
    pub parallel: bool,
    pub max_concurrent: usize,
    pub request_timeout: Duration,
    /// Read raw filings from the local cache instead of downloading them.
    pub xbrl_from_cache: bool,
}

fn env_flag(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(value) => matches!(value.to_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}

fn env_number<T: std::str::FromStr>(name: &str, default: T) -> Result<T> {
    match std::env::var(name) {
        Ok(value) => value
            .parse()
            .map_err(|_| anyhow!("{} must be a number, got {:?}", name, value)),
        Err(_) => Ok(default),
    }
}

impl RegisterConfig {
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("EDINET_API_KEY").ok().filter(|key| !key.is_empty());

        let mut api_url = std::env::var("EDINET_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        if !api_url.ends_with('/') {
            api_url.push('/');
        }
        let api_url = Url::parse(&api_url)
            .map_err(|e| anyhow!("EDINET_API_URL is not a valid URL: {}", e))?;

        let data_dir = PathBuf::from(
            std::env::var("COMPASS_DATA_DIR").unwrap_or_else(|_| "data".to_string()),
        );

        Ok(Self {
            api_key,
            api_url,
            data_dir,
            parallel: env_flag("PARALLEL", true),
            max_concurrent: env_number("MAX_CONCURRENT", 8usize)?.max(1),
            request_timeout: Duration::from_secs(env_number("REQUEST_TIMEOUT_SECS", 300u64)?),
            xbrl_from_cache: env_flag("GET_XBRL_FROM_CACHE", false),
        })
    }

    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| anyhow!("EDINET_API_KEY environment variable not set"))
    }

    /// Concurrency limit for the batch runner.
    pub fn concurrency(&self) -> usize {
        if self.parallel {
            self.max_concurrent
        } else {
            1
        }
    }

    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join("store")
    }
}

impl Default for RegisterConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: Url::parse(DEFAULT_API_URL).expect("default API URL is valid"),
            data_dir: PathBuf::from("data"),
            parallel: true,
            max_concurrent: 8,
            request_timeout: Duration::from_secs(300),
            xbrl_from_cache: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concurrency_follows_parallel_flag() {
        let mut config = RegisterConfig::default();
        assert_eq!(config.concurrency(), 8);
        config.parallel = false;
        assert_eq!(config.concurrency(), 1);
    }

    #[test]
    fn test_missing_api_key_is_reported() {
        let config = RegisterConfig::default();
        let err = config.require_api_key().unwrap_err();
        assert!(err.to_string().contains("EDINET_API_KEY"));
    }

    #[test]
    fn test_default_url_joins_endpoints() {
        let config = RegisterConfig::default();
        assert_eq!(
            config.api_url.join("documents.json").unwrap().as_str(),
            "https://api.edinet-fsa.go.jp/api/v2/documents.json"
        );
    }
}
