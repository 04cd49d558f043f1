use crate::credentials::DEFAULT_CREDENTIALS_FILE;
use reqwest::header::HeaderValue;
use std::env;
use std::path::PathBuf;

pub const DEFAULT_LISTEN: &str = "localhost:8080";
pub const DEFAULT_USER_AGENT: &str =
    concat!("gh-rate-limit-exporter/", env!("CARGO_PKG_VERSION"));

/// Runtime configuration for the exporter.
/// Values are sourced from environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub api_version: String,
    pub user_agent: String,
    pub timeout_secs: u64,
    pub listen: String,
    pub credentials_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: "https://api.github.com".to_string(),
            api_version: "2022-11-28".to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: 30,
            listen: DEFAULT_LISTEN.to_string(),
            credentials_path: PathBuf::from(DEFAULT_CREDENTIALS_FILE),
        }
    }
}

impl Config {
    /// Load configuration from environment.
    ///
    /// Env vars:
    /// - GITHUB_API_URL (default: https://api.github.com)
    /// - GITHUB_API_VERSION (default: 2022-11-28)
    /// - GITHUB_HTTP_TIMEOUT_SECS (default: 30)
    /// - GITHUB_USER_AGENT (default: gh-rate-limit-exporter/<version>)
    /// - GH_RATE_LIMIT_EXPORTER_LISTEN (default: localhost:8080)
    /// - GH_RATE_LIMIT_EXPORTER_CREDENTIALS (default: credentials.json in the working directory)
    pub fn from_env() -> Result<Self, String> {
        let defaults = Self::default();

        let timeout_secs = match env::var("GITHUB_HTTP_TIMEOUT_SECS") {
            Ok(s) => s
                .parse::<u64>()
                .map_err(|_| format!("GITHUB_HTTP_TIMEOUT_SECS is not a number: {}", s))?,
            Err(_) => defaults.timeout_secs,
        };

        let user_agent = match env::var("GITHUB_USER_AGENT") {
            Ok(ua) if HeaderValue::from_str(&ua).is_err() => {
                return Err(format!("GITHUB_USER_AGENT is not a valid header value: {:?}", ua));
            }
            Ok(ua) => ua,
            Err(_) => defaults.user_agent,
        };

        Ok(Self {
            api_url: env::var("GITHUB_API_URL").unwrap_or(defaults.api_url),
            api_version: env::var("GITHUB_API_VERSION").unwrap_or(defaults.api_version),
            user_agent,
            timeout_secs,
            listen: env::var("GH_RATE_LIMIT_EXPORTER_LISTEN").unwrap_or(defaults.listen),
            credentials_path: env::var("GH_RATE_LIMIT_EXPORTER_CREDENTIALS")
                .map(PathBuf::from)
                .unwrap_or(defaults.credentials_path),
        })
    }

    /// Command-line values win over the environment.
    pub fn with_overrides(mut self, listen: Option<String>, credentials: Option<PathBuf>) -> Self {
        if let Some(listen) = listen {
            self.listen = listen;
        }
        if let Some(path) = credentials {
            self.credentials_path = path;
        }
        self
    }
}
