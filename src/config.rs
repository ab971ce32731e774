use anyhow::{bail, Context, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// What to do when the enrichment API returns a release date that does not parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseDatePolicy {
    /// Store today's date instead.
    DefaultNow,
    /// Fail the request.
    Reject,
}

impl FromStr for ReleaseDatePolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "default_now" => Ok(Self::DefaultNow),
            "reject" => Ok(Self::Reject),
            other => bail!("unknown release date policy '{other}'"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => bail!("unknown log format '{other}'"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub server_host: String,
    pub server_port: u16,
    pub enrichment_api_url: String,
    pub enrichment_info_path: String,
    pub enrichment_timeout: Option<Duration>,
    pub fixture_path: PathBuf,
    pub fixture_fallback: bool,
    pub release_date_policy: ReleaseDatePolicy,
    pub log_format: LogFormat,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .context("DATABASE_URL must be set")?,
            server_host: env::var("SERVER_HOST")
                .unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("SERVER_PORT must be a valid port number")?,
            enrichment_api_url: env::var("ENRICHMENT_API_URL")
                .context("ENRICHMENT_API_URL must be set")?,
            enrichment_info_path: env::var("ENRICHMENT_INFO_PATH")
                .unwrap_or_else(|_| "/info".to_string()),
            enrichment_timeout: env::var("ENRICHMENT_TIMEOUT_SECS")
                .ok()
                .map(|secs| secs.parse().map(Duration::from_secs))
                .transpose()
                .context("ENRICHMENT_TIMEOUT_SECS must be a whole number of seconds")?,
            fixture_path: env::var("ENRICHMENT_FIXTURE_PATH")
                .unwrap_or_else(|_| "enrichment_fixture.json".to_string())
                .into(),
            fixture_fallback: env::var("ENRICHMENT_FIXTURE_FALLBACK")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .context("ENRICHMENT_FIXTURE_FALLBACK must be true or false")?,
            release_date_policy: env::var("RELEASE_DATE_POLICY")
                .unwrap_or_else(|_| "default_now".to_string())
                .parse()
                .context("RELEASE_DATE_POLICY must be default_now or reject")?,
            log_format: env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .parse()
                .context("LOG_FORMAT must be pretty or json")?,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}
