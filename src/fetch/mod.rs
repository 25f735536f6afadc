//! HTTP fetching with caching, and the stats providers built on it.
//!
//! Every JSON response is cached under the raw data directory keyed by a hash
//! of its URL, so a re-run within the TTL does not hit the network again.

mod nba;
mod provider;

pub use nba::{nba_team_id, NbaStatsProvider, SourceUrls};
#[cfg(test)]
pub use provider::MockProvider;
pub use provider::StatsProvider;

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use url::Url;

/// Errors that can occur during fetching.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Rate limited by {host}, retry after {retry_after_secs}s")]
    RateLimited { host: String, retry_after_secs: u64 },

    #[error("HTTP {status}: {message}")]
    HttpStatus { status: u16, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unexpected response shape from {source_name}: {message}")]
    Shape {
        source_name: String,
        message: String,
    },

    #[error("No provider team id for {0}")]
    UnknownTeam(String),
}

impl FetchError {
    pub(crate) fn shape(source_name: &str, message: impl Into<String>) -> Self {
        FetchError::Shape {
            source_name: source_name.to_string(),
            message: message.into(),
        }
    }
}

/// Metadata stored alongside cached content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheMetadata {
    pub url: String,
    pub fetched_at: DateTime<Utc>,
    pub content_length: usize,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Configuration for the HTTP fetcher.
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Directory to cache raw responses
    pub cache_dir: PathBuf,

    /// How long cached content is considered fresh (zero disables the cache)
    pub cache_ttl: Duration,

    /// Request timeout
    pub timeout: Duration,

    /// User agent string
    pub user_agent: String,

    /// Extra headers sent with every request
    pub headers: Vec<(String, String)>,

    /// Pause after every network request
    pub request_delay: Duration,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("./data/raw"),
            cache_ttl: Duration::from_secs(6 * 3600),
            timeout: Duration::from_secs(30),
            user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36".to_string(),
            headers: vec![
                ("Referer".to_string(), "https://www.nba.com/".to_string()),
                ("Origin".to_string(), "https://www.nba.com".to_string()),
            ],
            request_delay: Duration::from_millis(600),
        }
    }
}

/// HTTP fetcher with local caching.
pub struct Fetcher {
    client: Client,
    config: FetcherConfig,
}

impl Fetcher {
    /// Create a new fetcher with the given configuration.
    pub fn new(config: FetcherConfig) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .unwrap_or_else(|_| HeaderValue::from_static("roster-sync/0.1.0")),
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        for (name, value) in &config.headers {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.insert(name, value);
                }
                _ => warn!("Ignoring invalid header {}", name),
            }
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self { client, config })
    }

    /// Create a fetcher with default configuration.
    pub fn with_defaults() -> Result<Self, FetchError> {
        Self::new(FetcherConfig::default())
    }

    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    /// Fetch a URL and parse it as JSON, using the cache if fresh.
    pub async fn fetch_json<T: DeserializeOwned>(&self, url: &Url) -> Result<T, FetchError> {
        let body = self.fetch_text(url).await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Fetch a URL as text, using the cache if fresh.
    pub async fn fetch_text(&self, url: &Url) -> Result<String, FetchError> {
        let cache_path = self.cache_path_for_url(url);
        let meta_path = self.meta_path_for_url(url);

        if let Some(body) = self.check_cache(url, &cache_path, &meta_path).await? {
            return Ok(body);
        }

        let body = self.fetch_and_cache(url, &cache_path, &meta_path).await?;
        if !self.config.request_delay.is_zero() {
            tokio::time::sleep(self.config.request_delay).await;
        }
        Ok(body)
    }

    /// Return cached content if present and fresh.
    async fn check_cache(
        &self,
        url: &Url,
        cache_path: &Path,
        meta_path: &Path,
    ) -> Result<Option<String>, FetchError> {
        if self.config.cache_ttl.is_zero() || !cache_path.exists() || !meta_path.exists() {
            return Ok(None);
        }

        let meta_content = fs::read_to_string(meta_path).await?;
        let meta: CacheMetadata = match serde_json::from_str(&meta_content) {
            Ok(m) => m,
            Err(_) => return Ok(None),
        };

        let age = Utc::now().signed_duration_since(meta.fetched_at);
        if age.num_seconds() > self.config.cache_ttl.as_secs() as i64 {
            debug!("Cache expired for {}", url);
            return Ok(None);
        }

        debug!("Serving {} from cache", url);
        Ok(Some(fs::read_to_string(cache_path).await?))
    }

    /// Fetch from network and cache the result.
    async fn fetch_and_cache(
        &self,
        url: &Url,
        cache_path: &Path,
        meta_path: &Path,
    ) -> Result<String, FetchError> {
        info!("Fetching {}", url);

        let response = self.client.get(url.as_str()).send().await?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);

            return Err(FetchError::RateLimited {
                host: url.host_str().unwrap_or("unknown").to_string(),
                retry_after_secs: retry_after,
            });
        }

        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        let body = response.text().await?;

        if let Some(parent) = cache_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::File::create(cache_path).await?;
        file.write_all(body.as_bytes()).await?;
        file.flush().await?;

        let fetched_at = Utc::now();
        let meta = CacheMetadata {
            url: url.to_string(),
            fetched_at,
            content_length: body.len(),
            expires_at: Some(
                fetched_at + chrono::Duration::seconds(self.config.cache_ttl.as_secs() as i64),
            ),
        };
        fs::write(meta_path, serde_json::to_string_pretty(&meta)?).await?;

        Ok(body)
    }

    /// Generate a cache path for a URL.
    fn cache_path_for_url(&self, url: &Url) -> PathBuf {
        let hash = Self::url_hash(url);
        let host = url.host_str().unwrap_or("unknown");

        self.config
            .cache_dir
            .join(host)
            .join(format!("{}.json", hash))
    }

    /// Generate a metadata path for a URL.
    fn meta_path_for_url(&self, url: &Url) -> PathBuf {
        let hash = Self::url_hash(url);
        let host = url.host_str().unwrap_or("unknown");

        self.config
            .cache_dir
            .join(host)
            .join(format!("{}.meta.json", hash))
    }

    /// Hash a URL (query string included) to a short string.
    fn url_hash(url: &Url) -> String {
        let mut hasher = Sha256::new();
        hasher.update(url.as_str().as_bytes());
        let result = hasher.finalize();
        hex::encode(&result[..8])
    }
}
