//! Page retrieval.
//!
//! The parsers only consume HTML text. This module is the boundary that
//! produces it: the [`Fetcher`] trait used by the database adapter, the
//! HTTP implementation behind the `fetch` feature, and [`fetch_file`] for
//! pages saved to disk.

use std::fs;
use std::future::Future;
use std::path::Path;

use crate::{Result, TebeoError};

/// Public address of the catalog.
pub const DEFAULT_BASE_URL: &str = "https://www.tebeosfera.com";

/// Connection settings for talking to the catalog.
///
/// # Example
///
/// ```rust
/// use tebeo_core::ConnectionConfig;
///
/// let config = ConnectionConfig::builder()
///     .timeout(10)
///     .query_delay_ms(3000)
///     .build();
/// assert_eq!(config.base_url, "https://www.tebeosfera.com");
/// ```
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Site root that relative paths are resolved against.
    pub base_url: String,
    /// Request timeout in seconds.
    pub timeout: u64,
    /// Custom User-Agent string.
    pub user_agent: String,
    /// Value of the `Accept-Language` header.
    pub accept_language: String,
    /// Minimum gap between two requests, in milliseconds.
    pub query_delay_ms: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: 30,
            user_agent: "Mozilla/5.0 (compatible; TebeoBot/1.0; +comic-metadata)".to_string(),
            accept_language: "es-ES,es;q=0.9,en;q=0.8".to_string(),
            query_delay_ms: 1500,
        }
    }
}

impl ConnectionConfig {
    /// Creates a new builder for ConnectionConfig.
    pub fn builder() -> ConnectionConfigBuilder {
        ConnectionConfigBuilder::new()
    }
}

/// Builder for ConnectionConfig.
pub struct ConnectionConfigBuilder {
    config: ConnectionConfig,
}

impl ConnectionConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self { config: ConnectionConfig::default() }
    }

    /// Sets the site root.
    pub fn base_url(mut self, value: impl Into<String>) -> Self {
        self.config.base_url = value.into();
        self
    }

    /// Sets the request timeout in seconds.
    pub fn timeout(mut self, value: u64) -> Self {
        self.config.timeout = value;
        self
    }

    /// Sets the User-Agent header.
    pub fn user_agent(mut self, value: impl Into<String>) -> Self {
        self.config.user_agent = value.into();
        self
    }

    /// Sets the Accept-Language header.
    pub fn accept_language(mut self, value: impl Into<String>) -> Self {
        self.config.accept_language = value.into();
        self
    }

    /// Sets the minimum delay between requests.
    pub fn query_delay_ms(mut self, value: u64) -> Self {
        self.config.query_delay_ms = value;
        self
    }

    /// Builds the config.
    pub fn build(self) -> ConnectionConfig {
        self.config
    }
}

impl Default for ConnectionConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Source of raw page HTML, keyed by site-relative path
/// (`/numeros/<slug>.html`).
///
/// Implementations own transport concerns: sessions, rate limiting,
/// timeouts. A failed fetch is reported as
/// [`TebeoError::UnreachableSource`], or [`TebeoError::NotFound`] when the
/// site says the page does not exist.
pub trait Fetcher {
    fn fetch(&self, path: &str) -> impl Future<Output = Result<String>> + Send;
}

/// Reads a saved page from a local file.
///
/// Callers should validate and sanitize the path when accepting user input.
pub fn fetch_file(path: &Path) -> Result<String> {
    if !path.exists() {
        Err(TebeoError::FileNotFound(path.to_path_buf()))
    } else {
        fs::read_to_string(path).map_err(TebeoError::from)
    }
}

#[cfg(feature = "fetch")]
pub use http::HttpFetcher;

#[cfg(feature = "fetch")]
mod http {
    use std::time::Duration;

    use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, USER_AGENT};
    use reqwest::{Client, StatusCode};
    use tokio::sync::Mutex;
    use tokio::time::Instant;
    use url::Url;

    use super::{ConnectionConfig, Fetcher};
    use crate::{Result, TebeoError};

    /// HTTP fetcher with a shared cookie session and request pacing.
    ///
    /// Requests are spaced at least `query_delay_ms` apart, across all
    /// callers sharing this fetcher. Nothing is retried.
    pub struct HttpFetcher {
        client: Client,
        base: Url,
        timeout: u64,
        delay: Duration,
        last_request: Mutex<Option<Instant>>,
    }

    impl HttpFetcher {
        /// Builds the HTTP client for `config`.
        ///
        /// # Errors
        ///
        /// [`TebeoError::InvalidUrl`] for a bad base URL or header value,
        /// [`TebeoError::UnreachableSource`] if the client cannot be built.
        pub fn new(config: &ConnectionConfig) -> Result<Self> {
            let base = Url::parse(&config.base_url).map_err(|e| TebeoError::InvalidUrl(e.to_string()))?;

            let mut headers = HeaderMap::new();
            headers.insert(USER_AGENT, header_value(&config.user_agent)?);
            headers.insert(ACCEPT_LANGUAGE, header_value(&config.accept_language)?);
            headers.insert(
                ACCEPT,
                HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
            );

            let client = Client::builder()
                .cookie_store(true)
                .default_headers(headers)
                .timeout(Duration::from_secs(config.timeout))
                .build()
                .map_err(|e| TebeoError::UnreachableSource { url: base.to_string(), reason: e.to_string() })?;

            Ok(Self {
                client,
                base,
                timeout: config.timeout,
                delay: Duration::from_millis(config.query_delay_ms),
                last_request: Mutex::new(None),
            })
        }

        /// The site root requests are resolved against.
        pub fn base_url(&self) -> &Url {
            &self.base
        }

        async fn pace(&self) {
            let mut last = self.last_request.lock().await;
            if let Some(previous) = *last {
                let elapsed = previous.elapsed();
                if elapsed < self.delay {
                    tokio::time::sleep(self.delay - elapsed).await;
                }
            }
            *last = Some(Instant::now());
        }
    }

    impl Fetcher for HttpFetcher {
        async fn fetch(&self, path: &str) -> Result<String> {
            let url = self.base.join(path).map_err(|e| TebeoError::InvalidUrl(e.to_string()))?;

            self.pace().await;
            tracing::debug!(%url, "GET");

            let unreachable = |reason: String| TebeoError::UnreachableSource { url: url.to_string(), reason };

            let response = self.client.get(url.clone()).send().await.map_err(|e| {
                if e.is_timeout() {
                    unreachable(format!("timed out after {} seconds", self.timeout))
                } else {
                    unreachable(e.to_string())
                }
            })?;

            let status = response.status();
            if status == StatusCode::NOT_FOUND {
                return Err(TebeoError::NotFound(url.to_string()));
            }
            if !status.is_success() {
                return Err(unreachable(format!("HTTP {status}")));
            }

            response.text().await.map_err(|e| unreachable(e.to_string()))
        }
    }

    fn header_value(value: &str) -> Result<HeaderValue> {
        HeaderValue::from_str(value).map_err(|e| TebeoError::InvalidUrl(format!("bad header value {value:?}: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_config_default() {
        let config = ConnectionConfig::default();
        assert_eq!(config.timeout, 30);
        assert_eq!(config.query_delay_ms, 1500);
        assert!(config.accept_language.starts_with("es-ES"));
    }

    #[test]
    fn test_connection_config_builder() {
        let config = ConnectionConfig::builder()
            .base_url("http://localhost:9000")
            .user_agent("test-agent")
            .accept_language("es")
            .timeout(5)
            .query_delay_ms(0)
            .build();

        assert_eq!(config.base_url, "http://localhost:9000");
        assert_eq!(config.user_agent, "test-agent");
        assert_eq!(config.accept_language, "es");
        assert_eq!(config.timeout, 5);
        assert_eq!(config.query_delay_ms, 0);
    }

    #[test]
    fn test_fetch_file_not_found() {
        let result = fetch_file(Path::new("/nonexistent/path/file.html"));
        assert!(matches!(result, Err(TebeoError::FileNotFound(_))));
    }

    #[test]
    fn test_fetch_file_reads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.html");
        fs::write(&path, "<html>Nº 1</html>").unwrap();
        assert_eq!(fetch_file(&path).unwrap(), "<html>Nº 1</html>");
    }

    #[cfg(feature = "fetch")]
    #[test]
    fn test_http_fetcher_rejects_bad_base() {
        let config = ConnectionConfig::builder().base_url("not a url").build();
        assert!(matches!(HttpFetcher::new(&config), Err(TebeoError::InvalidUrl(_))));
    }

    #[cfg(feature = "fetch")]
    #[test]
    fn test_http_fetcher_unreachable() {
        let config = ConnectionConfig::builder()
            .base_url("http://127.0.0.1:9")
            .timeout(2)
            .query_delay_ms(0)
            .build();
        let fetcher = HttpFetcher::new(&config).unwrap();

        let result = tokio::runtime::Runtime::new()
            .unwrap()
            .block_on(fetcher.fetch("/numeros/x.html"));

        assert!(matches!(result, Err(TebeoError::UnreachableSource { .. })));
    }
}
