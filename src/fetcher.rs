use crate::http::{FetchResponse, HttpSource};
use crate::utils::redact_url;
use crate::AnalyzeError;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, PRAGMA};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument, warn};

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// reqwest-backed [`HttpSource`]. Every call is bounded by the configured timeout.
#[derive(Clone)]
pub struct Fetcher {
    client: Client,
    timeout: Duration,
}

/// Creates a fetcher with custom configuration.
///
/// # Examples
/// ```ignore
/// let fetcher = Fetcher::new_with_config(FetcherConfig {
///     user_agent: "my-agent/1.0".to_string(),
///     timeout: Duration::from_secs(8),
///     headers: None,
///     redirect_policy: None,
/// })?;
/// ```
pub struct FetcherConfig {
    pub user_agent: String,
    pub timeout: Duration,
    pub headers: Option<HeaderMap>,
    pub redirect_policy: Option<reqwest::redirect::Policy>,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: DEFAULT_TIMEOUT,
            headers: Some(browser_headers()),
            redirect_policy: Some(reqwest::redirect::Policy::limited(10)),
        }
    }
}

fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/json;q=0.9,*/*;q=0.8",
        ),
    );
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
    headers
}

impl Fetcher {
    pub fn new() -> Result<Self, AnalyzeError> {
        debug!("Fetcher initialized with default configuration");
        Self::new_with_config(FetcherConfig::default())
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, AnalyzeError> {
        Self::new_with_config(FetcherConfig {
            timeout,
            ..FetcherConfig::default()
        })
    }

    pub fn new_with_config(config: FetcherConfig) -> Result<Self, AnalyzeError> {
        let mut client_builder = Client::builder()
            .user_agent(config.user_agent)
            .timeout(config.timeout)
            .pool_max_idle_per_host(4);

        if let Some(headers) = config.headers {
            client_builder = client_builder.default_headers(headers);
        }

        if let Some(redirect_policy) = config.redirect_policy {
            client_builder = client_builder.redirect(redirect_policy);
        }

        let client = client_builder
            .build()
            .map_err(|e| AnalyzeError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            timeout: config.timeout,
        })
    }

    pub fn with_client(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }
}

#[async_trait]
impl HttpSource for Fetcher {
    #[instrument(level = "debug", skip(self, url), fields(url = %redact_url(url)))]
    async fn get(&self, url: &str) -> Result<FetchResponse, AnalyzeError> {
        let shown = redact_url(url);
        debug!(url = %shown, "Starting fetch request");

        let send = self.client.get(url).send();
        // Also bounds body reads from servers that trickle bytes.
        let exchange = async {
            let response = send.await?;
            let status = response.status().as_u16();
            let body = response.text().await?;
            Ok::<_, reqwest::Error>(FetchResponse { status, body })
        };

        match tokio::time::timeout(self.timeout + Duration::from_secs(1), exchange).await {
            Ok(Ok(response)) => {
                debug!(
                    url = %shown,
                    status = response.status,
                    content_length = response.body.len(),
                    "Fetch completed"
                );
                Ok(response)
            }
            Ok(Err(e)) => {
                let err = AnalyzeError::from(e);
                warn!(url = %shown, error = %err, "Request failed");
                Err(err)
            }
            Err(_) => {
                warn!(url = %shown, "Request exceeded time budget");
                Err(AnalyzeError::TimeoutError(format!(
                    "{shown} did not answer within {}s",
                    self.timeout.as_secs()
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_with_custom_timeout() {
        let fetcher = Fetcher::with_timeout(Duration::from_secs(3)).unwrap();
        assert_eq!(fetcher.timeout, Duration::from_secs(3));
    }

    #[tokio::test]
    async fn failed_requests_do_not_leak_bot_tokens() {
        let fetcher = Fetcher::with_timeout(Duration::from_secs(2)).unwrap();
        let err = fetcher
            .get("http://127.0.0.1:1/bot123456:SECRETTOKEN/getChat?chat_id=@x")
            .await
            .unwrap_err();
        let text = err.to_string();
        assert!(!text.contains("SECRETTOKEN"), "{text}");
        assert!(!text.contains("chat_id"), "{text}");
    }

    #[test]
    fn default_config_sends_browser_headers() {
        let config = FetcherConfig::default();
        let headers = config.headers.unwrap();
        assert_eq!(headers[ACCEPT_LANGUAGE], "en-US,en;q=0.9");
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
    }
}
