//! Resource fetching over HTTP

use crate::config::Config;
use crate::error::{FetchError, Result};

/// Content type used when the server does not declare one
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Body and declared type of a fetched resource
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchedResource {
    /// Value of the response's Content-Type header
    pub content_type: String,
    /// Raw response body
    pub body: Vec<u8>,
}

/// Abstraction over resource fetching, enabling testability
#[async_trait::async_trait]
pub trait ResourceFetcher: Send + Sync {
    /// Fetch `url`, failing with [`FetchError::Status`] on any non-success response
    async fn fetch(&self, url: &str) -> std::result::Result<FetchedResource, FetchError>;
}

/// Production [`ResourceFetcher`] backed by a shared reqwest client
#[derive(Clone, Debug)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Build a fetcher using the configured timeout and User-Agent
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client })
    }

    /// Wrap an existing client
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl ResourceFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> std::result::Result<FetchedResource, FetchError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            let message = if e.is_timeout() {
                format!("request timed out: {e}")
            } else if e.is_connect() {
                format!("connection failed: {e}")
            } else {
                e.to_string()
            };
            FetchError::Transport {
                url: url.to_string(),
                message,
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(url, status = status.as_u16(), "resource fetch rejected");
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();

        let body = response.bytes().await.map_err(|e| FetchError::Transport {
            url: url.to_string(),
            message: format!("failed to read response body: {e}"),
        })?;

        Ok(FetchedResource {
            content_type,
            body: body.to_vec(),
        })
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher() -> HttpFetcher {
        HttpFetcher::new(&Config::default()).unwrap()
    }

    #[tokio::test]
    async fn success_returns_body_and_content_type() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/a.png"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Content-Type", "image/png")
                    .set_body_bytes(vec![0x89, b'P', b'N', b'G']),
            )
            .mount(&mock_server)
            .await;

        let fetched = fetcher()
            .fetch(&format!("{}/a.png", mock_server.uri()))
            .await
            .unwrap();

        assert_eq!(fetched.content_type, "image/png");
        assert_eq!(fetched.body, vec![0x89, b'P', b'N', b'G']);
    }

    #[tokio::test]
    async fn missing_content_type_defaults_to_octet_stream() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/blob"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"raw".to_vec()))
            .mount(&mock_server)
            .await;

        let fetched = fetcher()
            .fetch(&format!("{}/blob", mock_server.uri()))
            .await
            .unwrap();

        assert_eq!(fetched.content_type, DEFAULT_CONTENT_TYPE);
    }

    #[tokio::test]
    async fn gone_status_is_reported_as_status_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gone.png"))
            .respond_with(ResponseTemplate::new(410))
            .mount(&mock_server)
            .await;

        let url = format!("{}/gone.png", mock_server.uri());
        let err = fetcher().fetch(&url).await.unwrap_err();

        assert!(err.is_gone());
        assert_eq!(err.url(), url);
    }

    #[tokio::test]
    async fn configured_user_agent_is_sent() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("User-Agent", "archiver-test/1.0"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&mock_server)
            .await;

        let config = Config {
            user_agent: "archiver-test/1.0".into(),
            ..Default::default()
        };
        HttpFetcher::new(&config)
            .unwrap()
            .fetch(&format!("{}/ua", mock_server.uri()))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn unreachable_host_is_a_transport_error() {
        // Port 9 (discard) on localhost is not expected to be listening
        let err = fetcher()
            .fetch("http://127.0.0.1:9/nothing.png")
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Transport { .. }));
    }
}
