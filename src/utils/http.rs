//! HTTP transport with retry, backoff and user-agent fallback.

use reqwest::header::{HeaderName, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{Client, Method, Proxy};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use super::retry::{Outcome, RetryMachine, RetryPolicy, RetryState};
use crate::config::TransportConfig;

/// Failures of the transport layer
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    /// The underlying client could not be built
    #[error("HTTP client error: {0}")]
    Client(String),

    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Every attempt failed, or the failure was not retryable
    #[error("Request to {url} failed after {attempts} attempt(s): {cause}")]
    Failed {
        url: String,
        attempts: u32,
        status: Option<u16>,
        cause: String,
    },
}

impl NetworkError {
    /// Number of requests that were sent
    pub fn attempts(&self) -> u32 {
        match self {
            NetworkError::Failed { attempts, .. } => *attempts,
            _ => 0,
        }
    }

    /// Last HTTP status seen, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            NetworkError::Failed { status, .. } => *status,
            _ => None,
        }
    }
}

/// A single logical request; the client may send it several times
#[derive(Debug, Clone)]
pub struct FetchRequest {
    method: Method,
    url: String,
    query: Vec<(String, String)>,
    headers: Vec<(HeaderName, HeaderValue)>,
    json: Option<serde_json::Value>,
    timeout: Option<Duration>,
}

impl FetchRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            query: Vec::new(),
            headers: Vec::new(),
            json: None,
            timeout: None,
        }
    }

    pub fn post_json(url: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: Method::POST,
            json: Some(body),
            ..Self::get(url)
        }
    }

    /// Add a query parameter
    pub fn param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Add a header; values that are not valid header text are skipped
    pub fn header(mut self, name: HeaderName, value: &str) -> Self {
        match HeaderValue::from_str(value) {
            Ok(value) => self.headers.push((name, value)),
            Err(_) => tracing::warn!("Skipping invalid value for header {}", name),
        }
        self
    }

    pub fn accept(self, media_type: &str) -> Self {
        self.header(ACCEPT, media_type)
    }

    /// Per-request total timeout, overriding the client default
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn method(&self) -> &Method {
        &self.method
    }
}

/// Successful response body plus bookkeeping from the retry loop
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    pub body: Vec<u8>,
    /// Requests sent, including the one that succeeded
    pub attempts: u32,
    /// Total time spent sleeping between attempts
    pub total_backoff: Duration,
}

impl FetchResponse {
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

/// Shared HTTP client with retry policy and proxy settings applied
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Arc<Client>,
    policy: RetryPolicy,
    user_agent: String,
    fallback_user_agent: Option<String>,
}

impl HttpClient {
    /// Build a client from the transport section of the configuration
    pub fn new(config: &TransportConfig) -> Result<Self, NetworkError> {
        // Proxies come only from configuration, never implicitly from the
        // process environment.
        let mut builder = Client::builder()
            .no_proxy()
            .connect_timeout(config.connect_timeout())
            .read_timeout(config.read_timeout())
            .timeout(config.connect_timeout() + config.read_timeout())
            .pool_idle_timeout(Duration::from_secs(90));

        if let Some(http) = config.proxy.http.as_deref() {
            let proxy = Proxy::http(http).map_err(|e| NetworkError::Client(e.to_string()))?;
            builder = builder.proxy(proxy);
        }
        if let Some(https) = config.proxy.https.as_deref() {
            let proxy = Proxy::https(https).map_err(|e| NetworkError::Client(e.to_string()))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| NetworkError::Client(e.to_string()))?;

        Ok(Self {
            client: Arc::new(client),
            policy: config.retry_policy(),
            user_agent: config.user_agent.clone(),
            fallback_user_agent: config.fallback_user_agent.clone(),
        })
    }

    /// Replace the retry policy, e.g. for callers with a smaller budget
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    fn agent_for(&self, fallback: bool) -> &str {
        match (fallback, self.fallback_user_agent.as_deref()) {
            (true, Some(agent)) => agent,
            _ => &self.user_agent,
        }
    }

    fn build(&self, request: &FetchRequest, url: &Url, agent: &str) -> reqwest::RequestBuilder {
        let mut builder = self
            .client
            .request(request.method.clone(), url.clone())
            .header(USER_AGENT, agent);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.clone(), value.clone());
        }
        if let Some(body) = &request.json {
            builder = builder.json(body);
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }
        builder
    }

    /// Send a request, retrying transient failures with exponential backoff.
    ///
    /// Returns the body of the first 2xx response. Non-retryable statuses
    /// fail immediately, except for rejections (401/403/406/451), which are
    /// tried once more with the fallback user agent.
    pub async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, NetworkError> {
        let url = Url::parse(&request.url).map_err(|e| NetworkError::InvalidUrl {
            url: request.url.clone(),
            reason: e.to_string(),
        })?;

        let policy = if self.policy.is_method_retryable(&request.method) {
            self.policy.clone()
        } else {
            self.policy.clone().max_attempts(1)
        };
        let mut machine = RetryMachine::new(policy.clone());
        let mut payload: Option<(u16, Vec<u8>)> = None;
        let mut last_status = None;
        let mut last_cause = String::new();

        loop {
            match machine.state() {
                RetryState::Attempting {
                    attempt,
                    fallback_agent,
                } => {
                    let agent = self.agent_for(fallback_agent);
                    tracing::debug!(
                        "{} {} (attempt {}, fallback agent: {})",
                        request.method,
                        url,
                        attempt,
                        fallback_agent
                    );

                    let outcome = match self.build(&request, &url, agent).send().await {
                        Ok(response) => {
                            let status = response.status();
                            last_status = Some(status.as_u16());
                            match policy.classify_status(status) {
                                Outcome::Success => match response.bytes().await {
                                    Ok(body) => {
                                        payload = Some((status.as_u16(), body.to_vec()));
                                        Outcome::Success
                                    }
                                    Err(err) => {
                                        last_cause = err.to_string();
                                        policy.classify_error(&err)
                                    }
                                },
                                outcome => {
                                    last_cause = format!("HTTP {}", status);
                                    outcome
                                }
                            }
                        }
                        Err(err) => {
                            last_cause = err.to_string();
                            policy.classify_error(&err)
                        }
                    };

                    if outcome == Outcome::Rejected {
                        tracing::warn!("{} rejected the request: {}", url, last_cause);
                    }
                    machine.on_outcome(outcome);
                }
                RetryState::Backoff { delay } => {
                    tracing::warn!(
                        "Attempt {} for {} failed ({}), retrying in {:?}",
                        machine.attempts(),
                        url,
                        last_cause,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    machine.resume();
                }
                RetryState::Succeeded | RetryState::Exhausted => break,
            }
        }

        match payload {
            Some((status, body)) => Ok(FetchResponse {
                status,
                body,
                attempts: machine.attempts(),
                total_backoff: machine.total_backoff(),
            }),
            None => Err(NetworkError::Failed {
                url: url.to_string(),
                attempts: machine.attempts(),
                status: last_status,
                cause: last_cause,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn transport(max_attempts: u32) -> TransportConfig {
        TransportConfig {
            max_attempts,
            backoff_base_ms: 5,
            ..TransportConfig::default()
        }
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let mut server = mockito::Server::new_async().await;
        let failing = server
            .mock("GET", "/api/query")
            .match_query(Matcher::Any)
            .with_status(503)
            .expect(2)
            .create_async()
            .await;

        // requests go to the first matching mock with hits still expected
        let succeeding = server
            .mock("GET", "/api/query")
            .match_query(Matcher::UrlEncoded("q".into(), "x".into()))
            .with_status(200)
            .with_body("ok")
            .expect(1)
            .create_async()
            .await;

        let client = HttpClient::new(&transport(5)).unwrap();
        let response = client
            .fetch(FetchRequest::get(format!("{}/api/query", server.url())).param("q", "x"))
            .await
            .unwrap();

        failing.assert_async().await;
        succeeding.assert_async().await;
        assert_eq!(response.body(), b"ok");
        assert_eq!(response.attempts, 3);
        // 5ms + 10ms
        assert_eq!(response.total_backoff, Duration::from_millis(15));
    }

    #[tokio::test]
    async fn test_exhausts_after_max_attempts() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/query")
            .match_query(Matcher::Any)
            .with_status(500)
            .expect(4)
            .create_async()
            .await;

        let client = HttpClient::new(&transport(4)).unwrap();
        let err = client
            .fetch(FetchRequest::get(format!("{}/api/query", server.url())))
            .await
            .unwrap_err();

        mock.assert_async().await;
        assert_eq!(err.attempts(), 4);
        assert_eq!(err.status(), Some(500));
    }

    #[tokio::test]
    async fn test_not_found_is_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/missing")
            .with_status(404)
            .expect(1)
            .create_async()
            .await;

        let client = HttpClient::new(&transport(10)).unwrap();
        let err = client
            .fetch(FetchRequest::get(format!("{}/missing", server.url())))
            .await
            .unwrap_err();

        mock.assert_async().await;
        assert_eq!(err.attempts(), 1);
        assert_eq!(err.status(), Some(404));
    }

    #[tokio::test]
    async fn test_rejected_request_retries_with_browser_agent() {
        let mut server = mockito::Server::new_async().await;
        let rejected = server
            .mock("GET", "/feed")
            .match_header("user-agent", "ResearchAssistant/1.0")
            .with_status(403)
            .expect(1)
            .create_async()
            .await;
        let accepted = server
            .mock("GET", "/feed")
            .match_header("user-agent", Matcher::Regex("Mozilla/5.0".to_string()))
            .with_status(200)
            .with_body("<feed/>")
            .expect(1)
            .create_async()
            .await;

        let client = HttpClient::new(&transport(3)).unwrap();
        let response = client
            .fetch(FetchRequest::get(format!("{}/feed", server.url())))
            .await
            .unwrap();

        rejected.assert_async().await;
        accepted.assert_async().await;
        assert_eq!(response.body(), b"<feed/>");
        assert_eq!(response.attempts, 2);
        assert_eq!(response.total_backoff, Duration::ZERO);
    }

    #[tokio::test]
    async fn test_invalid_url() {
        let client = HttpClient::new(&transport(3)).unwrap();
        let err = client
            .fetch(FetchRequest::get("not a url"))
            .await
            .unwrap_err();
        assert!(matches!(err, NetworkError::InvalidUrl { .. }));
        assert_eq!(err.attempts(), 0);
    }

    #[tokio::test]
    async fn test_post_json_and_headers() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/generate")
            .match_header("x-api-key", "secret")
            .match_body(Matcher::PartialJson(serde_json::json!({"model": "m"})))
            .with_status(200)
            .with_body(r#"{"response":"hi"}"#)
            .create_async()
            .await;

        let client = HttpClient::new(&transport(2)).unwrap();
        let response = client
            .fetch(
                FetchRequest::post_json(
                    format!("{}/api/generate", server.url()),
                    serde_json::json!({"model": "m", "stream": false}),
                )
                .header(HeaderName::from_static("x-api-key"), "secret"),
            )
            .await
            .unwrap();

        mock.assert_async().await;
        let value: serde_json::Value = response.json().unwrap();
        assert_eq!(value["response"], "hi");
    }
}
