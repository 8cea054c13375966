//! reqwest-backed transport with bearer-token authentication.

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::header::{HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;

use crate::config::ClientConfig;
use crate::error::{Result, TransportError};
use crate::transport::{Response, Transport};

/// HTTP transport for the control-plane REST API.
///
/// Every call is bounded by the configured per-call timeout; a call that
/// exceeds it is aborted and reported as `TransportError::Timeout`.
#[derive(Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    token: RwLock<Option<String>>,
}

impl HttpTransport {
    /// Build the transport and, if credentials are configured, log in.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built or the token
    /// login is rejected.
    pub async fn connect(config: ClientConfig) -> Result<Self> {
        let transport = Self::new(&config)?;

        if let Some((username, password)) = config.credentials() {
            transport.login(username, password).await?;
        }

        Ok(transport)
    }

    /// Build the transport without authenticating.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder().timeout(config.request_timeout());
        if config.http_scheme == "https" && config.accept_invalid_certs {
            builder = builder.danger_accept_invalid_certs(true);
        }
        let client = builder
            .build()
            .map_err(|e| TransportError::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self::with_client(client, config.base_url()))
    }

    /// Create a transport around an existing reqwest client.
    #[must_use]
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: RwLock::new(None),
        }
    }

    /// Get the base URL requests are sent to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Whether a bearer token is currently held.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.token.read().is_some()
    }

    /// Exchange username and password for a bearer token.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Auth` if the control plane rejects the
    /// credentials.
    pub async fn login(&self, username: &str, password: &str) -> Result<()> {
        let url = format!("{}/access/token", self.base_url);

        let response = self
            .client
            .post(&url)
            .form(&[("username", username), ("password", password)])
            .send()
            .await
            .map_err(TransportError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!(status = %status, "Token login rejected");
            return Err(TransportError::Auth(format!(
                "failed to generate the access token: {status}"
            )));
        }

        let token = response.text().await.map_err(TransportError::from_reqwest)?;
        *self.token.write() = Some(token.trim().to_string());

        tracing::debug!(username, "Obtained access token");
        Ok(())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn invoke(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<Response> {
        let url = format!("{}{path}", self.base_url);

        let mut request = self.client.request(method.clone(), &url);
        if let Some(body) = body {
            request = request
                .header(CONTENT_TYPE, HeaderValue::from_static("application/json; charset=utf-8"))
                .header(ACCEPT, HeaderValue::from_static("application/json"))
                .body(serde_json::to_vec(body)?);
            tracing::trace!(%method, path, body = %body, "Sending request");
        }
        let token = self.token.read().clone();
        if let Some(token) = token {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }

        let response = request.send().await.map_err(TransportError::from_reqwest)?;
        let status = response.status().as_u16();
        let bytes = response.bytes().await.map_err(TransportError::from_reqwest)?;

        tracing::debug!(%method, path, status, "Control plane call completed");

        Ok(Response::new(status, bytes.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, body_string_contains, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn transport_for(server: &MockServer) -> HttpTransport {
        HttpTransport::with_client(reqwest::Client::new(), format!("{}/nifi-api", server.uri()))
    }

    #[test]
    fn transport_creation() {
        let config = ClientConfig::with_host("localhost:8443");
        let transport = HttpTransport::new(&config).unwrap();
        assert_eq!(transport.base_url(), "https://localhost:8443/nifi-api");
        assert!(!transport.is_authenticated());
    }

    #[tokio::test]
    async fn invoke_returns_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/nifi-api/processors/p1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "revision": {"version": 3},
                "component": {"id": "p1", "state": "RUNNING"}
            })))
            .mount(&server)
            .await;

        let transport = transport_for(&server);
        let response = transport
            .invoke(Method::GET, "/processors/p1", None)
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        let value: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
        assert_eq!(value["revision"]["version"], 3);
    }

    #[tokio::test]
    async fn invoke_passes_error_statuses_through() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/nifi-api/connections/c1"))
            .and(query_param("version", "2"))
            .respond_with(ResponseTemplate::new(409).set_body_string("revision mismatch"))
            .mount(&server)
            .await;

        let transport = transport_for(&server);
        let response = transport
            .invoke(Method::DELETE, "/connections/c1?version=2", None)
            .await
            .unwrap();

        assert_eq!(response.status, 409);
        assert_eq!(response.text(), "revision mismatch");
    }

    #[tokio::test]
    async fn invoke_sends_json_body() {
        let server = MockServer::start().await;
        let body = json!({"revision": {"version": 1}, "component": {"id": "p1", "state": "STOPPED"}});
        Mock::given(method("PUT"))
            .and(path("/nifi-api/processors/p1"))
            .and(header("content-type", "application/json; charset=utf-8"))
            .and(body_json(body.clone()))
            .respond_with(ResponseTemplate::new(200).set_body_json(body.clone()))
            .expect(1)
            .mount(&server)
            .await;

        let transport = transport_for(&server);
        let response = transport
            .invoke(Method::PUT, "/processors/p1", Some(&body))
            .await
            .unwrap();
        assert!(response.is_success());
    }

    #[tokio::test]
    async fn login_sets_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/nifi-api/access/token"))
            .and(body_string_contains("username=admin"))
            .respond_with(ResponseTemplate::new(201).set_body_string("tok-123"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/nifi-api/flow/about"))
            .and(header("authorization", "Bearer tok-123"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .mount(&server)
            .await;

        let transport = transport_for(&server);
        transport.login("admin", "secret").await.unwrap();
        assert!(transport.is_authenticated());

        let response = transport
            .invoke(Method::GET, "/flow/about", None)
            .await
            .unwrap();
        assert_eq!(response.status, 200);
    }

    #[tokio::test]
    async fn login_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/nifi-api/access/token"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let transport = transport_for(&server);
        let result = transport.login("admin", "wrong").await;

        assert!(matches!(result, Err(TransportError::Auth(_))));
        assert!(!transport.is_authenticated());
    }

    #[tokio::test]
    async fn slow_response_is_a_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/nifi-api/processors/p1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("{}")
                    .set_delay(std::time::Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(100))
            .build()
            .unwrap();
        let transport = HttpTransport::with_client(client, format!("{}/nifi-api", server.uri()));

        let err = transport
            .invoke(Method::GET, "/processors/p1", None)
            .await
            .unwrap_err();

        assert!(matches!(err, TransportError::Timeout(_)));
        assert!(err.is_retriable());
    }
}
