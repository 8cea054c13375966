//! The transport seam between the orchestration layer and the network.

use async_trait::async_trait;
use reqwest::Method;

use crate::error::Result;

/// A raw control-plane response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// HTTP status code.
    pub status: u16,
    /// Response body, possibly empty.
    pub body: Vec<u8>,
}

impl Response {
    /// Create a response from a status code and body.
    #[must_use]
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Whether the status is in the 2xx range.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Body decoded as UTF-8, lossily.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Performs one request against the control plane.
///
/// Paths are relative to the configured API base URL and may carry a query
/// string. Implementations must return every HTTP status as a `Response`
/// and reserve `Err` for failures below the status line.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a request with an optional JSON body.
    ///
    /// # Errors
    ///
    /// Returns an error if the request could not be sent, timed out, or the
    /// response body could not be read.
    async fn invoke(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<Response>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn invoke(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<Response> {
        (**self).invoke(method, path, body).await
    }
}
