use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;

use crate::data::Headers;
use crate::error::TransportError;

/// One network attempt as handed to a [`Transport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportRequest {
    pub url:     String,
    pub headers: Vec<(String, String)>,
    /// Deadline for this attempt. The client enforces it as well.
    pub timeout: Duration,
}

/// Raw response from a [`Transport`]. Header names are lower-case.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    pub status:  u16,
    pub headers: Headers,
    pub body:    Bytes,
}

/// Asynchronous network transport.
///
/// This trait provides the minimal interface the client needs: one GET per
/// call, no retries, no caching. Any status line the server produced is a
/// successful transport call; only failures to obtain a response are errors.
///
/// # Implementations
///
/// - [`ReqwestTransport`]: Production implementation using `reqwest`
/// - Scripted implementations for testing
pub trait Transport: Send + Sync {
    fn send(
        &self,
        request: TransportRequest,
    ) -> impl Future<Output = Result<TransportResponse, TransportError>> + Send;
}

impl<T: Transport> Transport for Arc<T> {
    fn send(
        &self,
        request: TransportRequest,
    ) -> impl Future<Output = Result<TransportResponse, TransportError>> + Send {
        (**self).send(request)
    }
}

#[cfg(feature = "reqwest")]
mod reqwest_impl {
    use super::*;

    /// Production transport using reqwest.
    #[derive(Debug, Clone)]
    pub struct ReqwestTransport {
        client: reqwest::Client,
    }

    impl ReqwestTransport {
        /// Create a transport with reqwest's default configuration.
        pub fn new() -> Result<Self, TransportError> {
            let client = reqwest::Client::builder()
                .build()
                .map_err(|e| TransportError::Network(e.to_string()))?;
            Ok(Self { client })
        }

        /// Reuse an existing, preconfigured reqwest client.
        pub fn with_client(client: reqwest::Client) -> Self {
            Self { client }
        }
    }

    fn map_error(error: reqwest::Error) -> TransportError {
        if error.is_timeout() {
            TransportError::Timeout
        } else {
            TransportError::Network(error.to_string())
        }
    }

    impl Transport for ReqwestTransport {
        async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
            let mut builder = self.client.get(&request.url).timeout(request.timeout);
            for (key, value) in &request.headers {
                builder = builder.header(key.as_str(), value.as_str());
            }

            let response = builder.send().await.map_err(map_error)?;
            let status = response.status().as_u16();
            let headers = response
                .headers()
                .iter()
                .filter_map(|(name, value)| {
                    value
                        .to_str()
                        .ok()
                        .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
                })
                .collect();
            let body = response.bytes().await.map_err(map_error)?;

            Ok(TransportResponse {
                status,
                headers,
                body,
            })
        }
    }
}

#[cfg(feature = "reqwest")]
pub use reqwest_impl::ReqwestTransport;
