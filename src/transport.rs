//! HTTP transport seam and the reqwest-backed production implementation
//!
//! The job issues its POST requests through the [`UploadTransport`] trait so
//! tests can script responses without a network. [`HttpTransport`] is the
//! implementation real deployments use.

use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;
use url::Url;

/// One upload request as handed to the transport
///
/// The body and token are borrowed: the job keeps ownership so the same
/// assembled body can be re-sent across retries without copying it into every
/// attempt.
#[derive(Clone, Copy, Debug)]
pub struct UploadRequest<'a> {
    /// Destination of the POST request
    pub url: &'a Url,
    /// The assembled multipart/form-data body
    pub body: &'a [u8],
    /// Full `Content-Type` value including the boundary parameter
    pub content_type: &'a str,
    /// Bearer token for the `Authorization` header
    pub access_token: &'a str,
}

/// Outcome of a completed HTTP exchange
///
/// Transport-level failures (connection, DNS, timeout) are reported through
/// the `Err` channel of [`UploadTransport::execute`] instead; a response here
/// means the server answered, whatever the status.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UploadResponse {
    /// HTTP status code returned by the server
    pub status: u16,
}

/// Transport capability consumed by the upload job
#[async_trait]
pub trait UploadTransport: Send + Sync {
    /// Execute one POST request and report the resulting HTTP status.
    ///
    /// # Errors
    ///
    /// Returns an error for transport-level failures only; HTTP error
    /// statuses are a successful exchange from the transport's point of view.
    async fn execute(&self, request: UploadRequest<'_>) -> Result<UploadResponse>;
}

/// Production transport over a shared [`reqwest::Client`]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build a transport whose requests time out after `request_timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be constructed
    /// (e.g. no TLS backend available).
    pub fn new(request_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl UploadTransport for HttpTransport {
    async fn execute(&self, request: UploadRequest<'_>) -> Result<UploadResponse> {
        let response = self
            .client
            .post(request.url.clone())
            .header(reqwest::header::CONTENT_TYPE, request.content_type)
            .bearer_auth(request.access_token)
            .body(request.body.to_vec())
            .send()
            .await?;

        let status = response.status().as_u16();
        tracing::debug!(status, url = %request.url, "upload request completed");
        Ok(UploadResponse { status })
    }
}
