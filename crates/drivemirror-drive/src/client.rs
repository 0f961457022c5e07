//! Google Drive v3 HTTP client
//!
//! Provides an authenticated HTTP client for the Drive REST API. Handles
//! bearer authentication, endpoint construction, per-request timeouts and
//! retry of throttled / server-error responses.
//!
//! Metadata requests are bounded by the configured request timeout. File
//! content is bounded by [`DriveClient::upload_timeout`], which grows with
//! the file size.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use drivemirror_drive::client::DriveClient;
//! use reqwest::Method;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = DriveClient::builder("access-token").max_retries(3).build()?;
//! let response = client
//!     .execute("list root", || client.request(Method::GET, "/files"))
//!     .await?;
//! println!("{}", response.status());
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use tracing::{debug, info, warn};

use crate::retry::{backoff_delay, parse_retry_after};
use crate::DriveError;

/// Base URL for the Drive v3 metadata API
pub const DRIVE_API_URL: &str = "https://www.googleapis.com/drive/v3";

/// Base URL for the Drive v3 media upload API
pub const DRIVE_UPLOAD_URL: &str = "https://www.googleapis.com/upload/drive/v3";

/// Default per-request timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default retry budget for transient failures
const DEFAULT_MAX_RETRIES: u32 = 5;

/// Wait used when a throttled response has no `Retry-After` header
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(5);

/// Lower bound for the time allowed to transfer file content
const MIN_UPLOAD_TIMEOUT: Duration = Duration::from_secs(300);

/// Slowest sustained upload rate tolerated, in bytes per second
const MIN_UPLOAD_RATE: u64 = 64 * 1024;

// ============================================================================
// DriveClient
// ============================================================================

/// HTTP client for Google Drive API calls
///
/// Wraps `reqwest::Client` with the bearer token and both base URLs. A
/// client carries one access token for its whole life; token rotation
/// builds a new client and swaps the store that owns it.
#[derive(Debug, Clone)]
pub struct DriveClient {
    /// The underlying HTTP client (connect timeout only)
    client: Client,
    /// Base URL for metadata requests
    api_base: String,
    /// Base URL for media uploads
    upload_base: String,
    /// OAuth2 access token
    access_token: String,
    /// Retries for transient failures
    max_retries: u32,
    /// Total timeout of a metadata request
    request_timeout: Duration,
}

impl DriveClient {
    /// Creates a client against the public Drive endpoints with defaults
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_base: DRIVE_API_URL.to_string(),
            upload_base: DRIVE_UPLOAD_URL.to_string(),
            access_token: access_token.into(),
            max_retries: DEFAULT_MAX_RETRIES,
            request_timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Creates a client rooted at a custom server (useful for testing)
    ///
    /// Metadata requests go to `{base}/drive/v3`, uploads to
    /// `{base}/upload/drive/v3`.
    pub fn with_base_url(access_token: impl Into<String>, base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            client: Client::new(),
            api_base: format!("{base}/drive/v3"),
            upload_base: format!("{base}/upload/drive/v3"),
            access_token: access_token.into(),
            max_retries: DEFAULT_MAX_RETRIES,
            request_timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Starts a [`DriveClientBuilder`]
    pub fn builder(access_token: impl Into<String>) -> DriveClientBuilder {
        DriveClientBuilder::new(access_token)
    }

    /// Returns a reference to the current access token
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// Returns the retry budget for transient failures
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Returns the total timeout applied to metadata requests
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Time allowed to send `len` bytes of content and read the reply
    ///
    /// The request timeout plus `len` at [`MIN_UPLOAD_RATE`], never less
    /// than [`MIN_UPLOAD_TIMEOUT`].
    pub fn upload_timeout(&self, len: u64) -> Duration {
        let transfer = Duration::from_secs(len / MIN_UPLOAD_RATE + 1);
        (self.request_timeout + transfer).max(MIN_UPLOAD_TIMEOUT)
    }

    /// Creates an authenticated request against the metadata API
    ///
    /// # Arguments
    /// * `method` - HTTP method
    /// * `path` - API path relative to the base URL (e.g. "/files")
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.absolute(method, &format!("{}{}", self.api_base, path))
            .timeout(self.request_timeout)
    }

    /// Creates an authenticated metadata request against the upload API
    pub fn upload_request(&self, method: Method, path: &str) -> RequestBuilder {
        self.absolute(method, &format!("{}{}", self.upload_base, path))
            .timeout(self.request_timeout)
    }

    /// Creates a request carrying `len` bytes of content to an upload session
    ///
    /// Bounded by [`upload_timeout`](Self::upload_timeout) instead of the
    /// request timeout.
    pub fn content_request(&self, method: Method, session_uri: &str, len: u64) -> RequestBuilder {
        self.absolute(method, session_uri)
            .timeout(self.upload_timeout(len))
    }

    /// Creates an authenticated request to an absolute URL, without timeout
    fn absolute(&self, method: Method, url: &str) -> RequestBuilder {
        self.client.request(method, url).bearer_auth(&self.access_token)
    }

    // ========================================================================
    // Request execution
    // ========================================================================

    /// Executes a request with retry of transient failures
    ///
    /// `build` is called once per attempt, so request bodies must be
    /// reproducible. Throttled responses (429, 403 rate-limit) sleep for
    /// `Retry-After`; 5xx and connect/timeout errors back off exponentially.
    ///
    /// # Returns
    /// The successful (2xx) response, or the classified [`DriveError`]
    /// wrapped with `what` as context.
    pub async fn execute<F>(&self, what: &str, build: F) -> Result<Response>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut attempt = 0;
        loop {
            let err = match build().send().await {
                Ok(response) if response.status().is_success() => {
                    if attempt > 0 {
                        info!(what, attempt, "Request succeeded after retry");
                    }
                    return Ok(response);
                }
                Ok(response) => error_from_response(response).await,
                Err(e) => DriveError::NetworkError(e),
            };

            if attempt >= self.max_retries || !err.is_transient() {
                if attempt > 0 {
                    warn!(what, attempts = attempt + 1, "Retry limit exhausted");
                }
                return Err(anyhow::Error::new(err).context(what.to_string()));
            }

            let delay = match &err {
                DriveError::TooManyRequests { retry_after } => *retry_after,
                _ => backoff_delay(attempt),
            };
            info!(
                what,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Transient Drive error, backing off"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    /// Executes a request exactly once
    ///
    /// For requests whose body is a one-shot stream and therefore cannot be
    /// rebuilt for a retry.
    pub async fn execute_once(&self, what: &str, request: RequestBuilder) -> Result<Response> {
        let response = request
            .send()
            .await
            .map_err(DriveError::NetworkError)
            .with_context(|| what.to_string())?;

        if response.status().is_success() {
            return Ok(response);
        }

        let err = error_from_response(response).await;
        Err(anyhow::Error::new(err).context(what.to_string()))
    }
}

/// Reads the status, `Retry-After` and body of a failed response
async fn error_from_response(response: Response) -> DriveError {
    let status = response.status();
    let retry_after = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .map(|v| parse_retry_after(v, DEFAULT_RETRY_AFTER))
        .unwrap_or(DEFAULT_RETRY_AFTER);
    let body = response.text().await.unwrap_or_default();

    if status == StatusCode::UNAUTHORIZED {
        warn!("Drive rejected the access token");
    }
    debug!(%status, body = %body, "Drive request failed");

    DriveError::from_status(status, body, retry_after)
}

// ============================================================================
// DriveClientBuilder
// ============================================================================

/// Builder for a [`DriveClient`] with timeout and retry settings
#[derive(Debug, Clone)]
pub struct DriveClientBuilder {
    access_token: String,
    base_url: Option<String>,
    timeout: Duration,
    max_retries: u32,
}

impl DriveClientBuilder {
    fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            base_url: None,
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Points the client at a custom server
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Total timeout of metadata requests and connect timeout of all requests
    ///
    /// Expiry surfaces as a transient network error.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Retry budget for transient failures
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Builds the client
    pub fn build(self) -> Result<DriveClient> {
        let client = Client::builder()
            .connect_timeout(self.timeout)
            .build()
            .context("Failed to build HTTP client")?;

        let mut drive = match &self.base_url {
            Some(base) => DriveClient::with_base_url(self.access_token, base),
            None => DriveClient::new(self.access_token),
        };
        drive.client = client;
        drive.max_retries = self.max_retries;
        drive.request_timeout = self.timeout;
        Ok(drive)
    }
}
