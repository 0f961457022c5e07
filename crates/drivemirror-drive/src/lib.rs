//! drivemirror Drive - Google Drive v3 client
//!
//! Provides async client for:
//! - OAuth2 authentication (installed-app flow with PKCE) and token renewal
//! - Child listing by query, folder creation, resumable upload, deletion
//! - The [`provider::DriveRemoteStore`] adapter implementing the core
//!   `RemoteStore` port
//!
//! ## Modules
//!
//! - [`auth`] - OAuth2 flow, token file, credential renewal loop
//! - [`client`] - Authenticated HTTP client with retry for throttling
//! - [`files`] - Drive `files` resource operations
//! - [`query`] - Rendering of child queries into the Drive query language
//! - [`retry`] - `Retry-After` parsing and backoff schedule

pub mod auth;
pub mod client;
pub mod files;
pub mod provider;
pub mod query;
pub mod retry;

use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

/// Errors that can occur when communicating with the Drive API
#[derive(Debug, Error)]
pub enum DriveError {
    /// Authentication credentials are invalid or expired
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Insufficient permissions, or a per-user quota was exceeded
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The requested resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limit exceeded; retry after the specified duration
    #[error("Too many requests, retry after {retry_after:?}")]
    TooManyRequests {
        /// Duration to wait before retrying
        retry_after: Duration,
    },

    /// A server-side error occurred (5xx)
    #[error("Server error: {0}")]
    ServerError(String),

    /// A network-level error occurred (includes request timeouts)
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// The API response could not be parsed or was malformed
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl DriveError {
    /// Classifies a non-success HTTP status with its response body
    pub fn from_status(status: StatusCode, body: String, retry_after: Duration) -> Self {
        match status {
            StatusCode::UNAUTHORIZED => DriveError::Unauthorized(body),
            // Drive reports per-user quota exhaustion as 403 rateLimitExceeded
            StatusCode::FORBIDDEN if body.contains("rateLimitExceeded") || body.contains("RateLimitExceeded") => {
                DriveError::TooManyRequests { retry_after }
            }
            StatusCode::FORBIDDEN => DriveError::Forbidden(body),
            StatusCode::NOT_FOUND => DriveError::NotFound(body),
            StatusCode::TOO_MANY_REQUESTS => DriveError::TooManyRequests { retry_after },
            s if s.is_server_error() => DriveError::ServerError(format!("{s}: {body}")),
            s => DriveError::InvalidResponse(format!("{s}: {body}")),
        }
    }

    /// Returns true for errors worth retrying
    pub fn is_transient(&self) -> bool {
        match self {
            DriveError::TooManyRequests { .. } | DriveError::ServerError(_) => true,
            DriveError::NetworkError(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}
