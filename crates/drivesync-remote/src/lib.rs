//! drivesync Remote - HTTP access to the cloud drive
//!
//! Provides:
//! - A typed JSON client for the drive's file endpoints
//! - The [`HttpTransport`](transport::HttpTransport) adapter implementing
//!   the remote transport port
//!
//! ## Modules
//!
//! - [`client`] - Authenticated HTTP client and response types
//! - [`transport`] - `IRemoteTransport` implementation

pub mod client;
pub mod transport;

use thiserror::Error;

/// Errors that can occur when talking to the drive API
#[derive(Debug, Error)]
pub enum RemoteError {
    /// Credentials are missing, invalid or expired
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Credentials are valid but lack access to the resource
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The requested resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// A server-side error occurred (5xx)
    #[error("Server error: {0}")]
    ServerError(String),

    /// Any other non-success status
    #[error("Unexpected status {status}: {message}")]
    UnexpectedStatus { status: u16, message: String },

    /// A network-level error occurred
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The response or a URL in it could not be parsed
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}
