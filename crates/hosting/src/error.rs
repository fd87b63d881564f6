//! Hosting transport error types.

use std::path::PathBuf;

use tracing::debug;

/// Errors from the hosting and blob clients.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No response was received.
    #[error("{operation}: transport error: {source}")]
    Transport {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// The service answered with a non-success status.
    #[error("{operation} failed (HTTP {status}): {detail}")]
    Remote {
        operation: &'static str,
        status: u16,
        detail: String,
    },

    /// The code-upload endpoint refused the bundle.
    #[error("code bundle rejected: {0}")]
    CodeRejected(String),

    #[error("{operation}: invalid response body: {source}")]
    Decode {
        operation: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("{operation}: invalid blob listing: {source}")]
    Listing {
        operation: &'static str,
        #[source]
        source: quick_xml::DeError,
    },

    #[error("invalid version in response: {0}")]
    Version(#[from] hostsync_protocol::VersionIdError),

    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// True for failures where no response arrived.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    /// HTTP status of a remote rejection, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Remote { status, .. } => Some(*status),
            Self::CodeRejected(_) => Some(400),
            _ => None,
        }
    }
}

/// Reads the body of an error response.
///
/// A body that cannot be read is logged and treated as empty; the status
/// still describes the failure.
pub(crate) async fn error_body(operation: &'static str, resp: reqwest::Response) -> String {
    match resp.text().await {
        Ok(body) => body,
        Err(e) => {
            debug!(operation, error = %e, "failed to read error body");
            String::new()
        }
    }
}

/// Extracts a human-readable explanation from an error response body.
///
/// Parse-style services answer `{"code": .., "error": ".."}`; anything
/// else is passed through trimmed.
pub(crate) fn explain(status: reqwest::StatusCode, body: &str) -> String {
    let trimmed = body.trim();
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        if let Some(msg) = value.get("error").and_then(|v| v.as_str()) {
            return msg.to_string();
        }
    }
    if trimmed.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("unknown status")
            .to_string()
    } else {
        trimmed.to_string()
    }
}
