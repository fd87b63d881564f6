//! HTTP transport for the hosting service.
//!
//! [`HostingClient`] talks to the hosting service itself (versions,
//! mapping, code bundles, storage grants). [`BlobClient`] talks to the
//! blob container those grants point at.

pub mod blob;
pub mod client;
pub mod credentials;
pub mod error;

#[cfg(test)]
pub(crate) mod mock;

use std::time::Duration;

pub use blob::{BlobClient, BlobSegment};
pub use client::{ArchiveStream, HostingClient};
pub use credentials::{Credentials, is_valid_app_id, is_valid_master_key};
pub use error::Error;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Settings shared by both clients.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Hosting service base URL.
    pub base_url: String,
    /// Value of the `user-agent` header on every request.
    pub user_agent: String,
    /// Per-request timeout.
    pub timeout: Duration,
    pub credentials: Credentials,
}

impl ClientConfig {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            base_url: hostsync_protocol::DEFAULT_BASE_URL.to_string(),
            user_agent: format!("hostsync/{}", env!("CARGO_PKG_VERSION")),
            timeout: DEFAULT_TIMEOUT,
            credentials,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
