//! Wire types shared between the hostsync hosting client and the
//! deploy engine.

pub mod endpoints;
pub mod types;

// Re-export primary types for convenience.
pub use endpoints::DEFAULT_BASE_URL;
pub use types::{
    HostingGrant, PathMapping, SetVersionRequest, VersionId, VersionIdError, VersionList,
    parse_current_version,
};
