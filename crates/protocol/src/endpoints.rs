//! Hosting service endpoint paths, relative to the service base URL.

/// Default hosting service base URL.
pub const DEFAULT_BASE_URL: &str = "https://parse.buddy.com/";

/// Lists every version known for the application.
pub const VERSIONS: &str = "app/versions";

/// Reads (`GET`) or sets (`POST`) the active version.
pub const CURRENT_VERSION: &str = "app/current";

/// Issues a read grant for the application's asset container.
pub const HOSTING: &str = "hosting";

/// Suffix of the blob container holding an application's assets.
pub const ASSET_CONTAINER_SUFFIX: &str = "-public";

/// Issues a write grant for a single asset blob.
pub fn upload_target(digest: &str) -> String {
    format!("{HOSTING}/{digest}")
}

/// Publishes the path → digest mapping for a version.
pub fn mapping(version: u64) -> String {
    format!("app/map/{version}")
}

/// Receives the zipped code bundle for a version.
pub fn code_bundle(version: u64) -> String {
    format!("app/cloudcode/{version}.zip")
}

/// Name of the blob container that stores `app_id`'s assets.
pub fn asset_container(app_id: &str) -> String {
    format!("{app_id}{ASSET_CONTAINER_SUFFIX}")
}
