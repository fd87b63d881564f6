//! Command-line configuration.
//!
//! Settings come from an optional TOML file (`hostsync.toml` in the
//! working directory, or `--config <path>`). Credentials and the service
//! URL can be supplied through the environment:
//! - `BUDDY_PARSE_APP_ID`
//! - `BUDDY_PARSE_MASTER_KEY`
//! - `BUDDY_PARSE_AUX_URL`

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use hostsync_deploy::DeployConfig;
use hostsync_deploy::types::{DEFAULT_UPLOAD_CONCURRENCY, MAX_UPLOAD_CONCURRENCY};
use hostsync_hosting::{ClientConfig, Credentials};
use serde::{Deserialize, Serialize};

/// Config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "hostsync.toml";

pub const ENV_APP_ID: &str = "BUDDY_PARSE_APP_ID";
pub const ENV_MASTER_KEY: &str = "BUDDY_PARSE_MASTER_KEY";
pub const ENV_AUX_URL: &str = "BUDDY_PARSE_AUX_URL";

/// CLI configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Static asset directory.
    #[serde(default = "default_asset_root")]
    pub asset_root: PathBuf,

    /// Cloud code directory.
    #[serde(default = "default_code_root")]
    pub code_root: PathBuf,

    /// Concurrent asset uploads (clamped to 1..=16).
    #[serde(default = "default_upload_concurrency")]
    pub upload_concurrency: usize,

    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Hosting service base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Deploy even when some asset files cannot be read.
    #[serde(default)]
    pub allow_partial_assets: bool,

    #[serde(skip)]
    pub app_id: Option<String>,

    #[serde(skip)]
    pub master_key: Option<String>,
}

fn default_asset_root() -> PathBuf {
    PathBuf::from("public")
}

fn default_code_root() -> PathBuf {
    PathBuf::from("cloud")
}

fn default_upload_concurrency() -> usize {
    DEFAULT_UPLOAD_CONCURRENCY
}

fn default_request_timeout() -> u64 {
    60
}

fn default_base_url() -> String {
    hostsync_protocol::DEFAULT_BASE_URL.into()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            asset_root: default_asset_root(),
            code_root: default_code_root(),
            upload_concurrency: default_upload_concurrency(),
            request_timeout_secs: default_request_timeout(),
            base_url: default_base_url(),
            allow_partial_assets: false,
            app_id: None,
            master_key: None,
        }
    }
}

impl Config {
    /// Loads the file at `path`, or `hostsync.toml` when present, then
    /// applies environment overrides.
    ///
    /// An explicit `path` must exist; the default file is optional.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.exists() {
                    Self::from_file(default)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config = toml::from_str(&content)
            .with_context(|| format!("parsing {}", path.display()))?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Overrides credentials and base URL from `lookup`. Empty values
    /// count as unset.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key| lookup(key).filter(|v: &String| !v.is_empty());
        if let Some(app_id) = get(ENV_APP_ID) {
            self.app_id = Some(app_id);
        }
        if let Some(key) = get(ENV_MASTER_KEY) {
            self.master_key = Some(key);
        }
        if let Some(url) = get(ENV_AUX_URL) {
            self.base_url = url;
        }
    }

    pub fn has_credentials(&self) -> bool {
        self.app_id.is_some() && self.master_key.is_some()
    }

    /// Validated client settings. Fails before any request when the
    /// credentials are missing or malformed.
    pub fn client_config(&self) -> anyhow::Result<ClientConfig> {
        let (Some(app_id), Some(key)) = (&self.app_id, &self.master_key) else {
            anyhow::bail!("missing credentials: set {ENV_APP_ID} and {ENV_MASTER_KEY}");
        };
        let credentials = Credentials::new(app_id.as_str(), key.as_str())?;
        Ok(ClientConfig::new(credentials)
            .with_base_url(self.base_url.clone())
            .with_timeout(Duration::from_secs(self.request_timeout_secs.max(1))))
    }

    pub fn deploy_config(&self) -> DeployConfig {
        DeployConfig {
            asset_root: self.asset_root.clone(),
            code_root: self.code_root.clone(),
            upload_concurrency: self.upload_concurrency.clamp(1, MAX_UPLOAD_CONCURRENCY),
            allow_partial_assets: self.allow_partial_assets,
        }
    }
}
