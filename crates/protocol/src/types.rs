use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Errors produced when parsing a version identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VersionIdError {
    #[error("version must be a positive integer, got {0}")]
    NotPositive(u64),

    #[error("invalid version {0:?}: expected a positive integer")]
    Malformed(String),
}

/// A positive integer naming a deployable version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct VersionId(u64);

impl VersionId {
    /// Creates a version identifier, rejecting zero.
    pub fn new(value: u64) -> Result<Self, VersionIdError> {
        if value == 0 {
            return Err(VersionIdError::NotPositive(value));
        }
        Ok(Self(value))
    }

    /// Returns the raw integer.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl TryFrom<u64> for VersionId {
    type Error = VersionIdError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<VersionId> for u64 {
    fn from(id: VersionId) -> Self {
        id.0
    }
}

impl FromStr for VersionId {
    type Err = VersionIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: u64 = s
            .trim()
            .parse()
            .map_err(|_| VersionIdError::Malformed(s.to_string()))?;
        Self::new(value)
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Response of the version listing endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VersionList {
    #[serde(default)]
    pub versions: Vec<VersionId>,
}

impl VersionList {
    /// Returns true if `id` is among the listed versions.
    pub fn contains(&self, id: VersionId) -> bool {
        self.versions.contains(&id)
    }

    /// Returns the versions in ascending order.
    pub fn sorted(&self) -> Vec<VersionId> {
        let mut versions = self.versions.clone();
        versions.sort_unstable();
        versions
    }
}

/// Body of the version activation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetVersionRequest {
    pub version: VersionId,
}

/// Short-lived blob storage grant: a storage URI plus a SAS token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostingGrant {
    pub uri: String,
    pub token: String,
}

/// Path → digest mapping published alongside a version.
///
/// Keys are relative to the asset root and use `/` separators.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PathMapping(pub BTreeMap<String, String>);

impl PathMapping {
    /// Builds a mapping from `(path, digest)` pairs whose paths are
    /// already relative to the asset root.
    pub fn from_entries<I, P, D>(entries: I) -> Self
    where
        I: IntoIterator<Item = (P, D)>,
        P: Into<String>,
        D: Into<String>,
    {
        Self(
            entries
                .into_iter()
                .map(|(path, digest)| (path.into(), digest.into()))
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.0.get(path).map(String::as_str)
    }
}

/// Parses the body of the current-version endpoint.
///
/// The service answers with a bare integer, a quoted integer, or an
/// object carrying a `version` field. An empty body or `null` means no
/// version is active.
pub fn parse_current_version(body: &str) -> Result<Option<VersionId>, VersionIdError> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(value) => version_from_value(&value, trimmed),
        Err(_) => trimmed.parse().map(Some),
    }
}

fn version_from_value(
    value: &serde_json::Value,
    raw: &str,
) -> Result<Option<VersionId>, VersionIdError> {
    match value {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| VersionIdError::Malformed(raw.to_string()))
            .and_then(VersionId::new)
            .map(Some),
        serde_json::Value::String(s) if s.trim().is_empty() => Ok(None),
        serde_json::Value::String(s) => s.parse().map(Some),
        serde_json::Value::Object(obj) => match obj.get("version") {
            Some(inner) => version_from_value(inner, raw),
            None => Err(VersionIdError::Malformed(raw.to_string())),
        },
        _ => Err(VersionIdError::Malformed(raw.to_string())),
    }
}
