//! Blob container client driven by short-lived SAS grants.
//!
//! Grants come from the hosting service; this client only needs the
//! grant's host and token to list the asset container and to store
//! individual blobs.

use std::path::Path;

use hostsync_protocol::HostingGrant;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, USER_AGENT};
use reqwest::Url;
use serde::Deserialize;
use tokio_util::io::ReaderStream;
use tracing::debug;

use crate::ClientConfig;
use crate::error::{Error, error_body, explain};

/// Storage REST API version sent with every request.
const STORAGE_API_VERSION: &str = "2020-10-02";

/// One page of a container listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlobSegment {
    /// Blob names in this page.
    pub names: Vec<String>,
    /// Continuation marker; `None` when the listing is complete.
    pub next_marker: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct EnumerationResults {
    #[serde(default)]
    blobs: BlobList,
    #[serde(default)]
    next_marker: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct BlobList {
    #[serde(rename = "Blob", default)]
    items: Vec<BlobItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct BlobItem {
    name: String,
}

/// Parses a `List Blobs` XML response body.
fn parse_listing(xml: &str) -> Result<BlobSegment, quick_xml::DeError> {
    let xml = xml.trim_start_matches('\u{feff}');
    let results: EnumerationResults = quick_xml::de::from_str(xml)?;
    Ok(BlobSegment {
        names: results.blobs.items.into_iter().map(|b| b.name).collect(),
        next_marker: results
            .next_marker
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty()),
    })
}

/// Blob container client.
pub struct BlobClient {
    http: reqwest::Client,
    user_agent: String,
}

impl BlobClient {
    pub fn new(config: &ClientConfig) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|source| Error::Transport {
                operation: "build client",
                source,
            })?;
        Ok(Self {
            http,
            user_agent: config.user_agent.clone(),
        })
    }

    /// Fetches one page of blob names from `container`.
    pub async fn list_segment(
        &self,
        grant: &HostingGrant,
        container: &str,
        marker: Option<&str>,
    ) -> Result<BlobSegment, Error> {
        let operation = "list blobs";
        let mut url = container_url(grant, container)?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("restype", "container");
            query.append_pair("comp", "list");
            if let Some(marker) = marker {
                query.append_pair("marker", marker);
            }
        }
        append_sas(&mut url, &grant.token);

        let resp = self
            .http
            .get(url)
            .header(USER_AGENT, &self.user_agent)
            .header("x-ms-version", STORAGE_API_VERSION)
            .send()
            .await
            .map_err(|source| Error::Transport { operation, source })?;
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|source| Error::Transport { operation, source })?;

        if !status.is_success() {
            return Err(Error::Remote {
                operation,
                status: status.as_u16(),
                detail: explain(status, &body),
            });
        }

        let segment = parse_listing(&body).map_err(|source| Error::Listing { operation, source })?;
        debug!(
            container,
            count = segment.names.len(),
            more = segment.next_marker.is_some(),
            "listed blob segment"
        );
        Ok(segment)
    }

    /// Stores the file at `path` as blob `key`, streaming its content.
    pub async fn put_object(
        &self,
        grant: &HostingGrant,
        container: &str,
        key: &str,
        path: &Path,
        content_type: Option<&str>,
    ) -> Result<(), Error> {
        let operation = "put blob";
        let io_err = |source| Error::Io {
            path: path.to_path_buf(),
            source,
        };

        let file = tokio::fs::File::open(path).await.map_err(io_err)?;
        let len = file.metadata().await.map_err(io_err)?.len();

        let mut url = container_url(grant, container)?;
        url.path_segments_mut()
            .map_err(|_| Error::InvalidUrl(grant.uri.clone()))?
            .push(key);
        append_sas(&mut url, &grant.token);

        let mut req = self
            .http
            .put(url)
            .header(USER_AGENT, &self.user_agent)
            .header("x-ms-version", STORAGE_API_VERSION)
            .header("x-ms-blob-type", "BlockBlob")
            .header(CONTENT_LENGTH, len)
            .body(reqwest::Body::wrap_stream(ReaderStream::new(file)));
        if let Some(content_type) = content_type {
            req = req.header(CONTENT_TYPE, content_type);
        }

        let resp = req
            .send()
            .await
            .map_err(|source| Error::Transport { operation, source })?;
        let status = resp.status();
        if !status.is_success() {
            let body = error_body(operation, resp).await;
            return Err(Error::Remote {
                operation,
                status: status.as_u16(),
                detail: explain(status, &body),
            });
        }

        debug!(key, bytes = len, content_type, "stored blob");
        Ok(())
    }
}

/// `scheme://host[:port]/<container>` for the grant's storage account.
fn container_url(grant: &HostingGrant, container: &str) -> Result<Url, Error> {
    let parsed = Url::parse(&grant.uri).map_err(|e| Error::InvalidUrl(format!("{}: {e}", grant.uri)))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| Error::InvalidUrl(format!("{}: missing host", grant.uri)))?;
    let authority = match parsed.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    };
    Url::parse(&format!("{}://{authority}/{container}", parsed.scheme()))
        .map_err(|e| Error::InvalidUrl(format!("{container}: {e}")))
}

/// Appends an already-encoded SAS token to the query string.
fn append_sas(url: &mut Url, token: &str) {
    let token = token.trim_start_matches('?');
    if token.is_empty() {
        return;
    }
    let query = match url.query() {
        Some(q) if !q.is_empty() => format!("{q}&{token}"),
        _ => token.to_string(),
    };
    url.set_query(Some(&query));
}
