//! Hosting service API client.
//!
//! Async HTTP client using `reqwest`. Every request carries the
//! application ID and master key both as `x-parse-*` headers and as
//! HTTP basic auth.

use futures_util::stream::BoxStream;
use hostsync_protocol::endpoints;
use hostsync_protocol::{
    HostingGrant, PathMapping, SetVersionRequest, VersionId, VersionList, parse_current_version,
};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{Error, error_body, explain};
use crate::{ClientConfig, Credentials};

/// Archive bytes produced while the upload is in flight.
pub type ArchiveStream = BoxStream<'static, std::io::Result<Vec<u8>>>;

/// Hosting service API client.
pub struct HostingClient {
    http: reqwest::Client,
    base_url: Url,
    credentials: Credentials,
}

impl HostingClient {
    /// Creates a client from `config`. No request is made.
    pub fn new(config: &ClientConfig) -> Result<Self, Error> {
        let mut base = config.base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url =
            Url::parse(&base).map_err(|e| Error::InvalidUrl(format!("{base}: {e}")))?;

        let http = reqwest::Client::builder()
            .default_headers(default_headers(config)?)
            .timeout(config.timeout)
            .build()
            .map_err(|source| Error::Transport {
                operation: "build client",
                source,
            })?;

        Ok(Self {
            http,
            base_url,
            credentials: config.credentials.clone(),
        })
    }

    pub fn app_id(&self) -> &str {
        self.credentials.app_id()
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, Error> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| Error::InvalidUrl(format!("{path}: {e}")))?;
        Ok(self.http.request(method, url).basic_auth(
            self.credentials.app_id(),
            Some(self.credentials.secret()),
        ))
    }

    /// Sends `req`, mapping transport failures and non-2xx statuses.
    async fn send(&self, operation: &'static str, req: RequestBuilder) -> Result<Response, Error> {
        let resp = req
            .send()
            .await
            .map_err(|source| Error::Transport { operation, source })?;
        let status = resp.status();
        debug!(operation, status = status.as_u16(), "hosting response");

        if !status.is_success() {
            let body = error_body(operation, resp).await;
            return Err(Error::Remote {
                operation,
                status: status.as_u16(),
                detail: explain(status, &body),
            });
        }
        Ok(resp)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        req: RequestBuilder,
    ) -> Result<T, Error> {
        let body = self
            .send(operation, req)
            .await?
            .text()
            .await
            .map_err(|source| Error::Transport { operation, source })?;
        serde_json::from_str(&body).map_err(|source| Error::Decode { operation, source })
    }

    /// Lists every version known for the application.
    pub async fn list_versions(&self) -> Result<VersionList, Error> {
        let req = self.request(Method::GET, endpoints::VERSIONS)?;
        self.get_json("list versions", req).await
    }

    /// Returns the active version, or `None` when nothing is active.
    pub async fn current_version(&self) -> Result<Option<VersionId>, Error> {
        let operation = "get current version";
        let req = self.request(Method::GET, endpoints::CURRENT_VERSION)?;
        let body = self
            .send(operation, req)
            .await?
            .text()
            .await
            .map_err(|source| Error::Transport { operation, source })?;
        Ok(parse_current_version(&body)?)
    }

    /// Makes `version` the active version.
    pub async fn set_version(&self, version: VersionId) -> Result<(), Error> {
        let req = self
            .request(Method::POST, endpoints::CURRENT_VERSION)?
            .json(&SetVersionRequest { version });
        self.send("set version", req).await?;
        Ok(())
    }

    /// Requests a read grant for the asset container.
    pub async fn hosting_grant(&self) -> Result<HostingGrant, Error> {
        let req = self.request(Method::GET, endpoints::HOSTING)?;
        self.get_json("fetch hosting grant", req).await
    }

    /// Requests a write grant for the blob named `digest`.
    pub async fn upload_target(&self, digest: &str) -> Result<HostingGrant, Error> {
        let req = self.request(Method::POST, &endpoints::upload_target(digest))?;
        self.get_json("request upload target", req).await
    }

    /// Publishes the path → digest mapping for `version`.
    pub async fn publish_mapping(
        &self,
        version: VersionId,
        mapping: &PathMapping,
    ) -> Result<(), Error> {
        let req = self
            .request(Method::POST, &endpoints::mapping(version.get()))?
            .json(mapping);
        self.send("publish mapping", req).await?;
        Ok(())
    }

    /// Streams a zipped code bundle for `version`.
    ///
    /// A `400` answer is the service rejecting the bundle; its body is
    /// returned as [`Error::CodeRejected`].
    pub async fn upload_code(&self, version: VersionId, archive: ArchiveStream) -> Result<(), Error> {
        let operation = "upload code bundle";
        let req = self
            .request(Method::POST, &endpoints::code_bundle(version.get()))?
            .header(reqwest::header::CONTENT_TYPE, "application/zip")
            .body(reqwest::Body::wrap_stream(archive));

        let resp = req
            .send()
            .await
            .map_err(|source| Error::Transport { operation, source })?;
        let status = resp.status();
        debug!(operation, status = status.as_u16(), "hosting response");

        if status.is_success() {
            return Ok(());
        }

        let body = error_body(operation, resp).await;
        if status == StatusCode::BAD_REQUEST {
            return Err(Error::CodeRejected(body.trim().to_string()));
        }
        Err(Error::Remote {
            operation,
            status: status.as_u16(),
            detail: format!("Cloudcode upload failure: HTTP {}", status.as_u16()),
        })
    }
}

fn default_headers(config: &ClientConfig) -> Result<HeaderMap, Error> {
    let value = |v: &str| {
        HeaderValue::from_str(v).map_err(|_| Error::InvalidCredentials(format!("{v:?}")))
    };

    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, value(&config.user_agent)?);
    headers.insert(
        "x-parse-application-id",
        value(config.credentials.app_id())?,
    );
    let mut secret = value(config.credentials.secret())?;
    secret.set_sensitive(true);
    headers.insert("x-parse-master-key", secret);
    Ok(headers)
}
