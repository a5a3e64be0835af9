use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;
use reqwest::{header, Client as ReqwestClient, StatusCode};
use tracing::debug;

use crate::digest::OciDigest;
use crate::error::{Error, Result};
use crate::models::{Descriptor, MEDIA_TYPE_OCI_MANIFEST};

/// Basic credentials attached to every request when configured. Token
/// negotiation with an auth service is out of scope.
#[derive(Debug, Clone)]
pub struct BasicCredentials {
    pub username: String,
    pub password: String,
}

/// Options for constructing a [`RegistryClient`].
#[derive(Debug, Clone, Default)]
pub struct ClientOptions {
    /// Use plain HTTP instead of HTTPS
    pub plain_http: bool,
    /// Optional basic credentials
    pub credentials: Option<BasicCredentials>,
}

/// A client for interacting with OCI registries.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    opts: ClientOptions,
    client: ReqwestClient,
}

impl RegistryClient {
    pub fn new(opts: ClientOptions) -> Self {
        Self {
            opts,
            client: ReqwestClient::new(),
        }
    }

    /// Create a session scoped to one repository on one registry host.
    pub fn session(&self, registry: &str, repository: &str) -> RegistrySession {
        let scheme = if self.opts.plain_http { "http" } else { "https" };
        RegistrySession {
            base_url: format!("{scheme}://{registry}"),
            repository: repository.to_string(),
            auth: self
                .opts
                .credentials
                .as_ref()
                .map(|c| BASE64.encode(format!("{}:{}", c.username, c.password))),
            client: self.client.clone(),
        }
    }
}

/// A session for interacting with a specific repository in an OCI registry.
#[derive(Debug)]
pub struct RegistrySession {
    base_url: String,
    repository: String,
    auth: Option<String>,
    client: ReqwestClient,
}

impl RegistrySession {
    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(auth) = &self.auth {
            request.header(header::AUTHORIZATION, format!("Basic {auth}"))
        } else {
            request
        }
    }

    /// Check if a blob with the given digest exists.
    pub async fn blob_exists(&self, digest: &OciDigest) -> Result<bool> {
        let url = format!("{}/v2/{}/blobs/{}", self.base_url, self.repository, digest);
        let response = self
            .authorize(self.client.head(&url))
            .send()
            .await
            .map_err(|e| Error::transfer(format!("HEAD {url}"), e))?;
        Ok(response.status() == StatusCode::OK)
    }

    /// Fetch a blob with the given digest.
    pub async fn fetch_blob(&self, digest: &OciDigest) -> Result<Bytes> {
        let url = format!("{}/v2/{}/blobs/{}", self.base_url, self.repository, digest);
        let response = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(|e| Error::transfer(format!("GET {url}"), e))?;

        match response.status() {
            StatusCode::OK => response
                .bytes()
                .await
                .map_err(|e| Error::transfer(format!("read blob {digest}"), e)),
            StatusCode::NOT_FOUND => Err(Error::NotFound(format!(
                "blob {digest} not in {}/{}",
                self.base_url, self.repository
            ))),
            status => Err(Error::transfer_msg(format!(
                "fetch blob {digest}: unexpected status {status}"
            ))),
        }
    }

    /// Upload a blob, skipping the transfer when the registry already holds
    /// content under the same digest. Safe to repeat: a re-upload of
    /// identical bytes lands on the same digest.
    pub async fn upload_blob(&self, media_type: &str, content: &[u8]) -> Result<Descriptor> {
        let descriptor = Descriptor::from_content(media_type, content);

        if self.blob_exists(&descriptor.digest).await? {
            debug!(digest = %descriptor.digest, "blob already present, skipping upload");
            return Ok(descriptor);
        }

        // Start the upload session
        let start_url = format!("{}/v2/{}/blobs/uploads/", self.base_url, self.repository);
        let start_response = self
            .authorize(self.client.post(&start_url))
            .send()
            .await
            .map_err(|e| Error::transfer(format!("POST {start_url}"), e))?;

        if start_response.status() != StatusCode::ACCEPTED {
            return Err(Error::transfer_msg(format!(
                "start upload: unexpected status {}",
                start_response.status()
            )));
        }

        let location = start_response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| Error::transfer_msg("start upload: no location header".to_string()))?;

        let upload_url = if location.starts_with("http") {
            location.to_string()
        } else {
            format!("{}{}", self.base_url, location)
        };

        // Complete the upload in one monolithic PUT
        let complete_url = format!("{}?digest={}", upload_url, descriptor.digest);
        let complete_response = self
            .authorize(self.client.put(&complete_url).body(content.to_vec()))
            .send()
            .await
            .map_err(|e| Error::transfer(format!("PUT {complete_url}"), e))?;

        if complete_response.status() != StatusCode::CREATED {
            return Err(Error::transfer_msg(format!(
                "complete upload: unexpected status {}",
                complete_response.status()
            )));
        }

        debug!(digest = %descriptor.digest, size = descriptor.size, "uploaded blob");
        Ok(descriptor)
    }

    /// Register manifest bytes under a tag or digest reference.
    pub async fn put_manifest(
        &self,
        reference: &str,
        media_type: &str,
        manifest: &[u8],
    ) -> Result<()> {
        let url = format!(
            "{}/v2/{}/manifests/{}",
            self.base_url, self.repository, reference
        );
        let response = self
            .authorize(
                self.client
                    .put(&url)
                    .header(header::CONTENT_TYPE, media_type)
                    .body(manifest.to_vec()),
            )
            .send()
            .await
            .map_err(|e| Error::transfer(format!("PUT {url}"), e))?;

        match response.status() {
            StatusCode::CREATED | StatusCode::OK => Ok(()),
            status => Err(Error::transfer_msg(format!(
                "put manifest {reference}: unexpected status {status}"
            ))),
        }
    }

    /// Resolve a tag or digest reference to the manifest bytes and their
    /// descriptor. The descriptor's digest is recomputed from the fetched
    /// bytes rather than trusted from any registry header.
    pub async fn fetch_manifest(&self, reference: &str) -> Result<(Descriptor, Bytes)> {
        let url = format!(
            "{}/v2/{}/manifests/{}",
            self.base_url, self.repository, reference
        );
        let response = self
            .authorize(
                self.client
                    .get(&url)
                    .header(header::ACCEPT, MEDIA_TYPE_OCI_MANIFEST),
            )
            .send()
            .await
            .map_err(|e| Error::transfer(format!("GET {url}"), e))?;

        match response.status() {
            StatusCode::OK => {}
            StatusCode::NOT_FOUND => {
                return Err(Error::NotFound(format!(
                    "manifest {reference} not in {}/{}",
                    self.base_url, self.repository
                )))
            }
            status => {
                return Err(Error::transfer_msg(format!(
                    "fetch manifest {reference}: unexpected status {status}"
                )))
            }
        }

        let media_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(MEDIA_TYPE_OCI_MANIFEST)
            .to_string();

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::transfer(format!("read manifest {reference}"), e))?;

        let descriptor = Descriptor {
            media_type,
            digest: OciDigest::from_content(&body),
            size: body.len() as u64,
        };
        debug!(reference, digest = %descriptor.digest, "resolved manifest");
        Ok((descriptor, body))
    }
}
