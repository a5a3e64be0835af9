use std::str::FromStr;

use bytes::Bytes;
use tracing::info;

use crate::client::RegistryClient;
use crate::digest::{DigestError, OciDigest};
use crate::error::{Error, Result};
use crate::manifest::ArtifactManifest;
use crate::models::{Artifact, Descriptor, Layer};
use crate::reference::Reference;
use crate::store::MemoryStore;

/// Pulls artifacts from a registry and reconstructs them from a local
/// content-addressable store.
pub struct ArtifactFetcher {
    client: RegistryClient,
}

impl ArtifactFetcher {
    pub fn new(client: RegistryClient) -> Self {
        Self { client }
    }

    /// Pull the artifact named by `reference`.
    ///
    /// Two phases: first, every blob reachable from the resolved manifest
    /// descriptor is copied into a fresh local store; second, the artifact is
    /// reassembled purely from store contents. Any fetch failure aborts the
    /// whole operation and the store from that attempt is discarded — a
    /// partial artifact is never returned.
    pub async fn pull(&self, reference: &str) -> Result<Artifact> {
        let parsed: Reference = reference.parse()?;
        let session = self.client.session(&parsed.registry, &parsed.repository);

        let mut store = MemoryStore::new();

        let (manifest_desc, manifest_bytes) =
            session.fetch_manifest(&parsed.manifest_reference()).await?;

        // A digest-qualified reference pins the manifest identity; refuse
        // whatever else the registry serves under it.
        if let Some(requested) = &parsed.digest {
            if *requested != manifest_desc.digest {
                return Err(Error::InvalidDigest(DigestError::Mismatch {
                    expected: requested.to_string(),
                    actual: manifest_desc.digest.to_string(),
                }));
            }
        }
        store.put(&manifest_desc, manifest_bytes.clone());

        let manifest = ArtifactManifest::parse(&manifest_bytes)?;

        let config = session.fetch_blob(&manifest.config.digest).await?;
        verify_content(&manifest.config, &config)?;
        store.put(&manifest.config, config);

        for descriptor in &manifest.layers {
            let content = session.fetch_blob(&descriptor.digest).await?;
            verify_content(descriptor, &content)?;
            store.put(descriptor, content);
        }

        let artifact = reconstruct(&store, &manifest_desc)?;
        info!(reference, digest = %artifact.digest, layers = artifact.layers.len(), "pulled artifact");
        Ok(artifact)
    }

    /// Pull by exact content digest. The digest string is validated before
    /// any network interaction.
    pub async fn pull_by_digest(&self, registry: &str, digest: &str) -> Result<Artifact> {
        let digest = OciDigest::from_str(digest)?;
        let reference = format!("{registry}@{digest}");
        self.pull(&reference).await
    }

    /// Pull and parse just the manifest of the artifact at `reference`.
    pub async fn fetch_manifest(&self, reference: &str) -> Result<ArtifactManifest> {
        let artifact = self.pull(reference).await?;
        ArtifactManifest::parse(&artifact.manifest)
    }

    /// Pull and return the primary spec document of the artifact at
    /// `reference`.
    pub async fn fetch_spec(&self, reference: &str) -> Result<Bytes> {
        let artifact = self.pull(reference).await?;
        primary_spec_layer(&artifact)
    }
}

/// The primary spec document is the first layer by producer convention. An
/// empty layer is fine; a manifest listing zero layers is not.
pub fn primary_spec_layer(artifact: &Artifact) -> Result<Bytes> {
    artifact
        .layers
        .first()
        .map(|layer| layer.content.clone())
        .ok_or(Error::NoSpecLayer)
}

/// Content fetched from a remote is only admitted to the local store once it
/// hashes to the digest its descriptor claims. This is what keeps every layer
/// content-addressed even against a misbehaving registry.
fn verify_content(descriptor: &Descriptor, content: &[u8]) -> Result<()> {
    let actual = OciDigest::from_content(content);
    if actual != descriptor.digest {
        return Err(Error::InvalidDigest(DigestError::Mismatch {
            expected: descriptor.digest.to_string(),
            actual: actual.to_string(),
        }));
    }
    Ok(())
}

/// Reassemble an artifact from store contents, given the descriptor of its
/// manifest: fetch and parse the manifest, fetch the config blob, then fetch
/// each layer in manifest order. Pure store lookups, no network.
pub fn reconstruct(store: &MemoryStore, descriptor: &Descriptor) -> Result<Artifact> {
    let manifest_bytes = store.get(descriptor)?;
    let manifest = ArtifactManifest::parse(&manifest_bytes)?;

    let config = store.get(&manifest.config)?;

    let mut layers = Vec::with_capacity(manifest.layers.len());
    for layer_desc in &manifest.layers {
        let content = store.get(layer_desc)?;
        layers.push(Layer {
            content,
            media_type: layer_desc.media_type.clone(),
            digest: layer_desc.digest.clone(),
            size: layer_desc.size,
        });
    }

    Ok(Artifact {
        manifest: manifest_bytes,
        config,
        layers,
        digest: descriptor.digest.clone(),
        media_type: descriptor.media_type.clone(),
        artifact_type: manifest.artifact_type,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::BuildOptions;
    use crate::models::{MEDIA_TYPE_OCI_MANIFEST, MEDIA_TYPE_RUNTIME_MANIFEST};

    fn populated_store(spec: &[u8], config: &[u8]) -> (MemoryStore, Descriptor) {
        let manifest = ArtifactManifest::build(spec, config, &BuildOptions::default());
        let manifest_bytes = manifest.to_bytes().unwrap();
        let manifest_desc = Descriptor::from_content(MEDIA_TYPE_OCI_MANIFEST, &manifest_bytes);

        let mut store = MemoryStore::new();
        store.put(&manifest.config, Bytes::copy_from_slice(config));
        store.put(&manifest.layers[0], Bytes::copy_from_slice(spec));
        store.put(&manifest_desc, Bytes::from(manifest_bytes));
        (store, manifest_desc)
    }

    #[test]
    fn reconstruct_reassembles_full_artifact() {
        let spec = b"apiVersion: v1\nkind: Test\nname: x\nversion: v1";
        let (store, desc) = populated_store(spec, b"{}");

        let artifact = reconstruct(&store, &desc).unwrap();
        assert_eq!(artifact.digest, desc.digest);
        assert_eq!(artifact.artifact_type, MEDIA_TYPE_RUNTIME_MANIFEST);
        assert_eq!(artifact.config.as_ref(), b"{}");
        assert_eq!(artifact.layers.len(), 1);
        assert_eq!(artifact.layers[0].content.as_ref(), spec);
    }

    #[test]
    fn reconstruct_fails_when_config_blob_is_missing() {
        let spec = b"spec";
        let manifest = ArtifactManifest::build(spec, b"{}", &BuildOptions::default());
        let manifest_bytes = manifest.to_bytes().unwrap();
        let desc = Descriptor::from_content(MEDIA_TYPE_OCI_MANIFEST, &manifest_bytes);

        let mut store = MemoryStore::new();
        store.put(&manifest.layers[0], Bytes::from_static(spec));
        store.put(&desc, Bytes::from(manifest_bytes));

        assert!(matches!(
            reconstruct(&store, &desc),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn reconstruct_fails_on_unparseable_manifest() {
        let bytes = Bytes::from_static(b"not a manifest");
        let desc = Descriptor::from_content(MEDIA_TYPE_OCI_MANIFEST, &bytes);
        let mut store = MemoryStore::new();
        store.put(&desc, bytes);

        assert!(matches!(
            reconstruct(&store, &desc),
            Err(Error::MalformedManifest(_))
        ));
    }

    #[test]
    fn empty_spec_layer_is_not_an_error() {
        let (store, desc) = populated_store(b"", b"{}");
        let artifact = reconstruct(&store, &desc).unwrap();
        assert_eq!(primary_spec_layer(&artifact).unwrap().len(), 0);
    }

    #[test]
    fn artifact_without_layers_has_no_spec() {
        let (store, desc) = populated_store(b"spec", b"{}");
        let mut artifact = reconstruct(&store, &desc).unwrap();
        artifact.layers.clear();
        assert!(matches!(
            primary_spec_layer(&artifact),
            Err(Error::NoSpecLayer)
        ));
    }

    #[test]
    fn verify_content_rejects_bytes_that_hash_differently() {
        let descriptor = Descriptor::from_content("text/yaml", b"original spec");
        verify_content(&descriptor, b"original spec").unwrap();
        assert!(matches!(
            verify_content(&descriptor, b"swapped content"),
            Err(Error::InvalidDigest(_))
        ));
    }

    #[tokio::test]
    async fn pull_by_digest_validates_digest_first() {
        let fetcher = ArtifactFetcher::new(crate::client::RegistryClient::new(
            crate::client::ClientOptions::default(),
        ));
        let err = fetcher
            .pull_by_digest("ghcr.io/myorg/myartifact", "not-a-digest")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidDigest(_)));
    }
}
