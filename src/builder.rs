use bytes::Bytes;
use tracing::info;

use crate::client::RegistryClient;
use crate::digest::{DigestError, OciDigest};
use crate::error::{Error, Result};
use crate::manifest::{create_minimal_config, ArtifactManifest, BuildOptions};
use crate::models::{Artifact, Layer, MEDIA_TYPE_OCI_MANIFEST, MEDIA_TYPE_YAML};
use crate::reference::Reference;
use crate::store::MemoryStore;

/// Assembles artifacts from spec documents and pushes them to a registry.
///
/// One builder is scoped to one build-and-push operation; its local store is
/// not a process-wide cache.
pub struct ArtifactBuilder {
    client: RegistryClient,
    store: MemoryStore,
}

impl ArtifactBuilder {
    pub fn new(client: RegistryClient) -> Self {
        Self {
            client,
            store: MemoryStore::new(),
        }
    }

    /// Assemble an artifact from raw spec bytes: minimal config blob,
    /// manifest with annotation defaulting, and a single spec layer.
    ///
    /// Blobs land in the local store in config, layers, manifest order, so
    /// that by the time the manifest blob is stored every descriptor it
    /// references is already resolvable.
    pub fn build(&mut self, spec_content: &[u8], opts: &BuildOptions) -> Result<Artifact> {
        let config = create_minimal_config()?;
        let manifest = ArtifactManifest::build(spec_content, &config, opts);
        let manifest_bytes = manifest.to_bytes()?;

        let artifact = Artifact {
            digest: OciDigest::from_content(&manifest_bytes),
            manifest: Bytes::from(manifest_bytes),
            config: Bytes::from(config),
            layers: vec![Layer::new(MEDIA_TYPE_YAML, Bytes::copy_from_slice(spec_content))],
            media_type: MEDIA_TYPE_OCI_MANIFEST.to_string(),
            artifact_type: manifest.artifact_type.clone(),
        };

        self.store.put(&manifest.config, artifact.config.clone());
        for layer in &artifact.layers {
            self.store.put(&layer.descriptor(), layer.content.clone());
        }
        self.store
            .put(&artifact.manifest_descriptor(), artifact.manifest.clone());

        info!(digest = %artifact.digest, layers = artifact.layers.len(), "built artifact");
        Ok(artifact)
    }

    /// Transfer every blob reachable from the artifact's manifest descriptor
    /// from the local store to the registry named by `reference`, then
    /// register the manifest. Returns the manifest digest.
    ///
    /// Partial transfers are not rolled back; a retried push re-sends
    /// content-addressed blobs, which the registry deduplicates.
    pub async fn push(&self, artifact: &Artifact, reference: &str) -> Result<OciDigest> {
        let reference: Reference = reference.parse()?;

        // The self-declared digest must match the serialized manifest bytes.
        let actual = OciDigest::from_content(&artifact.manifest);
        if actual != artifact.digest {
            return Err(Error::InvalidDigest(DigestError::Mismatch {
                expected: artifact.digest.to_string(),
                actual: actual.to_string(),
            }));
        }

        let manifest = ArtifactManifest::parse(&artifact.manifest)?;
        let session = self
            .client
            .session(&reference.registry, &reference.repository);

        let config = self.store.get(&manifest.config)?;
        session
            .upload_blob(&manifest.config.media_type, &config)
            .await?;

        for descriptor in &manifest.layers {
            let content = self.store.get(descriptor)?;
            session.upload_blob(&descriptor.media_type, &content).await?;
        }

        session
            .put_manifest(
                &reference.manifest_reference(),
                &artifact.media_type,
                &artifact.manifest,
            )
            .await?;

        info!(%reference, digest = %artifact.digest, "pushed artifact");
        Ok(artifact.digest.clone())
    }

    /// Build then push. If the build fails, no transfer is attempted.
    pub async fn build_and_push(
        &mut self,
        spec_content: &[u8],
        opts: &BuildOptions,
        reference: &str,
    ) -> Result<OciDigest> {
        let artifact = self.build(spec_content, opts)?;
        self.push(&artifact, reference).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientOptions;
    use crate::models::MEDIA_TYPE_RUNTIME_MANIFEST;

    fn test_builder() -> ArtifactBuilder {
        ArtifactBuilder::new(RegistryClient::new(ClientOptions::default()))
    }

    #[test]
    fn build_addresses_artifact_by_manifest_digest() {
        let mut builder = test_builder();
        let spec = b"apiVersion: v1\nkind: Test\nname: x\nversion: v1";
        let artifact = builder.build(spec, &BuildOptions::default()).unwrap();

        assert_eq!(artifact.digest, OciDigest::from_content(&artifact.manifest));
        assert_eq!(artifact.artifact_type, MEDIA_TYPE_RUNTIME_MANIFEST);
        assert_eq!(artifact.layers.len(), 1);
        assert_eq!(artifact.layers[0].content.as_ref(), spec);
    }

    #[test]
    fn build_stores_every_referenced_blob() {
        let mut builder = test_builder();
        let artifact = builder.build(b"spec", &BuildOptions::default()).unwrap();
        let manifest = ArtifactManifest::parse(&artifact.manifest).unwrap();

        assert!(builder.store.contains(&manifest.config));
        for layer in &manifest.layers {
            assert!(builder.store.contains(layer));
        }
        assert!(builder.store.contains(&artifact.manifest_descriptor()));
    }

    #[tokio::test]
    async fn push_rejects_tampered_manifest_digest() {
        let mut builder = test_builder();
        let mut artifact = builder.build(b"spec", &BuildOptions::default()).unwrap();
        artifact.digest = OciDigest::from_content(b"something else");

        let err = builder
            .push(&artifact, "localhost:5000/demo:latest")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidDigest(_)));
    }
}
