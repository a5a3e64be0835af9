use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::digest::OciDigest;

/// Artifact type recorded in the manifest's `artifactType` field
pub const MEDIA_TYPE_RUNTIME_MANIFEST: &str = "application/vnd.eigenruntime.manifest.v1";
/// Media type of the config blob
pub const MEDIA_TYPE_RUNTIME_CONFIG: &str = "application/vnd.eigenruntime.manifest.config.v1+json";
/// Media type of the spec layer
pub const MEDIA_TYPE_YAML: &str = "text/yaml";
/// Media type of the manifest itself
pub const MEDIA_TYPE_OCI_MANIFEST: &str = "application/vnd.oci.image.manifest.v1+json";

/// Reserved annotation keys; the manifest builder always wins over
/// caller-supplied values for these.
pub const ANNOTATION_SPEC_VERSION: &str = "io.eigenruntime.spec.version";
pub const ANNOTATION_IMAGE_CREATED: &str = "org.opencontainers.image.created";
pub const ANNOTATION_IMAGE_DESCRIPTION: &str = "org.opencontainers.image.description";
pub const ANNOTATION_IMAGE_SOURCE: &str = "org.opencontainers.image.source";

pub const DEFAULT_SPEC_VERSION: &str = "v1";

/// Identifies a content blob without carrying it.
///
/// Two descriptors are equal iff digest and size match; the media type is
/// informative and not part of identity.
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Descriptor {
    /// Media type of the referenced content
    pub media_type: String,
    /// Digest of the referenced content
    pub digest: OciDigest,
    /// Size of the referenced content in bytes
    pub size: u64,
}

impl PartialEq for Descriptor {
    fn eq(&self, other: &Self) -> bool {
        self.digest == other.digest && self.size == other.size
    }
}

impl Descriptor {
    /// Build a descriptor for `content`, deriving digest and size from the
    /// bytes themselves.
    pub fn from_content(media_type: impl Into<String>, content: &[u8]) -> Self {
        Self {
            media_type: media_type.into(),
            digest: OciDigest::from_content(content),
            size: content.len() as u64,
        }
    }
}

/// One content blob within an artifact. Digest and size are always derived
/// from `content`, never set independently.
#[derive(Debug, Clone)]
pub struct Layer {
    pub content: Bytes,
    pub media_type: String,
    pub digest: OciDigest,
    pub size: u64,
}

impl Layer {
    pub fn new(media_type: impl Into<String>, content: Bytes) -> Self {
        let digest = OciDigest::from_content(&content);
        let size = content.len() as u64;
        Self {
            content,
            media_type: media_type.into(),
            digest,
            size,
        }
    }

    /// Descriptor identifying this layer's content.
    pub fn descriptor(&self) -> Descriptor {
        Descriptor {
            media_type: self.media_type.clone(),
            digest: self.digest.clone(),
            size: self.size,
        }
    }
}

/// The full bundle: serialized manifest, config blob and layers, addressable
/// by the digest of its manifest bytes (not of its payload).
#[derive(Debug, Clone)]
pub struct Artifact {
    /// Serialized manifest JSON
    pub manifest: Bytes,
    /// Config blob
    pub config: Bytes,
    /// Content layers, index 0 is the primary spec document
    pub layers: Vec<Layer>,
    /// Digest of `manifest` — the registry-addressable identity
    pub digest: OciDigest,
    /// Media type of the manifest
    pub media_type: String,
    /// Artifact type declared by the manifest
    pub artifact_type: String,
}

impl Artifact {
    /// Descriptor for the manifest blob of this artifact.
    pub fn manifest_descriptor(&self) -> Descriptor {
        Descriptor {
            media_type: self.media_type.clone(),
            digest: self.digest.clone(),
            size: self.manifest.len() as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_identity_ignores_media_type() {
        let a = Descriptor::from_content("text/yaml", b"payload");
        let mut b = a.clone();
        b.media_type = "application/octet-stream".to_string();
        assert_eq!(a, b);

        let c = Descriptor::from_content("text/yaml", b"other");
        assert_ne!(a, c);
    }

    #[test]
    fn layer_derives_digest_and_size_from_content() {
        let layer = Layer::new(MEDIA_TYPE_YAML, Bytes::from_static(b"kind: Test"));
        assert_eq!(layer.size, 10);
        assert_eq!(layer.digest, OciDigest::from_content(b"kind: Test"));
        assert_eq!(layer.descriptor().media_type, MEDIA_TYPE_YAML);
    }
}
