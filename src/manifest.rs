use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::{
    Descriptor, ANNOTATION_IMAGE_CREATED, ANNOTATION_IMAGE_DESCRIPTION, ANNOTATION_IMAGE_SOURCE,
    ANNOTATION_SPEC_VERSION, DEFAULT_SPEC_VERSION, MEDIA_TYPE_OCI_MANIFEST,
    MEDIA_TYPE_RUNTIME_CONFIG, MEDIA_TYPE_RUNTIME_MANIFEST, MEDIA_TYPE_YAML,
};

/// Options for building an artifact manifest.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    pub description: Option<String>,
    pub source: Option<String>,
    /// Spec version annotation, defaults to "v1"
    pub version: Option<String>,
    /// Caller-supplied annotations; reserved keys are overwritten by the
    /// builder and the caller's map is never mutated
    pub annotations: BTreeMap<String, String>,
    /// Creation timestamp, defaults to the time of the build call
    pub created_time: Option<DateTime<Utc>>,
}

/// An OCI artifact manifest wrapping a runtime spec document.
///
/// Field order matters: serialization must be byte-for-byte stable so two
/// builds of identical input produce identical manifest digests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactManifest {
    /// Schema version of the manifest, always 2
    pub schema_version: i32,
    /// Media type of the manifest
    pub media_type: String,
    /// Artifact type of the wrapped content
    pub artifact_type: String,
    /// Descriptor for the config blob
    pub config: Descriptor,
    /// Descriptors for the layer blobs, index 0 is the primary spec layer
    pub layers: Vec<Descriptor>,
    /// Manifest annotations; a BTreeMap keeps serialization order stable
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
}

impl ArtifactManifest {
    /// Assemble a manifest from a spec payload, a config payload and build
    /// options, applying the deterministic annotation defaulting rules.
    ///
    /// Malformed spec or config bytes are not rejected here; structural
    /// validation of the spec document is a separate concern.
    pub fn build(spec_content: &[u8], config: &[u8], opts: &BuildOptions) -> Self {
        let mut annotations = opts.annotations.clone();

        let version = opts
            .version
            .as_deref()
            .filter(|v| !v.is_empty())
            .unwrap_or(DEFAULT_SPEC_VERSION);
        annotations.insert(ANNOTATION_SPEC_VERSION.to_string(), version.to_string());

        let created = opts.created_time.unwrap_or_else(Utc::now);
        annotations.insert(
            ANNOTATION_IMAGE_CREATED.to_string(),
            created.to_rfc3339_opts(SecondsFormat::Secs, true),
        );

        if let Some(description) = opts.description.as_deref().filter(|d| !d.is_empty()) {
            annotations.insert(
                ANNOTATION_IMAGE_DESCRIPTION.to_string(),
                description.to_string(),
            );
        }

        if let Some(source) = opts.source.as_deref().filter(|s| !s.is_empty()) {
            annotations.insert(ANNOTATION_IMAGE_SOURCE.to_string(), source.to_string());
        }

        Self {
            schema_version: 2,
            media_type: MEDIA_TYPE_OCI_MANIFEST.to_string(),
            artifact_type: MEDIA_TYPE_RUNTIME_MANIFEST.to_string(),
            config: Descriptor::from_content(MEDIA_TYPE_RUNTIME_CONFIG, config),
            layers: vec![Descriptor::from_content(MEDIA_TYPE_YAML, spec_content)],
            annotations,
        }
    }

    /// Serialize to indented JSON with stable field order. Repeated calls on
    /// an identical manifest produce identical bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// Parse manifest bytes. Unknown fields are ignored for forward
    /// compatibility; invalid JSON or absent required fields fail with
    /// [`Error::MalformedManifest`].
    pub fn parse(data: &[u8]) -> Result<Self> {
        serde_json::from_slice(data).map_err(Error::MalformedManifest)
    }
}

/// Create the minimal config blob stored alongside the spec layer. The
/// content is structurally opaque JSON; only the creation time is recorded.
pub fn create_minimal_config() -> Result<Vec<u8>> {
    #[derive(Serialize)]
    struct MinimalConfig {
        created: String,
    }

    let config = MinimalConfig {
        created: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
    };
    Ok(serde_json::to_vec(&config)?)
}
