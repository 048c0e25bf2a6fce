//! OCI image index types.
//!
//! Only the fields needed to find content-index sidecars are modelled;
//! unknown fields are ignored.

use std::collections::HashMap;

use ecrm_core::image::media_types;
use serde::Deserialize;

/// A media type string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(transparent)]
pub struct MediaType(String);

impl MediaType {
    /// Returns the media type string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// OCI content descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Descriptor {
    /// Media type of the referenced content.
    #[serde(default)]
    pub media_type: Option<MediaType>,

    /// Artifact type of the referenced content (OCI 1.1+).
    #[serde(default)]
    pub artifact_type: Option<MediaType>,

    /// Digest of the referenced content.
    pub digest: String,

    /// Size in bytes.
    #[serde(default)]
    pub size: u64,

    /// Optional annotations.
    #[serde(default)]
    pub annotations: Option<HashMap<String, String>>,
}

impl Descriptor {
    /// Returns true if the descriptor points at a SOCI content index.
    #[must_use]
    pub fn is_content_index(&self) -> bool {
        self.artifact_type
            .as_ref()
            .is_some_and(|t| t.as_str() == media_types::SOCI_INDEX)
    }
}

/// OCI image index (multi-platform manifest list).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexManifest {
    /// Schema version (always 2).
    pub schema_version: u32,

    /// Media type of this manifest.
    #[serde(default)]
    pub media_type: Option<MediaType>,

    /// Referenced manifests.
    #[serde(default)]
    pub manifests: Vec<Descriptor>,

    /// Optional annotations.
    #[serde(default)]
    pub annotations: Option<HashMap<String, String>>,
}

impl IndexManifest {
    /// Parses a raw manifest body.
    ///
    /// # Errors
    ///
    /// Returns the JSON error if the body is not an image index.
    pub fn parse(body: &str) -> serde_json::Result<Self> {
        serde_json::from_str(body)
    }

    /// Returns the digests of referenced content-index sidecars.
    pub fn content_index_digests(&self) -> impl Iterator<Item = &str> {
        self.manifests
            .iter()
            .filter(|d| d.is_content_index())
            .map(|d| d.digest.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_index_with_sidecar() {
        let json = r#"{
            "schemaVersion": 2,
            "mediaType": "application/vnd.oci.image.index.v1+json",
            "manifests": [
                {
                    "mediaType": "application/vnd.oci.image.manifest.v1+json",
                    "digest": "sha256:aaa",
                    "size": 1024,
                    "platform": {"architecture": "arm64", "os": "linux"}
                },
                {
                    "mediaType": "application/vnd.oci.image.manifest.v1+json",
                    "artifactType": "application/vnd.amazon.soci.index.v1+json",
                    "digest": "sha256:bbb",
                    "size": 512,
                    "annotations": {"com.amazon.soci.index-digest": "sha256:ccc"}
                }
            ]
        }"#;

        let index = IndexManifest::parse(json).unwrap();
        assert_eq!(index.manifests.len(), 2);
        assert_eq!(index.content_index_digests().collect::<Vec<_>>(), vec!["sha256:bbb"]);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(IndexManifest::parse("not json").is_err());
        assert!(IndexManifest::parse(r#"{"manifests": []}"#).is_err());
    }

    #[test]
    fn test_descriptor_is_content_index() {
        let plain: Descriptor =
            serde_json::from_str(r#"{"digest": "sha256:a", "size": 1}"#).unwrap();
        assert!(!plain.is_content_index());
        assert_eq!(plain.media_type, None);

        let sidecar: Descriptor = serde_json::from_str(
            r#"{"artifactType": "application/vnd.amazon.soci.index.v1+json", "digest": "sha256:b"}"#,
        )
        .unwrap();
        assert!(sidecar.is_content_index());
        assert_eq!(sidecar.size, 0);
    }
}
