//! Registry inventory records.
//!
//! An [`ImageRecord`] is one entry of a repository listing. Records are
//! classified into an [`ArtifactKind`] from the media types the registry
//! declares for them.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::reference::ImageReference;

/// Display name for an image without tags.
pub const UNTAGGED: &str = "__UNTAGGED__";

/// Media type constants used for classification.
pub mod media_types {
    /// Docker container image config.
    pub const DOCKER_CONTAINER_IMAGE: &str = "application/vnd.docker.container.image.v1+json";
    /// OCI image config.
    pub const OCI_IMAGE_CONFIG: &str = "application/vnd.oci.image.config.v1+json";
    /// OCI image index.
    pub const OCI_IMAGE_INDEX: &str = "application/vnd.oci.image.index.v1+json";
    /// Docker manifest list.
    pub const DOCKER_MANIFEST_LIST: &str =
        "application/vnd.docker.distribution.manifest.list.v2+json";
    /// OCI image manifest.
    pub const OCI_MANIFEST: &str = "application/vnd.oci.image.manifest.v1+json";
    /// Docker image manifest (schema 2).
    pub const DOCKER_MANIFEST_V2: &str = "application/vnd.docker.distribution.manifest.v2+json";
    /// Docker image manifest (schema 1).
    pub const DOCKER_MANIFEST_V1: &str = "application/vnd.docker.distribution.manifest.v1+json";
    /// SOCI content index (lazy-loading sidecar).
    pub const SOCI_INDEX: &str = "application/vnd.amazon.soci.index.v1+json";
}

/// Kind of artifact a registry record holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// Plain, single-platform container image.
    Image,
    /// Manifest list / image index referencing platform images.
    ImageIndex,
    /// Content-index sidecar attached to an image index.
    ContentIndex,
}

impl ArtifactKind {
    /// Classifies a record from its declared manifest and artifact media
    /// types. Returns `None` for artifacts that are none of the three kinds.
    ///
    /// # Examples
    ///
    /// ```
    /// use ecrm_core::{ArtifactKind, image::media_types};
    ///
    /// assert_eq!(
    ///     ArtifactKind::classify(None, Some(media_types::OCI_IMAGE_CONFIG)),
    ///     Some(ArtifactKind::Image),
    /// );
    /// assert_eq!(
    ///     ArtifactKind::classify(Some(media_types::OCI_IMAGE_INDEX), None),
    ///     Some(ArtifactKind::ImageIndex),
    /// );
    /// ```
    #[must_use]
    pub fn classify(
        manifest_media_type: Option<&str>,
        artifact_media_type: Option<&str>,
    ) -> Option<Self> {
        use media_types::{
            DOCKER_CONTAINER_IMAGE, DOCKER_MANIFEST_LIST, OCI_IMAGE_CONFIG, OCI_IMAGE_INDEX,
            SOCI_INDEX,
        };

        match (manifest_media_type, artifact_media_type) {
            (_, Some(DOCKER_CONTAINER_IMAGE | OCI_IMAGE_CONFIG)) => Some(Self::Image),
            (Some(OCI_IMAGE_INDEX | DOCKER_MANIFEST_LIST), _) => Some(Self::ImageIndex),
            (_, Some(SOCI_INDEX)) => Some(Self::ContentIndex),
            _ => None,
        }
    }
}

/// One record of a repository listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    /// Registry host owning the repository.
    pub registry: String,

    /// Repository name.
    pub repository: String,

    /// Content digest (e.g. `sha256:abc...`).
    pub digest: String,

    /// Tags pointing at this digest, in registry order.
    #[serde(default)]
    pub tags: Vec<String>,

    /// When the image was pushed.
    pub pushed_at: DateTime<Utc>,

    /// Size reported by the registry.
    pub size_bytes: u64,

    /// Declared manifest media type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest_media_type: Option<String>,

    /// Declared artifact (config) media type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_media_type: Option<String>,
}

impl ImageRecord {
    /// Returns the artifact kind, if the record is classifiable.
    #[must_use]
    pub fn kind(&self) -> Option<ArtifactKind> {
        ArtifactKind::classify(
            self.manifest_media_type.as_deref(),
            self.artifact_media_type.as_deref(),
        )
    }

    /// Returns true if the record carries at least one tag.
    #[must_use]
    pub fn is_tagged(&self) -> bool {
        !self.tags.is_empty()
    }

    /// Returns the tag list joined for display.
    ///
    /// # Examples
    ///
    /// ```
    /// # use ecrm_core::ImageRecord;
    /// # use chrono::Utc;
    /// let mut record = ImageRecord {
    ///     registry: "localhost:5000".into(),
    ///     repository: "app".into(),
    ///     digest: "sha256:abc".into(),
    ///     tags: vec![],
    ///     pushed_at: Utc::now(),
    ///     size_bytes: 0,
    ///     manifest_media_type: None,
    ///     artifact_media_type: None,
    /// };
    /// assert_eq!(record.display_tag(), "__UNTAGGED__");
    /// record.tags = vec!["v1".into(), "latest".into()];
    /// assert_eq!(record.display_tag(), "{v1,latest}");
    /// ```
    #[must_use]
    pub fn display_tag(&self) -> String {
        match self.tags.as_slice() {
            [] => UNTAGGED.to_string(),
            [tag] => tag.clone(),
            tags => format!("{{{}}}", tags.join(",")),
        }
    }

    /// Returns the canonical digest-qualified reference for this record.
    #[must_use]
    pub fn digest_reference(&self) -> ImageReference {
        ImageReference::digested(&self.registry, &self.repository, &self.digest)
    }

    /// Returns one tag-qualified reference per tag.
    pub fn tag_references(&self) -> impl Iterator<Item = ImageReference> + '_ {
        self.tags
            .iter()
            .map(|tag| ImageReference::tagged(&self.registry, &self.repository, tag))
    }

    /// Returns the tag an image index uses to refer to this digest:
    /// `sha256:<hex>` becomes `sha256-<hex>`.
    #[must_use]
    pub fn link_tag(&self) -> String {
        self.digest.replacen("sha256:", "sha256-", 1)
    }

    /// Returns how long ago the record was pushed.
    #[must_use]
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.pushed_at
    }
}
