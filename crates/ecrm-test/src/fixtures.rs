//! Fixture builders for registry inventory and manifests.
//!
//! Digests are derived from a seed string so tests can name images
//! (`digest("web-v1")`) instead of pasting hex.

use chrono::{DateTime, Duration, TimeZone, Utc};
use ecrm_core::image::media_types;
use ecrm_core::ImageRecord;
use sha2::{Digest, Sha256};

/// Registry host used by all fixtures.
pub const TEST_REGISTRY: &str = "123456789012.dkr.ecr.us-east-1.amazonaws.com";

/// Account used in fixture ARNs.
pub const TEST_ACCOUNT: &str = "123456789012";

/// Fixed evaluation time so ages are deterministic.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

/// Returns a stable `sha256:` digest for a seed.
#[must_use]
pub fn digest(seed: &str) -> String {
    format!("sha256:{}", hex::encode(Sha256::digest(seed.as_bytes())))
}

/// Returns `registry/repository:tag` on the test registry.
#[must_use]
pub fn tag_uri(repository: &str, tag: &str) -> String {
    format!("{TEST_REGISTRY}/{repository}:{tag}")
}

/// Returns `registry/repository@digest` on the test registry.
#[must_use]
pub fn digest_uri(repository: &str, digest: &str) -> String {
    format!("{TEST_REGISTRY}/{repository}@{digest}")
}

/// Returns the task definition ARN for a family revision.
#[must_use]
pub fn task_definition_arn(family: &str, revision: u32) -> String {
    format!("arn:aws:ecs:us-east-1:{TEST_ACCOUNT}:task-definition/{family}:{revision}")
}

/// Builder for [`ImageRecord`] fixtures.
///
/// # Examples
///
/// ```rust
/// use ecrm_test::MockImage;
///
/// let record = MockImage::image("app", "v1")
///     .with_tags(["v1"])
///     .pushed_days_ago(40)
///     .build();
/// assert_eq!(record.tags, vec!["v1"]);
/// ```
#[derive(Debug, Clone)]
pub struct MockImage {
    record: ImageRecord,
}

impl MockImage {
    fn new(repository: &str, seed: &str, manifest: &str, artifact: Option<&str>) -> Self {
        Self {
            record: ImageRecord {
                registry: TEST_REGISTRY.to_string(),
                repository: repository.to_string(),
                digest: digest(seed),
                tags: Vec::new(),
                pushed_at: fixed_now(),
                size_bytes: 10_000_000,
                manifest_media_type: Some(manifest.to_string()),
                artifact_media_type: artifact.map(ToString::to_string),
            },
        }
    }

    /// A plain single-platform image.
    #[must_use]
    pub fn image(repository: &str, seed: &str) -> Self {
        Self::new(
            repository,
            seed,
            media_types::DOCKER_MANIFEST_V2,
            Some(media_types::DOCKER_CONTAINER_IMAGE),
        )
    }

    /// A multi-platform image index.
    #[must_use]
    pub fn index(repository: &str, seed: &str) -> Self {
        Self::new(repository, seed, media_types::OCI_IMAGE_INDEX, None).with_size(1_000)
    }

    /// A SOCI content-index sidecar.
    #[must_use]
    pub fn soci(repository: &str, seed: &str) -> Self {
        Self::new(
            repository,
            seed,
            media_types::OCI_MANIFEST,
            Some(media_types::SOCI_INDEX),
        )
        .with_size(50_000)
    }

    /// An artifact of a kind the collector does not classify.
    #[must_use]
    pub fn other(repository: &str, seed: &str) -> Self {
        Self::new(
            repository,
            seed,
            media_types::OCI_MANIFEST,
            Some("application/vnd.cncf.helm.config.v1+json"),
        )
    }

    /// Sets the tags.
    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.record.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the push time relative to [`fixed_now`].
    #[must_use]
    pub fn pushed_days_ago(mut self, days: i64) -> Self {
        self.record.pushed_at = fixed_now() - Duration::days(days);
        self
    }

    /// Sets the size in bytes.
    #[must_use]
    pub const fn with_size(mut self, size_bytes: u64) -> Self {
        self.record.size_bytes = size_bytes;
        self
    }

    /// Returns the record's digest.
    #[must_use]
    pub fn digest(&self) -> &str {
        &self.record.digest
    }

    /// Builds the record.
    #[must_use]
    pub fn build(self) -> ImageRecord {
        self.record
    }
}

/// Builds OCI image index manifest bodies.
#[derive(Debug, Clone, Default)]
pub struct IndexManifestBuilder {
    manifests: Vec<serde_json::Value>,
}

impl IndexManifestBuilder {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a platform image descriptor.
    #[must_use]
    pub fn image(mut self, digest: &str) -> Self {
        self.manifests.push(serde_json::json!({
            "mediaType": media_types::OCI_MANIFEST,
            "digest": digest,
            "size": 1024,
            "platform": { "architecture": "amd64", "os": "linux" }
        }));
        self
    }

    /// Adds a SOCI index descriptor.
    #[must_use]
    pub fn soci(mut self, digest: &str) -> Self {
        self.manifests.push(serde_json::json!({
            "mediaType": media_types::OCI_MANIFEST,
            "artifactType": media_types::SOCI_INDEX,
            "digest": digest,
            "size": 512,
            "annotations": { "com.amazon.soci.index-digest": digest }
        }));
        self
    }

    /// Renders the manifest body.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::json!({
            "schemaVersion": 2,
            "mediaType": media_types::OCI_IMAGE_INDEX,
            "manifests": self.manifests,
        })
        .to_string()
    }
}
