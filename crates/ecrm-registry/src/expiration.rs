//! Per-repository expiration.
//!
//! A repository's inventory is evaluated in three tiers:
//!
//! 1. Plain images, newest first, against the retention policy and the
//!    held set. Each expired image yields a link tag (`sha256-<hex>`) when
//!    an image index in the repository carries that tag.
//! 2. Image indexes expire when one of their tags is an expired link tag.
//! 3. Content-index sidecars expire when an index manifest fetched for an
//!    expired link tag lists their digest.

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use ecrm_core::{ArtifactKind, HeldSet, ImageRecord, RegistryApi, RepositorySummary, RetentionPolicy};
use tracing::{debug, info, warn};

use crate::error::{RegistryError, Result};
use crate::oci::IndexManifest;

/// Maximum tags per manifest lookup.
pub const MANIFEST_BATCH_SIZE: usize = 100;

/// Digests to delete from one repository, with its summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryPlan {
    /// Counts and sizes of all and expired records.
    pub summary: RepositorySummary,
    /// Expired digests: images newest first, then indexes, then sidecars.
    pub expired: Vec<String>,
}

impl RepositoryPlan {
    /// Returns the repository name.
    #[must_use]
    pub fn repository(&self) -> &str {
        &self.summary.repository
    }

    /// Returns true if nothing expired.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.expired.is_empty()
    }
}

/// A repository listing split by artifact kind, each bucket newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inventory {
    /// Plain images.
    pub images: Vec<ImageRecord>,
    /// Image indexes.
    pub indexes: Vec<ImageRecord>,
    /// Content-index sidecars.
    pub sidecars: Vec<ImageRecord>,
}

impl Inventory {
    /// Classifies and sorts records. Unclassifiable records are dropped.
    #[must_use]
    pub fn classify(records: Vec<ImageRecord>) -> Self {
        let mut inventory = Self::default();
        for record in records {
            match record.kind() {
                Some(ArtifactKind::Image) => inventory.images.push(record),
                Some(ArtifactKind::ImageIndex) => inventory.indexes.push(record),
                Some(ArtifactKind::ContentIndex) => inventory.sidecars.push(record),
                None => debug!(
                    repository = %record.repository,
                    digest = %record.digest,
                    media_type = ?record.manifest_media_type,
                    artifact_type = ?record.artifact_media_type,
                    "Ignoring unclassified artifact"
                ),
            }
        }
        for bucket in [
            &mut inventory.images,
            &mut inventory.indexes,
            &mut inventory.sidecars,
        ] {
            bucket.sort_by(|a, b| {
                b.pushed_at
                    .cmp(&a.pushed_at)
                    .then_with(|| a.digest.cmp(&b.digest))
            });
        }
        inventory
    }

    /// Returns every tag carried by an image index.
    #[must_use]
    pub fn index_tags(&self) -> HashSet<&str> {
        self.indexes
            .iter()
            .flat_map(|r| r.tags.iter().map(String::as_str))
            .collect()
    }
}

/// Why a plain image was retained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Retention {
    /// Younger than the policy's expiry.
    NotExpired,
    /// Within the keep-count of tagged images; carries the running count.
    KeepCount(u32),
    /// Its digest reference is held.
    HeldDigest,
    /// A tag matches a keep pattern.
    KeepTag(String),
    /// A tag reference is held.
    HeldTag(String),
}

impl fmt::Display for Retention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotExpired => write!(f, "not expired"),
            Self::KeepCount(n) => write!(f, "in keep_count ({n})"),
            Self::HeldDigest => write!(f, "in use"),
            Self::KeepTag(tag) => write!(f, "tag {tag} matches a keep pattern"),
            Self::HeldTag(tag) => write!(f, "tag {tag} is in use"),
        }
    }
}

/// Decides whether a plain image is retained.
///
/// Images must be visited newest first. `kept_tagged` counts tagged images
/// past the expiry seen so far; untagged images never advance it.
pub fn retention(
    record: &ImageRecord,
    policy: &RetentionPolicy,
    held: &HeldSet,
    now: DateTime<Utc>,
    kept_tagged: &mut u32,
) -> Option<Retention> {
    if !policy.is_expired(record.pushed_at, now) {
        return Some(Retention::NotExpired);
    }

    if record.is_tagged() {
        *kept_tagged = kept_tagged.saturating_add(1);
        if *kept_tagged <= policy.keep_count {
            return Some(Retention::KeepCount(*kept_tagged));
        }
    }

    if held.contains(&record.digest_reference()) {
        return Some(Retention::HeldDigest);
    }

    if let Some(tag) = record.tags.iter().find(|t| policy.matches_tag(t)) {
        return Some(Retention::KeepTag(tag.clone()));
    }

    record
        .tag_references()
        .find(|r| held.contains(r))
        .and_then(|r| r.tag().map(|t| Retention::HeldTag(t.to_string())))
}

/// Evaluates repositories against their policies.
pub struct ExpirationEngine {
    registry: Arc<dyn RegistryApi>,
    now: DateTime<Utc>,
}

impl fmt::Debug for ExpirationEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpirationEngine")
            .field("now", &self.now)
            .finish_non_exhaustive()
    }
}

impl ExpirationEngine {
    /// Creates an engine evaluating ages against the current time.
    #[must_use]
    pub fn new(registry: Arc<dyn RegistryApi>) -> Self {
        Self {
            registry,
            now: Utc::now(),
        }
    }

    /// Sets the evaluation time.
    #[must_use]
    pub const fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    /// Lists a repository and returns the digests eligible for deletion.
    ///
    /// # Errors
    ///
    /// Fails if the listing fails or a manifest lookup call fails. An
    /// unparsable manifest body only logs a warning.
    pub async fn evaluate(
        &self,
        repository: &str,
        policy: &RetentionPolicy,
        held: &HeldSet,
    ) -> Result<RepositoryPlan> {
        let records = self
            .registry
            .describe_images(repository)
            .await
            .map_err(|source| RegistryError::InventoryFailed {
                repository: repository.to_string(),
                source,
            })?;
        let inventory = Inventory::classify(records);
        info!(
            repository = %repository,
            images = inventory.images.len(),
            image_indexes = inventory.indexes.len(),
            soci_indexes = inventory.sidecars.len(),
            "Listed repository"
        );

        let mut summary = RepositorySummary::new(repository);
        let mut expired = Vec::new();

        let index_tags = inventory.index_tags();
        let mut link_tags = BTreeSet::new();
        let mut kept_tagged = 0;
        for record in &inventory.images {
            summary.add(record);
            let name = format!("{repository}:{}", record.display_tag());
            if let Some(reason) = retention(record, policy, held, self.now, &mut kept_tagged) {
                info!(image = %name, reason = %reason, "Keeping image");
                continue;
            }

            info!(
                image = %name,
                digest = %record.digest,
                pushed_at = %record.pushed_at.to_rfc3339(),
                "Image is expired"
            );
            summary.expire(record);
            expired.push(record.digest.clone());

            let link = record.link_tag();
            if index_tags.contains(link.as_str()) {
                link_tags.insert(link);
            }
        }

        for record in &inventory.indexes {
            summary.add(record);
            if let Some(tag) = record.tags.iter().find(|t| link_tags.contains(*t)) {
                info!(image = %format!("{repository}:{tag}"), "Image index is expired");
                summary.expire(record);
                expired.push(record.digest.clone());
            }
        }

        let sidecars = self.content_index_digests(repository, &link_tags).await?;
        for record in &inventory.sidecars {
            summary.add(record);
            if sidecars.contains(&record.digest) {
                info!(image = %format!("{repository}@{}", record.digest), "SOCI index is expired");
                summary.expire(record);
                expired.push(record.digest.clone());
            }
        }

        Ok(RepositoryPlan { summary, expired })
    }

    /// Collects sidecar digests referenced by the index manifests behind
    /// the given link tags.
    async fn content_index_digests(
        &self,
        repository: &str,
        link_tags: &BTreeSet<String>,
    ) -> Result<HashSet<String>> {
        let tags: Vec<String> = link_tags.iter().cloned().collect();
        let mut digests = HashSet::new();
        for chunk in tags.chunks(MANIFEST_BATCH_SIZE) {
            let bodies = self
                .registry
                .batch_get_manifests(repository, chunk)
                .await
                .map_err(|source| RegistryError::ManifestLookupFailed {
                    repository: repository.to_string(),
                    source,
                })?;
            for body in bodies {
                match IndexManifest::parse(&body) {
                    Ok(index) => {
                        digests.extend(index.content_index_digests().map(ToString::to_string));
                    }
                    Err(err) => warn!(
                        repository = %repository,
                        error = %err,
                        "Failed to parse manifest, keeping its SOCI indexes"
                    ),
                }
            }
        }
        Ok(digests)
    }
}
