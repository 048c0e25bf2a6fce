//! Registry operations on Amazon ECR.

use async_trait::async_trait;
use aws_sdk_ecr::types::{ImageDetail, ImageIdentifier};
use aws_sdk_ecr::Client;
use chrono::{DateTime, Utc};
use ecrm_core::image::media_types;
use ecrm_core::reference::ecr_registry_host;
use ecrm_core::{ImageRecord, RegistryApi, Result};
use tracing::{debug, warn};

use crate::api_error;

/// Manifest media types accepted when fetching index manifests.
const ACCEPTED_MEDIA_TYPES: [&str; 5] = [
    media_types::OCI_IMAGE_INDEX,
    media_types::DOCKER_MANIFEST_LIST,
    media_types::OCI_MANIFEST,
    media_types::DOCKER_MANIFEST_V1,
    media_types::DOCKER_MANIFEST_V2,
];

/// [`RegistryApi`] backed by the ECR API.
#[derive(Debug, Clone)]
pub struct EcrRegistry {
    client: Client,
    region: String,
}

impl EcrRegistry {
    /// Creates a registry client. `region` names the registry host of
    /// listed images.
    #[must_use]
    pub fn new(client: Client, region: impl Into<String>) -> Self {
        Self {
            client,
            region: region.into(),
        }
    }
}

/// Converts an ECR image detail into a record.
///
/// Details without a digest or push time are skipped.
#[must_use]
pub fn image_record(detail: &ImageDetail, region: &str) -> Option<ImageRecord> {
    let digest = detail.image_digest()?;
    let pushed_at = detail
        .image_pushed_at()
        .and_then(|t| DateTime::<Utc>::from_timestamp(t.secs(), t.subsec_nanos()))?;

    Some(ImageRecord {
        registry: ecr_registry_host(detail.registry_id().unwrap_or_default(), region),
        repository: detail.repository_name().unwrap_or_default().to_string(),
        digest: digest.to_string(),
        tags: detail.image_tags().to_vec(),
        pushed_at,
        size_bytes: detail
            .image_size_in_bytes()
            .and_then(|s| u64::try_from(s).ok())
            .unwrap_or(0),
        manifest_media_type: detail.image_manifest_media_type().map(ToString::to_string),
        artifact_media_type: detail.artifact_media_type().map(ToString::to_string),
    })
}

#[async_trait]
impl RegistryApi for EcrRegistry {
    async fn list_repositories(&self, name: Option<&str>) -> Result<Vec<String>> {
        let mut pages = self
            .client
            .describe_repositories()
            .set_repository_names(name.map(|n| vec![n.to_string()]))
            .into_paginator()
            .send();

        let mut names = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| api_error("DescribeRepositories", e))?;
            names.extend(
                page.repositories()
                    .iter()
                    .filter_map(|r| r.repository_name())
                    .map(ToString::to_string),
            );
        }
        Ok(names)
    }

    async fn describe_images(&self, repository: &str) -> Result<Vec<ImageRecord>> {
        let mut pages = self
            .client
            .describe_images()
            .repository_name(repository)
            .into_paginator()
            .send();

        let mut records = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| api_error("DescribeImages", e))?;
            for detail in page.image_details() {
                match image_record(detail, &self.region) {
                    Some(record) => records.push(record),
                    None => warn!(
                        repository = %repository,
                        digest = ?detail.image_digest(),
                        "Skipping image without digest or push time"
                    ),
                }
            }
        }
        Ok(records)
    }

    async fn batch_get_manifests(&self, repository: &str, tags: &[String]) -> Result<Vec<String>> {
        let ids = tags
            .iter()
            .map(|tag| ImageIdentifier::builder().image_tag(tag).build())
            .collect();
        let output = self
            .client
            .batch_get_image()
            .repository_name(repository)
            .set_image_ids(Some(ids))
            .set_accepted_media_types(Some(
                ACCEPTED_MEDIA_TYPES.iter().map(ToString::to_string).collect(),
            ))
            .send()
            .await
            .map_err(|e| api_error("BatchGetImage", e))?;

        for failure in output.failures() {
            debug!(
                repository = %repository,
                code = ?failure.failure_code(),
                reason = ?failure.failure_reason(),
                "Manifest not returned"
            );
        }
        Ok(output
            .images()
            .iter()
            .filter_map(|image| image.image_manifest())
            .map(ToString::to_string)
            .collect())
    }

    async fn batch_delete_images(
        &self,
        repository: &str,
        digests: &[String],
    ) -> Result<Vec<String>> {
        let ids = digests
            .iter()
            .map(|digest| ImageIdentifier::builder().image_digest(digest).build())
            .collect();
        let output = self
            .client
            .batch_delete_image()
            .repository_name(repository)
            .set_image_ids(Some(ids))
            .send()
            .await
            .map_err(|e| api_error("BatchDeleteImage", e))?;

        for failure in output.failures() {
            warn!(
                repository = %repository,
                digest = ?failure.image_id().and_then(|id| id.image_digest()),
                code = ?failure.failure_code(),
                reason = ?failure.failure_reason(),
                "Image not deleted"
            );
        }
        Ok(output
            .image_ids()
            .iter()
            .filter_map(|id| id.image_digest())
            .map(ToString::to_string)
            .collect())
    }
}
