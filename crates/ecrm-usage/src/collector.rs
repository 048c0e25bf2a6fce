//! Usage collection from the cluster and function platforms.
//!
//! The collector runs four sequential scans and merges them into one
//! [`HeldSet`]:
//!
//! 1. Cluster scan: images of running task containers, resolved to digest
//!    form, plus the task definitions referenced by tasks and service
//!    deployments.
//! 2. Family scan: the latest revisions of each selected family.
//! 3. Declaration expansion: the images declared by every task definition
//!    found by the first two scans, as declared.
//! 4. Function scan: the images of image-packaged functions.

use std::collections::BTreeSet;
use std::sync::Arc;

use ecrm_core::api::{ClusterApi, FunctionApi, RunningContainer};
use ecrm_core::taskdef::arn_resource_name;
use ecrm_core::{first_selector, Config, HeldSet, ImageReference, ResourceSelector, TaskDefinitionKey};
use tracing::{debug, info};

use crate::error::{Result, UsageError};

/// Builds the held set from injected platform clients.
pub struct UsageCollector {
    clusters: Arc<dyn ClusterApi>,
    functions: Arc<dyn FunctionApi>,
}

impl std::fmt::Debug for UsageCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UsageCollector").finish_non_exhaustive()
    }
}

impl UsageCollector {
    /// Creates a collector.
    #[must_use]
    pub fn new(clusters: Arc<dyn ClusterApi>, functions: Arc<dyn FunctionApi>) -> Self {
        Self {
            clusters,
            functions,
        }
    }

    /// Runs every scan and returns the merged held set.
    ///
    /// # Errors
    ///
    /// Returns the first listing or describe failure; nothing is returned
    /// for a partial scan.
    pub async fn collect(&self, config: &Config) -> Result<HeldSet> {
        let mut held = HeldSet::new();
        let mut task_definitions = BTreeSet::new();

        self.scan_clusters(&config.clusters, &mut held, &mut task_definitions)
            .await?;
        self.scan_families(&config.task_definitions, &mut task_definitions)
            .await?;
        self.expand_declarations(&task_definitions, &mut held).await?;
        self.scan_functions(&config.lambda_functions, &mut held)
            .await?;

        info!(
            images = held.len(),
            task_definitions = task_definitions.len(),
            "Collected images in use"
        );
        Ok(held)
    }

    /// Scans running tasks and service deployments of selected clusters.
    ///
    /// Running container images are added to `held` in digest form; the
    /// referenced task definitions are added to `task_definitions`.
    ///
    /// # Errors
    ///
    /// Fails if listing clusters, tasks or services fails, or if a task
    /// definition identifier cannot be parsed.
    pub async fn scan_clusters(
        &self,
        selectors: &[ResourceSelector],
        held: &mut HeldSet,
        task_definitions: &mut BTreeSet<TaskDefinitionKey>,
    ) -> Result<()> {
        if selectors.is_empty() {
            return Ok(());
        }
        let clusters = self
            .clusters
            .list_clusters()
            .await
            .map_err(|source| UsageError::ClusterListFailed { source })?;

        for cluster in clusters {
            let name = arn_resource_name(&cluster, "cluster/");
            if first_selector(selectors, &[cluster.as_str(), name]).is_none() {
                continue;
            }
            debug!(cluster = %cluster, "Checking cluster");

            let scan_failed = |source| UsageError::ClusterScanFailed {
                cluster: cluster.clone(),
                source,
            };

            let tasks = self.clusters.list_tasks(&cluster).await.map_err(scan_failed)?;
            for task in &tasks {
                let key = parse_key(&task.task_definition_arn)?;
                let task_id = arn_resource_name(&task.task_arn, "task/");
                if task_definitions.insert(key.clone()) {
                    info!(task_definition = %key, task = %task_id, "Task definition is in use");
                }
                for container in &task.containers {
                    let Some(reference) = resolve_container(container) else {
                        continue;
                    };
                    if held.add(reference.clone(), task.task_definition_arn.clone()) {
                        info!(
                            image = %reference,
                            container = %container.name,
                            task = %task_id,
                            "Image is in use by running container"
                        );
                    }
                }
            }

            let deployments = self
                .clusters
                .list_service_deployments(&cluster)
                .await
                .map_err(scan_failed)?;
            for deployment in &deployments {
                let key = parse_key(&deployment.task_definition)?;
                if task_definitions.insert(key.clone()) {
                    info!(
                        task_definition = %key,
                        status = %deployment.status,
                        service = %format!("{}/{name}", deployment.service_name),
                        "Task definition is in use by deployment"
                    );
                }
            }
        }
        Ok(())
    }

    /// Adds the latest `keep_count` revisions of each selected family.
    ///
    /// # Errors
    ///
    /// Fails if listing families or revisions fails.
    pub async fn scan_families(
        &self,
        selectors: &[ResourceSelector],
        task_definitions: &mut BTreeSet<TaskDefinitionKey>,
    ) -> Result<()> {
        if selectors.is_empty() {
            return Ok(());
        }
        let families = self
            .clusters
            .list_task_definition_families()
            .await
            .map_err(|source| UsageError::FamilyListFailed { source })?;

        for family in families {
            let Some(selector) = first_selector(selectors, &[family.as_str()]) else {
                continue;
            };
            if selector.keep_count == 0 {
                continue;
            }
            debug!(
                family = %family,
                keep_count = selector.keep_count,
                "Checking latest task definition revisions"
            );
            let revisions = self
                .clusters
                .latest_task_definitions(&family, selector.keep_count)
                .await
                .map_err(|source| UsageError::FamilyScanFailed {
                    family: family.clone(),
                    source,
                })?;
            for revision in &revisions {
                task_definitions.insert(parse_key(revision)?);
            }
        }
        Ok(())
    }

    /// Adds every registry image declared by the given task definitions.
    ///
    /// Declared images are held as declared; tags are not resolved.
    ///
    /// # Errors
    ///
    /// Fails if describing a task definition fails.
    pub async fn expand_declarations(
        &self,
        task_definitions: &BTreeSet<TaskDefinitionKey>,
        held: &mut HeldSet,
    ) -> Result<()> {
        for key in task_definitions {
            let identifier = key.to_string();
            let images = self
                .clusters
                .container_images(&identifier)
                .await
                .map_err(|source| UsageError::TaskDefinitionFailed {
                    task_definition: identifier.clone(),
                    source,
                })?;
            for image in images {
                let Some(reference) = registry_reference(&image) else {
                    continue;
                };
                if held.add(reference.clone(), identifier.clone()) {
                    info!(image = %reference.short(), task_definition = %identifier, "Image is in use by task definition");
                }
            }
        }
        Ok(())
    }

    /// Adds the images of selected image-packaged functions.
    ///
    /// # Errors
    ///
    /// Fails if listing functions or reading a function's image fails.
    pub async fn scan_functions(
        &self,
        selectors: &[ResourceSelector],
        held: &mut HeldSet,
    ) -> Result<()> {
        if selectors.is_empty() {
            return Ok(());
        }
        let functions = self
            .functions
            .list_functions()
            .await
            .map_err(|source| UsageError::FunctionListFailed { source })?;

        for function in functions {
            if first_selector(selectors, &[function.name.as_str()]).is_none() {
                continue;
            }
            if !function.image_packaged {
                debug!(function = %function.name, "Skipping zip packaged function");
                continue;
            }
            let image = self
                .functions
                .function_image(&function.name)
                .await
                .map_err(|source| UsageError::FunctionScanFailed {
                    function: function.name.clone(),
                    source,
                })?;
            let Some(image) = image else {
                continue;
            };

            let uris = std::iter::once(image.image_uri.as_str())
                .chain(image.resolved_image_uri.as_deref());
            for uri in uris {
                let Some(reference) = registry_reference(uri) else {
                    continue;
                };
                if held.add(reference.clone(), function.name.clone()) {
                    info!(image = %reference.short(), function = %function.name, "Image is in use by function");
                }
            }
        }
        Ok(())
    }
}

fn parse_key(identifier: &str) -> Result<TaskDefinitionKey> {
    TaskDefinitionKey::parse(identifier).map_err(|source| UsageError::TaskDefinitionFailed {
        task_definition: identifier.to_string(),
        source,
    })
}

/// Parses an image and keeps it only when it is hosted in the registry.
fn registry_reference(image: &str) -> Option<ImageReference> {
    match ImageReference::parse(image) {
        Ok(reference) if reference.is_ecr() => Some(reference),
        Ok(_) => {
            debug!(image = %image, "Skipping non registry image");
            None
        }
        Err(err) => {
            debug!(image = %image, error = %err, "Skipping unparsable image");
            None
        }
    }
}

/// Resolves a running container's image to its digest form.
///
/// Tagged images take the digest the runtime reports; a tagged image
/// without a reported digest cannot be pinned and is skipped.
fn resolve_container(container: &RunningContainer) -> Option<ImageReference> {
    let reference = registry_reference(&container.image)?;
    if reference.is_digest() {
        return Some(reference);
    }
    match container.image_digest.as_deref() {
        Some(digest) if !digest.is_empty() => Some(reference.with_digest(digest)),
        _ => {
            debug!(container = %container.name, image = %reference, "Container reports no image digest");
            None
        }
    }
}
