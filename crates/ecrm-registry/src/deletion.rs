//! Batched deletion of expired digests.

use std::sync::Arc;

use ecrm_core::{Confirm, RegistryApi};
use tracing::{info, warn};

use crate::error::{RegistryError, Result};
use crate::expiration::RepositoryPlan;

/// Maximum digests per delete call.
pub const DELETE_BATCH_SIZE: usize = 100;

/// What the executor does with a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeleteMode {
    /// Report expired images only.
    #[default]
    DryRun,
    /// Delete expired images, asking first unless `force` is set.
    Delete {
        /// Skip the confirmation prompt.
        force: bool,
    },
}

/// Result of executing one repository plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeletionOutcome {
    /// Nothing expired.
    NothingToDelete {
        /// Repository name.
        repository: String,
    },
    /// Expired images found in dry-run mode.
    Found {
        /// Repository name.
        repository: String,
        /// Number of expired images.
        images: usize,
        /// Total size of expired images in bytes.
        size: u64,
    },
    /// Expired images deleted.
    Deleted {
        /// Repository name.
        repository: String,
        /// Digests requested for deletion.
        requested: usize,
        /// Digests the registry reported as deleted.
        deleted: usize,
    },
}

impl DeletionOutcome {
    /// Returns the repository name.
    #[must_use]
    pub fn repository(&self) -> &str {
        match self {
            Self::NothingToDelete { repository }
            | Self::Found { repository, .. }
            | Self::Deleted { repository, .. } => repository,
        }
    }
}

/// Issues batched deletes for repository plans.
pub struct DeletionExecutor {
    registry: Arc<dyn RegistryApi>,
    confirm: Arc<dyn Confirm>,
    mode: DeleteMode,
}

impl std::fmt::Debug for DeletionExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeletionExecutor")
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

impl DeletionExecutor {
    /// Creates an executor.
    #[must_use]
    pub fn new(registry: Arc<dyn RegistryApi>, confirm: Arc<dyn Confirm>, mode: DeleteMode) -> Self {
        Self {
            registry,
            confirm,
            mode,
        }
    }

    /// Executes a plan.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DeletionDeclined`] when the operator says
    /// no, and [`RegistryError::DeleteBatchFailed`] on the first failed
    /// batch. Batches already deleted are not restored.
    pub async fn execute(&self, plan: &RepositoryPlan) -> Result<DeletionOutcome> {
        let repository = plan.repository().to_string();
        let count = plan.expired.len();

        if plan.is_empty() {
            info!(repository = %repository, "No need to delete images");
            return Ok(DeletionOutcome::NothingToDelete { repository });
        }

        let force = match self.mode {
            DeleteMode::DryRun => {
                info!(
                    repository = %repository,
                    images = count,
                    size = plan.summary.expired_image_size,
                    "Expired {count} image(s) found on {repository}. Run delete command to delete them."
                );
                return Ok(DeletionOutcome::Found {
                    repository,
                    images: count,
                    size: plan.summary.expired_image_size,
                });
            }
            DeleteMode::Delete { force } => force,
        };

        if !force
            && !self
                .confirm
                .confirm(&format!("Do you delete {count} images on {repository}?"))
        {
            return Err(RegistryError::DeletionDeclined { repository, count });
        }

        for digest in &plan.expired {
            info!(repository = %repository, digest = %digest, "Deleting image");
        }

        let mut deleted = 0;
        for (batch, digests) in plan.expired.chunks(DELETE_BATCH_SIZE).enumerate() {
            match self.registry.batch_delete_images(&repository, digests).await {
                Ok(ids) => deleted += ids.len(),
                Err(source) => {
                    warn!(repository = %repository, deleted, "Deleted {deleted} images on {repository} before failure");
                    return Err(RegistryError::DeleteBatchFailed {
                        repository,
                        batch,
                        count: digests.len(),
                        source,
                    });
                }
            }
        }

        info!(repository = %repository, deleted, "Deleted {deleted} images on {repository}");
        Ok(DeletionOutcome::Deleted {
            repository,
            requested: count,
            deleted,
        })
    }
}

#[cfg(test)]
mod tests {
    use ecrm_core::RepositorySummary;
    use ecrm_test::{digest, InMemoryRegistry, MockImage, ScriptedConfirm};

    use super::*;

    fn plan(repository: &str, digests: Vec<String>) -> RepositoryPlan {
        RepositoryPlan {
            summary: RepositorySummary::new(repository),
            expired: digests,
        }
    }

    #[tokio::test]
    async fn test_empty_plan_is_noop() {
        let registry = Arc::new(InMemoryRegistry::new().failing("BatchDeleteImage"));
        let confirm = Arc::new(ScriptedConfirm::no());
        let executor = DeletionExecutor::new(
            registry.clone(),
            confirm.clone(),
            DeleteMode::Delete { force: false },
        );

        let outcome = executor.execute(&plan("app", vec![])).await.unwrap();
        assert_eq!(
            outcome,
            DeletionOutcome::NothingToDelete {
                repository: "app".to_string()
            }
        );
        assert!(registry.delete_batches().is_empty());
        assert!(confirm.questions().is_empty());
    }

    #[tokio::test]
    async fn test_dry_run_makes_no_calls() {
        let registry = Arc::new(InMemoryRegistry::new());
        let executor = DeletionExecutor::new(
            registry.clone(),
            Arc::new(ScriptedConfirm::no()),
            DeleteMode::DryRun,
        );
        let mut plan = plan("app", vec![digest("a"), digest("b")]);
        plan.summary.expired_image_size = 2048;

        let outcome = executor.execute(&plan).await.unwrap();
        assert_eq!(
            outcome,
            DeletionOutcome::Found {
                repository: "app".to_string(),
                images: 2,
                size: 2048
            }
        );
        assert!(registry.delete_batches().is_empty());
    }

    #[tokio::test]
    async fn test_declined_confirmation() {
        let registry = Arc::new(InMemoryRegistry::new());
        let confirm = Arc::new(ScriptedConfirm::no());
        let executor = DeletionExecutor::new(
            registry.clone(),
            confirm.clone(),
            DeleteMode::Delete { force: false },
        );

        let err = executor
            .execute(&plan("app", vec![digest("a")]))
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::DeletionDeclined { count: 1, .. }));
        assert_eq!(confirm.questions(), vec!["Do you delete 1 images on app?"]);
        assert!(registry.delete_batches().is_empty());
    }

    #[tokio::test]
    async fn test_force_skips_confirmation() {
        let registry = Arc::new(
            InMemoryRegistry::new().with_images([MockImage::image("app", "a").build()]),
        );
        let confirm = Arc::new(ScriptedConfirm::no());
        let executor = DeletionExecutor::new(
            registry.clone(),
            confirm.clone(),
            DeleteMode::Delete { force: true },
        );

        let outcome = executor
            .execute(&plan("app", vec![digest("a")]))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            DeletionOutcome::Deleted {
                repository: "app".to_string(),
                requested: 1,
                deleted: 1
            }
        );
        assert!(confirm.questions().is_empty());
        assert!(registry.remaining("app").is_empty());
    }
}
