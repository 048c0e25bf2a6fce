//! Matching repositories to retention policies.

use std::sync::Arc;

use ecrm_core::{RegistryApi, RetentionPolicy};
use tracing::debug;

use crate::error::{RegistryError, Result};

/// A repository and the policy that governs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedRepository<'a> {
    /// Repository name.
    pub name: String,
    /// First policy matching the name.
    pub policy: &'a RetentionPolicy,
}

/// Returns the first policy matching a repository name.
#[must_use]
pub fn select_policy<'a>(
    policies: &'a [RetentionPolicy],
    repository: &str,
) -> Option<&'a RetentionPolicy> {
    policies.iter().find(|p| p.matches_repository(repository))
}

/// Pairs repositories with their first matching policy, dropping
/// repositories no policy matches. Input order is preserved.
#[must_use]
pub fn select_repositories<'a>(
    repositories: impl IntoIterator<Item = String>,
    policies: &'a [RetentionPolicy],
) -> Vec<SelectedRepository<'a>> {
    repositories
        .into_iter()
        .filter_map(|name| match select_policy(policies, &name) {
            Some(policy) => Some(SelectedRepository { name, policy }),
            None => {
                debug!(repository = %name, "No retention policy matches, skipping");
                None
            }
        })
        .collect()
}

/// Lists live repositories and selects the ones a policy governs.
pub struct RepositorySelector {
    registry: Arc<dyn RegistryApi>,
}

impl std::fmt::Debug for RepositorySelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositorySelector").finish_non_exhaustive()
    }
}

impl RepositorySelector {
    /// Creates a selector.
    #[must_use]
    pub fn new(registry: Arc<dyn RegistryApi>) -> Self {
        Self { registry }
    }

    /// Lists repositories (only `only` when given) and selects them.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::RepositoryListFailed`] if listing fails.
    pub async fn select<'a>(
        &self,
        policies: &'a [RetentionPolicy],
        only: Option<&str>,
    ) -> Result<Vec<SelectedRepository<'a>>> {
        let repositories = self
            .registry
            .list_repositories(only)
            .await
            .map_err(|source| RegistryError::RepositoryListFailed { source })?;
        Ok(select_repositories(repositories, policies))
    }
}
