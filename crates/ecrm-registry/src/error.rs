//! Error types for repository evaluation and deletion.

use thiserror::Error;

/// Result type alias using [`RegistryError`].
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Errors that can occur while selecting, evaluating or pruning
/// repositories.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Listing repositories failed.
    #[error("Failed to list repositories: {source}")]
    RepositoryListFailed {
        /// Underlying error.
        #[source]
        source: ecrm_core::Error,
    },

    /// Listing the images of a repository failed.
    #[error("Failed to list images of {repository}: {source}")]
    InventoryFailed {
        /// Repository name.
        repository: String,
        /// Underlying error.
        #[source]
        source: ecrm_core::Error,
    },

    /// Fetching index manifests for sidecar resolution failed.
    #[error("Failed to fetch manifests of {repository}: {source}")]
    ManifestLookupFailed {
        /// Repository name.
        repository: String,
        /// Underlying error.
        #[source]
        source: ecrm_core::Error,
    },

    /// The operator declined deletion.
    #[error("Deletion of {count} images on {repository} aborted")]
    DeletionDeclined {
        /// Repository name.
        repository: String,
        /// Number of images that would have been deleted.
        count: usize,
    },

    /// A delete batch failed. Earlier batches stay deleted.
    #[error("Failed to delete batch {batch} ({count} images) on {repository}: {source}")]
    DeleteBatchFailed {
        /// Repository name.
        repository: String,
        /// Zero-based batch index.
        batch: usize,
        /// Digests in the failed batch.
        count: usize,
        /// Underlying error.
        #[source]
        source: ecrm_core::Error,
    },
}

impl RegistryError {
    /// Returns the repository the error is about, if any.
    #[must_use]
    pub fn repository(&self) -> Option<&str> {
        match self {
            Self::RepositoryListFailed { .. } => None,
            Self::InventoryFailed { repository, .. }
            | Self::ManifestLookupFailed { repository, .. }
            | Self::DeletionDeclined { repository, .. }
            | Self::DeleteBatchFailed { repository, .. } => Some(repository),
        }
    }
}
