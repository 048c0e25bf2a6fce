//! Error types for usage collection.

use thiserror::Error;

/// Result type alias using [`UsageError`].
pub type Result<T> = std::result::Result<T, UsageError>;

/// Errors that abort usage collection.
///
/// Every variant is fatal: an incomplete held set would make deletions
/// unsafe, so there is no partial result.
#[derive(Debug, Error)]
pub enum UsageError {
    /// Listing clusters failed.
    #[error("Failed to list clusters: {source}")]
    ClusterListFailed {
        /// Underlying error.
        #[source]
        source: ecrm_core::Error,
    },

    /// Listing the tasks or services of a cluster failed.
    #[error("Failed to scan cluster {cluster}: {source}")]
    ClusterScanFailed {
        /// Cluster ARN.
        cluster: String,
        /// Underlying error.
        #[source]
        source: ecrm_core::Error,
    },

    /// Listing task definition families failed.
    #[error("Failed to list task definition families: {source}")]
    FamilyListFailed {
        /// Underlying error.
        #[source]
        source: ecrm_core::Error,
    },

    /// Listing the revisions of a family failed.
    #[error("Failed to list revisions of task definition family {family}: {source}")]
    FamilyScanFailed {
        /// Family name.
        family: String,
        /// Underlying error.
        #[source]
        source: ecrm_core::Error,
    },

    /// A task definition could not be parsed or described.
    #[error("Failed to inspect task definition {task_definition}: {source}")]
    TaskDefinitionFailed {
        /// Task definition identifier.
        task_definition: String,
        /// Underlying error.
        #[source]
        source: ecrm_core::Error,
    },

    /// Listing functions failed.
    #[error("Failed to list functions: {source}")]
    FunctionListFailed {
        /// Underlying error.
        #[source]
        source: ecrm_core::Error,
    },

    /// Looking up the image of a function failed.
    #[error("Failed to get image of function {function}: {source}")]
    FunctionScanFailed {
        /// Function name.
        function: String,
        /// Underlying error.
        #[source]
        source: ecrm_core::Error,
    },
}
