//! Collaborator interfaces.
//!
//! The usage collector, expiration engine and deletion executor talk to the
//! outside world only through these traits. Production implementations live
//! in `ecrm-aws`; in-memory doubles live in `ecrm-test`. Implementations
//! page through listings themselves and return complete results; any failed
//! call surfaces as [`crate::Error::Api`].

use async_trait::async_trait;

use crate::error::Result;
use crate::image::ImageRecord;

/// Container registry operations.
#[async_trait]
pub trait RegistryApi: Send + Sync {
    /// Lists repository names, or only `name` when given.
    async fn list_repositories(&self, name: Option<&str>) -> Result<Vec<String>>;

    /// Lists every image record in a repository.
    async fn describe_images(&self, repository: &str) -> Result<Vec<ImageRecord>>;

    /// Fetches raw manifest bodies for up to 100 tags. Tags that do not
    /// resolve are omitted from the result.
    async fn batch_get_manifests(&self, repository: &str, tags: &[String]) -> Result<Vec<String>>;

    /// Deletes up to 100 images by digest and returns the digests the
    /// registry reports as deleted.
    async fn batch_delete_images(&self, repository: &str, digests: &[String])
        -> Result<Vec<String>>;
}

/// A container of a running task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunningContainer {
    /// Container name.
    pub name: String,
    /// Image as declared (tag or digest form).
    pub image: String,
    /// Digest the runtime resolved the image to, if reported.
    pub image_digest: Option<String>,
}

/// A task running in a cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunningTask {
    /// Task identifier.
    pub task_arn: String,
    /// Task definition the task was started from.
    pub task_definition_arn: String,
    /// Containers of the task.
    pub containers: Vec<RunningContainer>,
}

/// A deployment of a service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDeployment {
    /// Service name.
    pub service_name: String,
    /// Deployment status (e.g. `PRIMARY`, `ACTIVE`).
    pub status: String,
    /// Task definition the deployment runs.
    pub task_definition: String,
}

/// Container orchestrator operations.
#[async_trait]
pub trait ClusterApi: Send + Sync {
    /// Lists cluster ARNs.
    async fn list_clusters(&self) -> Result<Vec<String>>;

    /// Lists and describes the running tasks of a cluster.
    async fn list_tasks(&self, cluster: &str) -> Result<Vec<RunningTask>>;

    /// Lists and describes the deployments of every service in a cluster.
    async fn list_service_deployments(&self, cluster: &str) -> Result<Vec<ServiceDeployment>>;

    /// Lists task definition family names.
    async fn list_task_definition_families(&self) -> Result<Vec<String>>;

    /// Lists the identifiers of the `count` most recent revisions of a
    /// family, newest first.
    async fn latest_task_definitions(&self, family: &str, count: u32) -> Result<Vec<String>>;

    /// Returns the container images declared by a task definition.
    async fn container_images(&self, task_definition: &str) -> Result<Vec<String>>;
}

/// A function known to the function platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionInfo {
    /// Function name.
    pub name: String,
    /// True for container-image packaged functions.
    pub image_packaged: bool,
}

/// Image a function currently runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionImage {
    /// Image URI as configured.
    pub image_uri: String,
    /// Image URI resolved to a digest, if reported.
    pub resolved_image_uri: Option<String>,
}

/// Serverless function platform operations.
#[async_trait]
pub trait FunctionApi: Send + Sync {
    /// Lists functions.
    async fn list_functions(&self) -> Result<Vec<FunctionInfo>>;

    /// Returns the current image of an image-packaged function.
    async fn function_image(&self, name: &str) -> Result<Option<FunctionImage>>;
}

/// Operator confirmation before destructive work.
pub trait Confirm: Send + Sync {
    /// Asks a yes/no question; returns true only on an explicit yes.
    fn confirm(&self, question: &str) -> bool;
}
