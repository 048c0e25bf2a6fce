//! In-memory registry, cluster and function platforms.
//!
//! Each double is configured with builder methods, records the calls the
//! code under test makes, and can be told to fail a named operation.

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use ecrm_core::api::{
    ClusterApi, Confirm, FunctionApi, FunctionImage, FunctionInfo, RegistryApi, RunningContainer,
    RunningTask, ServiceDeployment,
};
use ecrm_core::{Error, ImageRecord, Result, TaskDefinitionKey};
use parking_lot::Mutex;

use crate::fixtures::{task_definition_arn, TEST_ACCOUNT};

/// In-memory container registry.
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    state: Mutex<RegistryState>,
}

#[derive(Debug, Default)]
struct RegistryState {
    repositories: BTreeMap<String, Vec<ImageRecord>>,
    manifests: BTreeMap<(String, String), String>,
    failing: HashSet<&'static str>,
    failing_describe: HashSet<String>,
    fail_delete_batch: Option<usize>,
    describe_calls: Vec<String>,
    manifest_requests: Vec<(String, Vec<String>)>,
    delete_batches: Vec<(String, Vec<String>)>,
}

impl InMemoryRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an empty repository.
    #[must_use]
    pub fn with_repository(self, repository: &str) -> Self {
        self.state
            .lock()
            .repositories
            .entry(repository.to_string())
            .or_default();
        self
    }

    /// Adds records; each lands in the repository it names.
    #[must_use]
    pub fn with_images(self, records: impl IntoIterator<Item = ImageRecord>) -> Self {
        {
            let mut state = self.state.lock();
            for record in records {
                state
                    .repositories
                    .entry(record.repository.clone())
                    .or_default()
                    .push(record);
            }
        }
        self
    }

    /// Registers the manifest body returned for `repository:tag`.
    #[must_use]
    pub fn with_manifest(self, repository: &str, tag: &str, body: impl Into<String>) -> Self {
        self.state
            .lock()
            .manifests
            .insert((repository.to_string(), tag.to_string()), body.into());
        self
    }

    /// Makes every call of an operation fail (`ListRepositories`,
    /// `DescribeImages`, `BatchGetImage`, `BatchDeleteImage`).
    #[must_use]
    pub fn failing(self, operation: &'static str) -> Self {
        self.state.lock().failing.insert(operation);
        self
    }

    /// Makes listing one repository fail.
    #[must_use]
    pub fn failing_describe(self, repository: &str) -> Self {
        self.state
            .lock()
            .failing_describe
            .insert(repository.to_string());
        self
    }

    /// Makes the n-th delete batch (zero-based, across repositories) fail.
    #[must_use]
    pub fn failing_delete_batch(self, batch: usize) -> Self {
        self.state.lock().fail_delete_batch = Some(batch);
        self
    }

    /// Repositories listed with `describe_images`, in call order.
    #[must_use]
    pub fn describe_calls(&self) -> Vec<String> {
        self.state.lock().describe_calls.clone()
    }

    /// Tag batches requested with `batch_get_manifests`.
    #[must_use]
    pub fn manifest_requests(&self) -> Vec<(String, Vec<String>)> {
        self.state.lock().manifest_requests.clone()
    }

    /// Digest batches passed to `batch_delete_images`.
    #[must_use]
    pub fn delete_batches(&self) -> Vec<(String, Vec<String>)> {
        self.state.lock().delete_batches.clone()
    }

    /// Digests still present in a repository.
    #[must_use]
    pub fn remaining(&self, repository: &str) -> Vec<String> {
        self.state
            .lock()
            .repositories
            .get(repository)
            .map(|records| records.iter().map(|r| r.digest.clone()).collect())
            .unwrap_or_default()
    }
}

fn check(failing: &HashSet<&'static str>, operation: &'static str) -> Result<()> {
    if failing.contains(operation) {
        return Err(Error::api(operation, "injected failure"));
    }
    Ok(())
}

#[async_trait]
impl RegistryApi for InMemoryRegistry {
    async fn list_repositories(&self, name: Option<&str>) -> Result<Vec<String>> {
        let state = self.state.lock();
        check(&state.failing, "ListRepositories")?;
        match name {
            Some(name) if state.repositories.contains_key(name) => Ok(vec![name.to_string()]),
            Some(name) => Err(Error::api(
                "ListRepositories",
                format!("repository {name} not found"),
            )),
            None => Ok(state.repositories.keys().cloned().collect()),
        }
    }

    async fn describe_images(&self, repository: &str) -> Result<Vec<ImageRecord>> {
        let mut state = self.state.lock();
        state.describe_calls.push(repository.to_string());
        check(&state.failing, "DescribeImages")?;
        if state.failing_describe.contains(repository) {
            return Err(Error::api("DescribeImages", format!("{repository}: injected failure")));
        }
        Ok(state.repositories.get(repository).cloned().unwrap_or_default())
    }

    async fn batch_get_manifests(&self, repository: &str, tags: &[String]) -> Result<Vec<String>> {
        let mut state = self.state.lock();
        state
            .manifest_requests
            .push((repository.to_string(), tags.to_vec()));
        check(&state.failing, "BatchGetImage")?;
        Ok(tags
            .iter()
            .filter_map(|tag| {
                state
                    .manifests
                    .get(&(repository.to_string(), tag.clone()))
                    .cloned()
            })
            .collect())
    }

    async fn batch_delete_images(
        &self,
        repository: &str,
        digests: &[String],
    ) -> Result<Vec<String>> {
        let mut state = self.state.lock();
        let batch = state.delete_batches.len();
        state
            .delete_batches
            .push((repository.to_string(), digests.to_vec()));
        check(&state.failing, "BatchDeleteImage")?;
        if state.fail_delete_batch == Some(batch) {
            return Err(Error::api("BatchDeleteImage", format!("batch {batch}: injected failure")));
        }

        let records = state.repositories.entry(repository.to_string()).or_default();
        let before: HashSet<String> = records.iter().map(|r| r.digest.clone()).collect();
        records.retain(|r| !digests.contains(&r.digest));
        Ok(digests
            .iter()
            .filter(|d| before.contains(*d))
            .cloned()
            .collect())
    }
}

#[derive(Debug, Default)]
struct MockCluster {
    arn: String,
    tasks: Vec<RunningTask>,
    deployments: Vec<ServiceDeployment>,
}

/// In-memory container orchestrator.
#[derive(Debug, Default)]
pub struct InMemoryCluster {
    state: Mutex<ClusterState>,
}

#[derive(Debug, Default)]
struct ClusterState {
    clusters: Vec<MockCluster>,
    task_definitions: BTreeMap<TaskDefinitionKey, Vec<String>>,
    failing: HashSet<&'static str>,
    described_task_definitions: Vec<String>,
    scanned_clusters: Vec<String>,
}

/// Returns the cluster ARN for a cluster name.
#[must_use]
pub fn cluster_arn(name: &str) -> String {
    format!("arn:aws:ecs:us-east-1:{TEST_ACCOUNT}:cluster/{name}")
}

impl InMemoryCluster {
    /// Creates an orchestrator with no clusters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a cluster.
    #[must_use]
    pub fn with_cluster(self, name: &str) -> Self {
        self.state.lock().clusters.push(MockCluster {
            arn: cluster_arn(name),
            ..MockCluster::default()
        });
        self
    }

    /// Adds a running task to a cluster added earlier.
    #[must_use]
    pub fn with_task(
        self,
        cluster: &str,
        task_definition: &str,
        containers: Vec<RunningContainer>,
    ) -> Self {
        {
            let mut state = self.state.lock();
            let arn = cluster_arn(cluster);
            if let Some(c) = state.clusters.iter_mut().find(|c| c.arn == arn) {
                let id = c.tasks.len();
                c.tasks.push(RunningTask {
                    task_arn: format!("arn:aws:ecs:us-east-1:{TEST_ACCOUNT}:task/{cluster}/task{id}"),
                    task_definition_arn: task_definition.to_string(),
                    containers,
                });
            }
        }
        self
    }

    /// Adds a service deployment to a cluster added earlier.
    #[must_use]
    pub fn with_deployment(
        self,
        cluster: &str,
        service: &str,
        status: &str,
        task_definition: &str,
    ) -> Self {
        {
            let mut state = self.state.lock();
            let arn = cluster_arn(cluster);
            if let Some(c) = state.clusters.iter_mut().find(|c| c.arn == arn) {
                c.deployments.push(ServiceDeployment {
                    service_name: service.to_string(),
                    status: status.to_string(),
                    task_definition: task_definition.to_string(),
                });
            }
        }
        self
    }

    /// Registers a task definition revision with its container images.
    #[must_use]
    pub fn with_task_definition<I, S>(self, family: &str, revision: u32, images: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state.lock().task_definitions.insert(
            TaskDefinitionKey::new(family, revision),
            images.into_iter().map(Into::into).collect(),
        );
        self
    }

    /// Makes every call of an operation fail (`ListClusters`, `ListTasks`,
    /// `ListServices`, `ListTaskDefinitionFamilies`, `ListTaskDefinitions`,
    /// `DescribeTaskDefinition`).
    #[must_use]
    pub fn failing(self, operation: &'static str) -> Self {
        self.state.lock().failing.insert(operation);
        self
    }

    /// Task definitions described, in call order.
    #[must_use]
    pub fn described_task_definitions(&self) -> Vec<String> {
        self.state.lock().described_task_definitions.clone()
    }

    /// Clusters whose tasks were listed, in call order.
    #[must_use]
    pub fn scanned_clusters(&self) -> Vec<String> {
        self.state.lock().scanned_clusters.clone()
    }
}

#[async_trait]
impl ClusterApi for InMemoryCluster {
    async fn list_clusters(&self) -> Result<Vec<String>> {
        let state = self.state.lock();
        check(&state.failing, "ListClusters")?;
        Ok(state.clusters.iter().map(|c| c.arn.clone()).collect())
    }

    async fn list_tasks(&self, cluster: &str) -> Result<Vec<RunningTask>> {
        let mut state = self.state.lock();
        state.scanned_clusters.push(cluster.to_string());
        check(&state.failing, "ListTasks")?;
        Ok(state
            .clusters
            .iter()
            .find(|c| c.arn == cluster)
            .map(|c| c.tasks.clone())
            .unwrap_or_default())
    }

    async fn list_service_deployments(&self, cluster: &str) -> Result<Vec<ServiceDeployment>> {
        let state = self.state.lock();
        check(&state.failing, "ListServices")?;
        Ok(state
            .clusters
            .iter()
            .find(|c| c.arn == cluster)
            .map(|c| c.deployments.clone())
            .unwrap_or_default())
    }

    async fn list_task_definition_families(&self) -> Result<Vec<String>> {
        let state = self.state.lock();
        check(&state.failing, "ListTaskDefinitionFamilies")?;
        let mut families: Vec<String> = state
            .task_definitions
            .keys()
            .map(|k| k.family.clone())
            .collect();
        families.dedup();
        Ok(families)
    }

    async fn latest_task_definitions(&self, family: &str, count: u32) -> Result<Vec<String>> {
        let state = self.state.lock();
        check(&state.failing, "ListTaskDefinitions")?;
        let mut revisions: Vec<u32> = state
            .task_definitions
            .keys()
            .filter(|k| k.family == family)
            .map(|k| k.revision)
            .collect();
        revisions.sort_unstable_by(|a, b| b.cmp(a));
        Ok(revisions
            .into_iter()
            .take(count as usize)
            .map(|rev| task_definition_arn(family, rev))
            .collect())
    }

    async fn container_images(&self, task_definition: &str) -> Result<Vec<String>> {
        let mut state = self.state.lock();
        state
            .described_task_definitions
            .push(task_definition.to_string());
        check(&state.failing, "DescribeTaskDefinition")?;
        let key = TaskDefinitionKey::parse(task_definition)?;
        state.task_definitions.get(&key).cloned().ok_or_else(|| {
            Error::api(
                "DescribeTaskDefinition",
                format!("task definition {key} not found"),
            )
        })
    }
}

/// In-memory function platform.
#[derive(Debug, Default)]
pub struct InMemoryFunctions {
    state: Mutex<FunctionState>,
}

#[derive(Debug, Default)]
struct FunctionState {
    functions: Vec<(FunctionInfo, Option<FunctionImage>)>,
    failing: HashSet<&'static str>,
    image_lookups: Vec<String>,
}

impl InMemoryFunctions {
    /// Creates a platform with no functions.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a zip-packaged function.
    #[must_use]
    pub fn with_zip_function(self, name: &str) -> Self {
        self.state.lock().functions.push((
            FunctionInfo {
                name: name.to_string(),
                image_packaged: false,
            },
            None,
        ));
        self
    }

    /// Adds an image-packaged function.
    #[must_use]
    pub fn with_image_function(
        self,
        name: &str,
        image_uri: &str,
        resolved_image_uri: Option<&str>,
    ) -> Self {
        self.state.lock().functions.push((
            FunctionInfo {
                name: name.to_string(),
                image_packaged: true,
            },
            Some(FunctionImage {
                image_uri: image_uri.to_string(),
                resolved_image_uri: resolved_image_uri.map(ToString::to_string),
            }),
        ));
        self
    }

    /// Makes every call of an operation fail (`ListFunctions`, `GetFunction`).
    #[must_use]
    pub fn failing(self, operation: &'static str) -> Self {
        self.state.lock().failing.insert(operation);
        self
    }

    /// Functions whose image was looked up, in call order.
    #[must_use]
    pub fn image_lookups(&self) -> Vec<String> {
        self.state.lock().image_lookups.clone()
    }
}

#[async_trait]
impl FunctionApi for InMemoryFunctions {
    async fn list_functions(&self) -> Result<Vec<FunctionInfo>> {
        let state = self.state.lock();
        check(&state.failing, "ListFunctions")?;
        Ok(state.functions.iter().map(|(info, _)| info.clone()).collect())
    }

    async fn function_image(&self, name: &str) -> Result<Option<FunctionImage>> {
        let mut state = self.state.lock();
        state.image_lookups.push(name.to_string());
        check(&state.failing, "GetFunction")?;
        Ok(state
            .functions
            .iter()
            .find(|(info, _)| info.name == name)
            .and_then(|(_, image)| image.clone()))
    }
}

/// Confirmation double that always gives the same answer.
#[derive(Debug)]
pub struct ScriptedConfirm {
    answer: bool,
    questions: Mutex<Vec<String>>,
}

impl ScriptedConfirm {
    /// Always answers yes.
    #[must_use]
    pub const fn yes() -> Self {
        Self {
            answer: true,
            questions: Mutex::new(Vec::new()),
        }
    }

    /// Always answers no.
    #[must_use]
    pub const fn no() -> Self {
        Self {
            answer: false,
            questions: Mutex::new(Vec::new()),
        }
    }

    /// Questions asked so far.
    #[must_use]
    pub fn questions(&self) -> Vec<String> {
        self.questions.lock().clone()
    }
}

impl Confirm for ScriptedConfirm {
    fn confirm(&self, question: &str) -> bool {
        self.questions.lock().push(question.to_string());
        self.answer
    }
}

/// Returns a running container that reports a resolved digest.
#[must_use]
pub fn container(name: &str, image: &str, image_digest: Option<&str>) -> RunningContainer {
    RunningContainer {
        name: name.to_string(),
        image: image.to_string(),
        image_digest: image_digest.map(ToString::to_string),
    }
}
