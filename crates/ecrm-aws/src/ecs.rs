//! Cluster operations on Amazon ECS.

use async_trait::async_trait;
use aws_sdk_ecs::types::{SortOrder, TaskDefinitionFamilyStatus, TaskDefinitionStatus};
use aws_sdk_ecs::Client;
use ecrm_core::api::{ClusterApi, RunningContainer, RunningTask, ServiceDeployment};
use ecrm_core::{Result, TaskDefinitionKey};
use tracing::debug;

use crate::api_error;

/// Maximum services per `DescribeServices` call.
const DESCRIBE_SERVICES_LIMIT: usize = 10;

/// [`ClusterApi`] backed by the ECS API.
#[derive(Debug, Clone)]
pub struct EcsCluster {
    client: Client,
}

impl EcsCluster {
    /// Creates a cluster client.
    #[must_use]
    pub const fn new(client: Client) -> Self {
        Self { client }
    }
}

fn running_task(task: &aws_sdk_ecs::types::Task) -> RunningTask {
    RunningTask {
        task_arn: task.task_arn().unwrap_or_default().to_string(),
        task_definition_arn: task.task_definition_arn().unwrap_or_default().to_string(),
        containers: task
            .containers()
            .iter()
            .map(|c| RunningContainer {
                name: c.name().unwrap_or_default().to_string(),
                image: c.image().unwrap_or_default().to_string(),
                image_digest: c.image_digest().map(ToString::to_string),
            })
            .collect(),
    }
}

#[async_trait]
impl ClusterApi for EcsCluster {
    async fn list_clusters(&self) -> Result<Vec<String>> {
        let mut pages = self.client.list_clusters().into_paginator().send();
        let mut arns = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| api_error("ListClusters", e))?;
            arns.extend_from_slice(page.cluster_arns());
        }
        Ok(arns)
    }

    async fn list_tasks(&self, cluster: &str) -> Result<Vec<RunningTask>> {
        let mut pages = self.client.list_tasks().cluster(cluster).into_paginator().send();
        let mut tasks = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| api_error("ListTasks", e))?;
            if page.task_arns().is_empty() {
                continue;
            }
            let output = self
                .client
                .describe_tasks()
                .cluster(cluster)
                .set_tasks(Some(page.task_arns().to_vec()))
                .send()
                .await
                .map_err(|e| api_error("DescribeTasks", e))?;
            tasks.extend(output.tasks().iter().map(running_task));
        }
        Ok(tasks)
    }

    async fn list_service_deployments(&self, cluster: &str) -> Result<Vec<ServiceDeployment>> {
        let mut pages = self
            .client
            .list_services()
            .cluster(cluster)
            .into_paginator()
            .send();
        let mut deployments = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| api_error("ListServices", e))?;
            for arns in page.service_arns().chunks(DESCRIBE_SERVICES_LIMIT) {
                let output = self
                    .client
                    .describe_services()
                    .cluster(cluster)
                    .set_services(Some(arns.to_vec()))
                    .send()
                    .await
                    .map_err(|e| api_error("DescribeServices", e))?;
                for service in output.services() {
                    let service_name = service.service_name().unwrap_or_default();
                    debug!(service = %service_name, "Checking service");
                    deployments.extend(service.deployments().iter().filter_map(|d| {
                        Some(ServiceDeployment {
                            service_name: service_name.to_string(),
                            status: d.status().unwrap_or_default().to_string(),
                            task_definition: d.task_definition()?.to_string(),
                        })
                    }));
                }
            }
        }
        Ok(deployments)
    }

    async fn list_task_definition_families(&self) -> Result<Vec<String>> {
        let mut pages = self
            .client
            .list_task_definition_families()
            .status(TaskDefinitionFamilyStatus::Active)
            .into_paginator()
            .send();
        let mut families = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| api_error("ListTaskDefinitionFamilies", e))?;
            families.extend_from_slice(page.families());
        }
        Ok(families)
    }

    async fn latest_task_definitions(&self, family: &str, count: u32) -> Result<Vec<String>> {
        let limit = usize::try_from(count).unwrap_or(usize::MAX);
        let mut arns = Vec::new();
        if limit == 0 {
            return Ok(arns);
        }

        // the family filter is a prefix match, so other families are skipped
        let mut pages = self
            .client
            .list_task_definitions()
            .family_prefix(family)
            .status(TaskDefinitionStatus::Active)
            .sort(SortOrder::Desc)
            .into_paginator()
            .send();
        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| api_error("ListTaskDefinitions", e))?;
            for arn in page.task_definition_arns() {
                if !TaskDefinitionKey::parse(arn).is_ok_and(|key| key.family == family) {
                    continue;
                }
                arns.push(arn.clone());
                if arns.len() >= limit {
                    return Ok(arns);
                }
            }
        }
        Ok(arns)
    }

    async fn container_images(&self, task_definition: &str) -> Result<Vec<String>> {
        let output = self
            .client
            .describe_task_definition()
            .task_definition(task_definition)
            .send()
            .await
            .map_err(|e| api_error("DescribeTaskDefinition", e))?;
        Ok(output
            .task_definition()
            .map(|td| {
                td.container_definitions()
                    .iter()
                    .filter_map(|c| c.image())
                    .map(ToString::to_string)
                    .collect()
            })
            .unwrap_or_default())
    }
}
