//! # ecrm AWS
//!
//! Production implementations of the ecrm collaborator traits:
//!
//! - [`EcrRegistry`] - [`RegistryApi`](ecrm_core::RegistryApi) on Amazon ECR
//! - [`EcsCluster`] - [`ClusterApi`](ecrm_core::ClusterApi) on Amazon ECS
//! - [`LambdaFunctions`] - [`FunctionApi`](ecrm_core::FunctionApi) on AWS Lambda
//!
//! Every listing pages through to the end; a failed call becomes
//! [`ecrm_core::Error::Api`] with the SDK's full error context.
//!
//! ## Example
//!
//! ```rust,no_run
//! use ecrm_aws::AwsPlatform;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let platform = AwsPlatform::load(Some("ap-northeast-1".to_string())).await?;
//! println!("region: {}", platform.region);
//! # Ok(())
//! # }
//! ```

pub mod ecr;
pub mod ecs;
pub mod lambda;

use aws_config::{BehaviorVersion, Region};
use aws_sdk_ecr::error::DisplayErrorContext;
use thiserror::Error;
use tracing::debug;

pub use ecr::EcrRegistry;
pub use ecs::EcsCluster;
pub use lambda::LambdaFunctions;

/// Errors that can occur while setting up AWS clients.
#[derive(Debug, Error)]
pub enum AwsError {
    /// No region was given and none could be resolved from the
    /// environment or profile.
    #[error("AWS region is not configured; set AWS_REGION or pass --region")]
    MissingRegion,
}

/// Clients for every service ecrm talks to, sharing one SDK config.
#[derive(Debug, Clone)]
pub struct AwsPlatform {
    /// Resolved region.
    pub region: String,
    /// Container registry.
    pub registry: EcrRegistry,
    /// Container orchestrator.
    pub clusters: EcsCluster,
    /// Function platform.
    pub functions: LambdaFunctions,
}

impl AwsPlatform {
    /// Loads the SDK config from the environment and builds the clients.
    ///
    /// `region` overrides the region resolved by the default provider
    /// chain.
    ///
    /// # Errors
    ///
    /// Returns [`AwsError::MissingRegion`] if no region can be resolved.
    pub async fn load(region: Option<String>) -> Result<Self, AwsError> {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(Region::new(region));
        }
        let config = loader.load().await;
        let region = config
            .region()
            .map(ToString::to_string)
            .ok_or(AwsError::MissingRegion)?;
        debug!(region = %region, "Loaded AWS config");

        Ok(Self {
            registry: EcrRegistry::new(aws_sdk_ecr::Client::new(&config), region.clone()),
            clusters: EcsCluster::new(aws_sdk_ecs::Client::new(&config)),
            functions: LambdaFunctions::new(aws_sdk_lambda::Client::new(&config)),
            region,
        })
    }
}

/// Renders an SDK error with its full source chain.
pub(crate) fn api_error<E>(operation: &'static str, err: E) -> ecrm_core::Error
where
    E: std::error::Error,
{
    ecrm_core::Error::api(operation, DisplayErrorContext(err))
}
