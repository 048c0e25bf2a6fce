//! # ecrm Test
//!
//! Test doubles and fixtures for ecrm.
//!
//! This crate provides:
//!
//! - In-memory implementations of the registry, cluster and function
//!   platform traits that record calls and can inject failures
//! - A scripted confirmation prompt
//! - Builders for image records and OCI index manifests
//!
//! ## Example
//!
//! ```rust
//! use ecrm_test::{fixed_now, InMemoryRegistry, MockImage};
//!
//! let registry = InMemoryRegistry::new().with_images([
//!     MockImage::image("app", "v1").with_tags(["v1"]).pushed_days_ago(40).build(),
//!     MockImage::image("app", "v2").with_tags(["v2"]).build(),
//! ]);
//! assert_eq!(registry.remaining("app").len(), 2);
//! # let _ = fixed_now();
//! ```

pub mod fakes;
pub mod fixtures;

pub use fakes::{
    cluster_arn, container, InMemoryCluster, InMemoryFunctions, InMemoryRegistry,
    ScriptedConfirm,
};
pub use fixtures::{
    digest, digest_uri, fixed_now, tag_uri, task_definition_arn, IndexManifestBuilder,
    MockImage, TEST_ACCOUNT, TEST_REGISTRY,
};
