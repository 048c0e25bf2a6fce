//! # ecrm Registry
//!
//! Repository selection, image expiration and batched deletion for ecrm.
//!
//! ## Features
//!
//! - **Repository selection**: first matching retention policy wins,
//!   unmatched repositories are skipped
//! - **Expiration**: age, keep-count, keep-tag patterns and the held set
//!   decide plain images; image indexes and SOCI sidecars follow the images
//!   they point at
//! - **Deletion**: dry-run reporting, confirmation, batches of 100
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ecrm_registry::{DeleteMode, DeletionExecutor, ExpirationEngine, RepositorySelector};
//!
//! let selected = RepositorySelector::new(registry.clone())
//!     .select(&config.repositories, None)
//!     .await?;
//! let engine = ExpirationEngine::new(registry.clone());
//! let executor = DeletionExecutor::new(registry, confirm, DeleteMode::DryRun);
//! for repository in &selected {
//!     let plan = engine.evaluate(&repository.name, repository.policy, &held).await?;
//!     executor.execute(&plan).await?;
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────┐   ┌──────────────────────┐   ┌──────────────────────┐
//! │  RepositorySelector  │──▶│   ExpirationEngine   │──▶│   DeletionExecutor   │
//! │  (first match wins)  │   │ images → indexes →   │   │ (confirm, batches)   │
//! │                      │   │ SOCI sidecars        │   │                      │
//! └──────────────────────┘   └──────────────────────┘   └──────────────────────┘
//!             │                         │                          │
//!             └─────────────────────────┼──────────────────────────┘
//!                                       ▼
//!                              dyn RegistryApi
//! ```

pub mod deletion;
pub mod error;
pub mod expiration;
pub mod oci;
pub mod selector;

pub use deletion::{DeleteMode, DeletionExecutor, DeletionOutcome, DELETE_BATCH_SIZE};
pub use error::{RegistryError, Result};
pub use expiration::{
    retention, ExpirationEngine, Inventory, RepositoryPlan, Retention, MANIFEST_BATCH_SIZE,
};
pub use oci::{Descriptor, IndexManifest, MediaType};
pub use selector::{select_policy, select_repositories, RepositorySelector, SelectedRepository};
