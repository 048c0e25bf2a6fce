//! # ecrm Usage
//!
//! Usage collector for ecrm.
//!
//! Builds the [`HeldSet`](ecrm_core::HeldSet) of image references that
//! running tasks, service deployments, recent task definition revisions and
//! image-packaged functions depend on. Any failed call aborts collection.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ecrm_usage::UsageCollector;
//!
//! let collector = UsageCollector::new(Arc::new(ecs), Arc::new(lambda));
//! let held = collector.collect(&config).await?;
//! println!("{} images in use", held.len());
//! ```

pub mod collector;
pub mod error;

pub use collector::UsageCollector;
pub use error::{Result, UsageError};
