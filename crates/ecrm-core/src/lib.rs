//! # ecrm Core
//!
//! Core types for ecrm, a garbage collector for container registry images.
//!
//! This crate provides the data model shared by the usage collector, the
//! expiration engine and the command line:
//!
//! - [`ImageReference`] - normalized `host/repo:tag` or `host/repo@digest`
//! - [`ImageRecord`] / [`ArtifactKind`] - classified registry inventory
//! - [`HeldSet`] - image references held by running workloads
//! - [`RetentionPolicy`] / [`ResourceSelector`] - ordered, first-match-wins rules
//! - [`Config`] - YAML config loader
//! - [`api`] - traits for the registry, cluster and function platforms
//!
//! ## Example
//!
//! ```rust
//! use ecrm_core::{HeldSet, ImageReference};
//!
//! let mut held = HeldSet::new();
//! let image: ImageReference = "123456789012.dkr.ecr.us-east-1.amazonaws.com/app@sha256:abc"
//!     .parse()
//!     .unwrap();
//! held.add(image.clone(), "web:42");
//! assert!(held.contains(&image));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod api;
pub mod config;
pub mod error;
pub mod held;
pub mod image;
pub mod pattern;
pub mod policy;
pub mod reference;
pub mod summary;
pub mod taskdef;


pub use api::{ClusterApi, Confirm, FunctionApi, RegistryApi};
pub use config::Config;
pub use error::{Error, Result};
pub use held::HeldSet;
pub use image::{ArtifactKind, ImageRecord};
pub use pattern::{NameMatcher, Pattern};
pub use policy::{first_selector, parse_duration, ResourceSelector, RetentionPolicy};
pub use reference::{ImageReference, Locator};
pub use summary::RepositorySummary;
pub use taskdef::TaskDefinitionKey;
