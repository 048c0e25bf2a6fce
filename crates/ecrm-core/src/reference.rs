//! Image references.
//!
//! An [`ImageReference`] names an image by registry host, repository and
//! either a tag or a content digest. References compare by their normalized
//! string form: a tag reference and a digest reference to the same content
//! are different references.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Tag assumed when a reference names neither a tag nor a digest.
pub const DEFAULT_TAG: &str = "latest";

/// How a reference selects content within a repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Locator {
    /// Mutable tag (e.g. `v1.2.0`).
    Tag(String),
    /// Content digest (e.g. `sha256:abc...`).
    Digest(String),
}

/// A normalized, immutable image reference.
///
/// # Examples
///
/// ```
/// use ecrm_core::ImageReference;
///
/// let r: ImageReference = "123456789012.dkr.ecr.us-east-1.amazonaws.com/app:v1"
///     .parse()
///     .unwrap();
/// assert_eq!(r.repository(), "app");
/// assert_eq!(r.tag(), Some("v1"));
/// assert!(r.is_ecr());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImageReference {
    registry: String,
    repository: String,
    locator: Locator,
}

impl ImageReference {
    /// Creates a tag-qualified reference.
    #[must_use]
    pub fn tagged(
        registry: impl Into<String>,
        repository: impl Into<String>,
        tag: impl Into<String>,
    ) -> Self {
        Self {
            registry: registry.into(),
            repository: repository.into(),
            locator: Locator::Tag(tag.into()),
        }
    }

    /// Creates a digest-qualified reference.
    #[must_use]
    pub fn digested(
        registry: impl Into<String>,
        repository: impl Into<String>,
        digest: impl Into<String>,
    ) -> Self {
        Self {
            registry: registry.into(),
            repository: repository.into(),
            locator: Locator::Digest(digest.into()),
        }
    }

    /// Parses a reference of the form `host/repo[:tag][@digest]`.
    ///
    /// When both a tag and a digest are present the digest wins. A reference
    /// with neither is normalized to the `latest` tag.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidReference`] if the reference has no explicit
    /// registry host, an empty repository, or a malformed tag or digest.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        let invalid = |reason: &str| Error::InvalidReference {
            reference: input.to_string(),
            reason: reason.to_string(),
        };

        let (name, digest) = match input.split_once('@') {
            Some((name, digest)) => (name, Some(digest)),
            None => (input, None),
        };

        let (registry, path) = name
            .split_once('/')
            .ok_or_else(|| invalid("missing registry host"))?;
        if !is_registry_host(registry) {
            return Err(invalid("missing registry host"));
        }

        let last_segment = path.rfind('/').map_or(0, |i| i + 1);
        let (repository, tag) = match path[last_segment..].rfind(':') {
            Some(i) => {
                let split = last_segment + i;
                (&path[..split], Some(&path[split + 1..]))
            }
            None => (path, None),
        };
        if repository.is_empty() {
            return Err(invalid("empty repository"));
        }

        let locator = match (tag, digest) {
            (_, Some(digest)) => {
                match digest.split_once(':') {
                    Some((algorithm, value)) if !algorithm.is_empty() && !value.is_empty() => {}
                    _ => return Err(invalid("malformed digest")),
                }
                Locator::Digest(digest.to_string())
            }
            (Some(""), None) => return Err(invalid("empty tag")),
            (Some(tag), None) => Locator::Tag(tag.to_string()),
            (None, None) => Locator::Tag(DEFAULT_TAG.to_string()),
        };

        Ok(Self {
            registry: registry.to_string(),
            repository: repository.to_string(),
            locator,
        })
    }

    /// Returns the registry host.
    #[must_use]
    pub fn registry(&self) -> &str {
        &self.registry
    }

    /// Returns the repository name.
    #[must_use]
    pub fn repository(&self) -> &str {
        &self.repository
    }

    /// Returns the tag, if this is a tag-qualified reference.
    #[must_use]
    pub fn tag(&self) -> Option<&str> {
        match &self.locator {
            Locator::Tag(tag) => Some(tag),
            Locator::Digest(_) => None,
        }
    }

    /// Returns the digest, if this is a digest-qualified reference.
    #[must_use]
    pub fn digest(&self) -> Option<&str> {
        match &self.locator {
            Locator::Digest(digest) => Some(digest),
            Locator::Tag(_) => None,
        }
    }

    /// Returns true for digest-qualified references.
    #[must_use]
    pub const fn is_digest(&self) -> bool {
        matches!(self.locator, Locator::Digest(_))
    }

    /// Returns `host/repository` without tag or digest.
    #[must_use]
    pub fn name(&self) -> String {
        format!("{}/{}", self.registry, self.repository)
    }

    /// Returns the canonical digest form of this image.
    #[must_use]
    pub fn with_digest(&self, digest: impl Into<String>) -> Self {
        Self::digested(self.registry.clone(), self.repository.clone(), digest)
    }

    /// Returns a shortened form for log lines: `repository:tag` or
    /// `repository@sha256:<12 hex chars>`.
    #[must_use]
    pub fn short(&self) -> String {
        match &self.locator {
            Locator::Tag(tag) => format!("{}:{tag}", self.repository),
            Locator::Digest(digest) => match digest.split_once(':') {
                Some((algorithm, hex)) => {
                    let hex: String = hex.chars().take(12).collect();
                    format!("{}@{algorithm}:{hex}", self.repository)
                }
                None => format!("{}@{digest}", self.repository),
            },
        }
    }

    /// Returns true if the image is hosted in an ECR private registry
    /// (`<account>.dkr.ecr.<region>.amazonaws.com[.cn]`).
    #[must_use]
    pub fn is_ecr(&self) -> bool {
        is_ecr_host(&self.registry)
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.locator {
            Locator::Tag(tag) => write!(f, "{}/{}:{tag}", self.registry, self.repository),
            Locator::Digest(digest) => {
                write!(f, "{}/{}@{digest}", self.registry, self.repository)
            }
        }
    }
}

impl FromStr for ImageReference {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Returns the ECR registry host for an account and region.
#[must_use]
pub fn ecr_registry_host(account: &str, region: &str) -> String {
    let suffix = if region.starts_with("cn-") {
        "amazonaws.com.cn"
    } else {
        "amazonaws.com"
    };
    format!("{account}.dkr.ecr.{region}.{suffix}")
}

fn is_registry_host(segment: &str) -> bool {
    segment.contains('.') || segment.contains(':') || segment == "localhost"
}

fn is_ecr_host(host: &str) -> bool {
    let parts: Vec<&str> = host.split('.').collect();
    let suffix_ok = match parts.len() {
        6 => parts[4] == "amazonaws" && parts[5] == "com",
        7 => parts[4] == "amazonaws" && parts[5] == "com" && parts[6] == "cn",
        _ => false,
    };
    suffix_ok
        && parts[0].len() == 12
        && parts[0].bytes().all(|b| b.is_ascii_digit())
        && parts[1] == "dkr"
        && parts[2] == "ecr"
        && !parts[3].is_empty()
}
