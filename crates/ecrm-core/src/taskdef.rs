//! Task definition identities.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// A task definition family and revision (`family:revision`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskDefinitionKey {
    /// Family name.
    pub family: String,
    /// Revision number within the family.
    pub revision: u32,
}

impl TaskDefinitionKey {
    /// Creates a key.
    #[must_use]
    pub fn new(family: impl Into<String>, revision: u32) -> Self {
        Self {
            family: family.into(),
            revision,
        }
    }

    /// Parses a task definition ARN or a bare `family:revision`.
    ///
    /// # Examples
    ///
    /// ```
    /// use ecrm_core::TaskDefinitionKey;
    ///
    /// let key = TaskDefinitionKey::parse(
    ///     "arn:aws:ecs:us-east-1:123456789012:task-definition/web:42",
    /// ).unwrap();
    /// assert_eq!(key, TaskDefinitionKey::new("web", 42));
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTaskDefinition`] when the identifier has no
    /// family or no numeric revision.
    pub fn parse(identifier: &str) -> Result<Self> {
        let invalid = || Error::InvalidTaskDefinition {
            identifier: identifier.to_string(),
        };

        let resource = if identifier.starts_with("arn:") {
            let resource = identifier.splitn(6, ':').nth(5).ok_or_else(invalid)?;
            resource.strip_prefix("task-definition/").ok_or_else(invalid)?
        } else {
            identifier
        };

        let (family, revision) = resource.rsplit_once(':').ok_or_else(invalid)?;
        if family.is_empty() || family.contains('/') {
            return Err(invalid());
        }
        let revision = revision.parse().map_err(|_| invalid())?;

        Ok(Self::new(family, revision))
    }
}

impl fmt::Display for TaskDefinitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.family, self.revision)
    }
}

impl FromStr for TaskDefinitionKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Returns the resource name of an ARN with `prefix` removed, or the input
/// unchanged when it is not an ARN.
///
/// ```
/// use ecrm_core::taskdef::arn_resource_name;
///
/// assert_eq!(
///     arn_resource_name("arn:aws:ecs:us-east-1:123456789012:cluster/prod", "cluster/"),
///     "prod",
/// );
/// assert_eq!(arn_resource_name("prod", "cluster/"), "prod");
/// ```
#[must_use]
pub fn arn_resource_name<'a>(arn: &'a str, prefix: &str) -> &'a str {
    if !arn.starts_with("arn:") {
        return arn;
    }
    let resource = arn.splitn(6, ':').nth(5).unwrap_or(arn);
    resource.strip_prefix(prefix).unwrap_or(resource)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_arn() {
        let key =
            TaskDefinitionKey::parse("arn:aws:ecs:ap-northeast-1:123456789012:task-definition/api-server:7")
                .unwrap();
        assert_eq!(key.family, "api-server");
        assert_eq!(key.revision, 7);
        assert_eq!(key.to_string(), "api-server:7");
    }

    #[test]
    fn test_parse_bare() {
        assert_eq!(
            TaskDefinitionKey::parse("worker:12").unwrap(),
            TaskDefinitionKey::new("worker", 12)
        );
    }

    #[test]
    fn test_parse_invalid() {
        assert!(TaskDefinitionKey::parse("worker").is_err());
        assert!(TaskDefinitionKey::parse("worker:latest").is_err());
        assert!(TaskDefinitionKey::parse(":3").is_err());
        assert!(TaskDefinitionKey::parse("arn:aws:ecs:us-east-1:123456789012:service/web:3").is_err());
    }

    #[test]
    fn test_keys_dedupe() {
        let a = TaskDefinitionKey::parse("arn:aws:ecs:us-east-1:123456789012:task-definition/web:3").unwrap();
        let b = TaskDefinitionKey::parse("web:3").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_arn_resource_name() {
        assert_eq!(
            arn_resource_name("arn:aws:ecs:us-east-1:123456789012:service/prod/web", "service/"),
            "prod/web"
        );
    }
}
