//! Configuration file loading.
//!
//! The config file is YAML with four ordered sections:
//!
//! ```yaml
//! clusters:
//!   - name: production
//!   - name_pattern: "stg-*"
//! task_definitions:
//!   - name_pattern: "*"
//!     keep_count: 3
//! lambda_functions:
//!   - name_pattern: "*"
//! repositories:
//!   - name_pattern: "prod/*"
//!     expires: 90d
//!     keep_count: 10
//!     keep_tag_patterns: ["latest", "release-*"]
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::pattern::{NameMatcher, Pattern};
use crate::policy::{parse_duration, ResourceSelector, RetentionPolicy};

/// Validated configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    /// Clusters whose tasks and services are scanned.
    pub clusters: Vec<ResourceSelector>,

    /// Task definition families whose latest revisions are held.
    pub task_definitions: Vec<ResourceSelector>,

    /// Functions whose images are held.
    pub lambda_functions: Vec<ResourceSelector>,

    /// Retention policies, first match wins.
    pub repositories: Vec<RetentionPolicy>,
}

impl Config {
    /// Loads and validates a config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid YAML for
    /// this schema, or contains an invalid entry.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    /// Parses and validates config text.
    ///
    /// # Errors
    ///
    /// Returns an error for malformed YAML, unknown keys, or invalid entries.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let raw: RawConfig = serde_yaml::from_str(content)?;

        Ok(Self {
            clusters: selectors("clusters", raw.clusters)?,
            task_definitions: selectors("task_definitions", raw.task_definitions)?,
            lambda_functions: selectors("lambda_functions", raw.lambda_functions)?,
            repositories: raw
                .repositories
                .into_iter()
                .enumerate()
                .map(|(index, r)| r.into_policy(index))
                .collect::<Result<_>>()?,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    clusters: Vec<RawSelector>,
    #[serde(default)]
    task_definitions: Vec<RawSelector>,
    #[serde(default)]
    lambda_functions: Vec<RawSelector>,
    #[serde(default)]
    repositories: Vec<RawRepository>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSelector {
    name: Option<String>,
    name_pattern: Option<String>,
    #[serde(default)]
    keep_count: u32,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRepository {
    name: Option<String>,
    name_pattern: Option<String>,
    expires: Option<String>,
    #[serde(default)]
    keep_count: u32,
    #[serde(default)]
    keep_tag_patterns: Vec<String>,
}

impl RawRepository {
    fn into_policy(self, index: usize) -> Result<RetentionPolicy> {
        let name = name_matcher("repositories", index, self.name, self.name_pattern)?;
        let expires = self.expires.ok_or_else(|| Error::Config {
            section: "repositories",
            index,
            reason: "expires is required".to_string(),
        })?;
        let expires = parse_duration(&expires).map_err(|e| Error::Config {
            section: "repositories",
            index,
            reason: e.to_string(),
        })?;

        Ok(RetentionPolicy {
            name,
            expires,
            keep_count: self.keep_count,
            keep_tag_patterns: self.keep_tag_patterns.into_iter().map(Pattern::new).collect(),
        })
    }
}

fn selectors(section: &'static str, raw: Vec<RawSelector>) -> Result<Vec<ResourceSelector>> {
    raw.into_iter()
        .enumerate()
        .map(|(index, s)| {
            let name = name_matcher(section, index, s.name, s.name_pattern)?;
            Ok(ResourceSelector::new(name).with_keep_count(s.keep_count))
        })
        .collect()
}

fn name_matcher(
    section: &'static str,
    index: usize,
    name: Option<String>,
    name_pattern: Option<String>,
) -> Result<NameMatcher> {
    match (name, name_pattern) {
        (Some(name), None) if !name.is_empty() => Ok(NameMatcher::Exact(name)),
        (None, Some(pattern)) if !pattern.is_empty() => Ok(NameMatcher::Pattern(Pattern::new(pattern))),
        (Some(_), Some(_)) => Err(Error::Config {
            section,
            index,
            reason: "name and name_pattern are mutually exclusive".to_string(),
        }),
        _ => Err(Error::Config {
            section,
            index,
            reason: "one of name or name_pattern is required".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use tempfile::TempDir;

    use super::*;

    const SAMPLE: &str = r#"
clusters:
  - name: production
  - name_pattern: "stg-*"
task_definitions:
  - name_pattern: "*"
    keep_count: 3
lambda_functions:
  - name: image-resizer
repositories:
  - name_pattern: "prod/*"
    expires: 90d
    keep_count: 10
    keep_tag_patterns: ["latest", "release-*"]
  - name_pattern: "*"
    expires: 30days
"#;

    #[test]
    fn test_from_yaml() {
        let config = Config::from_yaml(SAMPLE).unwrap();

        assert_eq!(config.clusters.len(), 2);
        assert_eq!(config.clusters[0].name, NameMatcher::Exact("production".into()));
        assert_eq!(config.task_definitions[0].keep_count, 3);
        assert_eq!(config.lambda_functions.len(), 1);

        let prod = &config.repositories[0];
        assert_eq!(prod.expires, Duration::days(90));
        assert_eq!(prod.keep_count, 10);
        assert!(prod.matches_tag("release-1"));
        assert_eq!(config.repositories[1].keep_count, 0);
        assert!(config.repositories[1].keep_tag_patterns.is_empty());
    }

    #[test]
    fn test_order_is_preserved() {
        let config = Config::from_yaml(SAMPLE).unwrap();
        let first = config
            .repositories
            .iter()
            .find(|p| p.matches_repository("prod/api"))
            .unwrap();
        assert_eq!(first.expires, Duration::days(90));
    }

    #[test]
    fn test_empty_sections_default() {
        let config = Config::from_yaml("repositories: []").unwrap();
        assert!(config.clusters.is_empty());
        assert!(config.repositories.is_empty());
    }

    #[test]
    fn test_missing_expires() {
        let err = Config::from_yaml("repositories:\n  - name: app\n").unwrap_err();
        assert!(err.to_string().contains("repositories[0]"));
        assert!(err.to_string().contains("expires is required"));
    }

    #[test]
    fn test_name_and_pattern_exclusive() {
        let err = Config::from_yaml("clusters:\n  - name: a\n    name_pattern: b\n").unwrap_err();
        assert!(matches!(err, Error::Config { section: "clusters", index: 0, .. }));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = Config::from_yaml("repositories:\n  - name: a\n    expire: 3d\n").unwrap_err();
        assert!(matches!(err, Error::ConfigParse(_)));
    }

    #[test]
    fn test_invalid_duration() {
        let err = Config::from_yaml("repositories:\n  - name: a\n    expires: soon\n").unwrap_err();
        assert!(matches!(err, Error::Config { section: "repositories", .. }));
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("ecrm.yaml");
        std::fs::write(&path, SAMPLE).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.repositories.len(), 2);
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let err = Config::load(temp_dir.path().join("missing.yaml")).unwrap_err();
        assert!(matches!(err, Error::ConfigRead { .. }));
    }
}
