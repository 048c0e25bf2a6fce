//! Retention policies and resource selectors.
//!
//! Both are evaluated as ordered sequences: the first entry whose name
//! matcher accepts a name wins, later entries are never consulted.

use chrono::{DateTime, Duration, Utc};

use crate::error::{Error, Result};
use crate::pattern::{NameMatcher, Pattern};

/// Retention rules for the repositories a policy matches.
///
/// # Examples
///
/// ```rust
/// use chrono::Duration;
/// use ecrm_core::{NameMatcher, Pattern, RetentionPolicy};
///
/// let policy = RetentionPolicy::new(NameMatcher::Pattern(Pattern::new("prod/*")), Duration::days(30))
///     .with_keep_count(5)
///     .with_keep_tag_pattern("release-*");
///
/// assert!(policy.matches_repository("prod/api"));
/// assert!(policy.matches_tag("release-2024.1"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Which repositories the policy applies to.
    pub name: NameMatcher,

    /// Images younger than this are always retained.
    pub expires: Duration,

    /// Number of most recently pushed tagged images retained past `expires`.
    pub keep_count: u32,

    /// Tags that protect an image from expiration.
    pub keep_tag_patterns: Vec<Pattern>,
}

impl RetentionPolicy {
    /// Creates a policy with no keep-count and no tag patterns.
    #[must_use]
    pub const fn new(name: NameMatcher, expires: Duration) -> Self {
        Self {
            name,
            expires,
            keep_count: 0,
            keep_tag_patterns: Vec::new(),
        }
    }

    /// Sets the keep-count.
    #[must_use]
    pub const fn with_keep_count(mut self, keep_count: u32) -> Self {
        self.keep_count = keep_count;
        self
    }

    /// Adds a tag-keep pattern.
    #[must_use]
    pub fn with_keep_tag_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.keep_tag_patterns.push(Pattern::new(pattern));
        self
    }

    /// Returns true if the policy applies to the repository.
    #[must_use]
    pub fn matches_repository(&self, repository: &str) -> bool {
        self.name.matches(repository)
    }

    /// Returns true if an image pushed at `pushed_at` is past the age cutoff.
    #[must_use]
    pub fn is_expired(&self, pushed_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now - pushed_at >= self.expires
    }

    /// Returns true if the tag matches any tag-keep pattern.
    #[must_use]
    pub fn matches_tag(&self, tag: &str) -> bool {
        self.keep_tag_patterns.iter().any(|p| p.matches(tag))
    }
}

/// Identifies clusters, task definition families or functions that take
/// part in usage scanning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceSelector {
    /// Which resources are selected.
    pub name: NameMatcher,

    /// For task definition families: how many latest revisions to hold.
    pub keep_count: u32,
}

impl ResourceSelector {
    /// Creates a selector with a zero keep-count.
    #[must_use]
    pub const fn new(name: NameMatcher) -> Self {
        Self {
            name,
            keep_count: 0,
        }
    }

    /// Sets the keep-count.
    #[must_use]
    pub const fn with_keep_count(mut self, keep_count: u32) -> Self {
        self.keep_count = keep_count;
        self
    }

    /// Returns true if any of `names` is selected.
    #[must_use]
    pub fn matches_any(&self, names: &[&str]) -> bool {
        names.iter().any(|n| self.name.matches(n))
    }
}

/// Returns the first selector matching any of `names`.
#[must_use]
pub fn first_selector<'a>(
    selectors: &'a [ResourceSelector],
    names: &[&str],
) -> Option<&'a ResourceSelector> {
    selectors.iter().find(|s| s.matches_any(names))
}

/// Parses a duration such as `90d`, `2w`, `36h`, `1d12h` or `30days`.
///
/// Units are the ones [`humantime`] accepts, including `w`/`weeks`,
/// `d`/`days`, `h`/`hours`, `m`/`min` and `s`/`sec`.
///
/// # Errors
///
/// Returns [`Error::InvalidDuration`] for input humantime rejects, a
/// duration too large to represent, or a zero total.
pub fn parse_duration(input: &str) -> Result<Duration> {
    let invalid = |reason: String| Error::InvalidDuration {
        input: input.to_string(),
        reason,
    };

    let parsed = humantime::parse_duration(input.trim()).map_err(|e| invalid(e.to_string()))?;
    let duration =
        Duration::from_std(parsed).map_err(|_| invalid("duration out of range".to_string()))?;
    if duration <= Duration::zero() {
        return Err(invalid("duration must be positive".to_string()));
    }
    Ok(duration)
}
