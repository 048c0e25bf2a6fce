//! Name matching for policies and resource selectors.
//!
//! Patterns use shell-style globbing: `*` matches any run of characters
//! (including `/`) and `?` matches exactly one character.

use std::fmt;

/// A compiled glob pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern(String);

impl Pattern {
    /// Creates a pattern from its source text.
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        Self(source.into())
    }

    /// Returns the pattern source.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if `text` matches this pattern in full.
    ///
    /// # Examples
    ///
    /// ```
    /// use ecrm_core::Pattern;
    ///
    /// assert!(Pattern::new("prod/*").matches("prod/api"));
    /// assert!(Pattern::new("v?").matches("v1"));
    /// assert!(!Pattern::new("v?").matches("v10"));
    /// ```
    #[must_use]
    pub fn matches(&self, text: &str) -> bool {
        let pattern: Vec<char> = self.0.chars().collect();
        let text: Vec<char> = text.chars().collect();

        let (mut p, mut t) = (0, 0);
        let mut backtrack: Option<(usize, usize)> = None;

        while t < text.len() {
            match pattern.get(p) {
                Some('*') => {
                    backtrack = Some((p, t));
                    p += 1;
                }
                Some('?') => {
                    p += 1;
                    t += 1;
                }
                Some(c) if *c == text[t] => {
                    p += 1;
                    t += 1;
                }
                _ => match backtrack {
                    // let the last star swallow one more character
                    Some((star, consumed)) => {
                        p = star + 1;
                        t = consumed + 1;
                        backtrack = Some((star, consumed + 1));
                    }
                    None => return false,
                },
            }
        }

        pattern[p..].iter().all(|c| *c == '*')
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Matches a resource name either exactly or by glob pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameMatcher {
    /// Exact name.
    Exact(String),
    /// Glob pattern.
    Pattern(Pattern),
}

impl NameMatcher {
    /// Returns true if `name` is matched.
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        match self {
            Self::Exact(exact) => exact == name,
            Self::Pattern(pattern) => pattern.matches(name),
        }
    }
}

impl fmt::Display for NameMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(name) => write!(f, "name={name}"),
            Self::Pattern(pattern) => write!(f, "name_pattern={pattern}"),
        }
    }
}
