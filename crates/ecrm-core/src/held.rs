//! The set of images held by running or recently deployed workloads.

use std::collections::HashMap;

use crate::reference::ImageReference;

/// Image references in use, each with the workloads that referenced it.
///
/// Provenance is diagnostic only; decisions consult [`HeldSet::contains`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeldSet {
    entries: HashMap<ImageReference, Vec<String>>,
}

impl HeldSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `reference` is used by `provenance`.
    ///
    /// Returns true if the reference was not held before. Provenance of an
    /// already held reference is appended, never replaced.
    pub fn add(&mut self, reference: ImageReference, provenance: impl Into<String>) -> bool {
        let provenance = provenance.into();
        match self.entries.get_mut(&reference) {
            Some(sources) => {
                if !sources.contains(&provenance) {
                    sources.push(provenance);
                }
                false
            }
            None => {
                self.entries.insert(reference, vec![provenance]);
                true
            }
        }
    }

    /// Merges another set into this one.
    pub fn merge(&mut self, other: Self) {
        for (reference, sources) in other.entries {
            for source in sources {
                self.add(reference.clone(), source);
            }
        }
    }

    /// Returns true if the reference is held.
    #[must_use]
    pub fn contains(&self, reference: &ImageReference) -> bool {
        self.entries.contains_key(reference)
    }

    /// Returns the workloads holding a reference.
    #[must_use]
    pub fn provenance(&self, reference: &ImageReference) -> Option<&[String]> {
        self.entries.get(reference).map(Vec::as_slice)
    }

    /// Returns the number of held references.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over held references and their provenance.
    pub fn iter(&self) -> impl Iterator<Item = (&ImageReference, &[String])> {
        self.entries.iter().map(|(r, p)| (r, p.as_slice()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference(tag: &str) -> ImageReference {
        ImageReference::tagged("123456789012.dkr.ecr.us-east-1.amazonaws.com", "app", tag)
    }

    #[test]
    fn test_add_appends_provenance() {
        let mut held = HeldSet::new();
        assert!(held.add(reference("v1"), "web:3"));
        assert!(!held.add(reference("v1"), "worker:7"));
        assert!(!held.add(reference("v1"), "web:3"));

        assert_eq!(held.len(), 1);
        assert_eq!(
            held.provenance(&reference("v1")),
            Some(&["web:3".to_string(), "worker:7".to_string()][..])
        );
    }

    #[test]
    fn test_merge() {
        let mut a = HeldSet::new();
        a.add(reference("v1"), "web:3");
        let mut b = HeldSet::new();
        b.add(reference("v1"), "lambda:fn");
        b.add(reference("v2"), "lambda:fn");

        a.merge(b);
        assert_eq!(a.len(), 2);
        assert!(a.contains(&reference("v2")));
        assert_eq!(a.provenance(&reference("v1")).map(<[String]>::len), Some(2));
    }

    #[test]
    fn test_digest_and_tag_are_distinct() {
        let mut held = HeldSet::new();
        held.add(reference("v1").with_digest("sha256:abc"), "web:3");
        assert!(!held.contains(&reference("v1")));
        assert!(held.contains(&reference("v2").with_digest("sha256:abc")));
    }
}
