//! Case-insensitive ordered set of object names (C2), used for cycle
//! breaking (`already`) and caller-supplied stop lists (`stoplist`).

use std::collections::BTreeSet;

/// Wraps a name so that ordering and equality fold case, giving a
/// case-insensitive `BTreeSet` without a custom `Ord` on the public type.
#[derive(Debug, Clone, Eq)]
struct CaseFolded(String);

impl PartialEq for CaseFolded {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Ord for CaseFolded {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.to_ascii_lowercase().cmp(&other.0.to_ascii_lowercase())
    }
}

impl PartialOrd for CaseFolded {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// A case-insensitive set of names, backed by a `BTreeSet` for logarithmic
/// contains/insert (the original tool's choice of a red-black tree, for the
/// same reason).
#[derive(Debug, Clone, Default)]
pub struct NamedSet {
    names: BTreeSet<CaseFolded>,
}

impl NamedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `name`, returning `true` if it was not already present
    /// (case-insensitively).
    pub fn insert(&mut self, name: &str) -> bool {
        self.names.insert(CaseFolded(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(&CaseFolded(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl FromIterator<String> for NamedSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        let mut set = Self::new();
        for name in iter {
            set.insert(&name);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_is_case_insensitive() {
        let mut set = NamedSet::new();
        assert!(set.insert("AS-FOO"));
        assert!(!set.insert("as-foo"));
        assert!(set.contains("As-Foo"));
    }

    #[test]
    fn empty_set_contains_nothing() {
        let set = NamedSet::new();
        assert!(!set.contains("AS-FOO"));
        assert!(set.is_empty());
    }

    #[test]
    fn from_iter_dedups_case_insensitively() {
        let set: NamedSet = ["AS-FOO", "as-foo", "AS-BAR"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(set.len(), 2);
    }
}
