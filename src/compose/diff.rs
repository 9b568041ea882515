use std::collections::HashSet;
use std::hash::Hash;

/// Result of comparing two collections with [`diff`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diff<T> {
    pub left_only: Vec<T>,
    pub right_only: Vec<T>,
    pub common: Vec<T>,
}

impl<T> Diff<T> {
    /// True when both sides held exactly the same elements.
    pub fn is_unchanged(&self) -> bool {
        self.left_only.is_empty() && self.right_only.is_empty()
    }
}

impl<T> Default for Diff<T> {
    fn default() -> Self {
        Self {
            left_only: Vec::new(),
            right_only: Vec::new(),
            common: Vec::new(),
        }
    }
}

/// Splits `left` and `right` into elements unique to each side and elements shared by both.
///
/// `right_only` and `common` keep the order of `right`; `left_only` keeps the order of `left`.
/// An element of `left` matches at most one occurrence in `right`: a repeated right element
/// after the first match lands in `right_only`.
pub fn diff<T>(left: &[T], right: &[T]) -> Diff<T>
where
    T: Eq + Hash + Clone,
{
    let mut unmatched: HashSet<&T> = left.iter().collect();
    let mut result = Diff::default();

    for item in right {
        if unmatched.remove(item) {
            result.common.push(item.clone());
        } else {
            result.right_only.push(item.clone());
        }
    }

    let mut emitted = HashSet::new();
    result.left_only = left
        .iter()
        .filter(|item| unmatched.contains(item) && emitted.insert(*item))
        .cloned()
        .collect();

    result
}
