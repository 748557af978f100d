//! Values captured from `{name}` and `*name` segments.

use smallvec::SmallVec;

/// Captured path values, kept in the order their segments appear.
///
/// Lookups are linear; routes rarely capture more than a few values, and up
/// to four pairs are stored without allocating a vector.
///
/// ```rust
/// use lodestar_router::Params;
///
/// let params: Params = [("org", "acme"), ("repo", "lodestar")].into_iter().collect();
///
/// assert_eq!(params.get("repo"), Some("lodestar"));
/// assert_eq!(params.get("branch"), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Params {
    pairs: SmallVec<[(Box<str>, String); 4]>,
}

impl Params {
    /// No captures.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `value` for `name` after the existing captures.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name: String = name.into();
        self.pairs.push((name.into_boxed_str(), value.into()));
    }

    /// The value captured for `name`, first occurrence wins.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find_map(|(key, value)| (key.as_ref() == name).then_some(value.as_str()))
    }

    /// Whether `name` was captured.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Number of captures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Returns true when the route captured nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// `(name, value)` pairs in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.pairs.iter().map(|(key, value)| (key.as_ref(), value.as_str()))
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (name, value) in iter {
            params.push(name, value);
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_name() {
        let mut params = Params::new();
        params.push("user_id", "7");
        params.push("post_id", "19");

        assert_eq!(params.get("post_id"), Some("19"));
        assert!(params.contains("user_id"));
        assert!(!params.contains("comment_id"));
    }

    #[test]
    fn test_iteration_follows_path_order() {
        let params: Params = [("org", "acme"), ("id", "9")].into_iter().collect();
        assert_eq!(params.iter().collect::<Vec<_>>(), vec![("org", "acme"), ("id", "9")]);
    }

    #[test]
    fn test_many_captures() {
        let params: Params = (0..9).map(|i| (format!("p{i}"), i.to_string())).collect();
        assert_eq!(params.len(), 9);
        assert_eq!(params.get("p8"), Some("8"));
    }
}
