use std::collections::HashSet;
use std::sync::Mutex;

/// Identifiers already enqueued during the current invocation
///
/// Created empty when an invocation starts and dropped when it ends. It is
/// never persisted and never shared between invocations. Membership only
/// grows: there is no way to remove an identifier once claimed.
///
/// Sends for one item's relation lists run concurrently, so claiming goes
/// through a lock instead of `&mut self`.
#[derive(Debug, Default)]
pub struct SeenSet {
    inner: Mutex<HashSet<String>>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.lock().contains(identifier)
    }

    /// Claims an identifier, returning false if it was already present
    pub fn insert(&self, identifier: &str) -> bool {
        self.lock().insert(identifier.to_string())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        // The set holds plain strings; a panic elsewhere cannot leave it half-written.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_set_is_empty() {
        let seen = SeenSet::new();
        assert!(seen.is_empty());
        assert!(!seen.contains("B000123"));
    }

    #[test]
    fn test_insert_claims_once() {
        let seen = SeenSet::new();
        assert!(seen.insert("B000123"));
        assert!(!seen.insert("B000123"));
        assert!(seen.contains("B000123"));
        assert_eq!(seen.len(), 1);
    }

    #[test]
    fn test_membership_grows_monotonically() {
        let seen = SeenSet::new();
        let ids = ["B0001", "B0002", "B0003", "B0002"];
        let mut previous = 0;
        for id in ids {
            seen.insert(id);
            assert!(seen.len() >= previous);
            previous = seen.len();
        }
        assert_eq!(seen.len(), 3);
    }
}
