//! Per-certificate validation results

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::cert::{Purpose, ValidationError};

/// What a cached result depends on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub purpose: Purpose,
    /// Identity of the root store the result was computed against
    pub store: u64,
    /// Root store generation at the time
    pub generation: u64,
}

/// Results keyed by purpose and root store state
///
/// Values are replaced whole under the write lock, so a reader sees either
/// nothing or a complete result.
#[derive(Debug, Default)]
pub struct ValidationCache {
    entries: RwLock<HashMap<CacheKey, Vec<ValidationError>>>,
}

impl Clone for ValidationCache {
    fn clone(&self) -> Self {
        Self {
            entries: RwLock::new(self.entries.read().clone()),
        }
    }
}

impl ValidationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CacheKey) -> Option<Vec<ValidationError>> {
        self.entries.read().get(key).cloned()
    }

    pub fn insert(&self, key: CacheKey, errors: Vec<ValidationError>) {
        self.entries.write().insert(key, errors);
    }

    /// Drop results for one purpose, whatever store they came from
    pub fn forget(&self, purpose: Purpose) {
        self.entries.write().retain(|key, _| key.purpose != purpose);
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(purpose: Purpose, generation: u64) -> CacheKey {
        CacheKey { purpose, store: 1, generation }
    }

    #[test]
    fn test_cache_keyed_by_generation() {
        let cache = ValidationCache::new();
        cache.insert(key(Purpose::SslServer, 0), vec![ValidationError::SelfSigned]);

        assert_eq!(cache.get(&key(Purpose::SslServer, 0)), Some(vec![ValidationError::SelfSigned]));
        assert_eq!(cache.get(&key(Purpose::SslServer, 1)), None);
        assert_eq!(cache.get(&key(Purpose::SslClient, 0)), None);
    }

    #[test]
    fn test_forget_and_clone() {
        let cache = ValidationCache::new();
        cache.insert(key(Purpose::SslServer, 0), Vec::new());
        cache.insert(key(Purpose::SslClient, 0), vec![ValidationError::InvalidPurpose]);

        let copy = cache.clone();
        cache.forget(Purpose::SslServer);

        assert_eq!(cache.len(), 1);
        assert_eq!(copy.len(), 2);

        cache.clear();
        assert!(cache.is_empty());
    }
}
