//! Shared memo of completed translations.
//!
//! One cache lives for the whole run and is shared by every page worker.
//! Reads vastly outnumber writes once a document repeats itself (running
//! headers, footers, captions), so the map sits behind an `RwLock`: lookups
//! proceed in parallel and the write lock is only taken to create a slot.
//!
//! Each key owns a [`OnceCell`] slot. The first worker to miss a key runs the
//! backend call inside the slot; workers that miss the same key meanwhile
//! await that call instead of issuing their own. A failed call leaves the
//! slot empty, so failures are never cached and the next caller tries again.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::sync::{OnceCell, SetError};

/// Lookup key: the exact source text and the language pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub text: String,
    pub source_lang: String,
    pub target_lang: String,
}

impl CacheKey {
    pub fn new(text: &str, source_lang: &str, target_lang: &str) -> Self {
        Self {
            text: text.to_string(),
            source_lang: source_lang.to_string(),
            target_lang: target_lang.to_string(),
        }
    }
}

pub type Slot = Arc<OnceCell<String>>;

/// Thread-safe, write-once translation map.
#[derive(Debug, Default)]
pub struct TranslationCache {
    entries: RwLock<HashMap<CacheKey, Slot>>,
}

impl TranslationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The slot for `key`, created empty on first use.
    pub fn slot(&self, key: &CacheKey) -> Slot {
        // Poisoning only means a holder panicked; every critical section here
        // is a single map operation, so the map is still consistent.
        if let Some(slot) = self
            .entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
        {
            return Arc::clone(slot);
        }
        let mut guard = self.entries.write().unwrap_or_else(|e| e.into_inner());
        Arc::clone(guard.entry(key.clone()).or_default())
    }

    /// Completed translation for `key`, if any.
    pub fn get(&self, key: &CacheKey) -> Option<String> {
        let guard = self.entries.read().unwrap_or_else(|e| e.into_inner());
        guard.get(key).and_then(|slot| slot.get().cloned())
    }

    /// Commit a translation. Returns the value now stored under `key`, which
    /// is the earlier one if another writer got there first.
    pub fn insert(&self, key: CacheKey, value: String) -> String {
        let slot = self.slot(&key);
        match slot.set(value) {
            Ok(()) => slot.get().cloned().unwrap_or_default(),
            Err(SetError::AlreadyInitializedError(rejected))
            | Err(SetError::InitializingError(rejected)) => slot.get().cloned().unwrap_or(rejected),
        }
    }

    /// Number of completed translations.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .filter(|slot| slot.initialized())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn miss_then_hit() {
        let cache = TranslationCache::new();
        let key = CacheKey::new("Hello", "en", "it");
        assert_eq!(cache.get(&key), None);
        cache.insert(key.clone(), "Ciao".into());
        assert_eq!(cache.get(&key).as_deref(), Some("Ciao"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn language_pair_is_part_of_the_key() {
        let cache = TranslationCache::new();
        cache.insert(CacheKey::new("Hello", "en", "it"), "Ciao".into());
        assert_eq!(cache.get(&CacheKey::new("Hello", "en", "fr")), None);
    }

    #[test]
    fn first_write_wins() {
        let cache = TranslationCache::new();
        let key = CacheKey::new("Hello", "en", "it");
        assert_eq!(cache.insert(key.clone(), "Ciao".into()), "Ciao");
        assert_eq!(cache.insert(key.clone(), "Salve".into()), "Ciao");
        assert_eq!(cache.get(&key).as_deref(), Some("Ciao"));
    }

    #[test]
    fn empty_slot_is_not_counted() {
        let cache = TranslationCache::new();
        let _ = cache.slot(&CacheKey::new("pending", "en", "it"));
        assert!(cache.is_empty());
    }

    #[test]
    fn concurrent_writers_converge() {
        let cache = Arc::new(TranslationCache::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    cache.insert(CacheKey::new("same", "en", "it"), format!("v{i}"))
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(cache.len(), 1);
        let kept = cache.get(&CacheKey::new("same", "en", "it")).unwrap();
        assert!(kept.starts_with('v'), "got: {kept}");
    }
}
