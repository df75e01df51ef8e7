//! Per-query reuse window for suggestion results.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::Suggestion;

/// Results younger than this are reused without refetching.
pub const DEFAULT_STALE_TIME: Duration = Duration::from_secs(5 * 60);

struct CacheEntry {
    fetched_at: Instant,
    suggestions: Vec<Suggestion>,
}

pub struct SuggestionCache {
    stale_time: Duration,
    entries: HashMap<String, CacheEntry>,
}

impl Default for SuggestionCache {
    fn default() -> Self {
        Self::new(DEFAULT_STALE_TIME)
    }
}

impl SuggestionCache {
    pub fn new(stale_time: Duration) -> Self {
        Self { stale_time, entries: HashMap::new() }
    }

    pub fn stale_time(&self) -> Duration {
        self.stale_time
    }

    pub fn get(&self, query: &str) -> Option<&[Suggestion]> {
        self.get_at(query, Instant::now())
    }

    /// Fresh entry for `query` as of `now`, if any.
    pub fn get_at(&self, query: &str, now: Instant) -> Option<&[Suggestion]> {
        let entry = self.entries.get(query)?;
        if now.saturating_duration_since(entry.fetched_at) < self.stale_time {
            Some(&entry.suggestions)
        } else {
            None
        }
    }

    pub fn insert(&mut self, query: &str, suggestions: Vec<Suggestion>) {
        self.insert_at(query, suggestions, Instant::now());
    }

    pub fn insert_at(&mut self, query: &str, suggestions: Vec<Suggestion>, fetched_at: Instant) {
        self.entries.insert(query.to_string(), CacheEntry { fetched_at, suggestions });
    }

    /// Drop expired entries.
    pub fn prune_at(&mut self, now: Instant) {
        let stale_time = self.stale_time;
        self.entries
            .retain(|_, entry| now.saturating_duration_since(entry.fetched_at) < stale_time);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fxbar_engine::TagValue;

    fn list() -> Vec<Suggestion> {
        vec![Suggestion::new("1", "Revenue", "Finance", TagValue::Number(5.0))]
    }

    #[test]
    fn test_fresh_entry_is_reused() {
        let mut cache = SuggestionCache::new(Duration::from_secs(60));
        let t0 = Instant::now();
        cache.insert_at("rev", list(), t0);
        assert_eq!(cache.get_at("rev", t0 + Duration::from_secs(59)).map(|s| s.len()), Some(1));
        assert!(cache.get_at("other", t0).is_none());
    }

    #[test]
    fn test_stale_entry_is_not_reused() {
        let mut cache = SuggestionCache::new(Duration::from_secs(60));
        let t0 = Instant::now();
        cache.insert_at("rev", list(), t0);
        assert!(cache.get_at("rev", t0 + Duration::from_secs(60)).is_none());
    }

    #[test]
    fn test_prune() {
        let mut cache = SuggestionCache::new(Duration::from_secs(10));
        let t0 = Instant::now();
        cache.insert_at("old", list(), t0);
        cache.insert_at("new", list(), t0 + Duration::from_secs(8));
        cache.prune_at(t0 + Duration::from_secs(12));
        assert_eq!(cache.len(), 1);
        assert!(cache.get_at("new", t0 + Duration::from_secs(12)).is_some());
    }

    #[test]
    fn test_default_stale_time_is_five_minutes() {
        assert_eq!(SuggestionCache::default().stale_time(), Duration::from_secs(300));
    }
}
