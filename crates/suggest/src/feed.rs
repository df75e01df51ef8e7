//! Query-keyed suggestion feed for an interactive event loop.
//!
//! `request` never blocks: fetches run on worker threads and report back
//! through a channel drained by `poll`. Each request bumps a generation
//! counter and only the newest generation may change the visible state, so a
//! slow response for "re" can never overwrite the list for "rev".

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::cache::SuggestionCache;
use crate::client::{SuggestError, SuggestionSource};
use crate::Suggestion;

#[derive(Debug, Clone, PartialEq)]
pub enum FeedState {
    /// Nothing requested yet
    Idle,
    Loading,
    Ready(Vec<Suggestion>),
    Failed(String),
}

struct Completion {
    generation: u64,
    query: String,
    result: Result<Vec<Suggestion>, SuggestError>,
}

pub struct SuggestionFeed {
    source: Arc<dyn SuggestionSource>,
    cache: SuggestionCache,
    generation: u64,
    query: Option<String>,
    state: FeedState,
    tx: Sender<Completion>,
    rx: Receiver<Completion>,
}

impl SuggestionFeed {
    pub fn new(source: Arc<dyn SuggestionSource>, stale_time: Duration) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            source,
            cache: SuggestionCache::new(stale_time),
            generation: 0,
            query: None,
            state: FeedState::Idle,
            tx,
            rx,
        }
    }

    pub fn state(&self) -> &FeedState {
        &self.state
    }

    /// Query the visible state belongs to.
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state, FeedState::Loading)
    }

    /// Visible suggestions; empty unless the latest request succeeded.
    pub fn suggestions(&self) -> &[Suggestion] {
        match &self.state {
            FeedState::Ready(list) => list,
            _ => &[],
        }
    }

    /// Make `query` the current query. Repeating the current query while it
    /// is loading, or while its loaded result is still fresh, is a no-op; a
    /// fresh cached result is served without fetching.
    pub fn request(&mut self, query: &str) {
        if self.query.as_deref() == Some(query) {
            match self.state {
                FeedState::Loading => return,
                FeedState::Ready(_) if self.cache.get(query).is_some() => return,
                _ => {}
            }
        }

        self.cache.prune_at(Instant::now());
        self.generation += 1;
        self.query = Some(query.to_string());

        if let Some(hit) = self.cache.get(query) {
            log::trace!("suggestions for {:?} served from cache", query);
            self.state = FeedState::Ready(hit.to_vec());
            return;
        }

        self.state = FeedState::Loading;
        let source = Arc::clone(&self.source);
        let tx = self.tx.clone();
        let generation = self.generation;
        let query = query.to_string();
        thread::spawn(move || {
            let result = source.fetch(&query);
            // Receiver gone means the feed was dropped; nothing to report to
            let _ = tx.send(Completion { generation, query, result });
        });
    }

    /// Apply finished fetches. Returns true when the visible state changed.
    pub fn poll(&mut self) -> bool {
        let mut changed = false;
        while let Ok(done) = self.rx.try_recv() {
            if let Ok(list) = &done.result {
                self.cache.insert(&done.query, list.clone());
            }
            if done.generation != self.generation {
                log::trace!("discarding superseded suggestions for {:?}", done.query);
                continue;
            }
            self.state = match done.result {
                Ok(list) => FeedState::Ready(list),
                Err(e) => {
                    log::warn!("suggestion fetch failed: {}", e);
                    FeedState::Failed(e.to_string())
                }
            };
            changed = true;
        }
        changed
    }

    /// Block until the current request settles or `timeout` elapses.
    pub fn wait(&mut self, timeout: Duration) -> &FeedState {
        if !self.is_loading() {
            return &self.state;
        }
        let deadline = Instant::now() + timeout;
        while self.is_loading() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            match self.rx.recv_timeout(remaining) {
                Ok(done) => {
                    // Requeue through poll so generation handling stays in one place
                    let _ = self.tx.send(done);
                    self.poll();
                }
                Err(_) => break,
            }
        }
        &self.state
    }

    /// Forget cached results so the next request refetches.
    pub fn invalidate(&mut self) {
        self.cache.clear();
        if !self.is_loading() {
            self.query = None;
            self.state = FeedState::Idle;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fxbar_engine::TagValue;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Source whose per-query responses are released by the test.
    struct GatedSource {
        gates: Mutex<HashMap<String, mpsc::Receiver<()>>>,
        calls: AtomicUsize,
    }

    impl GatedSource {
        fn new() -> Self {
            Self { gates: Mutex::new(HashMap::new()), calls: AtomicUsize::new(0) }
        }

        fn gate(&self, query: &str) -> mpsc::Sender<()> {
            let (tx, rx) = mpsc::channel();
            self.gates.lock().unwrap().insert(query.to_string(), rx);
            tx
        }
    }

    impl SuggestionSource for GatedSource {
        fn fetch(&self, query: &str) -> Result<Vec<Suggestion>, SuggestError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let gate = self.gates.lock().unwrap().remove(query);
            if let Some(gate) = gate {
                let _ = gate.recv();
            }
            if query == "boom" {
                return Err(SuggestError::Http(500, "boom".into()));
            }
            Ok(vec![Suggestion::new(query, format!("{} result", query), "Finance", TagValue::Number(1.0))])
        }
    }

    fn feed(source: &Arc<GatedSource>) -> SuggestionFeed {
        feed_with_stale_time(source, Duration::from_secs(300))
    }

    fn feed_with_stale_time(source: &Arc<GatedSource>, stale_time: Duration) -> SuggestionFeed {
        let source: Arc<dyn SuggestionSource> = source.clone();
        SuggestionFeed::new(source, stale_time)
    }

    fn settle(feed: &mut SuggestionFeed) {
        feed.wait(Duration::from_secs(5));
    }

    #[test]
    fn test_request_then_ready() {
        let source = Arc::new(GatedSource::new());
        let mut feed = feed(&source);
        assert_eq!(feed.state(), &FeedState::Idle);

        feed.request("rev");
        settle(&mut feed);
        assert_eq!(feed.suggestions().len(), 1);
        assert_eq!(feed.suggestions()[0].name, "rev result");
    }

    #[test]
    fn test_out_of_order_completion_is_discarded() {
        let source = Arc::new(GatedSource::new());
        let release_old = source.gate("re");
        let mut feed = feed(&source);

        feed.request("re");
        feed.request("rev");
        settle(&mut feed);
        assert_eq!(feed.suggestions()[0].name, "rev result");

        // The older response arrives late and must not replace the newer list
        release_old.send(()).unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        while source.calls.load(Ordering::SeqCst) < 2 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        thread::sleep(Duration::from_millis(50));
        assert!(!feed.poll());
        assert_eq!(feed.query(), Some("rev"));
        assert_eq!(feed.suggestions()[0].name, "rev result");
    }

    #[test]
    fn test_cached_query_is_not_refetched() {
        let source = Arc::new(GatedSource::new());
        let mut feed = feed(&source);

        feed.request("rev");
        settle(&mut feed);
        feed.request("cat");
        settle(&mut feed);
        feed.request("rev");
        assert_eq!(feed.suggestions()[0].name, "rev result");
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_repeat_request_while_loading_is_noop() {
        let source = Arc::new(GatedSource::new());
        let release = source.gate("rev");
        let mut feed = feed(&source);

        feed.request("rev");
        feed.request("rev");
        assert!(feed.is_loading());
        release.send(()).unwrap();
        settle(&mut feed);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failure_state() {
        let source = Arc::new(GatedSource::new());
        let mut feed = feed(&source);

        feed.request("boom");
        settle(&mut feed);
        assert_eq!(feed.state(), &FeedState::Failed("HTTP 500: boom".to_string()));
        assert!(feed.suggestions().is_empty());

        // A failed query is retried on the next request
        feed.request("boom");
        assert!(feed.is_loading());
        settle(&mut feed);
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_stale_result_is_refetched() {
        let source = Arc::new(GatedSource::new());
        let mut feed = feed_with_stale_time(&source, Duration::from_millis(10));

        feed.request("rev");
        settle(&mut feed);
        thread::sleep(Duration::from_millis(50));
        feed.request("rev");
        settle(&mut feed);
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
        assert_eq!(feed.suggestions()[0].name, "rev result");
    }

    #[test]
    fn test_expired_entries_are_pruned() {
        let source = Arc::new(GatedSource::new());
        let mut feed = feed_with_stale_time(&source, Duration::from_millis(1));

        for i in 0..50 {
            feed.request(&format!("q{}", i));
            settle(&mut feed);
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(feed.cache.len(), 1);
    }

    #[test]
    fn test_invalidate_forces_refetch() {
        let source = Arc::new(GatedSource::new());
        let mut feed = feed(&source);

        feed.request("rev");
        settle(&mut feed);
        feed.invalidate();
        assert_eq!(feed.state(), &FeedState::Idle);
        feed.request("rev");
        settle(&mut feed);
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }
}
