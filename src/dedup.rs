//! Short-lived request deduplication.
//!
//! Double taps and client resends can fire the same side-effecting call
//! several times within a second or two. Every action handler builds a
//! fingerprint for what it is about to do and asks the cache first; a
//! fingerprint seen less than one window ago is answered with a synthesized
//! success instead of hitting the provider again.
//!
//! The window is fixed from first sight: repeated hits do not extend it.
//! Nothing survives a restart and nothing is shared between instances.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};

use crate::clock::{Clock, SystemClock};

pub const DEFAULT_DEDUP_WINDOW_MS: i64 = 5000;

/// Outcome of [`IdempotencyCache::check_and_record`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// First sighting in the window, go ahead.
    New,
    /// Seen `age` ago, short-circuit.
    Duplicate { age: Duration },
}

impl Admission {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Admission::Duplicate { .. })
    }
}

pub fn mark_read_fingerprint(article_id: &str) -> String {
    format!("mark_read_{}", article_id)
}

pub fn save_later_fingerprint(article_id: &str) -> String {
    format!("save_later_{}", article_id)
}

/// Title is part of the key so two different articles sharing a missing id
/// are not collapsed into one.
pub fn instapaper_fingerprint(article_id: &str, title: &str) -> String {
    format!("instapaper_{}_{}", article_id, title)
}

pub struct IdempotencyCache {
    window: Duration,
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl IdempotencyCache {
    pub fn new(window: Duration) -> Self {
        Self::with_clock(window, Arc::new(SystemClock))
    }

    pub fn with_clock(window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            window,
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Classify `fingerprint` and remember it if it is new.
    ///
    /// Expired entries are swept on every call, so the map never holds more
    /// than one window's worth of fingerprints.
    pub fn check_and_record(&self, fingerprint: &str) -> Admission {
        let now = self.clock.now();
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(first_seen) = entries.get(fingerprint) {
            let age = now - *first_seen;
            if age < self.window {
                tracing::info!(
                    fingerprint,
                    age_ms = age.num_milliseconds(),
                    "duplicate request blocked"
                );
                return Admission::Duplicate { age };
            }
        }

        entries.insert(fingerprint.to_string(), now);
        let window = self.window;
        entries.retain(|_, first_seen| now - *first_seen < window);

        tracing::debug!(fingerprint, cached = entries.len(), "new request allowed");
        Admission::New
    }

    /// The boundary the HTTP layer consults before any side effect.
    pub fn is_duplicate_request(&self, fingerprint: &str) -> bool {
        self.check_and_record(fingerprint).is_duplicate()
    }

    /// Drop every entry older than the window. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let window = self.window;
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let before = entries.len();
        entries.retain(|_, first_seen| now - *first_seen < window);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for IdempotencyCache {
    fn default() -> Self {
        Self::new(Duration::milliseconds(DEFAULT_DEDUP_WINDOW_MS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn cache_with_clock() -> (IdempotencyCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        let cache = IdempotencyCache::with_clock(
            Duration::milliseconds(DEFAULT_DEDUP_WINDOW_MS),
            clock.clone(),
        );
        (cache, clock)
    }

    #[test]
    fn test_duplicate_within_window_then_new_after() {
        let (cache, clock) = cache_with_clock();

        assert!(!cache.is_duplicate_request("mark_read_1"));
        assert!(cache.is_duplicate_request("mark_read_1"));

        clock.advance(Duration::milliseconds(4999));
        assert!(cache.is_duplicate_request("mark_read_1"));

        clock.advance(Duration::milliseconds(1));
        assert!(!cache.is_duplicate_request("mark_read_1"));
    }

    #[test]
    fn test_duplicate_hits_do_not_extend_window() {
        let (cache, clock) = cache_with_clock();

        assert_eq!(cache.check_and_record("f"), Admission::New);
        clock.advance(Duration::milliseconds(3000));
        assert_eq!(
            cache.check_and_record("f"),
            Admission::Duplicate {
                age: Duration::milliseconds(3000)
            }
        );

        // 5000ms after first sight, not after the duplicate.
        clock.advance(Duration::milliseconds(2000));
        assert_eq!(cache.check_and_record("f"), Admission::New);
    }

    #[test]
    fn test_fingerprints_are_independent() {
        let (cache, _clock) = cache_with_clock();

        assert!(!cache.is_duplicate_request("a"));
        assert!(!cache.is_duplicate_request("b"));
        assert!(cache.is_duplicate_request("a"));
        assert!(cache.is_duplicate_request("b"));
    }

    #[test]
    fn test_expired_entries_swept_on_check() {
        let (cache, clock) = cache_with_clock();

        cache.check_and_record("a");
        cache.check_and_record("b");
        assert_eq!(cache.len(), 2);

        clock.advance(Duration::milliseconds(6000));
        cache.check_and_record("c");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_sweep_reports_removed() {
        let (cache, clock) = cache_with_clock();

        cache.check_and_record("a");
        clock.advance(Duration::milliseconds(2000));
        cache.check_and_record("b");
        clock.advance(Duration::milliseconds(3500));

        assert_eq!(cache.sweep(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.is_duplicate_request("b"));
    }

    #[test]
    fn test_fingerprint_builders() {
        assert_eq!(mark_read_fingerprint("abc"), "mark_read_abc");
        assert_eq!(save_later_fingerprint("abc"), "save_later_abc");
        assert_eq!(instapaper_fingerprint("abc", "Title"), "instapaper_abc_Title");
    }
}
