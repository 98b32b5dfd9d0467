use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};

use crate::clock::Clock;
use crate::model::ArticlePage;

struct Snapshot {
    fetched_at: DateTime<Utc>,
    page: ArticlePage,
}

/// The first page of the unread stream, kept for a short while so that
/// reloading the swipe deck does not hit the provider every time.
pub struct ArticleCache {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    inner: Mutex<Option<Snapshot>>,
}

impl ArticleCache {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            inner: Mutex::new(None),
        }
    }

    /// Cached page if it is younger than the ttl and not empty.
    pub fn get_fresh(&self) -> Option<ArticlePage> {
        let now = self.clock.now();
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner
            .as_ref()
            .filter(|s| now - s.fetched_at < self.ttl && !s.page.items.is_empty())
            .map(|s| s.page.clone())
    }

    /// Sort newest first, remember, and hand the page back.
    pub fn store(&self, mut page: ArticlePage) -> ArticlePage {
        page.items.sort_by(|a, b| b.published.cmp(&a.published));
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        *inner = Some(Snapshot {
            fetched_at: self.clock.now(),
            page: page.clone(),
        });
        tracing::info!(count = page.items.len(), "cached articles");
        page
    }

    /// Drop an article that has been acted on. Returns whether it was cached.
    pub fn remove(&self, article_id: &str) -> bool {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        match inner.as_mut() {
            Some(snapshot) => {
                let before = snapshot.page.items.len();
                snapshot.page.items.retain(|a| a.id != article_id);
                snapshot.page.items.len() != before
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::model::{Article, ArticleSource};

    fn article(id: &str, published: i64) -> Article {
        Article {
            id: id.to_string(),
            title: id.to_string(),
            summary: String::new(),
            url: None,
            published,
            author: None,
            source: ArticleSource {
                title: None,
                website: None,
            },
            visual: None,
            engagement: 0,
        }
    }

    fn page(items: Vec<Article>) -> ArticlePage {
        ArticlePage {
            items,
            continuation: None,
        }
    }

    #[test]
    fn test_store_sorts_newest_first() {
        let cache = ArticleCache::new(Duration::seconds(120), Arc::new(ManualClock::default()));
        let stored = cache.store(page(vec![article("old", 1), article("new", 3), article("mid", 2)]));

        let ids: Vec<&str> = stored.items.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "mid", "old"]);
    }

    #[test]
    fn test_expires_after_ttl() {
        let clock = Arc::new(ManualClock::default());
        let cache = ArticleCache::new(Duration::seconds(120), clock.clone());
        cache.store(page(vec![article("a", 1)]));

        clock.advance(Duration::seconds(119));
        assert!(cache.get_fresh().is_some());

        clock.advance(Duration::seconds(1));
        assert!(cache.get_fresh().is_none());
    }

    #[test]
    fn test_empty_page_is_never_fresh() {
        let cache = ArticleCache::new(Duration::seconds(120), Arc::new(ManualClock::default()));
        cache.store(page(vec![]));
        assert!(cache.get_fresh().is_none());
    }

    #[test]
    fn test_remove() {
        let cache = ArticleCache::new(Duration::seconds(120), Arc::new(ManualClock::default()));
        cache.store(page(vec![article("a", 1), article("b", 2)]));

        assert!(cache.remove("a"));
        assert!(!cache.remove("a"));
        assert_eq!(cache.get_fresh().unwrap().items.len(), 1);
    }

    #[test]
    fn test_remove_before_first_fetch() {
        let cache = ArticleCache::new(Duration::seconds(120), Arc::new(ManualClock::default()));
        assert!(!cache.remove("a"));
    }
}
