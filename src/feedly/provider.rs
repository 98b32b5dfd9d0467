use async_trait::async_trait;

use crate::error::FeedError;
use crate::model::{ArticlePage, Subscription};

pub const DEFAULT_STREAM_COUNT: u32 = 200;
pub const MAX_STREAM_COUNT: u32 = 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamQuery {
    /// `None` means the user's whole unread stream.
    pub stream_id: Option<String>,
    pub count: u32,
    pub unread_only: bool,
    pub continuation: Option<String>,
}

impl StreamQuery {
    pub fn new(count: u32) -> Self {
        Self {
            stream_id: None,
            count: count.clamp(1, MAX_STREAM_COUNT),
            unread_only: true,
            continuation: None,
        }
    }

    pub fn with_continuation(mut self, continuation: Option<String>) -> Self {
        self.continuation = continuation.filter(|c| !c.is_empty());
        self
    }
}

impl Default for StreamQuery {
    fn default() -> Self {
        Self::new(DEFAULT_STREAM_COUNT)
    }
}

/// A source of articles that also accepts the swipe actions.
#[async_trait]
pub trait FeedProvider: Send + Sync {
    async fn list_articles(&self, query: &StreamQuery) -> Result<ArticlePage, FeedError>;

    async fn mark_read(&self, article_id: &str) -> Result<(), FeedError>;

    async fn save_for_later(&self, article_id: &str) -> Result<(), FeedError>;

    async fn subscriptions(&self) -> Result<Vec<Subscription>, FeedError>;
}
