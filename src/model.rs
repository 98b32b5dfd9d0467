use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArticleSource {
    pub title: Option<String>,
    pub website: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Article {
    pub id: String,
    pub title: String,
    pub summary: String,
    pub url: Option<String>,
    /// Milliseconds since the epoch, as the feed provider reports it.
    pub published: i64,
    pub author: Option<String>,
    pub source: ArticleSource,
    pub visual: Option<String>,
    pub engagement: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ArticlePage {
    pub items: Vec<Article>,
    pub continuation: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub id: String,
    pub title: Option<String>,
    pub website: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bookmark {
    pub id: i64,
    pub url: String,
    pub title: String,
    pub description: String,
    pub time: DateTime<Utc>,
    pub starred: bool,
    pub progress: f64,
}
