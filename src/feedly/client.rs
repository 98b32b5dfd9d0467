use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use tokio::sync::OnceCell;

use super::provider::{FeedProvider, StreamQuery};
use crate::config;
use crate::error::FeedError;
use crate::model::{Article, ArticlePage, ArticleSource, Subscription};

const NO_SUMMARY: &str = "No summary available";

#[derive(Debug, Deserialize)]
struct Profile {
    id: String,
    #[serde(rename = "fullName", default)]
    full_name: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Link {
    #[serde(default)]
    href: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Origin {
    #[serde(default)]
    title: Option<String>,
    #[serde(rename = "htmlUrl", default)]
    html_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Visual {
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    id: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    summary: Option<Content>,
    #[serde(default)]
    content: Option<Content>,
    #[serde(rename = "canonicalUrl", default)]
    canonical_url: Option<String>,
    #[serde(default)]
    alternate: Vec<Link>,
    #[serde(default)]
    published: i64,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    origin: Option<Origin>,
    #[serde(default)]
    visual: Option<Visual>,
    #[serde(default)]
    enclosure: Vec<Link>,
    #[serde(default)]
    engagement: i64,
}

impl From<Entry> for Article {
    fn from(entry: Entry) -> Self {
        let summary = entry
            .summary
            .and_then(|c| c.content)
            .or_else(|| entry.content.and_then(|c| c.content))
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| NO_SUMMARY.to_string());

        let url = entry
            .canonical_url
            .or_else(|| entry.alternate.into_iter().find_map(|l| l.href));

        // "none" is how the API spells a missing visual.
        let visual = entry
            .visual
            .and_then(|v| v.url)
            .filter(|u| u != "none")
            .or_else(|| entry.enclosure.into_iter().find_map(|l| l.href));

        let (source_title, website) = match entry.origin {
            Some(origin) => (origin.title, origin.html_url),
            None => (None, None),
        };

        Article {
            id: entry.id,
            title: entry.title.unwrap_or_default(),
            summary,
            url,
            published: entry.published,
            author: entry.author,
            source: ArticleSource {
                title: source_title,
                website,
            },
            visual,
            engagement: entry.engagement,
        }
    }
}

#[derive(Debug, Deserialize)]
struct StreamContents {
    #[serde(default)]
    items: Vec<Entry>,
    #[serde(default)]
    continuation: Option<String>,
}

/// Feedly cloud API backend, authenticated with a developer access token.
pub struct FeedlyClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
    user_id: OnceCell<String>,
}

impl FeedlyClient {
    pub fn new(cfg: &config::Feedly, http: reqwest::Client) -> Self {
        if cfg.get_token().is_none() {
            tracing::warn!("feedly token not configured, stream requests will fail");
        }

        Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            token: cfg.get_token().map(str::to_string),
            user_id: OnceCell::new(),
        }
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, FeedError> {
        let token = self.token.as_deref().ok_or_else(|| {
            FeedError::Configuration("Feedly access token not configured".to_string())
        })?;
        Ok(self
            .http
            .request(method, format!("{}/{}", self.base_url, path))
            .bearer_auth(token))
    }

    async fn expect_ok(endpoint: &str, response: Response) -> Result<Response, FeedError> {
        let status = response.status();
        if status == StatusCode::OK {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        tracing::error!(endpoint, status = %status, "feedly request rejected");
        Err(FeedError::Provider {
            endpoint: endpoint.to_string(),
            status,
            body,
        })
    }

    /// The user id, fetched from the profile on first use.
    async fn user_id(&self) -> Result<&str, FeedError> {
        let id = self
            .user_id
            .get_or_try_init(|| async {
                let response = self.request(Method::GET, "profile")?.send().await?;
                let profile: Profile = Self::expect_ok("profile", response).await?.json().await?;
                tracing::info!(
                    user = profile
                        .full_name
                        .as_deref()
                        .or(profile.email.as_deref())
                        .unwrap_or("unknown"),
                    "feedly profile loaded"
                );
                Ok::<String, FeedError>(profile.id)
            })
            .await?;
        Ok(id.as_str())
    }

    async fn default_stream_id(&self) -> Result<String, FeedError> {
        Ok(format!("user/{}/category/global.all", self.user_id().await?))
    }
}

#[async_trait]
impl FeedProvider for FeedlyClient {
    async fn list_articles(&self, query: &StreamQuery) -> Result<ArticlePage, FeedError> {
        let stream_id = match &query.stream_id {
            Some(id) => id.clone(),
            None => self.default_stream_id().await?,
        };

        let mut params: Vec<(&str, String)> = vec![
            ("streamId", stream_id.clone()),
            ("count", query.count.to_string()),
        ];
        if query.unread_only {
            params.push(("unreadOnly", "true".to_string()));
        }
        if let Some(continuation) = &query.continuation {
            params.push(("continuation", continuation.clone()));
        }

        tracing::info!(stream = %stream_id, count = query.count, "fetching articles");
        let response = self
            .request(Method::GET, "streams/contents")?
            .query(&params)
            .send()
            .await?;
        let contents: StreamContents = Self::expect_ok("streams/contents", response)
            .await?
            .json()
            .await
            .map_err(|e| FeedError::InvalidResponse(format!("stream contents: {}", e)))?;

        let items: Vec<Article> = contents.items.into_iter().map(Article::from).collect();
        tracing::info!(count = items.len(), "fetched articles");

        Ok(ArticlePage {
            items,
            continuation: contents.continuation,
        })
    }

    async fn mark_read(&self, article_id: &str) -> Result<(), FeedError> {
        let body = serde_json::json!({
            "action": "markAsRead",
            "type": "entries",
            "entryIds": [article_id],
        });

        let response = self
            .request(Method::POST, "markers")?
            .json(&body)
            .send()
            .await?;
        Self::expect_ok("markers", response).await?;

        tracing::info!(article_id, "marked as read");
        Ok(())
    }

    async fn save_for_later(&self, article_id: &str) -> Result<(), FeedError> {
        let tag_id = format!("user/{}/tag/global.saved", self.user_id().await?);
        let path = format!("tags/{}", urlencoding::encode(&tag_id));
        let body = serde_json::json!({ "entryId": article_id });

        let response = self.request(Method::PUT, &path)?.json(&body).send().await?;
        Self::expect_ok("tags", response).await?;

        tracing::info!(article_id, "saved for later");
        Ok(())
    }

    async fn subscriptions(&self) -> Result<Vec<Subscription>, FeedError> {
        let response = self.request(Method::GET, "subscriptions")?.send().await?;
        let subscriptions: Vec<Subscription> = Self::expect_ok("subscriptions", response)
            .await?
            .json()
            .await
            .map_err(|e| FeedError::InvalidResponse(format!("subscriptions: {}", e)))?;

        tracing::info!(count = subscriptions.len(), "fetched subscriptions");
        Ok(subscriptions)
    }
}
