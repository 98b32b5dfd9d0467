use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use reqwest::StatusCode;
use serde::Deserialize;
use tokio::sync::Mutex;

use super::oauth::{SignedRequest, Signer};
use crate::clock::Clock;
use crate::config;
use crate::error::InstapaperError;
use crate::model::Bookmark;

pub const TOKEN_LIFETIME_SECS: i64 = 3600;

const ACCESS_TOKEN_PATH: &str = "oauth/access_token";
const BOOKMARKS_ADD_PATH: &str = "bookmarks/add";
const BOOKMARKS_LIST_PATH: &str = "bookmarks/list";

#[derive(Clone)]
pub struct OAuthCredentials {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub username: String,
    pub password: String,
}

impl OAuthCredentials {
    /// `None` unless all four values are present and non-blank.
    pub fn from_config(cfg: &config::Instapaper) -> Option<Self> {
        Some(Self {
            consumer_key: cfg.get_consumer_key()?.to_string(),
            consumer_secret: cfg.get_consumer_secret()?.to_string(),
            username: cfg.get_username()?.to_string(),
            password: cfg.get_password()?.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub token: String,
    pub secret: String,
}

#[derive(Debug, Clone)]
pub struct CachedToken {
    pub access: AccessToken,
    pub expires_at: DateTime<Utc>,
}

impl CachedToken {
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Parse the form-encoded body of the token endpoint. Both values must be
/// present and non-empty; anything less is an error so a partial token never
/// reaches the cache.
pub fn parse_access_token(body: &str) -> Result<AccessToken, InstapaperError> {
    let mut token = None;
    let mut secret = None;

    for (key, value) in url::form_urlencoded::parse(body.trim().as_bytes()) {
        match key.as_ref() {
            "oauth_token" => token = Some(value.into_owned()),
            "oauth_token_secret" => secret = Some(value.into_owned()),
            _ => {}
        }
    }

    match (token, secret) {
        (Some(token), Some(secret)) if !token.is_empty() && !secret.is_empty() => {
            Ok(AccessToken { token, secret })
        }
        _ => Err(InstapaperError::TokenAcquisition(
            "response is missing oauth_token or oauth_token_secret".to_string(),
        )),
    }
}

#[derive(Debug, Deserialize)]
struct RawBookmark {
    bookmark_id: i64,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    time: Option<i64>,
    #[serde(default)]
    starred: Option<String>,
    #[serde(default)]
    progress: Option<f64>,
}

impl RawBookmark {
    fn into_bookmark(self) -> Option<Bookmark> {
        let url = self.url.filter(|u| !u.is_empty() && u != "undefined")?;
        let title = self.title.filter(|t| !t.trim().is_empty())?;
        let time = self
            .time
            .and_then(|t| Utc.timestamp_opt(t, 0).single())
            .unwrap_or_else(Utc::now);

        Some(Bookmark {
            id: self.bookmark_id,
            url,
            title,
            description: self.description.unwrap_or_default(),
            time,
            starred: self.starred.as_deref() == Some("1"),
            progress: self.progress.unwrap_or(0.0),
        })
    }
}

/// Keep `type == "bookmark"` entries with a usable url and title, newest
/// first. The list endpoint mixes in `meta` and `user` objects.
pub fn parse_bookmarks(body: &str) -> Result<Vec<Bookmark>, InstapaperError> {
    let items: Vec<serde_json::Value> = serde_json::from_str(body).map_err(|e| {
        InstapaperError::SignatureRequest(format!("invalid bookmarks response: {}", e))
    })?;

    let mut bookmarks: Vec<Bookmark> = items
        .into_iter()
        .filter(|item| item.get("type").and_then(|t| t.as_str()) == Some("bookmark"))
        .filter_map(|item| serde_json::from_value::<RawBookmark>(item).ok())
        .filter_map(RawBookmark::into_bookmark)
        .collect();

    bookmarks.sort_by(|a, b| b.time.cmp(&a.time));
    Ok(bookmarks)
}

/// Client for the Instapaper full API.
///
/// Holds the xAuth access token for one hour. The token slot is a
/// `tokio::sync::Mutex` held across the exchange, so callers arriving while a
/// refresh is in flight wait for it and then reuse its result instead of
/// starting their own.
pub struct InstapaperClient {
    http: reqwest::Client,
    base_url: String,
    credentials: Option<OAuthCredentials>,
    signer: Option<Signer>,
    clock: Arc<dyn Clock>,
    forward_description: bool,
    token: Mutex<Option<CachedToken>>,
}

impl InstapaperClient {
    pub fn new(cfg: &config::Instapaper, http: reqwest::Client, clock: Arc<dyn Clock>) -> Self {
        let credentials = OAuthCredentials::from_config(cfg);
        let signer = credentials
            .as_ref()
            .map(|c| Signer::new(&c.consumer_key, &c.consumer_secret, clock.clone()));

        if credentials.is_none() {
            tracing::warn!("instapaper credentials not configured, saving will fail");
        }

        Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            credentials,
            signer,
            clock,
            forward_description: cfg.forward_description,
            token: Mutex::new(None),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn credentials(&self) -> Result<(&OAuthCredentials, &Signer), InstapaperError> {
        match (&self.credentials, &self.signer) {
            (Some(credentials), Some(signer)) => Ok((credentials, signer)),
            _ => Err(InstapaperError::Configuration(
                "Instapaper credentials not configured".to_string(),
            )),
        }
    }

    async fn post_signed(
        &self,
        url: &str,
        signed: SignedRequest,
    ) -> Result<(StatusCode, String), reqwest::Error> {
        let response = self.http.post(url).form(&signed.into_form()).send().await?;
        let status = response.status();
        let body = response.text().await?;
        Ok((status, body))
    }

    /// Return the cached access token, or exchange username and password for
    /// a new one when there is none or it has expired.
    pub async fn get_token(&self) -> Result<AccessToken, InstapaperError> {
        let (credentials, signer) = self.credentials()?;

        let mut slot = self.token.lock().await;
        if let Some(cached) = slot.as_ref() {
            if cached.is_valid_at(self.clock.now()) {
                tracing::debug!("using cached instapaper token");
                return Ok(cached.access.clone());
            }
        }

        tracing::info!("requesting fresh instapaper access token");
        let access = self.request_token(credentials, signer).await?;
        *slot = Some(CachedToken {
            access: access.clone(),
            expires_at: self.clock.now() + Duration::seconds(TOKEN_LIFETIME_SECS),
        });

        Ok(access)
    }

    /// Forget the cached token if it is still `rejected`, so the next call
    /// re-authenticates. A token another caller refreshed meanwhile is kept.
    pub async fn invalidate_token(&self, rejected: &AccessToken) {
        let mut slot = self.token.lock().await;
        if slot.as_ref().is_some_and(|cached| &cached.access == rejected) {
            tracing::info!("dropping rejected instapaper token");
            *slot = None;
        }
    }

    async fn request_token(
        &self,
        credentials: &OAuthCredentials,
        signer: &Signer,
    ) -> Result<AccessToken, InstapaperError> {
        let url = self.endpoint(ACCESS_TOKEN_PATH);

        let mut extra = BTreeMap::new();
        extra.insert("x_auth_mode".to_string(), "client_auth".to_string());
        extra.insert("x_auth_username".to_string(), credentials.username.clone());
        extra.insert("x_auth_password".to_string(), credentials.password.clone());

        let signed = signer.sign_request("POST", &url, extra, None)?;
        let (status, body) = self.post_signed(&url, signed).await.map_err(|e| {
            InstapaperError::TokenAcquisition(format!("token request failed: {}", e))
        })?;

        if !status.is_success() {
            tracing::error!(status = %status, "instapaper token exchange rejected");
            return Err(InstapaperError::ProviderRejected {
                endpoint: ACCESS_TOKEN_PATH.to_string(),
                status,
                body,
            });
        }

        parse_access_token(&body)
    }

    /// Save `url` (and `title`, if any) as a bookmark.
    pub async fn add_bookmark(&self, url: &str, title: Option<&str>) -> Result<(), InstapaperError> {
        self.submit_bookmark(url, title, None).await
    }

    /// Entry point for the HTTP layer. `description` is accepted but only
    /// signed and sent when `forward_description` is enabled: the bookmarks
    /// endpoint has been seen rejecting signatures over free-form text.
    pub async fn add_to_instapaper(
        &self,
        url: &str,
        title: Option<&str>,
        description: Option<&str>,
    ) -> Result<(), InstapaperError> {
        let description = if self.forward_description {
            description
        } else {
            if description.is_some_and(|d| !d.is_empty()) {
                tracing::debug!("description not forwarded to instapaper");
            }
            None
        };
        self.submit_bookmark(url, title, description).await
    }

    async fn submit_bookmark(
        &self,
        url: &str,
        title: Option<&str>,
        description: Option<&str>,
    ) -> Result<(), InstapaperError> {
        let (_, signer) = self.credentials()?;
        let access = self.get_token().await?;
        let endpoint = self.endpoint(BOOKMARKS_ADD_PATH);

        let mut extra = BTreeMap::new();
        extra.insert("url".to_string(), url.to_string());
        if let Some(title) = title.filter(|t| !t.is_empty()) {
            extra.insert("title".to_string(), title.to_string());
        }
        if let Some(description) = description.filter(|d| !d.is_empty()) {
            extra.insert("description".to_string(), description.to_string());
        }

        let signed = signer.sign_request(
            "POST",
            &endpoint,
            extra,
            Some((access.token.as_str(), access.secret.as_str())),
        )?;
        let (status, body) = self.post_signed(&endpoint, signed).await.map_err(|e| {
            InstapaperError::SignatureRequest(format!("bookmark request failed: {}", e))
        })?;

        // 200, not 201, is success here.
        if status != StatusCode::OK {
            if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                self.invalidate_token(&access).await;
            }
            tracing::error!(status = %status, "instapaper rejected bookmark");
            return Err(InstapaperError::ProviderRejected {
                endpoint: BOOKMARKS_ADD_PATH.to_string(),
                status,
                body,
            });
        }

        tracing::info!(url, "saved to instapaper");
        Ok(())
    }

    /// Bookmarks in `folder` (`unread`, `starred`, `archive` or a folder id).
    pub async fn list_bookmarks(
        &self,
        folder: &str,
        limit: u32,
    ) -> Result<Vec<Bookmark>, InstapaperError> {
        let (_, signer) = self.credentials()?;
        let access = self.get_token().await?;
        let endpoint = self.endpoint(BOOKMARKS_LIST_PATH);

        let mut extra = BTreeMap::new();
        extra.insert("folder".to_string(), folder.to_string());
        extra.insert("limit".to_string(), limit.to_string());

        let signed = signer.sign_request(
            "POST",
            &endpoint,
            extra,
            Some((access.token.as_str(), access.secret.as_str())),
        )?;
        let (status, body) = self.post_signed(&endpoint, signed).await.map_err(|e| {
            InstapaperError::SignatureRequest(format!("bookmark list request failed: {}", e))
        })?;

        if !status.is_success() {
            if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                self.invalidate_token(&access).await;
            }
            return Err(InstapaperError::ProviderRejected {
                endpoint: BOOKMARKS_LIST_PATH.to_string(),
                status,
                body,
            });
        }

        let bookmarks = parse_bookmarks(&body)?;
        tracing::info!(folder, count = bookmarks.len(), "fetched instapaper bookmarks");
        Ok(bookmarks)
    }
}
