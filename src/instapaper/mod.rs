//! Instapaper module
//!
//! Saves articles to Instapaper through its OAuth 1.0a full API.
//!
//! # Architecture
//!
//! - [`oauth`] builds and signs parameter sets (HMAC-SHA1, RFC 3986 encoding)
//! - [`InstapaperClient`] exchanges username and password for an access
//!   token (xAuth), keeps it for an hour, and signs every bookmark call with it
//! - `routes()` exposes `/add` and `/bookmarks` to the front end; `/add` goes
//!   through the idempotency cache first
//!
//! # Usage
//!
//! ```rust,ignore
//! use feedlizer::instapaper;
//!
//! let client = instapaper::InstapaperClient::new(&cfg.instapaper, http, clock);
//! client.add_bookmark("https://example.com", Some("Title")).await?;
//! ```

mod client;
mod handler;
pub mod oauth;
mod routes;

pub use client::{
    AccessToken, CachedToken, InstapaperClient, OAuthCredentials, TOKEN_LIFETIME_SECS,
    parse_access_token, parse_bookmarks,
};
pub use routes::routes;
