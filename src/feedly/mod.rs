//! Feed provider module
//!
//! The swipe deck reads articles from a [`FeedProvider`] and sends the
//! "read" and "save for later" swipes back to it. [`FeedlyClient`] is the
//! only backend: it talks to the Feedly cloud API with a developer token.
//!
//! # Usage
//!
//! ```rust,ignore
//! use feedlizer::feedly;
//!
//! let provider: Arc<dyn feedly::FeedProvider> =
//!     Arc::new(feedly::FeedlyClient::new(&cfg.feedly, http));
//!
//! let app = Router::new()
//!     .nest("/api/feedly", feedly::routes())
//!     .with_state(app_state);
//! ```

mod client;
mod handler;
mod provider;
mod routes;

pub use client::FeedlyClient;
pub use provider::{DEFAULT_STREAM_COUNT, FeedProvider, MAX_STREAM_COUNT, StreamQuery};
pub use routes::routes;
