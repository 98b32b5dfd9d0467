//! Test helpers for tests that talk to Instapaper.
//!
//! Provides a local axum server standing in for the Instapaper API.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::{
    Form, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use feedlizer::config;

pub const CONSUMER_SECRET: &str = "consumer-secret";
pub const TOKEN_SECRET: &str = "token-secret";

pub type RecordedForms = Arc<Mutex<Vec<BTreeMap<String, String>>>>;

/// Canned replies for each endpoint plus a record of what was sent.
#[derive(Clone)]
pub struct MockInstapaper {
    pub token_calls: Arc<AtomicUsize>,
    pub token_status: StatusCode,
    pub token_body: Arc<String>,
    pub add_status: StatusCode,
    pub add_forms: RecordedForms,
    pub list_status: StatusCode,
    pub list_body: Arc<String>,
    pub list_forms: RecordedForms,
}

impl MockInstapaper {
    pub fn new(token_body: &str, add_status: StatusCode) -> Self {
        Self {
            token_calls: Arc::new(AtomicUsize::new(0)),
            token_status: StatusCode::OK,
            token_body: Arc::new(token_body.to_string()),
            add_status,
            add_forms: Arc::new(Mutex::new(Vec::new())),
            list_status: StatusCode::OK,
            list_body: Arc::new("[]".to_string()),
            list_forms: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_token_status(mut self, status: StatusCode) -> Self {
        self.token_status = status;
        self
    }

    pub fn with_list(mut self, status: StatusCode, body: &str) -> Self {
        self.list_status = status;
        self.list_body = Arc::new(body.to_string());
        self
    }
}

async fn access_token(
    State(mock): State<MockInstapaper>,
    Form(form): Form<BTreeMap<String, String>>,
) -> Response {
    mock.token_calls.fetch_add(1, Ordering::SeqCst);
    if form.get("x_auth_mode").map(String::as_str) != Some("client_auth") {
        return (StatusCode::UNAUTHORIZED, "missing xauth").into_response();
    }
    (mock.token_status, mock.token_body.as_str().to_owned()).into_response()
}

async fn bookmarks_add(
    State(mock): State<MockInstapaper>,
    Form(form): Form<BTreeMap<String, String>>,
) -> Response {
    mock.add_forms.lock().unwrap().push(form);
    (mock.add_status, "[]").into_response()
}

async fn bookmarks_list(
    State(mock): State<MockInstapaper>,
    Form(form): Form<BTreeMap<String, String>>,
) -> Response {
    mock.list_forms.lock().unwrap().push(form);
    (mock.list_status, mock.list_body.as_str().to_owned()).into_response()
}

/// Serve the mock on an ephemeral port; returns the base url.
pub async fn serve(mock: MockInstapaper) -> String {
    let app = Router::new()
        .route("/api/1/oauth/access_token", post(access_token))
        .route("/api/1/bookmarks/add", post(bookmarks_add))
        .route("/api/1/bookmarks/list", post(bookmarks_list))
        .with_state(mock);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/api/1", addr)
}

pub fn client_config(base_url: &str) -> config::Instapaper {
    config::Instapaper {
        consumer_key: Some("consumer-key".to_string()),
        consumer_secret: Some(CONSUMER_SECRET.to_string()),
        username: Some("reader@example.com".to_string()),
        password: Some("secret".to_string()),
        base_url: base_url.to_string(),
        forward_description: false,
    }
}

pub fn good_token_body() -> String {
    format!("oauth_token=token-1&oauth_token_secret={}", TOKEN_SECRET)
}
