use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use chrono::{DateTime, Duration, Utc};

use crate::api::ErrorResponse;
use crate::clock::Clock;
use crate::handler::AppState;

pub const SESSION_COOKIE: &str = "feedlizer_session";
pub const SESSION_TIMEOUT_SECS: i64 = 24 * 60 * 60;

/// Password login with in-memory sessions. Without a password every request
/// is let through.
pub struct SessionStore {
    password: Option<String>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    sessions: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl SessionStore {
    pub fn new(password: Option<&str>, clock: Arc<dyn Clock>) -> Self {
        Self {
            password: password.map(str::to_string),
            ttl: Duration::seconds(SESSION_TIMEOUT_SECS),
            clock,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.password.is_some()
    }

    /// A new session id if `password` matches.
    pub fn login(&self, password: &str) -> Option<String> {
        let expected = self.password.as_deref()?;
        if expected != password {
            return None;
        }

        let session_id = hex::encode(rand::random::<[u8; 32]>());
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions.insert(session_id.clone(), self.clock.now());
        Some(session_id)
    }

    pub fn is_valid(&self, session_id: &str) -> bool {
        let now = self.clock.now();
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        match sessions.get(session_id) {
            Some(created) if now - *created <= self.ttl => true,
            Some(_) => {
                sessions.remove(session_id);
                false
            }
            None => false,
        }
    }

    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let ttl = self.ttl;
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        let before = sessions.len();
        sessions.retain(|_, created| now - *created <= ttl);
        before - sessions.len()
    }

    pub fn cookie(session_id: String) -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE, session_id))
            .path("/")
            .max_age(time::Duration::seconds(SESSION_TIMEOUT_SECS))
            .http_only(true)
            .build()
    }
}

pub async fn require_session(
    State(state): State<AppState>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Response {
    if !state.sessions.is_enabled() {
        return next.run(request).await;
    }

    let authenticated = jar
        .get(SESSION_COOKIE)
        .map(|c| state.sessions.is_valid(c.value()))
        .unwrap_or(false);

    if !authenticated {
        tracing::info!(path = %request.uri().path(), "rejecting unauthenticated request");
        return (StatusCode::UNAUTHORIZED, Json(ErrorResponse::login_required())).into_response();
    }

    next.run(request).await
}
